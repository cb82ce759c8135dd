//! READ RECORD command

use chipflow_apdu_core::Command;

use crate::constants::{cla, ins};

/// READ RECORD for the given record number within the file identified by
/// `sfi`; P2 carries the SFI in its upper five bits with the
/// record-number addressing mode in the lower three
pub fn read_record(record: u8, sfi: u8) -> Command {
    Command::new_with_le(
        cla::ISO7816,
        ins::READ_RECORD,
        record,
        ((sfi & 0x1F) << 3) | 0x04,
        0x00,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_read_record() {
        let cmd = read_record(1, 1);
        assert_eq!(cmd.to_bytes().as_ref(), hex!("00B2010C00"));

        let cmd = read_record(2, 2);
        assert_eq!(cmd.to_bytes().as_ref(), hex!("00B2021400"));
    }
}
