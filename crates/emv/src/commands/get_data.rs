//! GET DATA command
//!
//! Retrieves a single primitive data object outside the record files
//! (PIN try counter, application transaction counter, …).

use chipflow_apdu_core::Command;

use crate::constants::{cla, ins};

/// GET DATA for the two-byte tag carried in P1/P2
pub fn get_data(tag: u16) -> Command {
    Command::new_with_le(
        cla::PROPRIETARY,
        ins::GET_DATA,
        (tag >> 8) as u8,
        tag as u8,
        0x00,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    use crate::constants::tags;

    #[test]
    fn test_get_data_pin_try_counter() {
        let cmd = get_data(tags::PIN_TRY_COUNTER);
        assert_eq!(cmd.to_bytes().as_ref(), hex!("80CA9F1700"));
    }
}
