//! VERIFY command (plaintext PIN)

use bytes::Bytes;
use chipflow_apdu_core::Command;

use crate::constants::{cla, ins};
use crate::{Error, Result};

/// P2 qualifier for a plaintext PIN block
const PLAINTEXT_PIN: u8 = 0x80;

/// VERIFY with a plaintext format-2 PIN block built from the given digits
///
/// Fails with the invalid-argument kind when the PIN is not 4 to 12
/// decimal digits.
pub fn verify_pin(pin: &str) -> Result<Command> {
    let block = plaintext_pin_block(pin)?;
    Ok(Command::new_with_data(
        cla::ISO7816,
        ins::VERIFY,
        0x00,
        PLAINTEXT_PIN,
        Bytes::copy_from_slice(&block),
    ))
}

/// Build the 8-byte format-2 PIN block: control nibble 2, digit count,
/// BCD digits, 0xF padding
pub(crate) fn plaintext_pin_block(pin: &str) -> Result<[u8; 8]> {
    if !(4..=12).contains(&pin.len()) || !pin.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidArgument(
            "PIN must be 4 to 12 decimal digits",
        ));
    }

    let mut block = [0xFFu8; 8];
    block[0] = 0x20 | pin.len() as u8;

    for (i, digit) in pin.bytes().enumerate() {
        let nibble = digit - b'0';
        let byte = &mut block[1 + i / 2];
        if i % 2 == 0 {
            *byte = (nibble << 4) | 0x0F;
        } else {
            *byte = (*byte & 0xF0) | nibble;
        }
    }

    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_pin_block() {
        assert_eq!(plaintext_pin_block("1234").unwrap(), hex!("241234FFFFFFFFFF"));
        assert_eq!(plaintext_pin_block("12345").unwrap(), hex!("2512345FFFFFFFFF"));
    }

    #[test]
    fn test_verify_command() {
        let cmd = verify_pin("1234").unwrap();
        assert_eq!(cmd.to_bytes().as_ref(), hex!("0020008008241234FFFFFFFFFF"));
    }

    #[test]
    fn test_verify_rejects_bad_pins() {
        assert!(matches!(verify_pin("123"), Err(Error::InvalidArgument(_))));
        assert!(matches!(
            verify_pin("1234567890123"),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(verify_pin("12a4"), Err(Error::InvalidArgument(_))));
    }
}
