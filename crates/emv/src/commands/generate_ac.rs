//! GENERATE APPLICATION CRYPTOGRAM command

use bytes::Bytes;
use chipflow_apdu_core::Command;

use crate::constants::{cla, ins};

/// Cryptogram type requested from the card, carried in the upper bits
/// of P1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CryptogramType {
    /// Application Authentication Cryptogram (transaction declined)
    Aac = 0x00,
    /// Transaction Certificate (offline approval)
    Tc = 0x40,
    /// Authorization Request Cryptogram (online authorization)
    Arqc = 0x80,
}

/// P1 bit requesting a CDA signature alongside the cryptogram
const CDA_SIGNATURE: u8 = 0x10;

/// GENERATE AC requesting the given cryptogram type over the CDOL-derived
/// data block; `cda_signature` additionally requests the combined dynamic
/// signature and is only meaningful when the application's interchange
/// profile advertises CDA
pub fn generate_ac(cryptogram: CryptogramType, cda_signature: bool, data: impl Into<Bytes>) -> Command {
    let mut p1 = cryptogram as u8;
    if cda_signature {
        p1 |= CDA_SIGNATURE;
    }

    let data = data.into();
    if data.is_empty() {
        Command::new_with_le(cla::PROPRIETARY, ins::GENERATE_AC, p1, 0x00, 0x00)
    } else {
        Command::new_with_data_and_le(cla::PROPRIETARY, ins::GENERATE_AC, p1, 0x00, data, 0x00)
    }
}
