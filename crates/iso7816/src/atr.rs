//! Answer To Reset

use std::fmt;

use bytes::Bytes;
use derive_more::Deref;

use crate::IdentifierError;

/// Answer To Reset: the byte sequence a card returns on activation,
/// 2 to 33 bytes per ISO 7816-3
#[derive(Debug, Clone, PartialEq, Eq, Deref)]
#[deref(forward)]
pub struct Atr(Bytes);

impl Atr {
    /// Construct an ATR, validating the length range
    pub fn new(bytes: impl Into<Bytes>) -> Result<Self, IdentifierError> {
        let bytes = bytes.into();
        if !(2..=33).contains(&bytes.len()) {
            return Err(IdentifierError::AtrLength(bytes.len()));
        }
        Ok(Self(bytes))
    }

    /// The raw ATR bytes
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Atr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode_upper(&self.0))
    }
}
