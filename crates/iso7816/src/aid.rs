//! Application and provider identifiers
//!
//! An AID (Application Identifier) selects one application on a card; its
//! first five bytes form the RID (Registered Application Provider
//! Identifier) assigned to the application provider.

use std::fmt;

use bytes::Bytes;
use derive_more::Deref;

use crate::IdentifierError;

/// Application Identifier: 5 to 16 bytes, content equality
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deref)]
#[deref(forward)]
pub struct Aid(Bytes);

impl Aid {
    /// Construct an AID, validating the ISO 7816-4 length range
    /// (5 to 16 bytes inclusive)
    pub fn new(bytes: impl Into<Bytes>) -> Result<Self, IdentifierError> {
        let bytes = bytes.into();
        if !(5..=16).contains(&bytes.len()) {
            return Err(IdentifierError::AidLength(bytes.len()));
        }
        Ok(Self(bytes))
    }

    /// Construct an AID from a hex string; whitespace is tolerated
    pub fn from_hex(hex_str: &str) -> Result<Self, IdentifierError> {
        let compact: String = hex_str.split_whitespace().collect();
        let bytes = hex::decode(compact)?;
        Self::new(bytes)
    }

    /// The raw AID bytes
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    /// The 5-byte Registered Application Provider Identifier prefix
    pub fn rid(&self) -> Rid {
        let mut rid = [0u8; 5];
        rid.copy_from_slice(&self.0[..5]);
        Rid(rid)
    }

    /// Whether one identifier is a byte-for-byte prefix of the other;
    /// the shorter of the two determines the comparison length
    pub fn partial_match(&self, other: &Self) -> bool {
        let len = self.0.len().min(other.0.len());
        self.0[..len] == other.0[..len]
    }
}

impl TryFrom<&[u8]> for Aid {
    type Error = IdentifierError;

    fn try_from(bytes: &[u8]) -> Result<Self, IdentifierError> {
        Self::new(Bytes::copy_from_slice(bytes))
    }
}

impl fmt::Display for Aid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Registered Application Provider Identifier: the fixed 5-byte AID prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deref)]
pub struct Rid([u8; 5]);

impl Rid {
    /// The raw RID bytes
    pub const fn bytes(&self) -> &[u8; 5] {
        &self.0
    }
}

impl fmt::Display for Rid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}
