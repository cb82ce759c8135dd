//! Application Interchange Profile

use crate::Error;

/// Application Interchange Profile: the two-byte capability bitmap a card
/// returns from GET PROCESSING OPTIONS
///
/// The profile's CDA flag selects between the CDA-capable and the plain
/// transaction-completion path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplicationInterchangeProfile {
    byte1: u8,
    byte2: u8,
}

impl ApplicationInterchangeProfile {
    /// Create a profile from its two bytes
    pub const fn new(byte1: u8, byte2: u8) -> Self {
        Self { byte1, byte2 }
    }

    /// The raw profile bytes
    pub const fn bytes(&self) -> [u8; 2] {
        [self.byte1, self.byte2]
    }

    /// Static Data Authentication supported
    pub const fn sda_supported(&self) -> bool {
        self.byte1 & 0x40 != 0
    }

    /// Dynamic Data Authentication supported
    pub const fn dda_supported(&self) -> bool {
        self.byte1 & 0x20 != 0
    }

    /// Cardholder verification supported
    pub const fn cardholder_verification_supported(&self) -> bool {
        self.byte1 & 0x10 != 0
    }

    /// Terminal risk management is to be performed
    pub const fn terminal_risk_management_required(&self) -> bool {
        self.byte1 & 0x08 != 0
    }

    /// Issuer authentication supported
    pub const fn issuer_authentication_supported(&self) -> bool {
        self.byte1 & 0x04 != 0
    }

    /// Combined DDA / application cryptogram generation supported
    pub const fn cda_supported(&self) -> bool {
        self.byte1 & 0x01 != 0
    }
}

impl TryFrom<&[u8]> for ApplicationInterchangeProfile {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Error> {
        match bytes {
            [byte1, byte2] => Ok(Self::new(*byte1, *byte2)),
            _ => Err(Error::MalformedData(
                "application interchange profile must be exactly 2 bytes",
            )),
        }
    }
}
