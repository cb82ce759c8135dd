use chipflow_apdu_core::{StatusWord, TransportError};
use chipflow_iso7816::{IdentifierError, TlvError};

/// Result type for EMV operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for EMV operations
///
/// A closed set of kinds; callers match on the variant, not on message
/// content. Parsing errors abort the current decode with no partial
/// result, and apart from the single PSE→PPSE fallback no operation
/// retries automatically; every other failure leaves the session in its
/// last good state.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Transport-level failures: connection loss, commands shorter than
    /// the APDU header, refused housekeeping operations
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Malformed BER-TLV data (truncated tag, length or value)
    #[error(transparent)]
    Tlv(#[from] TlvError),

    /// Card data that decoded as TLV but violates its mandated format
    /// (wrong AIP width, ragged AFL groups, …)
    #[error("malformed card data: {0}")]
    MalformedData(&'static str),

    /// Absent or out-of-range inputs
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Invalid identifier construction (AID or ATR length out of range)
    #[error(transparent)]
    Identifier(#[from] IdentifierError),

    /// An operation was invoked out of step order, or the card answered
    /// with a status word that aborts the current step
    #[error("protocol error: {message}")]
    ProtocolState {
        /// What went wrong
        message: &'static str,
        /// The offending status word, when the card reported one
        status: Option<StatusWord>,
    },
}

impl Error {
    /// Create a protocol-state error with no associated status word
    pub const fn protocol(message: &'static str) -> Self {
        Self::ProtocolState {
            message,
            status: None,
        }
    }

    /// Create a protocol-state error carrying the card's status word
    pub const fn protocol_with_status(message: &'static str, status: StatusWord) -> Self {
        Self::ProtocolState {
            message,
            status: Some(status),
        }
    }
}
