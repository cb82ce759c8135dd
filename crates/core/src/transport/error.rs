//! Error types specific to card transport

/// Transport error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The underlying channel could not complete the exchange
    #[error("failed to connect to card")]
    Connection,

    /// Data could not be transmitted or the reply was unusable
    #[error("failed to transmit data")]
    Transmission,

    /// The command is shorter than the minimum 4-byte APDU header;
    /// rejected before any byte reaches the card
    #[error("command shorter than APDU header: {0} bytes")]
    InvalidCommand(usize),

    /// The card returned fewer than the two mandatory status bytes
    #[error("response shorter than status word: {0} bytes")]
    InvalidResponse(usize),

    /// The transport refuses this housekeeping operation
    #[error("not supported: {0}")]
    NotSupported(&'static str),

    /// Other error with message
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Create a general other error
    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other(message.into())
    }
}
