//! Error types for the codec and the identifier wrappers

/// Errors raised by the BER-TLV codec
///
/// Parsing aborts on the first malformed element; no partial result is
/// returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TlvError {
    /// The stream ended before a complete tag (an empty stream fails
    /// this way too)
    #[error("truncated stream while reading tag")]
    TruncatedTag,

    /// The stream ended before a complete length field
    #[error("truncated stream while reading length")]
    TruncatedLength,

    /// The declared length exceeds the bytes remaining in the stream
    #[error("declared length {declared} exceeds remaining input ({available} bytes)")]
    TruncatedValue {
        /// Length declared by the element
        declared: usize,
        /// Bytes actually available
        available: usize,
    },

    /// The indefinite length form (0x80) is not used in ISO 7816 data
    #[error("indefinite length form is not supported")]
    IndefiniteLength,

    /// The long-form length announces more length bytes than this codec
    /// accepts
    #[error("unsupported length field of {0} bytes")]
    UnsupportedLength(usize),
}

/// Errors raised constructing identifier value types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IdentifierError {
    /// AID outside the 5..=16 byte range required by ISO 7816-4
    #[error("invalid AID length: {0} bytes (expected 5 to 16)")]
    AidLength(usize),

    /// ATR outside the 2..=33 byte range required by ISO 7816-3
    #[error("invalid ATR length: {0} bytes (expected 2 to 33)")]
    AtrLength(usize),

    /// The hex string form could not be decoded
    #[error("invalid hex string")]
    Hex(#[from] hex::FromHexError),
}
