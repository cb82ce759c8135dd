//! Core types for APDU (Application Protocol Data Unit) operations
//!
//! This crate provides the foundational types for exchanging APDU commands
//! and responses with smart cards according to ISO/IEC 7816-4.
//!
//! ## Overview
//!
//! APDU (Application Protocol Data Unit) is the communication format used by
//! smart cards. This crate provides abstractions for:
//!
//! - Building and serializing APDU commands
//! - Parsing APDU responses and interpreting status words
//! - Communicating with cards through pluggable transport implementations
//!
//! Higher-level protocol engines (application selection, record reading,
//! transaction processing) are built on top of these types.
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};

// Main modules
pub mod command;
pub mod response;
pub mod transport;

// Re-exports for common types
pub use command::{Command, CommandError};
pub use response::status::StatusWord;
pub use response::{Response, ResponseError};
pub use transport::{CardTransport, TransportError};

/// Minimum length of a command APDU: CLA, INS, P1, P2
pub const MIN_APDU_LEN: usize = 4;

/// Prelude module containing commonly used types
pub mod prelude {
    pub use crate::{
        Bytes, BytesMut, Command, MIN_APDU_LEN, Response, StatusWord,
        transport::{CardTransport, TransportError},
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    // Test the basic types are re-exported correctly
    #[test]
    fn test_reexports() {
        let cmd = Command::new(0x00, 0xA4, 0x04, 0x00);
        assert_eq!(cmd.cla, 0x00);
        assert_eq!(cmd.ins, 0xA4);
        assert_eq!(cmd.p1, 0x04);
        assert_eq!(cmd.p2, 0x00);

        let resp = Response::success(Bytes::from_static(&[0x01, 0x02, 0x03]));
        assert!(resp.is_success());
        assert_eq!(resp.data().as_ref(), [0x01, 0x02, 0x03]);
        assert_eq!(resp.status(), StatusWord::new(0x90, 0x00));
    }
}
