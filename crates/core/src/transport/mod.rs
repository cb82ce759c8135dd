//! Transport trait for APDU communication with cards
//!
//! A transport is responsible for carrying raw APDU bytes to a card (real
//! or emulated) and returning the card's reply. It has no knowledge of
//! protocol sequencing; that belongs to the session layer built on top.

mod error;

use std::fmt;

use bytes::Bytes;
pub use error::TransportError;
use tracing::{debug, trace};

use crate::{MIN_APDU_LEN, Response};

/// Trait for card transports
///
/// The provided [`transmit`](CardTransport::transmit) wrapper validates the
/// command against the minimum APDU header length before anything reaches
/// the card, traces the exchange, and parses the reply's trailing status
/// word. Implementations override [`do_transmit`](CardTransport::do_transmit)
/// only.
///
/// A transport is exclusively owned by one session at a time: the card has
/// no concept of interleaved conversations.
pub trait CardTransport: fmt::Debug {
    /// Send a command APDU and return the parsed response
    ///
    /// Fails with [`TransportError::InvalidCommand`] when the command is
    /// shorter than the 4-byte header (class, instruction, P1, P2); this
    /// check happens before any byte reaches the transport.
    fn transmit(&mut self, command: &[u8]) -> Result<Response, TransportError> {
        if command.len() < MIN_APDU_LEN {
            return Err(TransportError::InvalidCommand(command.len()));
        }

        trace!(command = %hex::encode(command), "transmitting command");
        let raw = self.do_transmit(command)?;
        trace!(response = %hex::encode(&raw), "received response");

        let response =
            Response::from_bytes(&raw).map_err(|_| TransportError::InvalidResponse(raw.len()))?;
        if !response.status().is_success() {
            debug!(status = %response.status(), "card reported non-success status");
        }
        Ok(response)
    }

    /// Internal implementation of the raw exchange
    ///
    /// Receives a command already validated against the minimum header
    /// length; returns the raw reply bytes including SW1 SW2.
    fn do_transmit(&mut self, command: &[u8]) -> Result<Bytes, TransportError>;

    /// Perform a protocol-level card reset
    ///
    /// Transports without that capability (emulators in particular) fail
    /// with [`TransportError::NotSupported`].
    fn reset(&mut self) -> Result<(), TransportError>;

    /// Send a low-level control command to the reader
    ///
    /// Transports without that capability fail with
    /// [`TransportError::NotSupported`].
    fn control(&mut self, code: u32, data: &[u8]) -> Result<Bytes, TransportError>;
}

#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub(crate) struct MockTransport {
    /// Scripted replies, drained front to back; the last one repeats
    pub responses: Vec<Bytes>,
    /// Commands that were sent
    pub commands: Vec<Bytes>,
}

#[cfg(test)]
impl MockTransport {
    pub fn new(responses: Vec<Bytes>) -> Self {
        Self {
            responses,
            commands: Vec::new(),
        }
    }

    pub fn with_success() -> Self {
        Self::new(vec![Bytes::from_static(&[0x90, 0x00])])
    }
}

#[cfg(test)]
impl CardTransport for MockTransport {
    fn do_transmit(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        self.commands.push(Bytes::copy_from_slice(command));

        if self.responses.is_empty() {
            return Err(TransportError::Transmission);
        }

        if self.responses.len() == 1 {
            Ok(self.responses[0].clone())
        } else {
            Ok(self.responses.remove(0))
        }
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        Err(TransportError::NotSupported("reset"))
    }

    fn control(&mut self, _code: u32, _data: &[u8]) -> Result<Bytes, TransportError> {
        Err(TransportError::NotSupported("control"))
    }
}
