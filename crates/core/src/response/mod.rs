//! APDU response definitions
//!
//! This module provides types for working with APDU responses according to
//! ISO/IEC 7816-4: the response payload plus the two-byte status word that
//! terminates every exchange.

pub mod status;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use status::StatusWord;

/// Errors arising from parsing a raw APDU response
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResponseError {
    /// Fewer than the two mandatory status bytes came back
    #[error("response too short: {0} bytes")]
    TooShort(usize),
}

/// Basic APDU response structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Response payload data (empty when the card returned only a status)
    data: Bytes,
    /// Status word
    status: StatusWord,
}

impl Response {
    /// Create a new response with payload and status
    pub fn new(data: impl Into<Bytes>, status: impl Into<StatusWord>) -> Self {
        Self {
            data: data.into(),
            status: status.into(),
        }
    }

    /// Create a success response (90 00)
    pub fn success(data: impl Into<Bytes>) -> Self {
        Self::new(data, StatusWord::new(0x90, 0x00))
    }

    /// Create a data-less response from a status word
    pub fn status_only(status: impl Into<StatusWord>) -> Self {
        Self::new(Bytes::new(), status)
    }

    /// Parse a response from raw bytes (payload followed by SW1 SW2)
    pub fn from_bytes(raw: &[u8]) -> Result<Self, ResponseError> {
        if raw.len() < 2 {
            return Err(ResponseError::TooShort(raw.len()));
        }

        let (payload, sw) = raw.split_at(raw.len() - 2);
        let status = StatusWord::new(sw[0], sw[1]);

        trace!(
            sw1 = format_args!("{:#04x}", status.sw1),
            sw2 = format_args!("{:#04x}", status.sw2),
            payload_len = payload.len(),
            "Parsed APDU response"
        );

        Ok(Self {
            data: Bytes::copy_from_slice(payload),
            status,
        })
    }

    /// Get the response payload data
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Get the status word
    pub const fn status(&self) -> StatusWord {
        self.status
    }

    /// Get the status word as a tuple (SW1, SW2)
    pub const fn status_tuple(&self) -> (u8, u8) {
        (self.status.sw1, self.status.sw2)
    }

    /// Check if the response indicates success (90 00)
    pub const fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Consume the response, returning the payload on success and the
    /// status word otherwise
    pub fn into_data_result(self) -> Result<Bytes, StatusWord> {
        if self.is_success() {
            Ok(self.data)
        } else {
            Err(self.status)
        }
    }
}

impl TryFrom<&[u8]> for Response {
    type Error = ResponseError;

    fn try_from(raw: &[u8]) -> Result<Self, ResponseError> {
        Self::from_bytes(raw)
    }
}

impl From<Response> for Bytes {
    fn from(response: Response) -> Self {
        let mut buf = BytesMut::with_capacity(response.data.len() + 2);
        buf.put_slice(&response.data);
        buf.put_u8(response.status.sw1);
        buf.put_u8(response.status.sw2);
        buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_response_creation() {
        let resp = Response::new(Bytes::from_static(&[0x01, 0x02, 0x03]), (0x90, 0x00));
        assert_eq!(resp.data().as_ref(), [0x01, 0x02, 0x03]);
        assert_eq!(resp.status(), StatusWord::new(0x90, 0x00));
        assert!(resp.is_success());
    }

    #[test]
    fn test_response_from_bytes() {
        let resp = Response::from_bytes(&hex!("0102039000")).unwrap();
        assert_eq!(resp.data().as_ref(), hex!("010203"));
        assert!(resp.is_success());

        let resp = Response::from_bytes(&hex!("6A82")).unwrap();
        assert!(resp.data().is_empty());
        assert_eq!(resp.status(), StatusWord::new(0x6A, 0x82));

        assert_eq!(
            Response::from_bytes(&hex!("01")),
            Err(ResponseError::TooShort(1))
        );
        assert_eq!(Response::from_bytes(&[]), Err(ResponseError::TooShort(0)));
    }

    #[test]
    fn test_response_into_result() {
        let ok = Response::success(Bytes::from_static(&hex!("010203")));
        assert_eq!(ok.into_data_result().unwrap().as_ref(), hex!("010203"));

        let err = Response::status_only((0x6A, 0x82));
        assert_eq!(err.into_data_result().unwrap_err().to_u16(), 0x6A82);
    }

    #[test]
    fn test_response_round_trip() {
        let raw = hex!("6F054203040506 9000");
        let resp = Response::from_bytes(&raw).unwrap();
        let out: Bytes = resp.into();
        assert_eq!(out.as_ref(), raw);
    }
}
