//! BER-TLV codec and ISO/IEC 7816 identifier types
//!
//! Every data object a smart card returns is encoded as BER-TLV
//! (tag-length-value, ISO/IEC 7816-4 annex D): a tag of one or more bytes,
//! a short- or long-form length, and exactly that many value bytes, nested
//! arbitrarily. This crate provides:
//!
//! - [`ber`]: the codec: [`ber::Tag`], [`ber::Tlv`] and the
//!   [`ber::TlvReader`] cursor. Decoding preserves the exact length
//!   encoding so that re-encoding any parsed node is byte-identical to the
//!   input; constructed nodes re-scan their value bytes on demand instead
//!   of materializing a tree.
//! - [`Aid`] / [`Rid`]: application and registered-provider identifiers.
//! - [`Atr`]: the Answer-To-Reset byte sequence a card emits on activation.
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

pub mod ber;

mod aid;
mod atr;
mod error;

pub use aid::{Aid, Rid};
pub use atr::Atr;
pub use error::{IdentifierError, TlvError};
