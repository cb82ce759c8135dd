//! EMV transaction session engine
//!
//! This crate drives the command/response exchange of an EMV payment
//! transaction over any [`CardTransport`]: application discovery through
//! the payment system environments, application selection, processing
//! initiation (GET PROCESSING OPTIONS), record reading and the
//! transaction-completion exchange.
//!
//! The main entry point is [`EmvSession`], which owns one [`SmartCard`]
//! aggregate and one transport for its whole lifetime and walks them
//! through the standardized step sequence:
//!
//! ```text
//! start_session -> init_context -> select_application
//!   -> initiate_application_processing -> read_application_data
//!   -> prepare_transaction_processing -> perform_transaction
//! ```
//!
//! Every step transmits one or more APDUs, decodes the BER-TLV reply,
//! classifies the status word and either advances or fails with a typed
//! error; invoking a step out of order is an error, never a silent skip.
//!
//! [`emulator::CardEmulator`] provides a scripted virtual card satisfying
//! the same transport contract, for tests and demos.
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

pub mod commands;
pub mod constants;
pub mod dol;
pub mod emulator;

mod card;
mod error;
mod session;
mod types;

pub use card::{EmvApplication, SmartCard};
pub use dol::{DataObjectList, DolEntry};
pub use error::{Error, Result};
pub use session::{EmvSession, PinVerification, TransactionPath};
pub use types::{AflEntry, ApplicationFileLocator, ApplicationInterchangeProfile};

// Re-export the layer crates' common types for convenience
pub use chipflow_apdu_core::{CardTransport, Command, Response, StatusWord, TransportError};
pub use chipflow_iso7816::{Aid, Atr, Rid, TlvError, ber};
