//! EMV command APDU builders
//!
//! One module per command; every builder returns a ready-to-transmit
//! [`Command`](chipflow_apdu_core::Command). The session layer consumes
//! only their serialized bytes.

mod generate_ac;
mod get_data;
mod get_processing_options;
mod read_record;
mod select;
mod verify;

pub use generate_ac::{CryptogramType, generate_ac};
pub use get_data::get_data;
pub use get_processing_options::get_processing_options;
pub use read_record::read_record;
pub use select::{select_by_df_name, select_ppse, select_pse};
pub use verify::verify_pin;

pub(crate) use verify::plaintext_pin_block;
