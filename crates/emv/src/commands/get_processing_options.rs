//! GET PROCESSING OPTIONS command
//!
//! Begins application processing; the data field carries the
//! PDOL-derived terminal data wrapped in the command template (tag 83),
//! built by [`crate::dol::gpo_data`].

use bytes::Bytes;
use chipflow_apdu_core::Command;

use crate::constants::{cla, ins};

/// GET PROCESSING OPTIONS with the given command-template data
pub fn get_processing_options(data: impl Into<Bytes>) -> Command {
    Command::new_with_data_and_le(
        cla::PROPRIETARY,
        ins::GET_PROCESSING_OPTIONS,
        0x00,
        0x00,
        data,
        0x00,
    )
}
