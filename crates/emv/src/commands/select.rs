//! SELECT command
//!
//! Selects an application or directory file by its DF name (for
//! applications, the AID).

use bytes::Bytes;
use chipflow_apdu_core::Command;

use crate::constants::{PPSE_NAME, PSE_NAME, cla, ins, select_p1};

/// SELECT by DF name
pub fn select_by_df_name(name: &[u8]) -> Command {
    Command::new_with_data_and_le(
        cla::ISO7816,
        ins::SELECT,
        select_p1::BY_NAME,
        0x00,
        Bytes::copy_from_slice(name),
        0x00,
    )
}

/// SELECT the contact Payment System Environment (`1PAY.SYS.DDF01`)
pub fn select_pse() -> Command {
    select_by_df_name(PSE_NAME)
}

/// SELECT the contactless Proximity Payment System Environment
/// (`2PAY.SYS.DDF01`)
pub fn select_ppse() -> Command {
    select_by_df_name(PPSE_NAME)
}
