//! The lifecycle of a condensing transaction proposal.
//!
//! This module handles the following:
//!
//! - Building and independently verifying proposals against the ledger.
//! - Collecting one signature per input from each approving witness.
//! - Assembling the final witnesses once the committee threshold is reached.
//! - Tracking the signed transaction until it is issued or reverted.

pub mod duties;
pub mod errors;
pub mod events;
pub mod machine;
pub mod proposal;
pub mod state;
