//! This crate contains the consensus-critical parameters that dictate the behavior of the bridge in
//! a way that ensures that every witness builds and verifies the same Bitcoin transactions.
//!
//! It also holds the configuration of the process that talks to the external Bitcoin node, which is
//! not consensus-critical.

pub mod bridge;
mod default;
pub mod errors;
pub mod prelude;
pub mod rpc;
