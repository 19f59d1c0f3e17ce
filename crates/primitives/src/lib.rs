//! This crate contains general types and pure functions for the Bitcoin side of the peg that need
//! to be shared across multiple crates.
//!
//! It lies at the bottom of the crate-hierarchy in this workspace i.e., it does not depend on any
//! other crate in this workspace. Everything in here is deterministic: given the same inputs, every
//! witness in the committee computes byte-identical scripts, addresses and encodings.

pub mod address;
pub mod codec;
pub mod committee;
pub mod errors;
pub mod multisig;
pub mod script;
pub mod types;

#[cfg(test)]
mod test_utils;
