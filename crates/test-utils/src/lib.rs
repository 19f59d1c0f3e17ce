//! This crate provides test-utilities shared by the crates of the peg.
//!
//! These utilities are mostly used to generate arbitrary Bitcoin values and deterministic
//! committees for testing purposes.

pub mod bitcoin;
pub mod bridge_fixtures;
pub mod prelude;
