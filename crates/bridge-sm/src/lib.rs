//! This crate implements the sidechain half of the peg.
//!
//! [`bridge::SidechainBridge`] applies the operations submitted to the host chain in block order.
//! Each send proposal is tracked by a [`send::machine::SendProposalSM`], which collects the
//! committee's signatures and emits the duty to relay the finalized transaction.

pub mod bridge;
pub mod errors;
pub mod host;
pub mod send;
pub mod state_machine;

#[cfg(test)]
pub(crate) mod testing;
