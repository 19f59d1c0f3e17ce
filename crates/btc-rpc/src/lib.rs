//! The node-side link between the bridge and a Bitcoin node.
//!
//! Nothing in this crate mutates bridge state. It relays finalized transactions, and turns what it
//! observes on Bitcoin into [`BridgeOperation`](btc_peg_bridge_sm::bridge::BridgeOperation)s that
//! the host submits like any other operation.

pub mod client;
pub mod errors;
pub mod poller;
pub mod traits;
