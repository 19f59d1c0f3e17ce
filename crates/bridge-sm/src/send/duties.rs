//! The duties emitted by a send proposal.

use bitcoin::{Transaction, Txid};

/// The duties that need to be performed outside of the host chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendProposalDuty {
    /// Relay the fully signed transaction to the Bitcoin network.
    BroadcastTransaction {
        /// The txid of the transaction.
        txid: Txid,
        /// The transaction to relay.
        tx: Transaction,
    },
}
