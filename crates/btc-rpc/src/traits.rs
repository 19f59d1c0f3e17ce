//! The subset of the Bitcoin node RPC the bridge relies on.

use async_trait::async_trait;
use bitcoin::{Block, BlockHash, Txid};

/// What the node knows about a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    /// The transaction is in the mempool (zero) or in the chain.
    Seen {
        /// Number of blocks including and on top of the including block.
        confirmations: u32,
    },

    /// The node has no record of the transaction.
    ///
    /// Requires the node to index transactions, otherwise confirmed transactions look missing.
    Missing,
}

impl TxStatus {
    /// The confirmation count, zero if the transaction is missing.
    pub const fn confirmations(&self) -> u32 {
        match self {
            Self::Seen { confirmations } => *confirmations,
            Self::Missing => 0,
        }
    }
}

/// Read and broadcast access to a Bitcoin node.
///
/// Failures are not reported: every method returns [`None`] instead, so that callers simply retry
/// on their next poll.
#[async_trait]
pub trait BitcoinRpc: Send + Sync {
    /// Relays a consensus-encoded transaction and returns its txid if the node accepted it.
    async fn send_raw_transaction(&self, tx_hex: &str) -> Option<Txid>;

    /// The status of `txid`, [`None`] if the node could not be asked.
    async fn get_tx_status(&self, txid: &Txid) -> Option<TxStatus>;

    /// The fee rate needed to confirm within `blocks` blocks, in sats/kvB.
    async fn estimate_smart_fee(&self, blocks: u16) -> Option<u64>;

    /// The full block with the given hash.
    async fn get_full_block(&self, hash: &BlockHash) -> Option<Block>;
}
