//! Default values for the bridge parameters.

use bitcoin::{Amount, Network};

/// The network the bridge operates on.
pub(crate) const NETWORK: Network = Network::Bitcoin;

/// The sidechain asset that represents pegged BTC.
pub(crate) const PEG_ASSET_ID: u64 = 1;

/// The default min relay fee as defined in bitcoin-core.
///
/// This is the lower bound of the fee paid by any condensing transaction regardless of its size.
pub const MIN_RELAY_FEE: Amount = Amount::from_sat(1_000);

/// The fee rate used when the node's estimate is unavailable or lower, in sats/kvB.
pub const DEFAULT_FEE_RATE_SAT_PER_KVB: u64 = 10_000;

/// The share of every withdrawal that is paid to the committee, in basis points (1% = 100).
pub const WITNESS_FEE_BP: u64 = 100;

/// Maximum number of deposit UTXOs spent by one condensing transaction.
pub(crate) const VIN_LIMIT: usize = 20;

/// Maximum number of withdrawals paid by one condensing transaction.
pub(crate) const VOUT_LIMIT: usize = 20;

/// Maximum number of unconfirmed change outputs the primary wallet may chain.
pub const MAX_UNCONFIRMED_PW_VOUTS: usize = 1;

/// Number of confirmations after which deposits are credited.
pub const REQUIRED_CONFIRMATIONS: u32 = 6;

/// Seconds after which a sent transaction with no confirmations is reverted.
pub(crate) const REVERT_TIMEOUT_SECS: u64 = 24 * 60 * 60;

/// Target number of blocks for `estimatesmartfee`.
pub(crate) const FEE_ESTIMATE_BLOCKS: u16 = 6;

/// Default endpoint of the bitcoin-core JSON-RPC server.
pub(crate) const RPC_URL: &str = "http://127.0.0.1:8332";

/// Seconds after which an RPC request is abandoned.
pub(crate) const RPC_TIMEOUT_SECS: u64 = 30;

/// Seconds between two confirmation polls.
pub(crate) const POLL_INTERVAL_SECS: u64 = 60;
