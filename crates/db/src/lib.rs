//! Storage of the bridge state.
//!
//! Every table is exposed through a synchronous trait so that the bridge can be embedded into the
//! host chain's own state storage. [`inmemory::InMemoryBridgeDb`] implements all of them on top of
//! ordered maps.

pub mod confirmations;
pub mod errors;
pub mod inmemory;
pub mod ledger;
pub mod models;
pub mod proposals;
pub mod pw_chain;
pub mod records;
pub mod sequence;

use confirmations::ConfirmationDb;
use ledger::LedgerDb;
use proposals::ProposalDb;
use pw_chain::PrimaryWalletDb;
use records::TransactionRecordDb;

/// Every table the bridge needs.
pub trait BridgeDb:
    LedgerDb + PrimaryWalletDb + ConfirmationDb + TransactionRecordDb + ProposalDb
{
}

impl<T> BridgeDb for T where
    T: LedgerDb + PrimaryWalletDb + ConfirmationDb + TransactionRecordDb + ProposalDb
{
}
