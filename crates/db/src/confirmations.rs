//! Confirmation tracking of sent transactions.

use std::collections::BTreeSet;

use bitcoin::Txid;
use btc_peg_primitives::types::UtxoId;

use crate::{errors::DbResult, models::BitcoinTransactionConfirmations};

/// Access to the confirmation entries, keyed by txid.
///
/// Entries are only removed when their transaction is issued or reverted.
pub trait ConfirmationDb {
    /// Starts tracking `txid` with zero confirmations.
    fn insert_confirmations(
        &mut self,
        txid: Txid,
        valid_vins: BTreeSet<UtxoId>,
    ) -> DbResult<BitcoinTransactionConfirmations>;

    /// Looks up the entry of `txid`.
    fn find_confirmations(&self, txid: &Txid) -> Option<&BitcoinTransactionConfirmations>;

    /// Records the latest observed confirmation count.
    fn set_confirmations(&mut self, txid: &Txid, confirmations: u32) -> DbResult<()>;

    /// Removes the given deposits from the set that may be restored on revert.
    ///
    /// Identifiers that are dropped are never added back.
    fn invalidate_vins(&mut self, txid: &Txid, ids: &BTreeSet<UtxoId>) -> DbResult<()>;

    /// Stops tracking `txid`.
    fn remove_confirmations(&mut self, txid: &Txid) -> DbResult<BitcoinTransactionConfirmations>;
}
