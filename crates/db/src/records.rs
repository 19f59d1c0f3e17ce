//! Sent condensing transactions.

use bitcoin::Txid;

use crate::{errors::DbResult, models::BitcoinTransactionRecord};

/// Access to the records of finalized transactions, keyed by txid.
pub trait TransactionRecordDb {
    /// Stores a finalized transaction.
    fn insert_record(&mut self, record: BitcoinTransactionRecord) -> DbResult<()>;

    /// Looks up a finalized transaction.
    fn get_record(&self, txid: &Txid) -> Option<&BitcoinTransactionRecord>;

    /// All finalized transactions that are neither issued nor reverted, oldest first.
    fn pending_records(&self) -> Vec<&BitcoinTransactionRecord>;

    /// Deletes a finalized transaction.
    fn remove_record(&mut self, txid: &Txid) -> DbResult<BitcoinTransactionRecord>;
}
