use std::collections::BTreeSet;

use bitcoin::Txid;
use btc_peg_primitives::types::UtxoId;
use tracing::debug;

use super::InMemoryBridgeDb;
use crate::{
    confirmations::ConfirmationDb,
    errors::{DbError, DbResult},
    models::{BitcoinTransactionConfirmations, BitcoinTransactionRecord},
    records::TransactionRecordDb,
};

impl InMemoryBridgeDb {
    fn confirmations_mut(&mut self, txid: &Txid) -> DbResult<&mut BitcoinTransactionConfirmations> {
        self.confirmations
            .get_mut(txid)
            .ok_or_else(|| DbError::NotFound(format!("confirmations of {txid}")))
    }
}

impl ConfirmationDb for InMemoryBridgeDb {
    fn insert_confirmations(
        &mut self,
        txid: Txid,
        valid_vins: BTreeSet<UtxoId>,
    ) -> DbResult<BitcoinTransactionConfirmations> {
        if self.confirmations.contains_key(&txid) {
            return Err(DbError::DuplicateEntry(format!("confirmations of {txid}")));
        }

        let entry = BitcoinTransactionConfirmations {
            txid,
            confirmations: 0,
            valid_vins,
        };
        self.confirmations.insert(txid, entry.clone());

        Ok(entry)
    }

    fn find_confirmations(&self, txid: &Txid) -> Option<&BitcoinTransactionConfirmations> {
        self.confirmations.get(txid)
    }

    fn set_confirmations(&mut self, txid: &Txid, confirmations: u32) -> DbResult<()> {
        self.confirmations_mut(txid)?.confirmations = confirmations;

        Ok(())
    }

    fn invalidate_vins(&mut self, txid: &Txid, ids: &BTreeSet<UtxoId>) -> DbResult<()> {
        let entry = self.confirmations_mut(txid)?;
        entry.valid_vins.retain(|id| !ids.contains(id));
        debug!(%txid, remaining = entry.valid_vins.len(), "invalidated vins");

        Ok(())
    }

    fn remove_confirmations(&mut self, txid: &Txid) -> DbResult<BitcoinTransactionConfirmations> {
        self.confirmations
            .remove(txid)
            .ok_or_else(|| DbError::NotFound(format!("confirmations of {txid}")))
    }
}

impl TransactionRecordDb for InMemoryBridgeDb {
    fn insert_record(&mut self, record: BitcoinTransactionRecord) -> DbResult<()> {
        if self.records.contains_key(&record.txid) {
            return Err(DbError::DuplicateEntry(format!("record of {}", record.txid)));
        }
        self.records.insert(record.txid, record);

        Ok(())
    }

    fn get_record(&self, txid: &Txid) -> Option<&BitcoinTransactionRecord> {
        self.records.get(txid)
    }

    fn pending_records(&self) -> Vec<&BitcoinTransactionRecord> {
        let mut records: Vec<_> = self.records.values().collect();
        records.sort_by_key(|record| (record.sent_at, record.proposal_id));

        records
    }

    fn remove_record(&mut self, txid: &Txid) -> DbResult<BitcoinTransactionRecord> {
        self.records
            .remove(txid)
            .ok_or_else(|| DbError::NotFound(format!("record of {txid}")))
    }
}
