//! The deposit and withdrawal tables.

use bitcoin::{Amount, OutPoint, ScriptBuf};
use btc_peg_primitives::types::{AccountId, UtxoId, VoutId};

use crate::{
    errors::DbResult,
    models::{InfoForVin, InfoForVout},
};

/// Access to the deposits ("vins") and withdrawal requests ("vouts") of the bridge.
pub trait LedgerDb {
    /// Records a new deposit.
    ///
    /// Fails with [`DbError::DuplicateEntry`](crate::errors::DbError::DuplicateEntry) if the
    /// outpoint is already known.
    fn insert_vin(
        &mut self,
        owner: AccountId,
        outpoint: OutPoint,
        amount: Amount,
        address: String,
        script: ScriptBuf,
    ) -> DbResult<InfoForVin>;

    /// Looks up a deposit.
    fn get_vin(&self, id: &UtxoId) -> Option<&InfoForVin>;

    /// Up to `limit` unused deposits, resent ones first, then in insertion order.
    fn get_info_for_vins(&self, limit: usize) -> Vec<InfoForVin>;

    /// Flags the deposit as spent by a sent transaction.
    fn mark_vin_used(&mut self, id: &UtxoId) -> DbResult<()>;

    /// Makes the deposit spendable again.
    fn mark_vin_unused(&mut self, id: &UtxoId, resend: bool) -> DbResult<()>;

    /// Deletes the deposit.
    fn remove_vin(&mut self, id: &UtxoId) -> DbResult<InfoForVin>;

    /// Records a new withdrawal request.
    fn insert_vout(&mut self, payer: AccountId, address: String, amount: Amount) -> InfoForVout;

    /// Looks up a withdrawal request.
    fn get_vout(&self, id: &VoutId) -> Option<&InfoForVout>;

    /// Up to `limit` unused withdrawal requests in insertion order.
    fn get_info_for_vouts(&self, limit: usize) -> Vec<InfoForVout>;

    /// Flags the withdrawal as paid by a sent transaction.
    fn mark_vout_used(&mut self, id: &VoutId) -> DbResult<()>;

    /// Makes the withdrawal payable again.
    fn mark_vout_unused(&mut self, id: &VoutId) -> DbResult<()>;

    /// Deletes the withdrawal request.
    fn remove_vout(&mut self, id: &VoutId) -> DbResult<InfoForVout>;
}
