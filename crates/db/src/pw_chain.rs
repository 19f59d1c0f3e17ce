//! The chain of primary wallet change outputs.
//!
//! Every condensing transaction that has change spends the tail of the chain and appends a new
//! unconfirmed tail. Confirming an element deletes its predecessor; reverting a transaction deletes
//! a contiguous suffix.

use bitcoin::{Amount, OutPoint, ScriptBuf};
use btc_peg_primitives::types::UtxoId;

use crate::{
    errors::DbResult,
    models::{InfoForVin, PrimaryWalletVout},
};

/// Access to the primary wallet change outputs, keyed by their position in the chain.
pub trait PrimaryWalletDb {
    /// Appends a new unconfirmed, unused tail.
    fn append_pw_vout(
        &mut self,
        outpoint: OutPoint,
        amount: Amount,
        address: String,
        script: ScriptBuf,
    ) -> DbResult<PrimaryWalletVout>;

    /// The newest element.
    fn pw_tail(&self) -> Option<&PrimaryWalletVout>;

    /// The element at `seq`.
    fn pw_vout(&self, seq: u64) -> Option<&PrimaryWalletVout>;

    /// The element with the given identifier.
    fn pw_vout_by_id(&self, id: &UtxoId) -> Option<&PrimaryWalletVout>;

    /// The element just before `seq`.
    fn previous_pw_vout(&self, seq: u64) -> Option<&PrimaryWalletVout>;

    /// Marks the element at `seq` confirmed and deletes its predecessor.
    fn confirm_pw_vout(&mut self, seq: u64) -> DbResult<()>;

    /// Sets or clears the `used` flag of the element at `seq`.
    fn set_pw_vout_used(&mut self, seq: u64, used: bool) -> DbResult<()>;

    /// Deletes the element at `seq`.
    fn remove_pw_vout(&mut self, seq: u64) -> DbResult<PrimaryWalletVout>;

    /// Deletes every element newer than `seq` and returns them oldest first.
    fn rollback_pw_after(&mut self, seq: u64) -> Vec<PrimaryWalletVout>;

    /// Number of elements that are not confirmed yet.
    fn unconfirmed_pw_count(&self) -> usize;

    /// The tail as a spendable input.
    ///
    /// Returns [`None`] when the chain is empty, the tail is already spent, or `max_unconfirmed`
    /// change outputs are still waiting for confirmation.
    fn get_info_for_pw_vin(&self, max_unconfirmed: usize) -> Option<InfoForVin> {
        let tail = self.pw_tail()?;
        if tail.used || self.unconfirmed_pw_count() >= max_unconfirmed {
            return None;
        }

        Some(tail.as_vin())
    }
}
