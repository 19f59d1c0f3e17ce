use bitcoin::{Amount, OutPoint, ScriptBuf};
use btc_peg_primitives::types::UtxoId;
use tracing::{debug, info};

use super::InMemoryBridgeDb;
use crate::{
    errors::{DbError, DbResult},
    models::PrimaryWalletVout,
    pw_chain::PrimaryWalletDb,
};

impl PrimaryWalletDb for InMemoryBridgeDb {
    fn append_pw_vout(
        &mut self,
        outpoint: OutPoint,
        amount: Amount,
        address: String,
        script: ScriptBuf,
    ) -> DbResult<PrimaryWalletVout> {
        let id = UtxoId::from_outpoint(&outpoint);
        if self.pw_vout_by_id(&id).is_some() {
            return Err(DbError::DuplicateEntry(format!("pw vout {outpoint}")));
        }

        let vout = PrimaryWalletVout {
            seq: self.pw_seq.next_id(),
            id,
            outpoint,
            amount,
            address,
            script,
            confirmed: false,
            used: false,
        };
        debug!(seq = vout.seq, %outpoint, %amount, "appended pw vout");

        self.pw_chain.insert(vout.seq, vout.clone());

        Ok(vout)
    }

    fn pw_tail(&self) -> Option<&PrimaryWalletVout> {
        self.pw_chain.values().next_back()
    }

    fn pw_vout(&self, seq: u64) -> Option<&PrimaryWalletVout> {
        self.pw_chain.get(&seq)
    }

    fn pw_vout_by_id(&self, id: &UtxoId) -> Option<&PrimaryWalletVout> {
        self.pw_chain.values().find(|vout| &vout.id == id)
    }

    fn previous_pw_vout(&self, seq: u64) -> Option<&PrimaryWalletVout> {
        self.pw_chain.range(..seq).next_back().map(|(_, vout)| vout)
    }

    fn confirm_pw_vout(&mut self, seq: u64) -> DbResult<()> {
        let vout = self
            .pw_chain
            .get_mut(&seq)
            .ok_or_else(|| DbError::NotFound(format!("pw vout {seq}")))?;
        vout.confirmed = true;

        if let Some(previous) = self.previous_pw_vout(seq).map(|vout| vout.seq) {
            self.pw_chain.remove(&previous);
            debug!(%seq, %previous, "confirmed pw vout and dropped its predecessor");
        }

        Ok(())
    }

    fn set_pw_vout_used(&mut self, seq: u64, used: bool) -> DbResult<()> {
        let vout = self
            .pw_chain
            .get_mut(&seq)
            .ok_or_else(|| DbError::NotFound(format!("pw vout {seq}")))?;
        vout.used = used;

        Ok(())
    }

    fn remove_pw_vout(&mut self, seq: u64) -> DbResult<PrimaryWalletVout> {
        self.pw_chain
            .remove(&seq)
            .ok_or_else(|| DbError::NotFound(format!("pw vout {seq}")))
    }

    fn rollback_pw_after(&mut self, seq: u64) -> Vec<PrimaryWalletVout> {
        let Some(first_removed) = seq.checked_add(1) else {
            return Vec::new();
        };

        let removed: Vec<_> = self
            .pw_chain
            .split_off(&first_removed)
            .into_values()
            .collect();
        if !removed.is_empty() {
            info!(after = %seq, count = removed.len(), "rolled back pw chain");
        }

        removed
    }

    fn unconfirmed_pw_count(&self) -> usize {
        self.pw_chain.values().filter(|vout| !vout.confirmed).count()
    }
}
