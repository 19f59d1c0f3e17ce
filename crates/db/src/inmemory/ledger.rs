use bitcoin::{Amount, OutPoint, ScriptBuf};
use btc_peg_primitives::types::{AccountId, UtxoId, VoutId};
use tracing::debug;

use super::{vin_index_key, InMemoryBridgeDb};
use crate::{
    errors::{DbError, DbResult},
    ledger::LedgerDb,
    models::{InfoForVin, InfoForVout},
};

impl InMemoryBridgeDb {
    fn update_vin(&mut self, id: &UtxoId, update: impl FnOnce(&mut InfoForVin)) -> DbResult<()> {
        let vin = self
            .vins
            .get_mut(id)
            .ok_or_else(|| DbError::NotFound(format!("vin {id}")))?;

        let removed = self.vin_index.remove(&vin_index_key(vin));
        debug_assert!(removed, "every vin must be indexed");

        update(vin);
        self.vin_index.insert(vin_index_key(vin));

        Ok(())
    }

    fn update_vout(&mut self, id: &VoutId, used: bool) -> DbResult<()> {
        let vout = self
            .vouts
            .get_mut(id)
            .ok_or_else(|| DbError::NotFound(format!("vout {id}")))?;
        vout.used = used;

        Ok(())
    }
}

impl LedgerDb for InMemoryBridgeDb {
    fn insert_vin(
        &mut self,
        owner: AccountId,
        outpoint: OutPoint,
        amount: Amount,
        address: String,
        script: ScriptBuf,
    ) -> DbResult<InfoForVin> {
        let id = UtxoId::from_outpoint(&outpoint);
        if self.vins.contains_key(&id) {
            return Err(DbError::DuplicateEntry(format!("vin {outpoint}")));
        }

        let vin = InfoForVin {
            id,
            seq: self.vin_seq.next_id(),
            owner,
            outpoint,
            amount,
            address,
            script,
            used: false,
            resend: false,
        };
        debug!(%id, %outpoint, %amount, seq = vin.seq, "inserted vin");

        self.vin_index.insert(vin_index_key(&vin));
        self.vins.insert(id, vin.clone());

        Ok(vin)
    }

    fn get_vin(&self, id: &UtxoId) -> Option<&InfoForVin> {
        self.vins.get(id)
    }

    fn get_info_for_vins(&self, limit: usize) -> Vec<InfoForVin> {
        self.vin_index
            .iter()
            .take_while(|(used, ..)| !used)
            .take(limit)
            .map(|(.., id)| self.vins[id].clone())
            .collect()
    }

    fn mark_vin_used(&mut self, id: &UtxoId) -> DbResult<()> {
        self.update_vin(id, |vin| vin.used = true)
    }

    fn mark_vin_unused(&mut self, id: &UtxoId, resend: bool) -> DbResult<()> {
        self.update_vin(id, |vin| {
            vin.used = false;
            vin.resend = resend;
        })
    }

    fn remove_vin(&mut self, id: &UtxoId) -> DbResult<InfoForVin> {
        let vin = self
            .vins
            .remove(id)
            .ok_or_else(|| DbError::NotFound(format!("vin {id}")))?;
        self.vin_index.remove(&vin_index_key(&vin));

        Ok(vin)
    }

    fn insert_vout(&mut self, payer: AccountId, address: String, amount: Amount) -> InfoForVout {
        let vout = InfoForVout {
            id: self.vout_seq.next_id(),
            payer,
            address,
            amount,
            used: false,
        };
        debug!(id = vout.id, %payer, %amount, "inserted vout");

        self.vouts.insert(vout.id, vout.clone());

        vout
    }

    fn get_vout(&self, id: &VoutId) -> Option<&InfoForVout> {
        self.vouts.get(id)
    }

    fn get_info_for_vouts(&self, limit: usize) -> Vec<InfoForVout> {
        self.vouts
            .values()
            .filter(|vout| !vout.used)
            .take(limit)
            .cloned()
            .collect()
    }

    fn mark_vout_used(&mut self, id: &VoutId) -> DbResult<()> {
        self.update_vout(id, true)
    }

    fn mark_vout_unused(&mut self, id: &VoutId) -> DbResult<()> {
        self.update_vout(id, false)
    }

    fn remove_vout(&mut self, id: &VoutId) -> DbResult<InfoForVout> {
        self.vouts
            .remove(id)
            .ok_or_else(|| DbError::NotFound(format!("vout {id}")))
    }
}
