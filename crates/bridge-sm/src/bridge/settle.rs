//! Settling sent transactions: confirmation tracking, issuing, reverting and proposal expiry.

use std::collections::BTreeSet;

use bitcoin::{Amount, Txid};
use btc_peg_db::{errors::DbError, BridgeDb};
use btc_peg_primitives::types::{ProposalId, UtxoId};
use tracing::{debug, info, warn};

use super::{BridgeOutput, SidechainBridge};
use crate::{
    errors::{BridgeError, BridgeResult},
    host::BridgeHost,
    send::{events::SendProposalEvent, machine::SendProposalSM},
    state_machine::StateMachine,
};

impl<Db: BridgeDb, Host: BridgeHost> SidechainBridge<Db, Host> {
    /// Runs `event` on a copy of the proposal's state machine.
    ///
    /// Returns [`None`] if the state machine is no longer held in memory. Nothing is committed
    /// until the caller hands the copy back through [`Self::commit_sm`].
    fn try_event(
        &self,
        proposal_id: ProposalId,
        event: SendProposalEvent,
    ) -> BridgeResult<Option<SendProposalSM>> {
        let Some(sm) = self.proposals.get(&proposal_id) else {
            debug!(%proposal_id, %event, "no state machine for proposal");
            return Ok(None);
        };

        let mut sm = sm.clone();
        let cfg = self.sm_cfg();
        sm.process_event(cfg, event)
            .map_err(|e| BridgeError::from_proposal(proposal_id, e))?;

        Ok(Some(sm))
    }

    fn commit_sm(&mut self, sm: Option<SendProposalSM>) {
        if let Some(sm) = sm {
            self.proposals.insert(sm.context.proposal_id, sm);
        }
    }

    pub(super) fn record_confirmations(
        &mut self,
        txid: Txid,
        confirmations: u32,
        spent_elsewhere: BTreeSet<UtxoId>,
    ) -> BridgeResult<BridgeOutput> {
        let proposal_id = self
            .db
            .get_record(&txid)
            .map(|record| record.proposal_id)
            .ok_or(BridgeError::UnknownTransaction(txid))?;
        let sm = self.try_event(
            proposal_id,
            SendProposalEvent::ConfirmationsObserved { confirmations },
        )?;

        self.db.set_confirmations(&txid, confirmations)?;
        if !spent_elsewhere.is_empty() {
            warn!(%txid, spent = spent_elsewhere.len(), "deposits spent by another transaction");
            self.db.invalidate_vins(&txid, &spent_elsewhere)?;
        }
        self.commit_sm(sm);

        debug!(%txid, %confirmations, "recorded confirmations");

        Ok(BridgeOutput::ConfirmationsRecorded {
            txid,
            confirmations,
        })
    }

    pub(super) fn issue_deposits(&mut self, txid: Txid) -> BridgeResult<BridgeOutput> {
        let record = self
            .db
            .get_record(&txid)
            .cloned()
            .ok_or(BridgeError::UnknownTransaction(txid))?;

        let have = self
            .db
            .find_confirmations(&txid)
            .map_or(0, |entry| entry.confirmations);
        let need = self.params.required_confirmations;
        if have < need {
            return Err(BridgeError::NotEnoughConfirmations { txid, have, need });
        }

        let sm = self.try_event(record.proposal_id, SendProposalEvent::Issued)?;

        let entries = (record.vins.len() + record.vouts.len()).max(1) as u64;
        let fee_share = record.fee / entries;
        let credited: Vec<_> = record
            .vins
            .iter()
            .map(|id| {
                let vin = self
                    .db
                    .get_vin(id)
                    .expect("deposits of a sent transaction stay in the ledger");
                let amount = vin.amount.checked_sub(fee_share).unwrap_or(Amount::ZERO);

                (vin.owner, amount)
            })
            .filter(|(_, amount)| *amount > Amount::ZERO)
            .collect();

        let asset = self.params.peg_asset_id;
        for (owner, amount) in &credited {
            self.host.credit(*owner, asset, *amount)?;
        }

        for id in &record.vins {
            self.db
                .remove_vin(id)
                .expect("deposits of a sent transaction stay in the ledger");
        }
        for id in &record.vouts {
            self.db
                .remove_vout(id)
                .expect("withdrawals of a sent transaction stay in the ledger");
        }
        self.db
            .remove_record(&txid)
            .expect("record was just looked up");
        self.db
            .remove_confirmations(&txid)
            .expect("records and confirmation entries are created together");

        match (record.pw_vout, record.pw_vin) {
            (Some(seq), _) => tolerate_missing(self.db.confirm_pw_vout(seq), txid),
            (None, Some(id)) => {
                if let Some(seq) = self.db.pw_vout_by_id(&id).map(|vout| vout.seq) {
                    tolerate_missing(self.db.remove_pw_vout(seq).map(|_| ()), txid);
                }
            }
            (None, None) => {}
        }
        self.commit_sm(sm);

        info!(%txid, deposits = credited.len(), %fee_share, "issued deposits");

        Ok(BridgeOutput::Issued { txid, credited })
    }

    pub(super) fn revert_transaction(&mut self, txid: Txid) -> BridgeResult<BridgeOutput> {
        let record = self
            .db
            .get_record(&txid)
            .cloned()
            .ok_or(BridgeError::RevertOfUnknownTransaction(txid))?;
        let valid_vins = self
            .db
            .find_confirmations(&txid)
            .map(|entry| entry.valid_vins.clone())
            .expect("records and confirmation entries are created together");

        let sm = self.try_event(record.proposal_id, SendProposalEvent::Reverted)?;

        let (restored, dropped): (Vec<_>, Vec<_>) =
            record.vins.iter().copied().partition(|id| valid_vins.contains(id));
        for id in &restored {
            self.db
                .mark_vin_unused(id, true)
                .expect("deposits of a sent transaction stay in the ledger");
        }
        for id in &dropped {
            self.db
                .remove_vin(id)
                .expect("deposits of a sent transaction stay in the ledger");
        }
        for id in &record.vouts {
            self.db
                .mark_vout_unused(id)
                .expect("withdrawals of a sent transaction stay in the ledger");
        }

        let spent_seq = record
            .pw_vin
            .and_then(|id| self.db.pw_vout_by_id(&id).map(|vout| vout.seq));
        match (spent_seq, record.pw_vout) {
            (Some(seq), _) => {
                let dropped_tail = self.db.rollback_pw_after(seq);
                tolerate_missing(self.db.set_pw_vout_used(seq, false), txid);
                debug!(%txid, %seq, dropped = dropped_tail.len(), "rolled back primary wallet");
            }
            // The revert of an ancestor already rolled the chain back past our change. Newer
            // elements spend the restored tail and are not ours to drop.
            (None, Some(seq)) if record.pw_vin.is_some() => {
                warn!(%txid, "spent primary wallet output is gone");
                tolerate_missing(self.db.remove_pw_vout(seq).map(|_| ()), txid);
            }
            (None, Some(seq)) => {
                let dropped_tail = self.db.rollback_pw_after(seq);
                tolerate_missing(self.db.remove_pw_vout(seq).map(|_| ()), txid);
                debug!(%txid, %seq, dropped = dropped_tail.len(), "dropped primary wallet change");
            }
            (None, None) => {}
        }

        self.db
            .remove_record(&txid)
            .expect("record was just looked up");
        self.db
            .remove_confirmations(&txid)
            .expect("records and confirmation entries are created together");
        self.commit_sm(sm);

        info!(%txid, restored = restored.len(), dropped = dropped.len(), "reverted transaction");

        Ok(BridgeOutput::Reverted {
            txid,
            restored,
            dropped,
        })
    }

    pub(super) fn expire_proposal(&mut self, proposal_id: ProposalId) -> BridgeResult<BridgeOutput> {
        if !self.proposals.contains_key(&proposal_id) {
            return Err(BridgeError::UnknownProposal(proposal_id));
        }
        let sm = self.try_event(proposal_id, SendProposalEvent::Expired)?;

        self.db
            .remove_proposal(&proposal_id)
            .expect("pending proposals are stored");
        self.commit_sm(sm);

        info!(%proposal_id, "send proposal expired");

        Ok(BridgeOutput::ProposalExpired { proposal_id })
    }
}

/// The primary wallet chain may already have been rolled back by the revert of an ancestor.
fn tolerate_missing(result: Result<(), DbError>, txid: Txid) {
    match result {
        Ok(()) => {}
        Err(DbError::NotFound(what)) => warn!(%txid, %what, "primary wallet output already gone"),
        Err(e) => panic!("primary wallet chain is inconsistent: {e}"),
    }
}
