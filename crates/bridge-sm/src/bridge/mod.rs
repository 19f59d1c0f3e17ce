//! The bridge as seen by the host chain.
//!
//! [`SidechainBridge::apply`] is called once per [`BridgeOperation`] in block order. Every
//! operation is validated completely before anything is written, so a rejected operation leaves
//! the bridge untouched.

use std::collections::BTreeMap;

use btc_peg_db::{
    models::{SidechainProposal, SidechainProposalKind, UtxoRef},
    BridgeDb,
};
use btc_peg_params::prelude::BridgeParams;
use btc_peg_primitives::types::{ProposalId, WitnessIdx};
use secp256k1::ecdsa::Signature;
use tracing::{debug, info, warn};

use crate::{
    errors::{BridgeError, BridgeResult},
    host::{BridgeHost, HostError},
    send::{
        events::SendProposalEvent,
        machine::{SendProposalCfg, SendProposalSM, SendProposalCtx},
        proposal::{build_send_proposal, verify_send_proposal, SendProposal},
        state::SendProposalState,
    },
    state_machine::StateMachine,
};

mod ledger;
pub mod operations;
mod settle;

pub use operations::{BridgeOperation, BridgeOutput};

/// The bridge state of one node together with the host services it uses.
#[derive(Debug)]
pub struct SidechainBridge<Db, Host> {
    params: BridgeParams,
    db: Db,
    host: Host,
    proposals: BTreeMap<ProposalId, SendProposalSM>,
}

impl<Db: BridgeDb, Host: BridgeHost> SidechainBridge<Db, Host> {
    /// Creates a bridge over existing tables.
    pub const fn new(params: BridgeParams, db: Db, host: Host) -> Self {
        Self {
            params,
            db,
            host,
            proposals: BTreeMap::new(),
        }
    }

    /// The consensus parameters.
    pub const fn params(&self) -> &BridgeParams {
        &self.params
    }

    /// The bridge tables.
    pub const fn db(&self) -> &Db {
        &self.db
    }

    /// The host services.
    pub const fn host(&self) -> &Host {
        &self.host
    }

    /// Mutable access to the host services.
    pub fn host_mut(&mut self) -> &mut Host {
        &mut self.host
    }

    /// The state machine of a proposal.
    pub fn proposal(&self, proposal_id: &ProposalId) -> Option<&SendProposalSM> {
        self.proposals.get(proposal_id)
    }

    /// Drops the state machines of proposals that can no longer change.
    pub fn prune_settled(&mut self) -> usize {
        let before = self.proposals.len();
        self.proposals.retain(|_, sm| !sm.state().is_terminal());

        before - self.proposals.len()
    }

    /// Builds a proposal from the current ledger for this node to submit.
    pub fn build_proposal(&self, fee_rate: u64) -> BridgeResult<SendProposal> {
        build_send_proposal(&self.db, &self.params, &self.host.committee(), fee_rate)
    }

    fn sm_cfg(&self) -> SendProposalCfg {
        SendProposalCfg {
            skip_broadcast: self.params.skip_broadcast,
        }
    }

    /// Applies one operation.
    pub fn apply(&mut self, op: BridgeOperation) -> BridgeResult<BridgeOutput> {
        let name = op.name();
        let kind = op.kind().map(|kind| kind.to_string());
        debug!(op = name, ?kind, "applying bridge operation");

        let result = match op {
            BridgeOperation::SendTransactionProposal { proposer, proposal } => {
                self.create_proposal(proposer, proposal)
            }
            BridgeOperation::SignTransaction {
                proposal_id,
                witness,
                signatures,
            } => self.sign_proposal(proposal_id, witness, signatures),
            BridgeOperation::IssueDeposits { txid } => self.issue_deposits(txid),
            BridgeOperation::RevertTransaction { txid } => self.revert_transaction(txid),
            BridgeOperation::RegisterDeposit {
                owner,
                outpoint,
                amount,
                address,
                script,
            } => self.register_deposit(owner, outpoint, amount, address, script),
            BridgeOperation::RequestWithdrawal {
                payer,
                address,
                amount,
            } => self.request_withdrawal(payer, address, amount),
            BridgeOperation::ReturnWithdrawal { vout_id } => self.return_withdrawal(vout_id),
            BridgeOperation::RecordConfirmations {
                txid,
                confirmations,
                spent_elsewhere,
            } => self.record_confirmations(txid, confirmations, spent_elsewhere),
            BridgeOperation::ProposalExpired { proposal_id } => self.expire_proposal(proposal_id),
        };

        if let Err(e) = &result {
            warn!(op = name, %e, "rejected bridge operation");
        }

        result
    }

    /// Fails with [`BridgeError::DuplicateUtxoReference`] if a pending proposal holds any of the
    /// entries.
    fn check_reuse(&self, refs: &[UtxoRef]) -> BridgeResult<()> {
        match refs
            .iter()
            .find_map(|utxo_ref| self.db.reserved_by(utxo_ref).map(|holder| (utxo_ref, holder)))
        {
            Some((utxo_ref, holder)) => Err(BridgeError::DuplicateUtxoReference {
                utxo_ref: *utxo_ref,
                proposal_id: Some(holder),
            }),
            None => Ok(()),
        }
    }

    fn create_proposal(
        &mut self,
        proposer: WitnessIdx,
        proposal: SendProposal,
    ) -> BridgeResult<BridgeOutput> {
        let committee = self.host.committee();
        if !committee.is_member(&proposer) {
            return Err(BridgeError::NotCommitteeMember(proposer));
        }

        let condensed = verify_send_proposal(&self.db, &self.params, &committee, &proposal)?;

        let mut refs = proposal.utxo_refs();
        if condensed.change_output.is_some() {
            if condensed.pw_vin.is_none() && self.db.pw_tail().is_some() {
                return Err(BridgeError::PrimaryWalletBusy);
            }
            refs.push(UtxoRef::PrimaryWallet);
        }
        self.check_reuse(&refs)?;

        let kind = SidechainProposalKind::SendBtcTransaction;
        let proposal_id = self.host.create(proposer, kind)?;
        if self.proposals.contains_key(&proposal_id) {
            return Err(HostError(format!("proposal id {proposal_id} was handed out twice")).into());
        }

        self.db.insert_proposal(SidechainProposal { proposal_id, kind })?;
        self.db
            .reserve(proposal_id, &refs)
            .expect("reservations were checked");

        info!(
            %proposal_id,
            %proposer,
            txid = %condensed.txid(),
            vins = condensed.vins.len(),
            vouts = condensed.vouts.len(),
            fee = %condensed.fee,
            "created send proposal"
        );
        self.proposals.insert(
            proposal_id,
            SendProposalSM::new(proposal_id, proposer, condensed, committee),
        );

        Ok(BridgeOutput::ProposalCreated { proposal_id })
    }

    fn sign_proposal(
        &mut self,
        proposal_id: ProposalId,
        witness: WitnessIdx,
        signatures: Vec<Signature>,
    ) -> BridgeResult<BridgeOutput> {
        if !self.host.committee().is_member(&witness) {
            return Err(BridgeError::NotCommitteeMember(witness));
        }

        let mut sm = self
            .proposals
            .get(&proposal_id)
            .cloned()
            .ok_or(BridgeError::UnknownProposal(proposal_id))?;
        let output = sm
            .process_event(
                self.sm_cfg(),
                SendProposalEvent::SignaturesReceived {
                    witness,
                    signatures,
                },
            )
            .map_err(|e| BridgeError::from_proposal(proposal_id, e))?;

        self.host.set_fee_exempt(witness, true);
        let approved = self.host.approve(proposal_id, witness);
        self.host.set_fee_exempt(witness, false);
        approved?;

        let finalized = match sm.state() {
            SendProposalState::Finalized { signed_tx } => {
                let signed_tx = signed_tx.clone();
                Some(self.persist_finalized(sm.context(), signed_tx))
            }
            _ => None,
        };
        self.proposals.insert(proposal_id, sm);

        Ok(BridgeOutput::Signed {
            proposal_id,
            finalized,
            duties: output.duties,
        })
    }

    /// Moves a fully signed transaction from the proposal tables into the sent tables.
    fn persist_finalized(
        &mut self,
        ctx: &SendProposalCtx,
        signed_tx: bitcoin::Transaction,
    ) -> bitcoin::Txid {
        let condensed = &ctx.condensed;
        let txid = condensed.txid();

        for id in &condensed.vins {
            self.db
                .mark_vin_used(id)
                .expect("reserved deposits stay in the ledger");
        }
        for id in &condensed.vouts {
            self.db
                .mark_vout_used(id)
                .expect("reserved withdrawals stay in the ledger");
        }

        if let Some(id) = &condensed.pw_vin {
            let seq = self
                .db
                .pw_vout_by_id(id)
                .map(|vout| vout.seq)
                .expect("reserved primary wallet output stays in the chain");
            self.db
                .set_pw_vout_used(seq, true)
                .expect("sequence was just looked up");
        }

        let pw_vout = condensed.change().map(|(outpoint, amount)| {
            let wallet = ctx.committee.primary_wallet(self.params.network);
            self.db
                .append_pw_vout(
                    outpoint,
                    amount,
                    wallet.address().to_string(),
                    wallet.redeem_script().to_owned(),
                )
                .expect("change outpoints are new")
                .seq
        });

        let record = btc_peg_db::models::BitcoinTransactionRecord {
            txid,
            proposal_id: ctx.proposal_id,
            pw_vin: condensed.pw_vin,
            pw_vout,
            vins: condensed.vins.clone(),
            vouts: condensed.vouts.clone(),
            transaction: signed_tx,
            fee: condensed.fee,
            sent_at: self.host.block_timestamp(),
        };
        self.db
            .insert_record(record)
            .expect("finalized transactions are recorded once");
        self.db
            .insert_confirmations(txid, condensed.vins.iter().copied().collect())
            .expect("finalized transactions are tracked once");
        self.db
            .remove_proposal(&ctx.proposal_id)
            .expect("pending proposals are stored");

        info!(proposal_id = %ctx.proposal_id, %txid, ?pw_vout, "recorded sent transaction");

        txid
    }
}
