//! Testing utilities for the bridge state machines.
//!
//! - [`MockHost`] stands in for the host chain services.
//! - [`transition`] holds value-based transition helpers.
//! - The free functions build bridges and ledger entries shared by the test modules.

use std::collections::{BTreeMap, BTreeSet};

use bitcoin::{Amount, OutPoint};
use btc_peg_db::{
    inmemory::InMemoryBridgeDb,
    models::{InfoForVin, SidechainProposalKind},
};
use btc_peg_params::prelude::BridgeParams;
use btc_peg_primitives::{
    committee::CommitteeTable,
    types::{AccountId, AssetId, ProposalId, UtxoId, WitnessIdx},
};
use btc_peg_tx_builder::prelude::{BuildContext, CondensedTransaction, CondensingTxBuilder};
use btc_peg_test_utils::prelude::*;
use secp256k1::SecretKey;

use crate::{
    bridge::{BridgeOperation, BridgeOutput, SidechainBridge},
    host::{BalanceLedger, ChainClock, CommitteeView, HostError, ProposalEngine},
    send::{machine::SendProposalSM, state::SendProposalState},
};

pub(crate) mod transition;

/// An in-memory host chain.
#[derive(Debug, Clone)]
pub(crate) struct MockHost {
    pub(crate) committee: CommitteeTable,
    pub(crate) next_proposal_id: ProposalId,
    pub(crate) created: Vec<(ProposalId, WitnessIdx, SidechainProposalKind)>,
    pub(crate) approvals: BTreeMap<ProposalId, BTreeSet<WitnessIdx>>,
    /// Every fee exemption toggle in call order.
    pub(crate) fee_exempt_log: Vec<(WitnessIdx, bool)>,
    pub(crate) balances: BTreeMap<(AccountId, AssetId), Amount>,
    pub(crate) now: u64,
    pub(crate) reject_approvals: bool,
}

impl MockHost {
    pub(crate) fn new(committee: CommitteeTable) -> Self {
        Self {
            committee,
            next_proposal_id: 1,
            created: Vec::new(),
            approvals: BTreeMap::new(),
            fee_exempt_log: Vec::new(),
            balances: BTreeMap::new(),
            now: 1_700_000_000,
            reject_approvals: false,
        }
    }

    pub(crate) fn balance(&self, account: AccountId) -> Amount {
        self.balances
            .get(&(account, TEST_PEG_ASSET))
            .copied()
            .unwrap_or(Amount::ZERO)
    }
}

impl ProposalEngine for MockHost {
    fn create(
        &mut self,
        proposer: WitnessIdx,
        kind: SidechainProposalKind,
    ) -> Result<ProposalId, HostError> {
        let proposal_id = self.next_proposal_id;
        self.next_proposal_id += 1;
        self.created.push((proposal_id, proposer, kind));

        Ok(proposal_id)
    }

    fn approve(&mut self, proposal_id: ProposalId, witness: WitnessIdx) -> Result<(), HostError> {
        if self.reject_approvals {
            return Err(HostError("approvals are closed".to_string()));
        }
        self.approvals
            .entry(proposal_id)
            .or_default()
            .insert(witness);

        Ok(())
    }

    fn set_fee_exempt(&mut self, witness: WitnessIdx, exempt: bool) {
        self.fee_exempt_log.push((witness, exempt));
    }
}

impl BalanceLedger for MockHost {
    fn credit(
        &mut self,
        account: AccountId,
        asset: AssetId,
        amount: Amount,
    ) -> Result<(), HostError> {
        *self.balances.entry((account, asset)).or_default() += amount;

        Ok(())
    }

    fn debit(
        &mut self,
        account: AccountId,
        asset: AssetId,
        amount: Amount,
    ) -> Result<(), HostError> {
        let balance = self.balances.entry((account, asset)).or_default();
        *balance = balance
            .checked_sub(amount)
            .ok_or_else(|| HostError(format!("account {account} cannot pay {amount}")))?;

        Ok(())
    }
}

impl CommitteeView for MockHost {
    fn committee(&self) -> CommitteeTable {
        self.committee.clone()
    }
}

impl ChainClock for MockHost {
    fn block_timestamp(&self) -> u64 {
        self.now
    }
}

pub(crate) type TestBridge = SidechainBridge<InMemoryBridgeDb, MockHost>;

/// A bridge over empty tables run by a 2-of-3 committee.
pub(crate) fn test_bridge() -> (TestBridge, Vec<SecretKey>) {
    test_bridge_with(test_bridge_params())
}

pub(crate) fn test_bridge_with(params: BridgeParams) -> (TestBridge, Vec<SecretKey>) {
    let (committee, secret_keys) = test_committee(3, 2);
    let bridge = SidechainBridge::new(params, InMemoryBridgeDb::default(), MockHost::new(committee));

    (bridge, secret_keys)
}

/// Registers a deposit of `sats` to the primary wallet and returns its outpoint.
pub(crate) fn deposit(bridge: &mut TestBridge, owner: AccountId, sats: u64) -> OutPoint {
    let wallet = bridge.host().committee().primary_wallet(TEST_NETWORK);
    let outpoint = generate_outpoint();

    bridge
        .apply(BridgeOperation::RegisterDeposit {
            owner,
            outpoint,
            amount: Amount::from_sat(sats),
            address: wallet.address().to_string(),
            script: wallet.redeem_script().to_owned(),
        })
        .expect("deposit must register");

    outpoint
}

/// Funds `payer` and files a withdrawal of `sats` to a random address.
pub(crate) fn withdraw(bridge: &mut TestBridge, payer: AccountId, sats: u64) {
    let amount = Amount::from_sat(sats);
    bridge
        .host_mut()
        .credit(payer, TEST_PEG_ASSET, amount)
        .expect("mock credit never fails");

    bridge
        .apply(BridgeOperation::RequestWithdrawal {
            payer,
            address: random_regtest_address(),
            amount,
        })
        .expect("withdrawal must be accepted");
}

/// Builds and submits a proposal as witness 0.
pub(crate) fn propose(bridge: &mut TestBridge) -> ProposalId {
    let proposal = bridge
        .build_proposal(TEST_FEE_RATE)
        .expect("proposal must build");

    match bridge
        .apply(BridgeOperation::SendTransactionProposal {
            proposer: 0,
            proposal,
        })
        .expect("proposal must be accepted")
    {
        BridgeOutput::ProposalCreated { proposal_id } => proposal_id,
        other => panic!("unexpected output {other:?}"),
    }
}

/// Signs the pending proposal with witness `witness`.
pub(crate) fn sign(
    bridge: &mut TestBridge,
    secret_keys: &[SecretKey],
    proposal_id: ProposalId,
    witness: WitnessIdx,
) -> BridgeOutput {
    let sm = bridge.proposal(&proposal_id).expect("proposal must exist");
    let signatures = btc_peg_tx_builder::prelude::sign_inputs(
        &sm.context().condensed,
        &secret_keys[witness as usize],
    )
    .expect("inputs must sign");

    bridge
        .apply(BridgeOperation::SignTransaction {
            proposal_id,
            witness,
            signatures,
        })
        .expect("signatures must be accepted")
}

/// Proposes, signs with the threshold and returns the txid of the finalized transaction.
pub(crate) fn propose_and_finalize(
    bridge: &mut TestBridge,
    secret_keys: &[SecretKey],
) -> bitcoin::Txid {
    let proposal_id = propose(bridge);
    sign(bridge, secret_keys, proposal_id, 0);

    match sign(bridge, secret_keys, proposal_id, 1) {
        BridgeOutput::Signed {
            finalized: Some(txid),
            ..
        } => txid,
        other => panic!("expected finalization, got {other:?}"),
    }
}

/// Records enough confirmations and issues the deposits of `txid`.
pub(crate) fn confirm_and_issue(bridge: &mut TestBridge, txid: bitcoin::Txid) -> BridgeOutput {
    let confirmations = bridge.params().required_confirmations;
    bridge
        .apply(BridgeOperation::RecordConfirmations {
            txid,
            confirmations,
            spent_elsewhere: BTreeSet::new(),
        })
        .expect("confirmations must record");

    bridge
        .apply(BridgeOperation::IssueDeposits { txid })
        .expect("deposits must issue")
}

/// A 2-of-3 committee, its keys and a condensing transaction sweeping two of its deposits.
pub(crate) fn test_condensed() -> (CommitteeTable, Vec<SecretKey>, CondensedTransaction) {
    let (committee, secret_keys) = test_committee(3, 2);
    let script = committee.primary_wallet(TEST_NETWORK).redeem_script().to_owned();
    let vins: Vec<_> = [60_000, 40_000]
        .into_iter()
        .enumerate()
        .map(|(seq, sats)| {
            let outpoint = generate_outpoint();
            InfoForVin {
                id: UtxoId::from_outpoint(&outpoint),
                seq: seq as u64,
                owner: 10 + seq as u64,
                outpoint,
                amount: Amount::from_sat(sats),
                address: random_regtest_address(),
                script: script.clone(),
                used: false,
                resend: false,
            }
        })
        .collect();

    let ctx = BuildContext::new(TEST_NETWORK, committee.clone(), TEST_MIN_RELAY_FEE, 100);
    let condensed = CondensingTxBuilder::new(&ctx)
        .with_vins(None, &vins)
        .and_then(|builder| builder.with_vouts(&[]))
        .and_then(|builder| builder.apply_fee(TEST_FEE_RATE))
        .expect("deposits cover the fee");

    (committee, secret_keys, condensed)
}

/// A send proposal state machine forced into `state`.
pub(crate) fn test_send_sm(state: SendProposalState) -> SendProposalSM {
    let (committee, _, condensed) = test_condensed();
    let mut sm = SendProposalSM::new(1, 0, condensed, committee);
    sm.state = state;

    sm
}
