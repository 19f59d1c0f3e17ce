//! Building, verifying and signing send proposals.
//!
//! Every witness runs [`verify_send_proposal`] against its own copy of the bridge tables before
//! signing. The check is pure, so all honest witnesses reach the same decision.

use std::collections::BTreeSet;

use bitcoin::Amount;
use btc_peg_db::{
    models::{InfoForVin, InfoForVout, UtxoRef},
    BridgeDb,
};
use btc_peg_params::prelude::BridgeParams;
use btc_peg_primitives::{codec, committee::CommitteeTable};
use btc_peg_tx_builder::prelude::{
    sign_inputs, BuildContext, BuildResult, CondensedTransaction, CondensingTxBuilder,
};
use secp256k1::{ecdsa::Signature, SecretKey};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::{BridgeError, BridgeResult};

/// A condensing transaction together with the ledger entries it was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendProposal {
    /// The primary wallet output spent by the first input, as the proposer saw it.
    pub pw_vin: Option<InfoForVin>,

    /// The deposits spent, in input order, as the proposer saw them.
    pub vins: Vec<InfoForVin>,

    /// The withdrawals paid, in output order, as the proposer saw them.
    pub vouts: Vec<InfoForVout>,

    /// The fee rate the transaction was built with, in sats/kvB.
    pub fee_rate: u64,

    /// The unsigned transaction, consensus encoded as hex.
    pub raw_transaction: String,

    /// The fee the transaction pays.
    pub fee: Amount,
}

impl SendProposal {
    /// Wraps a freshly built transaction.
    pub fn new(
        pw_vin: Option<InfoForVin>,
        vins: Vec<InfoForVin>,
        vouts: Vec<InfoForVout>,
        condensed: &CondensedTransaction,
    ) -> Self {
        Self {
            pw_vin,
            vins,
            vouts,
            fee_rate: condensed.fee_rate,
            raw_transaction: codec::serialize_hex(&condensed.tx),
            fee: condensed.fee,
        }
    }

    /// Every ledger entry the proposal spends or pays, primary wallet input first.
    pub fn utxo_refs(&self) -> Vec<UtxoRef> {
        self.pw_vin
            .iter()
            .chain(&self.vins)
            .map(|vin| UtxoRef::Vin(vin.id))
            .chain(self.vouts.iter().map(|vout| UtxoRef::Vout(vout.id)))
            .collect()
    }
}

fn build_context(params: &BridgeParams, committee: &CommitteeTable) -> BuildContext {
    BuildContext::new(
        params.network,
        committee.clone(),
        params.min_relay_fee,
        params.witness_fee_bp,
    )
}

fn condense(
    ctx: &BuildContext,
    pw_vin: Option<&InfoForVin>,
    vins: &[InfoForVin],
    vouts: &[InfoForVout],
    fee_rate: u64,
) -> BuildResult<CondensedTransaction> {
    CondensingTxBuilder::new(ctx)
        .with_vins(pw_vin, vins)?
        .with_vouts(vouts)?
        .apply_fee(fee_rate)
}

/// Builds a proposal from the oldest unreserved ledger entries.
///
/// The primary wallet tail is included whenever it is spendable.
pub fn build_send_proposal<Db: BridgeDb>(
    db: &Db,
    params: &BridgeParams,
    committee: &CommitteeTable,
    fee_rate: u64,
) -> BridgeResult<SendProposal> {
    let pw_vin = db.get_info_for_pw_vin(params.max_unconfirmed_pw_vouts);
    if let Some(pw_vin) = &pw_vin {
        let utxo_ref = UtxoRef::Vin(pw_vin.id);
        if let Some(holder) = db.reserved_by(&utxo_ref) {
            return Err(BridgeError::DuplicateUtxoReference {
                utxo_ref,
                proposal_id: Some(holder),
            });
        }
    }

    let vins: Vec<_> = db
        .get_info_for_vins(usize::MAX)
        .into_iter()
        .filter(|vin| db.reserved_by(&UtxoRef::Vin(vin.id)).is_none())
        .take(params.vin_limit)
        .collect();
    let vouts: Vec<_> = db
        .get_info_for_vouts(usize::MAX)
        .into_iter()
        .filter(|vout| db.reserved_by(&UtxoRef::Vout(vout.id)).is_none())
        .take(params.vout_limit)
        .collect();

    let ctx = build_context(params, committee);
    let condensed = condense(&ctx, pw_vin.as_ref(), &vins, &vouts, fee_rate)?;
    debug!(
        txid = %condensed.txid(),
        vins = vins.len(),
        vouts = vouts.len(),
        fee = %condensed.fee,
        "built send proposal"
    );

    Ok(SendProposal::new(pw_vin, vins, vouts, &condensed))
}

/// Checks a proposal against the ledger and rebuilds its transaction.
///
/// Returns the rebuilt transaction if and only if it is identical to the proposed one.
pub fn verify_send_proposal<Db: BridgeDb>(
    db: &Db,
    params: &BridgeParams,
    committee: &CommitteeTable,
    proposal: &SendProposal,
) -> BridgeResult<CondensedTransaction> {
    let proposed_tx = codec::deserialize_hex(&proposal.raw_transaction)?;

    if proposal.vins.len() > params.vin_limit || proposal.vouts.len() > params.vout_limit {
        return Err(BridgeError::ProposalMismatch(format!(
            "{} vins and {} vouts exceed the limits",
            proposal.vins.len(),
            proposal.vouts.len()
        )));
    }
    if proposal.fee_rate < params.default_fee_rate {
        return Err(BridgeError::ProposalMismatch(format!(
            "fee rate {} is below the default {}",
            proposal.fee_rate, params.default_fee_rate
        )));
    }

    let mut seen = BTreeSet::new();
    if let Some(utxo_ref) = proposal
        .utxo_refs()
        .into_iter()
        .find(|utxo_ref| !seen.insert(*utxo_ref))
    {
        return Err(BridgeError::DuplicateUtxoReference {
            utxo_ref,
            proposal_id: None,
        });
    }

    check_pw_vin(db, params, proposal.pw_vin.as_ref())?;

    for claimed in &proposal.vins {
        let utxo_ref = UtxoRef::Vin(claimed.id);
        match db.get_vin(&claimed.id) {
            Some(vin) if vin.used => return Err(BridgeError::UnknownUtxoOrVout(utxo_ref)),
            Some(vin) if vin != claimed => {
                return Err(BridgeError::ProposalMismatch(format!(
                    "{utxo_ref} differs from the ledger"
                )));
            }
            Some(_) => {}
            None => return Err(BridgeError::UnknownUtxoOrVout(utxo_ref)),
        }
    }

    for claimed in &proposal.vouts {
        let utxo_ref = UtxoRef::Vout(claimed.id);
        match db.get_vout(&claimed.id) {
            Some(vout) if vout.used => return Err(BridgeError::UnknownUtxoOrVout(utxo_ref)),
            Some(vout) if vout != claimed => {
                return Err(BridgeError::ProposalMismatch(format!(
                    "{utxo_ref} differs from the ledger"
                )));
            }
            Some(_) => {}
            None => return Err(BridgeError::UnknownUtxoOrVout(utxo_ref)),
        }
    }

    let wallet = committee.primary_wallet(params.network);
    if let Some(vin) = proposal
        .pw_vin
        .iter()
        .chain(&proposal.vins)
        .find(|vin| vin.script.as_script() != wallet.redeem_script())
    {
        return Err(BridgeError::ProposalMismatch(format!(
            "vin {} is locked to another committee",
            vin.id
        )));
    }

    let ctx = build_context(params, committee);
    let condensed = condense(
        &ctx,
        proposal.pw_vin.as_ref(),
        &proposal.vins,
        &proposal.vouts,
        proposal.fee_rate,
    )?;

    if condensed.tx != proposed_tx || condensed.fee != proposal.fee {
        warn!(
            proposed = %proposed_tx.compute_txid(),
            rebuilt = %condensed.txid(),
            "rebuilt transaction differs from the proposal"
        );
        return Err(BridgeError::ProposalMismatch(
            "rebuilt transaction differs from the proposed one".to_string(),
        ));
    }

    Ok(condensed)
}

/// The claimed primary wallet input must be the spendable tail, and must be present whenever the
/// tail is spendable.
fn check_pw_vin<Db: BridgeDb>(
    db: &Db,
    params: &BridgeParams,
    claimed: Option<&InfoForVin>,
) -> BridgeResult<()> {
    let expected = db.get_info_for_pw_vin(params.max_unconfirmed_pw_vouts);

    match (claimed, expected) {
        (None, None) => Ok(()),
        (Some(claimed), Some(expected)) => {
            let same = claimed.id == expected.id
                && claimed.outpoint == expected.outpoint
                && claimed.amount == expected.amount
                && claimed.address == expected.address
                && claimed.script == expected.script;

            same.then_some(()).ok_or_else(|| {
                BridgeError::ProposalMismatch(
                    "primary wallet input is not the current tail".to_string(),
                )
            })
        }
        (Some(claimed), None) => match db.pw_vout_by_id(&claimed.id) {
            None => Err(BridgeError::UnknownUtxoOrVout(UtxoRef::Vin(claimed.id))),
            Some(_) => Err(BridgeError::ProposalMismatch(
                "primary wallet input is not spendable".to_string(),
            )),
        },
        (None, Some(_)) => Err(BridgeError::ProposalMismatch(
            "the spendable primary wallet tail must be spent".to_string(),
        )),
    }
}

/// Verifies the proposal and signs every input with `secret_key`.
pub fn sign_send_proposal<Db: BridgeDb>(
    db: &Db,
    params: &BridgeParams,
    committee: &CommitteeTable,
    proposal: &SendProposal,
    secret_key: &SecretKey,
) -> BridgeResult<Vec<Signature>> {
    let condensed = verify_send_proposal(db, params, committee, proposal)?;

    Ok(sign_inputs(&condensed, secret_key)?)
}

#[cfg(test)]
mod tests {
    use bitcoin::Amount;
    use btc_peg_db::{inmemory::InMemoryBridgeDb, ledger::LedgerDb, proposals::ProposalDb};
    use btc_peg_test_utils::prelude::*;

    use super::*;

    fn ledger_with_deposits(committee: &CommitteeTable, amounts: &[u64]) -> InMemoryBridgeDb {
        let wallet = committee.primary_wallet(TEST_NETWORK);
        let mut db = InMemoryBridgeDb::new();
        for (owner, sats) in amounts.iter().enumerate() {
            db.insert_vin(
                owner as u64,
                generate_outpoint(),
                Amount::from_sat(*sats),
                wallet.address().to_string(),
                wallet.redeem_script().to_owned(),
            )
            .expect("fresh outpoint");
        }

        db
    }

    #[test]
    fn build_respects_limits_and_reservations() {
        let (committee, _) = test_committee(3, 2);
        let params = BridgeParams {
            vin_limit: 2,
            ..test_bridge_params()
        };
        let mut db = ledger_with_deposits(&committee, &[10_000, 20_000, 30_000, 40_000]);
        let all = db.get_info_for_vins(usize::MAX);

        db.reserve(1, &[UtxoRef::Vin(all[0].id)]).expect("free");
        let proposal = build_send_proposal(&db, &params, &committee, TEST_FEE_RATE).expect("builds");

        let ids: Vec<_> = proposal.vins.iter().map(|vin| vin.id).collect();
        assert_eq!(ids, vec![all[1].id, all[2].id]);
        verify_send_proposal(&db, &params, &committee, &proposal).expect("own proposal verifies");
    }

    #[test]
    fn verify_rejects_stale_or_cheap_proposals() {
        let (committee, secret_keys) = test_committee(3, 2);
        let params = test_bridge_params();
        let mut db = ledger_with_deposits(&committee, &[10_000, 20_000]);
        let proposal = build_send_proposal(&db, &params, &committee, TEST_FEE_RATE).expect("builds");

        let cheap = SendProposal {
            fee_rate: TEST_FEE_RATE - 1,
            ..proposal.clone()
        };
        assert!(matches!(
            verify_send_proposal(&db, &params, &committee, &cheap),
            Err(BridgeError::ProposalMismatch(_))
        ));

        let mut doubled = proposal.clone();
        doubled.vins.push(doubled.vins[0].clone());
        assert!(matches!(
            verify_send_proposal(&db, &params, &committee, &doubled),
            Err(BridgeError::DuplicateUtxoReference {
                proposal_id: None,
                ..
            })
        ));

        let mut inflated = proposal.clone();
        inflated.vins[1].amount += Amount::from_sat(1);
        assert!(matches!(
            verify_send_proposal(&db, &params, &committee, &inflated),
            Err(BridgeError::ProposalMismatch(_))
        ));

        let garbled = SendProposal {
            raw_transaction: "zz".to_string(),
            ..proposal.clone()
        };
        assert!(matches!(
            verify_send_proposal(&db, &params, &committee, &garbled),
            Err(BridgeError::MalformedTransaction(_))
        ));

        db.mark_vin_used(&proposal.vins[0].id).expect("exists");
        assert_eq!(
            sign_send_proposal(&db, &params, &committee, &proposal, &secret_keys[0]),
            Err(BridgeError::UnknownUtxoOrVout(UtxoRef::Vin(proposal.vins[0].id)))
        );
    }

    #[test]
    fn deposits_of_another_committee_are_refused() {
        let (committee, _) = test_committee(3, 2);
        let (other, _) = test_committee(4, 3);
        let params = test_bridge_params();
        let db = ledger_with_deposits(&other, &[10_000]);

        let proposal = build_send_proposal(&db, &params, &other, TEST_FEE_RATE).expect("builds");
        assert!(matches!(
            verify_send_proposal(&db, &params, &committee, &proposal),
            Err(BridgeError::ProposalMismatch(_))
        ));
    }
}
