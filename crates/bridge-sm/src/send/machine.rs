//! The Send Proposal State Machine (SPSM).
//!
//! Tracks one condensing transaction from the moment it is proposed until its deposits are
//! credited or it is reverted.

use std::collections::BTreeMap;

use btc_peg_primitives::{
    committee::CommitteeTable,
    types::{ProposalId, WitnessIdx},
};
use btc_peg_tx_builder::prelude::{
    finalize_witnesses, verify_input_signature, CondensedTransaction,
};
use secp256k1::ecdsa::Signature;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    send::{
        duties::SendProposalDuty,
        errors::{SPSMError, SPSMResult},
        events::SendProposalEvent,
        state::SendProposalState,
    },
    state_machine::{SMOutput, StateMachine},
};

/// The configuration shared by every send proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SendProposalCfg {
    /// Do not emit [`SendProposalDuty::BroadcastTransaction`] on finalization.
    pub skip_broadcast: bool,
}

/// The immutable data of a send proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendProposalCtx {
    /// Identifier assigned by the proposal engine.
    pub proposal_id: ProposalId,

    /// The witness that submitted the proposal.
    pub proposer: WitnessIdx,

    /// The verified, unsigned transaction.
    pub condensed: CondensedTransaction,

    /// The committee whose wallet the transaction spends from.
    pub committee: CommitteeTable,
}

/// The output of the send proposal state machine after processing an event.
pub type SPSMOutput = SMOutput<SendProposalDuty>;

/// The state machine of one send proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendProposalSM {
    /// Context associated with this proposal.
    pub context: SendProposalCtx,

    /// The current state of the proposal.
    pub state: SendProposalState,
}

impl StateMachine for SendProposalSM {
    type Config = SendProposalCfg;
    type Duty = SendProposalDuty;
    type Event = SendProposalEvent;
    type Error = SPSMError;

    fn process_event(
        &mut self,
        cfg: Self::Config,
        event: Self::Event,
    ) -> Result<SMOutput<Self::Duty>, Self::Error> {
        match event {
            SendProposalEvent::SignaturesReceived {
                witness,
                signatures,
            } => self.process_signatures(cfg, witness, signatures),
            SendProposalEvent::ConfirmationsObserved { confirmations } => {
                self.process_confirmations(confirmations)
            }
            SendProposalEvent::Issued => self.process_issued(),
            SendProposalEvent::Reverted => self.process_reverted(),
            SendProposalEvent::Expired => self.process_expired(),
        }
    }
}

impl SendProposalSM {
    /// Creates a proposal in [`SendProposalState::Proposed`].
    pub fn new(
        proposal_id: ProposalId,
        proposer: WitnessIdx,
        condensed: CondensedTransaction,
        committee: CommitteeTable,
    ) -> Self {
        Self {
            context: SendProposalCtx {
                proposal_id,
                proposer,
                condensed,
                committee,
            },
            state: SendProposalState::Proposed,
        }
    }

    /// Returns the context of the proposal.
    pub const fn context(&self) -> &SendProposalCtx {
        &self.context
    }

    /// Returns the current state of the proposal.
    pub const fn state(&self) -> &SendProposalState {
        &self.state
    }

    fn invalid_event(&self, event: SendProposalEvent, reason: Option<String>) -> SPSMError {
        SPSMError::InvalidEvent {
            state: self.state.to_string(),
            event: event.to_string(),
            reason,
        }
    }

    /// Verifies and stores the signatures of one witness, finalizing the transaction once the
    /// threshold is reached.
    fn process_signatures(
        &mut self,
        cfg: SendProposalCfg,
        witness: WitnessIdx,
        signatures: Vec<Signature>,
    ) -> SPSMResult<SPSMOutput> {
        let committee = &self.context.committee;
        let pubkey = committee
            .idx_to_btc_key(&witness)
            .ok_or(SPSMError::NotSigner(witness))?;

        let mut collected = match &self.state {
            SendProposalState::Proposed => BTreeMap::new(),
            SendProposalState::PartiallySigned { signatures } => signatures.clone(),
            SendProposalState::Finalized { .. } | SendProposalState::Sent { .. } => {
                return Err(SPSMError::SignatureSlotExhausted);
            }
            _ => {
                return Err(self.invalid_event(
                    SendProposalEvent::SignaturesReceived {
                        witness,
                        signatures,
                    },
                    Some("proposal is settled".to_string()),
                ));
            }
        };

        if collected.contains_key(&witness) {
            return Err(SPSMError::AlreadyApproved(witness));
        }

        let condensed = &self.context.condensed;
        if signatures.len() != condensed.tx.input.len() {
            return Err(SPSMError::SignatureInvalid {
                witness,
                reason: format!(
                    "expected {} signatures, got {}",
                    condensed.tx.input.len(),
                    signatures.len()
                ),
            });
        }
        let invalid = signatures.iter().enumerate().find(|(index, signature)| {
            !verify_input_signature(
                &condensed.tx,
                &condensed.spent_outputs,
                *index,
                signature,
                &pubkey,
            )
        });
        if let Some((index, _)) = invalid {
            return Err(SPSMError::SignatureInvalid {
                witness,
                reason: format!("signature for input {index} does not verify"),
            });
        }

        collected.insert(witness, signatures);
        let proposal_id = self.context.proposal_id;

        if collected.len() < committee.threshold() {
            debug!(%proposal_id, %witness, approvals = collected.len(), "accepted signatures");
            self.state = SendProposalState::PartiallySigned {
                signatures: collected,
            };

            return Ok(SPSMOutput::new());
        }

        let per_input: Vec<_> = (0..condensed.tx.input.len())
            .map(|index| {
                collected
                    .iter()
                    .filter_map(|(idx, sigs)| {
                        committee.idx_to_btc_key(idx).map(|key| (key, sigs[index]))
                    })
                    .collect::<BTreeMap<_, _>>()
            })
            .collect();
        let signed_tx =
            finalize_witnesses(condensed.tx.clone(), &condensed.spent_outputs, &per_input)
                .expect("threshold signatures over committee scripts were verified");
        let txid = condensed.txid();

        info!(%proposal_id, %txid, "send proposal finalized");
        self.state = SendProposalState::Finalized {
            signed_tx: signed_tx.clone(),
        };

        if cfg.skip_broadcast {
            return Ok(SPSMOutput::new());
        }

        Ok(SPSMOutput::with_duties(vec![
            SendProposalDuty::BroadcastTransaction { txid, tx: signed_tx },
        ]))
    }

    fn process_confirmations(&mut self, confirmations: u32) -> SPSMResult<SPSMOutput> {
        let signed_tx = match &self.state {
            // not seen on chain yet
            SendProposalState::Finalized { .. } if confirmations == 0 => {
                return Ok(SPSMOutput::new());
            }
            SendProposalState::Finalized { signed_tx }
            | SendProposalState::Sent { signed_tx, .. } => signed_tx.clone(),
            _ => {
                return Err(self.invalid_event(
                    SendProposalEvent::ConfirmationsObserved { confirmations },
                    None,
                ));
            }
        };

        self.state = SendProposalState::Sent {
            signed_tx,
            confirmations,
        };

        Ok(SPSMOutput::new())
    }

    fn process_issued(&mut self) -> SPSMResult<SPSMOutput> {
        match &self.state {
            SendProposalState::Finalized { .. } | SendProposalState::Sent { .. } => {
                self.state = SendProposalState::Confirmed {
                    txid: self.context.condensed.txid(),
                };

                Ok(SPSMOutput::new())
            }
            _ => Err(self.invalid_event(SendProposalEvent::Issued, None)),
        }
    }

    fn process_reverted(&mut self) -> SPSMResult<SPSMOutput> {
        match &self.state {
            SendProposalState::Finalized { .. } | SendProposalState::Sent { .. } => {
                self.state = SendProposalState::Reverted {
                    txid: self.context.condensed.txid(),
                };

                Ok(SPSMOutput::new())
            }
            _ => Err(self.invalid_event(SendProposalEvent::Reverted, None)),
        }
    }

    fn process_expired(&mut self) -> SPSMResult<SPSMOutput> {
        if !self.state.is_pending() {
            return Err(self.invalid_event(
                SendProposalEvent::Expired,
                Some("only pending proposals expire".to_string()),
            ));
        }
        self.state = SendProposalState::Expired;

        Ok(SPSMOutput::new())
    }
}

#[cfg(test)]
mod tests {
    use btc_peg_tx_builder::prelude::sign_inputs;
    use proptest::prelude::*;

    use super::*;
    use crate::testing::{
        test_condensed, test_send_sm,
        transition::{test_invalid_transition, test_transition, InvalidTransition, Transition},
    };

    fn signed_tx() -> bitcoin::Transaction {
        test_send_sm(SendProposalState::Proposed)
            .context
            .condensed
            .tx
    }

    #[test]
    fn settlement_transitions() {
        let tx = signed_tx();
        let txid = tx.compute_txid();
        let cfg = SendProposalCfg::default();

        // every fixture spends fresh outpoints
        let create = |state| {
            let mut sm = test_send_sm(state);
            sm.context.condensed.tx = tx.clone();
            sm
        };

        let transitions = [
            Transition {
                from_state: SendProposalState::Finalized {
                    signed_tx: tx.clone(),
                },
                event: SendProposalEvent::ConfirmationsObserved { confirmations: 0 },
                expected_state: SendProposalState::Finalized {
                    signed_tx: tx.clone(),
                },
                expected_duties: vec![],
            },
            Transition {
                from_state: SendProposalState::Finalized {
                    signed_tx: tx.clone(),
                },
                event: SendProposalEvent::ConfirmationsObserved { confirmations: 3 },
                expected_state: SendProposalState::Sent {
                    signed_tx: tx.clone(),
                    confirmations: 3,
                },
                expected_duties: vec![],
            },
            Transition {
                from_state: SendProposalState::Sent {
                    signed_tx: tx.clone(),
                    confirmations: 6,
                },
                event: SendProposalEvent::Issued,
                expected_state: SendProposalState::Confirmed { txid },
                expected_duties: vec![],
            },
            Transition {
                from_state: SendProposalState::Finalized {
                    signed_tx: tx.clone(),
                },
                event: SendProposalEvent::Reverted,
                expected_state: SendProposalState::Reverted { txid },
                expected_duties: vec![],
            },
            Transition {
                from_state: SendProposalState::Proposed,
                event: SendProposalEvent::Expired,
                expected_state: SendProposalState::Expired,
                expected_duties: vec![],
            },
        ];

        for transition in transitions {
            test_transition(create, SendProposalSM::state, cfg, transition);
        }
    }

    #[test]
    fn rejected_transitions() {
        let tx = signed_tx();
        let txid = tx.compute_txid();
        let cfg = SendProposalCfg::default();
        let is_invalid_event = |e: &SPSMError| matches!(e, SPSMError::InvalidEvent { .. });

        let invalid: [InvalidTransition<_, _, SPSMError>; 6] = [
            InvalidTransition {
                from_state: SendProposalState::Proposed,
                event: SendProposalEvent::Issued,
                expected_error: is_invalid_event,
            },
            InvalidTransition {
                from_state: SendProposalState::Proposed,
                event: SendProposalEvent::ConfirmationsObserved { confirmations: 1 },
                expected_error: is_invalid_event,
            },
            InvalidTransition {
                from_state: SendProposalState::Confirmed { txid },
                event: SendProposalEvent::Expired,
                expected_error: is_invalid_event,
            },
            InvalidTransition {
                from_state: SendProposalState::Sent {
                    signed_tx: tx.clone(),
                    confirmations: 1,
                },
                event: SendProposalEvent::Expired,
                expected_error: is_invalid_event,
            },
            InvalidTransition {
                from_state: SendProposalState::Finalized {
                    signed_tx: tx.clone(),
                },
                event: SendProposalEvent::SignaturesReceived {
                    witness: 2,
                    signatures: vec![],
                },
                expected_error: |e| matches!(e, SPSMError::SignatureSlotExhausted),
            },
            InvalidTransition {
                from_state: SendProposalState::Expired,
                event: SendProposalEvent::SignaturesReceived {
                    witness: 2,
                    signatures: vec![],
                },
                expected_error: is_invalid_event,
            },
        ];

        for invalid in invalid {
            test_invalid_transition(test_send_sm, SendProposalSM::state, cfg, invalid);
        }
    }

    #[test]
    fn threshold_signatures_finalize_the_transaction() {
        let (committee, secret_keys, condensed) = test_condensed();
        let mut sm = SendProposalSM::new(7, 0, condensed.clone(), committee);
        let cfg = SendProposalCfg::default();

        let output = sm
            .process_event(
                cfg,
                SendProposalEvent::SignaturesReceived {
                    witness: 2,
                    signatures: sign_inputs(&condensed, &secret_keys[2]).expect("signs"),
                },
            )
            .expect("first approval");
        assert!(output.duties.is_empty());
        assert!(matches!(
            sm.state(),
            SendProposalState::PartiallySigned { signatures } if signatures.len() == 1
        ));

        let output = sm
            .process_event(
                cfg,
                SendProposalEvent::SignaturesReceived {
                    witness: 0,
                    signatures: sign_inputs(&condensed, &secret_keys[0]).expect("signs"),
                },
            )
            .expect("second approval");

        let SendProposalState::Finalized { signed_tx } = sm.state() else {
            panic!("expected finalization, got {}", sm.state());
        };
        assert_eq!(signed_tx.compute_txid(), condensed.txid());
        for input in &signed_tx.input {
            // dummy, two signatures, redeem script
            assert_eq!(input.witness.len(), 4);
            assert!(input.witness.nth(0).is_some_and(<[u8]>::is_empty));
            assert!(!input.script_sig.is_empty());
        }
        assert_eq!(
            output.duties,
            vec![SendProposalDuty::BroadcastTransaction {
                txid: condensed.txid(),
                tx: signed_tx.clone(),
            }]
        );
    }

    #[test]
    fn signatures_are_checked_per_witness() {
        let (committee, secret_keys, condensed) = test_condensed();
        let mut sm = SendProposalSM::new(7, 0, condensed.clone(), committee);
        let cfg = SendProposalCfg::default();
        let signatures = sign_inputs(&condensed, &secret_keys[1]).expect("signs");

        let wrong_key = sm.process_event(
            cfg,
            SendProposalEvent::SignaturesReceived {
                witness: 0,
                signatures: signatures.clone(),
            },
        );
        assert!(matches!(
            wrong_key,
            Err(SPSMError::SignatureInvalid { witness: 0, .. })
        ));

        let stranger = sm.process_event(
            cfg,
            SendProposalEvent::SignaturesReceived {
                witness: 9,
                signatures: signatures.clone(),
            },
        );
        assert_eq!(stranger, Err(SPSMError::NotSigner(9)));

        sm.process_event(
            cfg,
            SendProposalEvent::SignaturesReceived {
                witness: 1,
                signatures: signatures.clone(),
            },
        )
        .expect("valid approval");
        let again = sm.process_event(
            cfg,
            SendProposalEvent::SignaturesReceived {
                witness: 1,
                signatures,
            },
        );
        assert_eq!(again, Err(SPSMError::AlreadyApproved(1)));
    }

    fn settlement_event() -> impl Strategy<Value = SendProposalEvent> {
        prop_oneof![
            (0u32..10).prop_map(|confirmations| {
                SendProposalEvent::ConfirmationsObserved { confirmations }
            }),
            Just(SendProposalEvent::Issued),
            Just(SendProposalEvent::Reverted),
            Just(SendProposalEvent::Expired),
        ]
    }

    proptest! {
        #[test]
        fn settled_proposals_never_change(
            events in prop::collection::vec(settlement_event(), 1..8),
            settled_by_issue in any::<bool>(),
        ) {
            let tx = signed_tx();
            let mut sm = test_send_sm(SendProposalState::Sent { signed_tx: tx, confirmations: 6 });
            let settle = if settled_by_issue {
                SendProposalEvent::Issued
            } else {
                SendProposalEvent::Reverted
            };
            sm.process_event(SendProposalCfg::default(), settle).expect("settles");
            let settled = sm.state().clone();

            for event in events {
                prop_assert!(sm.process_event(SendProposalCfg::default(), event).is_err());
                prop_assert_eq!(sm.state(), &settled);
            }
        }
    }
}
