//! The states of a send proposal.

use std::{collections::BTreeMap, fmt::Display};

use bitcoin::{Transaction, Txid};
use btc_peg_primitives::types::WitnessIdx;
use secp256k1::ecdsa::Signature;
use serde::{Deserialize, Serialize};

/// The state of a proposal to send a condensing transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SendProposalState {
    /// The proposal has been accepted and no witness has signed yet.
    Proposed,

    /// Some witnesses have signed, but fewer than the threshold.
    PartiallySigned {
        /// One signature per input from each witness that approved so far.
        signatures: BTreeMap<WitnessIdx, Vec<Signature>>,
    },

    /// The threshold was reached and the transaction is fully signed.
    Finalized {
        /// The signed transaction.
        signed_tx: Transaction,
    },

    /// The transaction has been observed on the Bitcoin chain.
    Sent {
        /// The signed transaction.
        signed_tx: Transaction,
        /// The latest observed confirmation count.
        confirmations: u32,
    },

    /// The deposits of the transaction have been credited.
    Confirmed {
        /// The confirmed transaction.
        txid: Txid,
    },

    /// The transaction was abandoned and its ledger entries restored.
    Reverted {
        /// The abandoned transaction.
        txid: Txid,
    },

    /// The proposal timed out before reaching the threshold.
    Expired,
}

impl SendProposalState {
    /// Whether signatures are still being collected.
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Proposed | Self::PartiallySigned { .. })
    }

    /// Whether no further event can change the state.
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Confirmed { .. } | Self::Reverted { .. } | Self::Expired
        )
    }
}

impl Display for SendProposalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Proposed => write!(f, "Proposed"),
            Self::PartiallySigned { signatures } => {
                write!(f, "PartiallySigned({})", signatures.len())
            }
            Self::Finalized { signed_tx } => write!(f, "Finalized({})", signed_tx.compute_txid()),
            Self::Sent {
                signed_tx,
                confirmations,
            } => write!(
                f,
                "Sent({}, {confirmations} confirmations)",
                signed_tx.compute_txid()
            ),
            Self::Confirmed { txid } => write!(f, "Confirmed({txid})"),
            Self::Reverted { txid } => write!(f, "Reverted({txid})"),
            Self::Expired => write!(f, "Expired"),
        }
    }
}
