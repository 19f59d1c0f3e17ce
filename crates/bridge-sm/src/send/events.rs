//! The events that drive a send proposal.

use std::fmt::Display;

use btc_peg_primitives::types::WitnessIdx;
use secp256k1::ecdsa::Signature;

/// The external events that affect a send proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendProposalEvent {
    /// A witness approved the proposal with one signature per input.
    SignaturesReceived {
        /// The approving witness.
        witness: WitnessIdx,
        /// The signatures, in input order.
        signatures: Vec<Signature>,
    },

    /// The poller reported the confirmation count of the signed transaction.
    ConfirmationsObserved {
        /// Number of blocks on top of the including block.
        confirmations: u32,
    },

    /// The deposits of the transaction were credited.
    Issued,

    /// The transaction was reverted.
    Reverted,

    /// The proposal engine timed the proposal out.
    Expired,
}

impl Display for SendProposalEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SignaturesReceived { witness, .. } => {
                write!(f, "SignaturesReceived from witness {witness}")
            }
            Self::ConfirmationsObserved { confirmations } => {
                write!(f, "ConfirmationsObserved({confirmations})")
            }
            Self::Issued => write!(f, "Issued"),
            Self::Reverted => write!(f, "Reverted"),
            Self::Expired => write!(f, "Expired"),
        }
    }
}
