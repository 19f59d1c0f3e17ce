//! Errors returned when the bridge rejects an operation.

use bitcoin::{Amount, Txid};
use btc_peg_db::{errors::DbError, models::UtxoRef};
use btc_peg_primitives::{
    errors::{AddressError, CodecError},
    types::{ProposalId, WitnessIdx},
};
use btc_peg_tx_builder::errors::BuildError;
use thiserror::Error;

use crate::{host::HostError, send::errors::SPSMError};

/// Reasons an operation is rejected.
///
/// A rejected operation leaves the bridge state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// A transaction could not be decoded.
    #[error("malformed transaction: {0}")]
    MalformedTransaction(#[from] CodecError),

    /// An address cannot be paid to on the configured network.
    #[error("invalid address: {0}")]
    InvalidAddress(#[from] AddressError),

    /// The inputs of a transaction cannot cover its outputs and fee.
    #[error("{0}")]
    InsufficientFeeCoverage(String),

    /// The transaction could not be built for another reason.
    #[error("could not build transaction: {0}")]
    Build(BuildError),

    /// An independent rebuild of the proposal disagrees with it.
    #[error("proposal mismatch: {0}")]
    ProposalMismatch(String),

    /// A ledger entry is referenced twice, by this proposal or by a pending one.
    #[error("{utxo_ref} is already referenced by proposal {proposal_id:?}")]
    DuplicateUtxoReference {
        /// The entry.
        utxo_ref: UtxoRef,
        /// The pending proposal that holds it, if any.
        proposal_id: Option<ProposalId>,
    },

    /// A referenced ledger entry does not exist or is already spent.
    #[error("unknown or spent {0}")]
    UnknownUtxoOrVout(UtxoRef),

    /// The primary wallet chain cannot be extended until its tail is settled.
    #[error("primary wallet change output is not spendable yet")]
    PrimaryWalletBusy,

    /// A deposit is locked to a script the committee cannot spend.
    #[error("deposit script is not the primary wallet script")]
    UnspendableDeposit,

    /// An amount must be positive.
    #[error("invalid amount {0}")]
    InvalidAmount(Amount),

    /// The witness is not part of the committee.
    #[error("witness {0} is not a committee member")]
    NotCommitteeMember(WitnessIdx),

    /// The witness already approved the proposal.
    #[error("witness {witness} already approved proposal {proposal_id}")]
    AlreadyApproved {
        /// The proposal.
        proposal_id: ProposalId,
        /// The witness.
        witness: WitnessIdx,
    },

    /// A signature does not verify.
    #[error("invalid signature: {0}")]
    SignatureInvalid(String),

    /// The proposal already reached its threshold.
    #[error("proposal {0} has no signature slot left")]
    SignatureSlotExhausted(ProposalId),

    /// No proposal with the identifier exists.
    #[error("unknown proposal {0}")]
    UnknownProposal(ProposalId),

    /// No sent transaction with the txid exists.
    #[error("unknown transaction {0}")]
    UnknownTransaction(Txid),

    /// The transaction to revert is not tracked.
    #[error("cannot revert unknown transaction {0}")]
    RevertOfUnknownTransaction(Txid),

    /// The transaction is not buried deep enough yet.
    #[error("transaction {txid} has {have} of {need} confirmations")]
    NotEnoughConfirmations {
        /// The transaction.
        txid: Txid,
        /// Confirmations observed.
        have: u32,
        /// Confirmations required.
        need: u32,
    },

    /// The event does not apply to the current state of the proposal.
    #[error("{0}")]
    InvalidEvent(String),

    /// A host chain service refused the request.
    #[error(transparent)]
    Host(#[from] HostError),

    /// A bridge table refused the request.
    #[error("db: {0}")]
    Db(#[from] DbError),
}

impl From<BuildError> for BridgeError {
    fn from(e: BuildError) -> Self {
        match e {
            BuildError::InvalidAddress(e) => Self::InvalidAddress(e),
            e @ BuildError::InsufficientFeeCoverage { .. } => {
                Self::InsufficientFeeCoverage(e.to_string())
            }
            e => Self::Build(e),
        }
    }
}

impl BridgeError {
    pub(crate) fn from_proposal(proposal_id: ProposalId, e: SPSMError) -> Self {
        match e {
            SPSMError::NotSigner(witness) => Self::NotCommitteeMember(witness),
            SPSMError::AlreadyApproved(witness) => Self::AlreadyApproved {
                proposal_id,
                witness,
            },
            e @ SPSMError::SignatureInvalid { .. } => Self::SignatureInvalid(e.to_string()),
            SPSMError::SignatureSlotExhausted => Self::SignatureSlotExhausted(proposal_id),
            e @ SPSMError::InvalidEvent { .. } => Self::InvalidEvent(e.to_string()),
        }
    }
}

/// Wrapper type for results of bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;
