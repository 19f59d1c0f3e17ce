//! Errors related to the state transitions of a send proposal.

use btc_peg_primitives::types::WitnessIdx;
use thiserror::Error;

/// Errors that can occur in the send proposal state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SPSMError {
    /// The witness holds none of the keys the transaction is locked to.
    #[error("witness {0} is not a signer of this proposal")]
    NotSigner(WitnessIdx),

    /// The witness has already approved the proposal.
    #[error("witness {0} already approved this proposal")]
    AlreadyApproved(WitnessIdx),

    /// A signature does not verify.
    #[error("invalid signature from witness {witness}: {reason}")]
    SignatureInvalid {
        /// The signer.
        witness: WitnessIdx,
        /// What is wrong with the signature.
        reason: String,
    },

    /// The threshold has already been reached.
    #[error("no signature slot remains")]
    SignatureSlotExhausted,

    /// An invalid event was received for the current state.
    #[error("received invalid event {event} in state {state}; reason: {reason:?}")]
    InvalidEvent {
        /// The state in which the event was received.
        state: String,
        /// The invalid event that was received.
        event: String,
        /// The reason for the invalidity.
        reason: Option<String>,
    },
}

/// The result type for operations in the send proposal state machine.
pub type SPSMResult<T> = Result<T, SPSMError>;
