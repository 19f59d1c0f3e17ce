//! Errors of the condensing transaction builder.

use bitcoin::Amount;
use btc_peg_primitives::errors::AddressError;
use thiserror::Error;

/// Errors that can occur while building or signing a condensing transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// There is neither a deposit to sweep nor a withdrawal to pay.
    #[error("nothing to condense")]
    NothingToCondense,

    /// The inputs cannot pay for the outputs and the fee.
    #[error("insufficient fee coverage: {what} needs {needed} but only {available} is available")]
    InsufficientFeeCoverage {
        /// The output or total that would go negative.
        what: String,
        /// The amount that must be covered.
        needed: Amount,
        /// The amount that is available.
        available: Amount,
    },

    /// A withdrawal address cannot be paid to.
    #[error("invalid withdrawal address: {0}")]
    InvalidAddress(#[from] AddressError),

    /// A sum of amounts exceeds the supply of bitcoin.
    #[error("amount overflow")]
    AmountOverflow,

    /// An input carries fewer signatures than the threshold of its script.
    #[error("input {index} has {have} of the {need} required signatures")]
    MissingSignatures {
        /// The input index.
        index: usize,
        /// Number of signatures collected.
        have: usize,
        /// Number of signatures required.
        need: usize,
    },

    /// The sighash of an input could not be computed.
    #[error("sighash of input {index}: {reason}")]
    Sighash {
        /// The input index.
        index: usize,
        /// The underlying error.
        reason: String,
    },
}

/// Wrapper type for results that can fail with a [`BuildError`].
pub type BuildResult<T> = Result<T, BuildError>;
