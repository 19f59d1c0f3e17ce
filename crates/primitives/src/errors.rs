//! Errors for the Bitcoin primitives of the peg.

use thiserror::Error;

/// Errors that can occur while decoding raw Bitcoin transactions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The bytes do not form a canonical, complete transaction.
    ///
    /// This covers non-canonical compact-size integers, truncated input, script lengths that run
    /// past the end of the buffer and trailing bytes.
    #[error("malformed transaction: {0}")]
    MalformedTransaction(String),

    /// The hex string could not be decoded into bytes.
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

/// Errors that can occur while parsing an external Bitcoin address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// The string is not a valid Base58Check or Bech32 address.
    #[error("could not parse address {address}: {reason}")]
    Unparseable {
        /// The address as supplied by the user.
        address: String,
        /// The parser error.
        reason: String,
    },

    /// The address is valid but for a different network.
    #[error("address {address} is not valid for network {network}")]
    WrongNetwork {
        /// The address as supplied by the user.
        address: String,
        /// The network the bridge runs on.
        network: bitcoin::Network,
    },

    /// The address encodes a witness program or script that the bridge cannot pay to.
    #[error("address {0} has an unsupported output type")]
    Unsupported(String),
}

/// Errors that can occur while building multisig scripts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MultisigError {
    /// The threshold must satisfy `1 <= k < n`.
    #[error("invalid multisig threshold {k} for {n} keys (need 1 <= k < n)")]
    InvalidThreshold {
        /// The requested threshold.
        k: usize,
        /// The number of keys.
        n: usize,
    },

    /// `OP_CHECKMULTISIG` scripts built with small-integer opcodes cannot exceed 16 keys.
    #[error("too many keys for a multisig script: {0} (max 16)")]
    TooManyKeys(usize),

    /// The same key is registered for more than one witness.
    #[error("duplicate key in multisig key table")]
    DuplicateKey,
}
