//! The witness committee that controls the primary wallet.

use std::collections::BTreeMap;

use bitcoin::Network;
use secp256k1::PublicKey;
use serde::{Deserialize, Serialize};

use crate::{
    errors::MultisigError,
    multisig::{MultisigSegwitAddress, MAX_MULTISIG_KEYS},
    types::{PublickeyTable, WitnessIdx},
};

/// Bidirectional lookup between witness indices and their Bitcoin keys, plus the signing
/// threshold of the committee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitteeTable {
    threshold: usize,
    idx_key: BTreeMap<WitnessIdx, PublicKey>,
    key_idx: BTreeMap<PublicKey, WitnessIdx>,
}

impl CommitteeTable {
    /// Creates a committee from its keys and the number of signatures required to spend.
    ///
    /// Fails if the same key is registered twice or the threshold violates `1 <= k < n`.
    pub fn new(members: PublickeyTable, threshold: usize) -> Result<Self, MultisigError> {
        let n = members.len();
        if n > MAX_MULTISIG_KEYS {
            return Err(MultisigError::TooManyKeys(n));
        }
        if threshold == 0 || threshold >= n {
            return Err(MultisigError::InvalidThreshold { k: threshold, n });
        }

        let key_idx: BTreeMap<_, _> = members.0.iter().map(|(idx, key)| (*key, *idx)).collect();
        if key_idx.len() != n {
            return Err(MultisigError::DuplicateKey);
        }

        Ok(Self {
            threshold,
            idx_key: members.0,
            key_idx,
        })
    }

    /// Number of signatures required to spend from the committee wallet.
    pub const fn threshold(&self) -> usize {
        self.threshold
    }

    /// Number of members.
    pub fn cardinality(&self) -> usize {
        self.idx_key.len()
    }

    /// Whether the witness belongs to the committee.
    pub fn is_member(&self, idx: &WitnessIdx) -> bool {
        self.idx_key.contains_key(idx)
    }

    /// Key of the given witness.
    pub fn idx_to_btc_key(&self, idx: &WitnessIdx) -> Option<PublicKey> {
        self.idx_key.get(idx).copied()
    }

    /// Witness that owns the given key.
    pub fn btc_key_to_idx(&self, btc_key: &PublicKey) -> Option<WitnessIdx> {
        self.key_idx.get(btc_key).copied()
    }

    /// The keys of the committee ordered by witness index.
    pub fn public_key_table(&self) -> PublickeyTable {
        PublickeyTable(self.idx_key.clone())
    }

    /// Derives the current primary wallet.
    pub fn primary_wallet(&self, network: Network) -> MultisigSegwitAddress {
        MultisigSegwitAddress::new(self.threshold, &self.public_key_table(), network)
            .expect("threshold is validated at construction")
    }
}
