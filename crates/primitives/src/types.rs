//! Identifiers and key tables shared across the peg.

use std::{collections::BTreeMap, fmt};

use bitcoin::{
    hashes::{sha256, Hash, HashEngine},
    OutPoint,
};
use secp256k1::PublicKey;
use serde::{Deserialize, Serialize};

/// Identifier of a witness account on the host chain.
pub type WitnessIdx = u32;

/// Identifier of a regular account on the host chain.
pub type AccountId = u64;

/// Identifier of an asset on the host chain.
pub type AssetId = u64;

/// Insertion-ordered identifier of a pending withdrawal request.
pub type VoutId = u64;

/// Identifier of a proposal in the host chain's generic proposal engine.
pub type ProposalId = u64;

/// Stable identifier of a UTXO controlled by the bridge.
///
/// It is the SHA-256 of the consensus encoding of the [`OutPoint`] (`txid || vout_le`), so every
/// witness derives the same identifier for the same output without any coordination.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UtxoId(sha256::Hash);

impl UtxoId {
    /// Computes the identifier of the given [`OutPoint`].
    pub fn from_outpoint(outpoint: &OutPoint) -> Self {
        let mut engine = sha256::Hash::engine();
        engine.input(outpoint.txid.as_byte_array());
        engine.input(&outpoint.vout.to_le_bytes());

        Self(sha256::Hash::from_engine(engine))
    }

    /// Returns the underlying hash.
    pub const fn as_hash(&self) -> &sha256::Hash {
        &self.0
    }
}

impl fmt::Display for UtxoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A table that maps [`WitnessIdx`] to the corresponding [`PublicKey`].
///
/// Iteration order is the ascending order of the witness identifiers, which is the order in which
/// keys appear in every multisig script derived from this table.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct PublickeyTable(pub BTreeMap<WitnessIdx, PublicKey>);

impl PublickeyTable {
    /// Number of keys in the table.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the table has no keys.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keys in ascending witness order.
    pub fn keys(&self) -> impl Iterator<Item = &PublicKey> {
        self.0.values()
    }
}

impl From<BTreeMap<WitnessIdx, PublicKey>> for PublickeyTable {
    fn from(value: BTreeMap<WitnessIdx, PublicKey>) -> Self {
        Self(value)
    }
}

impl From<PublickeyTable> for Vec<PublicKey> {
    fn from(value: PublickeyTable) -> Self {
        value.0.values().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use bitcoin::Txid;

    use super::*;

    #[test]
    fn utxo_id_depends_on_txid_and_vout() {
        let txid = Txid::from_byte_array([7u8; 32]);
        let a = UtxoId::from_outpoint(&OutPoint { txid, vout: 0 });
        let b = UtxoId::from_outpoint(&OutPoint { txid, vout: 1 });
        let c = UtxoId::from_outpoint(&OutPoint { txid, vout: 0 });

        assert_ne!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn utxo_id_hashes_txid_then_le_vout() {
        let txid = Txid::from_byte_array([1u8; 32]);
        let mut preimage = vec![1u8; 32];
        preimage.extend_from_slice(&5u32.to_le_bytes());

        let expected = sha256::Hash::hash(&preimage);
        let actual = UtxoId::from_outpoint(&OutPoint { txid, vout: 5 });

        assert_eq!(actual.as_hash(), &expected);
    }
}
