//! Raw transaction encoding and decoding.
//!
//! The wire format is the one defined by Bitcoin Core (legacy and BIP-144 segwit serialization).
//! Encoding is delegated to [`bitcoin::consensus`], which already rejects non-canonical
//! compact-size integers, truncated buffers and trailing data. This module pins down the exact
//! contract the bridge relies on and maps decoder failures into [`CodecError`].

use bitcoin::{consensus, hex::FromHex, Transaction, Txid, Wtxid};

use crate::errors::CodecError;

/// Serializes a transaction.
///
/// With `include_witness` set, the segwit marker and flag are emitted if and only if at least one
/// input carries a non-empty witness. Without it, the stripped (txid) form is produced.
pub fn serialize(tx: &Transaction, include_witness: bool) -> Vec<u8> {
    if include_witness {
        consensus::serialize(tx)
    } else {
        consensus::serialize(&strip_witness(tx))
    }
}

/// Serializes a transaction into a lowercase hex string, witness included.
pub fn serialize_hex(tx: &Transaction) -> String {
    consensus::encode::serialize_hex(tx)
}

/// Deserializes a transaction from its raw bytes.
///
/// The whole buffer must be consumed.
pub fn deserialize(bytes: &[u8]) -> Result<Transaction, CodecError> {
    consensus::deserialize(bytes).map_err(|e| CodecError::MalformedTransaction(e.to_string()))
}

/// Deserializes a transaction from a hex string.
pub fn deserialize_hex(hex: &str) -> Result<Transaction, CodecError> {
    let bytes = Vec::<u8>::from_hex(hex).map_err(|e| CodecError::InvalidHex(e.to_string()))?;

    deserialize(&bytes)
}

/// Returns a copy of the transaction with every witness stack removed.
pub fn strip_witness(tx: &Transaction) -> Transaction {
    let mut stripped = tx.clone();
    stripped
        .input
        .iter_mut()
        .for_each(|input| input.witness.clear());

    stripped
}

/// Double-SHA256 of the stripped serialization.
pub fn txid(tx: &Transaction) -> Txid {
    tx.compute_txid()
}

/// Double-SHA256 of the witness serialization.
pub fn wtxid(tx: &Transaction) -> Wtxid {
    tx.compute_wtxid()
}

/// Virtual size: `ceil((3 * stripped_size + total_size) / 4)`.
pub fn vsize(tx: &Transaction) -> usize {
    let stripped_size = serialize(tx, false).len();
    let total_size = serialize(tx, true).len();

    (3 * stripped_size + total_size).div_ceil(4)
}
