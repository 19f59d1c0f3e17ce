//! Module to generate arbitrary Bitcoin values for testing.
use std::collections::HashSet;

use bitcoin::{
    absolute::LockTime,
    block,
    hashes::Hash,
    key::rand::{rngs::OsRng, Rng},
    secp256k1::{Keypair, SecretKey, SECP256K1},
    transaction::Version,
    Amount, Block, BlockHash, CompactTarget, OutPoint, ScriptBuf, Sequence, Transaction, TxIn,
    TxMerkleNode, TxOut, Txid, Witness,
};
use secp256k1::PublicKey;

/// Generates a random transaction ID.
pub fn generate_txid() -> Txid {
    let mut txid = [0u8; 32];
    OsRng.fill(&mut txid);

    Txid::from_slice(&txid).expect("should be able to generate arbitrary txid")
}

/// Generates a random outpoint.
pub fn generate_outpoint() -> OutPoint {
    let vout: u32 = OsRng.gen_range(0..16);

    OutPoint {
        txid: generate_txid(),
        vout,
    }
}

/// Generate `count` (public key, private key) pairs as two separate [`Vec`].
pub fn generate_keypairs(count: usize) -> (Vec<PublicKey>, Vec<SecretKey>) {
    let mut secret_keys: Vec<SecretKey> = Vec::with_capacity(count);
    let mut pubkeys: Vec<PublicKey> = Vec::with_capacity(count);

    let mut pubkeys_set: HashSet<PublicKey> = HashSet::new();

    while pubkeys_set.len() != count {
        let sk = SecretKey::new(&mut OsRng);
        let keypair = Keypair::from_secret_key(SECP256K1, &sk);
        let pubkey = PublicKey::from_keypair(&keypair);

        if pubkeys_set.insert(pubkey) {
            secret_keys.push(sk);
            pubkeys.push(pubkey);
        }
    }

    (pubkeys, secret_keys)
}

/// Generates a transaction paying the given outputs from random outpoints.
pub fn generate_tx_paying(num_inputs: usize, outputs: Vec<TxOut>) -> Transaction {
    let inputs = (0..num_inputs)
        .map(|_| TxIn {
            previous_output: generate_outpoint(),
            witness: Witness::new(),
            sequence: Sequence::MAX,
            script_sig: ScriptBuf::new(),
        })
        .collect();

    Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: inputs,
        output: outputs,
    }
}

/// Generates a random transaction with empty scripts.
pub fn generate_tx(num_inputs: usize, num_outputs: usize) -> Transaction {
    let outputs = (0..num_outputs)
        .map(|_| {
            let value: u32 = OsRng.gen();

            TxOut {
                value: Amount::from_sat(value as u64),
                script_pubkey: ScriptBuf::new(),
            }
        })
        .collect();

    generate_tx_paying(num_inputs, outputs)
}

/// Wraps the transactions into a block with a zeroed header.
pub fn generate_block(txdata: Vec<Transaction>) -> Block {
    Block {
        header: block::Header {
            version: block::Version::TWO,
            prev_blockhash: BlockHash::all_zeros(),
            merkle_root: TxMerkleNode::all_zeros(),
            time: 0,
            bits: CompactTarget::from_consensus(0),
            nonce: 0,
        },
        txdata,
    }
}
