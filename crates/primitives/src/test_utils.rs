//! Test utilities for the primitives.
//!
//! These utilities are not written in the `test-utils` crate to keep the primitives crate
//! completely independent.
use std::collections::{BTreeMap, HashSet};

use bitcoin::{
    key::rand::rngs::OsRng,
    secp256k1::{Keypair, PublicKey, SecretKey, SECP256K1},
};

use crate::types::{PublickeyTable, WitnessIdx};

/// Generate `count` (public key, private key) pairs as two separate [`Vec`].
pub(crate) fn generate_keypairs(count: usize) -> (Vec<PublicKey>, Vec<SecretKey>) {
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

pub(crate) fn generate_pubkey_table(table: &[PublicKey]) -> PublickeyTable {
    let pubkey_table = table
        .iter()
        .enumerate()
        .map(|(i, pk)| (i as WitnessIdx, *pk))
        .collect::<BTreeMap<WitnessIdx, PublicKey>>();

    PublickeyTable::from(pubkey_table)
}
