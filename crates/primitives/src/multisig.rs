//! k-of-n multisig scripts and the P2SH-P2WSH address of the committee wallet.
//!
//! Keys always enter the script in ascending [`WitnessIdx`](crate::types::WitnessIdx) order, so the
//! script and address are pure functions of the threshold and the key table.

use bitcoin::{
    hashes::{sha256, Hash},
    opcodes::all::OP_CHECKMULTISIG,
    script::Builder,
    Address, Network, Script, ScriptBuf,
};
use secp256k1::PublicKey;

use crate::{errors::MultisigError, script::Payload, types::PublickeyTable};

/// The largest key count expressible with a small-integer opcode.
pub const MAX_MULTISIG_KEYS: usize = 16;

const OP_PUSHNUM_1: u8 = 0x51;
const OP_PUSHNUM_16: u8 = 0x60;
const OP_PUSHBYTES_33: u8 = 0x21;
const COMPRESSED_KEY_LEN: usize = 33;

/// Builds `OP_k <key_0> ... <key_{n-1}> OP_n OP_CHECKMULTISIG`.
///
/// The threshold must satisfy `1 <= k < n` so that the committee can still spend after losing one
/// signer.
pub fn build_redeem_script(k: usize, keys: &PublickeyTable) -> Result<ScriptBuf, MultisigError> {
    let n = keys.len();
    if n > MAX_MULTISIG_KEYS {
        return Err(MultisigError::TooManyKeys(n));
    }
    if k == 0 || k >= n {
        return Err(MultisigError::InvalidThreshold { k, n });
    }

    let builder = keys
        .keys()
        .fold(Builder::new().push_int(k as i64), |builder, key| {
            builder.push_key(&bitcoin::PublicKey::new(*key))
        });

    Ok(builder
        .push_int(n as i64)
        .push_opcode(OP_CHECKMULTISIG)
        .into_script())
}

/// Parses a script produced by [`build_redeem_script`] back into its threshold and keys.
///
/// Returns [`None`] for anything that is not a compressed-key `OP_CHECKMULTISIG` script.
pub fn parse_multisig_script(script: &Script) -> Option<(usize, Vec<PublicKey>)> {
    let bytes = script.as_bytes();
    let (&first, rest) = bytes.split_first()?;
    let (&last, rest) = rest.split_last()?;
    let (&n_op, mut body) = rest.split_last()?;

    if last != OP_CHECKMULTISIG.to_u8() {
        return None;
    }

    let k = small_int(first)?;
    let n = small_int(n_op)?;

    let mut keys = Vec::with_capacity(n);
    while let Some((&push, tail)) = body.split_first() {
        if push != OP_PUSHBYTES_33 || tail.len() < COMPRESSED_KEY_LEN {
            return None;
        }
        let (key, tail) = tail.split_at(COMPRESSED_KEY_LEN);
        keys.push(PublicKey::from_slice(key).ok()?);
        body = tail;
    }

    (keys.len() == n && k <= n).then_some((k, keys))
}

fn small_int(opcode: u8) -> Option<usize> {
    (OP_PUSHNUM_1..=OP_PUSHNUM_16)
        .contains(&opcode)
        .then(|| (opcode - OP_PUSHNUM_1 + 1) as usize)
}

/// A k-of-n multisig redeem script together with the key table it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultisigAddress {
    threshold: usize,
    keys: PublickeyTable,
    redeem_script: ScriptBuf,
}

impl MultisigAddress {
    /// Builds the redeem script for the given threshold and keys.
    pub fn new(threshold: usize, keys: &PublickeyTable) -> Result<Self, MultisigError> {
        let redeem_script = build_redeem_script(threshold, keys)?;

        Ok(Self {
            threshold,
            keys: keys.clone(),
            redeem_script,
        })
    }

    /// Number of signatures required to spend.
    pub const fn threshold(&self) -> usize {
        self.threshold
    }

    /// The keys, in script order.
    pub const fn keys(&self) -> &PublickeyTable {
        &self.keys
    }

    /// The redeem script.
    pub fn redeem_script(&self) -> &Script {
        &self.redeem_script
    }
}

/// The committee wallet address: a [`MultisigAddress`] wrapped as P2SH-P2WSH.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultisigSegwitAddress {
    multisig: MultisigAddress,
    witness_script: ScriptBuf,
    address: Address,
}

impl MultisigSegwitAddress {
    /// Derives the segwit address for the given threshold and keys on `network`.
    pub fn new(
        threshold: usize,
        keys: &PublickeyTable,
        network: Network,
    ) -> Result<Self, MultisigError> {
        let multisig = MultisigAddress::new(threshold, keys)?;
        let witness_script = witness_program(multisig.redeem_script());
        let address =
            Address::p2sh(&witness_script, network).expect("witness program is 34 bytes");

        Ok(Self {
            multisig,
            witness_script,
            address,
        })
    }

    /// The underlying multisig.
    pub const fn multisig(&self) -> &MultisigAddress {
        &self.multisig
    }

    /// The redeem script, i.e. the script that goes last on the witness stack.
    pub fn redeem_script(&self) -> &Script {
        self.multisig.redeem_script()
    }

    /// `OP_0 <sha256(redeem_script)>`.
    pub fn witness_script(&self) -> &Script {
        &self.witness_script
    }

    /// The P2SH address of the witness script.
    pub const fn address(&self) -> &Address {
        &self.address
    }

    /// The scriptPubKey that pays to this wallet.
    pub fn script_pubkey(&self) -> ScriptBuf {
        self.address.script_pubkey()
    }
}

/// Returns the version-0 witness program `OP_0 <sha256(script)>`.
pub fn witness_program(script: &Script) -> ScriptBuf {
    let hash = sha256::Hash::hash(script.as_bytes());

    Payload::P2wsh(hash.to_byte_array()).script_pubkey()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use proptest::prelude::*;
    use secp256k1::{SecretKey, SECP256K1};

    use super::*;
    use crate::{
        script::ScriptType,
        test_utils::{generate_keypairs, generate_pubkey_table},
        types::WitnessIdx,
    };

    fn sorted_keys(count: usize) -> Vec<PublicKey> {
        let (mut pubkeys, _) = generate_keypairs(count);
        pubkeys.sort();
        pubkeys
    }

    #[test]
    fn two_of_three_layout() {
        let keys = sorted_keys(3);
        let table = generate_pubkey_table(&keys);

        let script = build_redeem_script(2, &table).expect("valid threshold");

        let mut expected = vec![0x52];
        for key in &keys {
            expected.push(0x21);
            expected.extend_from_slice(&key.serialize());
        }
        expected.extend_from_slice(&[0x53, 0xae]);

        assert_eq!(script.as_bytes(), expected.as_slice());
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let keys = sorted_keys(3);

        let mut forward = BTreeMap::new();
        for (idx, key) in keys.iter().enumerate() {
            forward.insert(idx as WitnessIdx, *key);
        }
        let mut backward = BTreeMap::new();
        for (idx, key) in keys.iter().enumerate().rev() {
            backward.insert(idx as WitnessIdx, *key);
        }

        assert_eq!(
            build_redeem_script(2, &forward.into()),
            build_redeem_script(2, &backward.into())
        );
    }

    #[test]
    fn keys_follow_witness_order_not_key_order() {
        let keys = sorted_keys(3);
        // the largest key gets the smallest witness index
        let table: PublickeyTable =
            BTreeMap::from([(0, keys[2]), (1, keys[0]), (2, keys[1])]).into();

        let (_, parsed) =
            parse_multisig_script(&build_redeem_script(2, &table).expect("valid threshold"))
                .expect("must parse");

        assert_eq!(parsed, vec![keys[2], keys[0], keys[1]]);
    }

    #[test]
    fn threshold_bounds_are_strict() {
        let table = generate_pubkey_table(&sorted_keys(3));

        assert_eq!(
            build_redeem_script(0, &table),
            Err(MultisigError::InvalidThreshold { k: 0, n: 3 })
        );
        assert_eq!(
            build_redeem_script(3, &table),
            Err(MultisigError::InvalidThreshold { k: 3, n: 3 })
        );
        assert!(build_redeem_script(1, &table).is_ok());

        let too_many = generate_pubkey_table(&sorted_keys(17));
        assert_eq!(
            build_redeem_script(2, &too_many),
            Err(MultisigError::TooManyKeys(17))
        );
    }

    #[test]
    fn parse_inverts_build() {
        let keys = sorted_keys(5);
        let script = build_redeem_script(3, &generate_pubkey_table(&keys)).expect("valid");

        assert_eq!(parse_multisig_script(&script), Some((3, keys)));
        assert_eq!(parse_multisig_script(&witness_program(&script)), None);
        assert_eq!(parse_multisig_script(Script::new()), None);
    }

    #[test]
    fn segwit_address_wraps_witness_program() {
        let table = generate_pubkey_table(&sorted_keys(3));
        let wallet = MultisigSegwitAddress::new(2, &table, Network::Regtest).expect("valid");

        let witness_script = wallet.witness_script().as_bytes();
        assert_eq!(witness_script.len(), 34);
        assert_eq!(&witness_script[..2], &[0x00, 0x20]);
        assert_eq!(
            &witness_script[2..],
            sha256::Hash::hash(wallet.redeem_script().as_bytes()).as_byte_array()
        );

        assert_eq!(
            ScriptType::classify(&wallet.script_pubkey()),
            ScriptType::P2sh
        );
        assert_eq!(
            wallet.address(),
            &Address::p2shwsh(wallet.redeem_script(), Network::Regtest)
        );
    }

    fn table_from_seeds(seeds: &[u8]) -> PublickeyTable {
        seeds
            .iter()
            .enumerate()
            .map(|(idx, seed)| {
                let sk = SecretKey::from_slice(&[*seed; 32]).expect("non-zero seed");
                (idx as WitnessIdx, PublicKey::from_secret_key(SECP256K1, &sk))
            })
            .collect::<BTreeMap<_, _>>()
            .into()
    }

    proptest! {
        #[test]
        fn derivation_is_deterministic(
            seeds in proptest::collection::btree_set(1u8..=200, 2..=MAX_MULTISIG_KEYS),
            k_seed in any::<usize>(),
        ) {
            let seeds: Vec<u8> = seeds.into_iter().collect();
            let k = 1 + k_seed % (seeds.len() - 1);

            let first = MultisigSegwitAddress::new(k, &table_from_seeds(&seeds), Network::Bitcoin)
                .expect("valid threshold");
            let second = MultisigSegwitAddress::new(k, &table_from_seeds(&seeds), Network::Bitcoin)
                .expect("valid threshold");

            prop_assert_eq!(first.redeem_script().as_bytes(), second.redeem_script().as_bytes());
            prop_assert_eq!(first.address(), second.address());
            prop_assert_eq!(
                parse_multisig_script(first.redeem_script()).map(|(k, keys)| (k, keys.len())),
                Some((k, seeds.len()))
            );
        }
    }
}
