//! Crate-agnostic test fixtures for the peg.
//!
//! Provides shared constants and helpers (committees, params, addresses) that multiple crates
//! (db, tx-builder, bridge-sm, btc-rpc) need for testing.

use bitcoin::{Address, Amount, CompressedPublicKey, Network};
use btc_peg_params::prelude::BridgeParams;
use btc_peg_primitives::{
    committee::CommitteeTable,
    types::{PublickeyTable, WitnessIdx},
};
use secp256k1::{PublicKey, SecretKey, SECP256K1};

use crate::bitcoin::generate_keypairs;

// ===== Shared Test Constants =====

/// Network used in tests.
pub const TEST_NETWORK: Network = Network::Regtest;

/// Sidechain asset that represents pegged BTC in tests.
pub const TEST_PEG_ASSET: u64 = 7;

/// Minimum relay fee used in tests.
pub const TEST_MIN_RELAY_FEE: Amount = Amount::from_sat(100);

/// Fee rate used in tests, in sats/kvB.
pub const TEST_FEE_RATE: u64 = 1_000;

// ===== Shared Test Helpers =====

/// Deterministic secret keys for a committee of `n` witnesses.
pub fn test_committee_keys(n: usize) -> Vec<SecretKey> {
    (0..n)
        .map(|idx| {
            let byte = u8::try_from(idx + 1).expect("witness index too large for test keys");
            SecretKey::from_slice(&[byte; 32]).expect("non-zero key")
        })
        .collect()
}

/// Creates a deterministic committee of `n` witnesses with threshold `k`.
pub fn test_committee(n: usize, k: usize) -> (CommitteeTable, Vec<SecretKey>) {
    let secret_keys = test_committee_keys(n);
    let members = secret_keys
        .iter()
        .enumerate()
        .map(|(idx, sk)| (idx as WitnessIdx, PublicKey::from_secret_key(SECP256K1, sk)))
        .collect();

    let committee = CommitteeTable::new(PublickeyTable(members), k)
        .expect("Failed to create test committee");

    (committee, secret_keys)
}

/// Bridge params on regtest with small fees so that tiny amounts can be condensed.
pub fn test_bridge_params() -> BridgeParams {
    BridgeParams {
        network: TEST_NETWORK,
        peg_asset_id: TEST_PEG_ASSET,
        min_relay_fee: TEST_MIN_RELAY_FEE,
        default_fee_rate: TEST_FEE_RATE,
        ..Default::default()
    }
}

/// Creates a random P2WPKH regtest address.
pub fn random_regtest_address() -> String {
    let (pubkeys, _) = generate_keypairs(1);

    Address::p2wpkh(&CompressedPublicKey(pubkeys[0]), TEST_NETWORK).to_string()
}
