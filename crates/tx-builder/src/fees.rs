//! Size estimation and fee arithmetic.
//!
//! All arithmetic is integer arithmetic on satoshis. Fee rates are in sats/kvB and the committee
//! share is in basis points.

use bitcoin::{Amount, Script, ScriptBuf, Transaction, Witness};
use btc_peg_primitives::{
    codec,
    multisig::{parse_multisig_script, witness_program},
    script::p2sh_witness_program_script_sig,
};

/// Upper bound of a DER-encoded ECDSA signature plus its sighash byte.
pub const MAX_SIGNATURE_SIZE: usize = 72;

/// Size of the key placeholder used for scripts that are not multisig scripts.
pub const PLACEHOLDER_KEY_SIZE: usize = 34;

/// Basis points in 100%.
pub const BASIS_POINTS: u64 = 10_000;

/// The largest witness that spending an output locked by `redeem_script` can need.
///
/// For a k-of-n multisig this is the dummy element, `k` signatures and the script itself.
pub fn placeholder_witness(redeem_script: &Script) -> Witness {
    match parse_multisig_script(redeem_script) {
        Some((k, _)) => {
            let mut witness = Witness::new();
            witness.push(Vec::<u8>::new());
            for _ in 0..k {
                witness.push([0u8; MAX_SIGNATURE_SIZE]);
            }
            witness.push(redeem_script.as_bytes());

            witness
        }
        None => Witness::from_slice(&[
            vec![0u8; MAX_SIGNATURE_SIZE],
            vec![0u8; PLACEHOLDER_KEY_SIZE],
        ]),
    }
}

/// Virtual size of `tx` once every input carries its largest possible scriptSig and witness.
///
/// `redeem_scripts` holds the redeem script of each input, in input order.
pub fn estimate_vsize(tx: &Transaction, redeem_scripts: &[ScriptBuf]) -> usize {
    assert_eq!(
        tx.input.len(),
        redeem_scripts.len(),
        "every input must have a redeem script"
    );

    let mut scratch = tx.clone();
    for (input, redeem_script) in scratch.input.iter_mut().zip(redeem_scripts) {
        input.script_sig = p2sh_witness_program_script_sig(&witness_program(redeem_script));
        input.witness = placeholder_witness(redeem_script);
    }

    codec::vsize(&scratch)
}

/// `max(min_relay_fee, fee_rate * vsize / 1000)` with the rate in sats/kvB.
pub fn estimate_fee(vsize: usize, fee_rate_sat_per_kvb: u64, min_relay_fee: Amount) -> Amount {
    let size_fee = fee_rate_sat_per_kvb.saturating_mul(vsize as u64) / 1000;

    Amount::from_sat(size_fee).max(min_relay_fee)
}

/// The share of `fee` borne by each of `units` deposits and withdrawals, rounded up.
pub fn per_unit_share(fee: Amount, units: usize) -> Amount {
    assert!(units > 0, "fee must be shared by at least one unit");

    Amount::from_sat(fee.to_sat().div_ceil(units as u64))
}

/// `floor(value * bp / 10000)`.
pub fn witness_fee(value: Amount, witness_fee_bp: u64) -> Amount {
    let fee = u128::from(value.to_sat()) * u128::from(witness_fee_bp) / u128::from(BASIS_POINTS);

    Amount::from_sat(fee as u64)
}

/// Splits `total` into `parts` shares that differ by at most one satoshi.
///
/// The first `total % parts` shares get the extra satoshi.
pub fn split_evenly(total: Amount, parts: usize) -> Vec<Amount> {
    if parts == 0 {
        return Vec::new();
    }

    let parts_u64 = parts as u64;
    let base = total.to_sat() / parts_u64;
    let remainder = (total.to_sat() % parts_u64) as usize;

    (0..parts)
        .map(|i| Amount::from_sat(base + u64::from(i < remainder)))
        .collect()
}

#[cfg(test)]
mod tests {
    use bitcoin::{absolute::LockTime, transaction::Version, OutPoint, Sequence, TxIn, TxOut};
    use btc_peg_primitives::{multisig::build_redeem_script, script::Payload};
    use btc_peg_test_utils::prelude::*;
    use proptest::prelude::*;

    use super::*;

    fn one_input_tx(redeem: &ScriptBuf) -> (Transaction, Vec<ScriptBuf>) {
        let tx = Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: vec![TxIn {
                previous_output: OutPoint::null(),
                script_sig: ScriptBuf::new(),
                sequence: Sequence::MAX,
                witness: Witness::new(),
            }],
            output: vec![TxOut {
                value: Amount::from_sat(1_000),
                script_pubkey: Payload::P2wpkh([1u8; 20]).script_pubkey(),
            }],
        };

        (tx, vec![redeem.clone()])
    }

    #[test]
    fn multisig_placeholder_has_k_signatures() {
        let (committee, _) = test_committee(3, 2);
        let redeem = build_redeem_script(2, &committee.public_key_table()).expect("valid");

        let witness = placeholder_witness(&redeem);

        assert_eq!(witness.len(), 4);
        assert!(witness.nth(0).is_some_and(|el| el.is_empty()));
        assert!(witness.nth(1).is_some_and(|el| el.len() == MAX_SIGNATURE_SIZE));
        assert_eq!(witness.last(), Some(redeem.as_bytes()));
    }

    #[test]
    fn unknown_script_falls_back_to_key_and_signature() {
        let witness = placeholder_witness(&ScriptBuf::from_bytes(vec![0x51]));

        assert_eq!(witness.len(), 2);
        assert!(witness.nth(1).is_some_and(|el| el.len() == PLACEHOLDER_KEY_SIZE));
    }

    #[test]
    fn estimate_counts_witness_at_a_discount() {
        let (committee, _) = test_committee(3, 2);
        let redeem = build_redeem_script(2, &committee.public_key_table()).expect("valid");
        let (tx, scripts) = one_input_tx(&redeem);

        let estimated = estimate_vsize(&tx, &scripts);
        let bare = codec::vsize(&tx);

        // scriptSig is 35 bytes at full weight, the witness is discounted
        let witness_len = 1 + 1 + 2 * (1 + MAX_SIGNATURE_SIZE) + 1 + redeem.len();
        let expected_weight = 4 * (bare + 35) + 2 + witness_len;
        assert_eq!(estimated, expected_weight.div_ceil(4));
    }

    #[test]
    fn fee_has_a_floor() {
        assert_eq!(
            estimate_fee(250, 1_000, Amount::from_sat(1_000)),
            Amount::from_sat(1_000)
        );
        assert_eq!(
            estimate_fee(250, 10_000, Amount::from_sat(1_000)),
            Amount::from_sat(2_500)
        );
    }

    #[test]
    fn shares_round_up() {
        assert_eq!(per_unit_share(Amount::from_sat(100), 20), Amount::from_sat(5));
        assert_eq!(per_unit_share(Amount::from_sat(101), 20), Amount::from_sat(6));
        assert_eq!(witness_fee(Amount::from_sat(1_995), 100), Amount::from_sat(19));
    }

    proptest! {
        #[test]
        fn split_is_exact_and_fair(total in 0u64..1_000_000, parts in 1usize..20) {
            let shares = split_evenly(Amount::from_sat(total), parts);

            prop_assert_eq!(shares.len(), parts);
            prop_assert_eq!(shares.iter().map(|a| a.to_sat()).sum::<u64>(), total);

            let max = shares.iter().max().expect("non-empty");
            let min = shares.iter().min().expect("non-empty");
            prop_assert!(max.to_sat() - min.to_sat() <= 1);
            prop_assert!(shares.windows(2).all(|w| w[0] >= w[1]));
        }
    }
}
