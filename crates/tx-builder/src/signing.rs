//! BIP-143 signing of condensing transactions.

use std::collections::BTreeMap;

use bitcoin::{
    ecdsa,
    hashes::Hash,
    sighash::{EcdsaSighashType, SighashCache},
    Transaction, Witness,
};
use btc_peg_primitives::{
    multisig::{parse_multisig_script, witness_program},
    script::p2sh_witness_program_script_sig,
};
use secp256k1::{ecdsa::Signature, Message, PublicKey, SecretKey, SECP256K1};

use crate::{
    builder::{CondensedTransaction, SpentOutput},
    errors::{BuildError, BuildResult},
};

/// The `SIGHASH_ALL` segwit v0 message of input `index`.
pub fn sighash(tx: &Transaction, spent_outputs: &[SpentOutput], index: usize) -> BuildResult<Message> {
    let spent = spent_outputs.get(index).ok_or_else(|| BuildError::Sighash {
        index,
        reason: "no spent output for input".to_string(),
    })?;

    let mut cache = SighashCache::new(tx);
    let sighash = cache
        .p2wsh_signature_hash(
            index,
            &spent.redeem_script,
            spent.amount,
            EcdsaSighashType::All,
        )
        .map_err(|e| BuildError::Sighash {
            index,
            reason: e.to_string(),
        })?;

    Ok(Message::from_digest(sighash.to_byte_array()))
}

/// Signs every input of the transaction with `secret_key`, in input order.
pub fn sign_inputs(
    condensed: &CondensedTransaction,
    secret_key: &SecretKey,
) -> BuildResult<Vec<Signature>> {
    (0..condensed.tx.input.len())
        .map(|index| {
            let msg = sighash(&condensed.tx, &condensed.spent_outputs, index)?;

            Ok(SECP256K1.sign_ecdsa(&msg, secret_key))
        })
        .collect()
}

/// Whether `signature` is a valid signature of input `index` by `pubkey`.
pub fn verify_input_signature(
    tx: &Transaction,
    spent_outputs: &[SpentOutput],
    index: usize,
    signature: &Signature,
    pubkey: &PublicKey,
) -> bool {
    sighash(tx, spent_outputs, index)
        .is_ok_and(|msg| SECP256K1.verify_ecdsa(&msg, signature, pubkey).is_ok())
}

/// Fills in the scriptSig and witness of every input.
///
/// `signatures` holds, per input, the signatures collected so far keyed by signer. The first
/// `threshold` of them in script key order go on the witness stack, after the `OP_CHECKMULTISIG`
/// dummy and before the redeem script.
pub fn finalize_witnesses(
    mut tx: Transaction,
    spent_outputs: &[SpentOutput],
    signatures: &[BTreeMap<PublicKey, Signature>],
) -> BuildResult<Transaction> {
    for (index, input) in tx.input.iter_mut().enumerate() {
        let redeem_script = &spent_outputs
            .get(index)
            .ok_or_else(|| BuildError::Sighash {
                index,
                reason: "no spent output for input".to_string(),
            })?
            .redeem_script;
        let (threshold, keys) =
            parse_multisig_script(redeem_script).ok_or_else(|| BuildError::Sighash {
                index,
                reason: "redeem script is not a multisig script".to_string(),
            })?;

        let collected = signatures.get(index);
        let ordered: Vec<_> = keys
            .iter()
            .filter_map(|key| collected.and_then(|sigs| sigs.get(key)))
            .take(threshold)
            .collect();
        if ordered.len() < threshold {
            return Err(BuildError::MissingSignatures {
                index,
                have: ordered.len(),
                need: threshold,
            });
        }

        let mut witness = Witness::new();
        witness.push(Vec::<u8>::new());
        for signature in ordered {
            witness.push(ecdsa::Signature::sighash_all(*signature).to_vec());
        }
        witness.push(redeem_script.as_bytes());

        input.script_sig = p2sh_witness_program_script_sig(&witness_program(redeem_script));
        input.witness = witness;
    }

    Ok(tx)
}

#[cfg(test)]
mod tests {
    use bitcoin::Amount;
    use btc_peg_db::models::{InfoForVin, InfoForVout};
    use btc_peg_primitives::types::UtxoId;
    use btc_peg_test_utils::prelude::*;

    use super::*;
    use crate::{builder::CondensingTxBuilder, context::BuildContext};

    fn condensed(secret_count: usize) -> (CondensedTransaction, Vec<SecretKey>, Vec<PublicKey>) {
        let (committee, secret_keys) = test_committee(secret_count, 2);
        let ctx = BuildContext::new(TEST_NETWORK, committee.clone(), TEST_MIN_RELAY_FEE, 100);
        let script = committee.primary_wallet(TEST_NETWORK).redeem_script().to_owned();

        let vins: Vec<_> = [30_000, 40_000]
            .into_iter()
            .enumerate()
            .map(|(seq, amount)| {
                let outpoint = generate_outpoint();
                InfoForVin {
                    id: UtxoId::from_outpoint(&outpoint),
                    seq: seq as u64,
                    owner: 10,
                    outpoint,
                    amount: Amount::from_sat(amount),
                    address: random_regtest_address(),
                    script: script.clone(),
                    used: false,
                    resend: false,
                }
            })
            .collect();
        let vouts = vec![InfoForVout {
            id: 0,
            payer: 11,
            address: random_regtest_address(),
            amount: Amount::from_sat(25_000),
            used: false,
        }];

        let condensed = CondensingTxBuilder::new(&ctx)
            .with_vins(None, &vins)
            .and_then(|builder| builder.with_vouts(&vouts))
            .and_then(|builder| builder.apply_fee(TEST_FEE_RATE))
            .expect("must build");
        let pubkeys = committee.public_key_table().keys().copied().collect();

        (condensed, secret_keys, pubkeys)
    }

    #[test]
    fn signatures_verify_only_against_their_signer() {
        let (condensed, secret_keys, pubkeys) = condensed(3);

        let signatures = sign_inputs(&condensed, &secret_keys[0]).expect("must sign");
        assert_eq!(signatures.len(), condensed.tx.input.len());

        for (index, signature) in signatures.iter().enumerate() {
            assert!(verify_input_signature(
                &condensed.tx,
                &condensed.spent_outputs,
                index,
                signature,
                &pubkeys[0]
            ));
            assert!(!verify_input_signature(
                &condensed.tx,
                &condensed.spent_outputs,
                index,
                signature,
                &pubkeys[1]
            ));
        }

        // a signature for one input does not cover another
        assert!(!verify_input_signature(
            &condensed.tx,
            &condensed.spent_outputs,
            1,
            &signatures[0],
            &pubkeys[0]
        ));
    }

    #[test]
    fn finalized_witness_orders_signatures_by_script() {
        let (condensed, secret_keys, pubkeys) = condensed(3);
        let first = sign_inputs(&condensed, &secret_keys[0]).expect("must sign");
        let third = sign_inputs(&condensed, &secret_keys[2]).expect("must sign");

        let collected: Vec<BTreeMap<PublicKey, Signature>> = (0..condensed.tx.input.len())
            .map(|index| {
                BTreeMap::from([(pubkeys[2], third[index]), (pubkeys[0], first[index])])
            })
            .collect();

        let tx = finalize_witnesses(condensed.tx.clone(), &condensed.spent_outputs, &collected)
            .expect("threshold reached");

        for (index, input) in tx.input.iter().enumerate() {
            let redeem_script = &condensed.spent_outputs[index].redeem_script;
            let stack: Vec<&[u8]> = input.witness.iter().collect();

            assert_eq!(stack.len(), 4);
            assert!(stack[0].is_empty());
            assert_eq!(stack[1], ecdsa::Signature::sighash_all(first[index]).to_vec().as_slice());
            assert_eq!(stack[2], ecdsa::Signature::sighash_all(third[index]).to_vec().as_slice());
            assert_eq!(stack[3], redeem_script.as_bytes());
            assert_eq!(
                input.script_sig,
                p2sh_witness_program_script_sig(&witness_program(redeem_script))
            );
        }
        assert_eq!(tx.output, condensed.tx.output);
        assert_eq!(tx.compute_txid(), condensed.txid(), "signing must not change the txid");
    }

    #[test]
    fn finalize_needs_threshold_signatures() {
        let (condensed, secret_keys, pubkeys) = condensed(3);
        let first = sign_inputs(&condensed, &secret_keys[0]).expect("must sign");

        let collected: Vec<_> = first
            .iter()
            .map(|signature| BTreeMap::from([(pubkeys[0], *signature)]))
            .collect();

        assert_eq!(
            finalize_witnesses(condensed.tx.clone(), &condensed.spent_outputs, &collected),
            Err(BuildError::MissingSignatures {
                index: 0,
                have: 1,
                need: 2
            })
        );
    }
}
