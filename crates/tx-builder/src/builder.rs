//! The staged condensing transaction builder.
//!
//! The stages are encoded in the type of the builder, so inputs always precede outputs and the fee
//! is applied exactly once, last:
//!
//! ```text
//! CondensingTxBuilder<Empty> -> CondensingTxBuilder<WithVins> -> CondensingTxBuilder<WithVouts>
//!     -> CondensedTransaction
//! ```

use bitcoin::{
    absolute::LockTime,
    hashes::{hash160, Hash},
    transaction::Version,
    Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness,
};
use btc_peg_db::models::{InfoForVin, InfoForVout};
use btc_peg_primitives::{
    address::BitcoinAddress,
    codec,
    multisig::witness_program,
    script::{p2sh_witness_program_script_sig, Payload},
    types::{UtxoId, VoutId},
};
use secp256k1::PublicKey;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    context::BuildContext,
    errors::{BuildError, BuildResult},
    fees::{estimate_fee, estimate_vsize, per_unit_share, split_evenly, witness_fee},
};

/// The output spent by an input of a condensing transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpentOutput {
    /// The outpoint being spent.
    pub outpoint: OutPoint,

    /// The value of the output, committed to by the BIP-143 sighash.
    pub amount: Amount,

    /// The script that unlocks the output.
    pub redeem_script: ScriptBuf,
}

/// A condensing transaction with its fee applied, ready to be proposed and signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CondensedTransaction {
    /// The unsigned transaction.
    pub tx: Transaction,

    /// What each input spends, in input order.
    pub spent_outputs: Vec<SpentOutput>,

    /// The primary wallet output spent by the first input, if any.
    pub pw_vin: Option<UtxoId>,

    /// The deposits spent, in input order after the primary wallet input.
    pub vins: Vec<UtxoId>,

    /// The withdrawals paid, in output order.
    pub vouts: Vec<VoutId>,

    /// Index of the change output paying back to the primary wallet, if any.
    pub change_output: Option<u32>,

    /// The fee actually paid.
    pub fee: Amount,

    /// The fee the transaction was estimated to need.
    pub estimated_fee: Amount,

    /// The fee rate used for the estimate, in sats/kvB.
    pub fee_rate: u64,
}

impl CondensedTransaction {
    /// The txid of the transaction.
    pub fn txid(&self) -> Txid {
        codec::txid(&self.tx)
    }

    /// The change output as a new primary wallet output.
    pub fn change(&self) -> Option<(OutPoint, Amount)> {
        self.change_output.map(|vout| {
            let outpoint = OutPoint {
                txid: self.txid(),
                vout,
            };

            (outpoint, self.tx.output[vout as usize].value)
        })
    }
}

/// The builder holds no inputs or outputs yet.
#[derive(Debug)]
pub struct Empty;

/// The inputs have been added.
#[derive(Debug)]
pub struct WithVins {
    pw_vin: Option<UtxoId>,
    vins: Vec<UtxoId>,
    spent_outputs: Vec<SpentOutput>,
    amount_in: Amount,
}

/// The withdrawal outputs have been added.
#[derive(Debug)]
pub struct WithVouts {
    inputs: WithVins,
    vouts: Vec<VoutId>,
    amount_out: Amount,
}

/// Builds one condensing transaction from ledger entries.
#[derive(Debug)]
pub struct CondensingTxBuilder<'ctx, S> {
    ctx: &'ctx BuildContext,
    tx: Transaction,
    stage: S,
}

impl<'ctx> CondensingTxBuilder<'ctx, Empty> {
    /// Starts an empty transaction.
    pub fn new(ctx: &'ctx BuildContext) -> Self {
        Self {
            ctx,
            tx: Transaction {
                version: Version::TWO,
                lock_time: LockTime::ZERO,
                input: Vec::new(),
                output: Vec::new(),
            },
            stage: Empty,
        }
    }

    /// Adds one input per deposit, preceded by the primary wallet input if there is one.
    pub fn with_vins(
        mut self,
        pw_vin: Option<&InfoForVin>,
        vins: &[InfoForVin],
    ) -> BuildResult<CondensingTxBuilder<'ctx, WithVins>> {
        let mut amount_in = Amount::ZERO;
        let mut spent_outputs = Vec::with_capacity(vins.len() + 1);

        for vin in pw_vin.into_iter().chain(vins) {
            self.tx.input.push(TxIn {
                previous_output: vin.outpoint,
                script_sig: p2sh_witness_program_script_sig(&witness_program(&vin.script)),
                sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
                witness: Witness::new(),
            });
            spent_outputs.push(SpentOutput {
                outpoint: vin.outpoint,
                amount: vin.amount,
                redeem_script: vin.script.clone(),
            });
            amount_in = amount_in
                .checked_add(vin.amount)
                .ok_or(BuildError::AmountOverflow)?;
        }

        Ok(CondensingTxBuilder {
            ctx: self.ctx,
            tx: self.tx,
            stage: WithVins {
                pw_vin: pw_vin.map(|vin| vin.id),
                vins: vins.iter().map(|vin| vin.id).collect(),
                spent_outputs,
                amount_in,
            },
        })
    }
}

impl<'ctx> CondensingTxBuilder<'ctx, WithVins> {
    /// Adds one output per withdrawal for its full amount.
    pub fn with_vouts(
        mut self,
        vouts: &[InfoForVout],
    ) -> BuildResult<CondensingTxBuilder<'ctx, WithVouts>> {
        let mut amount_out = Amount::ZERO;

        for vout in vouts {
            let address = BitcoinAddress::parse(&vout.address, self.ctx.network())?;
            self.tx.output.push(TxOut {
                value: vout.amount,
                script_pubkey: address.script_pubkey(),
            });
            amount_out = amount_out
                .checked_add(vout.amount)
                .ok_or(BuildError::AmountOverflow)?;
        }

        Ok(CondensingTxBuilder {
            ctx: self.ctx,
            tx: self.tx,
            stage: WithVouts {
                inputs: self.stage,
                vouts: vouts.iter().map(|vout| vout.id).collect(),
                amount_out,
            },
        })
    }
}

impl CondensingTxBuilder<'_, WithVouts> {
    /// Adds the committee and change outputs and takes the fee out of the outputs.
    ///
    /// The estimated fee is shared evenly, rounded up, by every deposit and withdrawal. The
    /// deposits' shares come out of the change output, or are split evenly across the withdrawals
    /// when there is no change, and each withdrawal pays its own share.
    /// Each withdrawal then pays `witness_fee_bp` of what is left to the committee, split evenly
    /// across one output per committee key.
    pub fn apply_fee(self, fee_rate: u64) -> BuildResult<CondensedTransaction> {
        let Self { ctx, mut tx, stage } = self;
        let WithVouts {
            inputs:
                WithVins {
                    pw_vin,
                    vins,
                    spent_outputs,
                    amount_in,
                },
            vouts,
            amount_out,
        } = stage;

        if vins.is_empty() && vouts.is_empty() {
            return Err(BuildError::NothingToCondense);
        }

        let placeholders_start = tx.output.len();
        if !vouts.is_empty() {
            tx.output
                .extend(ctx.committee().public_key_table().keys().map(|key| TxOut {
                    value: Amount::ZERO,
                    script_pubkey: placeholder_script(key),
                }));
        }
        let placeholders_end = tx.output.len();

        let change_output = match amount_in.checked_sub(amount_out) {
            None => {
                return Err(BuildError::InsufficientFeeCoverage {
                    what: "withdrawals".to_string(),
                    needed: amount_out,
                    available: amount_in,
                })
            }
            Some(change) if change == Amount::ZERO => None,
            Some(change) => {
                tx.output.push(TxOut {
                    value: change,
                    script_pubkey: ctx.primary_wallet().script_pubkey(),
                });
                Some(tx.output.len() - 1)
            }
        };

        let redeem_scripts: Vec<_> = spent_outputs
            .iter()
            .map(|spent| spent.redeem_script.clone())
            .collect();
        let vsize = estimate_vsize(&tx, &redeem_scripts);
        let estimated_fee = estimate_fee(vsize, fee_rate, ctx.min_relay_fee());
        let per_unit = per_unit_share(estimated_fee, vins.len() + vouts.len());

        let vins_share = per_unit
            .checked_mul(vins.len() as u64)
            .ok_or(BuildError::AmountOverflow)?;
        // without change the withdrawals carry the deposits' share as well
        let carried = match change_output {
            Some(idx) => {
                let change = &mut tx.output[idx];
                change.value = change.value.checked_sub(vins_share).ok_or_else(|| {
                    BuildError::InsufficientFeeCoverage {
                        what: "change".to_string(),
                        needed: vins_share,
                        available: change.value,
                    }
                })?;

                vec![Amount::ZERO; vouts.len()]
            }
            None if vouts.is_empty() => {
                return Err(BuildError::InsufficientFeeCoverage {
                    what: "deposits".to_string(),
                    needed: vins_share,
                    available: Amount::ZERO,
                })
            }
            None => split_evenly(vins_share, vouts.len()),
        };

        let mut witness_total = Amount::ZERO;
        for ((output, vout), extra) in tx.output[..placeholders_start]
            .iter_mut()
            .zip(&vouts)
            .zip(carried)
        {
            let size_fee = per_unit + extra;
            let after_size_fee = output.value.checked_sub(size_fee).ok_or_else(|| {
                BuildError::InsufficientFeeCoverage {
                    what: format!("withdrawal {vout}"),
                    needed: size_fee,
                    available: output.value,
                }
            })?;
            let witness_share = witness_fee(after_size_fee, ctx.witness_fee_bp());

            output.value = after_size_fee - witness_share;
            witness_total = witness_total
                .checked_add(witness_share)
                .ok_or(BuildError::AmountOverflow)?;
        }

        let shares = split_evenly(witness_total, placeholders_end - placeholders_start);
        for (output, share) in tx.output[placeholders_start..placeholders_end]
            .iter_mut()
            .zip(shares)
        {
            output.value = share;
        }

        let amount_paid = tx
            .output
            .iter()
            .try_fold(Amount::ZERO, |acc, output| acc.checked_add(output.value))
            .ok_or(BuildError::AmountOverflow)?;
        let fee = amount_in
            .checked_sub(amount_paid)
            .expect("fee subtraction never increases the outputs");

        debug!(
            inputs = tx.input.len(),
            outputs = tx.output.len(),
            %vsize,
            %estimated_fee,
            %fee,
            "condensed transaction"
        );

        Ok(CondensedTransaction {
            tx,
            spent_outputs,
            pw_vin,
            vins,
            vouts,
            change_output: change_output.map(|idx| idx as u32),
            fee,
            estimated_fee,
            fee_rate,
        })
    }
}

/// The zero-value P2WPKH output that pays a committee member its share.
fn placeholder_script(key: &PublicKey) -> ScriptBuf {
    let hash = hash160::Hash::hash(&key.serialize());

    Payload::P2wpkh(hash.to_byte_array()).script_pubkey()
}
