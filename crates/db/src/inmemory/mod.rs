//! In-memory implementation of every bridge table.

use std::collections::{BTreeMap, BTreeSet};

use bitcoin::Txid;
use btc_peg_primitives::types::{ProposalId, UtxoId, VoutId};

use crate::{
    models::{
        BitcoinTransactionConfirmations, BitcoinTransactionRecord, InfoForVin, InfoForVout,
        PrimaryWalletVout, SidechainProposal, UtxoRef,
    },
    sequence::SequenceGenerator,
};

mod ledger;
mod proposals;
mod pw_chain;
mod tracker;

/// Secondary index of the deposits: `(used, !resend, seq, id)`.
///
/// Iterating it in order yields unused deposits first, resent ones before fresh ones, and then
/// insertion order.
type VinIndexKey = (bool, bool, u64, UtxoId);

fn vin_index_key(vin: &InfoForVin) -> VinIndexKey {
    (vin.used, !vin.resend, vin.seq, vin.id)
}

/// All bridge tables backed by ordered maps.
///
/// Sequence numbers are drawn from generators owned by the instance, so every instance starts
/// counting from zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InMemoryBridgeDb {
    vins: BTreeMap<UtxoId, InfoForVin>,
    vin_index: BTreeSet<VinIndexKey>,
    vin_seq: SequenceGenerator,

    vouts: BTreeMap<VoutId, InfoForVout>,
    vout_seq: SequenceGenerator,

    pw_chain: BTreeMap<u64, PrimaryWalletVout>,
    pw_seq: SequenceGenerator,

    records: BTreeMap<Txid, BitcoinTransactionRecord>,
    confirmations: BTreeMap<Txid, BitcoinTransactionConfirmations>,

    proposals: BTreeMap<ProposalId, SidechainProposal>,
    reservations: BTreeMap<UtxoRef, ProposalId>,
}

impl InMemoryBridgeDb {
    /// Creates empty tables.
    pub fn new() -> Self {
        Self::default()
    }
}
