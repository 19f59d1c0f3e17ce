//! This module contains the models for the bridge tables.

use std::{collections::BTreeSet, fmt};

use bitcoin::{Amount, OutPoint, ScriptBuf, Transaction, Txid};
use btc_peg_primitives::types::{AccountId, ProposalId, UtxoId, VoutId};
use serde::{Deserialize, Serialize};

/// The account that owns the change outputs of the primary wallet.
pub const PRIMARY_WALLET_OWNER: AccountId = 0;

/// A spendable deposit UTXO controlled by the committee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoForVin {
    /// `sha256(txid || vout_le)` of [`Self::outpoint`].
    pub id: UtxoId,

    /// Insertion order within the ledger.
    pub seq: u64,

    /// The sidechain account credited once the deposit is swept.
    pub owner: AccountId,

    /// The deposit output.
    pub outpoint: OutPoint,

    /// The value of the deposit output.
    pub amount: Amount,

    /// The address the deposit was paid to.
    pub address: String,

    /// The redeem script that unlocks the deposit.
    pub script: ScriptBuf,

    /// Set while a sent transaction spends this UTXO.
    pub used: bool,

    /// Set when a transaction that spent this UTXO was reverted.
    pub resend: bool,
}

/// A pending withdrawal request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoForVout {
    /// Insertion-ordered identifier.
    pub id: VoutId,

    /// The sidechain account that requested the withdrawal.
    pub payer: AccountId,

    /// The destination Bitcoin address.
    pub address: String,

    /// The amount to send before fees.
    pub amount: Amount,

    /// Set while a sent transaction pays this withdrawal.
    pub used: bool,
}

/// A change output of the primary wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryWalletVout {
    /// Position in the chain.
    pub seq: u64,

    /// `sha256(txid || vout_le)` of [`Self::outpoint`].
    pub id: UtxoId,

    /// The change output.
    pub outpoint: OutPoint,

    /// The value of the change output.
    pub amount: Amount,

    /// The primary wallet address at the time the output was created.
    pub address: String,

    /// The redeem script of that primary wallet.
    pub script: ScriptBuf,

    /// Set once the transaction that created this output is confirmed.
    pub confirmed: bool,

    /// Set while a sent transaction spends this output.
    pub used: bool,
}

impl PrimaryWalletVout {
    /// The [`InfoForVin`] view used by the condensing builder.
    pub fn as_vin(&self) -> InfoForVin {
        InfoForVin {
            id: self.id,
            seq: self.seq,
            owner: PRIMARY_WALLET_OWNER,
            outpoint: self.outpoint,
            amount: self.amount,
            address: self.address.clone(),
            script: self.script.clone(),
            used: self.used,
            resend: false,
        }
    }
}

/// A finalized condensing transaction awaiting confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitcoinTransactionRecord {
    /// The txid of [`Self::transaction`].
    pub txid: Txid,

    /// The proposal that produced the transaction.
    pub proposal_id: ProposalId,

    /// The primary wallet output spent by the transaction, if any.
    pub pw_vin: Option<UtxoId>,

    /// The chain position of the change output created by the transaction, if any.
    pub pw_vout: Option<u64>,

    /// The deposits spent by the transaction.
    pub vins: Vec<UtxoId>,

    /// The withdrawals paid by the transaction.
    pub vouts: Vec<VoutId>,

    /// The fully signed transaction.
    pub transaction: Transaction,

    /// The fee paid by the transaction.
    pub fee: Amount,

    /// Host block timestamp at which the transaction was finalized.
    pub sent_at: u64,
}

/// The observed state of a sent transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitcoinTransactionConfirmations {
    /// The transaction being tracked.
    pub txid: Txid,

    /// Number of blocks on top of the block that includes the transaction.
    pub confirmations: u32,

    /// The deposits that may be restored if the transaction is reverted.
    pub valid_vins: BTreeSet<UtxoId>,
}

/// The kind of a bridge proposal submitted to the host's proposal engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SidechainProposalKind {
    /// Send a condensing transaction.
    SendBtcTransaction,

    /// Credit swept deposits.
    IssuePbtc,

    /// Debit a withdrawal request.
    WithdrawPbtc,

    /// Return an unsent withdrawal to its payer.
    ReturnPbtcBack,
}

impl fmt::Display for SidechainProposalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::SendBtcTransaction => "send_btc_transaction",
            Self::IssuePbtc => "issue_pbtc",
            Self::WithdrawPbtc => "withdraw_pbtc",
            Self::ReturnPbtcBack => "return_pbtc_back",
        };

        write!(f, "{kind}")
    }
}

/// A proposal created by the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidechainProposal {
    /// Identifier assigned by the host's proposal engine.
    pub proposal_id: ProposalId,

    /// What the proposal does.
    pub kind: SidechainProposalKind,
}

/// A ledger entry that can be referenced by at most one pending proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UtxoRef {
    /// A deposit or primary wallet output.
    Vin(UtxoId),

    /// A withdrawal request.
    Vout(VoutId),

    /// The right to append a change output to the primary wallet chain.
    PrimaryWallet,
}

impl fmt::Display for UtxoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vin(id) => write!(f, "vin {id}"),
            Self::Vout(id) => write!(f, "vout {id}"),
            Self::PrimaryWallet => write!(f, "primary wallet"),
        }
    }
}
