//! The on-chain operations of the bridge and their outcomes.

use std::collections::BTreeSet;

use bitcoin::{Amount, OutPoint, ScriptBuf, Txid};
use btc_peg_db::models::{InfoForVin, InfoForVout, SidechainProposalKind};
use btc_peg_primitives::types::{AccountId, ProposalId, UtxoId, VoutId, WitnessIdx};
use secp256k1::ecdsa::Signature;
use serde::{Deserialize, Serialize};

use crate::send::{duties::SendProposalDuty, proposal::SendProposal};

/// An operation submitted to the host chain and applied by every node in block order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BridgeOperation {
    /// Propose a condensing transaction.
    SendTransactionProposal {
        /// The committee member submitting the proposal.
        proposer: WitnessIdx,
        /// The proposed transaction and the entries it was built from.
        proposal: SendProposal,
    },

    /// Approve a proposal with one signature per input.
    SignTransaction {
        /// The proposal being approved.
        proposal_id: ProposalId,
        /// The approving committee member.
        witness: WitnessIdx,
        /// BIP-143 signatures, in input order.
        signatures: Vec<Signature>,
    },

    /// Credit the deposits swept by a sufficiently confirmed transaction.
    IssueDeposits {
        /// The confirmed transaction.
        txid: Txid,
    },

    /// Abandon a sent transaction and restore its ledger entries.
    RevertTransaction {
        /// The abandoned transaction.
        txid: Txid,
    },

    /// Record a deposit paid to the primary wallet.
    RegisterDeposit {
        /// The account credited once the deposit is swept.
        owner: AccountId,
        /// The deposit output.
        outpoint: OutPoint,
        /// The value of the deposit output.
        amount: Amount,
        /// The address the deposit was paid to.
        address: String,
        /// The redeem script that unlocks the deposit.
        script: ScriptBuf,
    },

    /// Burn pegged tokens in exchange for a payment on Bitcoin.
    RequestWithdrawal {
        /// The account debited.
        payer: AccountId,
        /// The Bitcoin address to pay.
        address: String,
        /// The amount to pay before fees.
        amount: Amount,
    },

    /// Cancel a withdrawal that has not been sent and refund the payer.
    ReturnWithdrawal {
        /// The withdrawal to cancel.
        vout_id: VoutId,
    },

    /// Record the latest observed state of a sent transaction.
    RecordConfirmations {
        /// The tracked transaction.
        txid: Txid,
        /// Number of blocks on top of the including block.
        confirmations: u32,
        /// Deposits of the transaction found spent by another transaction.
        spent_elsewhere: BTreeSet<UtxoId>,
    },

    /// The proposal engine timed a proposal out.
    ProposalExpired {
        /// The expired proposal.
        proposal_id: ProposalId,
    },
}

impl BridgeOperation {
    /// The proposal kind the operation belongs to, if any.
    pub const fn kind(&self) -> Option<SidechainProposalKind> {
        match self {
            Self::SendTransactionProposal { .. }
            | Self::SignTransaction { .. }
            | Self::ProposalExpired { .. } => Some(SidechainProposalKind::SendBtcTransaction),
            Self::IssueDeposits { .. } => Some(SidechainProposalKind::IssuePbtc),
            Self::RequestWithdrawal { .. } => Some(SidechainProposalKind::WithdrawPbtc),
            Self::ReturnWithdrawal { .. } => Some(SidechainProposalKind::ReturnPbtcBack),
            Self::RevertTransaction { .. }
            | Self::RegisterDeposit { .. }
            | Self::RecordConfirmations { .. } => None,
        }
    }

    /// A short name for logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SendTransactionProposal { .. } => "send_transaction_proposal",
            Self::SignTransaction { .. } => "sign_transaction",
            Self::IssueDeposits { .. } => "issue_deposits",
            Self::RevertTransaction { .. } => "revert_transaction",
            Self::RegisterDeposit { .. } => "register_deposit",
            Self::RequestWithdrawal { .. } => "request_withdrawal",
            Self::ReturnWithdrawal { .. } => "return_withdrawal",
            Self::RecordConfirmations { .. } => "record_confirmations",
            Self::ProposalExpired { .. } => "proposal_expired",
        }
    }
}

/// What an applied operation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeOutput {
    /// A send proposal was accepted.
    ProposalCreated {
        /// The identifier assigned by the proposal engine.
        proposal_id: ProposalId,
    },

    /// A witness's signatures were accepted.
    Signed {
        /// The approved proposal.
        proposal_id: ProposalId,
        /// Set once the threshold was reached.
        finalized: Option<Txid>,
        /// Non-empty once the transaction must be relayed.
        duties: Vec<SendProposalDuty>,
    },

    /// The deposits of a transaction were credited.
    Issued {
        /// The confirmed transaction.
        txid: Txid,
        /// The amounts credited per deposit owner, in input order.
        credited: Vec<(AccountId, Amount)>,
    },

    /// A transaction was reverted.
    Reverted {
        /// The abandoned transaction.
        txid: Txid,
        /// Deposits made spendable again.
        restored: Vec<UtxoId>,
        /// Deposits dropped because they were spent elsewhere.
        dropped: Vec<UtxoId>,
    },

    /// A deposit was recorded.
    DepositRegistered(InfoForVin),

    /// A withdrawal was recorded.
    WithdrawalRequested(InfoForVout),

    /// A withdrawal was cancelled and refunded.
    WithdrawalReturned(InfoForVout),

    /// The confirmation count of a transaction was updated.
    ConfirmationsRecorded {
        /// The tracked transaction.
        txid: Txid,
        /// The new count.
        confirmations: u32,
    },

    /// A proposal expired and released its reservations.
    ProposalExpired {
        /// The expired proposal.
        proposal_id: ProposalId,
    },
}

impl BridgeOutput {
    /// The duties to perform outside of the host chain.
    pub fn duties(&self) -> &[SendProposalDuty] {
        match self {
            Self::Signed { duties, .. } => duties,
            _ => &[],
        }
    }
}
