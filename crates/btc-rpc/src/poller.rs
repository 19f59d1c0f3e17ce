//! Watches Bitcoin on behalf of the bridge.
//!
//! The poller looks at the transactions the bridge has sent and proposes what to do with them:
//! record new confirmation counts, issue deposits once a transaction is buried deep enough, or
//! revert it when it never made it into a block. It also relays finalized transactions and scans
//! blocks for new deposits to the primary wallet.

use std::{collections::BTreeSet, time::Duration};

use bitcoin::{Block, Transaction, Txid};
use btc_peg_bridge_sm::{bridge::BridgeOperation, send::duties::SendProposalDuty};
use btc_peg_db::{confirmations::ConfirmationDb, records::TransactionRecordDb};
use btc_peg_params::prelude::BridgeParams;
use btc_peg_primitives::{codec, multisig::MultisigSegwitAddress, types::AccountId};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::traits::{BitcoinRpc, TxStatus};

/// What the poller needs to know about a sent transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransaction {
    /// The sent transaction.
    pub txid: Txid,

    /// Host block timestamp at which it was finalized.
    pub sent_at: u64,

    /// The confirmation count last recorded by the bridge.
    pub recorded_confirmations: u32,
}

/// Snapshots every sent transaction that is neither issued nor reverted.
pub fn pending_transactions<Db>(db: &Db) -> Vec<PendingTransaction>
where
    Db: TransactionRecordDb + ConfirmationDb,
{
    db.pending_records()
        .into_iter()
        .map(|record| PendingTransaction {
            txid: record.txid,
            sent_at: record.sent_at,
            recorded_confirmations: db
                .find_confirmations(&record.txid)
                .map_or(0, |entry| entry.confirmations),
        })
        .collect()
}

/// Polls the node once for every pending transaction and returns the operations to submit.
///
/// A transaction the node could not be asked about is left alone: it is never reverted on a
/// failed lookup, however old it is.
pub async fn poll_pending<R: BitcoinRpc + ?Sized>(
    rpc: &R,
    params: &BridgeParams,
    pending: &[PendingTransaction],
    now: u64,
) -> Vec<BridgeOperation> {
    let mut ops = Vec::new();

    for tx in pending {
        let Some(status) = rpc.get_tx_status(&tx.txid).await else {
            debug!(txid = %tx.txid, "status unknown, keeping transaction pending");
            continue;
        };
        let confirmations = status.confirmations();

        if confirmations != tx.recorded_confirmations {
            debug!(txid = %tx.txid, %confirmations, "confirmation count changed");
            ops.push(BridgeOperation::RecordConfirmations {
                txid: tx.txid,
                confirmations,
                spent_elsewhere: BTreeSet::new(),
            });
        }

        if confirmations >= params.required_confirmations {
            info!(txid = %tx.txid, %confirmations, "transaction is final");
            ops.push(BridgeOperation::IssueDeposits { txid: tx.txid });
        } else if confirmations == 0
            && now.saturating_sub(tx.sent_at) >= params.revert_timeout_secs
        {
            warn!(txid = %tx.txid, sent_at = %tx.sent_at, ?status, "transaction timed out");
            ops.push(BridgeOperation::RevertTransaction { txid: tx.txid });
        }
    }

    ops
}

/// Relays the transactions of the given duties and returns the txids the node accepted.
pub async fn relay_duties<R: BitcoinRpc + ?Sized>(
    rpc: &R,
    duties: &[SendProposalDuty],
) -> Vec<Txid> {
    let mut relayed = Vec::with_capacity(duties.len());

    for duty in duties {
        match duty {
            SendProposalDuty::BroadcastTransaction { txid, tx } => {
                match rpc.send_raw_transaction(&codec::serialize_hex(tx)).await {
                    Some(accepted) => {
                        info!(%txid, "relayed transaction");
                        relayed.push(accepted);
                    }
                    None => warn!(%txid, "node did not accept transaction"),
                }
            }
        }
    }

    relayed
}

/// The fee rate to build the next proposal with.
pub async fn current_fee_rate<R: BitcoinRpc + ?Sized>(rpc: &R, params: &BridgeParams) -> u64 {
    let estimate = rpc.estimate_smart_fee(params.fee_estimate_blocks).await;

    params.effective_fee_rate(estimate)
}

/// Turns every output of `block` that pays the primary wallet into a deposit registration.
///
/// `owner_of` resolves the sidechain account a deposit transaction belongs to. Outputs of
/// transactions it does not recognize are skipped.
pub fn scan_block_for_deposits<F>(
    block: &Block,
    wallet: &MultisigSegwitAddress,
    owner_of: F,
) -> Vec<BridgeOperation>
where
    F: Fn(&Transaction) -> Option<AccountId>,
{
    let script_pubkey = wallet.script_pubkey();
    let mut ops = Vec::new();

    for tx in &block.txdata {
        let paying: Vec<_> = tx
            .output
            .iter()
            .enumerate()
            .filter(|(_, output)| output.script_pubkey == script_pubkey)
            .collect();
        if paying.is_empty() {
            continue;
        }

        let txid = tx.compute_txid();
        let Some(owner) = owner_of(tx) else {
            debug!(%txid, "skipping deposit of unknown owner");
            continue;
        };

        for (vout, output) in paying {
            ops.push(BridgeOperation::RegisterDeposit {
                owner,
                outpoint: bitcoin::OutPoint::new(txid, vout as u32),
                amount: output.value,
                address: wallet.address().to_string(),
                script: wallet.redeem_script().to_owned(),
            });
        }
    }

    ops
}

/// Periodically polls the node and forwards the resulting operations.
#[derive(Debug)]
pub struct ConfirmationPoller<R> {
    rpc: R,
    params: BridgeParams,
    interval: Duration,
}

impl<R: BitcoinRpc> ConfirmationPoller<R> {
    /// Creates a poller that wakes up every `interval`.
    pub const fn new(rpc: R, params: BridgeParams, interval: Duration) -> Self {
        Self {
            rpc,
            params,
            interval,
        }
    }

    /// Runs until the receiving end of `ops` is dropped.
    ///
    /// `snapshot` is called on every tick and returns the pending transactions together with the
    /// current host timestamp.
    pub async fn run<S>(self, snapshot: S, ops: mpsc::Sender<BridgeOperation>)
    where
        S: Fn() -> (Vec<PendingTransaction>, u64),
    {
        let mut ticker = tokio::time::interval(self.interval);

        loop {
            ticker.tick().await;
            let (pending, now) = snapshot();

            for op in poll_pending(&self.rpc, &self.params, &pending, now).await {
                if ops.send(op).await.is_err() {
                    info!("operation sink closed, stopping poller");
                    return;
                }
            }
        }
    }
}
