//! Everything the builder needs besides the ledger entries.

use bitcoin::{Amount, Network};
use btc_peg_primitives::{committee::CommitteeTable, multisig::MultisigSegwitAddress};

/// The committee and fee parameters a condensing transaction is built against.
#[derive(Debug, Clone)]
pub struct BuildContext {
    network: Network,
    committee: CommitteeTable,
    primary_wallet: MultisigSegwitAddress,
    min_relay_fee: Amount,
    witness_fee_bp: u64,
}

impl BuildContext {
    /// Creates a new context for the current committee.
    pub fn new(
        network: Network,
        committee: CommitteeTable,
        min_relay_fee: Amount,
        witness_fee_bp: u64,
    ) -> Self {
        let primary_wallet = committee.primary_wallet(network);

        Self {
            network,
            committee,
            primary_wallet,
            min_relay_fee,
            witness_fee_bp,
        }
    }

    /// The network withdrawal addresses must belong to.
    pub const fn network(&self) -> Network {
        self.network
    }

    /// The current committee.
    pub const fn committee(&self) -> &CommitteeTable {
        &self.committee
    }

    /// The wallet that receives the change.
    pub const fn primary_wallet(&self) -> &MultisigSegwitAddress {
        &self.primary_wallet
    }

    /// Lower bound of the fee.
    pub const fn min_relay_fee(&self) -> Amount {
        self.min_relay_fee
    }

    /// Committee share of every withdrawal, in basis points.
    pub const fn witness_fee_bp(&self) -> u64 {
        self.witness_fee_bp
    }
}
