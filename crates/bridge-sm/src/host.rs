//! The host chain services the bridge depends on.
//!
//! The bridge does not own balances, proposals or the committee. It reaches them through these
//! traits, which the host chain implements on top of its own state.

use bitcoin::Amount;
use btc_peg_db::models::SidechainProposalKind;
use btc_peg_primitives::{
    committee::CommitteeTable,
    types::{AccountId, AssetId, ProposalId, WitnessIdx},
};
use thiserror::Error;

/// A host chain service refused a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("host rejected the request: {0}")]
pub struct HostError(pub String);

/// The generic multisig proposal engine of the host chain.
pub trait ProposalEngine {
    /// Opens a proposal on behalf of `proposer` and returns its identifier.
    fn create(
        &mut self,
        proposer: WitnessIdx,
        kind: SidechainProposalKind,
    ) -> Result<ProposalId, HostError>;

    /// Records the approval of `witness`.
    fn approve(&mut self, proposal_id: ProposalId, witness: WitnessIdx) -> Result<(), HostError>;

    /// Toggles the fee exemption of `witness` for the operations it submits.
    fn set_fee_exempt(&mut self, witness: WitnessIdx, exempt: bool);
}

/// Account balances of the host chain.
pub trait BalanceLedger {
    /// Adds `amount` of `asset` to `account`.
    fn credit(&mut self, account: AccountId, asset: AssetId, amount: Amount)
        -> Result<(), HostError>;

    /// Takes `amount` of `asset` from `account`; fails if the balance is too low.
    fn debit(&mut self, account: AccountId, asset: AssetId, amount: Amount)
        -> Result<(), HostError>;
}

/// The committee currently in charge of the primary wallet.
pub trait CommitteeView {
    /// The current committee.
    fn committee(&self) -> CommitteeTable;
}

/// Time as seen by the host chain.
pub trait ChainClock {
    /// Timestamp of the block being applied, in seconds.
    fn block_timestamp(&self) -> u64;
}

/// Every host service the bridge needs.
pub trait BridgeHost: ProposalEngine + BalanceLedger + CommitteeView + ChainClock {}

impl<T> BridgeHost for T where T: ProposalEngine + BalanceLedger + CommitteeView + ChainClock {}
