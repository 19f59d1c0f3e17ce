//! Pending proposals and the ledger entries they reserve.

use btc_peg_primitives::types::ProposalId;

use crate::{
    errors::DbResult,
    models::{SidechainProposal, UtxoRef},
};

/// Access to the proposals created by the bridge.
pub trait ProposalDb {
    /// Stores a proposal.
    fn insert_proposal(&mut self, proposal: SidechainProposal) -> DbResult<()>;

    /// Looks up a proposal.
    fn get_proposal(&self, proposal_id: &ProposalId) -> Option<&SidechainProposal>;

    /// Deletes a proposal and releases everything it reserved.
    fn remove_proposal(&mut self, proposal_id: &ProposalId) -> DbResult<SidechainProposal>;

    /// Reserves the given entries for `proposal_id`.
    ///
    /// All or nothing: fails with
    /// [`DbError::DuplicateEntry`](crate::errors::DbError::DuplicateEntry) without reserving
    /// anything if one of them is held by another proposal.
    fn reserve(&mut self, proposal_id: ProposalId, refs: &[UtxoRef]) -> DbResult<()>;

    /// The proposal that holds `utxo_ref`, if any.
    fn reserved_by(&self, utxo_ref: &UtxoRef) -> Option<ProposalId>;

    /// Releases every entry held by `proposal_id`.
    fn release(&mut self, proposal_id: &ProposalId) -> Vec<UtxoRef>;
}
