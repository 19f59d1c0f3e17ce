use btc_peg_primitives::types::ProposalId;
use tracing::debug;

use super::InMemoryBridgeDb;
use crate::{
    errors::{DbError, DbResult},
    models::{SidechainProposal, UtxoRef},
    proposals::ProposalDb,
};

impl ProposalDb for InMemoryBridgeDb {
    fn insert_proposal(&mut self, proposal: SidechainProposal) -> DbResult<()> {
        if self.proposals.contains_key(&proposal.proposal_id) {
            return Err(DbError::DuplicateEntry(format!(
                "proposal {}",
                proposal.proposal_id
            )));
        }
        self.proposals.insert(proposal.proposal_id, proposal);

        Ok(())
    }

    fn get_proposal(&self, proposal_id: &ProposalId) -> Option<&SidechainProposal> {
        self.proposals.get(proposal_id)
    }

    fn remove_proposal(&mut self, proposal_id: &ProposalId) -> DbResult<SidechainProposal> {
        let proposal = self
            .proposals
            .remove(proposal_id)
            .ok_or_else(|| DbError::NotFound(format!("proposal {proposal_id}")))?;
        self.release(proposal_id);

        Ok(proposal)
    }

    fn reserve(&mut self, proposal_id: ProposalId, refs: &[UtxoRef]) -> DbResult<()> {
        if let Some((utxo_ref, holder)) = refs
            .iter()
            .find_map(|r| self.reservations.get(r).map(|holder| (r, holder)))
        {
            return Err(DbError::DuplicateEntry(format!(
                "{utxo_ref} is reserved by proposal {holder}"
            )));
        }

        self.reservations
            .extend(refs.iter().map(|utxo_ref| (*utxo_ref, proposal_id)));
        debug!(%proposal_id, count = refs.len(), "reserved ledger entries");

        Ok(())
    }

    fn reserved_by(&self, utxo_ref: &UtxoRef) -> Option<ProposalId> {
        self.reservations.get(utxo_ref).copied()
    }

    fn release(&mut self, proposal_id: &ProposalId) -> Vec<UtxoRef> {
        let released: Vec<_> = self
            .reservations
            .iter()
            .filter(|(_, holder)| *holder == proposal_id)
            .map(|(utxo_ref, _)| *utxo_ref)
            .collect();
        for utxo_ref in &released {
            self.reservations.remove(utxo_ref);
        }

        released
    }
}
