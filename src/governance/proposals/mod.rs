//! Trusted-member proposals.
//!
//! - Ids are assigned from 1 upwards and never reused
//! - Voting opens `vote_delay` after creation and lasts `voting_duration`
//! - A passed proposal may be executed until `execution_window` after voting ends
//! - Each member votes at most once; the voter set is kept with the proposal
//! - State is derived on read, see [`lifecycle::derive_state`]
//! - Reaching quorum while voting is open latches `passed`; after voting
//!   ends the outcome no longer follows membership or quorum changes

pub mod executor;
pub mod lifecycle;
pub mod payload;

pub use executor::execute_payload;
pub use lifecycle::{derive_state, ProposalState};
pub use payload::Payload;

use super::error::{GovernanceError, GovernanceResult};
use super::settings::GovernanceSettings;
use super::types::{Address, ProposalId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A governance proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub proposer: Address,
    pub message: String,
    pub payload: Payload,
    pub created_at: Timestamp,
    pub voting_starts_at: Timestamp,
    pub voting_ends_at: Timestamp,
    pub expires_at: Timestamp,
    pub votes_for: u64,
    pub votes_against: u64,
    /// Everyone who voted, either way.
    pub voters: BTreeSet<Address>,
    /// Quorum was reached while voting was open.
    #[serde(default)]
    pub passed: bool,
    pub cancelled: bool,
    pub executed_at: Option<Timestamp>,
}

impl Proposal {
    /// Build a proposal with its voting timeline taken from `settings`.
    pub fn new(
        id: ProposalId,
        proposer: Address,
        message: String,
        payload: Payload,
        created_at: Timestamp,
        settings: &GovernanceSettings,
    ) -> Self {
        let voting_starts_at = created_at.saturating_add(settings.vote_delay);
        let voting_ends_at = voting_starts_at.saturating_add(settings.voting_duration);
        let expires_at = voting_ends_at.saturating_add(settings.execution_window);

        Self {
            id,
            proposer,
            message,
            payload,
            created_at,
            voting_starts_at,
            voting_ends_at,
            expires_at,
            votes_for: 0,
            votes_against: 0,
            voters: BTreeSet::new(),
            passed: false,
            cancelled: false,
            executed_at: None,
        }
    }

    pub fn has_voted(&self, voter: &Address) -> bool {
        self.voters.contains(voter)
    }

    /// Record a vote. Rejects a second vote from the same address.
    pub fn record_vote(&mut self, voter: Address, support: bool) -> GovernanceResult<()> {
        if !self.voters.insert(voter) {
            return Err(GovernanceError::DuplicateVote {
                proposal: self.id,
                voter,
            });
        }
        if support {
            self.votes_for += 1;
        } else {
            self.votes_against += 1;
        }
        Ok(())
    }
}

/// All proposals ever created, keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalBook {
    proposals: BTreeMap<ProposalId, Proposal>,
    /// Last id handed out; 0 means none yet.
    last_id: ProposalId,
}

impl ProposalBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of proposals ever created.
    pub fn count(&self) -> u64 {
        self.last_id
    }

    pub fn get(&self, id: ProposalId) -> GovernanceResult<&Proposal> {
        self.proposals
            .get(&id)
            .ok_or(GovernanceError::UnknownProposal(id))
    }

    pub fn get_mut(&mut self, id: ProposalId) -> GovernanceResult<&mut Proposal> {
        self.proposals
            .get_mut(&id)
            .ok_or(GovernanceError::UnknownProposal(id))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Proposal> {
        self.proposals.values_mut()
    }

    /// Create a proposal under the next id and return that id.
    pub fn create(
        &mut self,
        proposer: Address,
        message: String,
        payload: Payload,
        now: Timestamp,
        settings: &GovernanceSettings,
    ) -> ProposalId {
        self.last_id += 1;
        let id = self.last_id;
        self.proposals
            .insert(id, Proposal::new(id, proposer, message, payload, now, settings));
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leave_payload() -> Payload {
        Payload::Leave {
            address: Address::from_label("a"),
        }
    }

    #[test]
    fn test_ids_start_at_one_and_increase() {
        let mut book = ProposalBook::new();
        let settings = GovernanceSettings::default();
        let proposer = Address::from_label("a");
        let first = book.create(proposer, "one".into(), leave_payload(), 0, &settings);
        let second = book.create(proposer, "two".into(), leave_payload(), 0, &settings);
        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert_eq!(book.count(), 2);
    }

    #[test]
    fn test_timeline_from_settings() {
        let settings = GovernanceSettings {
            vote_delay: 5,
            voting_duration: 20,
            execution_window: 30,
            ..GovernanceSettings::default()
        };
        let proposer = Address::from_label("a");
        let proposal = Proposal::new(1, proposer, String::new(), leave_payload(), 100, &settings);
        assert_eq!(proposal.voting_starts_at, 105);
        assert_eq!(proposal.voting_ends_at, 125);
        assert_eq!(proposal.expires_at, 155);
    }

    #[test]
    fn test_duplicate_vote_rejected() {
        let settings = GovernanceSettings::default();
        let proposer = Address::from_label("a");
        let mut proposal = Proposal::new(7, proposer, String::new(), leave_payload(), 0, &settings);
        let voter = Address::from_label("voter");

        proposal.record_vote(voter, true).unwrap();
        let second = proposal.record_vote(voter, false);

        assert_eq!(
            second,
            Err(GovernanceError::DuplicateVote { proposal: 7, voter })
        );
        assert_eq!(proposal.votes_for, 1);
        assert_eq!(proposal.votes_against, 0);
    }

    #[test]
    fn test_unknown_proposal() {
        let book = ProposalBook::new();
        assert_eq!(book.get(3).unwrap_err(), GovernanceError::UnknownProposal(3));
    }
}
