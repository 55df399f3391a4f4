//! The governance state aggregate.
//!
//! Everything the engine mutates lives in one [`GovernanceState`] value: the
//! settings, members, proposals, open challenges, cooldowns, contract registry
//! and the audit trail. Commands run against a clone and the clone replaces
//! the live state only when the command commits.
//!
//! Snapshots are CBOR (see [`crate::serialization`]); new fields carry
//! `#[serde(default)]` so older snapshots still decode.

use super::audit_trail::AuditEntry;
use super::challenge::ChallengeBook;
use super::contracts::ContractRegistry;
use super::cooldown::CooldownTracker;
use super::error::GovernanceResult;
use super::membership::MembershipRegistry;
use super::proposals::{derive_state, ProposalBook, ProposalState};
use super::quorum::votes_required;
use super::settings::GovernanceSettings;
use super::types::{ProposalId, Timestamp};
use crate::serialization::{from_cbor, to_cbor, SerializationError};
use serde::{Deserialize, Serialize};

/// Current snapshot schema version.
pub const SCHEMA_VERSION: u64 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceState {
    pub schema_version: u64,
    pub settings: GovernanceSettings,
    pub members: MembershipRegistry,
    pub proposals: ProposalBook,
    pub challenges: ChallengeBook,
    #[serde(default)]
    pub cooldowns: CooldownTracker,
    #[serde(default)]
    pub contracts: ContractRegistry,
    /// Guardian bootstrap powers; switched off once, for good.
    #[serde(default = "default_bootstrap_enabled")]
    pub bootstrap_enabled: bool,
    #[serde(default)]
    pub audit_log: Vec<AuditEntry>,
}

fn default_bootstrap_enabled() -> bool {
    true
}

impl GovernanceState {
    pub fn new(settings: GovernanceSettings) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            settings,
            members: MembershipRegistry::new(),
            proposals: ProposalBook::new(),
            challenges: ChallengeBook::new(),
            cooldowns: CooldownTracker::new(),
            contracts: ContractRegistry::new(),
            bootstrap_enabled: true,
            audit_log: Vec::new(),
        }
    }

    /// Votes a proposal needs right now: `ceil(valid members × quorum)`.
    pub fn quorum_votes_required(&self) -> u64 {
        votes_required(self.members.valid_count(), self.settings.quorum)
    }

    /// Derived state of proposal `id` at `now`.
    pub fn proposal_state(
        &self,
        id: ProposalId,
        now: Timestamp,
    ) -> GovernanceResult<ProposalState> {
        let proposal = self.proposals.get(id)?;
        Ok(derive_state(proposal, self.quorum_votes_required(), now))
    }

    /// Latch every proposal that currently derives as Succeeded.
    ///
    /// Runs once per committed command, so quorum met at any point inside a
    /// voting window survives later membership and quorum changes.
    pub fn latch_passed_proposals(&mut self, now: Timestamp) {
        let required = self.quorum_votes_required();
        for proposal in self.proposals.iter_mut() {
            if proposal.passed {
                continue;
            }
            if derive_state(proposal, required, now) == ProposalState::Succeeded {
                proposal.passed = true;
            }
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SerializationError> {
        to_cbor(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SerializationError> {
        from_cbor(bytes)
    }
}

impl Default for GovernanceState {
    fn default() -> Self {
        Self::new(GovernanceSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::governance::bond::BondJournal;
    use crate::governance::proposals::Payload;
    use crate::governance::types::Address;

    fn populated() -> GovernanceState {
        let mut state = GovernanceState::default();
        let mut journal = BondJournal::new();
        for label in ["a", "b", "c"] {
            let address = Address::from_label(label);
            state.members.invite(address, label, "").unwrap();
            state.members.join(address, 10, 1, &mut journal).unwrap();
        }
        let settings = state.settings.clone();
        state.proposals.create(
            Address::from_label("a"),
            "leave".into(),
            Payload::Leave {
                address: Address::from_label("a"),
            },
            5,
            &settings,
        );
        state
    }

    #[test]
    fn test_quorum_tracks_member_count() {
        let state = populated();
        // ceil(3 * 0.51) = 2
        assert_eq!(state.quorum_votes_required(), 2);
    }

    #[test]
    fn test_proposal_state_query() {
        let state = populated();
        assert_eq!(state.proposal_state(1, 5).unwrap(), ProposalState::Pending);
        assert!(state.proposal_state(2, 5).is_err());
    }

    #[test]
    fn test_latch_only_inside_voting_window() {
        let mut state = populated();
        let voting_ends_at = state.proposals.get(1).unwrap().voting_ends_at;
        {
            let proposal = state.proposals.get_mut(1).unwrap();
            proposal.record_vote(Address::from_label("a"), true).unwrap();
            proposal.record_vote(Address::from_label("b"), true).unwrap();
        }

        // Too late: the window closed without a commit seeing quorum
        let mut late = state.clone();
        late.latch_passed_proposals(voting_ends_at);
        assert!(!late.proposals.get(1).unwrap().passed);
        assert_eq!(
            late.proposal_state(1, voting_ends_at).unwrap(),
            ProposalState::Defeated
        );

        state.latch_passed_proposals(voting_ends_at - 1);
        assert!(state.proposals.get(1).unwrap().passed);
        assert_eq!(
            state.proposal_state(1, voting_ends_at).unwrap(),
            ProposalState::Succeeded
        );
    }

    #[test]
    fn test_cbor_snapshot_roundtrip() {
        let state = populated();
        let bytes = state.to_bytes().unwrap();
        let restored = GovernanceState::from_bytes(&bytes).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn test_fresh_state_is_in_bootstrap_mode() {
        let state = GovernanceState::default();
        assert!(state.bootstrap_enabled);
        assert_eq!(state.schema_version, SCHEMA_VERSION);
        assert_eq!(state.members.valid_count(), 0);
    }
}
