//! Proposal state derivation.
//!
//! Proposal state is never stored. It is recomputed from the proposal's
//! timestamps, its flags and the live vote requirement every time it is read,
//! so a cancel or execute can never leave a stale cached state behind.
//!
//! The live requirement only matters while voting is open. The engine
//! latches `passed` on every commit that finds quorum met inside the window,
//! so once voting ends Succeeded, Defeated and Expired stay where they are.

use super::Proposal;
use crate::governance::types::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Derived lifecycle state of a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalState {
    Pending,
    Active,
    Cancelled,
    Defeated,
    Succeeded,
    Expired,
    Executed,
}

impl ProposalState {
    /// No further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProposalState::Cancelled
                | ProposalState::Defeated
                | ProposalState::Expired
                | ProposalState::Executed
        )
    }

    /// Whether the proposer may still cancel.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, ProposalState::Pending | ProposalState::Active)
    }
}

impl fmt::Display for ProposalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProposalState::Pending => "Pending",
            ProposalState::Active => "Active",
            ProposalState::Cancelled => "Cancelled",
            ProposalState::Defeated => "Defeated",
            ProposalState::Succeeded => "Succeeded",
            ProposalState::Expired => "Expired",
            ProposalState::Executed => "Executed",
        };
        f.write_str(name)
    }
}

/// Derive the state of `proposal` at `now`, given the live vote requirement.
///
/// Precedence: cancelled, executed, pending before voting starts, then
/// succeeded/expired once passed, active until voting ends, defeated after.
pub fn derive_state(proposal: &Proposal, votes_required: u64, now: Timestamp) -> ProposalState {
    if proposal.cancelled {
        return ProposalState::Cancelled;
    }
    if proposal.executed_at.is_some() {
        return ProposalState::Executed;
    }
    if now < proposal.voting_starts_at {
        return ProposalState::Pending;
    }

    let voting_open = now < proposal.voting_ends_at;
    if proposal.passed || (voting_open && proposal.votes_for >= votes_required) {
        if now < proposal.expires_at {
            return ProposalState::Succeeded;
        }
        return ProposalState::Expired;
    }
    if voting_open {
        return ProposalState::Active;
    }
    ProposalState::Defeated
}
