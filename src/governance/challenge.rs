//! Liveness challenges.
//!
//! Any member (or a registered node paying the challenge fee) may challenge a
//! trusted member. The challenged member answers by deciding its own
//! challenge; if nobody answers before the deadline, any member can decide it
//! and the target is kicked without a fine.
//!
//! This module only holds the open-challenge book. Eligibility checks that
//! need the registry and the cooldown tracker live with the engine command.

use super::error::{GovernanceError, GovernanceResult};
use super::types::{Address, Amount, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An open challenge against a member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub challenger: Address,
    pub challenged: Address,
    pub started_at: Timestamp,
    /// `started_at + challenge_window`.
    pub deadline: Timestamp,
    #[serde(with = "crate::serialization::amount_string")]
    pub fee_paid: Amount,
}

impl Challenge {
    pub fn has_expired(&self, now: Timestamp) -> bool {
        now >= self.deadline
    }
}

/// How a challenge was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChallengeOutcome {
    /// The challenged member responded; it stays a member.
    Responded,
    /// Nobody responded in time; the member was removed.
    Removed,
}

/// Open challenges keyed by challenged address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeBook {
    open: BTreeMap<Address, Challenge>,
    /// Challenge fees paid by non-members, in base units.
    #[serde(default, with = "crate::serialization::amount_string")]
    fees_collected: Amount,
}

impl ChallengeBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_challenged(&self, address: &Address) -> bool {
        self.open.contains_key(address)
    }

    pub fn get(&self, address: &Address) -> Option<&Challenge> {
        self.open.get(address)
    }

    pub fn fees_collected(&self) -> Amount {
        self.fees_collected
    }

    /// Open a challenge. Fails if the target already has one open.
    pub fn open(
        &mut self,
        challenger: Address,
        challenged: Address,
        fee_paid: Amount,
        window: u64,
        now: Timestamp,
    ) -> GovernanceResult<&Challenge> {
        if self.open.contains_key(&challenged) {
            return Err(GovernanceError::AlreadyChallenged(challenged));
        }

        self.fees_collected = self.fees_collected.saturating_add(fee_paid);
        let challenge = Challenge {
            challenger,
            challenged,
            started_at: now,
            deadline: now.saturating_add(window),
            fee_paid,
        };
        Ok(self.open.entry(challenged).or_insert(challenge))
    }

    /// Remove and return the open challenge against `challenged`.
    pub fn close(&mut self, challenged: &Address) -> GovernanceResult<Challenge> {
        self.open
            .remove(challenged)
            .ok_or(GovernanceError::NoOpenChallenge(*challenged))
    }
}
