//! Per-address cooldowns for governance actions.
//!
//! ## Applies To
//!
//! - `Propose` - members must wait `proposal_cooldown` between proposals
//! - `Challenge` - challengers must wait `challenge_cooldown` between challenges
//!
//! ## Implementation Notes
//!
//! - Stores only the timestamp of the last action per (action, address)
//! - Time is always supplied by the caller; nothing here reads a clock
//! - Part of the governance state, so it is cloned and rolled back with it

use super::types::{Address, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Actions subject to a cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GovernanceAction {
    /// Create a proposal
    Propose,
    /// Open a liveness challenge
    Challenge,
}

/// Last-action timestamps keyed by action, then address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownTracker {
    last_action: BTreeMap<GovernanceAction, BTreeMap<Address, Timestamp>>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether `actor` may perform `action` at `now`.
    ///
    /// Returns `Err(remaining_secs)` while the cooldown since the actor's last
    /// recorded action has not elapsed. An actor with no history is never
    /// limited, and a zero cooldown never limits.
    pub fn check(
        &self,
        actor: &Address,
        action: GovernanceAction,
        cooldown: u64,
        now: Timestamp,
    ) -> Result<(), u64> {
        let Some(last) = self.last_action(actor, action) else {
            return Ok(());
        };

        let elapsed = now.saturating_sub(last);
        if elapsed < cooldown {
            return Err(cooldown - elapsed);
        }
        Ok(())
    }

    /// Record that `actor` performed `action` at `now`.
    ///
    /// Call only after the action has succeeded.
    pub fn record(&mut self, actor: Address, action: GovernanceAction, now: Timestamp) {
        self.last_action
            .entry(action)
            .or_default()
            .insert(actor, now);
    }

    /// Timestamp of the actor's last recorded `action`, if any.
    pub fn last_action(&self, actor: &Address, action: GovernanceAction) -> Option<Timestamp> {
        self.last_action
            .get(&action)
            .and_then(|by_actor| by_actor.get(actor))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member() -> Address {
        Address::from_label("member")
    }

    #[test]
    fn test_first_action_is_never_limited() {
        let tracker = CooldownTracker::new();
        assert!(tracker
            .check(&member(), GovernanceAction::Propose, 3600, 0)
            .is_ok());
    }

    #[test]
    fn test_cooldown_boundaries() {
        let mut tracker = CooldownTracker::new();
        tracker.record(member(), GovernanceAction::Propose, 1_000);

        assert_eq!(
            tracker.check(&member(), GovernanceAction::Propose, 100, 1_099),
            Err(1)
        );
        assert!(tracker
            .check(&member(), GovernanceAction::Propose, 100, 1_100)
            .is_ok());
    }

    #[test]
    fn test_actions_are_tracked_independently() {
        let mut tracker = CooldownTracker::new();
        tracker.record(member(), GovernanceAction::Challenge, 500);

        assert!(tracker
            .check(&member(), GovernanceAction::Propose, 100, 500)
            .is_ok());
        assert!(tracker
            .check(&member(), GovernanceAction::Challenge, 100, 500)
            .is_err());
    }

    #[test]
    fn test_actors_are_tracked_independently() {
        let mut tracker = CooldownTracker::new();
        tracker.record(member(), GovernanceAction::Propose, 500);

        let other = Address::from_label("other");
        assert!(tracker
            .check(&other, GovernanceAction::Propose, 100, 500)
            .is_ok());
    }

    #[test]
    fn test_zero_cooldown_never_limits() {
        let mut tracker = CooldownTracker::new();
        tracker.record(member(), GovernanceAction::Propose, 500);
        assert!(tracker
            .check(&member(), GovernanceAction::Propose, 0, 500)
            .is_ok());
    }

    #[test]
    fn test_record_overwrites_previous_timestamp() {
        let mut tracker = CooldownTracker::new();
        tracker.record(member(), GovernanceAction::Propose, 10);
        tracker.record(member(), GovernanceAction::Propose, 20);
        assert_eq!(
            tracker.last_action(&member(), GovernanceAction::Propose),
            Some(20)
        );
    }

    #[test]
    fn test_json_roundtrip() {
        let mut tracker = CooldownTracker::new();
        tracker.record(member(), GovernanceAction::Challenge, 42);
        let json = serde_json::to_string(&tracker).unwrap();
        let back: CooldownTracker = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tracker);
    }
}
