//! Governance parameters.
//!
//! Settings are part of the governance state: they start from operator
//! configuration, may be changed by the guardian while bootstrap mode is
//! enabled, and afterwards only through an executed `SettingChange` proposal.
//! Every change goes through [`GovernanceSettings::apply_change`], which
//! validates the whole resulting parameter set before accepting it.

use super::error::{GovernanceError, GovernanceResult};
use super::quorum::{is_admissible_quorum, Fraction};
use super::types::Amount;
use crate::serialization::amount_string;
use serde::{Deserialize, Serialize};

const DAY: u64 = 86_400;

/// Trusted-node governance parameters. Durations are in seconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceSettings {
    /// Fraction of valid members whose "for" votes pass a proposal, in `(0, 0.90]`.
    #[serde(default = "default_quorum")]
    pub quorum: Fraction,

    /// Bond each member deposits on joining.
    #[serde(default = "default_bond_amount", with = "amount_string")]
    pub bond_amount: Amount,

    /// Minimum number of valid members (below it: low member mode).
    #[serde(default = "default_min_members")]
    pub min_members: u64,

    /// Minimum time between two proposals by the same member.
    #[serde(default = "default_proposal_cooldown")]
    pub proposal_cooldown: u64,

    /// Delay between proposal creation and the start of voting.
    #[serde(default = "default_vote_delay")]
    pub vote_delay: u64,

    /// Length of the voting period. Must be > 0.
    #[serde(default = "default_voting_duration")]
    pub voting_duration: u64,

    /// Time after voting ends during which a passed proposal can be executed.
    #[serde(default = "default_execution_window")]
    pub execution_window: u64,

    /// Time a challenged member has to respond. Must be > 0.
    #[serde(default = "default_challenge_window")]
    pub challenge_window: u64,

    /// Minimum time between two challenges issued by the same address.
    #[serde(default = "default_challenge_cooldown")]
    pub challenge_cooldown: u64,

    /// Fee a non-member must pay to issue a challenge.
    #[serde(default = "default_challenge_cost", with = "amount_string")]
    pub challenge_cost: Amount,

    /// Time after an executed leave proposal during which the member may leave.
    #[serde(default = "default_leave_window")]
    pub leave_window: u64,
}

fn default_quorum() -> Fraction {
    Fraction::from_bps(5100).unwrap_or(Fraction::ONE)
}

fn default_bond_amount() -> Amount {
    1_750 * 1_000_000_000_000_000_000
}

fn default_min_members() -> u64 {
    3
}

fn default_proposal_cooldown() -> u64 {
    2 * DAY
}

fn default_vote_delay() -> u64 {
    7 * DAY
}

fn default_voting_duration() -> u64 {
    14 * DAY
}

fn default_execution_window() -> u64 {
    28 * DAY
}

fn default_challenge_window() -> u64 {
    7 * DAY
}

fn default_challenge_cooldown() -> u64 {
    7 * DAY
}

fn default_challenge_cost() -> Amount {
    1_000_000_000_000_000_000
}

fn default_leave_window() -> u64 {
    28 * DAY
}

impl Default for GovernanceSettings {
    fn default() -> Self {
        Self {
            quorum: default_quorum(),
            bond_amount: default_bond_amount(),
            min_members: default_min_members(),
            proposal_cooldown: default_proposal_cooldown(),
            vote_delay: default_vote_delay(),
            voting_duration: default_voting_duration(),
            execution_window: default_execution_window(),
            challenge_window: default_challenge_window(),
            challenge_cooldown: default_challenge_cooldown(),
            challenge_cost: default_challenge_cost(),
            leave_window: default_leave_window(),
        }
    }
}

/// Known setting keys, as used by `SettingChange` proposals and bootstrap.
pub const SETTING_KEYS: &[&str] = &[
    "members.quorum",
    "members.bond",
    "members.minimum",
    "members.challenge.window",
    "members.challenge.cooldown",
    "members.challenge.cost",
    "members.leave.window",
    "proposal.cooldown",
    "proposal.vote.delay",
    "proposal.vote.duration",
    "proposal.execute.window",
];

impl GovernanceSettings {
    /// Check every parameter against its admissible range.
    pub fn validate(&self) -> GovernanceResult<()> {
        if !is_admissible_quorum(self.quorum) {
            return Err(GovernanceError::InvalidSetting(format!(
                "Quorum setting must be > 0 & <= 90%, got {}",
                self.quorum
            )));
        }
        if self.min_members < 1 {
            return Err(GovernanceError::InvalidSetting(
                "members.minimum must be at least 1".to_string(),
            ));
        }
        if self.voting_duration == 0 {
            return Err(GovernanceError::InvalidSetting(
                "proposal.vote.duration must be greater than zero".to_string(),
            ));
        }
        if self.challenge_window == 0 {
            return Err(GovernanceError::InvalidSetting(
                "members.challenge.window must be greater than zero".to_string(),
            ));
        }
        if self.leave_window == 0 {
            return Err(GovernanceError::InvalidSetting(
                "members.leave.window must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply a single `key = value` change, returning the new settings.
    ///
    /// The receiver is left untouched; the caller swaps in the result only if
    /// the whole command succeeds.
    pub fn apply_change(&self, key: &str, value: &str) -> GovernanceResult<Self> {
        let mut next = self.clone();

        match key {
            "members.quorum" => {
                next.quorum = value.parse().map_err(|e| {
                    GovernanceError::InvalidSetting(format!("Invalid members.quorum value: {}", e))
                })?;
            }
            "members.bond" => next.bond_amount = parse_amount(key, value)?,
            "members.minimum" => {
                next.min_members = value.trim().parse().map_err(|_| {
                    GovernanceError::InvalidSetting(format!(
                        "Invalid members.minimum value: {}",
                        value
                    ))
                })?;
            }
            "members.challenge.window" => next.challenge_window = parse_duration_secs(key, value)?,
            "members.challenge.cooldown" => {
                next.challenge_cooldown = parse_duration_secs(key, value)?
            }
            "members.challenge.cost" => next.challenge_cost = parse_amount(key, value)?,
            "members.leave.window" => next.leave_window = parse_duration_secs(key, value)?,
            "proposal.cooldown" => next.proposal_cooldown = parse_duration_secs(key, value)?,
            "proposal.vote.delay" => next.vote_delay = parse_duration_secs(key, value)?,
            "proposal.vote.duration" => next.voting_duration = parse_duration_secs(key, value)?,
            "proposal.execute.window" => next.execution_window = parse_duration_secs(key, value)?,
            _ => {
                return Err(GovernanceError::InvalidSetting(format!(
                    "Unknown setting key: {}",
                    key
                )));
            }
        }

        next.validate()?;
        Ok(next)
    }
}

/// Parse a duration given either as plain seconds ("3600") or in humantime
/// form ("1h", "7 days").
pub fn parse_duration_secs(key: &str, value: &str) -> GovernanceResult<u64> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Ok(secs);
    }
    humantime::parse_duration(value)
        .map(|d| d.as_secs())
        .map_err(|e| {
            GovernanceError::InvalidSetting(format!("Invalid {} value '{}': {}", key, value, e))
        })
}

fn parse_amount(key: &str, value: &str) -> GovernanceResult<Amount> {
    value
        .trim()
        .replace('_', "")
        .parse()
        .map_err(|_| GovernanceError::InvalidSetting(format!("Invalid {} value: {}", key, value)))
}
