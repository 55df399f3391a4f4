//! Trusted-node governance.
//!
//! - Quorum: fixed-point `ceil(members × quorum)` vote requirement
//! - Bond: per-member bond accounting over an external ledger
//! - Membership: invite / join / leave / kick / auto-join
//! - Challenge: liveness challenges with response windows and cooldowns
//! - Proposals: creation, voting, execution, cancellation, derived state
//! - Engine: atomic, single-writer command application

pub mod audit_trail;
pub mod bond;
pub mod challenge;
pub mod contracts;
pub mod cooldown;
pub mod engine;
pub mod error;
pub mod membership;
pub mod proposals;
pub mod quorum;
pub mod settings;
pub mod state;
pub mod types;

#[cfg(test)]
mod proptests;

pub use audit_trail::{query_audit_log, AuditAction, AuditEntry, AuditQuery};
pub use challenge::{Challenge, ChallengeOutcome};
pub use contracts::{ContractUpgrade, UpgradeKind};
pub use engine::{Command, CommandOutcome, GovernanceEngine};
pub use error::{GovernanceError, GovernanceResult, InvariantCorruption};
pub use membership::Member;
pub use proposals::{Payload, Proposal, ProposalState};
pub use quorum::{votes_required, Fraction};
pub use settings::GovernanceSettings;
pub use state::GovernanceState;
pub use types::{Address, Amount, ProposalId, Timestamp};
