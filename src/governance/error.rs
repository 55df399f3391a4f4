//! Governance failure taxonomy.
//!
//! Every variant is local and recoverable: the command does not apply and the
//! state is left exactly as it was. Bond ledger corruption is not an error
//! path and is reported through [`InvariantCorruption`] instead.

use super::types::{Address, Amount, ProposalId, Timestamp};
use crate::collaborators::LedgerError;
use thiserror::Error;

/// Governance command errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GovernanceError {
    /// Caller lacks the required role (guardian, member, proposer).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Operation is not valid for the entity's current lifecycle state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Voter is not a qualifying member for this proposal.
    #[error("Not eligible: {0}")]
    NotEligible(String),

    #[error("Member {voter} has already voted on proposal {proposal}")]
    DuplicateVote {
        proposal: ProposalId,
        voter: Address,
    },

    #[error("Duplicate: {0}")]
    Duplicate(String),

    /// Proposal cooldown has not elapsed yet.
    #[error("Member has not waited long enough to make another proposal ({remaining_secs}s remaining)")]
    RateLimited { remaining_secs: u64 },

    /// The command would breach a structural invariant (e.g. minimum members).
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("You cannot challenge yourself")]
    SelfChallenge,

    #[error("Member {0} has no open challenge")]
    NoOpenChallenge(Address),

    #[error("Member {0} is already being challenged")]
    AlreadyChallenged(Address),

    #[error("Refute window has not yet passed (deadline {deadline})")]
    WindowNotElapsed { deadline: Timestamp },

    #[error("Non-members must pay {required} to challenge a member (paid {paid})")]
    FeeRequired { required: Amount, paid: Amount },

    #[error("Challenge cooldown has not passed ({remaining_secs}s remaining)")]
    CooldownActive { remaining_secs: u64 },

    #[error("Address {0} has not been invited to join")]
    NotInvited(Address),

    #[error("Address {0} was kicked and can never rejoin")]
    PermanentlyBanned(Address),

    /// Proposal already reached quorum; voting is complete.
    #[error("Proposal {0} has passed, voting is complete and the proposal can now be executed")]
    AlreadyDecided(ProposalId),

    #[error("Unknown proposal: {0}")]
    UnknownProposal(ProposalId),

    #[error("Invalid setting: {0}")]
    InvalidSetting(String),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Result type for governance commands.
pub type GovernanceResult<T> = Result<T, GovernanceError>;

/// Detected corruption of the bond accounting. Indicates a defect, not a
/// rejected command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Bond ledger mismatch: members hold {recorded} in bonds but the vault holds {vault}")]
pub struct InvariantCorruption {
    pub recorded: Amount,
    pub vault: Amount,
}
