//! Governance command engine.
//!
//! The engine owns the [`GovernanceState`] together with the host's ledger
//! and authority collaborators and applies one [`Command`] at a time.
//!
//! Each command runs as a transaction:
//! 1. Clone the state into a working copy
//! 2. Run the handler against the copy, queueing bond movements in a journal
//! 3. Hand the journal to the ledger (all-or-nothing)
//! 4. Append the audit entry and swap the copy in
//!
//! Any failure before step 4 drops the working copy, so a rejected command
//! never leaves partial changes behind.

use super::audit_trail::{query_audit_log, AuditAction, AuditEntry, AuditQuery};
use super::bond::{verify_bond_invariant, BondJournal};
use super::challenge::ChallengeOutcome;
use super::contracts::ContractUpgrade;
use super::cooldown::GovernanceAction;
use super::error::{GovernanceError, GovernanceResult, InvariantCorruption};
use super::membership::Member;
use super::proposals::{derive_state, execute_payload, Payload, Proposal, ProposalState};
use super::settings::GovernanceSettings;
use super::state::GovernanceState;
use super::types::{Address, Amount, ProposalId, Timestamp};
use crate::collaborators::{ActorAuthority, Ledger};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

/// A governance command, issued by some actor at some time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    Propose {
        message: String,
        payload: Payload,
    },
    Vote {
        proposal: ProposalId,
        support: bool,
    },
    Execute {
        proposal: ProposalId,
    },
    Cancel {
        proposal: ProposalId,
    },
    /// Join after an executed invite.
    Join,
    /// Leave after an executed Leave proposal.
    Leave {
        refund_to: Address,
    },
    /// Join without an invite while in low member mode.
    AutoJoin {
        label: String,
        url: String,
    },
    ChallengeMake {
        challenged: Address,
        #[serde(default, with = "crate::serialization::amount_string")]
        paid_fee: Amount,
    },
    ChallengeDecide {
        challenged: Address,
    },
    BootstrapMember {
        label: String,
        url: String,
        address: Address,
    },
    BootstrapSetting {
        key: String,
        value: String,
    },
    BootstrapUpgrade {
        upgrade: ContractUpgrade,
    },
    BootstrapDisable,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Propose { .. } => "propose",
            Command::Vote { .. } => "vote",
            Command::Execute { .. } => "execute",
            Command::Cancel { .. } => "cancel",
            Command::Join => "join",
            Command::Leave { .. } => "leave",
            Command::AutoJoin { .. } => "auto_join",
            Command::ChallengeMake { .. } => "challenge_make",
            Command::ChallengeDecide { .. } => "challenge_decide",
            Command::BootstrapMember { .. } => "bootstrap_member",
            Command::BootstrapSetting { .. } => "bootstrap_setting",
            Command::BootstrapUpgrade { .. } => "bootstrap_upgrade",
            Command::BootstrapDisable => "bootstrap_disable",
        }
    }
}

/// Successful result of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CommandOutcome {
    Proposed { proposal: ProposalId },
    Voted { proposal: ProposalId, state: ProposalState },
    Executed { proposal: ProposalId },
    Cancelled { proposal: ProposalId },
    Joined,
    Left,
    AutoJoined,
    ChallengeOpened { deadline: Timestamp },
    ChallengeDecided { outcome: ChallengeOutcome },
    BootstrapApplied,
}

/// Working copy of the state plus everything a handler may consult.
struct Transaction<'a, A: ?Sized> {
    state: GovernanceState,
    journal: BondJournal,
    authority: &'a A,
    actor: Address,
    now: Timestamp,
}

type Applied = (CommandOutcome, AuditAction, String);

impl<'a, A: ActorAuthority + ?Sized> Transaction<'a, A> {
    fn run(&mut self, command: &Command) -> GovernanceResult<Applied> {
        match command {
            Command::Propose { message, payload } => self.propose(message, payload),
            Command::Vote { proposal, support } => self.vote(*proposal, *support),
            Command::Execute { proposal } => self.execute(*proposal),
            Command::Cancel { proposal } => self.cancel(*proposal),
            Command::Join => self.join(),
            Command::Leave { refund_to } => self.leave(*refund_to),
            Command::AutoJoin { label, url } => self.auto_join(label, url),
            Command::ChallengeMake {
                challenged,
                paid_fee,
            } => self.challenge_make(*challenged, *paid_fee),
            Command::ChallengeDecide { challenged } => self.challenge_decide(*challenged),
            Command::BootstrapMember {
                label,
                url,
                address,
            } => self.bootstrap(Payload::Invite {
                label: label.clone(),
                url: url.clone(),
                address: *address,
            }),
            Command::BootstrapSetting { key, value } => self.bootstrap(Payload::SettingChange {
                key: key.clone(),
                value: value.clone(),
            }),
            Command::BootstrapUpgrade { upgrade } => self.bootstrap(Payload::Upgrade {
                upgrade: upgrade.clone(),
            }),
            Command::BootstrapDisable => self.bootstrap_disable(),
        }
    }

    // === Proposals ===

    fn propose(&mut self, message: &str, payload: &Payload) -> GovernanceResult<Applied> {
        if !self.state.members.is_valid(&self.actor) {
            return Err(GovernanceError::Unauthorized(
                "Invalid trusted node".to_string(),
            ));
        }

        let min_members = self.state.settings.min_members;
        if self.state.members.valid_count() < min_members {
            return Err(GovernanceError::InvariantViolation(format!(
                "Min member count ({}) not met to allow proposals to be added",
                min_members
            )));
        }

        self.state
            .cooldowns
            .check(
                &self.actor,
                GovernanceAction::Propose,
                self.state.settings.proposal_cooldown,
                self.now,
            )
            .map_err(|remaining_secs| GovernanceError::RateLimited { remaining_secs })?;

        let id = self.state.proposals.create(
            self.actor,
            message.to_string(),
            payload.clone(),
            self.now,
            &self.state.settings,
        );
        self.state
            .cooldowns
            .record(self.actor, GovernanceAction::Propose, self.now);

        Ok((
            CommandOutcome::Proposed { proposal: id },
            AuditAction::Propose,
            format!("Proposal {}: {}", id, payload),
        ))
    }

    fn vote(&mut self, id: ProposalId, support: bool) -> GovernanceResult<Applied> {
        let required = self.state.quorum_votes_required();
        let proposal = self.state.proposals.get(id)?;

        match derive_state(proposal, required, self.now) {
            ProposalState::Succeeded => return Err(GovernanceError::AlreadyDecided(id)),
            ProposalState::Active => {}
            closed if closed.is_terminal() => {
                return Err(GovernanceError::InvalidState(format!(
                    "Voting has closed for this proposal (state {})",
                    closed
                )))
            }
            _ => {
                return Err(GovernanceError::InvalidState(
                    "Voting has not started for this proposal".to_string(),
                ))
            }
        }

        let joined_at = self
            .state
            .members
            .get(&self.actor)
            .filter(|m| m.is_valid)
            .map(|m| m.joined_at)
            .ok_or_else(|| GovernanceError::NotEligible("Invalid trusted node".to_string()))?;
        if joined_at >= proposal.created_at {
            return Err(GovernanceError::NotEligible(
                "Member cannot vote on proposal created before they became a member".to_string(),
            ));
        }

        let proposal = self.state.proposals.get_mut(id)?;
        proposal.record_vote(self.actor, support)?;
        let state = derive_state(proposal, required, self.now);

        Ok((
            CommandOutcome::Voted {
                proposal: id,
                state,
            },
            AuditAction::Vote,
            format!(
                "Voted {} on proposal {} ({}/{} for)",
                if support { "for" } else { "against" },
                id,
                proposal.votes_for,
                required
            ),
        ))
    }

    fn execute(&mut self, id: ProposalId) -> GovernanceResult<Applied> {
        if self.state.proposal_state(id, self.now)? != ProposalState::Succeeded {
            return Err(GovernanceError::InvalidState(
                "Proposal has not succeeded, has expired or has already been executed"
                    .to_string(),
            ));
        }

        let payload = self.state.proposals.get(id)?.payload.clone();
        let summary = execute_payload(
            &mut self.state,
            &mut self.journal,
            self.authority,
            &payload,
            self.now,
        )?;
        self.state.proposals.get_mut(id)?.executed_at = Some(self.now);

        Ok((
            CommandOutcome::Executed { proposal: id },
            AuditAction::Execute,
            format!("Proposal {}: {}", id, summary),
        ))
    }

    fn cancel(&mut self, id: ProposalId) -> GovernanceResult<Applied> {
        if self.state.proposals.get(id)?.proposer != self.actor {
            return Err(GovernanceError::Unauthorized(
                "Proposal can only be cancelled by the proposer".to_string(),
            ));
        }
        if !self.state.proposal_state(id, self.now)?.is_cancellable() {
            return Err(GovernanceError::InvalidState(
                "Proposal can only be cancelled if pending or active".to_string(),
            ));
        }

        self.state.proposals.get_mut(id)?.cancelled = true;
        Ok((
            CommandOutcome::Cancelled { proposal: id },
            AuditAction::Cancel,
            format!("Cancelled proposal {}", id),
        ))
    }

    // === Membership ===

    fn join(&mut self) -> GovernanceResult<Applied> {
        let bond = self.state.settings.bond_amount;
        self.state
            .members
            .join(self.actor, bond, self.now, &mut self.journal)?;
        Ok((
            CommandOutcome::Joined,
            AuditAction::Join,
            format!("Joined with bond {}", bond),
        ))
    }

    fn leave(&mut self, refund_to: Address) -> GovernanceResult<Applied> {
        let settings = &self.state.settings;
        let (min_members, leave_window) = (settings.min_members, settings.leave_window);
        let refunded = self.state.members.get(&self.actor).map_or(0, |m| m.bond_amount);

        self.state.members.leave(
            &self.actor,
            refund_to,
            min_members,
            leave_window,
            self.now,
            &mut self.journal,
        )?;
        // A departed member has nothing left to answer for
        if self.state.challenges.is_challenged(&self.actor) {
            self.state.challenges.close(&self.actor)?;
        }

        Ok((
            CommandOutcome::Left,
            AuditAction::Leave,
            format!("Left, refunded {} to {}", refunded, refund_to),
        ))
    }

    fn auto_join(&mut self, label: &str, url: &str) -> GovernanceResult<Applied> {
        if !self.authority.is_registered_node(&self.actor) {
            return Err(GovernanceError::Unauthorized("Invalid node".to_string()));
        }

        let bond = self.state.settings.bond_amount;
        let min_members = self.state.settings.min_members;
        self.state.members.auto_join(
            self.actor,
            label,
            url,
            bond,
            min_members,
            self.now,
            &mut self.journal,
        )?;

        Ok((
            CommandOutcome::AutoJoined,
            AuditAction::AutoJoin,
            format!("Auto-joined as {} with bond {}", label, bond),
        ))
    }

    // === Challenges ===

    fn challenge_make(
        &mut self,
        challenged: Address,
        paid_fee: Amount,
    ) -> GovernanceResult<Applied> {
        if !self.state.members.is_valid(&challenged) {
            return Err(GovernanceError::InvalidTarget(format!(
                "Invalid trusted node: {}",
                challenged
            )));
        }
        if self.actor == challenged {
            return Err(GovernanceError::SelfChallenge);
        }

        let is_member = self.state.members.is_valid(&self.actor);
        if !is_member && !self.authority.is_registered_node(&self.actor) {
            return Err(GovernanceError::Unauthorized("Invalid node".to_string()));
        }
        if self.state.challenges.is_challenged(&challenged) {
            return Err(GovernanceError::AlreadyChallenged(challenged));
        }

        let settings = &self.state.settings;
        self.state
            .cooldowns
            .check(
                &self.actor,
                GovernanceAction::Challenge,
                settings.challenge_cooldown,
                self.now,
            )
            .map_err(|remaining_secs| GovernanceError::CooldownActive { remaining_secs })?;

        let fee = if is_member {
            0
        } else {
            if paid_fee < settings.challenge_cost {
                return Err(GovernanceError::FeeRequired {
                    required: settings.challenge_cost,
                    paid: paid_fee,
                });
            }
            paid_fee
        };

        let window = settings.challenge_window;
        let deadline = self
            .state
            .challenges
            .open(self.actor, challenged, fee, window, self.now)?
            .deadline;
        self.state
            .cooldowns
            .record(self.actor, GovernanceAction::Challenge, self.now);

        Ok((
            CommandOutcome::ChallengeOpened { deadline },
            AuditAction::ChallengeMake,
            format!("Challenged {} until {} (fee {})", challenged, deadline, fee),
        ))
    }

    fn challenge_decide(&mut self, challenged: Address) -> GovernanceResult<Applied> {
        let (deadline, expired) = self
            .state
            .challenges
            .get(&challenged)
            .map(|c| (c.deadline, c.has_expired(self.now)))
            .ok_or(GovernanceError::NoOpenChallenge(challenged))?;

        // The challenged member answering is the liveness response itself
        if self.actor == challenged {
            self.state.challenges.close(&challenged)?;
            return Ok((
                CommandOutcome::ChallengeDecided {
                    outcome: ChallengeOutcome::Responded,
                },
                AuditAction::ChallengeDecide,
                format!("{} responded to challenge", challenged),
            ));
        }

        if !expired {
            return Err(GovernanceError::WindowNotElapsed { deadline });
        }
        if !self.state.members.is_valid(&self.actor) {
            return Err(GovernanceError::Unauthorized(
                "Only trusted members can decide an expired challenge".to_string(),
            ));
        }

        self.state.challenges.close(&challenged)?;
        let min_members = self.state.settings.min_members;
        let refunded =
            self.state
                .members
                .kick(&challenged, 0, false, min_members, &mut self.journal)?;

        Ok((
            CommandOutcome::ChallengeDecided {
                outcome: ChallengeOutcome::Removed,
            },
            AuditAction::ChallengeDecide,
            format!(
                "{} failed to respond and was removed, refunded {}",
                challenged, refunded
            ),
        ))
    }

    // === Bootstrap ===

    fn ensure_bootstrap_guardian(&self) -> GovernanceResult<()> {
        if !self.authority.is_guardian(&self.actor) {
            return Err(GovernanceError::Unauthorized(
                "Account is not a temporary guardian".to_string(),
            ));
        }
        if !self.state.bootstrap_enabled {
            return Err(GovernanceError::InvalidState(
                "Bootstrap mode not engaged".to_string(),
            ));
        }
        Ok(())
    }

    fn bootstrap(&mut self, payload: Payload) -> GovernanceResult<Applied> {
        self.ensure_bootstrap_guardian()?;
        let summary = execute_payload(
            &mut self.state,
            &mut self.journal,
            self.authority,
            &payload,
            self.now,
        )?;
        Ok((CommandOutcome::BootstrapApplied, AuditAction::Bootstrap, summary))
    }

    fn bootstrap_disable(&mut self) -> GovernanceResult<Applied> {
        self.ensure_bootstrap_guardian()?;
        self.state.bootstrap_enabled = false;
        Ok((
            CommandOutcome::BootstrapApplied,
            AuditAction::Bootstrap,
            "Bootstrap mode disabled".to_string(),
        ))
    }
}

/// Single-writer governance engine.
#[derive(Debug)]
pub struct GovernanceEngine<L, A> {
    state: GovernanceState,
    ledger: L,
    authority: A,
}

impl<L: Ledger, A: ActorAuthority> GovernanceEngine<L, A> {
    /// Create an engine with empty state. Fails if `settings` are out of range.
    pub fn new(settings: GovernanceSettings, ledger: L, authority: A) -> GovernanceResult<Self> {
        settings.validate()?;
        Ok(Self::from_state(GovernanceState::new(settings), ledger, authority))
    }

    /// Resume from an existing state snapshot.
    pub fn from_state(state: GovernanceState, ledger: L, authority: A) -> Self {
        Self {
            state,
            ledger,
            authority,
        }
    }

    /// Apply `command` issued by `actor` at `now`.
    ///
    /// On error nothing changes: neither the governance state nor the ledger.
    pub fn apply(
        &mut self,
        actor: Address,
        command: &Command,
        now: Timestamp,
    ) -> GovernanceResult<CommandOutcome> {
        let mut tx = Transaction {
            state: self.state.clone(),
            journal: BondJournal::new(),
            authority: &self.authority,
            actor,
            now,
        };

        let (outcome, action, details) = match tx.run(command) {
            Ok(applied) => applied,
            Err(e) => {
                debug!(
                    actor = %actor.short(),
                    command = command.name(),
                    error = %e,
                    "Governance command rejected"
                );
                return Err(e);
            }
        };
        tx.state.latch_passed_proposals(now);

        if !tx.journal.is_empty() {
            if let Err(e) = self.ledger.commit(tx.journal.ops()) {
                debug!(
                    actor = %actor.short(),
                    command = command.name(),
                    error = %e,
                    "Ledger rejected bond movements"
                );
                return Err(e.into());
            }
        }

        let mut state = tx.state;
        state
            .audit_log
            .push(AuditEntry::new(now, actor, action, details));
        self.state = state;

        info!(
            actor = %actor.short(),
            command = command.name(),
            ?outcome,
            vault_delta = tx.journal.vault_delta(),
            "Governance command committed"
        );

        if let Err(corruption) = self.check_bond_invariant() {
            error!(
                recorded = %corruption.recorded,
                vault = %corruption.vault,
                "Bond ledger invariant violated"
            );
        }

        Ok(outcome)
    }

    // === Command shorthands ===

    pub fn propose(
        &mut self,
        actor: Address,
        message: &str,
        payload: Payload,
        now: Timestamp,
    ) -> GovernanceResult<ProposalId> {
        let command = Command::Propose {
            message: message.to_string(),
            payload,
        };
        match self.apply(actor, &command, now)? {
            CommandOutcome::Proposed { proposal } => Ok(proposal),
            other => Err(unexpected_outcome(other)),
        }
    }

    pub fn vote(
        &mut self,
        actor: Address,
        proposal: ProposalId,
        support: bool,
        now: Timestamp,
    ) -> GovernanceResult<ProposalState> {
        match self.apply(actor, &Command::Vote { proposal, support }, now)? {
            CommandOutcome::Voted { state, .. } => Ok(state),
            other => Err(unexpected_outcome(other)),
        }
    }

    pub fn execute(
        &mut self,
        actor: Address,
        proposal: ProposalId,
        now: Timestamp,
    ) -> GovernanceResult<()> {
        self.apply(actor, &Command::Execute { proposal }, now).map(|_| ())
    }

    pub fn cancel(
        &mut self,
        actor: Address,
        proposal: ProposalId,
        now: Timestamp,
    ) -> GovernanceResult<()> {
        self.apply(actor, &Command::Cancel { proposal }, now).map(|_| ())
    }

    pub fn join(&mut self, actor: Address, now: Timestamp) -> GovernanceResult<()> {
        self.apply(actor, &Command::Join, now).map(|_| ())
    }

    pub fn leave(
        &mut self,
        actor: Address,
        refund_to: Address,
        now: Timestamp,
    ) -> GovernanceResult<()> {
        self.apply(actor, &Command::Leave { refund_to }, now).map(|_| ())
    }

    pub fn auto_join(
        &mut self,
        actor: Address,
        label: &str,
        url: &str,
        now: Timestamp,
    ) -> GovernanceResult<()> {
        let command = Command::AutoJoin {
            label: label.to_string(),
            url: url.to_string(),
        };
        self.apply(actor, &command, now).map(|_| ())
    }

    /// Open a challenge; returns its deadline.
    pub fn challenge_make(
        &mut self,
        challenger: Address,
        challenged: Address,
        paid_fee: Amount,
        now: Timestamp,
    ) -> GovernanceResult<Timestamp> {
        let command = Command::ChallengeMake {
            challenged,
            paid_fee,
        };
        match self.apply(challenger, &command, now)? {
            CommandOutcome::ChallengeOpened { deadline } => Ok(deadline),
            other => Err(unexpected_outcome(other)),
        }
    }

    pub fn challenge_decide(
        &mut self,
        decider: Address,
        challenged: Address,
        now: Timestamp,
    ) -> GovernanceResult<ChallengeOutcome> {
        match self.apply(decider, &Command::ChallengeDecide { challenged }, now)? {
            CommandOutcome::ChallengeDecided { outcome } => Ok(outcome),
            other => Err(unexpected_outcome(other)),
        }
    }

    // === Queries ===

    pub fn state(&self) -> &GovernanceState {
        &self.state
    }

    pub fn settings(&self) -> &GovernanceSettings {
        &self.state.settings
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn authority_mut(&mut self) -> &mut A {
        &mut self.authority
    }

    pub fn proposal(&self, id: ProposalId) -> GovernanceResult<&Proposal> {
        self.state.proposals.get(id)
    }

    pub fn proposal_state(
        &self,
        id: ProposalId,
        now: Timestamp,
    ) -> GovernanceResult<ProposalState> {
        self.state.proposal_state(id, now)
    }

    pub fn proposal_count(&self) -> u64 {
        self.state.proposals.count()
    }

    pub fn votes_for(&self, id: ProposalId) -> GovernanceResult<u64> {
        Ok(self.state.proposals.get(id)?.votes_for)
    }

    /// Votes proposal `id` needs, evaluated against the current membership.
    pub fn votes_required(&self, id: ProposalId) -> GovernanceResult<u64> {
        self.state.proposals.get(id)?;
        Ok(self.state.quorum_votes_required())
    }

    pub fn quorum_votes_required(&self) -> u64 {
        self.state.quorum_votes_required()
    }

    pub fn member(&self, address: &Address) -> Option<&Member> {
        self.state.members.get(address)
    }

    pub fn member_is_valid(&self, address: &Address) -> bool {
        self.state.members.is_valid(address)
    }

    pub fn member_is_challenged(&self, address: &Address) -> bool {
        self.state.challenges.is_challenged(address)
    }

    pub fn member_count(&self) -> u64 {
        self.state.members.valid_count()
    }

    /// Challenge fees paid by non-members so far.
    pub fn challenge_fees_collected(&self) -> Amount {
        self.state.challenges.fees_collected()
    }

    /// Sum of all recorded member bonds.
    pub fn bond_vault_total(&self) -> Amount {
        self.state.members.total_bonded()
    }

    pub fn audit_log(&self, query: &AuditQuery) -> Vec<AuditEntry> {
        query_audit_log(&self.state.audit_log, query)
    }

    /// Compare recorded bonds against the ledger's vault balance.
    pub fn check_bond_invariant(&self) -> Result<(), InvariantCorruption> {
        verify_bond_invariant(self.state.members.total_bonded(), self.ledger.vault_balance())
    }
}

fn unexpected_outcome(outcome: CommandOutcome) -> GovernanceError {
    GovernanceError::InvalidState(format!("Unexpected command outcome: {:?}", outcome))
}
