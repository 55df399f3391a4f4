//! Property-based tests for the governance engine
//!
//! Tests for:
//! - Quorum: ceiling formula, bounds, admissible range
//! - Proposals: monotonic ids, distinct voters, late joiners never vote
//! - Bonds: vault invariant under random command sequences, kick settlement

use super::engine::{Command, GovernanceEngine};
use super::error::GovernanceError;
use super::proposals::{Payload, ProposalState};
use super::quorum::{is_admissible_quorum, votes_required, Fraction, MAX_QUORUM, WAD};
use super::settings::GovernanceSettings;
use super::types::{Address, Amount, Timestamp};
use crate::collaborators::{InMemoryLedger, Ledger, StaticAuthority};
use proptest::prelude::*;

const BOND: Amount = 1_000;
const T0: Timestamp = 10_000;
const PARTICIPANTS: usize = 7;

fn participant(i: usize) -> Address {
    Address::from_label(&format!("node-{}", i))
}

fn guardian() -> Address {
    Address::from_label("guardian")
}

fn settings() -> GovernanceSettings {
    GovernanceSettings {
        bond_amount: BOND,
        min_members: 2,
        vote_delay: 5,
        voting_duration: 50,
        execution_window: 50,
        proposal_cooldown: 10,
        challenge_window: 30,
        challenge_cooldown: 20,
        challenge_cost: 7,
        leave_window: 40,
        ..GovernanceSettings::default()
    }
}

/// All participants registered and funded; the first `members` bootstrapped and joined.
fn engine(members: usize) -> GovernanceEngine<InMemoryLedger, StaticAuthority> {
    let authority = StaticAuthority::new(guardian()).with_nodes((0..PARTICIPANTS).map(participant));
    let mut ledger = InMemoryLedger::new();
    for i in 0..PARTICIPANTS {
        ledger.mint(participant(i), 100 * BOND);
    }

    let mut engine = GovernanceEngine::new(settings(), ledger, authority).unwrap();
    for i in 0..members {
        engine
            .apply(
                guardian(),
                &Command::BootstrapMember {
                    label: format!("node-{}", i),
                    url: String::new(),
                    address: participant(i),
                },
                T0,
            )
            .unwrap();
        engine.join(participant(i), T0).unwrap();
    }
    engine
}

/// One random step of governance activity.
#[derive(Debug, Clone)]
enum Step {
    Advance(u64),
    Propose { actor: usize, target: usize, kind: u8, fine: Amount },
    Vote { actor: usize, proposal: u64, support: bool },
    Execute { actor: usize, proposal: u64 },
    Cancel { actor: usize, proposal: u64 },
    Join { actor: usize },
    Leave { actor: usize },
    Challenge { actor: usize, target: usize, fee: Amount },
    Decide { actor: usize, target: usize },
    AutoJoin { actor: usize },
}

fn step_strategy() -> impl Strategy<Value = Step> {
    let who = 0..PARTICIPANTS;
    prop_oneof![
        (1u64..40).prop_map(Step::Advance),
        (who.clone(), who.clone(), 0u8..3, 0..=BOND).prop_map(|(actor, target, kind, fine)| {
            Step::Propose {
                actor,
                target,
                kind,
                fine,
            }
        }),
        (who.clone(), 1u64..8, any::<bool>()).prop_map(|(actor, proposal, support)| Step::Vote {
            actor,
            proposal,
            support
        }),
        (who.clone(), 1u64..8).prop_map(|(actor, proposal)| Step::Execute { actor, proposal }),
        (who.clone(), 1u64..8).prop_map(|(actor, proposal)| Step::Cancel { actor, proposal }),
        who.clone().prop_map(|actor| Step::Join { actor }),
        who.clone().prop_map(|actor| Step::Leave { actor }),
        (who.clone(), who.clone(), 0u128..10).prop_map(|(actor, target, fee)| Step::Challenge {
            actor,
            target,
            fee
        }),
        (who.clone(), who.clone()).prop_map(|(actor, target)| Step::Decide { actor, target }),
        who.prop_map(|actor| Step::AutoJoin { actor }),
    ]
}

fn to_command(step: &Step) -> Option<(Address, Command)> {
    let command = match step {
        Step::Advance(_) => return None,
        Step::Propose {
            actor,
            target,
            kind,
            fine,
        } => {
            let address = participant(*target);
            let payload = match kind {
                0 => Payload::Invite {
                    label: format!("node-{}", target),
                    url: String::new(),
                    address,
                },
                1 => Payload::Leave { address },
                _ => Payload::Kick {
                    address,
                    fine: *fine,
                },
            };
            return Some((
                participant(*actor),
                Command::Propose {
                    message: "random".to_string(),
                    payload,
                },
            ));
        }
        Step::Vote {
            actor,
            proposal,
            support,
        } => (
            *actor,
            Command::Vote {
                proposal: *proposal,
                support: *support,
            },
        ),
        Step::Execute { actor, proposal } => (*actor, Command::Execute { proposal: *proposal }),
        Step::Cancel { actor, proposal } => (*actor, Command::Cancel { proposal: *proposal }),
        Step::Join { actor } => (*actor, Command::Join),
        Step::Leave { actor } => (
            *actor,
            Command::Leave {
                refund_to: participant(*actor),
            },
        ),
        Step::Challenge { actor, target, fee } => (
            *actor,
            Command::ChallengeMake {
                challenged: participant(*target),
                paid_fee: *fee,
            },
        ),
        Step::Decide { actor, target } => (
            *actor,
            Command::ChallengeDecide {
                challenged: participant(*target),
            },
        ),
        Step::AutoJoin { actor } => (
            *actor,
            Command::AutoJoin {
                label: format!("node-{}", actor),
                url: String::new(),
            },
        ),
    };
    Some((participant(command.0), command.1))
}

// ============================================================================
// QUORUM PROPERTY TESTS
// ============================================================================

proptest! {
    /// Property: votes_required is the exact ceiling of members × quorum
    #[test]
    fn votes_required_is_exact_ceiling(
        members in 0u64..10_000,
        quorum_wad in 1u128..=WAD,
    ) {
        let quorum = Fraction::from_wad(quorum_wad).unwrap();
        let required = votes_required(members, quorum) as u128;
        let product = members as u128 * quorum_wad;

        prop_assert!(required * WAD >= product, "Requirement must cover the quorum");
        if required > 0 {
            prop_assert!(
                (required - 1) * WAD < product,
                "Requirement must be the smallest such count"
            );
        }
        prop_assert!(required <= members as u128, "Never more votes than members");
    }

    /// Property: only fractions in (0, 0.90] are admissible quorums
    #[test]
    fn admissible_quorum_range(quorum_wad in 0u128..=WAD) {
        let quorum = Fraction::from_wad(quorum_wad).unwrap();
        let expected = quorum_wad > 0 && quorum <= MAX_QUORUM;
        prop_assert_eq!(is_admissible_quorum(quorum), expected);

        let result = settings().apply_change("members.quorum", &quorum.to_string());
        prop_assert_eq!(result.is_ok(), expected);
    }

    /// Property: fraction text roundtrip
    #[test]
    fn fraction_display_roundtrip(quorum_wad in 0u128..=WAD) {
        let quorum = Fraction::from_wad(quorum_wad).unwrap();
        let parsed: Fraction = quorum.to_string().parse().unwrap();
        prop_assert_eq!(parsed, quorum);
    }
}

// ============================================================================
// PROPOSAL PROPERTY TESTS
// ============================================================================

proptest! {
    /// Property: proposal ids increase by exactly one, failures consume no id
    #[test]
    fn proposal_ids_are_sequential(
        attempts in prop::collection::vec((0usize..5, 0u64..15), 1..40),
    ) {
        let mut engine = engine(5);
        let mut now = T0 + 1;
        let mut last_id = 0;

        for (actor, gap) in attempts {
            now += gap;
            let payload = Payload::Leave { address: participant(actor) };
            match engine.propose(participant(actor), "p", payload, now) {
                Ok(id) => {
                    prop_assert_eq!(id, last_id + 1);
                    last_id = id;
                }
                Err(GovernanceError::RateLimited { .. }) => {}
                Err(other) => prop_assert!(false, "unexpected error {:?}", other),
            }
            prop_assert_eq!(engine.proposal_count(), last_id);
        }
    }

    /// Property: random command sequences keep every governance invariant
    ///
    /// - recorded bonds always equal the vault balance
    /// - supply only shrinks by burned fines
    /// - accepted votes come from members who joined before the proposal
    /// - votes_for never exceeds the valid member count at vote time
    /// - kicked addresses never become valid again
    #[test]
    fn random_sequences_preserve_invariants(
        steps in prop::collection::vec(step_strategy(), 1..80),
    ) {
        let mut engine = engine(3);
        let initial_supply = engine.ledger().total_supply();
        let mut now = T0 + 1;

        for step in &steps {
            if let Step::Advance(secs) = step {
                now += secs;
                continue;
            }
            let Some((actor, command)) = to_command(step) else { continue };
            let valid_before = engine.member_count();
            let result = engine.apply(actor, &command, now);

            if let (Ok(_), Command::Vote { proposal, .. }) = (&result, &command) {
                let p = engine.proposal(*proposal).unwrap();
                let voter = engine.member(&actor).unwrap();
                prop_assert!(voter.joined_at < p.created_at, "Late joiner voted");
                prop_assert!(p.votes_for <= valid_before, "More for-votes than members");
                prop_assert!(p.has_voted(&actor));
            }

            prop_assert!(
                engine.check_bond_invariant().is_ok(),
                "Bond invariant broken after {:?}",
                step
            );
            prop_assert_eq!(
                engine.ledger().total_supply() + engine.ledger().burned(),
                initial_supply
            );
            for member in engine.state().members.all() {
                prop_assert!(!(member.kicked && member.is_valid), "Kicked member is valid");
            }
        }
    }

    /// Property: late joiners can never vote on earlier proposals
    #[test]
    fn late_joiner_never_votes(join_offset in 0u64..20, vote_offset in 0u64..40) {
        let mut engine = engine(3);
        let created = T0 + 5;
        let id = engine
            .propose(participant(0), "invite", Payload::Invite {
                label: "late".into(),
                url: String::new(),
                address: participant(5),
            }, created)
            .unwrap();

        // Invite participant 5 through a separate bootstrap so it can join at any time
        engine.apply(guardian(), &Command::BootstrapMember {
            label: "late".into(),
            url: String::new(),
            address: participant(5),
        }, created).unwrap();
        engine.join(participant(5), created + join_offset).unwrap();

        let result = engine.vote(participant(5), id, true, created + join_offset + vote_offset);
        prop_assert!(result.is_err());
        prop_assert_eq!(engine.proposal(id).unwrap().has_voted(&participant(5)), false);
    }
}

// ============================================================================
// BOND PROPERTY TESTS
// ============================================================================

proptest! {
    /// Property: a kick with fine f burns f, refunds bond − f, and bans the address
    #[test]
    fn kick_settlement(fine in 0..=BOND) {
        let mut engine = engine(4);
        let target = participant(3);
        let balance_before = engine.ledger().balance_of(&target);
        let supply_before = engine.ledger().total_supply();

        let id = engine
            .propose(participant(0), "kick", Payload::Kick { address: target, fine }, T0 + 1)
            .unwrap();
        let voting = T0 + 10;
        let mut state = ProposalState::Active;
        for voter in 0..3 {
            if state == ProposalState::Succeeded {
                break;
            }
            state = engine.vote(participant(voter), id, true, voting).unwrap();
        }
        prop_assert_eq!(state, ProposalState::Succeeded);

        engine.execute(participant(1), id, voting).unwrap();

        prop_assert_eq!(engine.ledger().balance_of(&target), balance_before + BOND - fine);
        prop_assert_eq!(engine.ledger().total_supply(), supply_before - fine);
        prop_assert_eq!(engine.member_count(), 3);
        prop_assert!(engine.check_bond_invariant().is_ok());

        let rejoin = engine.join(target, voting + 1);
        prop_assert_eq!(rejoin, Err(GovernanceError::PermanentlyBanned(target)));
    }
}
