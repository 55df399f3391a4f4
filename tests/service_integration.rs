//! Integration tests for the governance worker.
//!
//! Commands from many tasks are serialised through one worker, each stamped
//! with the clock reading taken when the worker picks it up.

use trustdao::collaborators::{InMemoryLedger, ManualClock, StaticAuthority};
use trustdao::governance::{
    Address, Command, CommandOutcome, GovernanceEngine, GovernanceError, GovernanceSettings,
    Payload, ProposalState,
};
use trustdao::service::{self, ServiceError};

const BOND: u128 = 500;

fn addr(label: &str) -> Address {
    Address::from_label(label)
}

fn engine(labels: &[&str]) -> GovernanceEngine<InMemoryLedger, StaticAuthority> {
    let authority =
        StaticAuthority::new(addr("guardian")).with_nodes(labels.iter().map(|l| addr(l)));
    let mut ledger = InMemoryLedger::new();
    for label in labels {
        ledger.mint(addr(label), 4 * BOND);
    }
    let settings = GovernanceSettings {
        bond_amount: BOND,
        min_members: 3,
        vote_delay: 10,
        voting_duration: 100,
        ..GovernanceSettings::default()
    };
    GovernanceEngine::new(settings, ledger, authority).unwrap()
}

#[tokio::test]
async fn test_concurrent_joins_are_serialised() {
    let labels = ["n0", "n1", "n2", "n3", "n4", "n5"];
    let clock = ManualClock::new(1_000);
    let (handle, worker) = service::spawn(engine(&labels), clock.clone(), 4);

    for label in labels {
        let invite = Command::BootstrapMember {
            label: label.to_string(),
            url: String::new(),
            address: addr(label),
        };
        handle.apply(addr("guardian"), invite).await.unwrap();
    }

    // Every node joins twice from its own task; exactly one join each succeeds
    let mut tasks = Vec::new();
    for label in labels {
        for _ in 0..2 {
            let handle = handle.clone();
            tasks.push(tokio::spawn(async move {
                handle.apply(addr(label), Command::Join).await
            }));
        }
    }

    let mut joined = 0;
    let mut duplicates = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(CommandOutcome::Joined) => joined += 1,
            Err(ServiceError::Governance(GovernanceError::Duplicate(_))) => duplicates += 1,
            other => panic!("unexpected result {:?}", other),
        }
    }
    assert_eq!(joined, labels.len());
    assert_eq!(duplicates, labels.len());
    assert_eq!(handle.check_bond_invariant().await.unwrap(), Ok(()));

    drop(handle);
    let engine = worker.await.unwrap();
    assert_eq!(engine.member_count(), 6);
    assert_eq!(engine.bond_vault_total(), 6 * BOND);
}

#[tokio::test]
async fn test_worker_reads_clock_per_command() {
    let labels = ["a", "b", "c"];
    let clock = ManualClock::new(5_000);
    let (handle, _worker) = service::spawn(engine(&labels), clock.clone(), 8);

    for label in labels {
        let invite = Command::BootstrapMember {
            label: label.to_string(),
            url: String::new(),
            address: addr(label),
        };
        handle.apply(addr("guardian"), invite).await.unwrap();
        handle.apply(addr(label), Command::Join).await.unwrap();
    }

    clock.advance(1);
    let propose = Command::Propose {
        message: "a leaves".to_string(),
        payload: Payload::Leave { address: addr("a") },
    };
    let outcome = handle.apply(addr("b"), propose).await.unwrap();
    let CommandOutcome::Proposed { proposal } = outcome else {
        panic!("expected a proposal, got {:?}", outcome);
    };

    assert_eq!(handle.proposal_state(proposal).await.unwrap(), ProposalState::Pending);
    clock.advance(10);
    assert_eq!(handle.proposal_state(proposal).await.unwrap(), ProposalState::Active);
    clock.advance(100);
    assert_eq!(handle.proposal_state(proposal).await.unwrap(), ProposalState::Defeated);

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.proposals.get(proposal).unwrap().created_at, 5_001);
}

#[tokio::test]
async fn test_stopped_worker_reports_stopped() {
    let (handle, worker) = service::spawn(engine(&["a"]), ManualClock::new(0), 1);
    worker.abort();
    let _ = worker.await;

    let result = handle.apply(addr("a"), Command::Join).await;
    assert_eq!(result, Err(ServiceError::Stopped));
}
