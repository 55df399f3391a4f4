//! Benchmarks for the vote / quorum hot path
//!
//! Every command clones the governance state, so command cost grows with
//! membership and proposal count. These benchmarks track that growth.

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use std::hint::black_box;
use trustdao::collaborators::{InMemoryLedger, StaticAuthority};
use trustdao::governance::{
    votes_required, Address, Command, Fraction, GovernanceEngine, GovernanceSettings, Payload,
};

const T0: u64 = 1_000_000;

fn node(i: usize) -> Address {
    Address::from_label(&format!("node-{}", i))
}

/// Engine with `members` joined at T0 and one open proposal (id 1).
fn engine_with_proposal(members: usize) -> GovernanceEngine<InMemoryLedger, StaticAuthority> {
    let authority =
        StaticAuthority::new(Address::from_label("guardian")).with_nodes((0..members).map(node));
    let mut ledger = InMemoryLedger::new();
    for i in 0..members {
        ledger.mint(node(i), 10_000);
    }
    let settings = GovernanceSettings {
        bond_amount: 1_000,
        min_members: 1,
        vote_delay: 10,
        voting_duration: 1_000,
        ..GovernanceSettings::default()
    };

    let mut engine = GovernanceEngine::new(settings, ledger, authority).unwrap();
    for i in 0..members {
        let invite = Command::BootstrapMember {
            label: format!("node-{}", i),
            url: String::new(),
            address: node(i),
        };
        engine.apply(Address::from_label("guardian"), &invite, T0).unwrap();
        engine.join(node(i), T0).unwrap();
    }
    let payload = Payload::SettingChange {
        key: "members.quorum".to_string(),
        value: "0.6".to_string(),
    };
    engine.propose(node(0), "bench", payload, T0 + 1).unwrap();
    engine
}

fn benchmark_votes_required(c: &mut Criterion) {
    let quorum: Fraction = "0.51".parse().unwrap();

    c.bench_function("votes_required", |b| {
        b.iter(|| {
            for members in 0..256u64 {
                black_box(votes_required(black_box(members), quorum));
            }
        });
    });
}

fn benchmark_single_vote(c: &mut Criterion) {
    let mut group = c.benchmark_group("vote");
    for members in [5usize, 25, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(members), &members, |b, &members| {
            b.iter_batched(
                || engine_with_proposal(members),
                |mut engine| black_box(engine.vote(node(1), 1, true, T0 + 20)),
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn benchmark_proposal_state(c: &mut Criterion) {
    let engine = engine_with_proposal(50);

    c.bench_function("proposal_state", |b| {
        b.iter(|| engine.proposal_state(black_box(1), black_box(T0 + 20)));
    });
}

fn benchmark_rejected_command(c: &mut Criterion) {
    let mut engine = engine_with_proposal(50);

    // Rejections still pay for the working copy
    c.bench_function("rejected_duplicate_join", |b| {
        b.iter(|| black_box(engine.join(node(0), T0 + 20)));
    });
}

criterion_group!(
    benches,
    benchmark_votes_required,
    benchmark_single_vote,
    benchmark_proposal_state,
    benchmark_rejected_command
);
criterion_main!(benches);
