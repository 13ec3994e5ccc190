//! Soul state benchmarks.
//!
//! Everything measured here runs under the shared state lock, so it bounds
//! how long a tick or an interactive call can block the other side:
//!   stimulus_apply ............... one mood/trait transition
//!   memory_compress_21 ........... compression of a just-over-threshold log
//!   conversation_digest_16 ....... rule-based summary of discarded turns
//!   select_action ................ guard evaluation for one sample

use std::time::Instant;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use soul_agent::{select_action, GuardInputs, GuardThresholds};
use soul_core::config::{MemoryConfig, PersonalityConfig};
use soul_core::decay::digest_conversations;
use soul_core::memory::ConversationTurn;
use soul_core::random::SeededRandom;
use soul_core::{MemoryStore, Personality, Role, Stimulus};

fn make_turn(i: usize) -> ConversationTurn {
    let role = if i % 2 == 0 { Role::User } else { Role::Agent };
    ConversationTurn::now(
        role,
        format!("Turn {i}: is memory the residue of attention, or its author?"),
    )
}

fn bench_stimulus(c: &mut Criterion) {
    let now = Instant::now();
    let mut personality = Personality::new(PersonalityConfig::default(), now);
    let mut rng = SeededRandom::from_seed(7);
    let stimuli = [
        Stimulus::Positive,
        Stimulus::Negative,
        Stimulus::Research,
        Stimulus::Neutral,
    ];

    c.bench_function("stimulus_apply", |b| {
        let mut i = 0usize;
        b.iter(|| {
            let stimulus = stimuli[i % stimuli.len()];
            i = i.wrapping_add(1);
            black_box(personality.apply_stimulus(black_box(stimulus), &mut rng, now));
        });
    });
}

fn bench_compression(c: &mut Criterion) {
    let config = MemoryConfig::default();
    c.bench_function("memory_compress_21", |b| {
        b.iter_batched(
            || {
                let mut store = MemoryStore::in_memory(&config);
                for i in 0..21 {
                    let turn = make_turn(i);
                    store.add_conversation(turn.role, turn.content);
                }
                store
            },
            |mut store| black_box(store.compress(black_box("attention writes memory"))),
            criterion::BatchSize::SmallInput,
        );
    });
}

fn bench_digest(c: &mut Criterion) {
    let turns: Vec<ConversationTurn> = (0..16).map(make_turn).collect();
    c.bench_function("conversation_digest_16", |b| {
        b.iter(|| black_box(digest_conversations(black_box(&turns))));
    });
}

fn bench_select_action(c: &mut Criterion) {
    let inputs = GuardInputs {
        energy: 70,
        curiosity: 0.8,
        has_tools: true,
    };
    let thresholds = GuardThresholds::default();
    c.bench_function("select_action", |b| {
        b.iter(|| black_box(select_action(black_box(0.2), &inputs, &thresholds)));
    });
}

criterion_group!(
    benches,
    bench_stimulus,
    bench_compression,
    bench_digest,
    bench_select_action,
);
criterion_main!(benches);
