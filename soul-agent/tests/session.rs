//! Session lifecycle: what one run writes, the next run remembers.

use std::sync::Arc;

use async_trait::async_trait;

use soul_agent::{AgentError, Soul, SoulState, StaticToolDirectory, TopicLookup};
use soul_core::config::{LlmConfig, MemoryConfig, PersonalityConfig};
use soul_core::persistence::JsonFileStore;
use soul_core::random::ScriptedRandom;
use soul_core::{MemoryStore, Personality};
use soul_llm::resolver::now;
use soul_llm::{CognitiveResolver, CooldownClock};

struct NoLookup;

#[async_trait]
impl TopicLookup for NoLookup {
    async fn lookup(&self, topic: &str) -> Result<String, AgentError> {
        Err(AgentError::Lookup(format!("offline, cannot read {topic}")))
    }
}

fn open_soul(path: &std::path::Path) -> Soul {
    let memory_config = MemoryConfig::default();
    let memory = MemoryStore::open(Box::new(JsonFileStore::new(path)), &memory_config);
    let personality = PersonalityConfig {
        simulate_thinking: false,
        ..PersonalityConfig::default()
    };
    let state = SoulState::new(
        Personality::new(personality, now()),
        memory,
        CooldownClock::from_config(&LlmConfig::default()),
        Box::new(ScriptedRandom::constant(0.0)),
    );
    Soul::new(
        state,
        CognitiveResolver::default(),
        Arc::new(NoLookup),
        Arc::new(StaticToolDirectory::new()),
    )
}

#[tokio::test(start_paused = true)]
async fn second_session_greets_with_the_last_thought() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("memory.json");

    let first = open_soul(&path);
    assert!(first.greeting().starts_with("I am present."));
    let thought = first.generate_thought().await;
    first.respond("do you remember me").await;
    first.shutdown().await;

    let second = open_soul(&path);
    assert_eq!(
        second.greeting(),
        format!("Welcome back. I have been dwelling on the notion that {thought}. Does it still hold weight?")
    );
    assert_eq!(second.recent_context(10).len(), 2);
    assert!(second.shared().lock().memory.log().last_session.is_some());
}

#[tokio::test(start_paused = true)]
async fn failed_lookup_still_yields_a_fact() {
    let dir = tempfile::tempdir().expect("tempdir");
    let soul = open_soul(&dir.path().join("memory.json"))
        .with_interests(vec!["Tea Ceremonies".to_string()])
        .with_thresholds(soul_agent::GuardThresholds {
            proactive: 0.0,
            dream: 0.0,
            observe: 0.0,
            ..soul_agent::GuardThresholds::default()
        });

    let outcome = soul.tick().await.expect("research");
    assert!(outcome.message.contains("Tea Ceremonies"));
    let facts = soul.summary_of_work().facts;
    assert_eq!(facts.len(), 1);
    assert!(facts[0].starts_with("Learned about Tea Ceremonies: I couldn't find much about Tea Ceremonies"));
}

#[tokio::test(start_paused = true)]
async fn config_names_the_soul_and_its_interests() {
    let mut config = soul_core::config::SoulConfig::default();
    config.general.name = "Aletheia".to_string();
    config.scheduler.interests = vec!["Tea Ceremonies".to_string()];

    let state = SoulState::from_config(&config, MemoryStore::in_memory(&config.memory));
    let soul = Soul::from_config(
        &config,
        state,
        CognitiveResolver::default(),
        Arc::new(NoLookup),
        Arc::new(StaticToolDirectory::new()),
    )
    .with_thresholds(soul_agent::GuardThresholds {
        proactive: 0.0,
        dream: 0.0,
        observe: 0.0,
        research_factor: 10.0,
        ..soul_agent::GuardThresholds::default()
    });
    assert_eq!(soul.name(), "Aletheia");
    soul.shared().lock().rng = Box::new(ScriptedRandom::constant(0.0));

    let outcome = soul.tick().await.expect("research");
    assert!(outcome.message.contains("Tea Ceremonies"));
    assert_eq!(soul.with_name("Sophia").name(), "Sophia");
}
