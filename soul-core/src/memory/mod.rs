//! Memory store: append-only logs with length-triggered decay.
//!
//! [`MemoryLog`] is the plain data: conversation turns, internal thoughts,
//! learned facts, opinions, wisdom and the last-session stamp. It serialises
//! to the snapshot layout used on disk.
//!
//! [`MemoryStore`] wraps a log with an optional [`SnapshotStore`] and writes
//! the whole snapshot through after every mutation. Save failures are logged
//! and swallowed: the in-memory log keeps working without durability.

pub mod records;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::MemoryConfig;
use crate::decay::{wisdom_insight, CompressionPolicy};
use crate::persistence::SnapshotStore;
use crate::types::Role;

pub use records::{ConversationTurn, FactRecord, Opinion, ThoughtRecord, WisdomRecord};

/// Everything the soul remembers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryLog {
    /// Conversation turns, oldest first.
    #[serde(default)]
    pub conversations: Vec<ConversationTurn>,
    /// Facts learned through research.
    #[serde(default)]
    pub learned_facts: Vec<FactRecord>,
    /// Private thoughts.
    #[serde(default)]
    pub internal_thoughts: Vec<ThoughtRecord>,
    /// Topic → sentiment.
    #[serde(default)]
    pub opinions: BTreeMap<String, Opinion>,
    /// Compressed insights.
    #[serde(default)]
    pub wisdom: Vec<WisdomRecord>,
    /// When the log was last written.
    #[serde(default, deserialize_with = "records::timestamp::deserialize_option")]
    pub last_session: Option<DateTime<Utc>>,
}

impl MemoryLog {
    /// Append a conversation turn.
    pub fn push_conversation(&mut self, role: Role, content: impl Into<String>) {
        self.conversations.push(ConversationTurn::now(role, content));
    }

    /// Append an internal thought.
    pub fn push_thought(&mut self, thought: impl Into<String>) {
        self.internal_thoughts.push(ThoughtRecord {
            timestamp: Utc::now(),
            thought: thought.into(),
        });
    }

    /// Append a learned fact.
    pub fn push_fact(&mut self, fact: impl Into<String>) {
        self.learned_facts.push(FactRecord {
            timestamp: Some(Utc::now()),
            fact: fact.into(),
        });
    }

    /// Append a wisdom record.
    pub fn push_wisdom(&mut self, insight: impl Into<String>) {
        self.wisdom.push(WisdomRecord {
            timestamp: Utc::now(),
            insight: insight.into(),
        });
    }

    /// Write (or overwrite) the sentiment about a topic.
    pub fn set_opinion(&mut self, topic: impl Into<String>, sentiment: impl Into<String>) {
        self.opinions.insert(
            topic.into(),
            Opinion {
                updated_at: Utc::now(),
                sentiment: sentiment.into(),
            },
        );
    }

    /// Apply `policy`: if the conversation log is over the threshold, append
    /// one wisdom record from `summary` and keep only the most recent turns.
    ///
    /// Returns `true` if a compression happened.
    pub fn compress(&mut self, summary: &str, policy: CompressionPolicy) -> bool {
        let len = self.conversations.len();
        if !policy.should_compress(len) {
            return false;
        }
        self.push_wisdom(wisdom_insight(summary));
        self.conversations.drain(..policy.cut_point(len));
        true
    }

    /// The turns a compression under `policy` would discard.
    #[must_use]
    pub fn compressible_turns(&self, policy: CompressionPolicy) -> &[ConversationTurn] {
        let len = self.conversations.len();
        if policy.should_compress(len) {
            &self.conversations[..policy.cut_point(len)]
        } else {
            &[]
        }
    }
}

/// Most recent `n` items of a slice, oldest first.
fn tail<T>(items: &[T], n: usize) -> &[T] {
    &items[items.len().saturating_sub(n)..]
}

/// What happened since the user last looked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkSummary {
    /// Up to five most recent thoughts.
    pub thoughts: Vec<String>,
    /// Up to three most recent facts.
    pub facts: Vec<String>,
}

/// The memory log plus write-through persistence.
pub struct MemoryStore {
    log: MemoryLog,
    store: Option<Box<dyn SnapshotStore>>,
    policy: CompressionPolicy,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("conversations", &self.log.conversations.len())
            .field("thoughts", &self.log.internal_thoughts.len())
            .field("facts", &self.log.learned_facts.len())
            .field("wisdom", &self.log.wisdom.len())
            .field("store", &self.store.as_ref().map(|s| s.location()))
            .finish()
    }
}

impl MemoryStore {
    /// Memory with no persistence at all.
    #[must_use]
    pub fn in_memory(config: &MemoryConfig) -> Self {
        Self {
            log: MemoryLog::default(),
            store: None,
            policy: CompressionPolicy::from(config),
        }
    }

    /// Load from `store`, falling back to an empty log when the snapshot is
    /// absent or unreadable. An unreadable snapshot is quarantined first so
    /// the write-through cannot clobber it. Every later mutation is written
    /// back to `store`.
    #[must_use]
    pub fn open(store: Box<dyn SnapshotStore>, config: &MemoryConfig) -> Self {
        let log = match store.load() {
            Ok(Some(log)) => {
                info!(
                    location = %store.location(),
                    conversations = log.conversations.len(),
                    thoughts = log.internal_thoughts.len(),
                    wisdom = log.wisdom.len(),
                    "Memory restored"
                );
                log
            }
            Ok(None) => {
                info!(location = %store.location(), "No memory snapshot, starting fresh");
                MemoryLog::default()
            }
            Err(e) => {
                warn!(location = %store.location(), error = %e, "Unreadable memory snapshot, starting fresh");
                match store.quarantine() {
                    Ok(Some(moved)) => warn!(moved_to = %moved, "Unreadable snapshot set aside"),
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, "Unreadable snapshot could not be set aside"),
                }
                MemoryLog::default()
            }
        };
        Self {
            log,
            store: Some(store),
            policy: CompressionPolicy::from(config),
        }
    }

    /// Read-only view of the log.
    #[must_use]
    pub fn log(&self) -> &MemoryLog {
        &self.log
    }

    /// The active compression policy.
    #[must_use]
    pub fn policy(&self) -> CompressionPolicy {
        self.policy
    }

    /// Append a conversation turn.
    pub fn add_conversation(&mut self, role: Role, content: impl Into<String>) {
        self.log.push_conversation(role, content);
        self.persist();
    }

    /// Append an internal thought.
    pub fn add_thought(&mut self, thought: impl Into<String>) {
        self.log.push_thought(thought);
        self.persist();
    }

    /// Append a learned fact.
    pub fn add_fact(&mut self, fact: impl Into<String>) {
        self.log.push_fact(fact);
        self.persist();
    }

    /// Write the sentiment about a topic.
    pub fn update_opinion(&mut self, topic: impl Into<String>, sentiment: impl Into<String>) {
        self.log.set_opinion(topic, sentiment);
        self.persist();
    }

    /// Whether the conversation log is over the compression threshold.
    #[must_use]
    pub fn needs_compression(&self) -> bool {
        self.policy.should_compress(self.log.conversations.len())
    }

    /// Turns the next compression would discard.
    #[must_use]
    pub fn compressible_turns(&self) -> &[ConversationTurn] {
        self.log.compressible_turns(self.policy)
    }

    /// Compress with `summary` when over the threshold; no-op otherwise.
    pub fn compress(&mut self, summary: &str) -> bool {
        let before = self.log.conversations.len();
        let compressed = self.log.compress(summary, self.policy);
        if compressed {
            debug!(
                before,
                after = self.log.conversations.len(),
                wisdom = self.log.wisdom.len(),
                "Conversation log compressed"
            );
            self.persist();
        }
        compressed
    }

    /// Most recent `n` conversation turns, oldest first.
    #[must_use]
    pub fn recent_conversations(&self, n: usize) -> &[ConversationTurn] {
        tail(&self.log.conversations, n)
    }

    /// Most recent `n` thoughts, oldest first.
    #[must_use]
    pub fn recent_thoughts(&self, n: usize) -> &[ThoughtRecord] {
        tail(&self.log.internal_thoughts, n)
    }

    /// Most recent `n` facts, oldest first.
    #[must_use]
    pub fn recent_facts(&self, n: usize) -> &[FactRecord] {
        tail(&self.log.learned_facts, n)
    }

    /// Last five thoughts and last three facts.
    #[must_use]
    pub fn summary_of_work(&self) -> WorkSummary {
        WorkSummary {
            thoughts: self
                .recent_thoughts(5)
                .iter()
                .map(|t| t.thought.clone())
                .collect(),
            facts: self.recent_facts(3).iter().map(|f| f.fact.clone()).collect(),
        }
    }

    /// Stamp `last_session` and write the snapshot. Failures are logged only.
    pub fn persist(&mut self) {
        self.log.last_session = Some(Utc::now());
        if let Some(store) = &self.store {
            if let Err(e) = store.save(&self.log) {
                warn!(location = %store.location(), error = %e, "Memory snapshot not saved");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, SoulError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingStore {
        saves: Arc<AtomicUsize>,
        quarantined: Arc<AtomicUsize>,
        fail: bool,
    }

    impl SnapshotStore for CountingStore {
        fn load(&self) -> Result<Option<MemoryLog>> {
            if self.fail {
                Err(SoulError::Persistence("corrupt".into()))
            } else {
                Ok(None)
            }
        }

        fn save(&self, _log: &MemoryLog) -> Result<()> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(SoulError::Persistence("disk full".into()))
            } else {
                Ok(())
            }
        }

        fn location(&self) -> String {
            "counting".into()
        }

        fn quarantine(&self) -> Result<Option<String>> {
            self.quarantined.fetch_add(1, Ordering::SeqCst);
            Ok(Some("counting.corrupt".into()))
        }
    }

    fn filled(n: usize) -> MemoryStore {
        let mut store = MemoryStore::in_memory(&MemoryConfig::default());
        for i in 0..n {
            store.add_conversation(Role::User, format!("turn {i}"));
        }
        store
    }

    #[test]
    fn every_mutation_is_written_through() {
        let saves = Arc::new(AtomicUsize::new(0));
        let quarantined = Arc::new(AtomicUsize::new(0));
        let backend = CountingStore {
            saves: Arc::clone(&saves),
            quarantined: Arc::clone(&quarantined),
            fail: false,
        };
        let mut store = MemoryStore::open(Box::new(backend), &MemoryConfig::default());
        assert_eq!(quarantined.load(Ordering::SeqCst), 0);
        store.add_conversation(Role::User, "hi");
        store.add_thought("hmm");
        store.add_fact("water is wet");
        store.update_opinion("rain", "melancholic");
        assert_eq!(saves.load(Ordering::SeqCst), 4);
        assert!(store.log().last_session.is_some());
    }

    #[test]
    fn failing_backend_is_not_fatal() {
        let saves = Arc::new(AtomicUsize::new(0));
        let quarantined = Arc::new(AtomicUsize::new(0));
        let backend = CountingStore {
            saves: Arc::clone(&saves),
            quarantined: Arc::clone(&quarantined),
            fail: true,
        };
        let mut store = MemoryStore::open(Box::new(backend), &MemoryConfig::default());
        assert_eq!(quarantined.load(Ordering::SeqCst), 1);
        assert_eq!(saves.load(Ordering::SeqCst), 0);
        store.add_thought("still here");
        assert_eq!(store.log().internal_thoughts.len(), 1);
        assert_eq!(saves.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn compress_at_threshold_is_noop() {
        let mut store = filled(20);
        assert!(!store.needs_compression());
        assert!(!store.compress("X"));
        assert_eq!(store.log().conversations.len(), 20);
        assert!(store.log().wisdom.is_empty());
    }

    #[test]
    fn compress_keeps_most_recent_five() {
        let mut store = filled(21);
        assert_eq!(store.compressible_turns().len(), 16);
        assert!(store.compress("X"));
        let log = store.log();
        assert_eq!(log.conversations.len(), 5);
        assert_eq!(log.conversations[0].content, "turn 16");
        assert_eq!(log.conversations[4].content, "turn 20");
        assert_eq!(log.wisdom.len(), 1);
        assert!(log.wisdom[0].insight.contains('X'));
    }

    #[test]
    fn recent_returns_bounded_suffix() {
        let store = filled(3);
        assert_eq!(store.recent_conversations(10).len(), 3);
        let last = store.recent_conversations(2);
        assert_eq!(last[0].content, "turn 1");
        assert_eq!(last[1].content, "turn 2");
        assert!(store.recent_conversations(0).is_empty());
    }

    #[test]
    fn summary_of_work_limits() {
        let mut store = MemoryStore::in_memory(&MemoryConfig::default());
        for i in 0..8 {
            store.add_thought(format!("thought {i}"));
            store.add_fact(format!("fact {i}"));
        }
        let summary = store.summary_of_work();
        assert_eq!(summary.thoughts.len(), 5);
        assert_eq!(summary.thoughts[0], "thought 3");
        assert_eq!(summary.facts, vec!["fact 5", "fact 6", "fact 7"]);
    }

    #[test]
    fn opinions_overwrite() {
        let mut store = MemoryStore::in_memory(&MemoryConfig::default());
        store.update_opinion("tea", "warm");
        store.update_opinion("tea", "bitter");
        assert_eq!(store.log().opinions.len(), 1);
        assert_eq!(store.log().opinions["tea"].sentiment, "bitter");
    }
}
