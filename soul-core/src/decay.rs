//! Conversation decay: collapsing old turns into a single wisdom record.
//!
//! Decay is triggered by length only. Once the conversation log is longer than
//! the threshold (20), a compression keeps the most recent 5 turns and appends
//! exactly one wisdom record built from a summary of the log.
//!
//! The summary normally comes from the cognitive resolver. When that call is
//! unavailable, [`digest_conversations`] produces a rule-based summary of the
//! discarded turns that works offline with zero latency.

use std::collections::HashMap;

use crate::config::MemoryConfig;
use crate::memory::records::ConversationTurn;
use crate::types::Role;

/// Words ignored when picking recurring themes.
const STOPWORDS: &[&str] = &[
    "about", "after", "again", "because", "being", "could", "every", "maybe", "never", "other",
    "really", "should", "their", "there", "these", "thing", "think", "those", "through", "what",
    "where", "which", "while", "would", "your", "yours",
];

/// Number of recurring themes named in a digest.
const DIGEST_THEMES: usize = 3;

/// Length-based compression policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionPolicy {
    /// Compress once the log is strictly longer than this.
    pub threshold: usize,
    /// Turns kept after compressing.
    pub retain: usize,
}

impl CompressionPolicy {
    /// Whether a log of `len` turns should be compressed.
    #[must_use]
    pub fn should_compress(&self, len: usize) -> bool {
        len > self.threshold
    }

    /// Index of the first turn that survives compression of a `len`-turn log.
    #[must_use]
    pub fn cut_point(&self, len: usize) -> usize {
        len.saturating_sub(self.retain)
    }
}

impl Default for CompressionPolicy {
    fn default() -> Self {
        Self {
            threshold: 20,
            retain: 5,
        }
    }
}

impl From<&MemoryConfig> for CompressionPolicy {
    fn from(config: &MemoryConfig) -> Self {
        Self {
            threshold: config.compression_threshold,
            retain: config.retain_after_compression,
        }
    }
}

/// Wrap a summary into the stored wisdom insight.
#[must_use]
pub fn wisdom_insight(summary: &str) -> String {
    format!("From my early dialogues, I distilled this: {}", summary.trim())
}

/// Rule-based summary of a run of conversation turns.
///
/// Counts who spoke, names the most recurring longer words, and quotes the
/// last user question when there is one.
#[must_use]
pub fn digest_conversations(turns: &[ConversationTurn]) -> String {
    if turns.is_empty() {
        return "Silence teaches little, yet it was all I had.".to_string();
    }

    let user_turns = turns.iter().filter(|t| t.role == Role::User).count();
    let agent_turns = turns.len() - user_turns;

    let mut counts: HashMap<String, usize> = HashMap::new();
    for turn in turns {
        for word in turn
            .content
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() > 4)
        {
            let word = word.to_lowercase();
            if !STOPWORDS.contains(&word.as_str()) {
                *counts.entry(word).or_default() += 1;
            }
        }
    }

    let mut themes: Vec<(String, usize)> = counts.into_iter().collect();
    // Most frequent first; ties broken alphabetically so the digest is stable.
    themes.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let themes: Vec<String> = themes
        .into_iter()
        .take(DIGEST_THEMES)
        .map(|(word, _)| word)
        .collect();

    let mut digest = format!(
        "{} exchanges ({user_turns} from them, {agent_turns} from me)",
        turns.len()
    );
    if themes.is_empty() {
        digest.push_str(" circled nothing in particular");
    } else {
        digest.push_str(" kept returning to ");
        digest.push_str(&themes.join(", "));
    }

    if let Some(question) = turns
        .iter()
        .rev()
        .find(|t| t.role == Role::User && t.content.contains('?'))
    {
        digest.push_str(&format!("; the last question was \"{}\"", truncate(&question.content, 80)));
    }
    digest.push('.');
    digest
}

fn truncate(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}
