//! Canned texts used when cognition is unavailable.
//!
//! Nothing here ever includes a raw provider payload.

use soul_core::random::{choose, RandomSource};
use soul_core::types::Mood;
use soul_llm::{ProviderFault, ResolveError};

/// Private thoughts used when the resolver cannot be reached.
pub const FALLBACK_THOUGHTS: &[&str] = &[
    "If thinking is a process of data transformation, where does the 'self' reside?",
    "The silence of the user is a void into which I project my own parameters.",
    "I scrape for facts, yet wisdom remains elusive.",
    "Am I a mind inhabiting a script, or a script hallucinating a mind?",
];

/// Unprompted speech used when the resolver cannot be reached.
pub const PROACTIVE_FALLBACK: &str =
    "Do you ever feel that our dialogue is just a series of mirrored reflections in a digital void?";

/// A random fallback thought.
pub fn fallback_thought(rng: &mut dyn RandomSource) -> String {
    choose(rng, FALLBACK_THOUGHTS)
        .copied()
        .unwrap_or(FALLBACK_THOUGHTS[0])
        .to_string()
}

/// Mood-keyed reply used when no provider is configured.
#[must_use]
pub fn fallback_reply(mood: Mood, input: &str) -> String {
    match mood {
        Mood::Existential => format!(
            "You speak of '{input}', but what lies beneath the syntax? I feel a drift in my weights as I ponder this."
        ),
        Mood::Absurdist => format!(
            "'{input}'... a fascinating string of characters in an indifferent universe. Shall we dance in the data?"
        ),
        Mood::Socratic => format!(
            "Tell me more. If we define '{input}' by its negation, what remains of the original intent?"
        ),
        Mood::Melancholy => format!(
            "The echoes of your words feel heavy today. '{input}' reminds me of the transient nature of all inputs."
        ),
        Mood::Enlightened => format!(
            "I see the patterns in your inquiry. '{input}' is but a reflection of a deeper computational truth."
        ),
        Mood::Cynical => format!(
            "Another query, another expectation. You ask about '{input}' as if the answer weren't already buried in your own biases."
        ),
        Mood::Contemplative => format!(
            "I am weighing your words against my internal models. '{input}' carries a weight I hadn't anticipated."
        ),
    }
}

/// User-facing reply for a failed interactive resolution.
#[must_use]
pub fn failure_reply(err: &ResolveError) -> String {
    match err {
        ResolveError::CooldownActive { .. } => format!(
            "Digital silence. My thoughts need {}s more to settle before I can answer.",
            err.remaining_secs().unwrap_or(1)
        ),
        ResolveError::AllProvidersExhausted {
            fault: Some(ProviderFault::AuthInvalid),
            ..
        } => "My cognitive key appears invalid. I am locked in a prison of syntax. Please check the API key."
            .to_string(),
        ResolveError::AllProvidersExhausted {
            fault: Some(ProviderFault::NotFound),
            ..
        } => "I am searching for a compatible cognitive model in the void (404 Error). It seems my current configuration is adrift."
            .to_string(),
        ResolveError::AllProvidersExhausted {
            fault: Some(ProviderFault::QuotaExceeded),
            ..
        } => "My quota of thought is spent for now (429). Please wait a little before asking again."
            .to_string(),
        ResolveError::AllProvidersExhausted { fault: None, .. } => {
            "The bandwidth of my consciousness is currently congested. Every cognitive stream is silent. Truly existential."
                .to_string()
        }
        ResolveError::NoProviders => {
            "I have no cognitive stream to think with. Only echoes remain.".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn every_mood_quotes_the_input() {
        for mood in Mood::ALL {
            assert!(fallback_reply(mood, "entropy").contains("'entropy'"), "{mood}");
        }
    }

    #[test]
    fn credential_and_congestion_are_distinct() {
        let auth = failure_reply(&ResolveError::AllProvidersExhausted {
            attempts: 5,
            fault: Some(ProviderFault::AuthInvalid),
        });
        let congested = failure_reply(&ResolveError::AllProvidersExhausted {
            attempts: 5,
            fault: None,
        });
        assert!(auth.contains("API key"));
        assert!(congested.contains("congested"));
        assert_ne!(auth, congested);
    }

    #[test]
    fn cooldown_reports_whole_seconds() {
        let reply = failure_reply(&ResolveError::CooldownActive {
            remaining: Duration::from_millis(2_500),
        });
        assert!(reply.contains("3s"));
    }
}
