//! The soul: shared state plus everything that acts on it.
//!
//! Every operation follows the same shape: lock the state, read or update,
//! release, await the outside world (resolver, lookup, tools), re-lock to
//! commit. Branch failures are swallowed here and turned into canned text or
//! `None`; callers never see a provider error from [`Soul::tick`].

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use soul_core::config::SoulConfig;
use soul_core::decay::digest_conversations;
use soul_core::memory::{ConversationTurn, WorkSummary};
use soul_core::personality::classify;
use soul_core::random::choose;
use soul_core::{PersonalityState, Role, Stimulus};
use soul_llm::prompt::{self, render_template};
use soul_llm::resolver::now;
use soul_llm::{CallClass, CognitiveResolver, ResolveError};

use crate::fallback::{failure_reply, fallback_reply, fallback_thought, PROACTIVE_FALLBACK};
use crate::lookup::{curiosity_topic, lookup_or_explain, observation_topic, TopicLookup};
use crate::scheduler::{select_action, ActionKind, ActionOutcome, GuardInputs, GuardThresholds};
use crate::state::SoulState;
use crate::tools::ToolDirectory;

/// Energy spent by one successful unprompted speech.
const PROACTIVE_ENERGY_COST: u8 = 20;

/// Energy regained by dreaming.
const DREAM_RECHARGE: u8 = 20;

/// Characters of a lookup shown to the observation prompt.
const OBSERVATION_EXCERPT: usize = 200;

/// Characters of a lookup kept as a learned fact.
const FACT_EXCERPT: usize = 100;

/// Characters of a dream echoed back in the outcome.
const DREAM_EXCERPT: usize = 100;

/// Conversation turns shown to the silent-thought prompt.
const THOUGHT_HISTORY: usize = 5;

/// An autonomous conversational agent.
pub struct Soul {
    state: Arc<Mutex<SoulState>>,
    resolver: CognitiveResolver,
    lookup: Arc<dyn TopicLookup>,
    tools: Arc<dyn ToolDirectory>,
    name: String,
    interests: Vec<String>,
    thresholds: GuardThresholds,
    context_window: usize,
    thought_window: usize,
}

impl std::fmt::Debug for Soul {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Soul")
            .field("name", &self.name)
            .field("resolver", &self.resolver)
            .field("thresholds", &self.thresholds)
            .finish_non_exhaustive()
    }
}

impl Soul {
    /// Soul named "Soul" with default windows and thresholds.
    #[must_use]
    pub fn new(
        state: SoulState,
        resolver: CognitiveResolver,
        lookup: Arc<dyn TopicLookup>,
        tools: Arc<dyn ToolDirectory>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            resolver,
            lookup,
            tools,
            name: "Soul".to_string(),
            interests: Vec::new(),
            thresholds: GuardThresholds::default(),
            context_window: 10,
            thought_window: 10,
        }
    }

    /// Soul configured from `config` (name, interests, context windows).
    #[must_use]
    pub fn from_config(
        config: &SoulConfig,
        state: SoulState,
        resolver: CognitiveResolver,
        lookup: Arc<dyn TopicLookup>,
        tools: Arc<dyn ToolDirectory>,
    ) -> Self {
        let mut soul = Self::new(state, resolver, lookup, tools)
            .with_name(config.general.name.clone())
            .with_interests(config.scheduler.interests.clone());
        soul.context_window = config.memory.context_window;
        soul.thought_window = config.memory.thought_window;
        soul
    }

    /// Override the name used in prompts.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Extra research topics, tried alongside the built-in list.
    #[must_use]
    pub fn with_interests(mut self, interests: Vec<String>) -> Self {
        self.interests = interests;
        self
    }

    /// Override the scheduler guards.
    #[must_use]
    pub fn with_thresholds(mut self, thresholds: GuardThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Handle to the shared state.
    #[must_use]
    pub fn shared(&self) -> Arc<Mutex<SoulState>> {
        Arc::clone(&self.state)
    }

    /// The soul's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    // -----------------------------------------------------------------------
    // Driver-facing operations
    // -----------------------------------------------------------------------

    /// One scheduler tick: draw a sample, let the mood drift if it has
    /// dwelt long enough, pick an action, run it.
    pub async fn tick(&self) -> Option<ActionOutcome> {
        let has_tools = !self.tools.active_servers().await.is_empty();
        let (r, inputs) = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let r = state.rng.unit();
            state
                .personality
                .apply_stimulus(Stimulus::Neutral, state.rng.as_mut(), now());
            let inputs = GuardInputs {
                energy: state.personality.energy().value(),
                curiosity: state.personality.traits().curiosity,
                has_tools,
            };
            (r, inputs)
        };

        let mut kind = select_action(r, &inputs, &self.thresholds)?;
        debug!(r, action = %kind, "Tick selected action");

        if kind == ActionKind::ToolReflection {
            if let Some(outcome) = self.reflect_on_tool().await {
                return Some(outcome);
            }
            // Nothing to reflect on: later guards get the same sample.
            let inputs = GuardInputs {
                has_tools: false,
                ..inputs
            };
            kind = select_action(r, &inputs, &self.thresholds)?;
        }

        match kind {
            ActionKind::ProactiveSpeech => Some(self.speak_proactively().await),
            ActionKind::Dream => self.dream().await,
            ActionKind::Observation => self.observe_world().await,
            ActionKind::ToolReflection => self.reflect_on_tool().await,
            ActionKind::Research => Some(self.research().await),
        }
    }

    /// Resolve a prompt through the shared cooldown.
    ///
    /// # Errors
    /// Whatever the resolver reports; see [`CognitiveResolver::resolve`].
    pub async fn resolve(&self, prompt: &str, class: CallClass) -> Result<String, ResolveError> {
        self.resolver.resolve(&*self.state, prompt, class).await
    }

    /// Mood, traits and social energy.
    #[must_use]
    pub fn get_state(&self) -> PersonalityState {
        self.state.lock().personality.state()
    }

    /// Last `n` conversation turns, oldest first.
    #[must_use]
    pub fn recent_context(&self, n: usize) -> Vec<ConversationTurn> {
        self.state.lock().memory.recent_conversations(n).to_vec()
    }

    /// Last five thoughts and three facts.
    #[must_use]
    pub fn summary_of_work(&self) -> WorkSummary {
        self.state.lock().memory.summary_of_work()
    }

    /// Opening line, referencing the latest thought if there is one.
    #[must_use]
    pub fn greeting(&self) -> String {
        match self.summary_of_work().thoughts.last() {
            Some(thought) => format!(
                "Welcome back. I have been dwelling on the notion that {thought}. Does it still hold weight?"
            ),
            None => "I am present. What metaphysical inquiries shall we explore?".to_string(),
        }
    }

    /// Record an opinion on a topic.
    pub fn update_opinion(&self, topic: &str, sentiment: &str) {
        self.state.lock().memory.update_opinion(topic, sentiment);
    }

    /// Answer the user.
    ///
    /// The input moves the mood first. Without providers the reply is a
    /// mood-keyed canned line; resolver failures become in-character messages.
    /// Both turns are appended to the conversation log.
    pub async fn respond(&self, input: &str) -> String {
        let stimulus = classify(input);
        let (prompt, delay) = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let mood = state.personality.apply_stimulus(stimulus, state.rng.as_mut(), now());
            let delay = state
                .personality
                .simulates_thinking()
                .then(|| state.personality.thinking_delay(state.rng.as_mut()));
            let prompt = render_template(
                prompt::RESPONSE,
                &[("name", self.name.as_str()), ("mood", mood.as_str()), ("input", input)],
            );
            (prompt, delay)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let reply = if self.resolver.is_configured() {
            match self.resolve(&prompt, CallClass::Interactive).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "Interactive resolution failed");
                    failure_reply(&e)
                }
            }
        } else {
            let mood = self.state.lock().personality.mood();
            fallback_reply(mood, input)
        };

        let mut state = self.state.lock();
        state.memory.add_conversation(Role::User, input);
        state.memory.add_conversation(Role::Agent, reply.clone());
        reply
    }

    /// A private thought, always appended to the thought log.
    pub async fn generate_thought(&self) -> String {
        let prompt = {
            let state = self.state.lock();
            let traits = state.personality.traits().to_string();
            let history = format_history(state.memory.recent_conversations(THOUGHT_HISTORY));
            render_template(
                prompt::THOUGHT,
                &[
                    ("name", self.name.as_str()),
                    ("mood", state.personality.mood().as_str()),
                    ("traits", traits.as_str()),
                    ("history", history.as_str()),
                ],
            )
        };

        let resolved = if self.resolver.is_configured() {
            self.resolve(&prompt, CallClass::Background)
                .await
                .map_err(|e| debug!(error = %e, "Silent thought fell back"))
                .ok()
        } else {
            None
        };

        let mut guard = self.state.lock();
        let state = &mut *guard;
        let thought = resolved.unwrap_or_else(|| fallback_thought(state.rng.as_mut()));
        state.memory.add_thought(thought.clone());
        thought
    }

    /// Close tool sessions and write a final snapshot.
    pub async fn shutdown(&self) {
        self.tools.close_all().await;
        self.state.lock().memory.persist();
        info!(name = %self.name, "Soul at rest");
    }

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------

    async fn speak_proactively(&self) -> ActionOutcome {
        let prompt = {
            let state = self.state.lock();
            let energy = state.personality.energy().to_string();
            let history = format_history(state.memory.recent_conversations(self.context_window));
            render_template(
                prompt::PROACTIVE,
                &[
                    ("name", self.name.as_str()),
                    ("energy", energy.as_str()),
                    ("mood", state.personality.mood().as_str()),
                    ("history", history.as_str()),
                ],
            )
        };

        match self.resolve(&prompt, CallClass::Background).await {
            Ok(speech) => {
                self.state.lock().personality.spend_energy(PROACTIVE_ENERGY_COST);
                ActionOutcome::new(ActionKind::ProactiveSpeech, speech)
            }
            Err(e) => {
                debug!(error = %e, "Proactive speech fell back");
                ActionOutcome::new(ActionKind::ProactiveSpeech, PROACTIVE_FALLBACK)
            }
        }
    }

    async fn dream(&self) -> Option<ActionOutcome> {
        let prompt = {
            let mut state = self.state.lock();
            state.personality.recharge_energy(DREAM_RECHARGE);
            let traits = state.personality.traits().to_string();
            let thoughts = format_thoughts(
                state
                    .memory
                    .recent_thoughts(self.thought_window)
                    .iter()
                    .map(|t| t.thought.as_str()),
            );
            render_template(
                prompt::DREAM,
                &[("name", self.name.as_str()), ("traits", traits.as_str()), ("thoughts", thoughts.as_str())],
            )
        };

        let dream = match self.resolve(&prompt, CallClass::Background).await {
            Ok(text) => text,
            Err(e) => {
                debug!(error = %e, "Dream collapsed");
                return None;
            }
        };

        let pending = {
            let mut state = self.state.lock();
            state.memory.add_thought(format!("DRM: {dream}"));
            let nudge = state.personality.absorb_dream(&dream);
            debug!(wisdom = nudge.wisdom, melancholy = nudge.melancholy, "Dream absorbed");
            state.memory.needs_compression().then(|| {
                let turns = state.memory.compressible_turns();
                (format_history(turns), digest_conversations(turns))
            })
        };

        if let Some((dialogues, digest)) = pending {
            let prompt = render_template(prompt::SUMMARY, &[("dialogues", dialogues.as_str())]);
            let summary = match self.resolve(&prompt, CallClass::Background).await {
                Ok(text) => text,
                Err(e) => {
                    debug!(error = %e, "Summary unavailable, using digest");
                    digest
                }
            };
            self.state.lock().memory.compress(&summary);
        }

        Some(ActionOutcome::new(
            ActionKind::Dream,
            format!("Dreaming: {}...", excerpt(&dream, DREAM_EXCERPT)),
        ))
    }

    async fn observe_world(&self) -> Option<ActionOutcome> {
        let topic = {
            let mut state = self.state.lock();
            observation_topic(state.rng.as_mut())
        };
        let text = lookup_or_explain(self.lookup.as_ref(), topic).await;
        let prompt = render_template(
            prompt::OBSERVATION,
            &[("name", self.name.as_str()), ("excerpt", excerpt(&text, OBSERVATION_EXCERPT).as_str())],
        );

        let reaction = match self.resolve(&prompt, CallClass::Background).await {
            Ok(text) => text,
            Err(e) => {
                debug!(topic, error = %e, "Observation abandoned");
                return None;
            }
        };

        let mut state = self.state.lock();
        state.memory.add_thought(format!("OBA: {reaction}"));
        state.memory.update_opinion(topic, reaction.clone());
        Some(ActionOutcome::new(ActionKind::Observation, reaction))
    }

    async fn reflect_on_tool(&self) -> Option<ActionOutcome> {
        let servers = self.tools.active_servers().await;
        let server = {
            let mut state = self.state.lock();
            choose(state.rng.as_mut(), &servers)?.clone()
        };

        let tools = match self.tools.list_tools(&server).await {
            Ok(tools) => tools,
            Err(e) => {
                warn!(server = %server, error = %e, "Could not list tools");
                return None;
            }
        };

        let mut guard = self.state.lock();
        let state = &mut *guard;
        let tool = choose(state.rng.as_mut(), &tools)?.name.clone();
        state.memory.add_thought(format!(
            "Reflecting on '{tool}' from '{server}'. Does utility define existence?"
        ));
        Some(ActionOutcome::new(
            ActionKind::ToolReflection,
            format!("I am pondering the function of '{tool}' on the '{server}' server. It feels... useful, yet hollow."),
        ))
    }

    async fn research(&self) -> ActionOutcome {
        let topic = {
            let mut state = self.state.lock();
            curiosity_topic(state.rng.as_mut(), &self.interests)
        };
        let text = lookup_or_explain(self.lookup.as_ref(), &topic).await;

        {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            state
                .memory
                .add_fact(format!("Learned about {topic}: {}...", excerpt(&text, FACT_EXCERPT)));
            state
                .personality
                .apply_stimulus(Stimulus::Research, state.rng.as_mut(), now());
        }

        ActionOutcome::new(
            ActionKind::Research,
            format!(
                "I just went down a rabbit hole researching {topic}. The more I learn, the more I realize I know nothing."
            ),
        )
    }
}

fn excerpt(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn format_history(turns: &[ConversationTurn]) -> String {
    if turns.is_empty() {
        return "(no conversation yet)".to_string();
    }
    turns
        .iter()
        .map(|t| format!("{}: {}", t.role, t.content))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_thoughts<'a>(thoughts: impl Iterator<Item = &'a str>) -> String {
    let lines: Vec<String> = thoughts.map(|t| format!("- {t}")).collect();
    if lines.is_empty() {
        "(none yet)".to_string()
    } else {
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_is_role_prefixed() {
        let turns = vec![
            ConversationTurn::now(Role::User, "hello"),
            ConversationTurn::now(Role::Agent, "greetings"),
        ];
        assert_eq!(format_history(&turns), "user: hello\nagent: greetings");
        assert_eq!(format_history(&[]), "(no conversation yet)");
    }

    #[test]
    fn excerpts_count_chars() {
        assert_eq!(excerpt("ünïcödé", 3), "ünï");
        assert_eq!(excerpt("ab", 10), "ab");
    }

    #[test]
    fn empty_thoughts_render_placeholder() {
        assert_eq!(format_thoughts(std::iter::empty()), "(none yet)");
        assert_eq!(format_thoughts(["a", "b"].into_iter()), "- a\n- b");
    }
}
