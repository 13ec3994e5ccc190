//! Action selection.
//!
//! One uniform sample per tick, checked against an ordered list of guards.
//! The first guard that matches decides the action:
//!
//! ```text
//! r < 0.10 && energy > 60      → ProactiveSpeech
//! r < 0.08                     → Dream
//! r < 0.04                     → Observation
//! r < curiosity·0.3 && tools   → ToolReflection
//! r < curiosity·0.1            → Research
//! otherwise                    → None
//! ```
//!
//! Selection is pure; the effects of each action live in [`crate::soul`].

use serde::{Deserialize, Serialize};

/// What a tick decided to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Speak to the user unprompted.
    ProactiveSpeech,
    /// Reflect on recent thoughts; may compress memory.
    Dream,
    /// Read about the world and react.
    Observation,
    /// Ponder an available external tool.
    ToolReflection,
    /// Look up a topic and keep a fact.
    Research,
}

impl ActionKind {
    /// Stable lowercase label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::ProactiveSpeech => "proactive_speech",
            ActionKind::Dream => "dream",
            ActionKind::Observation => "observation",
            ActionKind::ToolReflection => "tool_reflection",
            ActionKind::Research => "research",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of an action that fired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    /// Which action ran.
    pub kind: ActionKind,
    /// Text produced for the user or the log.
    pub message: String,
}

impl ActionOutcome {
    /// Pair a kind with its message.
    #[must_use]
    pub fn new(kind: ActionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Guard thresholds, in priority order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuardThresholds {
    /// Sample bound for proactive speech.
    pub proactive: f32,
    /// Energy must exceed this for proactive speech.
    pub proactive_min_energy: u8,
    /// Sample bound for dreaming.
    pub dream: f32,
    /// Sample bound for observing.
    pub observe: f32,
    /// Curiosity multiplier for tool reflection.
    pub tool_factor: f32,
    /// Curiosity multiplier for research.
    pub research_factor: f32,
}

impl Default for GuardThresholds {
    fn default() -> Self {
        Self {
            proactive: 0.10,
            proactive_min_energy: 60,
            dream: 0.08,
            observe: 0.04,
            tool_factor: 0.3,
            research_factor: 0.1,
        }
    }
}

/// State the guards read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuardInputs {
    /// Current social energy.
    pub energy: u8,
    /// Current curiosity trait.
    pub curiosity: f32,
    /// Whether a tool directory has an active session.
    pub has_tools: bool,
}

/// First action whose guard accepts the sample `r`, if any.
#[must_use]
pub fn select_action(r: f32, inputs: &GuardInputs, thresholds: &GuardThresholds) -> Option<ActionKind> {
    if inputs.energy > thresholds.proactive_min_energy && r < thresholds.proactive {
        Some(ActionKind::ProactiveSpeech)
    } else if r < thresholds.dream {
        Some(ActionKind::Dream)
    } else if r < thresholds.observe {
        Some(ActionKind::Observation)
    } else if inputs.has_tools && r < inputs.curiosity * thresholds.tool_factor {
        Some(ActionKind::ToolReflection)
    } else if r < inputs.curiosity * thresholds.research_factor {
        Some(ActionKind::Research)
    } else {
        None
    }
}
