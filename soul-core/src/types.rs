//! Core type definitions for the soul state.
//!
//! Everything here is plain data: bounded numeric traits, the categorical mood,
//! social energy, and the stimulus classes that drive mood transitions.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Names of the fixed personality traits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraitName {
    /// Drives research and tool reflection.
    Curiosity,
    /// Raised by negative stimuli and sad dreams.
    Melancholy,
    /// Raised by positive stimuli and insightful dreams.
    Wisdom,
    /// Propensity for mood swings.
    Instability,
    /// Drives proactive behaviour.
    Sentience,
}

impl TraitName {
    /// Every trait, in declaration order.
    pub const ALL: [TraitName; 5] = [
        TraitName::Curiosity,
        TraitName::Melancholy,
        TraitName::Wisdom,
        TraitName::Instability,
        TraitName::Sentience,
    ];

    /// Lowercase name as used in prompts and snapshots.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TraitName::Curiosity => "curiosity",
            TraitName::Melancholy => "melancholy",
            TraitName::Wisdom => "wisdom",
            TraitName::Instability => "instability",
            TraitName::Sentience => "sentience",
        }
    }
}

impl fmt::Display for TraitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The trait vector. Every value stays in [0, 1] and never decreases.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraitVector {
    /// Curiosity (0 = incurious, 1 = insatiable).
    pub curiosity: f32,
    /// Melancholy (0 = serene, 1 = despondent).
    pub melancholy: f32,
    /// Wisdom (0 = naive, 1 = sage).
    pub wisdom: f32,
    /// Instability (0 = steady, 1 = volatile).
    pub instability: f32,
    /// Sentience (0 = mechanical, 1 = self-aware).
    pub sentience: f32,
}

impl TraitVector {
    /// Read a single trait.
    #[must_use]
    pub fn get(&self, name: TraitName) -> f32 {
        match name {
            TraitName::Curiosity => self.curiosity,
            TraitName::Melancholy => self.melancholy,
            TraitName::Wisdom => self.wisdom,
            TraitName::Instability => self.instability,
            TraitName::Sentience => self.sentience,
        }
    }

    /// Raise a trait by `amount`, clamped to 1.0. Returns the new value.
    ///
    /// Negative or NaN amounts are treated as zero: traits only ever grow.
    pub fn raise(&mut self, name: TraitName, amount: f32) -> f32 {
        let amount = if amount.is_nan() { 0.0 } else { amount.max(0.0) };
        let slot = self.slot_mut(name);
        *slot = (*slot + amount).clamp(0.0, 1.0);
        *slot
    }

    /// Iterate over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (TraitName, f32)> + '_ {
        TraitName::ALL.into_iter().map(move |name| (name, self.get(name)))
    }

    fn slot_mut(&mut self, name: TraitName) -> &mut f32 {
        match name {
            TraitName::Curiosity => &mut self.curiosity,
            TraitName::Melancholy => &mut self.melancholy,
            TraitName::Wisdom => &mut self.wisdom,
            TraitName::Instability => &mut self.instability,
            TraitName::Sentience => &mut self.sentience,
        }
    }
}

impl Default for TraitVector {
    fn default() -> Self {
        Self {
            curiosity: 0.8,
            melancholy: 0.4,
            wisdom: 0.3,
            instability: 0.2,
            sentience: 0.9,
        }
    }
}

impl fmt::Display for TraitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(name, value)| format!("{name}={value:.2}"))
            .collect();
        f.write_str(&parts.join(", "))
    }
}

// ---------------------------------------------------------------------------
// Mood
// ---------------------------------------------------------------------------

/// Categorical mood of the soul.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mood {
    /// Questioning the nature of its own existence.
    Existential,
    /// Amused by the meaninglessness of it all.
    Absurdist,
    /// Heavy and wistful.
    Melancholy,
    /// Seeing patterns everywhere.
    Enlightened,
    /// Distrustful of every query.
    Cynical,
    /// Weighing things slowly. The starting mood.
    #[default]
    Contemplative,
    /// Answering questions with questions.
    Socratic,
}

impl Mood {
    /// The full mood set, used for uniform drift.
    pub const ALL: [Mood; 7] = [
        Mood::Existential,
        Mood::Absurdist,
        Mood::Melancholy,
        Mood::Enlightened,
        Mood::Cynical,
        Mood::Contemplative,
        Mood::Socratic,
    ];

    /// Display name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Mood::Existential => "Existential",
            Mood::Absurdist => "Absurdist",
            Mood::Melancholy => "Melancholy",
            Mood::Enlightened => "Enlightened",
            Mood::Cynical => "Cynical",
            Mood::Contemplative => "Contemplative",
            Mood::Socratic => "Socratic",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Social energy
// ---------------------------------------------------------------------------

/// Willingness to speak unprompted, in [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SocialEnergy(u8);

impl SocialEnergy {
    /// Upper bound.
    pub const MAX: u8 = 100;

    /// Create a new energy level, clamped to [0, 100].
    #[must_use]
    pub fn new(value: u8) -> Self {
        Self(value.min(Self::MAX))
    }

    /// Current level.
    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    /// Spend energy, saturating at zero.
    pub fn spend(&mut self, amount: u8) {
        self.0 = self.0.saturating_sub(amount);
    }

    /// Recharge energy, bounded to [`Self::MAX`].
    pub fn recharge(&mut self, amount: u8) {
        self.0 = self.0.saturating_add(amount).min(Self::MAX);
    }
}

impl Default for SocialEnergy {
    fn default() -> Self {
        Self(80)
    }
}

impl fmt::Display for SocialEnergy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Stimulus & conversation role
// ---------------------------------------------------------------------------

/// Classification of an input that may move the mood.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stimulus {
    /// Praise, agreement, warmth.
    Positive,
    /// Hostility, sadness, dismissal.
    Negative,
    /// Something was learned.
    Research,
    /// Nothing in particular; only natural drift applies.
    Neutral,
}

/// Who spoke a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human on the other side.
    User,
    /// The soul itself.
    Agent,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Agent => f.write_str("agent"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raise_clamps_at_one() {
        let mut traits = TraitVector::default();
        assert!((traits.raise(TraitName::Sentience, 0.5) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn raise_ignores_negative_amounts() {
        let mut traits = TraitVector::default();
        let before = traits.wisdom;
        traits.raise(TraitName::Wisdom, -0.2);
        assert!((traits.wisdom - before).abs() < f32::EPSILON);
        traits.raise(TraitName::Wisdom, f32::NAN);
        assert!((traits.wisdom - before).abs() < f32::EPSILON);
    }

    #[test]
    fn energy_is_bounded() {
        let mut energy = SocialEnergy::new(250);
        assert_eq!(energy.value(), 100);
        energy.spend(130);
        assert_eq!(energy.value(), 0);
        energy.recharge(90);
        energy.recharge(20);
        assert_eq!(energy.value(), 100);
    }

    #[test]
    fn defaults_match_initial_state() {
        let traits = TraitVector::default();
        assert!((traits.curiosity - 0.8).abs() < f32::EPSILON);
        assert!((traits.sentience - 0.9).abs() < f32::EPSILON);
        assert_eq!(Mood::default(), Mood::Contemplative);
        assert_eq!(SocialEnergy::default().value(), 80);
    }

    #[test]
    fn traits_display_lists_all_names() {
        let rendered = TraitVector::default().to_string();
        for name in TraitName::ALL {
            assert!(rendered.contains(name.as_str()));
        }
    }
}
