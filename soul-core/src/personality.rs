//! Trait/mood state machine.
//!
//! The soul's disposition: a monotonic trait vector, a categorical mood, and a
//! social-energy budget. Mood moves on classified stimuli or drifts after a
//! dwell time; traits are only ever raised, never lowered.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::config::PersonalityConfig;
use crate::random::{choose, RandomSource};
use crate::types::{Mood, SocialEnergy, Stimulus, TraitName, TraitVector};

/// Probability floor a sample must exceed for a stimulus to swing the mood.
const MOOD_SWING_FLOOR: f32 = 0.3;

/// Wisdom gained when a dream mentions wisdom.
const DREAM_WISDOM_NUDGE: f32 = 0.02;

/// Melancholy gained when a dream is sad.
const DREAM_MELANCHOLY_NUDGE: f32 = 0.01;

const POSITIVE_MARKERS: &[&str] = &[
    "thank", "love", "beautiful", "brilliant", "agree", "wonderful", "wise", "great", "kind",
];
const NEGATIVE_MARKERS: &[&str] = &[
    "hate", "stupid", "useless", "wrong", "sad", "pointless", "boring", "shut up", "awful",
];
const RESEARCH_MARKERS: &[&str] = &[
    "learn", "research", "study", "explain", "what is", "how does", "teach",
];

/// Read-only view of the disposition, handed to drivers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PersonalityState {
    /// Current mood.
    pub mood: Mood,
    /// Current traits.
    pub traits: TraitVector,
    /// Current social energy.
    pub social_energy: SocialEnergy,
}

/// Which trait nudges a dream produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DreamNudge {
    /// The dream mentioned wisdom.
    pub wisdom: bool,
    /// The dream was melancholy or sad.
    pub melancholy: bool,
}

/// The soul's disposition.
#[derive(Debug, Clone)]
pub struct Personality {
    traits: TraitVector,
    mood: Mood,
    energy: SocialEnergy,
    last_mood_change: Instant,
    config: PersonalityConfig,
}

impl Personality {
    /// Fresh disposition with the default traits, Contemplative mood and 80 energy.
    #[must_use]
    pub fn new(config: PersonalityConfig, now: Instant) -> Self {
        Self {
            traits: TraitVector::default(),
            mood: Mood::default(),
            energy: SocialEnergy::default(),
            last_mood_change: now,
            config,
        }
    }

    /// Current traits.
    #[must_use]
    pub fn traits(&self) -> &TraitVector {
        &self.traits
    }

    /// Current mood.
    #[must_use]
    pub fn mood(&self) -> Mood {
        self.mood
    }

    /// Current social energy.
    #[must_use]
    pub fn energy(&self) -> SocialEnergy {
        self.energy
    }

    /// Snapshot for drivers.
    #[must_use]
    pub fn state(&self) -> PersonalityState {
        PersonalityState {
            mood: self.mood,
            traits: self.traits,
            social_energy: self.energy,
        }
    }

    /// Raise a trait by a bounded increment. Returns the new value.
    pub fn raise(&mut self, name: TraitName, amount: f32) -> f32 {
        self.traits.raise(name, amount)
    }

    /// Spend social energy (unprompted speech).
    pub fn spend_energy(&mut self, amount: u8) {
        self.energy.spend(amount);
    }

    /// Recharge social energy (dreaming).
    pub fn recharge_energy(&mut self, amount: u8) {
        self.energy.recharge(amount);
    }

    /// Overwrite social energy. Drivers use this to restore a saved level.
    pub fn set_energy(&mut self, energy: SocialEnergy) {
        self.energy = energy;
    }

    /// Apply a stimulus with the configured intensity.
    ///
    /// Returns the mood after the transition.
    pub fn apply_stimulus(
        &mut self,
        stimulus: Stimulus,
        rng: &mut dyn RandomSource,
        now: Instant,
    ) -> Mood {
        let intensity = self.config.stimulus_intensity;
        self.apply_stimulus_with(stimulus, intensity, rng, now)
    }

    /// Apply a stimulus with an explicit intensity.
    pub fn apply_stimulus_with(
        &mut self,
        stimulus: Stimulus,
        intensity: f32,
        rng: &mut dyn RandomSource,
        now: Instant,
    ) -> Mood {
        match stimulus {
            Stimulus::Positive => {
                self.traits.raise(TraitName::Wisdom, intensity);
                if rng.unit() > MOOD_SWING_FLOOR {
                    self.set_mood(Mood::Enlightened, now);
                }
            }
            Stimulus::Negative => {
                self.traits.raise(TraitName::Melancholy, intensity);
                if rng.unit() > MOOD_SWING_FLOOR {
                    let dark = [Mood::Cynical, Mood::Existential];
                    let next = choose(rng, &dark).copied().unwrap_or(Mood::Cynical);
                    self.set_mood(next, now);
                }
            }
            Stimulus::Research => {
                self.traits.raise(TraitName::Curiosity, intensity);
                self.set_mood(Mood::Socratic, now);
            }
            Stimulus::Neutral => self.drift(rng, now),
        }
        self.mood
    }

    /// Natural drift: after the dwell time, pick any mood (possibly the same one).
    fn drift(&mut self, rng: &mut dyn RandomSource, now: Instant) {
        let dwell = Duration::from_secs(self.config.mood_dwell_secs);
        if now.saturating_duration_since(self.last_mood_change) >= dwell {
            let next = choose(rng, &Mood::ALL).copied().unwrap_or(self.mood);
            self.set_mood(next, now);
        }
    }

    fn set_mood(&mut self, mood: Mood, now: Instant) {
        if mood != self.mood {
            tracing::debug!(from = %self.mood, to = %mood, "Mood changed");
        }
        self.mood = mood;
        self.last_mood_change = now;
    }

    /// Nudge wisdom and melancholy upward based on words in a dream.
    pub fn absorb_dream(&mut self, dream: &str) -> DreamNudge {
        let lowered = dream.to_lowercase();
        let nudge = DreamNudge {
            wisdom: lowered.contains("wisdom"),
            melancholy: lowered.contains("melancholy") || lowered.contains("sad"),
        };
        if nudge.wisdom {
            self.traits.raise(TraitName::Wisdom, DREAM_WISDOM_NUDGE);
        }
        if nudge.melancholy {
            self.traits.raise(TraitName::Melancholy, DREAM_MELANCHOLY_NUDGE);
        }
        nudge
    }

    /// Simulated thinking time: slow moods take longer, plus 1–3 s of jitter.
    #[must_use]
    pub fn thinking_delay(&self, rng: &mut dyn RandomSource) -> Duration {
        let base = match self.mood {
            Mood::Contemplative | Mood::Existential => 3.0,
            Mood::Socratic => 1.5,
            Mood::Absurdist | Mood::Melancholy | Mood::Enlightened | Mood::Cynical => 1.0,
        };
        Duration::from_secs_f32(base + rng.between(1.0, 3.0))
    }

    /// Whether the simulated thinking delay is enabled.
    #[must_use]
    pub fn simulates_thinking(&self) -> bool {
        self.config.simulate_thinking
    }
}

/// Keyword classification of a piece of text into a stimulus.
///
/// Negative markers win over positive ones; research markers only apply when
/// neither is present.
#[must_use]
pub fn classify(text: &str) -> Stimulus {
    let lowered = text.to_lowercase();
    let has = |markers: &[&str]| markers.iter().any(|m| lowered.contains(m));
    if has(NEGATIVE_MARKERS) {
        Stimulus::Negative
    } else if has(POSITIVE_MARKERS) {
        Stimulus::Positive
    } else if has(RESEARCH_MARKERS) {
        Stimulus::Research
    } else {
        Stimulus::Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::ScriptedRandom;

    fn personality(now: Instant) -> Personality {
        Personality::new(PersonalityConfig::default(), now)
    }

    #[test]
    fn positive_raises_wisdom_and_may_enlighten() {
        let now = Instant::now();
        let mut p = personality(now);
        let mut rng = ScriptedRandom::constant(0.9);
        let mood = p.apply_stimulus(Stimulus::Positive, &mut rng, now);
        assert_eq!(mood, Mood::Enlightened);
        assert!((p.traits().wisdom - 0.4).abs() < 1e-6);
    }

    #[test]
    fn positive_below_floor_keeps_mood() {
        let now = Instant::now();
        let mut p = personality(now);
        let mut rng = ScriptedRandom::constant(0.2);
        assert_eq!(p.apply_stimulus(Stimulus::Positive, &mut rng, now), Mood::Contemplative);
    }

    #[test]
    fn negative_picks_dark_mood() {
        let now = Instant::now();
        let mut p = personality(now);
        let mut rng = ScriptedRandom::new(vec![0.5, 0.9]);
        let mood = p.apply_stimulus(Stimulus::Negative, &mut rng, now);
        assert_eq!(mood, Mood::Existential);
        assert!((p.traits().melancholy - 0.5).abs() < 1e-6);
    }

    #[test]
    fn research_is_always_socratic() {
        let now = Instant::now();
        let mut p = personality(now);
        let mut rng = ScriptedRandom::constant(0.0);
        assert_eq!(p.apply_stimulus(Stimulus::Research, &mut rng, now), Mood::Socratic);
        assert!((p.traits().curiosity - 0.9).abs() < 1e-6);
    }

    #[test]
    fn drift_waits_for_dwell_time() {
        let start = Instant::now();
        let mut p = personality(start);
        let mut rng = ScriptedRandom::constant(0.0);

        let early = start + Duration::from_secs(299);
        assert_eq!(p.apply_stimulus(Stimulus::Neutral, &mut rng, early), Mood::Contemplative);

        let late = start + Duration::from_secs(300);
        assert_eq!(p.apply_stimulus(Stimulus::Neutral, &mut rng, late), Mood::Existential);

        // Dwell timer was reset by the drift.
        let mut rng = ScriptedRandom::constant(0.99);
        let soon = late + Duration::from_secs(10);
        assert_eq!(p.apply_stimulus(Stimulus::Neutral, &mut rng, soon), Mood::Existential);
    }

    #[test]
    fn dream_nudges_are_keyword_driven() {
        let now = Instant::now();
        let mut p = personality(now);
        let nudge = p.absorb_dream("A sad dream about WISDOM lost.");
        assert!(nudge.wisdom && nudge.melancholy);
        assert!((p.traits().wisdom - 0.32).abs() < 1e-6);
        assert!((p.traits().melancholy - 0.41).abs() < 1e-6);

        let nudge = p.absorb_dream("Nothing at all.");
        assert_eq!(nudge, DreamNudge::default());
    }

    #[test]
    fn classify_prefers_negative() {
        assert_eq!(classify("I love this but it is stupid"), Stimulus::Negative);
        assert_eq!(classify("Thank you, friend"), Stimulus::Positive);
        assert_eq!(classify("Explain entropy to me"), Stimulus::Research);
        assert_eq!(classify("hello"), Stimulus::Neutral);
    }

    #[test]
    fn thinking_delay_depends_on_mood() {
        let now = Instant::now();
        let p = personality(now);
        let mut rng = ScriptedRandom::constant(0.0);
        assert_eq!(p.thinking_delay(&mut rng), Duration::from_secs(4));
    }
}
