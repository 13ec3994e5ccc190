//! The single mutual-exclusion domain.
//!
//! Everything the background driver and the interactive path both touch lives
//! in [`SoulState`], behind one `parking_lot::Mutex`. The lock is never held
//! across an `.await`.

use soul_core::config::SoulConfig;
use soul_core::random::{RandomSource, SeededRandom};
use soul_core::{MemoryStore, Personality};
use soul_llm::resolver::now;
use soul_llm::CooldownClock;

/// Shared mutable state of one soul.
pub struct SoulState {
    /// Traits, mood and social energy.
    pub personality: Personality,
    /// Conversation, thought and fact logs.
    pub memory: MemoryStore,
    /// Last provider call and the two cooldowns.
    pub clock: CooldownClock,
    /// Every probabilistic decision draws from here.
    pub rng: Box<dyn RandomSource>,
}

impl SoulState {
    /// Assemble state from parts.
    #[must_use]
    pub fn new(
        personality: Personality,
        memory: MemoryStore,
        clock: CooldownClock,
        rng: Box<dyn RandomSource>,
    ) -> Self {
        Self {
            personality,
            memory,
            clock,
            rng,
        }
    }

    /// Fresh state from config, with the given memory store and an entropy-seeded RNG.
    #[must_use]
    pub fn from_config(config: &SoulConfig, memory: MemoryStore) -> Self {
        Self::new(
            Personality::new(config.personality.clone(), now()),
            memory,
            CooldownClock::from_config(&config.llm),
            Box::new(SeededRandom::from_entropy()),
        )
    }
}

impl AsMut<CooldownClock> for SoulState {
    fn as_mut(&mut self) -> &mut CooldownClock {
        &mut self.clock
    }
}

impl std::fmt::Debug for SoulState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoulState")
            .field("personality", &self.personality)
            .field("memory", &self.memory)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}
