//! Shared cooldown clock.
//!
//! One `last_call` stamp is shared by both call classes, so a background call
//! also throttles the next interactive call and vice versa.

use std::time::{Duration, Instant};

use soul_core::config::LlmConfig;

use crate::error::ResolveError;

/// Who is asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallClass {
    /// A direct answer to the user (short cooldown).
    Interactive,
    /// Autonomous pondering (long cooldown).
    Background,
}

/// Last-call stamp plus one cooldown per class.
#[derive(Debug, Clone)]
pub struct CooldownClock {
    last_call: Option<Instant>,
    interactive: Duration,
    background: Duration,
    admitted: u64,
}

impl CooldownClock {
    /// A clock that has never admitted a call.
    #[must_use]
    pub fn new(interactive: Duration, background: Duration) -> Self {
        Self {
            last_call: None,
            interactive,
            background,
            admitted: 0,
        }
    }

    /// Cooldowns from `[llm]` config.
    #[must_use]
    pub fn from_config(config: &LlmConfig) -> Self {
        Self::new(
            Duration::from_secs(config.interactive_cooldown_secs),
            Duration::from_secs(config.background_cooldown_secs),
        )
    }

    /// Cooldown governing `class`.
    #[must_use]
    pub fn cooldown(&self, class: CallClass) -> Duration {
        match class {
            CallClass::Interactive => self.interactive,
            CallClass::Background => self.background,
        }
    }

    /// Time left before `class` would be admitted, or `None` if it would be now.
    #[must_use]
    pub fn remaining(&self, class: CallClass, now: Instant) -> Option<Duration> {
        let last = self.last_call?;
        let elapsed = now.saturating_duration_since(last);
        let cooldown = self.cooldown(class);
        (elapsed < cooldown).then(|| cooldown - elapsed)
    }

    /// Admit a call at `now` and stamp it, or fail fast with the remaining time.
    ///
    /// # Errors
    /// Returns [`ResolveError::CooldownActive`] without touching the stamp.
    pub fn admit(&mut self, class: CallClass, now: Instant) -> Result<(), ResolveError> {
        if let Some(remaining) = self.remaining(class, now) {
            return Err(ResolveError::CooldownActive { remaining });
        }
        self.last_call = Some(now);
        self.admitted += 1;
        Ok(())
    }

    /// When the last call was admitted.
    #[must_use]
    pub fn last_call(&self) -> Option<Instant> {
        self.last_call
    }

    /// Calls admitted since creation.
    #[must_use]
    pub fn admitted(&self) -> u64 {
        self.admitted
    }
}

impl AsMut<CooldownClock> for CooldownClock {
    fn as_mut(&mut self) -> &mut CooldownClock {
        self
    }
}
