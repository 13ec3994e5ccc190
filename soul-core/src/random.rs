//! Injectable randomness.
//!
//! Every probabilistic decision (scheduler guards, mood swings, topic picks)
//! draws from a [`RandomSource`] owned by the shared state, so a test can pin
//! the exact sample sequence with [`ScriptedRandom`].

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A source of uniform samples.
pub trait RandomSource: Send {
    /// Uniform sample in [0, 1).
    fn unit(&mut self) -> f32;

    /// Uniform index in `0..len`. `len` must be non-zero.
    fn index(&mut self, len: usize) -> usize;

    /// Uniform sample in `[low, high)`.
    fn between(&mut self, low: f32, high: f32) -> f32 {
        low + (high - low) * self.unit()
    }
}

/// Pick a uniformly random element of `items`, or `None` when empty.
pub fn choose<'a, T>(rng: &mut dyn RandomSource, items: &'a [T]) -> Option<&'a T> {
    if items.is_empty() {
        None
    } else {
        items.get(rng.index(items.len()))
    }
}

/// Production source backed by [`StdRng`].
#[derive(Debug)]
pub struct SeededRandom(StdRng);

impl SeededRandom {
    /// Seeded from OS entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self(StdRng::from_entropy())
    }

    /// Reproducible sequence for a given seed.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl RandomSource for SeededRandom {
    fn unit(&mut self) -> f32 {
        self.0.r#gen::<f32>()
    }

    fn index(&mut self, len: usize) -> usize {
        self.0.gen_range(0..len.max(1))
    }
}

/// Deterministic source replaying a fixed list of samples in a cycle.
///
/// `index` maps the next sample onto `0..len`, so `0.0` always selects the
/// first element.
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    samples: Vec<f32>,
    cursor: usize,
}

impl ScriptedRandom {
    /// Replay `samples` forever. An empty list behaves like `[0.0]`.
    #[must_use]
    pub fn new(samples: Vec<f32>) -> Self {
        let samples = if samples.is_empty() { vec![0.0] } else { samples };
        Self { samples, cursor: 0 }
    }

    /// Always return the same sample.
    #[must_use]
    pub fn constant(sample: f32) -> Self {
        Self::new(vec![sample])
    }
}

impl RandomSource for ScriptedRandom {
    fn unit(&mut self) -> f32 {
        let sample = self.samples[self.cursor % self.samples.len()];
        self.cursor = self.cursor.wrapping_add(1);
        sample.clamp(0.0, 0.999_999)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    fn index(&mut self, len: usize) -> usize {
        let len = len.max(1);
        ((self.unit() * len as f32) as usize).min(len - 1)
    }
}
