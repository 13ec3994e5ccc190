//! # Soul Core Library
//!
//! State core for an always-on conversational agent.
//!
//! - **Personality**: a monotonic trait vector, a categorical mood and a
//!   social-energy budget, moved by classified stimuli and by dreams.
//! - **Memory**: append-only conversation, thought and fact logs, plus
//!   opinions and wisdom. The conversation log decays by length: past 20
//!   turns it collapses to the last 5 and one wisdom record.
//! - **Persistence**: write-through JSON or SQLite snapshots.
//! - **Randomness**: an injectable source so every decision is reproducible
//!   under test.
//!
//! Nothing in this crate performs network I/O or awaits.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod decay;
pub mod error;
pub mod memory;
pub mod persistence;
pub mod personality;
pub mod random;
pub mod types;

pub use config::SoulConfig;
pub use error::SoulError;
pub use memory::{MemoryLog, MemoryStore};
pub use personality::{Personality, PersonalityState};
pub use random::{RandomSource, ScriptedRandom, SeededRandom};
pub use types::*;
