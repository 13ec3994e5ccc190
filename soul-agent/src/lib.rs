//! # soul-agent
//!
//! The autonomous side of the soul. [`Soul`] owns the shared state and the
//! outside-world collaborators, and exposes the driver-facing operations:
//! `tick`, `resolve`, `respond`, `generate_thought`, `get_state` and
//! `recent_context`.
//!
//! ```text
//!            ┌──────────── Arc<Mutex<SoulState>> ────────────┐
//!            │ personality · memory · cooldown clock · rng    │
//!            └───────────────▲───────────────▲────────────────┘
//!                            │               │
//!   driver (tick every 10-20 s)        console (respond)
//!            │                               │
//!            ▼                               ▼
//!   scheduler guards ─▶ action ─▶ resolver / lookup / tools
//! ```
//!
//! ## Modules
//!
//! - `scheduler`: pure guard selection
//! - `soul`: action effects and the interactive path
//! - `driver`: the background loop
//! - `lookup`: topic lookup (Wikipedia)
//! - `tools`: external tool directory (MCP over stdio)
//! - `fallback`: canned texts for when cognition is unavailable

#![deny(clippy::unwrap_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod driver;
pub mod error;
pub mod fallback;
pub mod lookup;
pub mod scheduler;
pub mod soul;
pub mod state;
pub mod tools;

pub use driver::{DriverEvent, DriverHandle};
pub use error::AgentError;
pub use lookup::{TopicLookup, WikipediaLookup};
pub use scheduler::{select_action, ActionKind, ActionOutcome, GuardInputs, GuardThresholds};
pub use soul::Soul;
pub use state::SoulState;
pub use tools::{StaticToolDirectory, StdioToolDirectory, ToolDescriptor, ToolDirectory};
