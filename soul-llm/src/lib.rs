//! # soul-llm: Cognitive Provider Layer
//!
//! Every text generation the soul performs goes through this crate:
//!   - **Providers**: an OpenAI-compatible chat endpoint (primary) and Gemini,
//!     one provider per fallback model (secondary).
//!   - **Cooldown**: one shared last-call stamp, two cooldowns (interactive
//!     and background). Violations fail fast; nothing waits.
//!   - **Resolver**: tries providers in fixed order, returns the first
//!     non-empty text, and classifies failures for caller messaging.
//!
//! ```text
//! Interactive: cooldown 5 s    direct answers to the user
//! Background:  cooldown 60 s   dreams, observations, proactive speech, silent thoughts
//! ```

pub mod client;
pub mod cooldown;
pub mod error;
pub mod prompt;
pub mod provider;
pub mod resolver;

pub use client::{providers_from_config, GeminiProvider, OpenAiCompatibleProvider};
pub use cooldown::{CallClass, CooldownClock};
pub use error::{ProviderError, ProviderFault, ResolveError};
pub use provider::{mask_key, CognitiveProvider};
pub use resolver::CognitiveResolver;
