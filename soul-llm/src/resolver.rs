//! Cognitive resolver: cooldown gate plus ordered provider fallback.
//!
//! ```text
//! lock(state) ─ admit(class) ─ unlock ─▶ provider[0] ─✗─▶ provider[1] ─✗─▶ … ─▶ AllProvidersExhausted
//!                    │                        │
//!                    ✗ CooldownActive         ✓ first non-empty text
//! ```
//!
//! The state lock is only held for the admission check; providers are awaited
//! with the lock released.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, warn};

use soul_core::config::LlmConfig;

use crate::client::providers_from_config;
use crate::cooldown::{CallClass, CooldownClock};
use crate::error::{ProviderFault, ResolveError};
use crate::provider::CognitiveProvider;

/// Current instant, following tokio's clock so paused-time tests can advance it.
#[must_use]
pub fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// Ordered list of providers behind a shared cooldown.
#[derive(Clone, Default)]
pub struct CognitiveResolver {
    providers: Vec<Arc<dyn CognitiveProvider>>,
}

impl std::fmt::Debug for CognitiveResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CognitiveResolver")
            .field("providers", &self.provider_names())
            .finish()
    }
}

impl CognitiveResolver {
    /// Resolver over `providers`, tried in the given order.
    #[must_use]
    pub fn new(providers: Vec<Arc<dyn CognitiveProvider>>) -> Self {
        Self { providers }
    }

    /// Resolver over the HTTP providers whose keys are present in `config`.
    #[must_use]
    pub fn from_config(config: &LlmConfig) -> Self {
        Self::new(providers_from_config(config))
    }

    /// Whether any provider is configured.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.providers.is_empty()
    }

    /// Provider names in priority order.
    #[must_use]
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Gate on the shared cooldown, then dispatch.
    ///
    /// `shared` is the single state lock; only its [`CooldownClock`] is
    /// touched, and the lock is released before any provider is awaited.
    ///
    /// # Errors
    /// [`ResolveError::NoProviders`] with an empty provider list,
    /// [`ResolveError::CooldownActive`] when the clock refuses the call, or
    /// [`ResolveError::AllProvidersExhausted`] when every provider fails.
    pub async fn resolve<S>(
        &self,
        shared: &Mutex<S>,
        prompt: &str,
        class: CallClass,
    ) -> Result<String, ResolveError>
    where
        S: AsMut<CooldownClock>,
    {
        if self.providers.is_empty() {
            return Err(ResolveError::NoProviders);
        }
        {
            let mut state = shared.lock();
            state.as_mut().admit(class, now())?;
        }
        self.dispatch(prompt).await
    }

    /// Try every provider in order; the first non-empty text wins.
    ///
    /// # Errors
    /// [`ResolveError::NoProviders`] or [`ResolveError::AllProvidersExhausted`].
    pub async fn dispatch(&self, prompt: &str) -> Result<String, ResolveError> {
        if self.providers.is_empty() {
            return Err(ResolveError::NoProviders);
        }

        let mut fault: Option<ProviderFault> = None;
        for provider in &self.providers {
            match provider.generate(prompt).await {
                Ok(text) if !text.trim().is_empty() => {
                    debug!(provider = %provider.name(), "Cognitive stream answered");
                    return Ok(text);
                }
                Ok(_) => {
                    warn!(provider = %provider.name(), "Cognitive stream returned nothing");
                }
                Err(e) => {
                    warn!(provider = %provider.name(), error = %e, "Cognitive stream failed");
                    fault = fault.or(e.fault());
                }
            }
        }

        Err(ResolveError::AllProvidersExhausted {
            attempts: self.providers.len(),
            fault,
        })
    }
}
