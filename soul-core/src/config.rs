//! Configuration for the soul.
//!
//! Maps directly to `soul.toml`. Every field has a default, so an empty file
//! (or no file at all) yields a working configuration. Environment variables
//! of the form `SOUL__SECTION__KEY` override file values, and provider keys are
//! read from `POE_API_KEY` / `GEMINI_API_KEY`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SoulError};

/// Top-level configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SoulConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Cognitive provider and cooldown settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Mood/trait state machine tuning.
    #[serde(default)]
    pub personality: PersonalityConfig,
    /// Memory log limits.
    #[serde(default)]
    pub memory: MemoryConfig,
    /// Snapshot storage.
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// Autonomous action scheduling.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Topic lookup.
    #[serde(default)]
    pub lookup: LookupConfig,
    /// External tool directory.
    #[serde(default)]
    pub tools: ToolsConfig,
}

impl SoulConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `SoulError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| SoulError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Layered load: optional file, then `SOUL__*` environment overrides,
    /// then provider keys from the environment.
    ///
    /// # Errors
    /// Returns `SoulError::Config` if a source cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(false));
        }
        builder = builder.add_source(
            ::config::Environment::with_prefix("SOUL")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: Self = builder
            .build()
            .and_then(::config::Config::try_deserialize)
            .map_err(|e| SoulError::Config(e.to_string()))?;
        config.llm.apply_env_keys();
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Name the soul answers to in prompts.
    #[serde(default = "default_name")]
    pub name: String,
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
        }
    }
}

/// Cognitive provider settings.
///
/// The primary provider is an OpenAI-compatible chat endpoint; the secondary
/// provider is tried once per model in `secondary_models`, in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the primary (OpenAI-compatible) provider.
    #[serde(default = "default_primary_url")]
    pub primary_base_url: String,
    /// Model requested from the primary provider.
    #[serde(default = "default_primary_model")]
    pub primary_model: String,
    /// Primary API key (env: `POE_API_KEY`). Absent → primary not configured.
    #[serde(default, skip_serializing)]
    pub primary_api_key: Option<String>,
    /// Base URL of the secondary (Gemini) provider.
    #[serde(default = "default_secondary_url")]
    pub secondary_base_url: String,
    /// Ordered fallback model identifiers for the secondary provider.
    #[serde(default = "default_secondary_models")]
    pub secondary_models: Vec<String>,
    /// Secondary API key (env: `GEMINI_API_KEY`). Absent → secondary not configured.
    #[serde(default, skip_serializing)]
    pub secondary_api_key: Option<String>,
    /// Hard timeout for a single provider call in milliseconds.
    #[serde(default = "default_10000")]
    pub request_timeout_ms: u64,
    /// Minimum gap before an interactive call, in seconds.
    #[serde(default = "default_5")]
    pub interactive_cooldown_secs: u64,
    /// Minimum gap before a background call, in seconds.
    #[serde(default = "default_60")]
    pub background_cooldown_secs: u64,
}

impl LlmConfig {
    /// Fill missing API keys from `POE_API_KEY` and `GEMINI_API_KEY`.
    pub fn apply_env_keys(&mut self) {
        let from_env = |var: &str| std::env::var(var).ok().filter(|s| !s.trim().is_empty());
        if self.primary_api_key.is_none() {
            self.primary_api_key = from_env("POE_API_KEY");
        }
        if self.secondary_api_key.is_none() {
            self.secondary_api_key = from_env("GEMINI_API_KEY");
        }
    }

    /// Whether at least one provider has a key.
    #[must_use]
    pub fn has_any_provider(&self) -> bool {
        self.primary_api_key.is_some() || self.secondary_api_key.is_some()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            primary_base_url: default_primary_url(),
            primary_model: default_primary_model(),
            primary_api_key: None,
            secondary_base_url: default_secondary_url(),
            secondary_models: default_secondary_models(),
            secondary_api_key: None,
            request_timeout_ms: 10_000,
            interactive_cooldown_secs: 5,
            background_cooldown_secs: 60,
        }
    }
}

/// Mood/trait state machine tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonalityConfig {
    /// Trait increment applied per classified stimulus.
    #[serde(default = "default_0_1")]
    pub stimulus_intensity: f32,
    /// Seconds a mood must hold before natural drift may change it.
    #[serde(default = "default_300")]
    pub mood_dwell_secs: u64,
    /// Delay interactive answers by a mood-dependent thinking time.
    #[serde(default = "default_true")]
    pub simulate_thinking: bool,
}

impl Default for PersonalityConfig {
    fn default() -> Self {
        Self {
            stimulus_intensity: 0.1,
            mood_dwell_secs: 300,
            simulate_thinking: true,
        }
    }
}

/// Memory log limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Compression fires once the conversation log is longer than this.
    #[serde(default = "default_20")]
    pub compression_threshold: usize,
    /// Conversation turns kept after compression.
    #[serde(default = "default_5_usize")]
    pub retain_after_compression: usize,
    /// Conversation turns included in proactive prompts.
    #[serde(default = "default_10_usize")]
    pub context_window: usize,
    /// Internal thoughts included in dream prompts.
    #[serde(default = "default_10_usize")]
    pub thought_window: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            compression_threshold: 20,
            retain_after_compression: 5,
            context_window: 10,
            thought_window: 10,
        }
    }
}

/// Snapshot storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Pretty-printed JSON file.
    Json,
    /// Single-row SQLite table.
    Sqlite,
}

/// Persistence / save settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Backend: "json" or "sqlite".
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,
    /// Path of the snapshot file or database.
    #[serde(default = "default_memory_path")]
    pub path: String,
    /// Use WAL mode (sqlite only).
    #[serde(default = "default_true")]
    pub wal_mode: bool,
    /// Detect save corruption via checksums (sqlite only).
    #[serde(default = "default_true")]
    pub checksum_enabled: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Json,
            path: default_memory_path(),
            wal_mode: true,
            checksum_enabled: true,
        }
    }
}

/// Autonomous action scheduling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Shortest pause between ticks, in seconds.
    #[serde(default = "default_10")]
    pub tick_min_secs: u64,
    /// Longest pause between ticks, in seconds.
    #[serde(default = "default_20_u64")]
    pub tick_max_secs: u64,
    /// Ask for a silent thought when a tick selects no action.
    #[serde(default = "default_true")]
    pub silent_thoughts: bool,
    /// Extra research topics merged with the built-in list.
    #[serde(default)]
    pub interests: Vec<String>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_min_secs: 10,
            tick_max_secs: 20,
            silent_thoughts: true,
            interests: Vec::new(),
        }
    }
}

/// Topic lookup settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Article base URL; the topic is appended with spaces as underscores.
    #[serde(default = "default_lookup_url")]
    pub base_url: String,
    /// Request timeout in milliseconds.
    #[serde(default = "default_10000")]
    pub timeout_ms: u64,
    /// Maximum characters of cleaned text returned.
    #[serde(default = "default_2000")]
    pub max_chars: usize,
    /// Recently fetched topics kept in memory.
    #[serde(default = "default_32")]
    pub cache_capacity: usize,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            base_url: default_lookup_url(),
            timeout_ms: 10_000,
            max_chars: 2000,
            cache_capacity: 32,
        }
    }
}

/// External tool directory settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Timeout for each handshake / listing exchange, in milliseconds.
    #[serde(default = "default_10000")]
    pub request_timeout_ms: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 10_000,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_name() -> String { "Soul".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_primary_url() -> String { "https://api.poe.com/v1".to_string() }
fn default_primary_model() -> String { "Llama-3-70b".to_string() }
fn default_secondary_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_secondary_models() -> Vec<String> {
    ["gemini-1.5-flash", "gemini-1.5-pro", "models/gemini-1.5-flash", "gemini-pro"]
        .iter()
        .map(ToString::to_string)
        .collect()
}
fn default_backend() -> StorageBackend { StorageBackend::Json }
fn default_memory_path() -> String { "memory.json".to_string() }
fn default_lookup_url() -> String { "https://en.wikipedia.org/wiki".to_string() }
fn default_0_1() -> f32 { 0.1 }
fn default_5() -> u64 { 5 }
fn default_10() -> u64 { 10 }
fn default_20_u64() -> u64 { 20 }
fn default_60() -> u64 { 60 }
fn default_300() -> u64 { 300 }
fn default_10000() -> u64 { 10_000 }
fn default_5_usize() -> usize { 5 }
fn default_10_usize() -> usize { 10 }
fn default_20() -> usize { 20 }
fn default_32() -> usize { 32 }
fn default_2000() -> usize { 2000 }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = SoulConfig::from_toml("").expect("parse");
        assert_eq!(config.memory.compression_threshold, 20);
        assert_eq!(config.memory.retain_after_compression, 5);
        assert_eq!(config.llm.interactive_cooldown_secs, 5);
        assert_eq!(config.llm.background_cooldown_secs, 60);
        assert_eq!(config.llm.secondary_models.len(), 4);
        assert_eq!(config.persistence.backend, StorageBackend::Json);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = SoulConfig::from_toml(
            r#"
            [llm]
            background_cooldown_secs = 120

            [persistence]
            backend = "sqlite"
            path = "soul.db"

            [scheduler]
            interests = ["Tea ceremonies"]
            "#,
        )
        .expect("parse");
        assert_eq!(config.llm.background_cooldown_secs, 120);
        assert_eq!(config.llm.interactive_cooldown_secs, 5);
        assert_eq!(config.persistence.backend, StorageBackend::Sqlite);
        assert_eq!(config.scheduler.interests, vec!["Tea ceremonies".to_string()]);
        assert_eq!(config.scheduler.tick_min_secs, 10);
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let err = SoulConfig::from_toml("[llm\nbroken").expect_err("should fail");
        assert!(matches!(err, SoulError::Config(_)));
    }

    #[test]
    fn either_key_counts_as_a_provider() {
        let mut llm = LlmConfig::default();
        assert!(!llm.has_any_provider());
        llm.secondary_api_key = Some("gem-key".into());
        assert!(llm.has_any_provider());
        llm.secondary_api_key = None;
        llm.primary_api_key = Some("poe-key".into());
        assert!(llm.has_any_provider());
    }

    #[test]
    fn api_keys_are_never_serialized() {
        let mut config = SoulConfig::default();
        config.llm.primary_api_key = Some("secret-key".into());
        let rendered = toml::to_string(&config).expect("serialize");
        assert!(!rendered.contains("secret-key"));
    }
}
