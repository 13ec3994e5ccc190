//! HTTP cognitive providers: OpenAI-compatible chat completions and Gemini.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use soul_core::config::LlmConfig;

use crate::error::{excerpt, ProviderError};
use crate::provider::{mask_key, CognitiveProvider};

fn http_client(timeout_ms: u64) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .build()
        .map_err(|e| ProviderError::RequestFailed(format!("http client: {e}")))
}

// ---------------------------------------------------------------------------
// OpenAI-compatible
// ---------------------------------------------------------------------------

/// `POST {base}/chat/completions` with a bearer token.
pub struct OpenAiCompatibleProvider {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    timeout_ms: u64,
    http: Client,
}

impl OpenAiCompatibleProvider {
    /// Create a provider for `model` at `base_url`.
    ///
    /// # Errors
    /// Returns [`ProviderError::RequestFailed`] if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout_ms: u64,
    ) -> Result<Self, ProviderError> {
        let model = model.into();
        Ok(Self {
            name: format!("openai:{model}"),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model,
            timeout_ms,
            http: http_client(timeout_ms)?,
        })
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatMessage>,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[async_trait]
impl CognitiveProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let start = Instant::now();
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(&e, self.timeout_ms))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ProviderError::from_transport(&e, self.timeout_ms))?;

        if !status.is_success() {
            debug!(provider = %self.name, status = status.as_u16(), body = %excerpt(&text, 200), "Provider error body");
            return Err(ProviderError::from_status(status.as_u16(), &text));
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| ProviderError::RequestFailed(format!("unparseable response: {e}")))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .map(|c| c.trim().to_string())
            .unwrap_or_default();

        debug!(
            provider = %self.name,
            latency_ms = start.elapsed().as_millis(),
            chars = content.len(),
            "Provider answered"
        );
        if content.is_empty() {
            Err(ProviderError::EmptyResponse)
        } else {
            Ok(content)
        }
    }
}

// ---------------------------------------------------------------------------
// Gemini
// ---------------------------------------------------------------------------

/// `POST {base}/models/{model}:generateContent` for one model identifier.
pub struct GeminiProvider {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    timeout_ms: u64,
    http: Client,
}

impl GeminiProvider {
    /// Create a provider for one Gemini model. A leading `models/` is accepted.
    ///
    /// # Errors
    /// Returns [`ProviderError::RequestFailed`] if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout_ms: u64,
    ) -> Result<Self, ProviderError> {
        let model = model.into();
        Ok(Self {
            name: format!("gemini:{model}"),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.trim_start_matches("models/").to_string(),
            timeout_ms,
            http: http_client(timeout_ms)?,
        })
    }
}

#[derive(Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    role: &'static str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[async_trait]
impl CognitiveProvider for GeminiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiPart { text: prompt }],
            }],
        };

        let resp = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(&e, self.timeout_ms))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ProviderError::from_transport(&e, self.timeout_ms))?;

        if !status.is_success() {
            debug!(provider = %self.name, status = status.as_u16(), body = %excerpt(&body, 200), "Provider error body");
            return Err(ProviderError::from_status(status.as_u16(), &body));
        }

        let parsed: GeminiResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::RequestFailed(format!("unparseable response: {e}")))?;
        let text = parsed
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content)
            .and_then(|c| c.parts)
            .map(|parts| {
                parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .map(|t| t.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            Err(ProviderError::EmptyResponse)
        } else {
            Ok(text)
        }
    }
}

// ---------------------------------------------------------------------------
// Construction from config
// ---------------------------------------------------------------------------

/// Build the ordered provider list: primary first, then one Gemini provider
/// per fallback model. Providers without a key, or whose HTTP client cannot
/// be built, are skipped.
#[must_use]
pub fn providers_from_config(config: &LlmConfig) -> Vec<Arc<dyn CognitiveProvider>> {
    let mut providers: Vec<Arc<dyn CognitiveProvider>> = Vec::new();

    match &config.primary_api_key {
        Some(key) => {
            info!(key = %mask_key(key), model = %config.primary_model, "Primary provider configured");
            match OpenAiCompatibleProvider::new(
                &config.primary_base_url,
                key,
                &config.primary_model,
                config.request_timeout_ms,
            ) {
                Ok(provider) => providers.push(Arc::new(provider)),
                Err(e) => warn!(error = %e, "Primary provider skipped"),
            }
        }
        None => warn!("No primary provider key found (POE_API_KEY)"),
    }

    if let Some(key) = &config.secondary_api_key {
        info!(
            key = %mask_key(key),
            models = config.secondary_models.len(),
            "Secondary provider configured"
        );
        for model in &config.secondary_models {
            match GeminiProvider::new(&config.secondary_base_url, key, model, config.request_timeout_ms) {
                Ok(provider) => providers.push(Arc::new(provider)),
                Err(e) => warn!(model = %model, error = %e, "Secondary provider skipped"),
            }
        }
    }

    providers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_keys_means_no_providers() {
        let config = LlmConfig::default();
        assert!(providers_from_config(&config).is_empty());
    }

    #[test]
    fn provider_order_follows_config() {
        let config = LlmConfig {
            primary_api_key: Some("poe-key-123456789".into()),
            secondary_api_key: Some("gem-key-123456789".into()),
            ..LlmConfig::default()
        };
        let names: Vec<String> = providers_from_config(&config)
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "openai:Llama-3-70b",
                "gemini:gemini-1.5-flash",
                "gemini:gemini-1.5-pro",
                "gemini:models/gemini-1.5-flash",
                "gemini:gemini-pro",
            ]
        );
    }

    #[test]
    fn gemini_strips_models_prefix() {
        let provider = GeminiProvider::new("https://example.test/v1beta/", "k", "models/gemini-1.5-flash", 10)
            .expect("client");
        assert_eq!(provider.model, "gemini-1.5-flash");
        assert_eq!(provider.base_url, "https://example.test/v1beta");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_classified() {
        let provider = OpenAiCompatibleProvider::new("http://127.0.0.1:9", "k", "m", 2_000).expect("client");
        let err = provider.generate("hello").await.expect_err("should fail");
        assert!(matches!(
            err,
            ProviderError::Unavailable(_) | ProviderError::Timeout(2_000) | ProviderError::RequestFailed(_)
        ));
    }

    #[tokio::test]
    async fn silent_endpoint_times_out_with_the_configured_budget() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        // Accept and hold the connection without ever answering.
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let provider = OpenAiCompatibleProvider::new(format!("http://{addr}/v1"), "k", "m", 150).expect("client");
        let err = provider.generate("hello").await.expect_err("should time out");
        assert!(matches!(err, ProviderError::Timeout(150)), "got {err:?}");
        assert_eq!(err.to_string(), "Provider request timed out after 150ms");
        server.abort();
    }
}
