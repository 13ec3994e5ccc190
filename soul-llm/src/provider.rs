//! The cognitive provider capability.

use async_trait::async_trait;

use crate::error::ProviderError;

/// Something that turns a prompt into text.
///
/// Implementations enforce their own per-call timeout and never retry
/// internally; ordering and fallback belong to the resolver.
#[async_trait]
pub trait CognitiveProvider: Send + Sync {
    /// Short name used in logs (e.g. `openai:Llama-3-70b`).
    fn name(&self) -> &str;

    /// Generate text for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// Mask an API key for logging: first and last four characters only.
#[must_use]
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "****".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_long_and_short_keys() {
        assert_eq!(mask_key("abcd1234567890wxyz"), "abcd...wxyz");
        assert_eq!(mask_key("short"), "****");
    }
}
