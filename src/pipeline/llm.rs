//! LLM interaction: one chat request per biography.
//!
//! The parser talks to the model through the small [`CompletionClient`]
//! trait so tests (and alternative backends) can stand in for the network.
//! [`ProviderClient`] is the production implementation on top of
//! `edgequake-llm`.
//!
//! There is no retry here: a failed request is recorded as a per-person
//! error, and re-running the parse stage later retries only people whose
//! output file is still missing.

use crate::config::PipelineConfig;
use crate::error::Bio2CsvError;
use crate::prompts::{MODEL, SYSTEM_PROMPT, TEMPERATURE};
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, OpenAIProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Anything that can turn a system + user message into reply text.
#[allow(async_fn_in_trait)]
pub trait CompletionClient {
    /// Send one request. `Err` carries a human-readable description.
    async fn complete(&self, system: &str, user: &str) -> Result<String, String>;
}

/// [`CompletionClient`] backed by an `edgequake-llm` provider.
pub struct ProviderClient {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
}

impl ProviderClient {
    /// Wrap an already-configured provider.
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider,
            options: build_options(),
        }
    }

    /// Build the client for a run, from most to least specific:
    ///
    /// 1. the injected provider (`config.provider`), used as-is
    /// 2. an explicit `config.api_key`, passed straight to an OpenAI provider
    /// 3. `OPENAI_API_KEY`, read by the provider factory
    ///
    /// Fails with [`Bio2CsvError::MissingCredential`] when no key is
    /// available.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, Bio2CsvError> {
        if let Some(ref provider) = config.provider {
            return Ok(Self::new(Arc::clone(provider)));
        }

        let api_key = config.resolve_api_key()?;
        let explicit = config
            .api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty());

        let provider: Arc<dyn LLMProvider> = if explicit {
            Arc::new(OpenAIProvider::new(api_key).with_model(MODEL))
        } else {
            ProviderFactory::create_llm_provider("openai", MODEL).map_err(|e| {
                Bio2CsvError::ProviderNotConfigured {
                    provider: "openai".to_string(),
                    hint: format!("{e}"),
                }
            })?
        };
        debug!("LLM provider ready: {}", MODEL);
        Ok(Self::new(provider))
    }
}

impl CompletionClient for ProviderClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, String> {
        let messages = vec![ChatMessage::system(system), ChatMessage::user(user)];
        let start = Instant::now();

        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| e.to_string())?;

        debug!(
            "{} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );
        Ok(response.content)
    }
}

/// Sampling options shared by every request.
fn build_options() -> CompletionOptions {
    CompletionOptions {
        temperature: Some(TEMPERATURE),
        ..Default::default()
    }
}

/// Send one biography with the fixed system prompt.
pub async fn request_biography<C: CompletionClient>(client: &C, prompt: &str) -> Result<String, String> {
    client.complete(SYSTEM_PROMPT, prompt).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_options_uses_fixed_temperature() {
        let opts = build_options();
        assert_eq!(opts.temperature, Some(0.3));
        assert_eq!(opts.max_tokens, None);
    }

    #[test]
    fn from_config_without_key_is_fatal() {
        let config = PipelineConfig::builder().api_key("").build().unwrap();
        // Only meaningful when the environment fallback is unset too.
        if std::env::var(crate::config::API_KEY_ENV).map_or(true, |k| k.trim().is_empty()) {
            assert!(matches!(
                ProviderClient::from_config(&config),
                Err(Bio2CsvError::MissingCredential { .. })
            ));
        }
    }

    struct Echo;

    impl CompletionClient for Echo {
        async fn complete(&self, system: &str, user: &str) -> Result<String, String> {
            Ok(format!("{system}|{user}"))
        }
    }

    #[tokio::test]
    async fn request_uses_system_prompt() {
        let reply = request_biography(&Echo, "bio").await.unwrap();
        assert!(reply.starts_with(SYSTEM_PROMPT));
        assert!(reply.ends_with("|bio"));
    }
}
