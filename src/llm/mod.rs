//! Text generation abstraction layer
//!
//! Stages talk to a `TextGenerator` trait object; the concrete backend is
//! an implementation detail. `FallbackGenerator` chains a primary and an
//! optional fallback provider, bounding every call with a timeout.

mod ollama;

pub use ollama::OllamaGenerator;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

/// Text generation failure
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("generation timed out")]
    Timeout,

    #[error("provider error: {0}")]
    Provider(String),

    #[error("all providers failed: {0}")]
    AllProvidersFailed(String),
}

/// Trait for text-generation backends
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Send a prompt and get the raw completion text
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Provider name, for logging
    fn name(&self) -> &str;
}

/// Primary-then-fallback provider chain with per-call timeout
pub struct FallbackGenerator {
    primary: Arc<dyn TextGenerator>,
    fallback: Option<Arc<dyn TextGenerator>>,
    timeout: Duration,
}

impl FallbackGenerator {
    pub fn new(primary: Arc<dyn TextGenerator>, timeout: Duration) -> Self {
        Self {
            primary,
            fallback: None,
            timeout,
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn TextGenerator>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    async fn call_bounded(
        &self,
        provider: &dyn TextGenerator,
        prompt: &str,
    ) -> Result<String, GenerationError> {
        match tokio::time::timeout(self.timeout, provider.generate(prompt)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(provider = provider.name(), "Generation timed out");
                Err(GenerationError::Timeout)
            }
        }
    }
}

#[async_trait]
impl TextGenerator for FallbackGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let primary_err = match self.call_bounded(self.primary.as_ref(), prompt).await {
            Ok(text) => return Ok(text),
            Err(e) => {
                tracing::warn!(
                    provider = self.primary.name(),
                    error = %e,
                    "Primary provider failed"
                );
                e
            }
        };

        let Some(fallback) = &self.fallback else {
            return Err(GenerationError::AllProvidersFailed(primary_err.to_string()));
        };

        tracing::info!(provider = fallback.name(), "Trying fallback provider");
        match self.call_bounded(fallback.as_ref(), prompt).await {
            Ok(text) => Ok(text),
            Err(e) => {
                tracing::error!(provider = fallback.name(), error = %e, "Fallback provider failed");
                Err(GenerationError::AllProvidersFailed(e.to_string()))
            }
        }
    }

    fn name(&self) -> &str {
        "fallback-chain"
    }
}
