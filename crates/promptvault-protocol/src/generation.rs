//! Contract for text-generation providers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single generation call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationRequest {
    /// Fully rendered prompt text.
    pub prompt: String,
    /// Model name.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Optional completion size limit.
    pub max_tokens: Option<u32>,
}

/// Text and usage returned by a provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationOutput {
    /// Generated text.
    pub output_text: String,
    /// Prompt plus completion tokens as reported by the provider.
    pub total_tokens: u64,
}

/// Errors returned by generation providers.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// No API key configured for the provider.
    #[error("missing api key: {0}")]
    MissingApiKey(String),
    /// The request never reached the provider or the connection dropped.
    #[error("transport error: {0}")]
    Transport(String),
    /// Provider answered with a non-success status.
    #[error("provider returned {status}: {message}")]
    Http { status: u16, message: String },
    /// Response body could not be decoded.
    #[error("failed to decode provider response: {0}")]
    Decode(String),
    /// Provider answered without any generated content.
    #[error("provider returned no content")]
    EmptyResponse,
    /// The call exceeded the configured deadline.
    #[error("provider call timed out after {0} ms")]
    Timeout(u64),
}

/// Text-generation backend used by the execution service.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Provider name, used for logging.
    fn name(&self) -> &str;

    /// Generate text for a rendered prompt.
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationOutput, GenerationError>;
}
