use async_trait::async_trait;
use parking_lot::Mutex;
use promptvault_protocol::{GenerationError, GenerationOutput, GenerationRequest, TextGenerator};
use std::sync::Arc;
use std::time::Duration;

/// Always answers with the same text and token count.
#[derive(Debug, Clone)]
pub struct FixedGenerator {
    output: String,
    total_tokens: u64,
}

impl FixedGenerator {
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            total_tokens: 42,
        }
    }

    pub fn with_tokens(mut self, total_tokens: u64) -> Self {
        self.total_tokens = total_tokens;
        self
    }
}

#[async_trait]
impl TextGenerator for FixedGenerator {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn generate(
        &self,
        _request: &GenerationRequest,
    ) -> Result<GenerationOutput, GenerationError> {
        Ok(GenerationOutput {
            output_text: self.output.clone(),
            total_tokens: self.total_tokens,
        })
    }
}

/// Echoes the prompt back and records every request it receives.
#[derive(Debug, Clone)]
pub struct RecordingGenerator {
    seen: Arc<Mutex<Vec<GenerationRequest>>>,
}

impl RecordingGenerator {
    pub fn new() -> (Self, Arc<Mutex<Vec<GenerationRequest>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        (Self { seen: seen.clone() }, seen)
    }
}

#[async_trait]
impl TextGenerator for RecordingGenerator {
    fn name(&self) -> &str {
        "recording"
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationOutput, GenerationError> {
        self.seen.lock().push(request.clone());
        Ok(GenerationOutput {
            output_text: format!("echo: {}", request.prompt),
            total_tokens: request.prompt.split_whitespace().count() as u64,
        })
    }
}

/// Fails every call with an HTTP error.
#[derive(Debug, Clone)]
pub struct FailingGenerator {
    status: u16,
    message: String,
}

impl FailingGenerator {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: 500,
            message: message.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }
}

#[async_trait]
impl TextGenerator for FailingGenerator {
    fn name(&self) -> &str {
        "failing"
    }

    async fn generate(
        &self,
        _request: &GenerationRequest,
    ) -> Result<GenerationOutput, GenerationError> {
        Err(GenerationError::Http {
            status: self.status,
            message: self.message.clone(),
        })
    }
}

/// Sleeps before answering; used to exercise timeouts and lock scope.
#[derive(Debug, Clone)]
pub struct SlowGenerator {
    delay: Duration,
    output: String,
}

impl SlowGenerator {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            output: "slow".to_string(),
        }
    }
}

#[async_trait]
impl TextGenerator for SlowGenerator {
    fn name(&self) -> &str {
        "slow"
    }

    async fn generate(
        &self,
        _request: &GenerationRequest,
    ) -> Result<GenerationOutput, GenerationError> {
        tokio::time::sleep(self.delay).await;
        Ok(GenerationOutput {
            output_text: self.output.clone(),
            total_tokens: 1,
        })
    }
}
