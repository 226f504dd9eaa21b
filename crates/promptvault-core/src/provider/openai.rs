//! OpenAI-compatible chat completions provider.

use async_trait::async_trait;
use log::debug;
use promptvault_config::ProviderConfig;
use promptvault_protocol::{GenerationError, GenerationOutput, GenerationRequest, TextGenerator};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::env;

/// Provider that calls `POST {base_url}/chat/completions`.
#[derive(Debug, Clone)]
pub struct OpenAiGenerator {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenAiGenerator {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Build from config, reading the API key from `config.api_key_env`.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, GenerationError> {
        let api_key = env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| GenerationError::MissingApiKey(config.api_key_env.clone()))?;
        Ok(Self::new(config.base_url.clone(), api_key))
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationOutput, GenerationError> {
        let body = ChatCompletionRequest {
            model: &request.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            temperature: request.temperature,
            max_completion_tokens: request.max_tokens,
        };
        debug!(
            "sending chat completion (model={}, prompt_len={})",
            request.model,
            request.prompt.len()
        );
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| GenerationError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            return Err(map_http_error(status, &body));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| GenerationError::Decode(err.to_string()))?;
        extract_output(parsed)
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    total_tokens: u64,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn extract_output(response: ChatCompletionResponse) -> Result<GenerationOutput, GenerationError> {
    let output_text = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.is_empty())
        .ok_or(GenerationError::EmptyResponse)?;
    Ok(GenerationOutput {
        output_text,
        total_tokens: response.usage.map(|usage| usage.total_tokens).unwrap_or(0),
    })
}

fn map_http_error(status: StatusCode, body: &str) -> GenerationError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or_else(|_| body.to_string());
    GenerationError::Http {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn error_body_message_is_extracted() {
        let err = map_http_error(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"message":"slow down","type":"rate_limit"}}"#,
        );
        assert!(matches!(
            err,
            GenerationError::Http { status: 429, ref message } if message == "slow down"
        ));

        let err = map_http_error(StatusCode::BAD_GATEWAY, "upstream down");
        assert!(matches!(
            err,
            GenerationError::Http { status: 502, ref message } if message == "upstream down"
        ));
    }

    #[test]
    fn missing_content_is_an_error() {
        let response: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).expect("json");
        assert!(matches!(
            extract_output(response),
            Err(GenerationError::EmptyResponse)
        ));
    }

    #[test]
    fn usage_is_optional() {
        let response: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"hi"}}]}"#).expect("json");
        assert_eq!(
            extract_output(response).expect("output"),
            GenerationOutput {
                output_text: "hi".to_string(),
                total_tokens: 0
            }
        );
    }

    #[test]
    fn missing_api_key_is_reported() {
        let config = ProviderConfig {
            api_key_env: "PROMPTVAULT_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..ProviderConfig::default()
        };
        let err = OpenAiGenerator::from_config(&config).unwrap_err();
        assert!(matches!(err, GenerationError::MissingApiKey(name) if name == config.api_key_env));
    }
}
