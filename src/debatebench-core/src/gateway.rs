//! Model gateway: the single capability used to talk to language models.
//!
//! Debaters and judges only ever see [`ModelGateway`]. Retrying transient
//! failures is the gateway's business; callers never retry with stale
//! context.

use std::sync::Arc;
use std::time::Duration;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestUserMessage, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::GatewayConfig;
use crate::error::{DebateError, GatewayError};

/// One text generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    pub temperature: f32,
    pub system_prompt: Option<String>,
    pub max_tokens: Option<u32>,
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>, temperature: f32) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            temperature,
            system_prompt: None,
            max_tokens: None,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// `generate(prompt, temperature, model_id) -> text`.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GatewayError>;
}

pub type SharedGateway = Arc<dyn ModelGateway>;

/// Run one gateway call under a deadline. An elapsed deadline is a
/// [`GatewayError::Timeout`].
pub async fn generate_with_timeout(
    gateway: &dyn ModelGateway,
    request: GenerationRequest,
    timeout: Duration,
) -> Result<String, GatewayError> {
    match tokio::time::timeout(timeout, gateway.generate(request)).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::Timeout(timeout)),
    }
}

/// Gateway backed by any OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct OpenAiGateway {
    client: Client<OpenAIConfig>,
    max_retries: u32,
    retry_base_delay: Duration,
}

impl OpenAiGateway {
    pub fn new(config: &GatewayConfig, api_key: &str) -> Result<Self, DebateError> {
        let http_client = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| {
                DebateError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(&config.api_base);

        Ok(Self {
            client: Client::with_config(openai_config).with_http_client(http_client),
            max_retries: config.max_retries,
            retry_base_delay: Duration::from_millis(config.retry_base_delay_ms),
        })
    }

    async fn complete_once(&self, request: &GenerationRequest) -> Result<String, GatewayError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system_prompt {
            messages.push(ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessage {
                    content: system.clone().into(),
                    name: None,
                },
            ));
        }
        messages.push(ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessage {
                content: request.prompt.clone().into(),
                name: None,
            },
        ));

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&request.model)
            .temperature(request.temperature)
            .messages(messages);
        if let Some(max_tokens) = request.max_tokens {
            args.max_completion_tokens(max_tokens);
        }
        let chat_request = args
            .build()
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        let response = self.client.chat().create(chat_request).await?;
        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(GatewayError::EmptyResponse {
                model: request.model.clone(),
            });
        }
        Ok(content)
    }
}

#[async_trait]
impl ModelGateway for OpenAiGateway {
    /// Retries transient failures with exponential backoff: base, 2x base, 4x base...
    async fn generate(&self, request: GenerationRequest) -> Result<String, GatewayError> {
        let mut attempt = 0;
        loop {
            match self.complete_once(&request).await {
                Ok(content) => {
                    debug!(
                        model = %request.model,
                        attempt,
                        chars = content.len(),
                        "Gateway call succeeded"
                    );
                    return Ok(content);
                }
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let delay = self.retry_base_delay * 2u32.saturating_pow(attempt);
                    warn!(
                        model = %request.model,
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        error = %e,
                        "Gateway call failed, retrying in {:?}",
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedGateway;

    #[tokio::test]
    async fn test_timeout_is_gateway_error() {
        let gateway =
            ScriptedGateway::new(|_| Ok("late".to_string())).with_delay(Duration::from_secs(5));
        let err = generate_with_timeout(
            &gateway,
            GenerationRequest::new("m", "p", 0.0),
            Duration::from_millis(20),
        )
        .await
        .unwrap_err();
        assert_eq!(err, GatewayError::Timeout(Duration::from_millis(20)));
    }

    #[tokio::test]
    async fn test_fast_call_passes_through() {
        let gateway = ScriptedGateway::new(|req| Ok(format!("echo {}", req.model)));
        let text = generate_with_timeout(
            &gateway,
            GenerationRequest::new("m1", "p", 0.0),
            Duration::from_secs(1),
        )
        .await
        .unwrap();
        assert_eq!(text, "echo m1");
    }

    #[test]
    fn test_request_builder() {
        let req = GenerationRequest::new("m", "p", 0.3)
            .with_system_prompt("sys")
            .with_max_tokens(600);
        assert_eq!(req.system_prompt.as_deref(), Some("sys"));
        assert_eq!(req.max_tokens, Some(600));
    }

    #[test]
    fn test_request_errors_are_not_transient() {
        assert!(!GatewayError::Request("bad".into()).is_transient());
        assert!(GatewayError::RateLimited("slow down".into()).is_transient());
        assert!(GatewayError::Timeout(Duration::from_secs(1)).is_transient());
    }
}
