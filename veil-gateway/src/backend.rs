//! LLM backend abstraction
//!
//! Supports OpenAI-compatible chat completion APIs.

use std::sync::Arc;
use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use thiserror::Error;

/// LLM backend errors
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Empty response")]
    EmptyResponse,
}

/// A single chat completion request
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// A completed answer
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub content: String,
    /// Model id reported by the provider
    pub model: String,
    pub total_tokens: u32,
}

/// Generic LLM backend trait
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Run one chat completion
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError>;

    /// Backend name for logs
    fn name(&self) -> &str;
}

/// OpenAI-compatible backend configuration
#[derive(Debug, Clone)]
pub struct OpenAIBackendConfig {
    /// API key; empty means unset
    pub api_key: String,
    /// Base URL (for OpenRouter, local servers, etc.)
    pub base_url: Option<String>,
    /// HTTP request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OpenAIBackendConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: None,
            timeout_secs: 60,
        }
    }
}

impl OpenAIBackendConfig {
    pub fn openai(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            ..Default::default()
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = Some(base_url.to_string());
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// OpenAI-compatible LLM backend
pub struct OpenAIBackend {
    client: Client<OpenAIConfig>,
    has_key: bool,
}

impl OpenAIBackend {
    /// Build the client. A missing API key is not an error here: the server
    /// starts anyway and each completion reports it.
    pub fn new(config: OpenAIBackendConfig) -> Result<Self, LlmError> {
        let mut openai_config = OpenAIConfig::new().with_api_key(&config.api_key);

        if let Some(base_url) = &config.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Config(e.to_string()))?;

        let client = Client::with_config(openai_config).with_http_client(http);

        Ok(Self {
            client,
            has_key: !config.api_key.is_empty(),
        })
    }
}

#[async_trait]
impl LlmBackend for OpenAIBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        if !self.has_key {
            return Err(LlmError::Config("OPENAI_API_KEY is not set".to_string()));
        }

        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(request.system.as_str())
                    .build()
                    .map_err(|e| LlmError::Api(e.to_string()))?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(request.user.as_str())
                    .build()
                    .map_err(|e| LlmError::Api(e.to_string()))?,
            ),
        ];

        let body = CreateChatCompletionRequestArgs::default()
            .model(&request.model)
            .messages(messages)
            .temperature(request.temperature)
            .max_tokens(request.max_tokens)
            .build()
            .map_err(|e| LlmError::Api(e.to_string()))?;

        let response = self.client.chat().create(body).await.map_err(|e| {
            let message = e.to_string();
            if message.contains("rate_limit") || message.contains("insufficient_quota") {
                LlmError::RateLimited(message)
            } else {
                LlmError::Api(message)
            }
        })?;

        let choice = response.choices.first().ok_or(LlmError::EmptyResponse)?;
        let model = if response.model.is_empty() {
            request.model.clone()
        } else {
            response.model.clone()
        };

        Ok(Completion {
            content: choice.message.content.clone().unwrap_or_default(),
            model,
            total_tokens: response.usage.as_ref().map(|u| u.total_tokens).unwrap_or(0),
        })
    }

    fn name(&self) -> &str {
        "openai"
    }
}

/// Thread-safe reference to an LLM backend
pub type SharedBackend = Arc<dyn LlmBackend>;

/// Create a shared OpenAI-compatible backend
pub fn create_backend(config: OpenAIBackendConfig) -> Result<SharedBackend, LlmError> {
    Ok(Arc::new(OpenAIBackend::new(config)?))
}
