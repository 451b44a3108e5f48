// ABOUTME: OpenAI-compatible chat completions provider for Groq, OpenAI, and local endpoints
// ABOUTME: Maps HTTP and API failures onto AppError with the provider name attached
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # `OpenAI`-Compatible Provider
//!
//! One implementation for every endpoint speaking the `OpenAI` chat
//! completions API:
//!
//! - **Groq**: <https://api.groq.com/openai/v1>
//! - **`OpenAI`**: <https://api.openai.com/v1>
//! - **Local** (Ollama, vLLM, `LocalAI`): <http://localhost:11434/v1> by default

use super::{ChatMessage, ChatRequest, ChatResponse, LlmProvider, TokenUsage};
use crate::config::{LlmConfig, LlmProviderType};
use crate::errors::{AppError, AppResult, ErrorCode};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, instrument};

/// Groq API base URL
const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Default Groq model
const GROQ_DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// `OpenAI` API base URL
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default `OpenAI` model
const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default model for local inference
const LOCAL_DEFAULT_MODEL: &str = "qwen2.5:14b-instruct";

/// Connection timeout
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Request body; engine messages already serialize in the wire shape
#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorResponse {
    error: OpenAiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
}

/// Endpoint settings for one provider
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleConfig {
    /// Base URL for the API
    pub base_url: String,
    /// Bearer token (optional for local servers)
    pub api_key: Option<String>,
    /// Model used when the request does not name one
    pub default_model: String,
    /// Provider name for logs and errors
    pub provider_name: String,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl OpenAiCompatibleConfig {
    /// Groq cloud endpoint
    #[must_use]
    pub fn groq(api_key: impl Into<String>) -> Self {
        Self {
            base_url: GROQ_BASE_URL.to_owned(),
            api_key: Some(api_key.into()),
            default_model: GROQ_DEFAULT_MODEL.to_owned(),
            provider_name: LlmProviderType::Groq.to_string(),
            request_timeout: Duration::from_secs(120),
        }
    }

    /// `OpenAI` cloud endpoint
    #[must_use]
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self {
            base_url: OPENAI_BASE_URL.to_owned(),
            api_key: Some(api_key.into()),
            default_model: OPENAI_DEFAULT_MODEL.to_owned(),
            provider_name: LlmProviderType::OpenAi.to_string(),
            request_timeout: Duration::from_secs(120),
        }
    }

    /// Local `OpenAI`-compatible server
    #[must_use]
    pub fn local(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
            default_model: LOCAL_DEFAULT_MODEL.to_owned(),
            provider_name: LlmProviderType::Local.to_string(),
            request_timeout: Duration::from_secs(300),
        }
    }

    /// Build the endpoint for `provider` from engine configuration
    ///
    /// # Errors
    ///
    /// Returns a config error when a cloud provider has no API key
    pub fn for_provider(provider: LlmProviderType, config: &LlmConfig) -> AppResult<Self> {
        let mut endpoint = match provider {
            LlmProviderType::Local => {
                Self::local(&config.local_base_url, config.local_api_key.clone())
            }
            LlmProviderType::Groq | LlmProviderType::OpenAi => {
                let key = config.api_key_for(provider).ok_or_else(|| {
                    AppError::config(format!("no API key configured for {provider}"))
                })?;
                if provider == LlmProviderType::Groq {
                    Self::groq(key)
                } else {
                    Self::openai(key)
                }
            }
        };
        if let Some(model) = &config.model {
            endpoint.default_model.clone_from(model);
        }
        endpoint.request_timeout = config.request_timeout;
        Ok(endpoint)
    }
}

/// Chat completions client for one endpoint
pub struct OpenAiCompatibleProvider {
    client: Client,
    config: OpenAiCompatibleConfig,
}

impl OpenAiCompatibleProvider {
    /// Create a provider with the given configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: OpenAiCompatibleConfig) -> AppResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {e}")))?;
        info!(
            "Initializing {} provider: base_url={}, model={}",
            config.provider_name, config.base_url, config.default_model
        );
        Ok(Self { client, config })
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), endpoint)
    }

    fn add_auth_header(&self, request: RequestBuilder) -> RequestBuilder {
        if let Some(ref api_key) = self.config.api_key {
            request.header("Authorization", format!("Bearer {api_key}"))
        } else {
            request
        }
    }

    fn parse_error_response(&self, status: StatusCode, body: &str) -> AppError {
        let service = self.config.provider_name.as_str();
        let Ok(error_response) = serde_json::from_str::<OpenAiErrorResponse>(body) else {
            return AppError::external_service(
                service,
                format!(
                    "API error ({status}): {}",
                    body.chars().take(200).collect::<String>()
                ),
            );
        };
        let detail = error_response.error.message;
        match status.as_u16() {
            401 => AppError::auth_invalid(format!("{service} authentication failed: {detail}")),
            429 => AppError::new(
                ErrorCode::ExternalServiceUnavailable,
                format!("{service} rate limit reached: {detail}"),
            ),
            404 => AppError::not_found(format!("{service} model or endpoint: {detail}")),
            _ => AppError::external_service(
                service,
                format!(
                    "{} - {detail}",
                    error_response
                        .error
                        .error_type
                        .unwrap_or_else(|| "unknown".to_owned())
                ),
            ),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.config.provider_name
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }

    #[instrument(skip(self, request), fields(provider = %self.config.provider_name, model = %request.model.as_deref().unwrap_or(&self.config.default_model)))]
    async fn complete(&self, request: &ChatRequest) -> AppResult<ChatResponse> {
        let service = self.config.provider_name.as_str();
        let model = request
            .model
            .as_deref()
            .unwrap_or(&self.config.default_model);

        let body = OpenAiRequest {
            model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: false,
        };
        debug!(
            messages = body.messages.len(),
            max_tokens = ?body.max_tokens,
            "Sending chat completion request"
        );

        let http_request = self
            .client
            .post(self.api_url("chat/completions"))
            .header("Content-Type", "application/json")
            .json(&body);
        let response = self
            .add_auth_header(http_request)
            .send()
            .await
            .map_err(|e| {
                error!("Failed to send request to {service}: {e}");
                if e.is_connect() {
                    AppError::external_service(
                        service,
                        format!("Cannot connect to {}", self.config.base_url),
                    )
                } else if e.is_timeout() {
                    AppError::external_service(service, "Request timed out")
                } else {
                    AppError::external_service(service, format!("Failed to connect: {e}"))
                }
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            AppError::external_service(service, format!("Failed to read response: {e}"))
        })?;
        if !status.is_success() {
            return Err(self.parse_error_response(status, &text));
        }

        let parsed: OpenAiResponse = serde_json::from_str(&text).map_err(|e| {
            error!(
                "Failed to parse API response: {e} - body: {}",
                text.chars().take(500).collect::<String>()
            );
            AppError::external_service(service, format!("Failed to parse response: {e}"))
        })?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AppError::external_service(service, "API returned no choices"))?;
        let content = choice
            .message
            .content
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| AppError::external_service(service, "API returned empty content"))?;

        debug!(
            content_len = content.len(),
            finish_reason = ?choice.finish_reason,
            "Received chat completion"
        );

        Ok(ChatResponse {
            content,
            model: parsed.model,
            usage: parsed.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            finish_reason: choice.finish_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cloud_provider_requires_key() {
        let config = LlmConfig::default();
        assert!(OpenAiCompatibleConfig::for_provider(LlmProviderType::Groq, &config).is_err());

        let config = LlmConfig {
            groq_api_key: Some("gsk_test".to_owned()),
            model: Some("llama-3.1-8b-instant".to_owned()),
            ..LlmConfig::default()
        };
        let endpoint = OpenAiCompatibleConfig::for_provider(LlmProviderType::Groq, &config).unwrap();
        assert_eq!(endpoint.base_url, GROQ_BASE_URL);
        assert_eq!(endpoint.default_model, "llama-3.1-8b-instant");
    }

    #[test]
    fn test_request_body_uses_wire_roles() {
        let messages = vec![ChatMessage::system("rules"), ChatMessage::user("{}")];
        let body = OpenAiRequest {
            model: "m",
            messages: &messages,
            temperature: None,
            max_tokens: Some(10),
            stream: false,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["role"], "user");
        assert!(value.get("temperature").is_none());
        assert_eq!(value["max_tokens"], 10);
    }

    #[test]
    fn test_local_provider_needs_no_key() {
        let endpoint =
            OpenAiCompatibleConfig::for_provider(LlmProviderType::Local, &LlmConfig::default())
                .unwrap();
        assert_eq!(endpoint.base_url, "http://localhost:11434/v1");
        assert!(endpoint.api_key.is_none());
    }

    #[test]
    fn test_error_body_mapping() {
        let provider =
            OpenAiCompatibleProvider::new(OpenAiCompatibleConfig::groq("gsk_test")).unwrap();
        let body = r#"{"error":{"message":"bad key","type":"invalid_request_error"}}"#;
        let error = provider.parse_error_response(StatusCode::UNAUTHORIZED, body);
        assert_eq!(error.code, ErrorCode::AuthInvalid);

        let error = provider.parse_error_response(StatusCode::BAD_GATEWAY, "<html>");
        assert_eq!(error.code, ErrorCode::ExternalServiceError);
    }
}
