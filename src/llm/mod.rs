// ABOUTME: Model-completion collaborator: provider trait, chat message types, and fallback chain
// ABOUTME: The engine sees one opaque completion call with a single failure mode
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # LLM Provider Interface
//!
//! - **`LlmProvider`**: async trait for a single chat completion
//! - **`ChatMessage`**: role-tagged message
//! - **`ChatRequest`**: messages plus model, temperature and token budget
//! - **`FallbackProvider`**: tries providers in order, first success wins
//!
//! ## Example
//!
//! ```rust,no_run
//! use fitplan_engine::llm::{ChatMessage, ChatRequest, LlmProvider};
//!
//! async fn example(provider: &dyn LlmProvider) {
//!     let request = ChatRequest::new(vec![
//!         ChatMessage::system("Return JSON only."),
//!         ChatMessage::user("Build a 7-day plan."),
//!     ])
//!     .with_max_tokens(8_000);
//!     let response = provider.complete(&request).await;
//! }
//! ```

mod openai_compatible;
pub mod prompts;
mod provider;

pub use openai_compatible::{OpenAiCompatibleConfig, OpenAiCompatibleProvider};
pub use provider::FallbackProvider;

use crate::errors::AppResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Who a prompt message speaks for
///
/// The engine only ever sends an instruction followed by one payload, so
/// there is no assistant turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Prompt template (generation, fix, titration)
    System,
    /// JSON payload built from the profile, plan or check-in
    User,
}

/// One message of a completion request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Sender
    pub role: MessageRole,
    /// Text
    pub content: String,
}

impl ChatMessage {
    /// Prompt template message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// Payload message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// A single completion call: prompt, payload, and sampling limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Prompt and payload messages
    pub messages: Vec<ChatMessage>,
    /// Model override; providers use their default when absent
    pub model: Option<String>,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Output token budget
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    /// Request over `messages` with provider defaults
    #[must_use]
    pub const fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            model: None,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Pin the model when the engine configuration names one
    #[must_use]
    pub fn with_optional_model(mut self, model: Option<&str>) -> Self {
        self.model = model.map(str::to_owned);
        self
    }

    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Raw model answer; the plan modules parse and repair `content`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Text as returned, possibly fenced, chatty or truncated
    pub content: String,
    /// Model that answered
    pub model: String,
    /// Token accounting when the provider reports it
    pub usage: Option<TokenUsage>,
    /// Provider finish reason ("stop", "length")
    pub finish_reason: Option<String>,
}

impl ChatResponse {
    /// Output hit the token budget; JSON is likely cut mid-document
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.finish_reason.as_deref() == Some("length")
    }
}

/// Token counts reported by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt tokens
    pub prompt_tokens: u32,
    /// Completion tokens
    pub completion_tokens: u32,
    /// Sum of both
    pub total_tokens: u32,
}

/// The single opaque completion call the engine depends on
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider identifier used in logs ("groq", "openai", "local")
    fn name(&self) -> &str;

    /// Default model used when the request does not name one
    fn default_model(&self) -> &str;

    /// Send the request and return the raw answer
    ///
    /// # Errors
    ///
    /// Any transport, status or decoding failure; callers treat all of them
    /// alike
    async fn complete(&self, request: &ChatRequest) -> AppResult<ChatResponse>;
}
