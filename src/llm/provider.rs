// ABOUTME: Ordered provider chain presented to the engine as a single completion call
// ABOUTME: Tries each configured provider in turn and returns the first success
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Fallback Provider
//!
//! Built from `FITPLAN_LLM_PROVIDERS` (default `groq,local`). Providers that
//! cannot be constructed (missing API key) are skipped at startup with a
//! warning. At call time every failure is logged and the next provider is
//! tried; only when all fail does the caller see an error.

use super::{ChatRequest, ChatResponse, LlmProvider, OpenAiCompatibleConfig, OpenAiCompatibleProvider};
use crate::config::LlmConfig;
use crate::errors::{AppError, AppResult};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Providers tried in order until one answers
pub struct FallbackProvider {
    providers: Vec<Arc<dyn LlmProvider>>,
}

impl FallbackProvider {
    /// Wrap an explicit provider list
    ///
    /// # Errors
    ///
    /// Returns a config error when the list is empty
    pub fn new(providers: Vec<Arc<dyn LlmProvider>>) -> AppResult<Self> {
        if providers.is_empty() {
            return Err(AppError::config("no LLM providers available"));
        }
        Ok(Self { providers })
    }

    /// Build every provider named in the configuration
    ///
    /// # Errors
    ///
    /// Returns a config error when none of the configured providers can be built
    pub fn from_config(config: &LlmConfig) -> AppResult<Self> {
        let mut providers: Vec<Arc<dyn LlmProvider>> = Vec::new();
        for kind in &config.providers {
            match OpenAiCompatibleConfig::for_provider(*kind, config)
                .and_then(OpenAiCompatibleProvider::new)
            {
                Ok(provider) => providers.push(Arc::new(provider)),
                Err(e) => warn!("Skipping LLM provider {kind}: {e}"),
            }
        }
        info!(
            "LLM fallback order: {}",
            providers
                .iter()
                .map(|p| p.name().to_owned())
                .collect::<Vec<_>>()
                .join(" -> ")
        );
        Self::new(providers)
    }

    /// Number of providers in the chain
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Always false; construction rejects empty chains
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl fmt::Debug for FallbackProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackProvider")
            .field(
                "providers",
                &self.providers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[async_trait]
impl LlmProvider for FallbackProvider {
    fn name(&self) -> &str {
        self.providers.first().map_or("none", |p| p.name())
    }

    fn default_model(&self) -> &str {
        self.providers.first().map_or("", |p| p.default_model())
    }

    async fn complete(&self, request: &ChatRequest) -> AppResult<ChatResponse> {
        let mut failures = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            match provider.complete(request).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    warn!(provider = provider.name(), "LLM provider failed: {e}");
                    failures.push(format!("{}: {}", provider.name(), e.message));
                }
            }
        }
        Err(AppError::external_service(
            "llm",
            format!("all providers failed ({})", failures.join("; ")),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatMessage;
    use crate::test_utils::MockLlmProvider;

    #[tokio::test]
    async fn test_falls_through_to_next_provider() {
        let first = Arc::new(MockLlmProvider::new());
        first.push_failure("connection refused");
        let second = Arc::new(MockLlmProvider::new());
        second.push_response("{\"ok\":true}");

        let chain = FallbackProvider::new(vec![first.clone(), second.clone()]).unwrap();
        let response = chain
            .complete(&ChatRequest::new(vec![ChatMessage::user("hi")]))
            .await
            .unwrap();
        assert_eq!(response.content, "{\"ok\":true}");
        assert_eq!(first.call_count(), 1);
        assert_eq!(second.call_count(), 1);
    }

    #[tokio::test]
    async fn test_all_failures_surface_one_error() {
        let only = Arc::new(MockLlmProvider::new());
        only.push_failure("timeout");
        let chain = FallbackProvider::new(vec![only]).unwrap();
        let error = chain
            .complete(&ChatRequest::new(vec![ChatMessage::user("hi")]))
            .await
            .unwrap_err();
        assert!(error.message.contains("all providers failed"));
    }

    #[test]
    fn test_empty_chain_is_rejected() {
        assert!(FallbackProvider::new(Vec::new()).is_err());
    }
}
