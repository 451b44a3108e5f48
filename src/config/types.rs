// ABOUTME: Configuration type definitions shared by the environment loaders
// ABOUTME: LLM provider kinds and their fallback-order parsing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use tracing::warn;

/// LLM backend reachable through the `OpenAI`-compatible chat completions API
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderType {
    /// Groq - LPU-accelerated inference for open models
    Groq,
    /// `OpenAI` cloud API
    OpenAi,
    /// Local `OpenAI`-compatible endpoint (Ollama, vLLM, `LocalAI`)
    Local,
}

impl LlmProviderType {
    /// Environment variable holding the comma-separated fallback order
    pub const ENV_VAR: &'static str = "FITPLAN_LLM_PROVIDERS";

    /// Default fallback order
    pub const DEFAULT_ORDER: [Self; 2] = [Self::Groq, Self::Local];

    /// Parse a comma-separated provider list, skipping unknown names with a warning
    #[must_use]
    pub fn parse_list(value: &str) -> Vec<Self> {
        let mut providers = Vec::new();
        for name in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match name.parse::<Self>() {
                Ok(provider) if !providers.contains(&provider) => providers.push(provider),
                Ok(_) => {}
                Err(error) => warn!("{}: {error}", Self::ENV_VAR),
            }
        }
        providers
    }
}

impl FromStr for LlmProviderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "groq" => Ok(Self::Groq),
            "openai" => Ok(Self::OpenAi),
            "local" | "ollama" | "vllm" | "localai" => Ok(Self::Local),
            other => Err(format!("unknown LLM provider '{other}'")),
        }
    }
}

impl Display for LlmProviderType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Groq => write!(f, "groq"),
            Self::OpenAi => write!(f, "openai"),
            Self::Local => write!(f, "local"),
        }
    }
}
