// ABOUTME: Environment-driven configuration for LLM providers, pipeline, jobs, titration, storage
// ABOUTME: Every struct defaults to the engine constants; bad numeric values fall back with a warning
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Environment-based configuration

use super::types::LlmProviderType;
use chrono::Duration;
use fitplan_core::constants::{jobs, pipeline, titration, trends};
use fitplan_intelligence::{BaselineConfig, TrendConfig};
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration as StdDuration;
use tracing::{info, warn};

/// Default request timeout for model calls (seconds)
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 120;

/// Default base URL for a local `OpenAI`-compatible server (Ollama)
pub const DEFAULT_LOCAL_BASE_URL: &str = "http://localhost:11434/v1";

/// Read `key` and parse it, keeping `default` when unset or invalid
fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(error) => {
                warn!("Invalid value '{raw}' for {key} ({error}), using default {default}");
                default
            }
        },
        Err(_) => default,
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Model-completion collaborator settings
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Providers in fallback order
    pub providers: Vec<LlmProviderType>,
    /// Model override applied to every provider
    pub model: Option<String>,
    /// Base URL of the local provider
    pub local_base_url: String,
    /// Groq API key
    pub groq_api_key: Option<String>,
    /// `OpenAI` API key
    pub openai_api_key: Option<String>,
    /// Optional key for the local provider
    pub local_api_key: Option<String>,
    /// Per-request timeout
    pub request_timeout: StdDuration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            providers: LlmProviderType::DEFAULT_ORDER.to_vec(),
            model: None,
            local_base_url: DEFAULT_LOCAL_BASE_URL.to_owned(),
            groq_api_key: None,
            openai_api_key: None,
            local_api_key: None,
            request_timeout: StdDuration::from_secs(DEFAULT_LLM_TIMEOUT_SECS),
        }
    }
}

impl LlmConfig {
    /// Load from `FITPLAN_LLM_PROVIDERS`, `FITPLAN_LLM_MODEL`, `LOCAL_LLM_BASE_URL`,
    /// the provider API keys and `FITPLAN_LLM_TIMEOUT_SECS`
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let providers = env_opt(LlmProviderType::ENV_VAR)
            .map(|value| LlmProviderType::parse_list(&value))
            .filter(|list| !list.is_empty())
            .unwrap_or(defaults.providers);

        Self {
            providers,
            model: env_opt("FITPLAN_LLM_MODEL"),
            local_base_url: env_opt("LOCAL_LLM_BASE_URL").unwrap_or(defaults.local_base_url),
            groq_api_key: env_opt("GROQ_API_KEY"),
            openai_api_key: env_opt("OPENAI_API_KEY"),
            local_api_key: env_opt("LOCAL_LLM_API_KEY"),
            request_timeout: StdDuration::from_secs(env_parse(
                "FITPLAN_LLM_TIMEOUT_SECS",
                DEFAULT_LLM_TIMEOUT_SECS,
            )),
        }
    }

    /// API key configured for a provider
    #[must_use]
    pub fn api_key_for(&self, provider: LlmProviderType) -> Option<&str> {
        match provider {
            LlmProviderType::Groq => self.groq_api_key.as_deref(),
            LlmProviderType::OpenAi => self.openai_api_key.as_deref(),
            LlmProviderType::Local => self.local_api_key.as_deref(),
        }
    }
}

/// Two-stage pipeline settings
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Total attempts
    pub max_attempts: u32,
    /// Fixed delay between attempts
    pub retry_delay: StdDuration,
    /// Token budget for stage 1
    pub generation_max_tokens: u32,
    /// Token budget for the stage 2 fixer
    pub fix_max_tokens: u32,
    /// Temperature for stage 1
    pub generation_temperature: f32,
    /// Temperature for the fixer
    pub fix_temperature: f32,
    /// More missing sections than this is structural damage
    pub max_repairable_missing_sections: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_attempts: pipeline::MAX_ATTEMPTS,
            retry_delay: StdDuration::from_millis(pipeline::RETRY_DELAY_MS),
            generation_max_tokens: pipeline::GENERATION_MAX_TOKENS,
            fix_max_tokens: pipeline::FIX_MAX_TOKENS,
            generation_temperature: pipeline::GENERATION_TEMPERATURE,
            fix_temperature: pipeline::REPAIR_TEMPERATURE,
            max_repairable_missing_sections: pipeline::MAX_REPAIRABLE_MISSING_SECTIONS,
        }
    }
}

impl PipelineConfig {
    /// Load from `FITPLAN_MAX_ATTEMPTS`, `FITPLAN_RETRY_DELAY_MS`,
    /// `FITPLAN_GENERATION_MAX_TOKENS`, `FITPLAN_FIX_MAX_TOKENS` and
    /// `FITPLAN_GENERATION_TEMPERATURE`
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let max_attempts = env_parse("FITPLAN_MAX_ATTEMPTS", defaults.max_attempts).max(1);
        Self {
            max_attempts,
            retry_delay: StdDuration::from_millis(env_parse(
                "FITPLAN_RETRY_DELAY_MS",
                pipeline::RETRY_DELAY_MS,
            )),
            generation_max_tokens: env_parse(
                "FITPLAN_GENERATION_MAX_TOKENS",
                defaults.generation_max_tokens,
            ),
            fix_max_tokens: env_parse("FITPLAN_FIX_MAX_TOKENS", defaults.fix_max_tokens),
            generation_temperature: env_parse(
                "FITPLAN_GENERATION_TEMPERATURE",
                defaults.generation_temperature,
            ),
            ..defaults
        }
    }

    /// Settings for tests: no inter-attempt delay
    #[must_use]
    pub fn without_delay() -> Self {
        Self {
            retry_delay: StdDuration::ZERO,
            ..Self::default()
        }
    }
}

/// Job orchestration settings
#[derive(Debug, Clone)]
pub struct JobConfig {
    /// Age after which a pending job is considered stale (seconds)
    pub staleness_window_secs: i64,
    /// Tolerance added to the window (seconds)
    pub staleness_grace_secs: i64,
    /// Redos allowed per calendar day
    pub redo_daily_quota: u32,
    /// Archived plans kept per user
    pub archive_retention: usize,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            staleness_window_secs: jobs::STALENESS_WINDOW_SECS,
            staleness_grace_secs: jobs::STALENESS_GRACE_SECS,
            redo_daily_quota: jobs::REDO_DAILY_QUOTA,
            archive_retention: jobs::ARCHIVE_RETENTION,
        }
    }
}

impl JobConfig {
    /// Load from `FITPLAN_STALENESS_WINDOW_SECS`, `FITPLAN_STALENESS_GRACE_SECS`,
    /// `FITPLAN_REDO_DAILY_QUOTA` and `FITPLAN_ARCHIVE_RETENTION`
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            staleness_window_secs: env_parse(
                "FITPLAN_STALENESS_WINDOW_SECS",
                defaults.staleness_window_secs,
            ),
            staleness_grace_secs: env_parse(
                "FITPLAN_STALENESS_GRACE_SECS",
                defaults.staleness_grace_secs,
            ),
            redo_daily_quota: env_parse("FITPLAN_REDO_DAILY_QUOTA", defaults.redo_daily_quota),
            archive_retention: env_parse("FITPLAN_ARCHIVE_RETENTION", defaults.archive_retention),
        }
    }

    /// Staleness window as a chrono duration
    #[must_use]
    pub fn staleness_window(&self) -> Duration {
        Duration::seconds(self.staleness_window_secs)
    }

    /// Grace period as a chrono duration
    #[must_use]
    pub fn staleness_grace(&self) -> Duration {
        Duration::seconds(self.staleness_grace_secs)
    }
}

/// Daily titration settings
#[derive(Debug, Clone)]
pub struct TitrationConfig {
    /// Deterministic baseline thresholds
    pub baseline: BaselineConfig,
    /// Trend memory parameters
    pub trend: TrendConfig,
    /// Token budget for the refinement call
    pub max_tokens: u32,
    /// Temperature for the refinement call
    pub temperature: f32,
}

impl Default for TitrationConfig {
    fn default() -> Self {
        Self {
            baseline: BaselineConfig::default(),
            trend: TrendConfig::default(),
            max_tokens: pipeline::TITRATION_MAX_TOKENS,
            temperature: pipeline::REPAIR_TEMPERATURE,
        }
    }
}

impl TitrationConfig {
    /// Load from `FITPLAN_LOW_ENERGY_THRESHOLD`, `FITPLAN_HIGH_STRESS_THRESHOLD`,
    /// `FITPLAN_TITRATION_MAX_TOKENS` and `FITPLAN_STREAK_RED_FLAG_DAYS`
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let baseline = BaselineConfig {
            low_energy_threshold: env_parse(
                "FITPLAN_LOW_ENERGY_THRESHOLD",
                titration::LOW_ENERGY_THRESHOLD,
            ),
            high_stress_threshold: env_parse(
                "FITPLAN_HIGH_STRESS_THRESHOLD",
                titration::HIGH_STRESS_THRESHOLD,
            ),
            ..defaults.baseline
        };
        let trend = TrendConfig {
            streak_red_flag_days: env_parse(
                "FITPLAN_STREAK_RED_FLAG_DAYS",
                trends::STREAK_RED_FLAG_DAYS,
            ),
            ..defaults.trend
        };
        Self {
            baseline,
            trend,
            max_tokens: env_parse("FITPLAN_TITRATION_MAX_TOKENS", defaults.max_tokens),
            temperature: defaults.temperature,
        }
    }
}

/// Persistence settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// sqlx connection URL
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".to_owned(),
        }
    }
}

impl DatabaseConfig {
    /// Load from `DATABASE_URL`
    #[must_use]
    pub fn from_env() -> Self {
        env_opt("DATABASE_URL").map_or_else(Self::default, |url| Self { url })
    }

    /// Whether the URL points at an in-memory database
    #[must_use]
    pub fn is_memory(&self) -> bool {
        self.url.contains(":memory:")
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Model providers
    pub llm: LlmConfig,
    /// Generation pipeline
    pub pipeline: PipelineConfig,
    /// Job orchestration
    pub jobs: JobConfig,
    /// Daily titration
    pub titration: TitrationConfig,
    /// Persistence
    pub database: DatabaseConfig,
}

impl EngineConfig {
    /// Load every section from the environment
    #[must_use]
    pub fn from_env() -> Self {
        let config = Self {
            llm: LlmConfig::from_env(),
            pipeline: PipelineConfig::from_env(),
            jobs: JobConfig::from_env(),
            titration: TitrationConfig::from_env(),
            database: DatabaseConfig::from_env(),
        };
        info!("Loaded engine configuration: {}", config.summary());
        config
    }

    /// One-line summary without secrets
    #[must_use]
    pub fn summary(&self) -> String {
        let providers: Vec<String> = self.llm.providers.iter().map(ToString::to_string).collect();
        format!(
            "providers=[{}] model={} attempts={} retry_delay_ms={} staleness={}s+{}s redo_quota={} archive_retention={} database={}",
            providers.join(","),
            self.llm.model.as_deref().unwrap_or("<provider default>"),
            self.pipeline.max_attempts,
            self.pipeline.retry_delay.as_millis(),
            self.jobs.staleness_window_secs,
            self.jobs.staleness_grace_secs,
            self.jobs.redo_daily_quota,
            self.jobs.archive_retention,
            if self.database.is_memory() { "memory" } else { "file" },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_list_parsing_skips_unknown_and_duplicates() {
        let providers = LlmProviderType::parse_list("groq, bogus,ollama,groq");
        assert_eq!(providers, vec![LlmProviderType::Groq, LlmProviderType::Local]);
    }

    #[test]
    fn test_defaults_match_constants() {
        let config = EngineConfig::default();
        assert_eq!(config.pipeline.max_attempts, 2);
        assert_eq!(config.pipeline.retry_delay, StdDuration::from_secs(3));
        assert_eq!(config.jobs.staleness_window(), Duration::minutes(15));
        assert_eq!(config.jobs.staleness_grace(), Duration::seconds(30));
        assert_eq!(config.jobs.archive_retention, 12);
        assert_eq!(config.titration.max_tokens, 3_000);
        assert!(config.database.is_memory());
    }
}
