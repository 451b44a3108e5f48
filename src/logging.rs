// ABOUTME: Logging configuration and structured tracing setup for the plan engine
// ABOUTME: Env-driven level and format, with HTTP and SQL crates capped at warn
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Structured logging configuration
//!
//! Generation runs are long and mostly waiting on a model, so the useful
//! signal is per-job: attempts, repair stages, compliance issue counts. Those
//! are emitted as `tracing` fields by the engine modules. This module only
//! decides where they go and at what level.

use anyhow::Result;
use fitplan_core::constants::service_names;
use std::env;
use std::io;
use tracing::{info, Level};
use tracing_subscriber::{
    filter::Directive,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Crates whose debug output drowns the engine's own events
const QUIET_TARGETS: [&str; 4] = ["hyper", "reqwest", "sqlx", "sqlx::query"];

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// `JSON` lines for log shipping
    Json,
    /// Full human-readable output
    Pretty,
    /// Single-line output
    Compact,
}

impl LogFormat {
    /// Parse `LOG_FORMAT`, defaulting to pretty
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            "compact" => Self::Compact,
            _ => Self::Pretty,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Level for the engine's own targets (trace, debug, info, warn, error)
    pub level: String,
    /// Output format
    pub format: LogFormat,
    /// Include source file and line numbers
    pub include_location: bool,
    /// Emit span open/close events (job and titration spans carry timings)
    pub include_spans: bool,
    /// Service name recorded on the startup event
    pub service_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Pretty,
            include_location: false,
            include_spans: false,
            service_name: service_names::FITPLAN_ENGINE.into(),
        }
    }
}

impl LoggingConfig {
    /// Read `FITPLAN_LOG_LEVEL`, `LOG_FORMAT`, `LOG_INCLUDE_LOCATION` and
    /// `LOG_INCLUDE_SPANS`
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            level: env::var("FITPLAN_LOG_LEVEL").unwrap_or(defaults.level),
            format: env::var("LOG_FORMAT")
                .map_or(defaults.format, |value| LogFormat::from_str_or_default(&value)),
            include_location: env::var("LOG_INCLUDE_LOCATION").is_ok(),
            include_spans: env::var("LOG_INCLUDE_SPANS").is_ok(),
            service_name: defaults.service_name,
        }
    }

    /// Same as [`Self::from_env`] but tagged with another service name
    #[must_use]
    pub fn for_service(service_name: &str) -> Self {
        Self {
            service_name: service_name.to_owned(),
            ..Self::from_env()
        }
    }

    fn directive(spec: &str, fallback: Level) -> Directive {
        spec.parse().unwrap_or_else(|_| fallback.into())
    }

    /// `RUST_LOG` (default warn) plus the configured level for engine targets;
    /// noisy dependency crates are capped at warn
    #[must_use]
    pub fn env_filter(&self) -> EnvFilter {
        let base = env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_owned());
        QUIET_TARGETS.iter().fold(
            EnvFilter::new(base)
                .add_directive(Self::directive(
                    &format!("fitplan_engine={}", self.level),
                    Level::INFO,
                ))
                .add_directive(Self::directive(
                    &format!("fitplan_intelligence={}", self.level),
                    Level::INFO,
                )),
            |filter, target| {
                filter.add_directive(Self::directive(&format!("{target}=warn"), Level::WARN))
            },
        )
    }

    /// Initialize the global tracing subscriber
    ///
    /// # Errors
    ///
    /// Returns an error if a global subscriber is already installed
    pub fn init(&self) -> Result<()> {
        let registry = tracing_subscriber::registry().with(self.env_filter());
        let span_events = if self.include_spans {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };
        let layer = fmt::layer()
            .with_file(self.include_location)
            .with_line_number(self.include_location)
            .with_writer(io::stderr)
            .with_span_events(span_events);

        match self.format {
            LogFormat::Json => registry.with(layer.json()).try_init()?,
            LogFormat::Pretty => registry.with(layer).try_init()?,
            LogFormat::Compact => registry.with(layer.compact().with_target(false)).try_init()?,
        }

        info!(
            service.name = %self.service_name,
            service.version = env!("CARGO_PKG_VERSION"),
            log.level = %self.level,
            log.format = ?self.format,
            "Logging initialized"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parsing_defaults_to_pretty() {
        assert_eq!(LogFormat::from_str_or_default("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::from_str_or_default(" compact "), LogFormat::Compact);
        assert_eq!(LogFormat::from_str_or_default("fancy"), LogFormat::Pretty);
    }

    #[test]
    fn test_filter_names_engine_targets() {
        let config = LoggingConfig {
            level: "debug".to_owned(),
            ..LoggingConfig::default()
        };
        let rendered = config.env_filter().to_string();
        assert!(rendered.contains("fitplan_engine=debug"));
        assert!(rendered.contains("sqlx=warn"));
    }
}
