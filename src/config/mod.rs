// ABOUTME: Configuration management for the plan engine
// ABOUTME: Environment-only settings for LLM providers, pipeline, jobs, titration, and storage
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Configuration module
//!
//! All settings come from environment variables. Every struct has a
//! `Default` matching the engine constants and a `from_env()` loader;
//! invalid numeric values fall back to the default with a warning.

/// Environment loaders
pub mod environment;
/// Shared configuration enums
pub mod types;

pub use environment::{
    DatabaseConfig, EngineConfig, JobConfig, LlmConfig, PipelineConfig, TitrationConfig,
};
pub use types::LlmProviderType;
