// ABOUTME: Main library entry point for the fitplan engine
// ABOUTME: Weekly base plan generation, verification and repair, job orchestration, and daily titration
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![recursion_limit = "256"]
#![deny(unsafe_code)]

//! # Fitplan Engine
//!
//! Turns a user profile into a seven-day training and nutrition plan with a
//! language model, checks the result against the profile's constraints, and
//! repairs it with a second model pass. Each day the stored base plan is
//! titrated against the user's check-in, recent trends and yesterday's
//! outcome.
//!
//! ## Architecture
//!
//! - **`plans`**: JSON recovery, constraint checks, the two-stage pipeline and daily titration
//! - **`jobs`**: per-user generation state machine with single-flight deduplication
//! - **`database`**: `PlanStore` trait with in-memory and `SQLite` backends
//! - **`notifications`**: plan-ready and plan-error events
//! - **`services`**: daily plan service and the profile collaborator
//! - **`llm`**: model-completion collaborator with a provider fallback chain
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use fitplan_engine::config::EngineConfig;
//! use fitplan_engine::errors::AppResult;
//!
//! #[tokio::main]
//! async fn main() -> AppResult<()> {
//!     let config = EngineConfig::from_env();
//!     let store = fitplan_engine::database::connect(&config.database).await?;
//!     println!("storage ready: {}", store.active_plan(uuid::Uuid::new_v4()).await?.is_none());
//!     Ok(())
//! }
//! ```

/// Environment-driven configuration
pub mod config;

/// Persistence of job state, plans, check-ins and completion logs
pub mod database;

/// Error types shared with the workspace crates
pub mod errors;

/// Generation job orchestration
pub mod jobs;

/// Model-completion collaborator
pub mod llm;

/// Structured logging setup
pub mod logging;

/// Plan-ready and plan-error events
pub mod notifications;

/// Plan generation, verification, repair and titration
pub mod plans;

/// Services composed from the store, profiles and titrator
pub mod services;

/// Test doubles and fixtures
#[cfg(any(test, feature = "testing"))]
pub mod test_utils;
