// ABOUTME: Plan generation, verification, repair and daily titration
// ABOUTME: Model-facing half of the engine; everything here takes an LlmProvider
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Plans
//!
//! - [`json_recovery`]: staged repair of free-form model output into JSON
//! - [`constraints`]: dietary blocklists and avoided-exercise matching
//! - [`compliance`]: local checks, the model fix call, and post-enforcement
//! - [`pipeline`]: generate then verify, with bounded attempts
//! - [`titration`]: the AI pass over the deterministic daily baseline

/// Dietary blocklists and avoided-exercise matching
pub mod constraints;

/// Compliance checking and repair of candidate plans
pub mod compliance;

/// Resilient JSON parsing of model output
pub mod json_recovery;

/// Two-stage generation pipeline
pub mod pipeline;

/// AI daily titration
pub mod titration;

pub use compliance::{
    ComplianceChecker, ComplianceFixer, ComplianceIssue, ComplianceReport, IssueKind,
};
pub use json_recovery::{parse_model_json, RecoveredJson, RepairStage};
pub use pipeline::{GeneratedPlan, PlanPipeline};
pub use titration::{DailyTitrator, TitrationInput, TitrationOutcome};
