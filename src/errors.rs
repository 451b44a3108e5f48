// ABOUTME: Engine-wide error types re-exported from fitplan-core
// ABOUTME: AppError with stable codes plus the PlanError taxonomy used by the pipeline and jobs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Error Handling
//!
//! Types live in `fitplan-core` so the intelligence crate and the engine share
//! one taxonomy. This module re-exports them under `fitplan_engine::errors`.

pub use fitplan_core::errors::{
    AppError, AppResult, ErrorCode, ErrorContext, ErrorResponse, JobFailure, ParseError,
    PipelineStage, PlanError, RetryReason,
};
pub use fitplan_core::errors::plan::{DAILY_TITRATION_RETRY_SENTINEL, PARSE_ERROR_SNIPPET_CHARS};
