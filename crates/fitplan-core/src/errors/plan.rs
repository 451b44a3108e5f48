// ABOUTME: Error taxonomy for plan generation, verification, titration and job orchestration
// ABOUTME: Cloneable so a single in-flight generation result can be shared across waiters
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Plan Engine Errors
//!
//! - `PlanError` - every failure the generation engine can surface
//! - `ParseError` - malformed model output that no repair stage could recover
//! - Conversion into `AppError` for the service boundary

use super::{AppError, ErrorCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Characters of offending text kept at each end of a `ParseError`
pub const PARSE_ERROR_SNIPPET_CHARS: usize = 200;

/// Fixed message surfaced when a daily plan must be retried by the user
pub const DAILY_TITRATION_RETRY_SENTINEL: &str = "daily_plan_requires_retry";

/// Pipeline stage an error originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Stage 1: raw plan generation
    Generate,
    /// Stage 2: verification and repair
    Verify,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generate => f.write_str("generate"),
            Self::Verify => f.write_str("verify"),
        }
    }
}

/// Final pipeline failure in a form that survives persistence
///
/// Lets a caller in another process surface the same stage, attempt and
/// issue list the generating process saw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
    /// Stage of the final failure
    pub stage: PipelineStage,
    /// Final attempt number
    pub attempt: u32,
    /// Final failure message
    pub message: String,
    /// Issue list of the final failure
    #[serde(default)]
    pub issues: Vec<String>,
}

impl From<JobFailure> for PlanError {
    fn from(failure: JobFailure) -> Self {
        Self::AttemptsExhausted {
            stage: failure.stage,
            attempt: failure.attempt,
            message: failure.message,
            issues: failure.issues,
        }
    }
}

/// Model output that could not be turned into JSON
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("unparseable model output ({reason}); head: {head:?}; tail: {tail:?}")]
pub struct ParseError {
    /// Why the last repair stage gave up
    pub reason: String,
    /// First characters of the offending text
    pub head: String,
    /// Last characters of the offending text
    pub tail: String,
}

impl ParseError {
    /// Build a parse error, capturing the head and tail of `text`
    #[must_use]
    pub fn from_text(reason: impl Into<String>, text: &str) -> Self {
        let count = text.chars().count();
        let head: String = text.chars().take(PARSE_ERROR_SNIPPET_CHARS).collect();
        let tail: String = text
            .chars()
            .skip(count.saturating_sub(PARSE_ERROR_SNIPPET_CHARS))
            .collect();
        Self {
            reason: reason.into(),
            head,
            tail,
        }
    }
}

/// Why a daily titration has to be retried
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum RetryReason {
    /// The model call itself failed
    ModelUnavailable(String),
    /// The model answered with text no repair stage could parse
    UnparseableResponse(String),
    /// The response parsed but lacked required sections
    IncompleteResponse(Vec<String>),
}

impl fmt::Display for RetryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModelUnavailable(detail) => write!(f, "model unavailable: {detail}"),
            Self::UnparseableResponse(detail) => write!(f, "unparseable response: {detail}"),
            Self::IncompleteResponse(missing) => {
                write!(f, "incomplete response, missing: {}", missing.join(", "))
            }
        }
    }
}

/// Errors produced by the plan engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    /// Model output could not be parsed even after recovery
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Plan is missing required days or too many sections to repair
    #[error("plan is structurally incomplete: {}", issues.join("; "))]
    Structural {
        /// Human-readable structural issues
        issues: Vec<String>,
    },

    /// Stage 1 produced an unusable plan
    #[error("generation attempt {attempt} failed: {message}")]
    Generation {
        /// 1-based attempt number
        attempt: u32,
        /// What went wrong
        message: String,
        /// Issues found in the raw plan
        issues: Vec<String>,
    },

    /// Stage 2 could not repair the plan
    #[error("verification attempt {attempt} failed: {message}")]
    Verification {
        /// 1-based attempt number
        attempt: u32,
        /// What went wrong
        message: String,
        /// Issues the fixer was asked to repair
        issues: Vec<String>,
    },

    /// Every attempt failed; surfaced verbatim to the caller
    #[error("plan generation failed at {stage} stage after {attempt} attempt(s): {message}")]
    AttemptsExhausted {
        /// Stage of the final failure
        stage: PipelineStage,
        /// Final attempt number
        attempt: u32,
        /// Final failure message
        message: String,
        /// Issue list of the final failure
        issues: Vec<String>,
    },

    /// Daily titration failed; there is no fallback plan
    #[error("daily_plan_requires_retry: {0}")]
    DailyTitration(RetryReason),

    /// A pending job outlived the staleness window
    #[error("job {job_id} went stale and was reset")]
    StaleJob {
        /// Identifier of the stale job
        job_id: Uuid,
    },

    /// Model completion collaborator failed
    #[error("model call failed: {0}")]
    Model(String),

    /// Persistence collaborator failed
    #[error("storage failure: {0}")]
    Storage(String),

    /// Profile missing or invalid
    #[error("profile unavailable: {0}")]
    Profile(String),

    /// Job state machine rejected a transition
    #[error("invalid job transition from {from} to {to}")]
    InvalidTransition {
        /// Current status
        from: String,
        /// Requested status
        to: String,
    },

    /// The user has no active base plan to titrate
    #[error("no active base plan for user {user_id}")]
    NoActivePlan {
        /// Owner
        user_id: Uuid,
    },

    /// Redo request refused (quota, confirmed plan)
    #[error("redo rejected: {0}")]
    RedoRejected(String),

    /// Unexpected internal failure
    #[error("internal error: {0}")]
    Internal(String),
}

impl PlanError {
    /// Whether a fresh attempt could plausibly succeed
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Parse(_)
                | Self::Generation { .. }
                | Self::Verification { .. }
                | Self::AttemptsExhausted { .. }
                | Self::DailyTitration(_)
                | Self::Model(_)
        )
    }

    /// Issue list carried by the error, if any
    #[must_use]
    pub fn issues(&self) -> &[String] {
        match self {
            Self::Structural { issues }
            | Self::Generation { issues, .. }
            | Self::Verification { issues, .. }
            | Self::AttemptsExhausted { issues, .. } => issues,
            _ => &[],
        }
    }

    /// Persistable form of an exhausted pipeline run
    #[must_use]
    pub fn job_failure(&self) -> Option<JobFailure> {
        match self {
            Self::AttemptsExhausted {
                stage,
                attempt,
                message,
                issues,
            } => Some(JobFailure {
                stage: *stage,
                attempt: *attempt,
                message: message.clone(),
                issues: issues.clone(),
            }),
            _ => None,
        }
    }

    /// Stable error code for this failure
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Parse(_) => ErrorCode::InvalidFormat,
            Self::Structural { .. }
            | Self::Generation { .. }
            | Self::Verification { .. }
            | Self::AttemptsExhausted { .. } => ErrorCode::GenerationFailed,
            Self::DailyTitration(_) => ErrorCode::RetryRequired,
            Self::Model(_) => ErrorCode::ExternalServiceError,
            Self::Storage(_) => ErrorCode::DatabaseError,
            Self::Profile(_) => ErrorCode::InvalidInput,
            Self::InvalidTransition { .. } | Self::StaleJob { .. } => ErrorCode::InvalidState,
            Self::NoActivePlan { .. } => ErrorCode::ResourceNotFound,
            Self::RedoRejected(_) => ErrorCode::QuotaExceeded,
            Self::Internal(_) => ErrorCode::InternalError,
        }
    }
}

impl From<AppError> for PlanError {
    fn from(error: AppError) -> Self {
        match error.code {
            ErrorCode::DatabaseError => Self::Storage(error.message),
            ErrorCode::ExternalServiceError | ErrorCode::ExternalServiceUnavailable => {
                Self::Model(error.message)
            }
            ErrorCode::ResourceNotFound | ErrorCode::InvalidInput => Self::Profile(error.message),
            _ => Self::Internal(error.to_string()),
        }
    }
}

impl From<PlanError> for AppError {
    fn from(error: PlanError) -> Self {
        let code = error.code();
        let details = match &error {
            PlanError::AttemptsExhausted {
                stage,
                attempt,
                issues,
                ..
            } => serde_json::json!({
                "stage": stage,
                "attempt": attempt,
                "issues": issues,
                "retryable": true,
            }),
            PlanError::DailyTitration(reason) => serde_json::json!({
                "sentinel": DAILY_TITRATION_RETRY_SENTINEL,
                "reason": reason,
            }),
            PlanError::Parse(parse) => serde_json::json!({
                "head": parse.head,
                "tail": parse.tail,
            }),
            other if !other.issues().is_empty() => serde_json::json!({ "issues": other.issues() }),
            _ => serde_json::Value::Null,
        };
        let message = match &error {
            PlanError::DailyTitration(_) => DAILY_TITRATION_RETRY_SENTINEL.to_owned(),
            other => other.to_string(),
        };
        let converted = Self::new(code, message).with_details(details);
        match error {
            PlanError::NoActivePlan { user_id } => converted.with_user_id(user_id),
            PlanError::StaleJob { job_id } => converted.with_resource_id(job_id.to_string()),
            _ => converted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_keeps_identifiers() {
        let user_id = Uuid::new_v4();
        let error = AppError::from(PlanError::NoActivePlan { user_id });
        assert_eq!(error.code, ErrorCode::ResourceNotFound);
        assert_eq!(error.context.user_id, Some(user_id));

        let job_id = Uuid::new_v4();
        let error = AppError::from(PlanError::StaleJob { job_id });
        assert_eq!(error.context.resource_id, Some(job_id.to_string()));
    }

    #[test]
    fn test_parse_error_keeps_head_and_tail() {
        let text = format!("{}{}", "a".repeat(300), "z".repeat(300));
        let error = ParseError::from_text("bad", &text);
        assert_eq!(error.head.len(), PARSE_ERROR_SNIPPET_CHARS);
        assert!(error.head.chars().all(|c| c == 'a'));
        assert!(error.tail.chars().all(|c| c == 'z'));
    }

    #[test]
    fn test_parse_error_short_text() {
        let error = ParseError::from_text("bad", "{oops");
        assert_eq!(error.head, "{oops");
        assert_eq!(error.tail, "{oops");
    }

    #[test]
    fn test_daily_titration_surfaces_sentinel() {
        let error: AppError =
            PlanError::DailyTitration(RetryReason::ModelUnavailable("timeout".into())).into();
        assert_eq!(error.code, ErrorCode::RetryRequired);
        assert_eq!(error.message, DAILY_TITRATION_RETRY_SENTINEL);
    }

    #[test]
    fn test_exhausted_error_carries_stage_and_issues() {
        let error = PlanError::AttemptsExhausted {
            stage: PipelineStage::Verify,
            attempt: 2,
            message: "fixer returned garbage".into(),
            issues: vec!["monday: missing nutrition".into()],
        };
        assert!(error.is_retryable());
        assert_eq!(error.issues().len(), 1);
        let app: AppError = error.into();
        assert_eq!(app.context.details["stage"], "verify");
        assert_eq!(app.context.details["attempt"], 2);
    }

    #[test]
    fn test_structural_is_not_retryable() {
        let error = PlanError::Structural {
            issues: vec!["missing sunday".into()],
        };
        assert!(!error.is_retryable());
        assert_eq!(error.code(), ErrorCode::GenerationFailed);
    }
}
