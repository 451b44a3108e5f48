// ABOUTME: Base-plan job state machine (idle, pending, ready, error)
// ABOUTME: Validates transitions and reports which ones are notification-worthy
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::errors::{JobFailure, PlanError};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Status of the per-user base plan job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Nothing running
    #[default]
    Idle,
    /// Generation in progress
    Pending,
    /// A verified plan is available
    Ready,
    /// The last generation failed
    Error,
}

impl JobStatus {
    /// Storage representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Pending => "pending",
            Self::Ready => "ready",
            Self::Error => "error",
        }
    }

    /// Parse the storage representation, defaulting to idle
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s {
            "pending" => Self::Pending,
            "ready" => Self::Ready,
            "error" => Self::Error,
            _ => Self::Idle,
        }
    }

    /// Whether `self -> to` is a legal edge
    #[must_use]
    pub const fn can_transition_to(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Idle | Self::Error, Self::Pending)
                | (Self::Pending, Self::Ready | Self::Error | Self::Idle)
                | (Self::Ready | Self::Error, Self::Idle)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An applied status change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Previous status
    pub from: JobStatus,
    /// New status
    pub to: JobStatus,
}

impl Transition {
    /// Only `pending -> ready` and `pending -> error` reach the user
    #[must_use]
    pub const fn is_notifiable(&self) -> bool {
        matches!(
            (self.from, self.to),
            (JobStatus::Pending, JobStatus::Ready | JobStatus::Error)
        )
    }
}

/// Persisted job state, one per user
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BasePlanJobState {
    /// Current status
    pub status: JobStatus,
    /// Job currently or last tracked
    pub job_id: Option<Uuid>,
    /// When the current job started
    pub started_at: Option<DateTime<Utc>>,
    /// When the current job finished
    pub completed_at: Option<DateTime<Utc>>,
    /// Failure message for the error state
    pub error: Option<String>,
    /// Stage, attempt and issues of an exhausted run, for the error state
    #[serde(default)]
    pub failure: Option<JobFailure>,
    /// Set only by explicit user confirmation; survives retries
    pub verified: bool,
}

impl BasePlanJobState {
    fn apply(&mut self, to: JobStatus) -> Result<Transition, PlanError> {
        let from = self.status;
        if !from.can_transition_to(to) {
            return Err(PlanError::InvalidTransition {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        self.status = to;
        Ok(Transition { from, to })
    }

    /// `idle -> pending` for a new job, or `error -> pending` on retry
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` from `pending` or `ready`
    pub fn begin(&mut self, job_id: Uuid, now: DateTime<Utc>) -> Result<Transition, PlanError> {
        let transition = self.apply(JobStatus::Pending)?;
        self.job_id = Some(job_id);
        self.started_at = Some(now);
        self.completed_at = None;
        self.error = None;
        self.failure = None;
        Ok(transition)
    }

    /// `pending -> ready`
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless pending
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<Transition, PlanError> {
        let transition = self.apply(JobStatus::Ready)?;
        self.completed_at = Some(now);
        self.error = None;
        self.failure = None;
        Ok(transition)
    }

    /// `pending -> error`
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless pending
    pub fn fail(
        &mut self,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Transition, PlanError> {
        let transition = self.apply(JobStatus::Error)?;
        self.completed_at = Some(now);
        self.error = Some(message.into());
        self.failure = None;
        Ok(transition)
    }

    /// Back to `idle` from any non-idle state (reset, cancel, stale self-heal)
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` when already idle
    pub fn reset(&mut self) -> Result<Transition, PlanError> {
        let transition = self.apply(JobStatus::Idle)?;
        self.started_at = None;
        self.completed_at = None;
        self.error = None;
        self.failure = None;
        Ok(transition)
    }

    /// Whether `job_id` is the job this state is currently waiting on
    #[must_use]
    pub fn is_pending_for(&self, job_id: Uuid) -> bool {
        self.status == JobStatus::Pending && self.job_id == Some(job_id)
    }

    /// A pending job older than `window + grace`
    ///
    /// Liveness of an in-process generation is checked by the caller.
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>, window: Duration, grace: Duration) -> bool {
        if self.status != JobStatus::Pending {
            return false;
        }
        let Some(started) = self.started_at else {
            return true;
        };
        now - started > window + grace
    }
}

/// Persisted generation job row used for cross-process dedup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanJob {
    /// Job identifier
    pub id: Uuid,
    /// Owner
    pub user_id: Uuid,
    /// Whether this job regenerates an existing plan
    pub redo: bool,
    /// Job status (pending while queued or processing)
    pub status: JobStatus,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Result of the atomic "insert unless one is pending" operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobInsert {
    /// The new job row was written
    Inserted,
    /// A pending job already exists for the user
    Existing(Uuid),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let mut state = BasePlanJobState::default();
        let job = Uuid::new_v4();
        let now = Utc::now();

        let begin = state.begin(job, now).unwrap();
        assert!(!begin.is_notifiable());
        assert!(state.is_pending_for(job));

        let done = state.complete(now).unwrap();
        assert!(done.is_notifiable());
        assert_eq!(state.status, JobStatus::Ready);
    }

    #[test]
    fn test_retry_only_from_error() {
        let mut state = BasePlanJobState::default();
        let now = Utc::now();
        state.begin(Uuid::new_v4(), now).unwrap();
        state.fail("boom", now).unwrap();
        assert_eq!(state.error.as_deref(), Some("boom"));

        let retry = state.begin(Uuid::new_v4(), now).unwrap();
        assert_eq!(retry.from, JobStatus::Error);
        assert!(state.error.is_none());

        state.complete(now).unwrap();
        assert!(state.begin(Uuid::new_v4(), now).is_err());
    }

    #[test]
    fn test_verified_survives_retries() {
        let mut state = BasePlanJobState {
            verified: true,
            ..BasePlanJobState::default()
        };
        let now = Utc::now();
        state.begin(Uuid::new_v4(), now).unwrap();
        state.fail("x", now).unwrap();
        state.begin(Uuid::new_v4(), now).unwrap();
        assert!(state.verified);
    }

    #[test]
    fn test_reset_from_idle_is_rejected() {
        let mut state = BasePlanJobState::default();
        assert!(matches!(
            state.reset(),
            Err(PlanError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_staleness_window() {
        let now = Utc::now();
        let mut state = BasePlanJobState::default();
        state
            .begin(Uuid::new_v4(), now - Duration::minutes(16))
            .unwrap();
        let window = Duration::minutes(15);
        let grace = Duration::seconds(30);
        assert!(state.is_stale(now, window, grace));
        assert!(!state.is_stale(now - Duration::minutes(1), window, grace));
    }
}
