// ABOUTME: Queue-trigger surface: the externally invocable "create job" operation
// ABOUTME: Authenticates, validates the profile snapshot, deduplicates, enforces the redo quota
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::orchestrator::PlanOrchestrator;
use crate::errors::{AppError, AppResult, PlanError};
use chrono::Utc;
use fitplan_core::models::{cycle_week_start, UserProfile};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Identity attached to an incoming request by the auth collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    /// No valid credentials
    Anonymous,
    /// Authenticated user
    User(Uuid),
}

/// Body of a create-job call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRequest {
    /// Profile snapshot as the client sees it
    pub profile: UserProfile,
    /// Regenerate even though a plan exists for this cycle
    #[serde(default)]
    pub redo: bool,
}

/// What the call did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobDisposition {
    /// A new job was queued
    Created,
    /// A job was already pending; its id is returned
    Joined,
    /// The current cycle already has a plan
    AlreadyGenerated,
}

/// Immediate answer to a create-job call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobTicket {
    /// Job to poll
    pub job_id: Uuid,
    /// Outcome of the call
    pub disposition: JobDisposition,
}

/// Entry point used by the transport layer to queue generation
pub struct JobQueue {
    orchestrator: Arc<PlanOrchestrator>,
}

impl JobQueue {
    /// Queue in front of `orchestrator`
    #[must_use]
    pub const fn new(orchestrator: Arc<PlanOrchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Create (or find) the generation job for the caller
    ///
    /// Never waits for generation to finish.
    ///
    /// # Errors
    ///
    /// - `AuthInvalid` for anonymous callers
    /// - `PermissionDenied` when the caller asks for another user
    /// - `InvalidInput` when the profile snapshot is out of range
    /// - `QuotaExceeded` when a redo is refused
    #[instrument(skip_all, fields(user.id = %request.profile.user_id, redo = request.redo))]
    pub async fn create_job(&self, caller: Caller, request: &JobRequest) -> AppResult<JobTicket> {
        let user_id = request.profile.user_id;
        match caller {
            Caller::Anonymous => return Err(AppError::auth_invalid("authentication required")),
            Caller::User(id) if id != user_id => {
                return Err(AppError::permission_denied(
                    "cannot create a plan job for another user",
                )
                .with_user_id(id));
            }
            Caller::User(_) => {}
        }

        request.profile.validate_snapshot()?;

        if request.redo {
            self.check_redo(user_id).await?;
        } else if let Some(ticket) = self.existing_cycle_plan(user_id).await? {
            return Ok(ticket);
        }

        let ticket = self
            .orchestrator
            .request_generation(user_id, request.redo)
            .await?;

        if !ticket.started {
            info!(job.id = %ticket.job_id, "Joined pending job");
            return Ok(JobTicket {
                job_id: ticket.job_id,
                disposition: JobDisposition::Joined,
            });
        }

        if request.redo {
            let used = self
                .orchestrator
                .store()
                .increment_redo(user_id, Utc::now().date_naive())
                .await?;
            info!(redos_today = used, "Redo accepted");
        }
        info!(job.id = %ticket.job_id, "Job created");
        Ok(JobTicket {
            job_id: ticket.job_id,
            disposition: JobDisposition::Created,
        })
    }

    async fn existing_cycle_plan(&self, user_id: Uuid) -> AppResult<Option<JobTicket>> {
        let current_cycle = cycle_week_start(Utc::now().date_naive());
        let Some(plan) = self.orchestrator.active_plan(user_id).await? else {
            return Ok(None);
        };
        if plan.cycle_week_start != current_cycle {
            return Ok(None);
        }
        info!(plan.id = %plan.id, "Plan for this cycle already exists");
        Ok(Some(JobTicket {
            job_id: plan.job_id.unwrap_or(plan.id),
            disposition: JobDisposition::AlreadyGenerated,
        }))
    }

    async fn check_redo(&self, user_id: Uuid) -> AppResult<()> {
        let state = self.orchestrator.job_state(user_id).await?;
        if state.verified {
            return Err(PlanError::RedoRejected("plan already confirmed".to_owned()).into());
        }
        // Joining a pending job does not spend quota
        if self.orchestrator.is_generating(user_id) {
            return Ok(());
        }
        let quota = self.orchestrator.config().redo_daily_quota;
        let used = self
            .orchestrator
            .store()
            .redo_count(user_id, Utc::now().date_naive())
            .await?;
        if used >= quota {
            return Err(PlanError::RedoRejected(format!(
                "daily redo quota of {quota} reached"
            ))
            .into());
        }
        Ok(())
    }
}
