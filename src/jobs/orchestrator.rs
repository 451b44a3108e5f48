// ABOUTME: Persisted base-plan job state machine with single-flight generation per user
// ABOUTME: Self-heals stale pending jobs and notifies only on pending -> ready/error
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Plan Orchestrator
//!
//! States are `idle -> pending -> {ready, error}`, with `error -> pending` on
//! retry and `ready/error -> idle` on reset. A user has at most one pending
//! job: the in-process [`InFlightRegistry`] covers callers in this process and
//! the store's atomic job-row insert covers other processes.
//!
//! A flight's result is applied only while the persisted state is still
//! pending for that flight's job id. Cancel and stale resets therefore win
//! over a model call that completes late.

use super::single_flight::{InFlightRegistry, Joined, SharedFlight};
use crate::config::JobConfig;
use crate::database::PlanStore;
use crate::errors::PlanError;
use crate::notifications::{NotificationSink, PlanEvent};
use crate::plans::{GeneratedPlan, PlanPipeline};
use crate::services::profiles::ProfileSource;
use chrono::{DateTime, Utc};
use fitplan_core::models::{
    BasePlanJobState, JobInsert, JobStatus, PlanJob, Transition, UserProfile, WeeklyBasePlan,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// How often a caller waiting on another process's job re-reads the state
const JOB_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Answer to a generation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationTicket {
    /// Job the caller should track
    pub job_id: Uuid,
    /// Whether this request created the job (false when joined)
    pub started: bool,
}

struct Dispatch {
    ticket: GenerationTicket,
    flight: Option<SharedFlight<WeeklyBasePlan>>,
}

impl Dispatch {
    fn joined(joined: Joined<WeeklyBasePlan>) -> Self {
        Self {
            ticket: GenerationTicket {
                job_id: joined.job_id,
                started: joined.started,
            },
            flight: Some(joined.future),
        }
    }

    const fn elsewhere(job_id: Uuid) -> Self {
        Self {
            ticket: GenerationTicket {
                job_id,
                started: false,
            },
            flight: None,
        }
    }
}

/// Everything a spawned flight needs after the request returns
#[derive(Clone)]
struct FlightContext {
    store: Arc<dyn PlanStore>,
    notifier: Arc<dyn NotificationSink>,
    pipeline: Arc<PlanPipeline>,
    config: JobConfig,
}

impl FlightContext {
    async fn run(self, profile: UserProfile, job_id: Uuid) -> Result<WeeklyBasePlan, PlanError> {
        let user_id = profile.user_id;
        let outcome = self.pipeline.generate(&profile).await;
        self.settle(user_id, job_id, outcome).await
    }

    async fn settle(
        &self,
        user_id: Uuid,
        job_id: Uuid,
        outcome: Result<GeneratedPlan, PlanError>,
    ) -> Result<WeeklyBasePlan, PlanError> {
        let mut state = self.store.job_state(user_id).await?;
        if !state.is_pending_for(job_id) {
            warn!(
                user.id = %user_id,
                job.id = %job_id,
                status = %state.status,
                "Job no longer pending, discarding generation result"
            );
            return Err(PlanError::StaleJob { job_id });
        }

        let now = Utc::now();
        let stored = match outcome {
            Ok(generated) => self.store_plan(user_id, job_id, generated, now).await,
            Err(error) => Err(error),
        };

        match stored {
            Ok(plan) => {
                let transition = state.complete(now)?;
                self.store.put_job_state(user_id, &state).await?;
                self.finish_job(job_id, JobStatus::Ready).await;
                info!(user.id = %user_id, job.id = %job_id, plan.id = %plan.id, "Base plan ready");
                self.publish(
                    transition,
                    PlanEvent::PlanReady {
                        user_id,
                        job_id,
                        plan_id: plan.id,
                    },
                )
                .await;
                Ok(plan)
            }
            Err(error) => {
                let message = error.to_string();
                let transition = state.fail(message.clone(), now)?;
                state.failure = error.job_failure();
                self.store.put_job_state(user_id, &state).await?;
                self.finish_job(job_id, JobStatus::Error).await;
                warn!(user.id = %user_id, job.id = %job_id, "Base plan job failed: {message}");
                self.publish(
                    transition,
                    PlanEvent::PlanError {
                        user_id,
                        job_id,
                        message,
                    },
                )
                .await;
                Err(error)
            }
        }
    }

    async fn store_plan(
        &self,
        user_id: Uuid,
        job_id: Uuid,
        generated: GeneratedPlan,
        now: DateTime<Utc>,
    ) -> Result<WeeklyBasePlan, PlanError> {
        let plan = WeeklyBasePlan::new(user_id, Some(job_id), generated.days, now);
        self.store.save_plan(&plan).await?;
        let pruned = self
            .store
            .prune_archived(user_id, self.config.archive_retention)
            .await?;
        if pruned > 0 {
            debug!(user.id = %user_id, pruned, "Pruned archived plans beyond retention");
        }
        Ok(plan)
    }

    async fn finish_job(&self, job_id: Uuid, status: JobStatus) {
        if let Err(e) = self.store.finish_job(job_id, status).await {
            debug!(job.id = %job_id, "Job row not updated: {e}");
        }
    }

    async fn publish(&self, transition: Transition, event: PlanEvent) {
        if !transition.is_notifiable() {
            return;
        }
        if let Err(e) = self.notifier.notify(event).await {
            warn!("Plan notification failed: {e}");
        }
    }
}

/// Owner of every base-plan job transition
pub struct PlanOrchestrator {
    ctx: FlightContext,
    profiles: Arc<dyn ProfileSource>,
    registry: InFlightRegistry<WeeklyBasePlan>,
}

impl PlanOrchestrator {
    /// Orchestrator over the given collaborators
    #[must_use]
    pub fn new(
        store: Arc<dyn PlanStore>,
        profiles: Arc<dyn ProfileSource>,
        notifier: Arc<dyn NotificationSink>,
        pipeline: Arc<PlanPipeline>,
        config: JobConfig,
    ) -> Self {
        Self {
            ctx: FlightContext {
                store,
                notifier,
                pipeline,
                config,
            },
            profiles,
            registry: InFlightRegistry::new(),
        }
    }

    /// Store the orchestrator persists to
    #[must_use]
    pub fn store(&self) -> &Arc<dyn PlanStore> {
        &self.ctx.store
    }

    /// Job limits in force
    #[must_use]
    pub const fn config(&self) -> &JobConfig {
        &self.ctx.config
    }

    /// Whether a generation for the user is running in this process
    #[must_use]
    pub fn is_generating(&self, user_id: Uuid) -> bool {
        self.registry.in_flight(user_id).is_some()
    }

    /// Start generation in the background, or join the one already running
    ///
    /// Returns as soon as the job is pending.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile or store is unavailable
    pub async fn request_generation(
        &self,
        user_id: Uuid,
        redo: bool,
    ) -> Result<GenerationTicket, PlanError> {
        Ok(self.dispatch(user_id, redo).await?.ticket)
    }

    /// Generate (or join) and wait for the resulting plan
    ///
    /// # Errors
    ///
    /// Returns the pipeline error when generation fails, or `StaleJob` when
    /// the job was cancelled or reset before it finished
    pub async fn generate_now(&self, user_id: Uuid) -> Result<WeeklyBasePlan, PlanError> {
        let dispatch = self.dispatch(user_id, false).await?;
        match dispatch.flight {
            Some(flight) => flight.await,
            None => self.await_job(user_id, dispatch.ticket.job_id).await,
        }
    }

    /// Job state, demoting a stale pending job to idle first
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable
    pub async fn job_state(&self, user_id: Uuid) -> Result<BasePlanJobState, PlanError> {
        let mut state = self.ctx.store.job_state(user_id).await?;
        let stale = state.is_stale(
            Utc::now(),
            self.ctx.config.staleness_window(),
            self.ctx.config.staleness_grace(),
        );
        if stale && !self.is_generating(user_id) {
            let job_id = state.job_id;
            warn!(user.id = %user_id, job.id = ?job_id, "Pending job went stale, resetting to idle");
            state.reset()?;
            self.ctx.store.put_job_state(user_id, &state).await?;
            if let Some(job_id) = job_id {
                self.ctx.finish_job(job_id, JobStatus::Idle).await;
            }
        }
        Ok(state)
    }

    /// Re-run generation after a failure
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the job is in the error state
    pub async fn retry(&self, user_id: Uuid) -> Result<GenerationTicket, PlanError> {
        let state = self.job_state(user_id).await?;
        if state.status != JobStatus::Error {
            return Err(PlanError::InvalidTransition {
                from: state.status.to_string(),
                to: JobStatus::Pending.to_string(),
            });
        }
        info!(user.id = %user_id, "Retrying base plan generation");
        self.request_generation(user_id, false).await
    }

    /// Return a ready or failed job to idle; idle is left as is
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` for a pending job (use [`Self::cancel`])
    pub async fn reset(&self, user_id: Uuid) -> Result<BasePlanJobState, PlanError> {
        let mut state = self.job_state(user_id).await?;
        match state.status {
            JobStatus::Idle => Ok(state),
            JobStatus::Pending => Err(PlanError::InvalidTransition {
                from: state.status.to_string(),
                to: JobStatus::Idle.to_string(),
            }),
            JobStatus::Ready | JobStatus::Error => {
                state.reset()?;
                self.ctx.store.put_job_state(user_id, &state).await?;
                info!(user.id = %user_id, "Base plan job reset");
                Ok(state)
            }
        }
    }

    /// Abandon a pending job
    ///
    /// The model call keeps running in the background; its result is
    /// discarded when it lands.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless a job is pending
    pub async fn cancel(&self, user_id: Uuid) -> Result<BasePlanJobState, PlanError> {
        let mut state = self.job_state(user_id).await?;
        let (JobStatus::Pending, Some(job_id)) = (state.status, state.job_id) else {
            return Err(PlanError::InvalidTransition {
                from: state.status.to_string(),
                to: JobStatus::Idle.to_string(),
            });
        };
        state.reset()?;
        self.ctx.store.put_job_state(user_id, &state).await?;
        self.ctx.finish_job(job_id, JobStatus::Idle).await;
        self.registry.forget(user_id, job_id);
        info!(user.id = %user_id, job.id = %job_id, "Base plan job cancelled");
        Ok(state)
    }

    /// Record the user's confirmation of the active plan and lock it
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless a ready plan exists
    pub async fn confirm_plan(&self, user_id: Uuid) -> Result<WeeklyBasePlan, PlanError> {
        let mut state = self.job_state(user_id).await?;
        let plan = match (state.status, self.ctx.store.active_plan(user_id).await?) {
            (JobStatus::Ready, Some(plan)) => plan,
            (status, _) => {
                return Err(PlanError::InvalidTransition {
                    from: status.to_string(),
                    to: "verified".to_owned(),
                })
            }
        };
        self.ctx.store.lock_plan(plan.id).await?;
        state.verified = true;
        self.ctx.store.put_job_state(user_id, &state).await?;
        info!(user.id = %user_id, plan.id = %plan.id, "Base plan confirmed");
        Ok(WeeklyBasePlan {
            locked: true,
            ..plan
        })
    }

    /// Current active plan
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable
    pub async fn active_plan(&self, user_id: Uuid) -> Result<Option<WeeklyBasePlan>, PlanError> {
        Ok(self.ctx.store.active_plan(user_id).await?)
    }

    /// Archived plans, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable
    pub async fn archived_plans(&self, user_id: Uuid) -> Result<Vec<WeeklyBasePlan>, PlanError> {
        Ok(self.ctx.store.archived_plans(user_id).await?)
    }

    async fn dispatch(&self, user_id: Uuid, redo: bool) -> Result<Dispatch, PlanError> {
        if let Some(joined) = self.registry.join(user_id) {
            info!(user.id = %user_id, job.id = %joined.job_id, "Generation already in flight");
            return Ok(Dispatch::joined(joined));
        }

        let mut state = self.job_state(user_id).await?;
        if let (JobStatus::Pending, Some(job_id)) = (state.status, state.job_id) {
            info!(user.id = %user_id, job.id = %job_id, "Generation pending in another process");
            return Ok(Dispatch::elsewhere(job_id));
        }

        let profile = self
            .profiles
            .profile(user_id)
            .await
            .map_err(|e| PlanError::Profile(e.message))?;

        let now = Utc::now();
        let job = PlanJob {
            id: Uuid::new_v4(),
            user_id,
            redo,
            status: JobStatus::Pending,
            created_at: now,
        };
        let mut inserted = self.ctx.store.insert_job_if_idle(&job).await?;
        if let JobInsert::Existing(existing_id) = inserted {
            if self.release_orphan(user_id, &state, existing_id, now).await? {
                inserted = self.ctx.store.insert_job_if_idle(&job).await?;
            }
        }
        if let JobInsert::Existing(job_id) = inserted {
            info!(user.id = %user_id, job.id = %job_id, "Pending job row already exists");
            return Ok(self
                .registry
                .join(user_id)
                .map_or_else(|| Dispatch::elsewhere(job_id), Dispatch::joined));
        }

        // A fresh cycle starts unconfirmed; a retry after an error keeps the flag
        if state.status != JobStatus::Error {
            state.verified = false;
        }
        if state.status == JobStatus::Ready {
            state.reset()?;
        }
        state.begin(job.id, now)?;
        self.ctx.store.put_job_state(user_id, &state).await?;
        info!(user.id = %user_id, job.id = %job.id, redo, "Base plan job pending");

        let ctx = self.ctx.clone();
        let joined = self
            .registry
            .join_or_start(user_id, job.id, ctx.run(profile, job.id));
        Ok(Dispatch::joined(joined))
    }

    /// Close a pending job row that no job state tracks
    ///
    /// A process that dies between inserting the row and persisting the
    /// pending state leaves a row nothing will ever finish. Such a row is
    /// released once it is past the grace period, and any pending row is
    /// released once it is past window + grace.
    async fn release_orphan(
        &self,
        user_id: Uuid,
        state: &BasePlanJobState,
        job_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool, PlanError> {
        let Some(row) = self.ctx.store.pending_job(user_id).await? else {
            return Ok(false);
        };
        if row.id != job_id || self.is_generating(user_id) {
            return Ok(false);
        }
        let age = now - row.created_at;
        let config = &self.ctx.config;
        let untracked = !state.is_pending_for(job_id) && age > config.staleness_grace();
        if !untracked && age <= config.staleness_window() + config.staleness_grace() {
            return Ok(false);
        }
        warn!(
            user.id = %user_id,
            job.id = %job_id,
            age_secs = age.num_seconds(),
            "Releasing orphaned pending job row"
        );
        self.ctx.finish_job(job_id, JobStatus::Error).await;
        Ok(true)
    }

    /// Wait for a job this process is not running
    async fn await_job(&self, user_id: Uuid, job_id: Uuid) -> Result<WeeklyBasePlan, PlanError> {
        loop {
            if let Some(joined) = self.registry.join(user_id) {
                if joined.job_id == job_id {
                    return joined.future.await;
                }
            }

            let state = self.job_state(user_id).await?;
            if state.job_id != Some(job_id) {
                return Err(PlanError::StaleJob { job_id });
            }
            match state.status {
                JobStatus::Pending => sleep(JOB_POLL_INTERVAL).await,
                JobStatus::Ready => {
                    return self
                        .ctx
                        .store
                        .active_plan(user_id)
                        .await?
                        .ok_or_else(|| PlanError::Storage(format!("plan for job {job_id} missing")));
                }
                JobStatus::Error => {
                    return Err(state.failure.map_or_else(
                        || {
                            PlanError::Internal(
                                state.error.unwrap_or_else(|| "generation failed".to_owned()),
                            )
                        },
                        PlanError::from,
                    ))
                }
                JobStatus::Idle => return Err(PlanError::StaleJob { job_id }),
            }
        }
    }
}
