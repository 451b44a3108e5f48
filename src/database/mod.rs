// ABOUTME: Persistence collaborator for plans, jobs, check-ins and daily plans
// ABOUTME: PlanStore trait with in-memory and SQLite backends
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Plan Store
//!
//! Durable state keyed by user id. The store never interprets job status
//! transitions; the orchestrator validates them before writing. The one
//! atomic check the store owns is [`PlanStore::insert_job_if_idle`], which
//! backs cross-process deduplication of generation jobs.

use crate::config::DatabaseConfig;
use crate::errors::AppResult;
use async_trait::async_trait;
use chrono::NaiveDate;
use fitplan_core::models::{
    BasePlanJobState, CheckinData, CompletionLog, DailyPlan, JobInsert, JobStatus, PlanJob,
    WeeklyBasePlan,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// In-memory backend
pub mod memory;

/// SQLite backend
pub mod sqlite;

pub use memory::MemoryPlanStore;
pub use sqlite::SqlitePlanStore;

/// Storage operations the engine needs
#[async_trait]
pub trait PlanStore: Send + Sync {
    // ================================
    // Job state
    // ================================

    /// Job state for a user; idle when none was ever written
    async fn job_state(&self, user_id: Uuid) -> AppResult<BasePlanJobState>;

    /// Overwrite the job state for a user
    async fn put_job_state(&self, user_id: Uuid, state: &BasePlanJobState) -> AppResult<()>;

    /// Insert `job` unless the user already has a pending job row
    async fn insert_job_if_idle(&self, job: &PlanJob) -> AppResult<JobInsert>;

    /// Mark a job row finished with its final status
    async fn finish_job(&self, job_id: Uuid, status: JobStatus) -> AppResult<()>;

    /// Pending job row for a user, if any
    async fn pending_job(&self, user_id: Uuid) -> AppResult<Option<PlanJob>>;

    // ================================
    // Base plans
    // ================================

    /// Store a new active plan, archiving the previous active one
    async fn save_plan(&self, plan: &WeeklyBasePlan) -> AppResult<()>;

    /// Lock a plan against further automated edits
    async fn lock_plan(&self, plan_id: Uuid) -> AppResult<()>;

    /// Current active plan
    async fn active_plan(&self, user_id: Uuid) -> AppResult<Option<WeeklyBasePlan>>;

    /// Archived plans, newest first
    async fn archived_plans(&self, user_id: Uuid) -> AppResult<Vec<WeeklyBasePlan>>;

    /// Delete archived plans beyond the newest `retention`; returns how many went
    async fn prune_archived(&self, user_id: Uuid, retention: usize) -> AppResult<usize>;

    // ================================
    // Check-ins and completion
    // ================================

    /// Append a check-in; a second one for the same user and date is rejected
    async fn append_checkin(&self, checkin: &CheckinData) -> AppResult<()>;

    /// Check-in for a specific date
    async fn checkin(&self, user_id: Uuid, date: NaiveDate) -> AppResult<Option<CheckinData>>;

    /// Up to `limit` newest check-ins on or before `until`, oldest first
    async fn recent_checkins(
        &self,
        user_id: Uuid,
        until: NaiveDate,
        limit: usize,
    ) -> AppResult<Vec<CheckinData>>;

    /// Insert or replace the completion log for a date
    async fn record_completion(&self, log: &CompletionLog) -> AppResult<()>;

    /// Completion logs dated on or after `since`, oldest first
    async fn completion_logs(&self, user_id: Uuid, since: NaiveDate)
        -> AppResult<Vec<CompletionLog>>;

    // ================================
    // Daily plans
    // ================================

    /// Insert or replace the daily plan for its date
    async fn save_daily_plan(&self, plan: &DailyPlan) -> AppResult<()>;

    /// Daily plan for a date
    async fn daily_plan(&self, user_id: Uuid, date: NaiveDate) -> AppResult<Option<DailyPlan>>;

    /// Drop the stored daily plan for a date; returns whether one existed
    async fn discard_daily_plan(&self, user_id: Uuid, date: NaiveDate) -> AppResult<bool>;

    // ================================
    // Redo quota
    // ================================

    /// Redos used on a calendar day
    async fn redo_count(&self, user_id: Uuid, day: NaiveDate) -> AppResult<u32>;

    /// Record one redo; returns the new count
    async fn increment_redo(&self, user_id: Uuid, day: NaiveDate) -> AppResult<u32>;
}

/// Open the store named by the configuration and run migrations
///
/// # Errors
///
/// Returns an error if the database cannot be opened or migrated
pub async fn connect(config: &DatabaseConfig) -> AppResult<Arc<dyn PlanStore>> {
    let store = SqlitePlanStore::new(&config.url).await?;
    store.migrate().await?;
    info!(memory = config.is_memory(), "Plan store ready");
    Ok(Arc::new(store))
}
