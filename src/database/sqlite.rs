// ABOUTME: SQLite PlanStore using sqlx runtime queries
// ABOUTME: JSON columns for nested plan and check-in documents, RFC 3339 timestamps
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::PlanStore;
use crate::errors::{AppError, AppResult, ErrorCode};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use fitplan_core::models::{
    BasePlanJobState, CheckinData, CompletionLog, CompletionStatus, DailyPlan, JobInsert,
    JobStatus, PlanJob, PlanStatus, WeeklyBasePlan,
};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

/// Store backed by a SQLite database
#[derive(Clone)]
pub struct SqlitePlanStore {
    pool: SqlitePool,
}

fn db_error(action: &str, e: &sqlx::Error) -> AppError {
    AppError::database(format!("Failed to {action}: {e}"))
}

fn timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::internal(format!("Invalid datetime: {e}")))
}

fn parse_date(value: &str) -> AppResult<NaiveDate> {
    value
        .parse()
        .map_err(|e| AppError::internal(format!("Invalid date: {e}")))
}

fn parse_uuid(value: &str) -> AppResult<Uuid> {
    Uuid::parse_str(value).map_err(|e| AppError::internal(format!("Invalid UUID: {e}")))
}

fn row_to_job_state(row: &SqliteRow) -> AppResult<BasePlanJobState> {
    let status: String = row.get("status");
    let job_id: Option<String> = row.get("job_id");
    let started_at: Option<String> = row.get("started_at");
    let completed_at: Option<String> = row.get("completed_at");
    let verified: i64 = row.get("verified");
    let failure: Option<String> = row.get("failure");

    Ok(BasePlanJobState {
        status: JobStatus::from_str_or_default(&status),
        job_id: job_id.as_deref().map(parse_uuid).transpose()?,
        started_at: started_at.as_deref().map(parse_timestamp).transpose()?,
        completed_at: completed_at.as_deref().map(parse_timestamp).transpose()?,
        error: row.get("error"),
        failure: failure
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| AppError::internal(format!("Invalid job failure: {e}")))?,
        verified: verified == 1,
    })
}

fn row_to_job(row: &SqliteRow) -> AppResult<PlanJob> {
    let id: String = row.get("id");
    let user_id: String = row.get("user_id");
    let redo: i64 = row.get("redo");
    let status: String = row.get("status");
    let created_at: String = row.get("created_at");

    Ok(PlanJob {
        id: parse_uuid(&id)?,
        user_id: parse_uuid(&user_id)?,
        redo: redo == 1,
        status: JobStatus::from_str_or_default(&status),
        created_at: parse_timestamp(&created_at)?,
    })
}

fn row_to_plan(row: &SqliteRow) -> AppResult<WeeklyBasePlan> {
    let id: String = row.get("id");
    let user_id: String = row.get("user_id");
    let job_id: Option<String> = row.get("job_id");
    let created_at: String = row.get("created_at");
    let cycle_week_start: String = row.get("cycle_week_start");
    let days_json: String = row.get("days");
    let locked: i64 = row.get("locked");
    let status: String = row.get("status");
    let archived_at: Option<String> = row.get("archived_at");

    Ok(WeeklyBasePlan {
        id: parse_uuid(&id)?,
        user_id: parse_uuid(&user_id)?,
        job_id: job_id.as_deref().map(parse_uuid).transpose()?,
        created_at: parse_timestamp(&created_at)?,
        cycle_week_start: parse_date(&cycle_week_start)?,
        days: serde_json::from_str(&days_json)?,
        locked: locked == 1,
        status: if status == PlanStatus::Archived.as_str() {
            PlanStatus::Archived
        } else {
            PlanStatus::Active
        },
        archived_at: archived_at.as_deref().map(parse_timestamp).transpose()?,
    })
}

fn row_to_completion(row: &SqliteRow) -> AppResult<CompletionLog> {
    let user_id: String = row.get("user_id");
    let date: String = row.get("date");
    let workout: String = row.get("workout");
    let nutrition: String = row.get("nutrition");

    Ok(CompletionLog {
        user_id: parse_uuid(&user_id)?,
        date: parse_date(&date)?,
        workout: CompletionStatus::from_str_or_default(&workout),
        nutrition: CompletionStatus::from_str_or_default(&nutrition),
    })
}

impl SqlitePlanStore {
    /// Open a pool for `database_url`, creating the file if needed
    ///
    /// In-memory databases get a single connection so every query sees the
    /// same schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established
    pub async fn new(database_url: &str) -> AppResult<Self> {
        let in_memory = database_url.contains(":memory:");
        let connection_url = if in_memory || database_url.contains('?') {
            database_url.to_owned()
        } else {
            format!("{database_url}?mode=rwc")
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 5 })
            .connect(&connection_url)
            .await
            .map_err(|e| db_error("open database", &e))?;

        Ok(Self { pool })
    }

    /// Create tables and indexes
    ///
    /// # Errors
    ///
    /// Returns an error if a statement fails
    pub async fn migrate(&self) -> AppResult<()> {
        self.create_job_tables().await?;
        self.create_plan_tables().await?;
        self.create_checkin_tables().await?;
        debug!("Plan store schema up to date");
        Ok(())
    }

    async fn execute(&self, action: &str, sql: &str) -> AppResult<()> {
        sqlx::query(sql)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error(action, &e))?;
        Ok(())
    }

    async fn create_job_tables(&self) -> AppResult<()> {
        self.execute(
            "create job_states table",
            r"
            CREATE TABLE IF NOT EXISTS job_states (
                user_id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                job_id TEXT,
                started_at TEXT,
                completed_at TEXT,
                error TEXT,
                failure TEXT,
                verified INTEGER NOT NULL DEFAULT 0
            )
            ",
        )
        .await?;
        self.execute(
            "create plan_jobs table",
            r"
            CREATE TABLE IF NOT EXISTS plan_jobs (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                redo INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            ",
        )
        .await?;
        // One pending row per user; INSERT OR IGNORE relies on it
        self.execute(
            "create pending job index",
            r"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_plan_jobs_one_pending
            ON plan_jobs(user_id) WHERE status = 'pending'
            ",
        )
        .await?;
        self.execute(
            "create redo_counters table",
            r"
            CREATE TABLE IF NOT EXISTS redo_counters (
                user_id TEXT NOT NULL,
                day TEXT NOT NULL,
                count INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (user_id, day)
            )
            ",
        )
        .await
    }

    async fn create_plan_tables(&self) -> AppResult<()> {
        self.execute(
            "create base_plans table",
            r"
            CREATE TABLE IF NOT EXISTS base_plans (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                job_id TEXT,
                created_at TEXT NOT NULL,
                cycle_week_start TEXT NOT NULL,
                days TEXT NOT NULL,
                locked INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL,
                archived_at TEXT
            )
            ",
        )
        .await?;
        self.execute(
            "create base plan index",
            "CREATE INDEX IF NOT EXISTS idx_base_plans_user ON base_plans(user_id, status, created_at)",
        )
        .await?;
        self.execute(
            "create daily_plans table",
            r"
            CREATE TABLE IF NOT EXISTS daily_plans (
                user_id TEXT NOT NULL,
                date TEXT NOT NULL,
                data TEXT NOT NULL,
                PRIMARY KEY (user_id, date)
            )
            ",
        )
        .await
    }

    async fn create_checkin_tables(&self) -> AppResult<()> {
        self.execute(
            "create checkins table",
            r"
            CREATE TABLE IF NOT EXISTS checkins (
                user_id TEXT NOT NULL,
                date TEXT NOT NULL,
                data TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (user_id, date)
            )
            ",
        )
        .await?;
        self.execute(
            "create completion_logs table",
            r"
            CREATE TABLE IF NOT EXISTS completion_logs (
                user_id TEXT NOT NULL,
                date TEXT NOT NULL,
                workout TEXT NOT NULL,
                nutrition TEXT NOT NULL,
                PRIMARY KEY (user_id, date)
            )
            ",
        )
        .await
    }
}

#[async_trait]
impl PlanStore for SqlitePlanStore {
    async fn job_state(&self, user_id: Uuid) -> AppResult<BasePlanJobState> {
        let row = sqlx::query(
            r"
            SELECT status, job_id, started_at, completed_at, error, failure, verified
            FROM job_states WHERE user_id = $1
            ",
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("load job state", &e))?;

        row.as_ref()
            .map_or_else(|| Ok(BasePlanJobState::default()), row_to_job_state)
    }

    async fn put_job_state(&self, user_id: Uuid, state: &BasePlanJobState) -> AppResult<()> {
        let failure = state
            .failure
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| AppError::internal(format!("Encode job failure: {e}")))?;
        sqlx::query(
            r"
            INSERT INTO job_states
                (user_id, status, job_id, started_at, completed_at, error, failure, verified)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT(user_id) DO UPDATE SET
                status = excluded.status,
                job_id = excluded.job_id,
                started_at = excluded.started_at,
                completed_at = excluded.completed_at,
                error = excluded.error,
                failure = excluded.failure,
                verified = excluded.verified
            ",
        )
        .bind(user_id.to_string())
        .bind(state.status.as_str())
        .bind(state.job_id.map(|id| id.to_string()))
        .bind(state.started_at.map(timestamp))
        .bind(state.completed_at.map(timestamp))
        .bind(state.error.as_deref())
        .bind(failure)
        .bind(i64::from(state.verified))
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("save job state", &e))?;
        Ok(())
    }

    async fn insert_job_if_idle(&self, job: &PlanJob) -> AppResult<JobInsert> {
        let result = sqlx::query(
            r"
            INSERT OR IGNORE INTO plan_jobs (id, user_id, redo, status, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(job.id.to_string())
        .bind(job.user_id.to_string())
        .bind(i64::from(job.redo))
        .bind(job.status.as_str())
        .bind(timestamp(job.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("insert job", &e))?;

        if result.rows_affected() == 1 {
            return Ok(JobInsert::Inserted);
        }
        match self.pending_job(job.user_id).await? {
            Some(existing) => Ok(JobInsert::Existing(existing.id)),
            None => Err(AppError::new(
                ErrorCode::ResourceAlreadyExists,
                format!("job {} already exists", job.id),
            )),
        }
    }

    async fn finish_job(&self, job_id: Uuid, status: JobStatus) -> AppResult<()> {
        let result = sqlx::query("UPDATE plan_jobs SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(job_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("finish job", &e))?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("job {job_id}")));
        }
        Ok(())
    }

    async fn pending_job(&self, user_id: Uuid) -> AppResult<Option<PlanJob>> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, redo, status, created_at
            FROM plan_jobs WHERE user_id = $1 AND status = 'pending'
            ",
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("load pending job", &e))?;
        row.as_ref().map(row_to_job).transpose()
    }

    async fn save_plan(&self, plan: &WeeklyBasePlan) -> AppResult<()> {
        let days = serde_json::to_string(&plan.days)?;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin transaction", &e))?;

        sqlx::query(
            r"
            UPDATE base_plans SET status = 'archived', archived_at = $1
            WHERE user_id = $2 AND status = 'active'
            ",
        )
        .bind(timestamp(Utc::now()))
        .bind(plan.user_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("archive previous plan", &e))?;

        sqlx::query(
            r"
            INSERT INTO base_plans (id, user_id, job_id, created_at, cycle_week_start, days, locked, status, archived_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(plan.id.to_string())
        .bind(plan.user_id.to_string())
        .bind(plan.job_id.map(|id| id.to_string()))
        .bind(timestamp(plan.created_at))
        .bind(plan.cycle_week_start.to_string())
        .bind(days)
        .bind(i64::from(plan.locked))
        .bind(plan.status.as_str())
        .bind(plan.archived_at.map(timestamp))
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("insert plan", &e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("commit plan", &e))?;
        Ok(())
    }

    async fn lock_plan(&self, plan_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("UPDATE base_plans SET locked = 1 WHERE id = $1")
            .bind(plan_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("lock plan", &e))?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("plan {plan_id}")));
        }
        Ok(())
    }

    async fn active_plan(&self, user_id: Uuid) -> AppResult<Option<WeeklyBasePlan>> {
        let row = sqlx::query(
            r"
            SELECT * FROM base_plans WHERE user_id = $1 AND status = 'active'
            ORDER BY created_at DESC LIMIT 1
            ",
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("load active plan", &e))?;
        row.as_ref().map(row_to_plan).transpose()
    }

    async fn archived_plans(&self, user_id: Uuid) -> AppResult<Vec<WeeklyBasePlan>> {
        let rows = sqlx::query(
            r"
            SELECT * FROM base_plans WHERE user_id = $1 AND status = 'archived'
            ORDER BY created_at DESC
            ",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list archived plans", &e))?;
        rows.iter().map(row_to_plan).collect()
    }

    async fn prune_archived(&self, user_id: Uuid, retention: usize) -> AppResult<usize> {
        let result = sqlx::query(
            r"
            DELETE FROM base_plans WHERE id IN (
                SELECT id FROM base_plans WHERE user_id = $1 AND status = 'archived'
                ORDER BY created_at DESC LIMIT -1 OFFSET $2
            )
            ",
        )
        .bind(user_id.to_string())
        .bind(i64::try_from(retention).unwrap_or(i64::MAX))
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("prune archived plans", &e))?;
        Ok(usize::try_from(result.rows_affected()).unwrap_or(usize::MAX))
    }

    async fn append_checkin(&self, checkin: &CheckinData) -> AppResult<()> {
        let data = serde_json::to_string(checkin)?;
        let result = sqlx::query(
            r"
            INSERT OR IGNORE INTO checkins (user_id, date, data, created_at)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(checkin.user_id.to_string())
        .bind(checkin.date.to_string())
        .bind(data)
        .bind(timestamp(checkin.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("append check-in", &e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::new(
                ErrorCode::ResourceAlreadyExists,
                format!("check-in for {} already recorded", checkin.date),
            )
            .with_user_id(checkin.user_id));
        }
        Ok(())
    }

    async fn checkin(&self, user_id: Uuid, date: NaiveDate) -> AppResult<Option<CheckinData>> {
        let row = sqlx::query("SELECT data FROM checkins WHERE user_id = $1 AND date = $2")
            .bind(user_id.to_string())
            .bind(date.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("load check-in", &e))?;
        row.map(|row| {
            let data: String = row.get("data");
            serde_json::from_str(&data).map_err(AppError::from)
        })
        .transpose()
    }

    async fn recent_checkins(
        &self,
        user_id: Uuid,
        until: NaiveDate,
        limit: usize,
    ) -> AppResult<Vec<CheckinData>> {
        let rows = sqlx::query(
            r"
            SELECT data FROM checkins WHERE user_id = $1 AND date <= $2
            ORDER BY date DESC LIMIT $3
            ",
        )
        .bind(user_id.to_string())
        .bind(until.to_string())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list check-ins", &e))?;

        let mut checkins = rows
            .iter()
            .map(|row| {
                let data: String = row.get("data");
                serde_json::from_str(&data).map_err(AppError::from)
            })
            .collect::<AppResult<Vec<CheckinData>>>()?;
        checkins.reverse();
        Ok(checkins)
    }

    async fn record_completion(&self, log: &CompletionLog) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO completion_logs (user_id, date, workout, nutrition)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT(user_id, date) DO UPDATE SET
                workout = excluded.workout,
                nutrition = excluded.nutrition
            ",
        )
        .bind(log.user_id.to_string())
        .bind(log.date.to_string())
        .bind(log.workout.as_str())
        .bind(log.nutrition.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("record completion", &e))?;
        Ok(())
    }

    async fn completion_logs(
        &self,
        user_id: Uuid,
        since: NaiveDate,
    ) -> AppResult<Vec<CompletionLog>> {
        let rows = sqlx::query(
            r"
            SELECT user_id, date, workout, nutrition FROM completion_logs
            WHERE user_id = $1 AND date >= $2 ORDER BY date ASC
            ",
        )
        .bind(user_id.to_string())
        .bind(since.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list completion logs", &e))?;
        rows.iter().map(row_to_completion).collect()
    }

    async fn save_daily_plan(&self, plan: &DailyPlan) -> AppResult<()> {
        let data = serde_json::to_string(plan)?;
        sqlx::query(
            r"
            INSERT INTO daily_plans (user_id, date, data) VALUES ($1, $2, $3)
            ON CONFLICT(user_id, date) DO UPDATE SET data = excluded.data
            ",
        )
        .bind(plan.user_id.to_string())
        .bind(plan.date.to_string())
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("save daily plan", &e))?;
        Ok(())
    }

    async fn daily_plan(&self, user_id: Uuid, date: NaiveDate) -> AppResult<Option<DailyPlan>> {
        let row = sqlx::query("SELECT data FROM daily_plans WHERE user_id = $1 AND date = $2")
            .bind(user_id.to_string())
            .bind(date.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("load daily plan", &e))?;
        row.map(|row| {
            let data: String = row.get("data");
            serde_json::from_str(&data).map_err(AppError::from)
        })
        .transpose()
    }

    async fn discard_daily_plan(&self, user_id: Uuid, date: NaiveDate) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM daily_plans WHERE user_id = $1 AND date = $2")
            .bind(user_id.to_string())
            .bind(date.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("discard daily plan", &e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn redo_count(&self, user_id: Uuid, day: NaiveDate) -> AppResult<u32> {
        let count: Option<i64> =
            sqlx::query_scalar("SELECT count FROM redo_counters WHERE user_id = $1 AND day = $2")
                .bind(user_id.to_string())
                .bind(day.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("load redo count", &e))?;
        Ok(count.and_then(|c| u32::try_from(c).ok()).unwrap_or(0))
    }

    async fn increment_redo(&self, user_id: Uuid, day: NaiveDate) -> AppResult<u32> {
        let count: i64 = sqlx::query_scalar(
            r"
            INSERT INTO redo_counters (user_id, day, count) VALUES ($1, $2, 1)
            ON CONFLICT(user_id, day) DO UPDATE SET count = count + 1
            RETURNING count
            ",
        )
        .bind(user_id.to_string())
        .bind(day.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("increment redo count", &e))?;
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }
}
