// ABOUTME: In-memory PlanStore backed by tokio RwLocks
// ABOUTME: Used by tests and single-process deployments without a database
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::PlanStore;
use crate::errors::{AppError, AppResult, ErrorCode};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use fitplan_core::models::{
    BasePlanJobState, CheckinData, CompletionLog, DailyPlan, JobInsert, JobStatus, PlanJob,
    PlanStatus, WeeklyBasePlan,
};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    job_states: HashMap<Uuid, BasePlanJobState>,
    jobs: HashMap<Uuid, PlanJob>,
    plans: HashMap<Uuid, WeeklyBasePlan>,
    checkins: BTreeMap<(Uuid, NaiveDate), CheckinData>,
    completions: BTreeMap<(Uuid, NaiveDate), CompletionLog>,
    daily_plans: BTreeMap<(Uuid, NaiveDate), DailyPlan>,
    redo_counts: HashMap<(Uuid, NaiveDate), u32>,
}

/// Store holding everything in process memory
#[derive(Default)]
pub struct MemoryPlanStore {
    tables: RwLock<Tables>,
}

impl MemoryPlanStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(plans: &mut [WeeklyBasePlan]) {
    plans.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[async_trait]
impl PlanStore for MemoryPlanStore {
    async fn job_state(&self, user_id: Uuid) -> AppResult<BasePlanJobState> {
        let tables = self.tables.read().await;
        Ok(tables.job_states.get(&user_id).cloned().unwrap_or_default())
    }

    async fn put_job_state(&self, user_id: Uuid, state: &BasePlanJobState) -> AppResult<()> {
        self.tables
            .write()
            .await
            .job_states
            .insert(user_id, state.clone());
        Ok(())
    }

    async fn insert_job_if_idle(&self, job: &PlanJob) -> AppResult<JobInsert> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables
            .jobs
            .values()
            .find(|row| row.user_id == job.user_id && row.status == JobStatus::Pending)
        {
            return Ok(JobInsert::Existing(existing.id));
        }
        tables.jobs.insert(job.id, job.clone());
        Ok(JobInsert::Inserted)
    }

    async fn finish_job(&self, job_id: Uuid, status: JobStatus) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let row = tables
            .jobs
            .get_mut(&job_id)
            .ok_or_else(|| AppError::not_found(format!("job {job_id}")))?;
        row.status = status;
        Ok(())
    }

    async fn pending_job(&self, user_id: Uuid) -> AppResult<Option<PlanJob>> {
        let tables = self.tables.read().await;
        Ok(tables
            .jobs
            .values()
            .find(|row| row.user_id == user_id && row.status == JobStatus::Pending)
            .cloned())
    }

    async fn save_plan(&self, plan: &WeeklyBasePlan) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        for existing in tables.plans.values_mut() {
            if existing.user_id == plan.user_id && existing.status == PlanStatus::Active {
                existing.status = PlanStatus::Archived;
                existing.archived_at = Some(now);
            }
        }
        tables.plans.insert(plan.id, plan.clone());
        Ok(())
    }

    async fn lock_plan(&self, plan_id: Uuid) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let plan = tables
            .plans
            .get_mut(&plan_id)
            .ok_or_else(|| AppError::not_found(format!("plan {plan_id}")))?;
        plan.locked = true;
        Ok(())
    }

    async fn active_plan(&self, user_id: Uuid) -> AppResult<Option<WeeklyBasePlan>> {
        let tables = self.tables.read().await;
        Ok(tables
            .plans
            .values()
            .find(|plan| plan.user_id == user_id && plan.status == PlanStatus::Active)
            .cloned())
    }

    async fn archived_plans(&self, user_id: Uuid) -> AppResult<Vec<WeeklyBasePlan>> {
        let tables = self.tables.read().await;
        let mut plans: Vec<WeeklyBasePlan> = tables
            .plans
            .values()
            .filter(|plan| plan.user_id == user_id && plan.status == PlanStatus::Archived)
            .cloned()
            .collect();
        newest_first(&mut plans);
        Ok(plans)
    }

    async fn prune_archived(&self, user_id: Uuid, retention: usize) -> AppResult<usize> {
        let expired: Vec<Uuid> = self
            .archived_plans(user_id)
            .await?
            .into_iter()
            .skip(retention)
            .map(|plan| plan.id)
            .collect();
        let mut tables = self.tables.write().await;
        for id in &expired {
            tables.plans.remove(id);
        }
        Ok(expired.len())
    }

    async fn append_checkin(&self, checkin: &CheckinData) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let key = (checkin.user_id, checkin.date);
        if tables.checkins.contains_key(&key) {
            return Err(AppError::new(
                ErrorCode::ResourceAlreadyExists,
                format!("check-in for {} already recorded", checkin.date),
            )
            .with_user_id(checkin.user_id));
        }
        tables.checkins.insert(key, checkin.clone());
        Ok(())
    }

    async fn checkin(&self, user_id: Uuid, date: NaiveDate) -> AppResult<Option<CheckinData>> {
        let tables = self.tables.read().await;
        Ok(tables.checkins.get(&(user_id, date)).cloned())
    }

    async fn recent_checkins(
        &self,
        user_id: Uuid,
        until: NaiveDate,
        limit: usize,
    ) -> AppResult<Vec<CheckinData>> {
        let tables = self.tables.read().await;
        let mut recent: Vec<CheckinData> = tables
            .checkins
            .range((user_id, NaiveDate::MIN)..=(user_id, until))
            .rev()
            .take(limit)
            .map(|(_, checkin)| checkin.clone())
            .collect();
        recent.reverse();
        Ok(recent)
    }

    async fn record_completion(&self, log: &CompletionLog) -> AppResult<()> {
        self.tables
            .write()
            .await
            .completions
            .insert((log.user_id, log.date), log.clone());
        Ok(())
    }

    async fn completion_logs(
        &self,
        user_id: Uuid,
        since: NaiveDate,
    ) -> AppResult<Vec<CompletionLog>> {
        let tables = self.tables.read().await;
        Ok(tables
            .completions
            .range((user_id, since)..=(user_id, NaiveDate::MAX))
            .map(|(_, log)| log.clone())
            .collect())
    }

    async fn save_daily_plan(&self, plan: &DailyPlan) -> AppResult<()> {
        self.tables
            .write()
            .await
            .daily_plans
            .insert((plan.user_id, plan.date), plan.clone());
        Ok(())
    }

    async fn daily_plan(&self, user_id: Uuid, date: NaiveDate) -> AppResult<Option<DailyPlan>> {
        let tables = self.tables.read().await;
        Ok(tables.daily_plans.get(&(user_id, date)).cloned())
    }

    async fn discard_daily_plan(&self, user_id: Uuid, date: NaiveDate) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(tables.daily_plans.remove(&(user_id, date)).is_some())
    }

    async fn redo_count(&self, user_id: Uuid, day: NaiveDate) -> AppResult<u32> {
        let tables = self.tables.read().await;
        Ok(tables.redo_counts.get(&(user_id, day)).copied().unwrap_or(0))
    }

    async fn increment_redo(&self, user_id: Uuid, day: NaiveDate) -> AppResult<u32> {
        let mut tables = self.tables.write().await;
        let count = tables.redo_counts.entry((user_id, day)).or_insert(0);
        *count += 1;
        Ok(*count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn plan(user_id: Uuid) -> WeeklyBasePlan {
        WeeklyBasePlan::new(user_id, None, BTreeMap::new(), Utc::now())
    }

    #[tokio::test]
    async fn test_save_plan_archives_previous() {
        let store = MemoryPlanStore::new();
        let user = Uuid::new_v4();
        let first = plan(user);
        let second = plan(user);
        store.save_plan(&first).await.unwrap();
        store.save_plan(&second).await.unwrap();

        let active = store.active_plan(user).await.unwrap().unwrap();
        assert_eq!(active.id, second.id);
        let archived = store.archived_plans(user).await.unwrap();
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].id, first.id);
        assert!(archived[0].archived_at.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_checkin_rejected() {
        let store = MemoryPlanStore::new();
        let user = Uuid::new_v4();
        let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let checkin = CheckinData::neutral(user, date);
        store.append_checkin(&checkin).await.unwrap();
        let err = store.append_checkin(&checkin).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ResourceAlreadyExists);
    }

    #[tokio::test]
    async fn test_recent_checkins_are_bounded_and_ordered() {
        let store = MemoryPlanStore::new();
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();
        for day in 1..=10 {
            let date = NaiveDate::from_ymd_opt(2025, 6, day).unwrap();
            store.append_checkin(&CheckinData::neutral(user, date)).await.unwrap();
            store.append_checkin(&CheckinData::neutral(other, date)).await.unwrap();
        }
        let until = NaiveDate::from_ymd_opt(2025, 6, 8).unwrap();
        let recent = store.recent_checkins(user, until, 3).await.unwrap();
        let days: Vec<u32> = recent.iter().map(|c| c.date.day()).collect();
        assert_eq!(days, vec![6, 7, 8]);
        assert!(recent.iter().all(|c| c.user_id == user));
    }
}
