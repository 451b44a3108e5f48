// ABOUTME: Daily plan service: memory layer, last-day context, baseline, then AI titration
// ABOUTME: Persists the titrated plan; a failed titration surfaces as a retryable error
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Daily Plans
//!
//! The base plan's weekday is adapted to the day's check-in in two layers
//! that always both run: the deterministic baseline from
//! `fitplan-intelligence`, then one model call. There is no path where the
//! baseline alone is returned as the day's plan.

use super::profiles::ProfileSource;
use crate::config::TitrationConfig;
use crate::database::PlanStore;
use crate::errors::{AppError, AppResult, PlanError};
use crate::plans::{DailyTitrator, TitrationInput};
use chrono::{Duration, NaiveDate};
use fitplan_core::models::{CheckinData, CompletionLog, DailyPlan, DayKey, MacroTargets};
use fitplan_intelligence::{apply_baseline, derive_targets, LastDayContext, TrendMemory};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Apply the trend calorie delta to the base targets
///
/// Protein and fat stay fixed; carbohydrate absorbs the change at 4 kcal/g.
#[must_use]
pub fn adjusted_targets(base: MacroTargets, calorie_delta: i32) -> MacroTargets {
    if calorie_delta == 0 {
        return base;
    }
    let total_kcal = i64::from(base.total_kcal) + i64::from(calorie_delta);
    let carbs_g = i64::from(base.carbs_g) + i64::from(calorie_delta) / 4;
    MacroTargets {
        total_kcal: u32::try_from(total_kcal.max(0)).unwrap_or(base.total_kcal),
        carbs_g: u32::try_from(carbs_g.max(0)).unwrap_or(base.carbs_g),
        ..base
    }
}

fn check_score(name: &str, value: u8, problems: &mut Vec<String>) {
    if !(1..=5).contains(&value) {
        problems.push(format!("{name} must be 1-5, got {value}"));
    }
}

/// Builds, stores and serves daily plans
pub struct DailyPlanService {
    store: Arc<dyn PlanStore>,
    profiles: Arc<dyn ProfileSource>,
    titrator: DailyTitrator,
    config: TitrationConfig,
}

impl DailyPlanService {
    /// Service over the given collaborators
    #[must_use]
    pub fn new(
        store: Arc<dyn PlanStore>,
        profiles: Arc<dyn ProfileSource>,
        titrator: DailyTitrator,
        config: TitrationConfig,
    ) -> Self {
        Self {
            store,
            profiles,
            titrator,
            config,
        }
    }

    /// Validate and append a check-in
    ///
    /// A plan already served for that date was titrated from a neutral
    /// check-in, so it is dropped and the next request titrates again.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for out-of-range scores and
    /// `ResourceAlreadyExists` for a second check-in on the same day
    pub async fn submit_checkin(&self, checkin: &CheckinData) -> AppResult<()> {
        let mut problems = Vec::new();
        check_score("mood", checkin.mood, &mut problems);
        check_score("energy", checkin.energy, &mut problems);
        check_score("stress", checkin.stress, &mut problems);
        check_score("sleep_quality", checkin.sleep_quality, &mut problems);
        check_score("hydration", checkin.hydration, &mut problems);
        check_score("motivation", checkin.motivation, &mut problems);
        if !(0.0..=24.0).contains(&checkin.sleep_hours) {
            problems.push(format!("sleep_hours must be 0-24, got {}", checkin.sleep_hours));
        }
        if !problems.is_empty() {
            return Err(AppError::invalid_input(problems.join("; ")).with_user_id(checkin.user_id));
        }
        self.store.append_checkin(checkin).await?;
        info!(user.id = %checkin.user_id, date = %checkin.date, "Check-in recorded");
        if self
            .store
            .discard_daily_plan(checkin.user_id, checkin.date)
            .await?
        {
            info!(
                user.id = %checkin.user_id,
                date = %checkin.date,
                "Dropped daily plan built without a check-in"
            );
        }
        Ok(())
    }

    /// Record how the day went
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable
    pub async fn record_completion(&self, log: &CompletionLog) -> AppResult<()> {
        self.store.record_completion(log).await
    }

    /// The titrated plan for `date`, generating it on first request
    ///
    /// # Errors
    ///
    /// - `NoActivePlan` without a base plan
    /// - `DailyTitration` when the model call fails or its answer is unusable
    #[instrument(skip(self), fields(user.id = %user_id, date = %date))]
    pub async fn daily_plan(&self, user_id: Uuid, date: NaiveDate) -> Result<DailyPlan, PlanError> {
        if let Some(existing) = self.store.daily_plan(user_id, date).await? {
            debug!("Serving stored daily plan");
            return Ok(existing);
        }

        let base_plan = self
            .store
            .active_plan(user_id)
            .await?
            .ok_or(PlanError::NoActivePlan { user_id })?;
        let weekday = DayKey::from_date(date);
        let base_day = base_plan.day(weekday).ok_or_else(|| {
            PlanError::Internal(format!("base plan {} has no {weekday}", base_plan.id))
        })?;

        let profile = self
            .profiles
            .profile(user_id)
            .await
            .map_err(|e| PlanError::Profile(e.message))?;

        let checkin = match self.store.checkin(user_id, date).await? {
            Some(checkin) => checkin,
            None => {
                info!("No check-in for the day, titrating from a neutral check-in");
                CheckinData::neutral(user_id, date)
            }
        };

        let trend = &self.config.trend;
        let recent = self
            .store
            .recent_checkins(user_id, date, trend.max_checkins)
            .await?;
        let memory = TrendMemory::compute(&recent, profile.goal, trend);

        let yesterday = date - Duration::days(1);
        let completions = self.store.completion_logs(user_id, yesterday).await?;
        let previous_plan = self.store.daily_plan(user_id, yesterday).await?;
        let last_day = LastDayContext::build(
            date,
            &recent,
            &completions,
            previous_plan.as_ref(),
            trend.note_carry_over_days,
        );

        let baseline = apply_baseline(base_day, &checkin, &self.config.baseline);
        let calorie_delta = memory.as_ref().map_or(0, |m| m.calorie_delta);
        let targets = adjusted_targets(derive_targets(&profile), calorie_delta);
        debug!(
            recovery_only = baseline.recovery_only,
            calorie_delta,
            has_memory = memory.is_some(),
            "Baseline computed"
        );

        let input = TitrationInput {
            profile: &profile,
            base_plan_id: base_plan.id,
            date,
            baseline: &baseline,
            checkin: &checkin,
            trends: memory.as_ref(),
            last_day: &last_day,
            targets,
        };
        let plan = self.titrator.titrate(&input).await.into_result()?;

        self.store.save_daily_plan(&plan).await?;
        info!(adjustments = plan.adjustments.len(), "Daily plan stored");
        Ok(plan)
    }
}
