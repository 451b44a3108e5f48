// ABOUTME: Snapshot of the previous day used to bias the next daily titration
// ABOUTME: Check-in recency, yesterday's completion status, carried notes, previous highlight
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{Duration, NaiveDate};
use fitplan_core::models::{CheckinData, CompletionLog, CompletionStatus, DailyPlan};
use serde::{Deserialize, Serialize};

/// Derived context about the days leading up to `today`; never persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastDayContext {
    /// Days between today and the newest earlier check-in
    pub days_since_last_checkin: Option<i64>,
    /// Yesterday's workout completion
    pub yesterday_workout_status: CompletionStatus,
    /// Yesterday's nutrition adherence
    pub yesterday_nutrition_status: CompletionStatus,
    /// Health and lifestyle notes from a recent check-in
    pub carried_notes: Vec<String>,
    /// Highlight of yesterday's daily plan
    pub previous_highlight: Option<String>,
}

impl LastDayContext {
    /// Build the context for `today`
    ///
    /// Check-ins dated `today` or later are ignored. Notes carry over only from
    /// the newest earlier check-in, and only when it is at most
    /// `note_carry_over_days` old.
    #[must_use]
    pub fn build(
        today: NaiveDate,
        checkins: &[CheckinData],
        completions: &[CompletionLog],
        previous_plan: Option<&DailyPlan>,
        note_carry_over_days: i64,
    ) -> Self {
        let yesterday = today - Duration::days(1);

        let last_prior = checkins
            .iter()
            .filter(|checkin| checkin.date < today)
            .max_by_key(|checkin| checkin.date);

        let days_since_last_checkin = last_prior.map(|checkin| (today - checkin.date).num_days());

        let carried_notes = last_prior
            .filter(|checkin| (today - checkin.date).num_days() <= note_carry_over_days)
            .map(CheckinData::notes)
            .unwrap_or_default();

        let (yesterday_workout_status, yesterday_nutrition_status) = completions
            .iter()
            .find(|log| log.date == yesterday)
            .map_or((CompletionStatus::Unknown, CompletionStatus::Unknown), |log| {
                (log.workout, log.nutrition)
            });

        let previous_highlight = previous_plan
            .filter(|plan| plan.date == yesterday)
            .map(|plan| plan.daily_highlight.trim().to_owned())
            .filter(|highlight| !highlight.is_empty());

        Self {
            days_since_last_checkin,
            yesterday_workout_status,
            yesterday_nutrition_status,
            carried_notes,
            previous_highlight,
        }
    }

    /// Whether the user is returning after a multi-day gap
    #[must_use]
    pub fn is_returning_after_gap(&self) -> bool {
        self.days_since_last_checkin.is_some_and(|days| days > 1)
    }
}
