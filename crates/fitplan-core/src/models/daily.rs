// ABOUTME: Titrated daily plan produced from the base plan and the day's check-in
// ABOUTME: Carries the motivational message, adjustment rationales, and tomorrow's highlight
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::plan::{NutritionSection, RecoverySection, WorkoutSection};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Personalized plan for one calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPlan {
    /// Owner
    pub user_id: Uuid,
    /// Day the plan is for
    pub date: NaiveDate,
    /// Base plan the day was titrated from
    pub base_plan_id: Uuid,
    /// Adjusted workout
    pub workout: WorkoutSection,
    /// Adjusted nutrition
    pub nutrition: NutritionSection,
    /// Adjusted recovery guidance
    pub recovery: RecoverySection,
    /// Personalized motivational message
    pub motivation_message: String,
    /// Human-readable reasons for each adjustment
    pub adjustments: Vec<String>,
    /// Short summary fed into tomorrow's context
    pub daily_highlight: String,
    /// When the plan was generated
    pub generated_at: DateTime<Utc>,
}
