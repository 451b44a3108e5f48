// ABOUTME: AI refinement of the deterministic daily baseline into the final daily plan
// ABOUTME: One model call; failure or unusable output is a typed retry, never the baseline
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Daily Titration
//!
//! The refinement call receives the baseline day, today's check-in, the trend
//! memory and the last-day context. Its result is post-processed the same way
//! base plans are: nutrition totals are pinned to today's targets and any
//! forbidden food or avoided exercise is removed. If the call fails the
//! outcome is [`TitrationOutcome::RequiresRetry`]; there is no other path to
//! a [`DailyPlan`].

use super::compliance::scrub_day;
use super::constraints::AvoidedExercises;
use super::json_recovery::parse_model_json;
use crate::config::TitrationConfig;
use crate::errors::{PlanError, RetryReason};
use crate::llm::prompts::DAILY_TITRATION_PROMPT;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};
use chrono::{DateTime, NaiveDate, Utc};
use fitplan_core::models::{
    CheckinData, DailyPlan, DayKey, DayPlan, MacroTargets, NutritionSection, RecoverySection,
    UserProfile, WorkoutSection,
};
use fitplan_intelligence::{BaselineDay, LastDayContext, TrendMemory};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Result of a titration call: a plan, or a reason the user must retry
#[derive(Debug, Clone, PartialEq)]
pub enum TitrationOutcome {
    /// The refined plan
    Ready(DailyPlan),
    /// No plan; the caller must re-invoke
    RequiresRetry(RetryReason),
}

impl TitrationOutcome {
    /// Convert into the engine error type
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::DailyTitration`] for `RequiresRetry`
    pub fn into_result(self) -> Result<DailyPlan, PlanError> {
        match self {
            Self::Ready(plan) => Ok(plan),
            Self::RequiresRetry(reason) => Err(PlanError::DailyTitration(reason)),
        }
    }
}

/// Everything the refinement call sees
#[derive(Debug, Clone)]
pub struct TitrationInput<'a> {
    /// Profile for constraints
    pub profile: &'a UserProfile,
    /// Active base plan
    pub base_plan_id: Uuid,
    /// Day being planned
    pub date: NaiveDate,
    /// Deterministic baseline for the day
    pub baseline: &'a BaselineDay,
    /// Today's check-in
    pub checkin: &'a CheckinData,
    /// Trend memory, absent with too little history
    pub trends: Option<&'a TrendMemory>,
    /// Previous-day context
    pub last_day: &'a LastDayContext,
    /// Today's nutrition targets after the trend adjustment
    pub targets: MacroTargets,
}

const REQUIRED_KEYS: [&str; 6] = [
    "workout",
    "nutrition",
    "recovery",
    "motivation_message",
    "adjustments",
    "daily_highlight",
];

/// Single-call AI titration
pub struct DailyTitrator {
    llm: Arc<dyn LlmProvider>,
    config: TitrationConfig,
    model: Option<String>,
}

impl DailyTitrator {
    /// Titrator calling `llm`
    #[must_use]
    pub fn new(llm: Arc<dyn LlmProvider>, config: TitrationConfig, model: Option<String>) -> Self {
        Self { llm, config, model }
    }

    /// Refine the baseline into today's plan
    #[instrument(skip_all, fields(user.id = %input.profile.user_id, date = %input.date))]
    pub async fn titrate(&self, input: &TitrationInput<'_>) -> TitrationOutcome {
        let request = ChatRequest::new(vec![
            ChatMessage::system(DAILY_TITRATION_PROMPT),
            ChatMessage::user(render_titration_request(input).to_string()),
        ])
        .with_optional_model(self.model.as_deref())
        .with_temperature(self.config.temperature)
        .with_max_tokens(self.config.max_tokens);

        let response = match self.llm.complete(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Titration model call failed: {e}");
                return TitrationOutcome::RequiresRetry(RetryReason::ModelUnavailable(e.message));
            }
        };

        let parsed = match parse_model_json(&response.content) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Titration response unparseable: {}", e.reason);
                return TitrationOutcome::RequiresRetry(RetryReason::UnparseableResponse(
                    e.reason,
                ));
            }
        };
        debug!(repair_stage = %parsed.stage, "Parsed titration response");

        match assemble(input, &parsed.value, Utc::now()) {
            Ok(plan) => {
                info!(
                    adjustments = plan.adjustments.len(),
                    "Daily plan titrated"
                );
                TitrationOutcome::Ready(plan)
            }
            Err(missing) => {
                warn!(?missing, "Titration response incomplete");
                TitrationOutcome::RequiresRetry(RetryReason::IncompleteResponse(missing))
            }
        }
    }
}

/// JSON document sent as the user message
#[must_use]
pub fn render_titration_request(input: &TitrationInput<'_>) -> Value {
    let restrictions: Vec<&str> = input
        .profile
        .dietary_restrictions
        .iter()
        .map(|r| r.label())
        .collect();
    json!({
        "date": input.date,
        "weekday": DayKey::from_date(input.date),
        "goal": input.profile.goal.to_string(),
        "baseline": input.baseline,
        "checkin": input.checkin,
        "trends": input.trends,
        "yesterday": input.last_day,
        "returning_after_gap": input.last_day.is_returning_after_gap(),
        "targets": input.targets,
        "dietary_restrictions": restrictions,
        "avoided_exercises": input.profile.avoided_exercises,
    })
}

fn section<T: DeserializeOwned>(object: &Map<String, Value>, key: &str) -> Option<T> {
    object
        .get(key)
        .filter(|value| value.is_object())
        .and_then(|value| serde_json::from_value(value.clone()).ok())
}

fn text(object: &Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

/// Build the daily plan from the model's answer, or list what is missing
///
/// # Errors
///
/// Returns the names of required keys that are absent or malformed
pub fn assemble(
    input: &TitrationInput<'_>,
    value: &Value,
    now: DateTime<Utc>,
) -> Result<DailyPlan, Vec<String>> {
    let empty = Map::new();
    let object = value.as_object().unwrap_or(&empty);

    let workout: Option<WorkoutSection> = section(object, "workout");
    let nutrition: Option<NutritionSection> = section(object, "nutrition");
    let recovery: Option<RecoverySection> = section(object, "recovery");
    let motivation = text(object, "motivation_message");
    let highlight = text(object, "daily_highlight");
    let adjustments: Option<Vec<String>> = object
        .get("adjustments")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        });

    let present = [
        workout.is_some(),
        nutrition.is_some(),
        recovery.is_some(),
        motivation.is_some(),
        adjustments.is_some(),
        highlight.is_some(),
    ];
    let missing: Vec<String> = REQUIRED_KEYS
        .iter()
        .zip(present)
        .filter(|(_, ok)| !ok)
        .map(|(key, _)| (*key).to_owned())
        .collect();

    let (
        Some(mut workout),
        Some(mut nutrition),
        Some(recovery),
        Some(motivation),
        Some(model_adjustments),
        Some(highlight),
    ) = (workout, nutrition, recovery, motivation, adjustments, highlight)
    else {
        return Err(missing);
    };

    if input.baseline.recovery_only {
        workout.is_rest_day = true;
    }
    nutrition.total_kcal = input.targets.total_kcal;
    nutrition.protein_g = input.targets.protein_g;
    nutrition.carbs_g = input.targets.carbs_g;
    nutrition.fat_g = input.targets.fat_g;

    let mut day = DayPlan {
        workout,
        nutrition,
        recovery,
        rationale: String::new(),
    };
    let avoided = AvoidedExercises::new(&input.profile.avoided_exercises);
    scrub_day(DayKey::from_date(input.date), &mut day, input.profile, &avoided);

    let mut adjustments = input.baseline.adjustments.clone();
    for adjustment in model_adjustments {
        if !adjustments.contains(&adjustment) {
            adjustments.push(adjustment);
        }
    }

    Ok(DailyPlan {
        user_id: input.profile.user_id,
        date: input.date,
        base_plan_id: input.base_plan_id,
        workout: day.workout,
        nutrition: day.nutrition,
        recovery: day.recovery,
        motivation_message: motivation,
        adjustments,
        daily_highlight: highlight,
        generated_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{sample_day, sample_profile};
    use fitplan_intelligence::{apply_baseline, BaselineConfig};

    fn targets() -> MacroTargets {
        MacroTargets {
            total_kcal: 2_100,
            protein_g: 150,
            carbs_g: 220,
            fat_g: 64,
        }
    }

    #[test]
    fn test_missing_keys_are_listed() {
        let profile = sample_profile();
        let date = NaiveDate::from_ymd_opt(2025, 5, 5).unwrap();
        let checkin = CheckinData::neutral(profile.user_id, date);
        let baseline = apply_baseline(&sample_day(targets()), &checkin, &BaselineConfig::default());
        let last_day = LastDayContext::build(date, &[], &[], None, 3);
        let input = TitrationInput {
            profile: &profile,
            base_plan_id: Uuid::new_v4(),
            date,
            baseline: &baseline,
            checkin: &checkin,
            trends: None,
            last_day: &last_day,
            targets: targets(),
        };

        let value = json!({"workout": {"focus": "legs"}, "adjustments": "not a list"});
        let missing = assemble(&input, &value, Utc::now()).unwrap_err();
        assert_eq!(
            missing,
            vec![
                "nutrition".to_owned(),
                "recovery".to_owned(),
                "motivation_message".to_owned(),
                "adjustments".to_owned(),
                "daily_highlight".to_owned(),
            ]
        );
    }

    #[test]
    fn test_outcome_into_result() {
        let outcome = TitrationOutcome::RequiresRetry(RetryReason::ModelUnavailable("down".into()));
        assert!(matches!(
            outcome.into_result(),
            Err(PlanError::DailyTitration(RetryReason::ModelUnavailable(_)))
        ));
    }
}
