// ABOUTME: Integration tests for check-ins and daily plan titration
// ABOUTME: Storage of the titrated day, retry on model failure, and check-in driven baselines
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use chrono::{NaiveDate, Utc};
use common::Harness;
use fitplan_core::models::{
    CheckinData, CompletionLog, CompletionStatus, DayKey, MacroTargets, UserProfile,
    WeeklyBasePlan,
};
use fitplan_engine::errors::{AppError, ErrorCode, PlanError, RetryReason};
use fitplan_engine::test_utils::{
    sample_day, sample_plan_json, sample_profile, sample_titration_json,
};
use uuid::Uuid;

/// 2025-06-02 is a Monday, a training day in the sample plan
fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
}

async fn with_base_plan(harness: &Harness) -> (UserProfile, MacroTargets, WeeklyBasePlan) {
    let (profile, targets) = harness.register(sample_profile()).await;
    let days = DayKey::ALL
        .iter()
        .map(|day| (*day, sample_day(targets)))
        .collect();
    let plan = WeeklyBasePlan::new(profile.user_id, None, days, Utc::now());
    harness.store.save_plan(&plan).await.unwrap();
    (profile, targets, plan)
}

#[tokio::test]
async fn test_no_base_plan_is_reported() {
    let harness = Harness::new();
    let (profile, _) = harness.register(sample_profile()).await;
    let service = harness.daily_service();

    let error = service
        .daily_plan(profile.user_id, monday())
        .await
        .unwrap_err();
    assert!(matches!(error, PlanError::NoActivePlan { user_id } if user_id == profile.user_id));
    assert_eq!(harness.llm.call_count(), 0);
}

#[tokio::test]
async fn test_daily_plan_after_generation_is_stored_and_reused() {
    let harness = Harness::new();
    let (profile, targets) = harness.register(sample_profile()).await;
    harness.llm.push_response(sample_plan_json(targets));
    let base = harness
        .orchestrator
        .generate_now(profile.user_id)
        .await
        .unwrap();

    harness.llm.push_response(sample_titration_json(targets));
    let service = harness.daily_service();
    let plan = service.daily_plan(profile.user_id, monday()).await.unwrap();

    assert_eq!(plan.base_plan_id, base.id);
    assert_eq!(plan.date, monday());
    assert_eq!(plan.nutrition.total_kcal, targets.total_kcal);
    assert_eq!(plan.nutrition.protein_g, targets.protein_g);
    assert_eq!(plan.daily_highlight, "Solid full body session");
    assert!(plan
        .adjustments
        .contains(&"Kept the main block as planned.".to_owned()));
    assert_eq!(harness.llm.call_count(), 2);

    let again = service.daily_plan(profile.user_id, monday()).await.unwrap();
    assert_eq!(again, plan);
    assert_eq!(harness.llm.call_count(), 2);
}

#[tokio::test]
async fn test_model_failure_requires_retry_and_stores_nothing() {
    let harness = Harness::new();
    let (profile, targets, _) = with_base_plan(&harness).await;
    let service = harness.daily_service();
    harness.llm.push_failure("rate limited");

    let error = service
        .daily_plan(profile.user_id, monday())
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        PlanError::DailyTitration(RetryReason::ModelUnavailable(_))
    ));
    let app_error = AppError::from(error);
    assert_eq!(app_error.code, ErrorCode::RetryRequired);
    assert!(harness
        .store
        .daily_plan(profile.user_id, monday())
        .await
        .unwrap()
        .is_none());

    // The retry succeeds once the model answers
    harness.llm.push_response(sample_titration_json(targets));
    let plan = service.daily_plan(profile.user_id, monday()).await.unwrap();
    assert_eq!(plan.nutrition.total_kcal, targets.total_kcal);
}

#[tokio::test]
async fn test_incomplete_answer_lists_missing_sections() {
    let harness = Harness::new();
    let (profile, _, _) = with_base_plan(&harness).await;
    let service = harness.daily_service();
    harness
        .llm
        .push_response(r#"{"workout": {"focus": "legs"}, "motivation_message": "Go!"}"#);

    let error = service
        .daily_plan(profile.user_id, monday())
        .await
        .unwrap_err();
    let PlanError::DailyTitration(RetryReason::IncompleteResponse(missing)) = error else {
        panic!("expected an incomplete response");
    };
    assert!(missing.contains(&"nutrition".to_owned()));
    assert!(missing.contains(&"daily_highlight".to_owned()));
    assert!(!missing.contains(&"workout".to_owned()));
}

#[tokio::test]
async fn test_checkin_validation_and_duplicates() {
    let harness = Harness::new();
    let service = harness.daily_service();
    let user = Uuid::new_v4();

    let mut bad = CheckinData::neutral(user, monday());
    bad.energy = 0;
    bad.sleep_hours = 30.0;
    let error = service.submit_checkin(&bad).await.unwrap_err();
    assert_eq!(error.code, ErrorCode::InvalidInput);
    assert!(error.message.contains("energy"));
    assert!(error.message.contains("sleep_hours"));

    let good = CheckinData::neutral(user, monday());
    service.submit_checkin(&good).await.unwrap();
    let error = service.submit_checkin(&good).await.unwrap_err();
    assert_eq!(error.code, ErrorCode::ResourceAlreadyExists);
}

#[tokio::test]
async fn test_high_stress_checkin_makes_a_recovery_day() {
    let harness = Harness::new();
    let (profile, targets, _) = with_base_plan(&harness).await;
    let service = harness.daily_service();

    let mut checkin = CheckinData::neutral(profile.user_id, monday());
    checkin.stress = 5;
    checkin.energy = 2;
    service.submit_checkin(&checkin).await.unwrap();

    harness.llm.push_response(sample_titration_json(targets));
    let plan = service.daily_plan(profile.user_id, monday()).await.unwrap();

    assert!(plan.workout.is_rest_day);
    assert!(plan.adjustments[0].contains("recovery-only"));
    assert!(plan
        .adjustments
        .iter()
        .any(|adjustment| adjustment.starts_with("Low energy")));

    let requests = harness.llm.requests();
    let body = &requests[0].messages[1].content;
    assert!(body.contains("\"stress\":5"));
    assert!(body.contains("\"recovery_only\":true"));
}

#[tokio::test]
async fn test_missing_checkin_uses_neutral_defaults() {
    let harness = Harness::new();
    let (profile, targets, _) = with_base_plan(&harness).await;
    let service = harness.daily_service();
    service
        .record_completion(&CompletionLog {
            user_id: profile.user_id,
            date: monday().pred_opt().unwrap(),
            workout: CompletionStatus::Skipped,
            nutrition: CompletionStatus::Partial,
        })
        .await
        .unwrap();

    harness.llm.push_response(sample_titration_json(targets));
    let plan = service.daily_plan(profile.user_id, monday()).await.unwrap();
    assert!(!plan.workout.is_rest_day);

    let requests = harness.llm.requests();
    let body = &requests[0].messages[1].content;
    assert!(body.contains("\"energy\":3"));
    assert!(body.contains("skipped"));
}

#[tokio::test]
async fn test_late_checkin_retitrates_the_day() {
    let harness = Harness::new();
    let (profile, targets, _) = with_base_plan(&harness).await;
    let service = harness.daily_service();

    harness.llm.push_response(sample_titration_json(targets));
    let early = service.daily_plan(profile.user_id, monday()).await.unwrap();
    assert!(!early.workout.is_rest_day);

    let mut checkin = CheckinData::neutral(profile.user_id, monday());
    checkin.stress = 5;
    service.submit_checkin(&checkin).await.unwrap();
    assert!(harness
        .store
        .daily_plan(profile.user_id, monday())
        .await
        .unwrap()
        .is_none());

    harness.llm.push_response(sample_titration_json(targets));
    let late = service.daily_plan(profile.user_id, monday()).await.unwrap();
    assert!(late.workout.is_rest_day);
    assert_eq!(harness.llm.call_count(), 2);

    let requests = harness.llm.requests();
    assert!(requests[1].messages[1].content.contains("\"stress\":5"));
}
