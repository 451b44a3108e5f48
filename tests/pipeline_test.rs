// ABOUTME: Integration tests for the generate -> verify pipeline over a scripted model
// ABOUTME: Covers clean plans, fixer repairs with local scrubbing, retries, and exhaustion
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use fitplan_core::models::{DayKey, DietaryRestriction, Exercise, Meal};
use fitplan_engine::config::PipelineConfig;
use fitplan_engine::errors::{PipelineStage, PlanError};
use fitplan_engine::plans::{PlanPipeline, RepairStage};
use fitplan_engine::test_utils::{sample_draft, sample_plan_json, sample_profile, MockLlmProvider};
use fitplan_intelligence::derive_targets;
use serde_json::json;
use std::sync::Arc;

fn pipeline(llm: &Arc<MockLlmProvider>) -> PlanPipeline {
    common::init_test_logging();
    PlanPipeline::new(llm.clone(), PipelineConfig::without_delay(), None)
}

#[tokio::test]
async fn test_clean_plan_needs_one_model_call() {
    let llm = Arc::new(MockLlmProvider::new());
    let profile = sample_profile();
    let targets = derive_targets(&profile);
    llm.push_response(sample_plan_json(targets));

    let plan = pipeline(&llm).generate(&profile).await.unwrap();

    assert_eq!(plan.attempts, 1);
    assert_eq!(plan.repair_stage, RepairStage::Direct);
    assert_eq!(plan.days.len(), 7);
    assert_eq!(llm.call_count(), 1);
    for day in plan.days.values() {
        assert_eq!(day.nutrition.total_kcal, targets.total_kcal);
        assert_eq!(day.nutrition.protein_g, targets.protein_g);
    }
}

#[tokio::test]
async fn test_fixer_repairs_and_local_scrub_catches_leftovers() {
    let llm = Arc::new(MockLlmProvider::new());
    let mut profile = sample_profile();
    profile
        .dietary_restrictions
        .insert(DietaryRestriction::Vegetarian);
    profile.avoided_exercises = vec!["Burpees".to_owned()];
    let targets = derive_targets(&profile);

    // Candidate: chicken on Monday, burpees on Tuesday, wrong calories on Friday
    let mut candidate = sample_draft(targets);
    let monday = candidate.days.get_mut(&DayKey::Monday).unwrap();
    monday.nutrition.as_mut().unwrap().meals.push(Meal {
        name: "snack".to_owned(),
        items: vec!["Grilled chicken wrap".to_owned()],
        ..Meal::default()
    });
    let tuesday = candidate.days.get_mut(&DayKey::Tuesday).unwrap();
    tuesday.workout.as_mut().unwrap().blocks[0]
        .exercises
        .push(Exercise {
            name: "Burpee".to_owned(),
            ..Exercise::default()
        });
    candidate
        .days
        .get_mut(&DayKey::Friday)
        .unwrap()
        .nutrition
        .as_mut()
        .unwrap()
        .total_kcal = 3_100;
    llm.push_response(json!({ "days": candidate.days }).to_string());

    // The fixer only fixes Tuesday; Monday's chicken survives its answer
    let mut fixed = candidate.clone();
    fixed
        .days
        .get_mut(&DayKey::Tuesday)
        .unwrap()
        .workout
        .as_mut()
        .unwrap()
        .blocks[0]
        .exercises
        .retain(|exercise| exercise.name != "Burpee");
    llm.push_response(json!({ "days": fixed.days }).to_string());

    let plan = pipeline(&llm).generate(&profile).await.unwrap();
    assert_eq!(llm.call_count(), 2);

    let requests = llm.requests();
    let issues_text = &requests[1].messages[1].content;
    assert!(issues_text.contains("chicken"));
    assert!(issues_text.contains("Burpee"));
    assert!(issues_text.contains("Dietary restrictions: vegetarian"));

    for (day, plan_day) in &plan.days {
        assert_eq!(plan_day.nutrition.total_kcal, targets.total_kcal, "{day}");
        for meal in &plan_day.nutrition.meals {
            for item in &meal.items {
                assert!(!item.to_lowercase().contains("chicken"), "{day}: {item}");
            }
        }
        for exercise in plan_day.workout.exercises() {
            assert!(!exercise.name.eq_ignore_ascii_case("burpee"), "{day}");
        }
    }
}

#[tokio::test]
async fn test_missing_weekdays_trigger_a_second_attempt() {
    let llm = Arc::new(MockLlmProvider::new());
    let profile = sample_profile();
    let targets = derive_targets(&profile);

    let mut partial = sample_draft(targets);
    partial.days.remove(&DayKey::Saturday);
    partial.days.remove(&DayKey::Sunday);
    llm.push_response(json!({ "days": partial.days }).to_string());
    llm.push_response(sample_plan_json(targets));

    let plan = pipeline(&llm).generate(&profile).await.unwrap();
    assert_eq!(plan.attempts, 2);
    assert_eq!(llm.call_count(), 2);
}

#[tokio::test]
async fn test_exhaustion_reports_final_stage_and_attempt() {
    let llm = Arc::new(MockLlmProvider::new());
    let profile = sample_profile();
    llm.push_failure("upstream 503");
    llm.push_response("I'm sorry, I can't help with that.");

    let error = pipeline(&llm).generate(&profile).await.unwrap_err();
    assert!(matches!(
        error,
        PlanError::AttemptsExhausted {
            stage: PipelineStage::Generate,
            attempt: 2,
            ..
        }
    ));
    assert_eq!(llm.call_count(), 2);
}

#[tokio::test]
async fn test_fixer_failure_is_a_verify_stage_error() {
    let llm = Arc::new(MockLlmProvider::new());
    let mut profile = sample_profile();
    profile.avoided_exercises = vec!["Plank".to_owned()];
    let targets = derive_targets(&profile);

    for _ in 0..2 {
        llm.push_response(sample_plan_json(targets));
        llm.push_failure("fixer timed out");
    }

    let error = pipeline(&llm).generate(&profile).await.unwrap_err();
    let PlanError::AttemptsExhausted {
        stage, attempt, issues, ..
    } = error
    else {
        unreachable!("expected exhaustion");
    };
    assert_eq!(stage, PipelineStage::Verify);
    assert_eq!(attempt, 2);
    assert!(issues.iter().any(|issue| issue.contains("Plank")));
    assert_eq!(llm.call_count(), 4);
}
