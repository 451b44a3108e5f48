// ABOUTME: Test doubles and fixtures: scripted LLM provider, recording notifier, sample plans
// ABOUTME: Shared by unit tests and, behind the testing feature, by integration tests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::errors::{AppError, AppResult};
use crate::llm::{ChatRequest, ChatResponse, LlmProvider};
use crate::notifications::{NotificationSink, PlanEvent};
use async_trait::async_trait;
use fitplan_core::models::{
    ActivityLevel, DayKey, DayPlan, DraftDay, DraftPlan, Exercise, Gender, Goal, MacroTargets,
    Meal, NutritionSection, RecoverySection, UserProfile, WorkoutBlock, WorkoutSection,
};
use serde_json::{json, Value};
use std::collections::{BTreeSet, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use uuid::Uuid;

/// Model double answering from a queue of scripted results
#[derive(Default)]
pub struct MockLlmProvider {
    script: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<ChatRequest>>,
    delay: Option<Duration>,
}

impl MockLlmProvider {
    /// Provider with an empty script; every call fails until responses are pushed
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every call
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a successful completion
    pub fn push_response(&self, content: impl Into<String>) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Ok(content.into()));
    }

    /// Queue a failed call
    pub fn push_failure(&self, message: impl Into<String>) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Err(message.into()));
    }

    /// Calls received so far
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Copies of every request received
    #[must_use]
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn default_model(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, request: &ChatRequest) -> AppResult<ChatResponse> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match next {
            Some(Ok(content)) => Ok(ChatResponse {
                content,
                model: "mock-model".to_owned(),
                usage: None,
                finish_reason: Some("stop".to_owned()),
            }),
            Some(Err(message)) => Err(AppError::external_service("mock", message)),
            None => Err(AppError::external_service("mock", "no scripted response")),
        }
    }
}

/// Notifier that keeps every event it receives
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<PlanEvent>>,
}

impl RecordingNotifier {
    /// Empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far
    #[must_use]
    pub fn events(&self) -> Vec<PlanEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    async fn notify(&self, event: PlanEvent) -> AppResult<()> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
        Ok(())
    }
}

/// Valid profile with no restrictions
#[must_use]
pub fn sample_profile() -> UserProfile {
    UserProfile {
        user_id: Uuid::new_v4(),
        goal: Goal::FatLoss,
        gender: Gender::Female,
        age: 34,
        height_cm: 168.0,
        weight_kg: 72.0,
        activity_level: ActivityLevel::ModeratelyActive,
        equipment: BTreeSet::from(["dumbbells".to_owned(), "pull-up bar".to_owned()]),
        dietary_restrictions: BTreeSet::new(),
        training_days_per_week: 4,
        session_minutes: 45,
        avoided_exercises: Vec::new(),
        calorie_target: None,
        protein_target_g: None,
        supplements: vec!["creatine".to_owned()],
        special_requests: None,
    }
}

fn sample_workout(day: DayKey) -> WorkoutSection {
    if matches!(day, DayKey::Wednesday | DayKey::Sunday) {
        return WorkoutSection {
            focus: "rest".to_owned(),
            is_rest_day: true,
            blocks: Vec::new(),
        };
    }
    let exercise = |name: &str| Exercise {
        name: name.to_owned(),
        sets: Some(3),
        reps: Some("8-10".to_owned()),
        duration_minutes: None,
        notes: None,
    };
    WorkoutSection {
        focus: "full body strength".to_owned(),
        is_rest_day: false,
        blocks: vec![
            WorkoutBlock {
                name: "main".to_owned(),
                exercises: vec![
                    exercise("Goblet squat"),
                    exercise("Push-up"),
                    exercise("Romanian deadlift"),
                    exercise("Dumbbell row"),
                ],
            },
            WorkoutBlock {
                name: "core".to_owned(),
                exercises: vec![exercise("Plank")],
            },
        ],
    }
}

fn sample_nutrition(targets: MacroTargets) -> NutritionSection {
    let meal = |name: &str, items: &[&str]| Meal {
        name: name.to_owned(),
        items: items.iter().map(|item| (*item).to_owned()).collect(),
        kcal: None,
        protein_g: None,
    };
    NutritionSection {
        total_kcal: targets.total_kcal,
        protein_g: targets.protein_g,
        carbs_g: targets.carbs_g,
        fat_g: targets.fat_g,
        meals: vec![
            meal("breakfast", &["Oats", "Blueberries", "Soy yogurt"]),
            meal("lunch", &["Lentil and quinoa bowl", "Spinach"]),
            meal("dinner", &["Tofu stir-fry", "Brown rice", "Broccoli"]),
        ],
    }
}

/// One complete day matching `targets`
#[must_use]
pub fn sample_day(targets: MacroTargets) -> DayPlan {
    DayPlan {
        workout: sample_workout(DayKey::Monday),
        nutrition: sample_nutrition(targets),
        recovery: RecoverySection {
            sleep_target_hours: 8.0,
            hydration_liters: 2.5,
            mobility: vec!["hip openers".to_owned()],
            notes: Vec::new(),
        },
        rationale: "Balanced strength day.".to_owned(),
    }
}

/// Seven complete days matching `targets`, with no issues for `sample_profile`
#[must_use]
pub fn sample_draft(targets: MacroTargets) -> DraftPlan {
    let days = DayKey::ALL
        .into_iter()
        .map(|day| {
            let full = sample_day(targets);
            (
                day,
                DraftDay {
                    workout: Some(sample_workout(day)),
                    nutrition: Some(full.nutrition),
                    recovery: Some(full.recovery),
                    rationale: Some(format!("{day} plan")),
                },
            )
        })
        .collect();
    DraftPlan { days }
}

/// Model-style JSON document for `sample_draft`
#[must_use]
pub fn sample_plan_json(targets: MacroTargets) -> String {
    let draft = sample_draft(targets);
    let days: serde_json::Map<String, Value> = draft
        .days
        .iter()
        .map(|(day, draft_day)| {
            (
                day.to_string(),
                serde_json::to_value(draft_day).unwrap_or(Value::Null),
            )
        })
        .collect();
    json!({ "days": days }).to_string()
}

/// Model-style titration answer with every required key
#[must_use]
pub fn sample_titration_json(targets: MacroTargets) -> String {
    let day = sample_day(targets);
    json!({
        "workout": day.workout,
        "nutrition": day.nutrition,
        "recovery": day.recovery,
        "motivation_message": "Steady work today keeps the week on track.",
        "adjustments": ["Kept the main block as planned."],
        "daily_highlight": "Solid full body session",
    })
    .to_string()
}
