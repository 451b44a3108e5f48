// ABOUTME: Integration tests for the previous-day context snapshot
// ABOUTME: Check-in gaps, completion status lookup, note carry-over, and highlight freshness
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use chrono::{Duration, NaiveDate, Utc};
use fitplan_core::models::{
    CheckinData, CompletionLog, CompletionStatus, DailyPlan, NutritionSection, RecoverySection,
    WorkoutSection,
};
use fitplan_intelligence::LastDayContext;
use uuid::Uuid;

const CARRY_OVER_DAYS: i64 = 3;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 4, d).unwrap()
}

fn daily_plan(user: Uuid, date: NaiveDate, highlight: &str) -> DailyPlan {
    DailyPlan {
        user_id: user,
        date,
        base_plan_id: Uuid::new_v4(),
        workout: WorkoutSection::default(),
        nutrition: NutritionSection::default(),
        recovery: RecoverySection::default(),
        motivation_message: String::new(),
        adjustments: Vec::new(),
        daily_highlight: highlight.to_owned(),
        generated_at: Utc::now(),
    }
}

#[test]
fn test_ten_day_gap_reports_unknown_yesterday() {
    let user = Uuid::new_v4();
    let first = CheckinData::neutral(user, day(1));
    let second = CheckinData::neutral(user, day(11));

    let context = LastDayContext::build(day(11), &[first, second], &[], None, CARRY_OVER_DAYS);

    assert_eq!(context.days_since_last_checkin, Some(10));
    assert_eq!(context.yesterday_workout_status, CompletionStatus::Unknown);
    assert_eq!(context.yesterday_nutrition_status, CompletionStatus::Unknown);
    assert!(context.carried_notes.is_empty());
    assert!(context.is_returning_after_gap());
}

#[test]
fn test_first_checkin_has_no_recency() {
    let user = Uuid::new_v4();
    let only = CheckinData::neutral(user, day(5));
    let context = LastDayContext::build(day(5), &[only], &[], None, CARRY_OVER_DAYS);
    assert_eq!(context.days_since_last_checkin, None);
    assert!(!context.is_returning_after_gap());
}

#[test]
fn test_yesterday_completion_is_read_from_log() {
    let user = Uuid::new_v4();
    let logs = [
        CompletionLog {
            user_id: user,
            date: day(9),
            workout: CompletionStatus::Skipped,
            nutrition: CompletionStatus::Skipped,
        },
        CompletionLog {
            user_id: user,
            date: day(10),
            workout: CompletionStatus::Completed,
            nutrition: CompletionStatus::Partial,
        },
    ];
    let context = LastDayContext::build(day(11), &[], &logs, None, CARRY_OVER_DAYS);
    assert_eq!(context.yesterday_workout_status, CompletionStatus::Completed);
    assert_eq!(context.yesterday_nutrition_status, CompletionStatus::Partial);
}

#[test]
fn test_notes_carry_over_only_when_recent() {
    let user = Uuid::new_v4();
    let mut recent = CheckinData::neutral(user, day(8));
    recent.health_note = Some("  mild cold ".to_owned());
    recent.lifestyle_note = Some(String::new());

    let context =
        LastDayContext::build(day(11), &[recent.clone()], &[], None, CARRY_OVER_DAYS);
    assert_eq!(context.carried_notes, vec!["mild cold".to_owned()]);

    let context = LastDayContext::build(day(12), &[recent], &[], None, CARRY_OVER_DAYS);
    assert!(context.carried_notes.is_empty());
}

#[test]
fn test_previous_highlight_requires_yesterday_plan() {
    let user = Uuid::new_v4();
    let yesterday = daily_plan(user, day(10), "Hit a squat PR");
    let context = LastDayContext::build(day(11), &[], &[], Some(&yesterday), CARRY_OVER_DAYS);
    assert_eq!(context.previous_highlight.as_deref(), Some("Hit a squat PR"));

    let stale = daily_plan(user, day(11) - Duration::days(3), "Old news");
    let context = LastDayContext::build(day(11), &[], &[], Some(&stale), CARRY_OVER_DAYS);
    assert!(context.previous_highlight.is_none());
}
