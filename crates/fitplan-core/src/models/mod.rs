// ABOUTME: Core data models for plan generation and daily adaptation
// ABOUTME: Profiles, weekly plans, check-ins, daily plans, and job state
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Check-ins and completion logs
pub mod checkin;
/// Titrated daily plans
pub mod daily;
/// Job state machine
pub mod job;
/// Weekly base plans and their draft form
pub mod plan;
/// User profile read model
pub mod profile;

pub use checkin::{CheckinData, CompletionLog, CompletionStatus, DigestionState};
pub use daily::DailyPlan;
pub use job::{BasePlanJobState, JobInsert, JobStatus, PlanJob, Transition};
pub use plan::{
    cycle_week_start, DayKey, DayPlan, DraftDay, DraftPlan, Exercise, Meal, NutritionSection,
    PlanStatus, RecoverySection, WeeklyBasePlan, WorkoutBlock, WorkoutSection,
};
pub use profile::{ActivityLevel, DietaryRestriction, Gender, Goal, MacroTargets, UserProfile};
