// ABOUTME: Prompt templates compiled in from markdown and the user-message renderers
// ABOUTME: Covers base-plan generation, the compliance fixer, and daily titration
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Prompts
//!
//! System prompts live next to this file as markdown and are loaded at
//! compile time. The user messages are rendered from engine types.

use fitplan_core::models::{MacroTargets, UserProfile};
use serde_json::Value;
use std::fmt::Write as _;

/// System prompt for stage 1 plan generation
pub const PLAN_GENERATION_PROMPT: &str = include_str!("plan_generation.md");

/// System prompt for the stage 2 compliance fixer
pub const PLAN_FIX_PROMPT: &str = include_str!("plan_fix.md");

/// System prompt for AI daily titration
pub const DAILY_TITRATION_PROMPT: &str = include_str!("daily_titration.md");

fn join_or(items: impl IntoIterator<Item = impl AsRef<str>>, empty: &str) -> String {
    let joined: Vec<String> = items
        .into_iter()
        .map(|item| item.as_ref().to_owned())
        .collect();
    if joined.is_empty() {
        empty.to_owned()
    } else {
        joined.join(", ")
    }
}

fn write_targets(out: &mut String, targets: &MacroTargets) {
    let _ = writeln!(
        out,
        "Daily targets (use exactly): {} kcal, {} g protein, {} g carbs, {} g fat",
        targets.total_kcal, targets.protein_g, targets.carbs_g, targets.fat_g
    );
}

/// User message describing the profile for stage 1
#[must_use]
pub fn render_generation_request(profile: &UserProfile, targets: &MacroTargets) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Goal: {}", profile.goal);
    let _ = writeln!(
        out,
        "Athlete: {:?}, {} years, {:.0} cm, {:.1} kg, activity {:?}",
        profile.gender, profile.age, profile.height_cm, profile.weight_kg, profile.activity_level
    );
    let _ = writeln!(
        out,
        "Training days per week: {} (sessions of {} minutes)",
        profile.training_days_per_week, profile.session_minutes
    );
    let _ = writeln!(
        out,
        "Equipment: {}",
        join_or(&profile.equipment, "bodyweight only")
    );
    let _ = writeln!(
        out,
        "Dietary restrictions: {}",
        join_or(profile.dietary_restrictions.iter().map(|r| r.label()), "none")
    );
    let _ = writeln!(
        out,
        "Avoided exercises (never include): {}",
        join_or(&profile.avoided_exercises, "none")
    );
    let _ = writeln!(out, "Supplements: {}", join_or(&profile.supplements, "none"));
    write_targets(&mut out, targets);
    if let Some(requests) = profile
        .special_requests
        .as_deref()
        .filter(|r| !r.trim().is_empty())
    {
        let _ = writeln!(out, "Special requests: {}", requests.trim());
    }
    out.push_str("Return the seven-day plan JSON now.");
    out
}

/// User message asking the fixer to repair `plan` against `issues`
#[must_use]
pub fn render_fix_request(
    plan: &Value,
    issues: &[String],
    profile: &UserProfile,
    targets: &MacroTargets,
) -> String {
    let mut out = String::new();
    out.push_str("Problems found:\n");
    for issue in issues {
        let _ = writeln!(out, "- {issue}");
    }
    let _ = writeln!(
        out,
        "Dietary restrictions: {}",
        join_or(profile.dietary_restrictions.iter().map(|r| r.label()), "none")
    );
    let _ = writeln!(
        out,
        "Avoided exercises: {}",
        join_or(&profile.avoided_exercises, "none")
    );
    write_targets(&mut out, targets);
    out.push_str("Plan:\n");
    out.push_str(&plan.to_string());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sample_profile;
    use fitplan_core::models::DietaryRestriction;

    #[test]
    fn test_generation_request_lists_constraints() {
        let mut profile = sample_profile();
        profile.dietary_restrictions.insert(DietaryRestriction::Vegetarian);
        profile.avoided_exercises.push("Burpees".to_owned());
        let targets = MacroTargets {
            total_kcal: 2200,
            protein_g: 150,
            carbs_g: 230,
            fat_g: 67,
        };
        let text = render_generation_request(&profile, &targets);
        assert!(text.contains("vegetarian"));
        assert!(text.contains("Burpees"));
        assert!(text.contains("2200 kcal"));
    }

    #[test]
    fn test_prompts_are_loaded() {
        assert!(PLAN_GENERATION_PROMPT.contains("\"days\""));
        assert!(PLAN_FIX_PROMPT.contains("corrected plan"));
        assert!(DAILY_TITRATION_PROMPT.contains("daily_highlight"));
    }
}
