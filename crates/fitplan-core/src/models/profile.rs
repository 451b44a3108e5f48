// ABOUTME: User profile read model consumed by plan generation
// ABOUTME: Goal, physical data, equipment, dietary restrictions, avoided exercises, and targets
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Primary training goal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    /// Lose body fat (caloric deficit)
    FatLoss,
    /// Build muscle (caloric surplus)
    MuscleGain,
    /// Lose fat while building muscle
    Recomposition,
    /// Hold current body composition
    Maintenance,
    /// Improve endurance performance
    Endurance,
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::FatLoss => "fat loss",
            Self::MuscleGain => "muscle gain",
            Self::Recomposition => "body recomposition",
            Self::Maintenance => "maintenance",
            Self::Endurance => "endurance",
        };
        f.write_str(label)
    }
}

/// Gender for BMR calculations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    /// Male (higher BMR constant)
    Male,
    /// Female (lower BMR constant)
    Female,
}

/// Day-to-day activity level outside planned training
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    /// Little or no exercise
    Sedentary,
    /// 1-3 days/week
    LightlyActive,
    /// 3-5 days/week
    ModeratelyActive,
    /// 6-7 days/week
    VeryActive,
    /// Hard training twice a day
    ExtraActive,
}

/// Dietary restriction with an associated forbidden-food blocklist
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DietaryRestriction {
    /// No meat, fish or eggs
    Vegetarian,
    /// No animal products
    Vegan,
    /// No meat, fish allowed
    Pescatarian,
    /// No gluten-containing grains
    GlutenFree,
    /// No dairy
    DairyFree,
    /// No peanuts or tree nuts
    NutFree,
    /// No pork or alcohol
    Halal,
    /// No pork or shellfish
    Kosher,
}

impl DietaryRestriction {
    /// Human-readable label used in prompts
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Vegetarian => "vegetarian",
            Self::Vegan => "vegan",
            Self::Pescatarian => "pescatarian",
            Self::GlutenFree => "gluten-free",
            Self::DairyFree => "dairy-free",
            Self::NutFree => "nut-free",
            Self::Halal => "halal",
            Self::Kosher => "kosher",
        }
    }
}

/// Daily calorie and macronutrient targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroTargets {
    /// Total daily energy (kcal)
    pub total_kcal: u32,
    /// Daily protein (grams)
    pub protein_g: u32,
    /// Daily carbohydrates (grams)
    pub carbs_g: u32,
    /// Daily fat (grams)
    pub fat_g: u32,
}

/// Immutable profile snapshot supplied by the profile collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Owner of the profile
    pub user_id: Uuid,
    /// Primary goal
    pub goal: Goal,
    /// Gender for BMR
    pub gender: Gender,
    /// Age in years
    pub age: u32,
    /// Height in centimeters
    pub height_cm: f64,
    /// Body weight in kilograms
    pub weight_kg: f64,
    /// Activity level outside training
    pub activity_level: ActivityLevel,
    /// Available equipment (free text, e.g. "dumbbells")
    #[serde(default)]
    pub equipment: BTreeSet<String>,
    /// Dietary restrictions
    #[serde(default)]
    pub dietary_restrictions: BTreeSet<DietaryRestriction>,
    /// Training sessions per week (1-7)
    pub training_days_per_week: u8,
    /// Session length in minutes
    pub session_minutes: u16,
    /// Exercises the user refuses or cannot do
    #[serde(default)]
    pub avoided_exercises: Vec<String>,
    /// Explicit calorie target overriding the derived one
    #[serde(default)]
    pub calorie_target: Option<u32>,
    /// Explicit protein target overriding the derived one
    #[serde(default)]
    pub protein_target_g: Option<u32>,
    /// Supplements the user takes
    #[serde(default)]
    pub supplements: Vec<String>,
    /// Free-text special requests
    #[serde(default)]
    pub special_requests: Option<String>,
}

impl UserProfile {
    /// Validate the minimal snapshot needed to queue a generation job
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` naming every field out of range
    pub fn validate_snapshot(&self) -> AppResult<()> {
        let mut problems = Vec::new();
        if !(1..=7).contains(&self.training_days_per_week) {
            problems.push(format!(
                "training_days_per_week must be 1-7, got {}",
                self.training_days_per_week
            ));
        }
        if !(10..=240).contains(&self.session_minutes) {
            problems.push(format!(
                "session_minutes must be 10-240, got {}",
                self.session_minutes
            ));
        }
        if !(13..=100).contains(&self.age) {
            problems.push(format!("age must be 13-100, got {}", self.age));
        }
        if !(30.0..=300.0).contains(&self.weight_kg) {
            problems.push(format!("weight_kg must be 30-300, got {}", self.weight_kg));
        }
        if !(120.0..=230.0).contains(&self.height_cm) {
            problems.push(format!("height_cm must be 120-230, got {}", self.height_cm));
        }
        if let Some(kcal) = self.calorie_target {
            if !(1_000..=6_000).contains(&kcal) {
                problems.push(format!("calorie_target must be 1000-6000, got {kcal}"));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(AppError::invalid_input(problems.join("; "))
                .with_user_id(self.user_id)
                .with_details(serde_json::json!({ "problems": problems })))
        }
    }
}
