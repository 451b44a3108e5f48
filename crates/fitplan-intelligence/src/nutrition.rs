// ABOUTME: Daily calorie and macronutrient target derivation from a user profile
// ABOUTME: Mifflin-St Jeor BMR, activity multiplier, goal adjustment, and macro split
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Nutrition targets
//!
//! Explicit profile targets always win. Otherwise energy comes from the
//! Mifflin-St Jeor equation scaled by an activity factor and adjusted by goal.
//!
//! # Scientific References
//!
//! - Mifflin, M.D., et al. (1990). A new predictive equation for resting energy expenditure.
//!   *American Journal of Clinical Nutrition*, 51(2), 241-247.
//! - Phillips, S.M., & Van Loon, L.J. (2011). Dietary protein for athletes.
//!   *Journal of Sports Sciences*, 29(sup1), S29-S38.

use fitplan_core::models::{ActivityLevel, Gender, Goal, MacroTargets, UserProfile};

/// Energy per gram of protein and carbohydrate (kcal)
const KCAL_PER_GRAM_PROTEIN_CARB: f64 = 4.0;

/// Energy per gram of fat (kcal)
const KCAL_PER_GRAM_FAT: f64 = 9.0;

/// Share of daily energy allotted to fat
const FAT_ENERGY_SHARE: f64 = 0.275;

/// Floor applied to the derived BMR
const MIN_BMR_KCAL: f64 = 1_000.0;

/// Basal metabolic rate (kcal/day) using Mifflin-St Jeor
///
/// `BMR = 10 x weight_kg + 6.25 x height_cm - 5 x age + s`, with `s = +5` for
/// men and `-161` for women.
#[must_use]
pub fn mifflin_st_jeor_bmr(weight_kg: f64, height_cm: f64, age: u32, gender: Gender) -> f64 {
    let gender_constant = match gender {
        Gender::Male => 5.0,
        Gender::Female => -161.0,
    };
    let bmr = 6.25f64.mul_add(height_cm, 10.0 * weight_kg) - 5.0 * f64::from(age) + gender_constant;
    bmr.max(MIN_BMR_KCAL)
}

/// Activity multiplier (`McArdle` et al.)
#[must_use]
pub const fn activity_factor(level: ActivityLevel) -> f64 {
    match level {
        ActivityLevel::Sedentary => 1.2,
        ActivityLevel::LightlyActive => 1.375,
        ActivityLevel::ModeratelyActive => 1.55,
        ActivityLevel::VeryActive => 1.725,
        ActivityLevel::ExtraActive => 1.9,
    }
}

/// Multiplier applied to maintenance energy for a goal
#[must_use]
pub const fn goal_energy_factor(goal: Goal) -> f64 {
    match goal {
        Goal::FatLoss => 0.8,
        Goal::MuscleGain => 1.1,
        Goal::Recomposition | Goal::Maintenance | Goal::Endurance => 1.0,
    }
}

/// Protein grams per kilogram of body weight for a goal
#[must_use]
pub const fn protein_g_per_kg(goal: Goal) -> f64 {
    match goal {
        Goal::FatLoss => 2.0,
        Goal::MuscleGain => 1.8,
        Goal::Recomposition | Goal::Maintenance | Goal::Endurance => 1.6,
    }
}

fn round_u32(value: f64) -> u32 {
    if value <= 0.0 {
        0
    } else {
        value.round() as u32
    }
}

/// Derive whole-number daily targets for a profile
///
/// Explicit `calorie_target` and `protein_target_g` override the derived
/// values. Fat takes 27.5% of energy and carbohydrates take the remainder.
#[must_use]
pub fn derive_targets(profile: &UserProfile) -> MacroTargets {
    let total_kcal = profile.calorie_target.unwrap_or_else(|| {
        let bmr = mifflin_st_jeor_bmr(
            profile.weight_kg,
            profile.height_cm,
            profile.age,
            profile.gender,
        );
        round_u32(bmr * activity_factor(profile.activity_level) * goal_energy_factor(profile.goal))
    });

    let protein_g = profile
        .protein_target_g
        .unwrap_or_else(|| round_u32(profile.weight_kg * protein_g_per_kg(profile.goal)));

    let kcal = f64::from(total_kcal);
    let fat_g = round_u32(kcal * FAT_ENERGY_SHARE / KCAL_PER_GRAM_FAT);
    let remaining = kcal
        - f64::from(protein_g) * KCAL_PER_GRAM_PROTEIN_CARB
        - f64::from(fat_g) * KCAL_PER_GRAM_FAT;
    let carbs_g = round_u32(remaining / KCAL_PER_GRAM_PROTEIN_CARB);

    MacroTargets {
        total_kcal,
        protein_g,
        carbs_g,
        fat_g,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use uuid::Uuid;

    fn profile(goal: Goal) -> UserProfile {
        UserProfile {
            user_id: Uuid::new_v4(),
            goal,
            gender: Gender::Male,
            age: 30,
            height_cm: 180.0,
            weight_kg: 80.0,
            activity_level: ActivityLevel::ModeratelyActive,
            equipment: BTreeSet::new(),
            dietary_restrictions: BTreeSet::new(),
            training_days_per_week: 4,
            session_minutes: 60,
            avoided_exercises: Vec::new(),
            calorie_target: None,
            protein_target_g: None,
            supplements: Vec::new(),
            special_requests: None,
        }
    }

    #[test]
    fn test_bmr_reference_values() {
        // 800 + 1125 - 150 + 5
        let male = mifflin_st_jeor_bmr(80.0, 180.0, 30, Gender::Male);
        assert!((male - 1780.0).abs() < 1e-9);
        let female = mifflin_st_jeor_bmr(60.0, 165.0, 30, Gender::Female);
        assert!((female - 1320.25).abs() < 1e-9);
    }

    #[test]
    fn test_fat_loss_deficit_and_protein() {
        let targets = derive_targets(&profile(Goal::FatLoss));
        // 1780 * 1.55 * 0.8 = 2207.2
        assert_eq!(targets.total_kcal, 2207);
        assert_eq!(targets.protein_g, 160);
        assert_eq!(targets.fat_g, 67);
    }

    #[test]
    fn test_explicit_targets_win() {
        let mut p = profile(Goal::MuscleGain);
        p.calorie_target = Some(2500);
        p.protein_target_g = Some(170);
        let targets = derive_targets(&p);
        assert_eq!(targets.total_kcal, 2500);
        assert_eq!(targets.protein_g, 170);
        let energy = targets.protein_g * 4 + targets.carbs_g * 4 + targets.fat_g * 9;
        assert!(energy.abs_diff(2500) <= 8);
    }

    #[test]
    fn test_carbs_never_negative() {
        let mut p = profile(Goal::FatLoss);
        p.calorie_target = Some(1000);
        p.protein_target_g = Some(300);
        assert_eq!(derive_targets(&p).carbs_g, 0);
    }
}
