// ABOUTME: Tunable thresholds for trend memory and the deterministic titration baseline
// ABOUTME: Defaults come from the shared constants in fitplan-core
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use fitplan_core::constants::{titration, trends};
use serde::{Deserialize, Serialize};

/// Trend memory parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendConfig {
    /// Below this many check-ins the memory is absent
    pub min_checkins: usize,
    /// Newest check-ins considered
    pub max_checkins: usize,
    /// EMA smoothing factor
    pub ema_alpha: f64,
    /// Streak length that raises a red flag
    pub streak_red_flag_days: u32,
    /// Window for the weight trend fit (days)
    pub weight_trend_days: i64,
    /// Weekly change below which weight counts as flat (kg)
    pub flat_weight_change_kg: f64,
    /// Unit calorie adjustment (kcal)
    pub calorie_step: i32,
    /// Bound on the calorie adjustment (kcal)
    pub max_calorie_delta: i32,
    /// Maximum age of a check-in whose notes carry over (days)
    pub note_carry_over_days: i64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            min_checkins: trends::MIN_CHECKINS,
            max_checkins: trends::MAX_CHECKINS,
            ema_alpha: trends::EMA_ALPHA,
            streak_red_flag_days: trends::STREAK_RED_FLAG_DAYS,
            weight_trend_days: trends::WEIGHT_TREND_DAYS,
            flat_weight_change_kg: trends::FLAT_WEIGHT_CHANGE_KG,
            calorie_step: trends::CALORIE_STEP,
            max_calorie_delta: trends::MAX_CALORIE_DELTA,
            note_carry_over_days: trends::NOTE_CARRY_OVER_DAYS,
        }
    }
}

/// Thresholds for the rule-based daily adjustment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineConfig {
    /// Energy at or below this trims the main block
    pub low_energy_threshold: u8,
    /// Stress at or above this swaps in a recovery day
    pub high_stress_threshold: u8,
    /// Extra sleep on low-energy days (hours)
    pub extra_sleep_hours: f32,
    /// Extra hydration on low-energy days (liters)
    pub extra_hydration_liters: f32,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            low_energy_threshold: titration::LOW_ENERGY_THRESHOLD,
            high_stress_threshold: titration::HIGH_STRESS_THRESHOLD,
            extra_sleep_hours: titration::LOW_ENERGY_EXTRA_SLEEP_HOURS,
            extra_hydration_liters: titration::LOW_ENERGY_EXTRA_HYDRATION_L,
        }
    }
}

/// Aggregate configuration for the intelligence crate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntelligenceConfig {
    /// Trend memory parameters
    pub trend: TrendConfig,
    /// Baseline thresholds
    pub baseline: BaselineConfig,
}
