// ABOUTME: Engine-wide constants grouped by domain
// ABOUTME: Attempt ceilings, staleness windows, trend thresholds, and service names
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Constants shared across crates. Runtime-tunable values have matching
//! fields in the root crate's configuration structs; these are the defaults.

/// Service identifiers used in structured logs
pub mod service_names {
    /// Engine service name
    pub const FITPLAN_ENGINE: &str = "fitplan-engine";
    /// CLI service name
    pub const FITPLAN_CLI: &str = "fitplan-cli";
}

/// Two-stage pipeline defaults
pub mod pipeline {
    /// Total generate->verify attempts before giving up
    pub const MAX_ATTEMPTS: u32 = 2;
    /// Fixed delay between attempts (milliseconds, no jitter)
    pub const RETRY_DELAY_MS: u64 = 3_000;
    /// Token budget for stage 1 generation
    pub const GENERATION_MAX_TOKENS: u32 = 8_000;
    /// Token budget for the stage 2 fixer call
    pub const FIX_MAX_TOKENS: u32 = 8_000;
    /// Token budget for the daily titration call
    pub const TITRATION_MAX_TOKENS: u32 = 3_000;
    /// Sampling temperature for plan generation
    pub const GENERATION_TEMPERATURE: f32 = 0.7;
    /// Sampling temperature for repair and titration calls
    pub const REPAIR_TEMPERATURE: f32 = 0.2;
    /// More missing sections than this is treated as structural damage
    pub const MAX_REPAIRABLE_MISSING_SECTIONS: usize = 7;
}

/// Job orchestration defaults
pub mod jobs {
    /// Age after which a pending job with no live generation is stale (seconds)
    pub const STALENESS_WINDOW_SECS: i64 = 15 * 60;
    /// Extra tolerance for process-restart races (seconds)
    pub const STALENESS_GRACE_SECS: i64 = 30;
    /// Plan redos allowed per calendar day
    pub const REDO_DAILY_QUOTA: u32 = 2;
    /// Archived plans kept per user
    pub const ARCHIVE_RETENTION: usize = 12;
}

/// Trend/memory layer defaults
pub mod trends {
    /// Minimum check-ins for a meaningful trend
    pub const MIN_CHECKINS: usize = 4;
    /// Maximum check-ins considered (newest first)
    pub const MAX_CHECKINS: usize = 30;
    /// EMA smoothing factor
    pub const EMA_ALPHA: f64 = 0.3;
    /// Consecutive days at which a streak becomes a red flag
    pub const STREAK_RED_FLAG_DAYS: u32 = 3;
    /// Days of body weight considered for the weight trend
    pub const WEIGHT_TREND_DAYS: i64 = 7;
    /// Weekly weight change under which the trend is flat (kg)
    pub const FLAT_WEIGHT_CHANGE_KG: f64 = 0.25;
    /// Largest calorie adjustment the trend may recommend (kcal)
    pub const MAX_CALORIE_DELTA: i32 = 300;
    /// Standard calorie adjustment step (kcal)
    pub const CALORIE_STEP: i32 = 150;
    /// Sleep hours that normalize to 1.0
    pub const SLEEP_HOURS_CEILING: f64 = 10.0;
    /// Notes older than this (days) are not carried into the next day
    pub const NOTE_CARRY_OVER_DAYS: i64 = 3;
}

/// Daily titration thresholds on 1-5 scales
pub mod titration {
    /// Energy at or below this softens the workout
    pub const LOW_ENERGY_THRESHOLD: u8 = 2;
    /// Stress at or above this swaps in a recovery-only day
    pub const HIGH_STRESS_THRESHOLD: u8 = 4;
    /// Extra sleep target when energy is low (hours)
    pub const LOW_ENERGY_EXTRA_SLEEP_HOURS: f32 = 0.5;
    /// Extra hydration when energy is low (liters)
    pub const LOW_ENERGY_EXTRA_HYDRATION_L: f32 = 0.5;
}
