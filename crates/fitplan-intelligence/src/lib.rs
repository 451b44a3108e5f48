// ABOUTME: Pure planning algorithms for the fitplan engine
// ABOUTME: Nutrition targets, trend memory, last-day context, and the deterministic titration baseline
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Fitplan Intelligence
//!
//! Synchronous, I/O-free algorithms consumed by the engine:
//!
//! - [`nutrition::derive_targets`] turns a profile into daily macro targets
//! - [`TrendMemory::compute`] smooths recent check-ins and detects streaks
//! - [`LastDayContext::build`] summarises the day before
//! - [`apply_baseline`] applies the rule-based daily adjustment

/// Rule-based daily adjustment
pub mod baseline;
/// Thresholds and tunables
pub mod config;
/// Previous-day context
pub mod last_day;
/// Calorie and macro targets
pub mod nutrition;
/// EMAs, streaks, and weight trend
pub mod trend_memory;

pub use baseline::{apply_baseline, BaselineDay};
pub use config::{BaselineConfig, IntelligenceConfig, TrendConfig};
pub use last_day::LastDayContext;
pub use nutrition::derive_targets;
pub use trend_memory::{MetricTrend, Streak, TrendMemory, WeightDirection, WeightTrend};
