// ABOUTME: Trend memory over recent check-ins: EMAs, soreness/digestion streaks, weight trend
// ABOUTME: Maps the 7-day weight direction to a bounded calorie adjustment per goal
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::config::TrendConfig;
use chrono::{Duration, NaiveDate};
use fitplan_core::constants::trends::SLEEP_HOURS_CEILING;
use fitplan_core::models::{CheckinData, DigestionState, Goal};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Smoothed and latest value of one tracked metric, both in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricTrend {
    /// Exponential moving average
    pub ema: f64,
    /// Latest normalised score
    pub latest: f64,
    /// Latest raw value as reported (1-5 score, or hours for sleep)
    pub latest_raw: f64,
}

impl MetricTrend {
    fn from_series(series: &[(f64, f64)], alpha: f64) -> Option<Self> {
        let (&(first, _), rest) = series.split_first()?;
        let ema = rest
            .iter()
            .fold(first, |ema, &(score, _)| alpha.mul_add(score, (1.0 - alpha) * ema));
        let &(latest, latest_raw) = series.last()?;
        Some(Self {
            ema,
            latest,
            latest_raw,
        })
    }
}

/// Run of consecutive calendar days sharing a soreness area or digestion state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streak {
    /// Soreness area or digestion state
    pub label: String,
    /// Consecutive days, newest check-in included
    pub length_days: u32,
    /// Whether the run reached the red-flag threshold
    pub red_flag: bool,
}

/// Direction of the recent body-weight trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightDirection {
    /// Gaining
    Up,
    /// Losing
    Down,
    /// Within the flat band
    Flat,
}

/// Least-squares weight trend over the recent window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightTrend {
    /// Classified direction
    pub direction: WeightDirection,
    /// Fitted change per week (kg)
    pub weekly_change_kg: f64,
    /// Weighed check-ins used for the fit
    pub samples: usize,
}

/// Derived trend snapshot; never persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendMemory {
    /// Check-ins the snapshot was computed from
    pub checkin_count: usize,
    /// Sleep duration trend
    pub sleep: MetricTrend,
    /// Energy trend
    pub energy: MetricTrend,
    /// Hydration trend
    pub hydration: MetricTrend,
    /// Stress trend
    pub stress: MetricTrend,
    /// Active soreness streaks, longest first
    pub soreness_streaks: Vec<Streak>,
    /// Active non-normal digestion streak
    pub digestion_streak: Option<Streak>,
    /// Weight trend, when enough weigh-ins exist
    pub weight_trend: Option<WeightTrend>,
    /// Recommended adjustment to the daily calorie target (kcal)
    pub calorie_delta: i32,
}

impl TrendMemory {
    /// Compute trends from check-ins in any order
    ///
    /// Uses at most the newest `config.max_checkins`. Returns `None` below
    /// `config.min_checkins` so callers can tell "no signal" from a flat trend.
    #[must_use]
    pub fn compute(checkins: &[CheckinData], goal: Goal, config: &TrendConfig) -> Option<Self> {
        let mut ordered: Vec<&CheckinData> = checkins.iter().collect();
        ordered.sort_by_key(|checkin| checkin.date);
        let skip = ordered.len().saturating_sub(config.max_checkins);
        let window = &ordered[skip..];

        if window.len() < config.min_checkins {
            debug!(
                checkins = window.len(),
                required = config.min_checkins,
                "Not enough check-ins for trend memory"
            );
            return None;
        }

        let series = |f: fn(&CheckinData) -> (f64, f64)| -> Vec<(f64, f64)> {
            window.iter().map(|checkin| f(checkin)).collect()
        };

        let sleep = MetricTrend::from_series(&series(normalise_sleep), config.ema_alpha)?;
        let energy = MetricTrend::from_series(
            &series(|c| (normalise_score(c.energy), f64::from(c.energy))),
            config.ema_alpha,
        )?;
        let hydration = MetricTrend::from_series(
            &series(|c| (normalise_score(c.hydration), f64::from(c.hydration))),
            config.ema_alpha,
        )?;
        let stress = MetricTrend::from_series(
            &series(|c| (normalise_score(c.stress), f64::from(c.stress))),
            config.ema_alpha,
        )?;

        let soreness_streaks = soreness_streaks(window, config.streak_red_flag_days);
        let digestion_streak = digestion_streak(window, config.streak_red_flag_days);
        let weight_trend = weight_trend(window, config);
        let calorie_delta = weight_trend.map_or(0, |trend| calorie_delta(goal, &trend, config));

        debug!(
            checkins = window.len(),
            calorie_delta,
            red_flags = soreness_streaks.iter().filter(|s| s.red_flag).count(),
            "Computed trend memory"
        );

        Some(Self {
            checkin_count: window.len(),
            sleep,
            energy,
            hydration,
            stress,
            soreness_streaks,
            digestion_streak,
            weight_trend,
            calorie_delta,
        })
    }

    /// Whether any streak crossed the red-flag threshold
    #[must_use]
    pub fn has_red_flag(&self) -> bool {
        self.soreness_streaks.iter().any(|s| s.red_flag)
            || self.digestion_streak.as_ref().is_some_and(|s| s.red_flag)
    }
}

/// Map a 1-5 score onto `[0, 1]`
#[must_use]
pub fn normalise_score(score: u8) -> f64 {
    ((f64::from(score) - 1.0) / 4.0).clamp(0.0, 1.0)
}

fn normalise_sleep(checkin: &CheckinData) -> (f64, f64) {
    let hours = f64::from(checkin.sleep_hours);
    (
        (hours / SLEEP_HOURS_CEILING).clamp(0.0, 1.0),
        hours,
    )
}

/// Count consecutive calendar days, newest first, for which `matches` holds
fn consecutive_days(window: &[&CheckinData], matches: impl Fn(&CheckinData) -> bool) -> u32 {
    let mut length = 0;
    let mut previous: Option<NaiveDate> = None;
    for checkin in window.iter().rev() {
        if let Some(prev) = previous {
            let gap = (prev - checkin.date).num_days();
            if gap == 0 {
                continue;
            }
            if gap != 1 {
                break;
            }
        }
        if !matches(checkin) {
            break;
        }
        length += 1;
        previous = Some(checkin.date);
    }
    length
}

fn soreness_streaks(window: &[&CheckinData], red_flag_days: u32) -> Vec<Streak> {
    let Some(newest) = window.last() else {
        return Vec::new();
    };
    let mut streaks: Vec<Streak> = newest
        .soreness_areas
        .iter()
        .map(|area| {
            let length_days =
                consecutive_days(window, |checkin| checkin.soreness_areas.contains(area));
            Streak {
                label: area.clone(),
                length_days,
                red_flag: length_days >= red_flag_days,
            }
        })
        .collect();
    streaks.sort_by(|a, b| b.length_days.cmp(&a.length_days));
    streaks
}

fn digestion_streak(window: &[&CheckinData], red_flag_days: u32) -> Option<Streak> {
    let state = window.last()?.digestion;
    if state == DigestionState::Normal {
        return None;
    }
    let length_days = consecutive_days(window, |checkin| checkin.digestion == state);
    Some(Streak {
        label: state.to_string(),
        length_days,
        red_flag: length_days >= red_flag_days,
    })
}

fn weight_trend(window: &[&CheckinData], config: &TrendConfig) -> Option<WeightTrend> {
    let newest = window.last()?.date;
    let start = newest - Duration::days(config.weight_trend_days - 1);
    let points: Vec<(f64, f64)> = window
        .iter()
        .filter(|checkin| checkin.date >= start)
        .filter_map(|checkin| {
            checkin
                .body_weight_kg
                .map(|kg| ((checkin.date - start).num_days() as f64, kg))
        })
        .collect();
    if points.len() < 2 {
        return None;
    }

    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;
    let sxx: f64 = points.iter().map(|(x, _)| (x - mean_x).powi(2)).sum();
    if sxx <= f64::EPSILON {
        return None;
    }
    let sxy: f64 = points
        .iter()
        .map(|(x, y)| (x - mean_x) * (y - mean_y))
        .sum();
    let weekly_change_kg = sxy / sxx * 7.0;

    let direction = if weekly_change_kg.abs() < config.flat_weight_change_kg {
        WeightDirection::Flat
    } else if weekly_change_kg > 0.0 {
        WeightDirection::Up
    } else {
        WeightDirection::Down
    };

    Some(WeightTrend {
        direction,
        weekly_change_kg,
        samples: points.len(),
    })
}

/// Calorie adjustment for a goal given the weight trend, bounded by the config
#[must_use]
pub fn calorie_delta(goal: Goal, trend: &WeightTrend, config: &TrendConfig) -> i32 {
    let step = config.calorie_step;
    let delta = match (goal, trend.direction) {
        (Goal::FatLoss, WeightDirection::Down) if trend.weekly_change_kg < -1.0 => step,
        (Goal::FatLoss, WeightDirection::Down) => 0,
        (Goal::FatLoss, WeightDirection::Flat) => -step,
        (Goal::FatLoss, WeightDirection::Up) => -2 * step,
        (Goal::MuscleGain, WeightDirection::Up) if trend.weekly_change_kg > 0.5 => -step,
        (Goal::MuscleGain, WeightDirection::Up) => 0,
        (Goal::MuscleGain, WeightDirection::Flat) => step,
        (Goal::MuscleGain, WeightDirection::Down) => 2 * step,
        (_, WeightDirection::Up) => -step,
        (_, WeightDirection::Flat) => 0,
        (_, WeightDirection::Down) => step,
    };
    delta.clamp(-config.max_calorie_delta, config.max_calorie_delta)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trend(direction: WeightDirection, weekly_change_kg: f64) -> WeightTrend {
        WeightTrend {
            direction,
            weekly_change_kg,
            samples: 5,
        }
    }

    #[test]
    fn test_calorie_delta_table() {
        let config = TrendConfig::default();
        assert_eq!(
            calorie_delta(Goal::FatLoss, &trend(WeightDirection::Up, 0.6), &config),
            -300
        );
        assert_eq!(
            calorie_delta(Goal::FatLoss, &trend(WeightDirection::Flat, 0.1), &config),
            -150
        );
        assert_eq!(
            calorie_delta(Goal::FatLoss, &trend(WeightDirection::Down, -1.4), &config),
            150
        );
        assert_eq!(
            calorie_delta(Goal::MuscleGain, &trend(WeightDirection::Down, -0.5), &config),
            300
        );
        assert_eq!(
            calorie_delta(Goal::MuscleGain, &trend(WeightDirection::Up, 0.8), &config),
            -150
        );
        assert_eq!(
            calorie_delta(Goal::Maintenance, &trend(WeightDirection::Up, 0.5), &config),
            -150
        );
    }

    #[test]
    fn test_normalise_score_bounds() {
        assert!((normalise_score(1) - 0.0).abs() < f64::EPSILON);
        assert!((normalise_score(5) - 1.0).abs() < f64::EPSILON);
        assert!((normalise_score(9) - 1.0).abs() < f64::EPSILON);
        assert!((normalise_score(0) - 0.0).abs() < f64::EPSILON);
    }
}
