// ABOUTME: Integration tests for trend memory: threshold, EMA bounds, streaks, weight trend
// ABOUTME: Exercises the public compute entry point with synthetic check-in histories
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use chrono::{Duration, NaiveDate};
use fitplan_core::models::{CheckinData, DigestionState, Goal};
use fitplan_intelligence::trend_memory::normalise_score;
use fitplan_intelligence::{TrendConfig, TrendMemory, WeightDirection};
use uuid::Uuid;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
}

fn history(user: Uuid, days: i64) -> Vec<CheckinData> {
    (0..days)
        .map(|offset| CheckinData::neutral(user, start() + Duration::days(offset)))
        .collect()
}

#[test]
fn test_absent_below_four_checkins() {
    let user = Uuid::new_v4();
    let config = TrendConfig::default();
    assert!(TrendMemory::compute(&history(user, 0), Goal::Maintenance, &config).is_none());
    assert!(TrendMemory::compute(&history(user, 3), Goal::Maintenance, &config).is_none());
    assert!(TrendMemory::compute(&history(user, 4), Goal::Maintenance, &config).is_some());
}

#[test]
fn test_ema_bounded_and_moves_toward_latest() {
    let user = Uuid::new_v4();
    let config = TrendConfig::default();
    let energies = [1u8, 5, 2, 4, 5, 1, 3, 5, 5, 2];

    let mut checkins = Vec::new();
    let mut previous_ema: Option<f64> = None;
    for (offset, energy) in energies.iter().enumerate() {
        let mut checkin = CheckinData::neutral(user, start() + Duration::days(offset as i64));
        checkin.energy = *energy;
        checkin.sleep_hours = 4.0 + offset as f32;
        checkins.push(checkin);

        let Some(memory) = TrendMemory::compute(&checkins, Goal::Maintenance, &config) else {
            assert!(checkins.len() < 4);
            continue;
        };
        for trend in [memory.energy, memory.sleep, memory.stress, memory.hydration] {
            assert!((0.0..=1.0).contains(&trend.ema), "ema out of range: {trend:?}");
        }

        let ema = memory.energy.ema;
        if let Some(prev) = previous_ema {
            let latest = normalise_score(*energy);
            if latest > prev {
                assert!(ema > prev && ema <= latest);
            } else if latest < prev {
                assert!(ema < prev && ema >= latest);
            } else {
                assert!((ema - prev).abs() < 1e-12);
            }
        }
        previous_ema = Some(ema);
    }
}

#[test]
fn test_ema_seeded_from_oldest_sample() {
    let user = Uuid::new_v4();
    let mut checkins = history(user, 4);
    for checkin in &mut checkins {
        checkin.stress = 5;
    }
    let memory = TrendMemory::compute(&checkins, Goal::FatLoss, &TrendConfig::default()).unwrap();
    assert!((memory.stress.ema - 1.0).abs() < 1e-12);
    assert!((memory.stress.latest_raw - 5.0).abs() < f64::EPSILON);
}

#[test]
fn test_soreness_streak_red_flag_and_gap() {
    let user = Uuid::new_v4();
    let mut checkins = history(user, 6);
    for checkin in &mut checkins[2..] {
        checkin.soreness_areas.insert("knees".to_owned());
    }
    for checkin in &mut checkins[4..] {
        checkin.soreness_areas.insert("lower back".to_owned());
    }
    let memory = TrendMemory::compute(&checkins, Goal::Maintenance, &TrendConfig::default()).unwrap();
    assert_eq!(memory.soreness_streaks[0].label, "knees");
    assert_eq!(memory.soreness_streaks[0].length_days, 4);
    assert!(memory.soreness_streaks[0].red_flag);
    assert_eq!(memory.soreness_streaks[1].length_days, 2);
    assert!(!memory.soreness_streaks[1].red_flag);
    assert!(memory.has_red_flag());

    // A missing day breaks the run
    let mut gapped = history(user, 6);
    gapped.remove(3);
    for checkin in &mut gapped {
        checkin.soreness_areas.insert("knees".to_owned());
    }
    let memory = TrendMemory::compute(&gapped, Goal::Maintenance, &TrendConfig::default()).unwrap();
    assert_eq!(memory.soreness_streaks[0].length_days, 2);
}

#[test]
fn test_digestion_streak_only_when_not_normal() {
    let user = Uuid::new_v4();
    let mut checkins = history(user, 5);
    let memory = TrendMemory::compute(&checkins, Goal::Maintenance, &TrendConfig::default()).unwrap();
    assert!(memory.digestion_streak.is_none());

    for checkin in &mut checkins[1..] {
        checkin.digestion = DigestionState::Bloated;
    }
    let memory = TrendMemory::compute(&checkins, Goal::Maintenance, &TrendConfig::default()).unwrap();
    let streak = memory.digestion_streak.unwrap();
    assert_eq!(streak.label, "bloated");
    assert_eq!(streak.length_days, 4);
    assert!(streak.red_flag);
}

#[test]
fn test_weight_trend_maps_to_calorie_delta() {
    let user = Uuid::new_v4();
    let mut checkins = history(user, 7);
    for (offset, checkin) in checkins.iter_mut().enumerate() {
        checkin.body_weight_kg = Some(80.0 + 0.1 * offset as f64);
    }
    let memory = TrendMemory::compute(&checkins, Goal::FatLoss, &TrendConfig::default()).unwrap();
    let trend = memory.weight_trend.unwrap();
    assert_eq!(trend.direction, WeightDirection::Up);
    assert!((trend.weekly_change_kg - 0.7).abs() < 1e-9);
    assert_eq!(memory.calorie_delta, -300);

    let memory = TrendMemory::compute(&checkins, Goal::MuscleGain, &TrendConfig::default()).unwrap();
    assert_eq!(memory.calorie_delta, -150);
}

#[test]
fn test_weight_trend_needs_two_weigh_ins_and_reports_flat() {
    let user = Uuid::new_v4();
    let mut checkins = history(user, 6);
    checkins[5].body_weight_kg = Some(70.0);
    let memory = TrendMemory::compute(&checkins, Goal::FatLoss, &TrendConfig::default()).unwrap();
    assert!(memory.weight_trend.is_none());
    assert_eq!(memory.calorie_delta, 0);

    checkins[2].body_weight_kg = Some(70.05);
    let memory = TrendMemory::compute(&checkins, Goal::FatLoss, &TrendConfig::default()).unwrap();
    assert_eq!(memory.weight_trend.unwrap().direction, WeightDirection::Flat);
    assert_eq!(memory.calorie_delta, -150);
}

#[test]
fn test_window_keeps_newest_thirty() {
    let user = Uuid::new_v4();
    let mut checkins = history(user, 40);
    checkins.reverse();
    let memory = TrendMemory::compute(&checkins, Goal::Maintenance, &TrendConfig::default()).unwrap();
    assert_eq!(memory.checkin_count, 30);
}
