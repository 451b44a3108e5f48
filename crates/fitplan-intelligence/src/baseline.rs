// ABOUTME: Deterministic rule-based daily adjustment applied before AI titration
// ABOUTME: Low energy softens the main block, high stress swaps to recovery, soreness adds caution
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::config::BaselineConfig;
use fitplan_core::models::{
    CheckinData, DayPlan, Exercise, NutritionSection, RecoverySection, WorkoutBlock,
    WorkoutSection,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Exercises kept in the main block on a low-energy day
const LOW_ENERGY_MAX_MAIN_EXERCISES: usize = 3;

/// Base-plan day after the rule-based adjustments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineDay {
    /// Adjusted workout
    pub workout: WorkoutSection,
    /// Nutrition, unchanged by the baseline
    pub nutrition: NutritionSection,
    /// Adjusted recovery
    pub recovery: RecoverySection,
    /// Reasons for each applied rule
    pub adjustments: Vec<String>,
    /// Whether the day was swapped to a recovery-only protocol
    pub recovery_only: bool,
}

/// Apply the deterministic rules for the day's check-in
#[must_use]
pub fn apply_baseline(day: &DayPlan, checkin: &CheckinData, config: &BaselineConfig) -> BaselineDay {
    let mut workout = day.workout.clone();
    let mut recovery = day.recovery.clone();
    let mut adjustments = Vec::new();

    let low_energy = checkin.energy <= config.low_energy_threshold;
    let high_stress = checkin.stress >= config.high_stress_threshold;

    if high_stress {
        workout = recovery_protocol();
        adjustments.push(format!(
            "Stress is high ({}/5): today is a recovery-only day.",
            checkin.stress
        ));
    } else if low_energy && !workout.is_rest_day && soften_main_block(&mut workout) {
        adjustments.push(format!(
            "Energy is low ({}/5): main block trimmed to {LOW_ENERGY_MAX_MAIN_EXERCISES} exercises with one set less each.",
            checkin.energy
        ));
    }

    if low_energy {
        recovery.sleep_target_hours += config.extra_sleep_hours;
        recovery.hydration_liters += config.extra_hydration_liters;
        adjustments.push(format!(
            "Low energy: sleep target raised by {} h and hydration by {} L.",
            config.extra_sleep_hours, config.extra_hydration_liters
        ));
    }

    if !checkin.soreness_areas.is_empty() {
        let areas = checkin
            .soreness_areas
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        recovery.notes.push(format!(
            "Caution: soreness reported in {areas}. Reduce load or skip movements that aggravate it."
        ));
        adjustments.push(format!("Soreness in {areas}: caution note added."));
    }

    debug!(
        energy = checkin.energy,
        stress = checkin.stress,
        rules = adjustments.len(),
        "Applied baseline titration"
    );

    BaselineDay {
        workout,
        nutrition: day.nutrition.clone(),
        recovery,
        adjustments,
        recovery_only: high_stress,
    }
}

/// Trim and soften the main block; returns whether anything changed
fn soften_main_block(workout: &mut WorkoutSection) -> bool {
    let main_index = workout
        .blocks
        .iter()
        .position(|block| block.name.to_lowercase().contains("main"))
        .or_else(|| {
            workout
                .blocks
                .iter()
                .enumerate()
                .max_by_key(|(_, block)| block.exercises.len())
                .map(|(index, _)| index)
        });
    let Some(block) = main_index.and_then(|index| workout.blocks.get_mut(index)) else {
        return false;
    };
    if block.exercises.is_empty() {
        return false;
    }

    block.exercises.truncate(LOW_ENERGY_MAX_MAIN_EXERCISES);
    for exercise in &mut block.exercises {
        if let Some(sets) = exercise.sets {
            exercise.sets = Some(sets.saturating_sub(1).max(1));
        }
    }
    true
}

fn timed(name: &str, minutes: u32, notes: &str) -> Exercise {
    Exercise {
        name: name.to_owned(),
        sets: None,
        reps: None,
        duration_minutes: Some(minutes),
        notes: Some(notes.to_owned()),
    }
}

fn recovery_protocol() -> WorkoutSection {
    WorkoutSection {
        focus: "Active recovery".to_owned(),
        is_rest_day: true,
        blocks: vec![WorkoutBlock {
            name: "Recovery".to_owned(),
            exercises: vec![
                timed("Easy walk", 20, "Conversational pace"),
                timed("Mobility flow", 15, "Hips, thoracic spine, shoulders"),
                timed("Box breathing", 5, "4 s in, 4 s hold, 4 s out, 4 s hold"),
            ],
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn strength_day() -> DayPlan {
        let lift = |name: &str| Exercise {
            name: name.to_owned(),
            sets: Some(4),
            reps: Some("6-8".to_owned()),
            ..Exercise::default()
        };
        DayPlan {
            workout: WorkoutSection {
                focus: "Lower body".to_owned(),
                is_rest_day: false,
                blocks: vec![
                    WorkoutBlock {
                        name: "Warm-up".to_owned(),
                        exercises: vec![lift("Leg swings")],
                    },
                    WorkoutBlock {
                        name: "Main".to_owned(),
                        exercises: vec![
                            lift("Back squat"),
                            lift("Romanian deadlift"),
                            lift("Split squat"),
                            lift("Leg curl"),
                        ],
                    },
                ],
            },
            recovery: RecoverySection {
                sleep_target_hours: 8.0,
                hydration_liters: 2.5,
                ..RecoverySection::default()
            },
            ..DayPlan::default()
        }
    }

    fn checkin() -> CheckinData {
        CheckinData::neutral(Uuid::new_v4(), NaiveDate::from_ymd_opt(2025, 3, 10).unwrap())
    }

    #[test]
    fn test_neutral_checkin_changes_nothing() {
        let day = strength_day();
        let result = apply_baseline(&day, &checkin(), &BaselineConfig::default());
        assert_eq!(result.workout, day.workout);
        assert!(result.adjustments.is_empty());
        assert!(!result.recovery_only);
    }

    #[test]
    fn test_low_energy_softens_main_block_and_raises_rest() {
        let mut c = checkin();
        c.energy = 2;
        let result = apply_baseline(&strength_day(), &c, &BaselineConfig::default());
        let main = &result.workout.blocks[1];
        assert_eq!(main.exercises.len(), 3);
        assert!(main.exercises.iter().all(|e| e.sets == Some(3)));
        assert_eq!(result.workout.blocks[0].exercises[0].sets, Some(4));
        assert!((result.recovery.sleep_target_hours - 8.5).abs() < f32::EPSILON);
        assert!((result.recovery.hydration_liters - 3.0).abs() < f32::EPSILON);
        assert_eq!(result.adjustments.len(), 2);
    }

    #[test]
    fn test_high_stress_swaps_to_recovery() {
        let mut c = checkin();
        c.stress = 5;
        let result = apply_baseline(&strength_day(), &c, &BaselineConfig::default());
        assert!(result.recovery_only);
        assert!(result.workout.is_rest_day);
        assert!(result
            .workout
            .exercises()
            .all(|e| e.duration_minutes.is_some()));
    }

    #[test]
    fn test_soreness_appends_caution() {
        let mut c = checkin();
        c.soreness_areas.insert("quads".to_owned());
        let result = apply_baseline(&strength_day(), &c, &BaselineConfig::default());
        assert!(result
            .recovery
            .notes
            .iter()
            .any(|note| note.starts_with("Caution") && note.contains("quads")));
    }
}
