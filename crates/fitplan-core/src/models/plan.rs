// ABOUTME: Weekly base plan data model with per-day workout, nutrition, and recovery sections
// ABOUTME: Includes the tolerant draft shape used to read raw model output before verification
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Weekday key of a plan day
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayKey {
    /// Monday
    Monday,
    /// Tuesday
    Tuesday,
    /// Wednesday
    Wednesday,
    /// Thursday
    Thursday,
    /// Friday
    Friday,
    /// Saturday
    Saturday,
    /// Sunday
    Sunday,
}

impl DayKey {
    /// All seven keys in calendar order
    pub const ALL: [Self; 7] = [
        Self::Monday,
        Self::Tuesday,
        Self::Wednesday,
        Self::Thursday,
        Self::Friday,
        Self::Saturday,
        Self::Sunday,
    ];

    /// Lowercase key as used in plan JSON
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Monday => "monday",
            Self::Tuesday => "tuesday",
            Self::Wednesday => "wednesday",
            Self::Thursday => "thursday",
            Self::Friday => "friday",
            Self::Saturday => "saturday",
            Self::Sunday => "sunday",
        }
    }

    /// Key for the weekday of a calendar date
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        Self::ALL[date.weekday().num_days_from_monday() as usize]
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DayKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|day| day.as_str() == lowered || day.as_str()[..3] == lowered)
            .ok_or_else(|| format!("unknown weekday '{s}'"))
    }
}

/// Monday of the week containing `date` (start of a generation cycle)
#[must_use]
pub fn cycle_week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// A single exercise prescription
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Exercise {
    /// Exercise name
    pub name: String,
    /// Number of sets
    #[serde(deserialize_with = "lenient::opt_u32")]
    pub sets: Option<u32>,
    /// Reps prescription ("8-10", "AMRAP")
    #[serde(deserialize_with = "lenient::opt_string")]
    pub reps: Option<String>,
    /// Duration for timed work (minutes)
    #[serde(deserialize_with = "lenient::opt_u32")]
    pub duration_minutes: Option<u32>,
    /// Coaching notes
    pub notes: Option<String>,
}

/// A named group of exercises (warm-up, main, finisher)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkoutBlock {
    /// Block name
    pub name: String,
    /// Exercises in order
    pub exercises: Vec<Exercise>,
}

/// Workout section of a day
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkoutSection {
    /// Session focus ("lower body strength")
    pub focus: String,
    /// Whether the day is a rest day
    pub is_rest_day: bool,
    /// Ordered workout blocks
    pub blocks: Vec<WorkoutBlock>,
}

impl WorkoutSection {
    /// Iterate every exercise across all blocks
    pub fn exercises(&self) -> impl Iterator<Item = &Exercise> {
        self.blocks.iter().flat_map(|block| block.exercises.iter())
    }
}

/// A meal with its food items
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Meal {
    /// Meal name ("breakfast")
    pub name: String,
    /// Food items
    pub items: Vec<String>,
    /// Approximate energy (kcal)
    #[serde(deserialize_with = "lenient::opt_u32")]
    pub kcal: Option<u32>,
    /// Approximate protein (grams)
    #[serde(deserialize_with = "lenient::opt_u32")]
    pub protein_g: Option<u32>,
}

/// Nutrition section of a day
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NutritionSection {
    /// Total daily energy (kcal)
    #[serde(deserialize_with = "lenient::u32_or_zero")]
    pub total_kcal: u32,
    /// Daily protein (grams)
    #[serde(deserialize_with = "lenient::u32_or_zero")]
    pub protein_g: u32,
    /// Daily carbohydrates (grams)
    #[serde(deserialize_with = "lenient::u32_or_zero")]
    pub carbs_g: u32,
    /// Daily fat (grams)
    #[serde(deserialize_with = "lenient::u32_or_zero")]
    pub fat_g: u32,
    /// Meals in order
    pub meals: Vec<Meal>,
}

/// Recovery guidance for a day
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoverySection {
    /// Sleep target (hours)
    pub sleep_target_hours: f32,
    /// Hydration target (liters)
    pub hydration_liters: f32,
    /// Mobility or stretching work
    pub mobility: Vec<String>,
    /// Additional recovery notes
    pub notes: Vec<String>,
}

/// One day of the weekly plan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayPlan {
    /// Workout prescription
    pub workout: WorkoutSection,
    /// Nutrition targets and meals
    pub nutrition: NutritionSection,
    /// Recovery guidance
    pub recovery: RecoverySection,
    /// Natural-language explanation of the day
    #[serde(default)]
    pub rationale: String,
}

/// Lifecycle of a stored base plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// Current plan for the user
    Active,
    /// Superseded by a newer plan, kept for history
    Archived,
}

impl PlanStatus {
    /// Storage representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Archived => "archived",
        }
    }
}

/// A verified seven-day plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyBasePlan {
    /// Plan identifier
    pub id: Uuid,
    /// Owner
    pub user_id: Uuid,
    /// Job that produced the plan
    pub job_id: Option<Uuid>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Monday of the cycle this plan covers
    pub cycle_week_start: NaiveDate,
    /// The seven days
    pub days: BTreeMap<DayKey, DayPlan>,
    /// Locked once the user starts using the plan; no automated edits after
    pub locked: bool,
    /// Active or archived
    pub status: PlanStatus,
    /// When the plan was superseded
    pub archived_at: Option<DateTime<Utc>>,
}

impl WeeklyBasePlan {
    /// Wrap verified days into a new active plan
    #[must_use]
    pub fn new(
        user_id: Uuid,
        job_id: Option<Uuid>,
        days: BTreeMap<DayKey, DayPlan>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            job_id,
            created_at: now,
            cycle_week_start: cycle_week_start(now.date_naive()),
            days,
            locked: false,
            status: PlanStatus::Active,
            archived_at: None,
        }
    }

    /// Plan for a given weekday
    #[must_use]
    pub fn day(&self, key: DayKey) -> Option<&DayPlan> {
        self.days.get(&key)
    }

    /// Whether all seven weekday keys are present
    #[must_use]
    pub fn is_complete(&self) -> bool {
        DayKey::ALL.iter().all(|day| self.days.contains_key(day))
    }
}

/// A day as the model returned it: every section optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DraftDay {
    /// Workout, if present and well-formed
    #[serde(deserialize_with = "lenient::opt_section")]
    pub workout: Option<WorkoutSection>,
    /// Nutrition, if present and well-formed
    #[serde(deserialize_with = "lenient::opt_section")]
    pub nutrition: Option<NutritionSection>,
    /// Recovery, if present and well-formed
    #[serde(deserialize_with = "lenient::opt_section")]
    pub recovery: Option<RecoverySection>,
    /// Rationale text
    #[serde(deserialize_with = "lenient::opt_string")]
    pub rationale: Option<String>,
}

/// Unverified plan read from model output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DraftPlan {
    /// Days keyed by weekday; absent days are simply missing
    pub days: BTreeMap<DayKey, DraftDay>,
}

impl DraftPlan {
    /// Read a draft from parsed model JSON
    ///
    /// Accepts both `{"days": {...}}` and a bare weekday map, with weekday
    /// keys in any case. Unknown keys are ignored.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let days_value = value
            .get("days")
            .or_else(|| value.get("plan"))
            .filter(|inner| inner.is_object())
            .unwrap_or(value);

        let mut days = BTreeMap::new();
        if let Some(map) = days_value.as_object() {
            for (key, day_value) in map {
                let Ok(day) = key.parse::<DayKey>() else {
                    continue;
                };
                let draft = serde_json::from_value::<DraftDay>(day_value.clone())
                    .unwrap_or_default();
                days.insert(day, draft);
            }
        }
        Self { days }
    }

    /// Weekdays absent from the draft
    #[must_use]
    pub fn missing_days(&self) -> Vec<DayKey> {
        DayKey::ALL
            .into_iter()
            .filter(|day| !self.days.contains_key(day))
            .collect()
    }
}

/// Deserializers that accept the loose numeric and string shapes models emit
mod lenient {
    use super::{Deserialize, Deserializer, Value};
    use serde::de::DeserializeOwned;

    fn value_to_u32(value: &Value) -> Option<u32> {
        match value {
            Value::Number(number) => number
                .as_u64()
                .or_else(|| number.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
                .and_then(|n| u32::try_from(n).ok()),
            Value::String(text) => {
                let digits: String = text
                    .trim()
                    .chars()
                    .take_while(|c| c.is_ascii_digit() || *c == '.')
                    .collect();
                digits
                    .parse::<f64>()
                    .ok()
                    .filter(|f| *f >= 0.0)
                    .and_then(|f| u32::try_from(f.round() as u64).ok())
            }
            _ => None,
        }
    }

    pub fn opt_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(value_to_u32(&value))
    }

    pub fn u32_or_zero<'de, D>(deserializer: D) -> Result<u32, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(value_to_u32(&value).unwrap_or(0))
    }

    pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::String(text) => Some(text),
            Value::Number(number) => Some(number.to_string()),
            Value::Bool(flag) => Some(flag.to_string()),
            _ => None,
        })
    }

    pub fn opt_section<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let value = Value::deserialize(deserializer)?;
        if value.is_object() {
            Ok(serde_json::from_value(value).ok())
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_day_key_parsing() {
        assert_eq!("Monday".parse::<DayKey>(), Ok(DayKey::Monday));
        assert_eq!("sun".parse::<DayKey>(), Ok(DayKey::Sunday));
        assert!("someday".parse::<DayKey>().is_err());
    }

    #[test]
    fn test_cycle_week_start_is_monday() {
        let thursday = NaiveDate::from_ymd_opt(2025, 3, 13).unwrap();
        assert_eq!(
            cycle_week_start(thursday),
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
        );
        let monday = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        assert_eq!(cycle_week_start(monday), monday);
    }

    #[test]
    fn test_draft_tolerates_loose_numbers_and_missing_sections() {
        let value = json!({
            "days": {
                "Monday": {
                    "nutrition": {"total_kcal": "2200 kcal", "protein_g": 150.4, "meals": []},
                    "workout": "rest"
                },
                "notaday": {}
            }
        });
        let draft = DraftPlan::from_value(&value);
        let monday = &draft.days[&DayKey::Monday];
        let nutrition = monday.nutrition.as_ref().unwrap();
        assert_eq!(nutrition.total_kcal, 2200);
        assert_eq!(nutrition.protein_g, 150);
        assert!(monday.workout.is_none());
        assert_eq!(draft.missing_days().len(), 6);
    }

    #[test]
    fn test_draft_accepts_bare_weekday_map() {
        let value = json!({"tuesday": {"rationale": "easy day"}});
        let draft = DraftPlan::from_value(&value);
        assert_eq!(
            draft.days[&DayKey::Tuesday].rationale.as_deref(),
            Some("easy day")
        );
    }
}
