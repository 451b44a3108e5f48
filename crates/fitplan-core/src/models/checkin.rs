// ABOUTME: Daily check-in snapshots and completion logs
// ABOUTME: Subjective state scores, soreness, digestion, body weight, and free-text notes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Digestion state reported in a check-in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigestionState {
    /// No complaints
    #[default]
    Normal,
    /// Bloating
    Bloated,
    /// Constipation
    Constipated,
    /// Diarrhea
    Diarrhea,
    /// Nausea
    Nauseous,
}

impl DigestionState {
    /// Storage representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Bloated => "bloated",
            Self::Constipated => "constipated",
            Self::Diarrhea => "diarrhea",
            Self::Nauseous => "nauseous",
        }
    }

    /// Parse the storage representation, defaulting to normal
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s {
            "bloated" => Self::Bloated,
            "constipated" => Self::Constipated,
            "diarrhea" => Self::Diarrhea,
            "nauseous" => Self::Nauseous,
            _ => Self::Normal,
        }
    }
}

impl fmt::Display for DigestionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One dated check-in. Append-only, one per user per day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckinData {
    /// Owner
    pub user_id: Uuid,
    /// Calendar day the check-in describes
    pub date: NaiveDate,
    /// Mood (1-5)
    pub mood: u8,
    /// Energy (1-5)
    pub energy: u8,
    /// Stress (1-5)
    pub stress: u8,
    /// Hours slept
    pub sleep_hours: f32,
    /// Sleep quality (1-5)
    pub sleep_quality: u8,
    /// Hydration (1-5)
    pub hydration: u8,
    /// Motivation (1-5)
    pub motivation: u8,
    /// Sore body areas ("quads", "lower back")
    #[serde(default)]
    pub soreness_areas: BTreeSet<String>,
    /// Digestion state
    #[serde(default)]
    pub digestion: DigestionState,
    /// Morning body weight (kg)
    #[serde(default)]
    pub body_weight_kg: Option<f64>,
    /// Free-text health note ("mild cold")
    #[serde(default)]
    pub health_note: Option<String>,
    /// Free-text lifestyle note ("travelling")
    #[serde(default)]
    pub lifestyle_note: Option<String>,
    /// When the check-in was recorded
    pub created_at: DateTime<Utc>,
}

impl CheckinData {
    /// Neutral check-in for a date, handy as a builder starting point
    #[must_use]
    pub fn neutral(user_id: Uuid, date: NaiveDate) -> Self {
        Self {
            user_id,
            date,
            mood: 3,
            energy: 3,
            stress: 3,
            sleep_hours: 7.5,
            sleep_quality: 3,
            hydration: 3,
            motivation: 3,
            soreness_areas: BTreeSet::new(),
            digestion: DigestionState::Normal,
            body_weight_kg: None,
            health_note: None,
            lifestyle_note: None,
            created_at: Utc::now(),
        }
    }

    /// Health and lifestyle notes that are present and non-blank
    #[must_use]
    pub fn notes(&self) -> Vec<String> {
        [&self.health_note, &self.lifestyle_note]
            .into_iter()
            .flatten()
            .map(|note| note.trim())
            .filter(|note| !note.is_empty())
            .map(ToOwned::to_owned)
            .collect()
    }
}

/// Completion status of a planned workout or nutrition day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    /// Done as planned
    Completed,
    /// Partly done
    Partial,
    /// Not done
    Skipped,
    /// No information
    #[default]
    Unknown,
}

impl CompletionStatus {
    /// Storage representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Partial => "partial",
            Self::Skipped => "skipped",
            Self::Unknown => "unknown",
        }
    }

    /// Parse the storage representation, defaulting to unknown
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s {
            "completed" => Self::Completed,
            "partial" => Self::Partial,
            "skipped" => Self::Skipped,
            _ => Self::Unknown,
        }
    }
}

/// What the user actually did on a day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionLog {
    /// Owner
    pub user_id: Uuid,
    /// Day the log describes
    pub date: NaiveDate,
    /// Workout completion
    pub workout: CompletionStatus,
    /// Nutrition adherence
    pub nutrition: CompletionStatus,
}
