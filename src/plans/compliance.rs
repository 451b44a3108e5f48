// ABOUTME: Compliance validator and fixer for candidate weekly plans
// ABOUTME: Local issue scan, structural fail-fast, one model fix call, then macro/section enforcement and scrub
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Compliance
//!
//! The local pass never touches the network. When it finds issues that are
//! not structural, a single model call is asked for a corrected plan. Whatever
//! comes back, macros and required sections are then enforced locally and any
//! remaining forbidden food or avoided exercise is removed.

use super::constraints::{forbidden_food, AvoidedExercises};
use super::json_recovery::parse_model_json;
use crate::config::PipelineConfig;
use crate::errors::PlanError;
use crate::llm::prompts::{render_fix_request, PLAN_FIX_PROMPT};
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};
use fitplan_core::models::{
    DayKey, DayPlan, DraftDay, DraftPlan, MacroTargets, NutritionSection, RecoverySection,
    UserProfile, WorkoutSection,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Kind of compliance problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// A weekday key is absent
    MissingDay,
    /// Workout, nutrition or recovery section absent or malformed
    MissingSection,
    /// Calories or protein differ from the targets
    MacroMismatch,
    /// A meal item violates a dietary restriction
    ForbiddenFood,
    /// A workout includes an exercise the user avoids
    AvoidedExercise,
}

/// One problem found in a candidate plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceIssue {
    /// Affected day, when the issue is day-scoped
    pub day: Option<DayKey>,
    /// Problem kind
    pub kind: IssueKind,
    /// Human-readable detail forwarded to the fixer
    pub detail: String,
}

impl fmt::Display for ComplianceIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.day {
            Some(day) => write!(f, "{day}: {}", self.detail),
            None => f.write_str(&self.detail),
        }
    }
}

/// All issues found in one plan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceReport {
    /// Issues in day order
    pub issues: Vec<ComplianceIssue>,
}

impl ComplianceReport {
    fn count(&self, kind: IssueKind) -> usize {
        self.issues.iter().filter(|issue| issue.kind == kind).count()
    }

    /// No issues at all
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Missing weekdays
    #[must_use]
    pub fn missing_days(&self) -> usize {
        self.count(IssueKind::MissingDay)
    }

    /// Missing sections across present days
    #[must_use]
    pub fn missing_sections(&self) -> usize {
        self.count(IssueKind::MissingSection)
    }

    /// Too damaged to hand to the fixer
    #[must_use]
    pub fn is_structural(&self, max_missing_sections: usize) -> bool {
        self.missing_days() > 0 || self.missing_sections() > max_missing_sections
    }

    /// Issues rendered as strings
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.issues.iter().map(ToString::to_string).collect()
    }
}

/// Local, network-free validation against one profile
#[derive(Debug, Clone)]
pub struct ComplianceChecker<'a> {
    profile: &'a UserProfile,
    targets: MacroTargets,
    avoided: AvoidedExercises,
}

impl<'a> ComplianceChecker<'a> {
    /// Checker for `profile` with its resolved macro targets
    #[must_use]
    pub fn new(profile: &'a UserProfile, targets: MacroTargets) -> Self {
        Self {
            profile,
            targets,
            avoided: AvoidedExercises::new(&profile.avoided_exercises),
        }
    }

    /// Enumerate every issue in `draft`
    #[must_use]
    pub fn check(&self, draft: &DraftPlan) -> ComplianceReport {
        let mut issues = Vec::new();
        for day in DayKey::ALL {
            let Some(plan_day) = draft.days.get(&day) else {
                issues.push(ComplianceIssue {
                    day: Some(day),
                    kind: IssueKind::MissingDay,
                    detail: "day is missing".to_owned(),
                });
                continue;
            };
            self.check_day(day, plan_day, &mut issues);
        }
        ComplianceReport { issues }
    }

    fn check_day(&self, day: DayKey, plan_day: &DraftDay, issues: &mut Vec<ComplianceIssue>) {
        let mut push = |kind: IssueKind, detail: String| {
            issues.push(ComplianceIssue {
                day: Some(day),
                kind,
                detail,
            });
        };

        match &plan_day.workout {
            None => push(IssueKind::MissingSection, "missing workout section".to_owned()),
            Some(workout) => {
                for exercise in workout.exercises() {
                    if let Some(avoided) = self.avoided.matched(&exercise.name) {
                        push(
                            IssueKind::AvoidedExercise,
                            format!("exercise '{}' matches avoided '{avoided}'", exercise.name),
                        );
                    }
                }
            }
        }

        match &plan_day.nutrition {
            None => push(IssueKind::MissingSection, "missing nutrition section".to_owned()),
            Some(nutrition) => {
                if nutrition.total_kcal != self.targets.total_kcal
                    || nutrition.protein_g != self.targets.protein_g
                {
                    push(
                        IssueKind::MacroMismatch,
                        format!(
                            "macros {} kcal / {} g protein, expected {} kcal / {} g protein",
                            nutrition.total_kcal,
                            nutrition.protein_g,
                            self.targets.total_kcal,
                            self.targets.protein_g
                        ),
                    );
                }
                for meal in &nutrition.meals {
                    for item in &meal.items {
                        if let Some((restriction, token)) =
                            forbidden_food(item, &self.profile.dietary_restrictions)
                        {
                            push(
                                IssueKind::ForbiddenFood,
                                format!(
                                    "{} item '{item}' contains '{token}' (not {})",
                                    meal.name,
                                    restriction.label()
                                ),
                            );
                        }
                    }
                }
            }
        }

        if plan_day.recovery.is_none() {
            push(IssueKind::MissingSection, "missing recovery section".to_owned());
        }
    }
}

/// Stage 2: validate, repair through the model, then enforce locally
pub struct ComplianceFixer {
    llm: Arc<dyn LlmProvider>,
    config: PipelineConfig,
    model: Option<String>,
}

impl ComplianceFixer {
    /// Fixer calling `llm` with the pipeline's token budget
    #[must_use]
    pub fn new(llm: Arc<dyn LlmProvider>, config: PipelineConfig, model: Option<String>) -> Self {
        Self { llm, config, model }
    }

    /// Turn a candidate into seven complete, macro-exact days
    ///
    /// # Errors
    ///
    /// `Structural` when the candidate is too damaged, `Verification` when the
    /// fixer call fails or returns unusable output.
    #[instrument(skip_all, fields(user.id = %profile.user_id, stage = "verify", attempt = attempt))]
    pub async fn verify(
        &self,
        candidate: &DraftPlan,
        profile: &UserProfile,
        targets: MacroTargets,
        attempt: u32,
    ) -> Result<BTreeMap<DayKey, DayPlan>, PlanError> {
        let checker = ComplianceChecker::new(profile, targets);
        let report = checker.check(candidate);
        if report.is_structural(self.config.max_repairable_missing_sections) {
            warn!(
                missing_days = report.missing_days(),
                missing_sections = report.missing_sections(),
                "Candidate plan is structurally incomplete"
            );
            return Err(PlanError::Structural {
                issues: report.messages(),
            });
        }

        let fixed = if report.is_clean() {
            debug!("Candidate plan passed local checks, skipping fixer call");
            None
        } else {
            info!(issues = report.issues.len(), "Sending plan to fixer");
            Some(self.request_fix(candidate, &report, profile, targets, attempt).await?)
        };

        let mut days = enforce(candidate, fixed.as_ref(), targets);
        scrub(&mut days, profile);
        Ok(days)
    }

    async fn request_fix(
        &self,
        candidate: &DraftPlan,
        report: &ComplianceReport,
        profile: &UserProfile,
        targets: MacroTargets,
        attempt: u32,
    ) -> Result<DraftPlan, PlanError> {
        let issues = report.messages();
        let plan_json = serde_json::to_value(candidate)
            .map_err(|e| PlanError::Internal(format!("serialize candidate: {e}")))?;
        let request = ChatRequest::new(vec![
            ChatMessage::system(PLAN_FIX_PROMPT),
            ChatMessage::user(render_fix_request(&plan_json, &issues, profile, &targets)),
        ])
        .with_optional_model(self.model.as_deref())
        .with_temperature(self.config.fix_temperature)
        .with_max_tokens(self.config.fix_max_tokens);

        let response = self.llm.complete(&request).await.map_err(|e| {
            PlanError::Verification {
                attempt,
                message: format!("fixer call failed: {}", e.message),
                issues: issues.clone(),
            }
        })?;
        let parsed = parse_model_json(&response.content).map_err(|e| PlanError::Verification {
            attempt,
            message: e.to_string(),
            issues: issues.clone(),
        })?;
        debug!(repair_stage = %parsed.stage, "Parsed fixer output");
        Ok(DraftPlan::from_value(&parsed.value))
    }
}

fn pick_section<T: Clone>(
    fixed: Option<&DraftDay>,
    candidate: Option<&DraftDay>,
    get: impl Fn(&DraftDay) -> Option<&T>,
) -> Option<T> {
    fixed
        .and_then(&get)
        .or_else(|| candidate.and_then(&get))
        .cloned()
}

/// Pick each section from the fixed plan, else the candidate, else a default,
/// and overwrite the nutrition totals with the targets
#[must_use]
pub fn enforce(
    candidate: &DraftPlan,
    fixed: Option<&DraftPlan>,
    targets: MacroTargets,
) -> BTreeMap<DayKey, DayPlan> {
    DayKey::ALL
        .into_iter()
        .map(|day| {
            let fixed_day = fixed.and_then(|plan| plan.days.get(&day));
            let candidate_day = candidate.days.get(&day);

            let workout: WorkoutSection =
                pick_section(fixed_day, candidate_day, |d| d.workout.as_ref()).unwrap_or_default();
            let mut nutrition: NutritionSection =
                pick_section(fixed_day, candidate_day, |d| d.nutrition.as_ref())
                    .unwrap_or_default();
            let recovery: RecoverySection =
                pick_section(fixed_day, candidate_day, |d| d.recovery.as_ref())
                    .unwrap_or_default();
            let rationale: String =
                pick_section(fixed_day, candidate_day, |d| d.rationale.as_ref())
                    .unwrap_or_default();

            nutrition.total_kcal = targets.total_kcal;
            nutrition.protein_g = targets.protein_g;
            nutrition.carbs_g = targets.carbs_g;
            nutrition.fat_g = targets.fat_g;

            (
                day,
                DayPlan {
                    workout,
                    nutrition,
                    recovery,
                    rationale,
                },
            )
        })
        .collect()
}

/// Remove any meal item or exercise still violating the profile
pub fn scrub(days: &mut BTreeMap<DayKey, DayPlan>, profile: &UserProfile) {
    let avoided = AvoidedExercises::new(&profile.avoided_exercises);
    for (day, plan) in days.iter_mut() {
        scrub_day(*day, plan, profile, &avoided);
    }
}

/// Scrub a single day, logging every removal
pub fn scrub_day(day: DayKey, plan: &mut DayPlan, profile: &UserProfile, avoided: &AvoidedExercises) {
    for meal in &mut plan.nutrition.meals {
        meal.items.retain(|item| {
            let Some((restriction, token)) = forbidden_food(item, &profile.dietary_restrictions)
            else {
                return true;
            };
            warn!(
                user.id = %profile.user_id,
                %day,
                meal = %meal.name,
                item = %item,
                token,
                restriction = restriction.label(),
                "Removed forbidden food left in the plan"
            );
            false
        });
    }
    if avoided.is_empty() {
        return;
    }
    for block in &mut plan.workout.blocks {
        block.exercises.retain(|exercise| {
            let Some(name) = avoided.matched(&exercise.name) else {
                return true;
            };
            warn!(
                user.id = %profile.user_id,
                %day,
                exercise = %exercise.name,
                avoided = name,
                "Removed avoided exercise left in the plan"
            );
            false
        });
    }
    plan.workout.blocks.retain(|block| !block.exercises.is_empty());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{sample_draft, sample_profile};
    use fitplan_core::models::{DietaryRestriction, Exercise, Meal, WorkoutBlock};

    fn targets() -> MacroTargets {
        MacroTargets {
            total_kcal: 2_000,
            protein_g: 140,
            carbs_g: 210,
            fat_g: 61,
        }
    }

    #[test]
    fn test_missing_day_is_structural() {
        let profile = sample_profile();
        let mut draft = sample_draft(targets());
        draft.days.remove(&DayKey::Sunday);
        let report = ComplianceChecker::new(&profile, targets()).check(&draft);
        assert_eq!(report.missing_days(), 1);
        assert!(report.is_structural(7));
    }

    #[test]
    fn test_section_threshold() {
        let profile = sample_profile();
        let mut draft = sample_draft(targets());
        for day in DayKey::ALL.iter().take(4) {
            let entry = draft.days.get_mut(day).unwrap();
            entry.recovery = None;
            entry.workout = None;
        }
        let report = ComplianceChecker::new(&profile, targets()).check(&draft);
        assert_eq!(report.missing_sections(), 8);
        assert!(report.is_structural(7));

        draft.days.get_mut(&DayKey::Monday).unwrap().workout = Some(WorkoutSection::default());
        let report = ComplianceChecker::new(&profile, targets()).check(&draft);
        assert!(!report.is_structural(7));
    }

    #[test]
    fn test_enforce_falls_back_to_candidate_then_default() {
        let candidate = sample_draft(targets());
        let mut fixed = DraftPlan::default();
        fixed.days.insert(
            DayKey::Monday,
            DraftDay {
                workout: None,
                nutrition: Some(NutritionSection {
                    total_kcal: 9_999,
                    protein_g: 1,
                    ..NutritionSection::default()
                }),
                recovery: None,
                rationale: Some("fixed".to_owned()),
            },
        );
        let days = enforce(&candidate, Some(&fixed), targets());
        let monday = &days[&DayKey::Monday];
        assert_eq!(monday.rationale, "fixed");
        assert_eq!(monday.nutrition.total_kcal, 2_000);
        assert_eq!(monday.nutrition.protein_g, 140);
        assert_eq!(monday.workout, candidate.days[&DayKey::Monday].workout.clone().unwrap());

        let days = enforce(&DraftPlan::default(), None, targets());
        assert_eq!(days.len(), 7);
        assert_eq!(days[&DayKey::Friday].nutrition.fat_g, 61);
    }

    #[test]
    fn test_scrub_removes_leftovers() {
        let mut profile = sample_profile();
        profile
            .dietary_restrictions
            .insert(DietaryRestriction::Vegetarian);
        profile.avoided_exercises = vec!["Burpees".to_owned()];

        let mut days = enforce(&sample_draft(targets()), None, targets());
        let monday = days.get_mut(&DayKey::Monday).unwrap();
        monday.nutrition.meals = vec![Meal {
            name: "lunch".to_owned(),
            items: vec!["Tuna salad".to_owned(), "Eggplant curry".to_owned()],
            ..Meal::default()
        }];
        monday.workout.blocks = vec![WorkoutBlock {
            name: "finisher".to_owned(),
            exercises: vec![Exercise {
                name: "Burpee".to_owned(),
                ..Exercise::default()
            }],
        }];

        scrub(&mut days, &profile);
        let monday = &days[&DayKey::Monday];
        assert_eq!(monday.nutrition.meals[0].items, vec!["Eggplant curry".to_owned()]);
        assert!(monday.workout.blocks.is_empty());
    }
}
