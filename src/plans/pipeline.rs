// ABOUTME: Two-stage base plan pipeline: raw generation followed by verification and repair
// ABOUTME: Bounded attempts with a fixed delay; exhaustion surfaces a typed error, never a fallback plan
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Generation Pipeline
//!
//! Each attempt runs `generate -> verify`. Stage 1 must produce all seven
//! weekday keys; stage 2 is [`ComplianceFixer::verify`]. Attempts are
//! separated by a fixed delay without jitter. When every attempt fails the
//! caller gets [`PlanError::AttemptsExhausted`] carrying the stage, attempt
//! number and issue list of the final failure.

use super::compliance::ComplianceFixer;
use super::json_recovery::{parse_model_json, RepairStage};
use crate::config::PipelineConfig;
use crate::errors::{PipelineStage, PlanError};
use crate::llm::prompts::{render_generation_request, PLAN_GENERATION_PROMPT};
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};
use fitplan_core::models::{DayKey, DayPlan, DraftPlan, MacroTargets, UserProfile};
use fitplan_intelligence::derive_targets;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{info, instrument, warn};

/// A verified week of days, not yet wrapped into a stored plan
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedPlan {
    /// Seven complete days
    pub days: BTreeMap<DayKey, DayPlan>,
    /// Targets every day was enforced to
    pub targets: MacroTargets,
    /// Attempt that succeeded (1-based)
    pub attempts: u32,
    /// Parser stage used for the stage 1 output
    pub repair_stage: RepairStage,
}

/// Generate -> verify pipeline over one model collaborator
pub struct PlanPipeline {
    llm: Arc<dyn LlmProvider>,
    fixer: ComplianceFixer,
    config: PipelineConfig,
    model: Option<String>,
}

impl PlanPipeline {
    /// Pipeline using `llm` for both stages
    #[must_use]
    pub fn new(llm: Arc<dyn LlmProvider>, config: PipelineConfig, model: Option<String>) -> Self {
        let fixer = ComplianceFixer::new(Arc::clone(&llm), config.clone(), model.clone());
        Self {
            llm,
            fixer,
            config,
            model,
        }
    }

    /// Run attempts until one yields a verified plan
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::AttemptsExhausted`] after the last failed attempt
    #[instrument(skip_all, fields(user.id = %profile.user_id))]
    pub async fn generate(&self, profile: &UserProfile) -> Result<GeneratedPlan, PlanError> {
        let targets = derive_targets(profile);
        let max_attempts = self.config.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            match self.run_attempt(profile, targets, attempt).await {
                Ok(plan) => {
                    info!(attempt, repair_stage = %plan.repair_stage, "Base plan generated");
                    return Ok(plan);
                }
                Err(error) => {
                    warn!(attempt, max_attempts, "Plan attempt failed: {error}");
                    last_error = Some(error);
                    if attempt < max_attempts {
                        sleep(self.config.retry_delay).await;
                    }
                }
            }
        }

        Err(exhausted(last_error, max_attempts))
    }

    async fn run_attempt(
        &self,
        profile: &UserProfile,
        targets: MacroTargets,
        attempt: u32,
    ) -> Result<GeneratedPlan, PlanError> {
        let (draft, repair_stage) = self.stage_generate(profile, targets, attempt).await?;
        let days = self.fixer.verify(&draft, profile, targets, attempt).await?;
        Ok(GeneratedPlan {
            days,
            targets,
            attempts: attempt,
            repair_stage,
        })
    }

    /// Stage 1: ask for a raw plan and require all seven days
    #[instrument(skip_all, fields(stage = "generate", attempt = attempt))]
    async fn stage_generate(
        &self,
        profile: &UserProfile,
        targets: MacroTargets,
        attempt: u32,
    ) -> Result<(DraftPlan, RepairStage), PlanError> {
        let request = ChatRequest::new(vec![
            ChatMessage::system(PLAN_GENERATION_PROMPT),
            ChatMessage::user(render_generation_request(profile, &targets)),
        ])
        .with_optional_model(self.model.as_deref())
        .with_temperature(self.config.generation_temperature)
        .with_max_tokens(self.config.generation_max_tokens);

        let response = self
            .llm
            .complete(&request)
            .await
            .map_err(|e| PlanError::Generation {
                attempt,
                message: format!("model call failed: {}", e.message),
                issues: Vec::new(),
            })?;
        if response.is_truncated() {
            warn!("Generation hit the token limit, relying on recovery");
        }

        let parsed = parse_model_json(&response.content).map_err(|e| PlanError::Generation {
            attempt,
            message: e.to_string(),
            issues: Vec::new(),
        })?;
        let draft = DraftPlan::from_value(&parsed.value);
        let missing = draft.missing_days();
        if !missing.is_empty() {
            return Err(PlanError::Generation {
                attempt,
                message: format!("raw plan is missing {} weekday(s)", missing.len()),
                issues: missing.iter().map(|day| format!("{day}: day is missing")).collect(),
            });
        }
        Ok((draft, parsed.stage))
    }
}

fn exhausted(last_error: Option<PlanError>, max_attempts: u32) -> PlanError {
    let Some(error) = last_error else {
        return PlanError::Internal("no plan attempts were made".to_owned());
    };
    let stage = match &error {
        PlanError::Generation { .. } => PipelineStage::Generate,
        _ => PipelineStage::Verify,
    };
    let attempt = match &error {
        PlanError::Generation { attempt, .. } | PlanError::Verification { attempt, .. } => *attempt,
        _ => max_attempts,
    };
    PlanError::AttemptsExhausted {
        stage,
        attempt,
        message: error.to_string(),
        issues: error.issues().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_maps_stage_and_attempt() {
        let error = exhausted(
            Some(PlanError::Structural {
                issues: vec!["sunday: day is missing".to_owned()],
            }),
            2,
        );
        assert!(matches!(
            &error,
            PlanError::AttemptsExhausted {
                stage: PipelineStage::Verify,
                attempt: 2,
                ..
            }
        ));
        assert_eq!(error.issues().len(), 1);

        let error = exhausted(
            Some(PlanError::Generation {
                attempt: 1,
                message: "x".to_owned(),
                issues: Vec::new(),
            }),
            2,
        );
        assert!(matches!(
            error,
            PlanError::AttemptsExhausted {
                stage: PipelineStage::Generate,
                attempt: 1,
                ..
            }
        ));
    }
}
