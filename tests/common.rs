// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Builds the orchestrator, queue, and daily service over a scripted model and memory store
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(
    dead_code,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions
)]
//! Shared test utilities for `fitplan_engine`

use fitplan_core::models::{MacroTargets, UserProfile};
use fitplan_engine::config::{JobConfig, PipelineConfig, TitrationConfig};
use fitplan_engine::database::{MemoryPlanStore, PlanStore};
use fitplan_engine::jobs::{JobQueue, PlanOrchestrator};
use fitplan_engine::plans::{DailyTitrator, PlanPipeline};
use fitplan_engine::services::{DailyPlanService, InMemoryProfiles};
use fitplan_engine::test_utils::{MockLlmProvider, RecordingNotifier};
use fitplan_intelligence::derive_targets;
use std::future::Future;
use std::sync::{Arc, Once};
use std::time::Duration;

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Everything a job or daily-plan test needs, wired together
pub struct Harness {
    pub llm: Arc<MockLlmProvider>,
    pub notifier: Arc<RecordingNotifier>,
    pub profiles: Arc<InMemoryProfiles>,
    pub store: Arc<dyn PlanStore>,
    pub orchestrator: Arc<PlanOrchestrator>,
    pub queue: JobQueue,
}

impl Harness {
    /// Harness with default job limits and an undelayed model
    pub fn new() -> Self {
        Self::with(MockLlmProvider::new(), JobConfig::default())
    }

    /// Harness over a specific model double and job limits
    pub fn with(llm: MockLlmProvider, config: JobConfig) -> Self {
        init_test_logging();
        let llm = Arc::new(llm);
        let notifier = Arc::new(RecordingNotifier::new());
        let profiles = Arc::new(InMemoryProfiles::new());
        let store: Arc<dyn PlanStore> = Arc::new(MemoryPlanStore::new());
        let pipeline = Arc::new(PlanPipeline::new(
            llm.clone(),
            PipelineConfig::without_delay(),
            None,
        ));
        let orchestrator = Arc::new(PlanOrchestrator::new(
            store.clone(),
            profiles.clone(),
            notifier.clone(),
            pipeline,
            config,
        ));
        let queue = JobQueue::new(orchestrator.clone());
        Self {
            llm,
            notifier,
            profiles,
            store,
            orchestrator,
            queue,
        }
    }

    /// Daily plan service sharing this harness's store, profiles and model
    pub fn daily_service(&self) -> DailyPlanService {
        let config = TitrationConfig::default();
        let titrator = DailyTitrator::new(self.llm.clone(), config.clone(), None);
        DailyPlanService::new(self.store.clone(), self.profiles.clone(), titrator, config)
    }

    /// Register a profile and return it with its derived targets
    pub async fn register(&self, profile: UserProfile) -> (UserProfile, MacroTargets) {
        let targets = derive_targets(&profile);
        self.profiles.upsert(profile.clone()).await;
        (profile, targets)
    }
}

/// Poll `check` until it returns true or the deadline passes
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
