// ABOUTME: Base plan job management: state machine, single-flight registry, queue trigger
// ABOUTME: Serializes and deduplicates generation requests per user
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Job state machine and generation lifecycle
pub mod orchestrator;

/// Create-job entry point
pub mod queue;

/// Per-user in-flight generation registry
pub mod single_flight;

pub use orchestrator::{GenerationTicket, PlanOrchestrator};
pub use queue::{Caller, JobDisposition, JobQueue, JobRequest, JobTicket};
pub use single_flight::InFlightRegistry;
