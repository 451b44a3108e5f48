// ABOUTME: Notification collaborator for plan job outcomes
// ABOUTME: Typed plan_ready / plan_error events delivered once per genuine transition
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::errors::AppResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Broadcast-channel fan-out to subscribed clients
pub mod broadcast;

pub use broadcast::BroadcastNotifier;

/// Event emitted when a base plan job leaves the pending state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlanEvent {
    /// A verified plan is stored and active
    PlanReady {
        /// Owner
        user_id: Uuid,
        /// Job that produced the plan
        job_id: Uuid,
        /// The new plan
        plan_id: Uuid,
    },
    /// Generation failed after all attempts
    PlanError {
        /// Owner
        user_id: Uuid,
        /// Failed job
        job_id: Uuid,
        /// Failure message suitable for display
        message: String,
    },
}

impl PlanEvent {
    /// User the event is addressed to
    #[must_use]
    pub const fn user_id(&self) -> Uuid {
        match self {
            Self::PlanReady { user_id, .. } | Self::PlanError { user_id, .. } => *user_id,
        }
    }

    /// Wire name of the event
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::PlanReady { .. } => "plan_ready",
            Self::PlanError { .. } => "plan_error",
        }
    }
}

/// Receiver of plan events
///
/// The orchestrator calls this only on `pending -> ready` and
/// `pending -> error`. A failed delivery is logged and never rolls back the
/// transition.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver one event
    async fn notify(&self, event: PlanEvent) -> AppResult<()>;
}
