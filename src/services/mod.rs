// ABOUTME: Service layer over the engine: profile collaborator and daily plan service
// ABOUTME: Protocol-agnostic entry points reusable by any transport
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Domain service layer
//!
//! Services hold the collaborators and expose the operations a transport
//! calls. They carry no transport-specific types.

/// Daily titration flow
pub mod daily_plans;

/// Profile collaborator
pub mod profiles;

pub use daily_plans::{adjusted_targets, DailyPlanService};
pub use profiles::{InMemoryProfiles, ProfileSource};
