// ABOUTME: Core types and constants for the fitplan generation engine
// ABOUTME: Foundation crate with the plan data model, error taxonomy, and shared constants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Fitplan Core
//!
//! Foundation crate shared by the intelligence layer and the engine. It holds
//! no I/O and changes rarely, so downstream crates recompile less.
//!
//! ## Modules
//!
//! - **errors**: `AppError`, `ErrorCode`, and the `PlanError` taxonomy
//! - **models**: profiles, weekly plans, check-ins, daily plans, job state
//! - **constants**: defaults for attempts, staleness, trends, and titration

/// Unified error handling with stable error codes
pub mod errors;

/// Engine-wide constants organized by domain
pub mod constants;

/// Core data models
pub mod models;
