// ABOUTME: Profile collaborator: read-only source of user profiles for generation
// ABOUTME: Trait plus an in-memory implementation for tests and the CLI
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::errors::{AppError, AppResult};
use async_trait::async_trait;
use fitplan_core::models::UserProfile;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Supplies the immutable profile the engine generates against
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// Current profile for a user
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` when the user has no profile
    async fn profile(&self, user_id: Uuid) -> AppResult<UserProfile>;
}

/// Profiles held in process memory
#[derive(Default)]
pub struct InMemoryProfiles {
    profiles: RwLock<HashMap<Uuid, UserProfile>>,
}

impl InMemoryProfiles {
    /// Empty source
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a profile
    pub async fn upsert(&self, profile: UserProfile) {
        self.profiles
            .write()
            .await
            .insert(profile.user_id, profile);
    }
}

#[async_trait]
impl ProfileSource for InMemoryProfiles {
    async fn profile(&self, user_id: Uuid) -> AppResult<UserProfile> {
        self.profiles
            .read()
            .await
            .get(&user_id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("profile for user {user_id}")))
    }
}
