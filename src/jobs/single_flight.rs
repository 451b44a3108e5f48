// ABOUTME: Per-user registry of in-flight generations sharing one result among all callers
// ABOUTME: Each flight runs in a spawned task and deregisters itself when it finishes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Single-Flight Registry
//!
//! Concurrent callers for the same user await the same [`Shared`] future, so a
//! user never has two model pipelines running in one process. The work itself
//! runs in a spawned task: dropping every waiter does not cancel it.
//!
//! Flights are identified by their job id. Removal on completion is
//! conditional on that id, so a flight that was forgotten (cancel, stale
//! reset) and replaced never evicts its successor.

use crate::errors::PlanError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Future every waiter of one flight polls
pub type SharedFlight<T> = Shared<BoxFuture<'static, Result<T, PlanError>>>;

struct Flight<T: Clone> {
    job_id: Uuid,
    future: SharedFlight<T>,
}

/// Handle returned to a caller of [`InFlightRegistry::join_or_start`]
pub struct Joined<T: Clone> {
    /// Job id of the flight
    pub job_id: Uuid,
    /// Whether this call started the flight
    pub started: bool,
    /// Result shared with all other waiters
    pub future: SharedFlight<T>,
}

/// Map of user id to the generation currently running for that user
pub struct InFlightRegistry<T: Clone> {
    flights: Arc<DashMap<Uuid, Flight<T>>>,
}

impl<T: Clone> Default for InFlightRegistry<T> {
    fn default() -> Self {
        Self {
            flights: Arc::new(DashMap::new()),
        }
    }
}

impl<T> InFlightRegistry<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the user's running flight, or start `work` as job `job_id`
    ///
    /// `work` is only polled when this call starts the flight. Must be called
    /// from within a tokio runtime.
    pub fn join_or_start<F>(&self, user_id: Uuid, job_id: Uuid, work: F) -> Joined<T>
    where
        F: Future<Output = Result<T, PlanError>> + Send + 'static,
    {
        match self.flights.entry(user_id) {
            Entry::Occupied(existing) => {
                debug!(user.id = %user_id, job.id = %existing.get().job_id, "Joining in-flight generation");
                Joined {
                    job_id: existing.get().job_id,
                    started: false,
                    future: existing.get().future.clone(),
                }
            }
            Entry::Vacant(slot) => {
                let flights = Arc::clone(&self.flights);
                let handle = tokio::spawn(async move {
                    let result = work.await;
                    flights.remove_if(&user_id, |_, flight| flight.job_id == job_id);
                    result
                });
                let future = async move {
                    handle.await.unwrap_or_else(|e| {
                        Err(PlanError::Internal(format!("generation task failed: {e}")))
                    })
                }
                .boxed()
                .shared();

                slot.insert(Flight {
                    job_id,
                    future: future.clone(),
                });
                debug!(user.id = %user_id, job.id = %job_id, "Started generation flight");
                Joined {
                    job_id,
                    started: true,
                    future,
                }
            }
        }
    }

    /// Job id of the user's running flight
    #[must_use]
    pub fn in_flight(&self, user_id: Uuid) -> Option<Uuid> {
        self.flights.get(&user_id).map(|flight| flight.job_id)
    }

    /// Join the user's running flight without starting one
    #[must_use]
    pub fn join(&self, user_id: Uuid) -> Option<Joined<T>> {
        self.flights.get(&user_id).map(|flight| Joined {
            job_id: flight.job_id,
            started: false,
            future: flight.future.clone(),
        })
    }

    /// Stop tracking `job_id` without cancelling it; returns whether it was tracked
    pub fn forget(&self, user_id: Uuid, job_id: Uuid) -> bool {
        self.flights
            .remove_if(&user_id, |_, flight| flight.job_id == job_id)
            .is_some()
    }

    /// Number of running flights
    #[must_use]
    pub fn len(&self) -> usize {
        self.flights.len()
    }

    /// Whether nothing is running
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flights.is_empty()
    }
}
