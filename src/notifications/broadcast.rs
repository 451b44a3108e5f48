// ABOUTME: Per-user tokio broadcast channels for plan events
// ABOUTME: Clients register to receive events; delivery with no subscriber is a no-op
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::{NotificationSink, PlanEvent};
use crate::errors::{AppError, AppResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Buffered events per subscriber before slow receivers start lagging
const CHANNEL_CAPACITY: usize = 16;

/// Fan-out of plan events to registered listeners
#[derive(Clone, Default)]
pub struct BroadcastNotifier {
    channels: Arc<RwLock<HashMap<Uuid, broadcast::Sender<PlanEvent>>>>,
}

impl BroadcastNotifier {
    /// Notifier with no listeners
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a user's events
    ///
    /// Several receivers may share one user; each sees every event.
    pub async fn subscribe(&self, user_id: Uuid) -> broadcast::Receiver<PlanEvent> {
        let mut channels = self.channels.write().await;
        let receiver = channels
            .entry(user_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe();
        info!(user.id = %user_id, "Plan event listener registered");
        receiver
    }

    /// Drop a user's channel
    pub async fn unsubscribe(&self, user_id: Uuid) {
        self.channels.write().await.remove(&user_id);
        info!(user.id = %user_id, "Plan event listener removed");
    }

    /// Users with a live channel
    pub async fn active_channels(&self) -> usize {
        self.channels.read().await.len()
    }
}

#[async_trait]
impl NotificationSink for BroadcastNotifier {
    async fn notify(&self, event: PlanEvent) -> AppResult<()> {
        let user_id = event.user_id();
        let kind = event.kind();
        let channels = self.channels.read().await;
        let Some(sender) = channels.get(&user_id) else {
            debug!(user.id = %user_id, event = kind, "No listener for plan event");
            return Ok(());
        };

        match sender.send(event) {
            Ok(receivers) => {
                info!(user.id = %user_id, event = kind, receivers, "Plan event delivered");
                Ok(())
            }
            Err(e) => {
                warn!(user.id = %user_id, event = kind, "Failed to deliver plan event: {e}");
                Err(AppError::internal("Failed to deliver plan event"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_event() {
        let notifier = BroadcastNotifier::new();
        let user = Uuid::new_v4();
        let mut receiver = notifier.subscribe(user).await;

        let event = PlanEvent::PlanError {
            user_id: user,
            job_id: Uuid::new_v4(),
            message: "model unavailable".to_owned(),
        };
        notifier.notify(event.clone()).await.unwrap();
        assert_eq!(receiver.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_no_listener_is_not_an_error() {
        let notifier = BroadcastNotifier::new();
        let event = PlanEvent::PlanReady {
            user_id: Uuid::new_v4(),
            job_id: Uuid::new_v4(),
            plan_id: Uuid::new_v4(),
        };
        notifier.notify(event).await.unwrap();
        assert_eq!(notifier.active_channels().await, 0);
    }
}
