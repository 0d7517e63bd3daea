/// Channel registry that records deliveries instead of sending them
///
/// Used by tests to assert exactly who was notified. A user can be marked
/// as failing to exercise the best-effort delivery path.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;
use uuid::Uuid;

use super::{ChannelRegistry, LiveEventKind, PublishError};

/// One recorded publish
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub user_id: Uuid,
    pub event: LiveEventKind,
    pub payload: serde_json::Value,
}

#[derive(Debug, Default)]
pub struct RecordingRegistry {
    deliveries: Mutex<Vec<Delivery>>,
    failing: Mutex<HashSet<Uuid>>,
}

impl RecordingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every publish to `user_id` fail
    pub fn fail_for(&self, user_id: Uuid) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(user_id);
        }
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }

    /// Recipients in delivery order
    pub fn recipients(&self) -> Vec<Uuid> {
        self.deliveries().into_iter().map(|d| d.user_id).collect()
    }

    pub fn clear(&self) {
        if let Ok(mut deliveries) = self.deliveries.lock() {
            deliveries.clear();
        }
    }
}

#[async_trait]
impl ChannelRegistry for RecordingRegistry {
    async fn publish(
        &self,
        user_id: Uuid,
        event: LiveEventKind,
        payload: &serde_json::Value,
    ) -> Result<(), PublishError> {
        let fails = self
            .failing
            .lock()
            .map(|f| f.contains(&user_id))
            .unwrap_or(false);
        if fails {
            return Err(PublishError::Unavailable(format!("channel for {user_id} is down")));
        }

        if let Ok(mut deliveries) = self.deliveries.lock() {
            deliveries.push(Delivery {
                user_id,
                event,
                payload: payload.clone(),
            });
        }
        Ok(())
    }
}
