/// In-process channel registry backed by tokio broadcast channels
///
/// Each user id maps to one broadcast channel; every open connection of that
/// user holds a receiver. A slow connection lags and loses frames instead of
/// blocking the publisher.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;
use uuid::Uuid;

use super::{ChannelRegistry, LiveEventKind, PublishError};

/// Frames buffered per user before a lagging receiver starts dropping
pub const CHANNEL_CAPACITY: usize = 64;

/// Wire frame: `{"event": "...", "data": ...}`
#[derive(Debug, Serialize)]
pub struct Frame<'a, T: Serialize> {
    pub event: &'a str,
    pub data: T,
}

/// Encodes a frame as JSON text
pub fn encode_frame<T: Serialize>(event: &str, data: T) -> Result<String, serde_json::Error> {
    serde_json::to_string(&Frame { event, data })
}

#[derive(Debug, Default)]
pub struct LiveHub {
    channels: RwLock<HashMap<Uuid, broadcast::Sender<String>>>,
}

impl LiveHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes a connection to `user_id`'s channel, creating it if needed
    pub async fn join(&self, user_id: Uuid) -> broadcast::Receiver<String> {
        let mut channels = self.channels.write().await;
        channels
            .entry(user_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Drops `user_id`'s channel once its last connection is gone
    pub async fn prune(&self, user_id: Uuid) {
        let mut channels = self.channels.write().await;
        if channels
            .get(&user_id)
            .is_some_and(|tx| tx.receiver_count() == 0)
        {
            channels.remove(&user_id);
            debug!(%user_id, "Removed idle live channel");
        }
    }

    /// Number of open connections for `user_id`
    pub async fn connections(&self, user_id: Uuid) -> usize {
        self.channels
            .read()
            .await
            .get(&user_id)
            .map_or(0, |tx| tx.receiver_count())
    }
}

#[async_trait]
impl ChannelRegistry for LiveHub {
    async fn publish(
        &self,
        user_id: Uuid,
        event: LiveEventKind,
        payload: &serde_json::Value,
    ) -> Result<(), PublishError> {
        let frame = encode_frame(event.as_str(), payload)?;

        let channels = self.channels.read().await;
        if let Some(tx) = channels.get(&user_id) {
            // Err only means every receiver has gone away since the lookup
            if tx.send(frame).is_err() {
                debug!(%user_id, %event, "No live receivers");
            }
        }
        Ok(())
    }
}
