/// Live notification fan-out
///
/// After a task is created or updated, the [`Notifier`] works out who has
/// to hear about it and hands one event per recipient to a
/// [`ChannelRegistry`]. The registry owns channel membership; the notifier
/// never sees connections.
///
/// # Recipients
///
/// | trigger | event         | recipients                         |
/// |---------|---------------|------------------------------------|
/// | update  | `task-changed`| creator and assignee (deduplicated)|
/// | create  | `new-task`    | assignee only, if any              |
///
/// Recipients come from the resolved task, so a reference to a deleted user
/// receives nothing. Delivery is best effort: a failed publish is logged and
/// the remaining recipients are still attempted.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::task::TaskView;
use crate::store::TaskStore;

pub mod hub;
pub mod recording;

pub use hub::LiveHub;
pub use recording::RecordingRegistry;

/// Server-to-client event names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LiveEventKind {
    /// A task the recipient created or is assigned to changed
    TaskChanged,

    /// A task was created with the recipient as assignee
    NewTask,
}

impl LiveEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LiveEventKind::TaskChanged => "task-changed",
            LiveEventKind::NewTask => "new-task",
        }
    }
}

impl fmt::Display for LiveEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Channel unavailable: {0}")]
    Unavailable(String),
}

/// Per-user channel membership
#[async_trait]
pub trait ChannelRegistry: Send + Sync {
    /// Delivers `payload` to every live connection in `user_id`'s channel
    ///
    /// Publishing to a user with no open connection is not an error.
    async fn publish(
        &self,
        user_id: Uuid,
        event: LiveEventKind,
        payload: &serde_json::Value,
    ) -> Result<(), PublishError>;
}

/// Users who must receive `event` for `task`, without duplicates
pub fn recipients(event: LiveEventKind, task: &TaskView) -> Vec<Uuid> {
    let assignee = task.assigned_to.as_ref().map(|u| u.id);

    match event {
        LiveEventKind::NewTask => assignee.into_iter().collect(),
        LiveEventKind::TaskChanged => {
            let mut ids: Vec<Uuid> = task.created_by.as_ref().map(|u| u.id).into_iter().collect();
            if let Some(id) = assignee {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
            ids
        }
    }
}

/// Fans task events out to per-user channels
pub struct Notifier<S: TaskStore + ?Sized> {
    store: Arc<S>,
    registry: Arc<dyn ChannelRegistry>,
}

impl<S: TaskStore + ?Sized> Clone for Notifier<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<S: TaskStore + ?Sized> Notifier<S> {
    pub fn new(store: Arc<S>, registry: Arc<dyn ChannelRegistry>) -> Self {
        Self { store, registry }
    }

    /// Notifies creator and assignee that `task_id` changed
    pub async fn task_updated(&self, task_id: Uuid) {
        self.dispatch(task_id, LiveEventKind::TaskChanged).await;
    }

    /// Notifies the assignee of a newly created task
    pub async fn task_created(&self, task_id: Uuid) {
        self.dispatch(task_id, LiveEventKind::NewTask).await;
    }

    async fn dispatch(&self, task_id: Uuid, event: LiveEventKind) {
        // Re-read so the event carries the committed, resolved state
        let task = match self.store.get_task_view(task_id).await {
            Ok(Some(task)) => task,
            Ok(None) => {
                debug!(%task_id, %event, "Task gone before notification, skipping");
                return;
            }
            Err(e) => {
                warn!(%task_id, %event, error = %e, "Failed to load task for notification");
                return;
            }
        };

        let targets = recipients(event, &task);
        if targets.is_empty() {
            return;
        }

        let payload = match serde_json::to_value(&task) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(%task_id, error = %e, "Failed to encode task for notification");
                return;
            }
        };

        for user_id in targets {
            match self.registry.publish(user_id, event, &payload).await {
                Ok(()) => debug!(%task_id, %user_id, %event, "Notification published"),
                Err(e) => warn!(%task_id, %user_id, %event, error = %e, "Notification delivery failed"),
            }
        }
    }
}
