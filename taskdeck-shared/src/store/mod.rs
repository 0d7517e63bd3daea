/// Storage seam for users and tasks
///
/// The visibility engine, the notifier and the HTTP layer only talk to these
/// traits. `PgStore` is the production implementation; `MemoryStore` backs
/// tests and local experiments without a database.
///
/// A [`TaskQuery`] is the complete description of a task listing: the
/// engine builds it (including the visibility restriction) and every store
/// must apply all of its clauses together.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::task::{NewTask, Task, TaskChanges, TaskPriority, TaskStatus, TaskView};
use crate::models::user::{CreateUser, UpdateUser, User};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Storage failures
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness rule was violated (e.g. email already registered)
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Filter applied to a task listing or aggregation
///
/// All present clauses are combined with AND. `visible_to` is the
/// creator-or-assignee restriction for non-admin requesters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskQuery {
    pub visible_to: Option<Uuid>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<Uuid>,

    /// Case-insensitive literal substring of title or description
    pub search: Option<String>,
}

impl TaskQuery {
    /// Evaluates the query against a single task
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(user_id) = self.visible_to {
            if task.created_by != user_id && task.assigned_to != Some(user_id) {
                return false;
            }
        }
        if self.status.is_some_and(|status| task.status != status) {
            return false;
        }
        if self.priority.is_some_and(|priority| task.priority != priority) {
            return false;
        }
        if let Some(assignee) = self.assigned_to {
            if task.assigned_to != Some(assignee) {
                return false;
            }
        }
        if let Some(ref needle) = self.search {
            let needle = needle.to_lowercase();
            let in_title = task.title.to_lowercase().contains(&needle);
            let in_description = task
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle));
            if !in_title && !in_description {
                return false;
            }
        }
        true
    }
}

/// Field a task aggregation groups by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupField {
    Status,
    Priority,
}

impl GroupField {
    pub fn column(&self) -> &'static str {
        match self {
            GroupField::Status => "status",
            GroupField::Priority => "priority",
        }
    }

    /// Wire value of `task` for this field
    pub fn value_of(&self, task: &Task) -> &'static str {
        match self {
            GroupField::Status => task.status.as_str(),
            GroupField::Priority => task.priority.as_str(),
        }
    }
}

/// One aggregation bucket, e.g. `{"_id": "todo", "count": 3}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCount {
    #[serde(rename = "_id")]
    pub value: String,
    pub count: i64,
}

/// Task persistence
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Tasks matching `query`, newest first, references resolved
    async fn find_tasks(&self, query: &TaskQuery) -> StoreResult<Vec<TaskView>>;

    /// Raw task record, used for authorization decisions
    async fn get_task(&self, id: Uuid) -> StoreResult<Option<Task>>;

    /// Task with references resolved
    async fn get_task_view(&self, id: Uuid) -> StoreResult<Option<TaskView>>;

    async fn insert_task(&self, task: NewTask) -> StoreResult<Task>;

    /// Returns None when the task does not exist
    async fn update_task(&self, id: Uuid, changes: TaskChanges) -> StoreResult<Option<Task>>;

    /// Returns whether a task was removed
    async fn delete_task(&self, id: Uuid) -> StoreResult<bool>;

    /// Counts tasks matching `query` per value of `field`; empty buckets are omitted
    async fn count_tasks_by(&self, field: GroupField, query: &TaskQuery) -> StoreResult<Vec<GroupCount>>;
}

/// User persistence
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with [`StoreError::Conflict`] if the email is taken
    async fn create_user(&self, user: CreateUser) -> StoreResult<User>;

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn list_users(&self) -> StoreResult<Vec<User>>;

    async fn update_user(&self, id: Uuid, changes: UpdateUser) -> StoreResult<Option<User>>;

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool>;

    /// Liveness probe for the backing storage
    async fn ping(&self) -> StoreResult<()>;
}

/// Everything the server needs from storage
pub trait Store: TaskStore + UserStore {}

impl<T: TaskStore + UserStore + ?Sized> Store for T {}
