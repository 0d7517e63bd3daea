/// Task model and database operations
///
/// A task has exactly one creator, fixed at creation, and at most one
/// assignee. Neither reference is a foreign key: deleting a user leaves the
/// id in place and it resolves to `null` when the task is read back.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('todo', 'in-progress', 'completed');
/// CREATE TYPE task_priority AS ENUM ('low', 'medium', 'high');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY,
///     title VARCHAR(100) NOT NULL,
///     description VARCHAR(500),
///     status task_status NOT NULL DEFAULT 'todo',
///     priority task_priority NOT NULL DEFAULT 'medium',
///     due_date TIMESTAMPTZ,
///     assigned_to UUID,
///     created_by UUID NOT NULL,
///     tags TEXT[] NOT NULL DEFAULT '{}',
///     attachments JSONB NOT NULL DEFAULT '[]',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskdeck_shared::models::task::{NewTask, Task, TaskPriority, TaskStatus};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, creator: Uuid) -> Result<(), sqlx::Error> {
/// let task = Task::insert(&pool, &NewTask {
///     title: "Fix login bug".to_string(),
///     description: None,
///     status: TaskStatus::Todo,
///     priority: TaskPriority::High,
///     due_date: None,
///     assigned_to: None,
///     created_by: creator,
///     tags: vec!["auth".to_string()],
///     attachments: vec![],
/// }).await?;
///
/// let view = Task::find_view_by_id(&pool, task.id).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::user::UserSummary;

/// Task workflow status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Completed];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| "Status must be one of: todo, in-progress, completed".to_string())
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub const ALL: [TaskPriority; 3] = [TaskPriority::Low, TaskPriority::Medium, TaskPriority::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskPriority::ALL
            .into_iter()
            .find(|priority| priority.as_str() == s)
            .ok_or_else(|| "Priority must be one of: low, medium, high".to_string())
    }
}

/// File attached to a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub url: String,
    pub filename: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Stored task with raw user references
///
/// This is the shape authorization decisions are made on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,

    /// Assignee user ID (may dangle if the user was deleted)
    pub assigned_to: Option<Uuid>,

    /// Creator user ID, immutable after creation
    pub created_by: Uuid,

    pub tags: Vec<String>,
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Task with creator and assignee resolved to display-safe summaries
///
/// A reference to a user that no longer exists resolves to `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub assigned_to: Option<UserSummary>,
    pub created_by: Option<UserSummary>,
    pub tags: Vec<String>,
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskView {
    /// Resolves a task's references through `lookup`
    pub fn resolve<F>(task: &Task, lookup: F) -> Self
    where
        F: Fn(Uuid) -> Option<UserSummary>,
    {
        Self {
            id: task.id,
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status,
            priority: task.priority,
            due_date: task.due_date,
            assigned_to: task.assigned_to.and_then(&lookup),
            created_by: lookup(task.created_by),
            tags: task.tags.clone(),
            attachments: task.attachments.clone(),
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

/// Validated input for inserting a task
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub assigned_to: Option<Uuid>,
    pub created_by: Uuid,
    pub tags: Vec<String>,
    pub attachments: Vec<Attachment>,
}

impl NewTask {
    /// Materialises the record with a fresh ID and timestamps
    pub fn into_task(self) -> Task {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4(),
            title: self.title,
            description: self.description,
            status: self.status,
            priority: self.priority,
            due_date: self.due_date,
            assigned_to: self.assigned_to,
            created_by: self.created_by,
            tags: self.tags,
            attachments: self.attachments,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Validated partial update
///
/// There is deliberately no creator field. `Some(None)` clears an optional
/// column.
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub assigned_to: Option<Option<Uuid>>,
    pub tags: Option<Vec<String>>,
    pub attachments: Option<Vec<Attachment>>,
}

impl TaskChanges {
    /// Applies the present fields to an in-memory task
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(ref title) = self.title {
            task.title = title.clone();
        }
        if let Some(ref description) = self.description {
            task.description = description.clone();
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(assigned_to) = self.assigned_to {
            task.assigned_to = assigned_to;
        }
        if let Some(ref tags) = self.tags {
            task.tags = tags.clone();
        }
        if let Some(ref attachments) = self.attachments {
            task.attachments = attachments.clone();
        }
        task.updated_at = Utc::now();
    }
}

/// Trims tags, drops empty and repeated entries, keeps first-seen order
pub fn normalize_tags<'a, I>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut normalized: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !normalized.iter().any(|t| t == tag) {
            normalized.push(tag.to_string());
        }
    }
    normalized
}

/// Splits a comma-separated tag string, e.g. `"urgent, frontend"`
pub fn split_tags(csv: &str) -> Vec<String> {
    normalize_tags(csv.split(','))
}

/// Row shape for the `tasks` table
#[derive(Debug, sqlx::FromRow)]
struct TaskRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    status: TaskStatus,
    priority: TaskPriority,
    due_date: Option<DateTime<Utc>>,
    assigned_to: Option<Uuid>,
    created_by: Uuid,
    tags: Vec<String>,
    attachments: Json<Vec<Attachment>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            status: row.status,
            priority: row.priority,
            due_date: row.due_date,
            assigned_to: row.assigned_to,
            created_by: row.created_by,
            tags: row.tags,
            attachments: row.attachments.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Row shape for tasks joined with creator and assignee
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct TaskViewRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    status: TaskStatus,
    priority: TaskPriority,
    due_date: Option<DateTime<Utc>>,
    assigned_to: Option<Uuid>,
    created_by: Uuid,
    tags: Vec<String>,
    attachments: Json<Vec<Attachment>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    creator_name: Option<String>,
    creator_email: Option<String>,
    assignee_name: Option<String>,
    assignee_email: Option<String>,
}

impl From<TaskViewRow> for TaskView {
    fn from(row: TaskViewRow) -> Self {
        let created_by = row
            .creator_name
            .zip(row.creator_email)
            .map(|(name, email)| UserSummary {
                id: row.created_by,
                name,
                email,
            });
        let assigned_to = match (row.assigned_to, row.assignee_name, row.assignee_email) {
            (Some(id), Some(name), Some(email)) => Some(UserSummary { id, name, email }),
            _ => None,
        };

        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            status: row.status,
            priority: row.priority,
            due_date: row.due_date,
            assigned_to,
            created_by,
            tags: row.tags,
            attachments: row.attachments.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const TASK_COLUMNS: &str = "id, title, description, status, priority, due_date, assigned_to, \
                            created_by, tags, attachments, created_at, updated_at";

/// SELECT prefix producing [`TaskViewRow`]s; callers append WHERE/ORDER BY
pub(crate) const TASK_VIEW_SELECT: &str = r#"
    SELECT t.id, t.title, t.description, t.status, t.priority, t.due_date,
           t.assigned_to, t.created_by, t.tags, t.attachments, t.created_at, t.updated_at,
           c.name AS creator_name, c.email AS creator_email,
           a.name AS assignee_name, a.email AS assignee_email
    FROM tasks t
    LEFT JOIN users c ON c.id = t.created_by
    LEFT JOIN users a ON a.id = t.assigned_to
"#;

impl Task {
    /// Inserts a new task
    pub async fn insert(pool: &PgPool, data: &NewTask) -> Result<Self, sqlx::Error> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            INSERT INTO tasks (id, title, description, status, priority, due_date,
                               assigned_to, created_by, tags, attachments)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.status)
        .bind(data.priority)
        .bind(data.due_date)
        .bind(data.assigned_to)
        .bind(data.created_by)
        .bind(&data.tags)
        .bind(Json(&data.attachments))
        .fetch_one(pool)
        .await?;

        Ok(row.into())
    }

    /// Finds a task by ID with raw references
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(Task::from))
    }

    /// Finds a task by ID with creator and assignee resolved
    pub async fn find_view_by_id(pool: &PgPool, id: Uuid) -> Result<Option<TaskView>, sqlx::Error> {
        let row = sqlx::query_as::<_, TaskViewRow>(&format!("{TASK_VIEW_SELECT} WHERE t.id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(row.map(TaskView::from))
    }

    /// Applies a partial update
    ///
    /// Returns None if the task no longer exists. `created_by` is never
    /// part of the statement.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        changes: &TaskChanges,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = sqlx::QueryBuilder::<sqlx::Postgres>::new("UPDATE tasks SET updated_at = NOW()");

        if let Some(ref title) = changes.title {
            query.push(", title = ").push_bind(title.clone());
        }
        if let Some(ref description) = changes.description {
            query.push(", description = ").push_bind(description.clone());
        }
        if let Some(status) = changes.status {
            query.push(", status = ").push_bind(status);
        }
        if let Some(priority) = changes.priority {
            query.push(", priority = ").push_bind(priority);
        }
        if let Some(due_date) = changes.due_date {
            query.push(", due_date = ").push_bind(due_date);
        }
        if let Some(assigned_to) = changes.assigned_to {
            query.push(", assigned_to = ").push_bind(assigned_to);
        }
        if let Some(ref tags) = changes.tags {
            query.push(", tags = ").push_bind(tags.clone());
        }
        if let Some(ref attachments) = changes.attachments {
            query.push(", attachments = ").push_bind(Json(attachments.clone()));
        }

        query
            .push(" WHERE id = ")
            .push_bind(id)
            .push(format!(" RETURNING {TASK_COLUMNS}"));

        let row = query.build_query_as::<TaskRow>().fetch_optional(pool).await?;

        Ok(row.map(Task::from))
    }

    /// Permanently deletes a task
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task(created_by: Uuid, assigned_to: Option<Uuid>) -> Task {
        NewTask {
            title: "Write docs".to_string(),
            description: Some("Cover the API".to_string()),
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            due_date: None,
            assigned_to,
            created_by,
            tags: vec![],
            attachments: vec![],
        }
        .into_task()
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(TaskStatus::InProgress.as_str(), "in-progress");
        assert_eq!(
            serde_json::to_value(TaskStatus::InProgress).unwrap(),
            "in-progress"
        );
        assert_eq!("in-progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert!("done".parse::<TaskStatus>().is_err());
        assert!("In-Progress".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_priority_wire_names() {
        assert_eq!("high".parse::<TaskPriority>().unwrap(), TaskPriority::High);
        assert!("urgent".parse::<TaskPriority>().is_err());
    }

    #[test]
    fn test_defaults() {
        assert_eq!(TaskStatus::default(), TaskStatus::Todo);
        assert_eq!(TaskPriority::default(), TaskPriority::Medium);
    }

    #[test]
    fn test_split_tags_trims_and_drops_empty() {
        assert_eq!(split_tags("urgent, frontend"), vec!["urgent", "frontend"]);
        assert_eq!(split_tags(" a ,, b , "), vec!["a", "b"]);
        assert!(split_tags("").is_empty());
    }

    #[test]
    fn test_normalize_tags_keeps_first_occurrence() {
        let tags = normalize_tags(["ops", " api", "ops", "", "api "]);
        assert_eq!(tags, vec!["ops", "api"]);
    }

    #[test]
    fn test_changes_never_touch_creator() {
        let creator = Uuid::new_v4();
        let mut task = sample_task(creator, None);
        let changes = TaskChanges {
            title: Some("Rewrite docs".to_string()),
            assigned_to: Some(Some(Uuid::new_v4())),
            description: Some(None),
            ..Default::default()
        };

        changes.apply_to(&mut task);

        assert_eq!(task.created_by, creator);
        assert_eq!(task.title, "Rewrite docs");
        assert!(task.assigned_to.is_some());
        assert!(task.description.is_none());
    }

    #[test]
    fn test_resolve_dangling_reference_is_none() {
        let creator = Uuid::new_v4();
        let ghost = Uuid::new_v4();
        let task = sample_task(creator, Some(ghost));

        let view = TaskView::resolve(&task, |id| {
            (id == creator).then(|| UserSummary {
                id,
                name: "Creator".to_string(),
                email: "creator@example.com".to_string(),
            })
        });

        assert_eq!(view.created_by.map(|u| u.id), Some(creator));
        assert!(view.assigned_to.is_none());
    }

    #[test]
    fn test_view_serializes_camel_case() {
        let task = sample_task(Uuid::new_v4(), None);
        let json = serde_json::to_value(TaskView::resolve(&task, |_| None)).unwrap();

        assert!(json.get("createdAt").is_some());
        assert!(json.get("assignedTo").is_some());
        assert_eq!(json["status"], "todo");
    }
}
