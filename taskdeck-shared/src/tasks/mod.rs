/// Visibility and authorization engine for tasks
///
/// Every task operation goes through here: the engine narrows listings to
/// what the requester may see, decides whether single-task operations are
/// permitted, validates input and only then touches the store.
///
/// Listing scope for a non-admin requester is always
/// `(creator = me OR assignee = me) AND (exact filters) AND (search)`;
/// search narrows the visible set and never widens it.
///
/// # Example
///
/// ```no_run
/// use taskdeck_shared::auth::middleware::AuthContext;
/// use taskdeck_shared::models::user::Role;
/// use taskdeck_shared::store::MemoryStore;
/// use taskdeck_shared::tasks::{list_tasks, TaskFilter};
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// let me = AuthContext::new(Uuid::new_v4(), Role::Member);
///
/// let filter = TaskFilter {
///     status: Some("todo".to_string()),
///     search: Some("bug".to_string()),
///     ..Default::default()
/// };
/// let visible = list_tasks(&store, &me, &filter).await?;
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::authorization::{is_allowed, TaskAction};
use crate::auth::middleware::AuthContext;
use crate::models::task::{Task, TaskPriority, TaskStatus, TaskView};
use crate::store::{GroupCount, GroupField, StoreError, TaskQuery, TaskStore};
use crate::validation::FieldError;

pub mod payload;

pub use payload::TaskPayload;

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("Task not found")]
    NotFound,

    #[error("Not authorized to {0} this task")]
    Forbidden(TaskAction),

    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error(transparent)]
    Store(#[from] StoreError),
}

fn authorize(requester: &AuthContext, task: &Task, action: TaskAction) -> Result<(), TaskError> {
    if is_allowed(requester, task, action) {
        Ok(())
    } else {
        debug!(task_id = %task.id, user_id = %requester.user_id, %action, "Task access denied");
        Err(TaskError::Forbidden(action))
    }
}

/// Listing filters as received in the query string
///
/// Values are raw so that every malformed parameter can be reported at once.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFilter {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub assigned_to: Option<String>,
    pub search: Option<String>,
}

/// Non-empty trimmed value, or None
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Builds the store query for `requester`, restricting non-admins to tasks
/// they created or were assigned
pub fn scope_query(requester: &AuthContext, filter: &TaskFilter) -> Result<TaskQuery, TaskError> {
    let mut errors = Vec::new();
    let mut query = TaskQuery {
        visible_to: (!requester.is_admin()).then_some(requester.user_id),
        search: present(&filter.search).map(str::to_string),
        ..Default::default()
    };

    if let Some(raw) = present(&filter.status) {
        match raw.parse::<TaskStatus>() {
            Ok(status) => query.status = Some(status),
            Err(msg) => errors.push(FieldError::new("status", msg)),
        }
    }
    if let Some(raw) = present(&filter.priority) {
        match raw.parse::<TaskPriority>() {
            Ok(priority) => query.priority = Some(priority),
            Err(msg) => errors.push(FieldError::new("priority", msg)),
        }
    }
    if let Some(raw) = present(&filter.assigned_to) {
        match Uuid::parse_str(raw) {
            Ok(id) => query.assigned_to = Some(id),
            Err(_) => errors.push(FieldError::new("assignedTo", "assignedTo must be a valid user id")),
        }
    }

    if errors.is_empty() {
        Ok(query)
    } else {
        Err(TaskError::Validation(errors))
    }
}

/// Visible tasks matching `filter`, newest first
pub async fn list_tasks<S>(store: &S, requester: &AuthContext, filter: &TaskFilter) -> Result<Vec<TaskView>, TaskError>
where
    S: TaskStore + ?Sized,
{
    let query = scope_query(requester, filter)?;
    debug!(user_id = %requester.user_id, ?query, "Listing tasks");

    Ok(store.find_tasks(&query).await?)
}

/// Single task; `NotFound` before `Forbidden`
pub async fn get_task<S>(store: &S, requester: &AuthContext, id: Uuid) -> Result<TaskView, TaskError>
where
    S: TaskStore + ?Sized,
{
    let task = store.get_task(id).await?.ok_or(TaskError::NotFound)?;
    authorize(requester, &task, TaskAction::Read)?;

    store.get_task_view(id).await?.ok_or(TaskError::NotFound)
}

/// Creates a task owned by `requester`
pub async fn create_task<S>(store: &S, requester: &AuthContext, payload: TaskPayload) -> Result<TaskView, TaskError>
where
    S: TaskStore + ?Sized,
{
    let new_task = payload
        .into_new_task(requester.user_id)
        .map_err(TaskError::Validation)?;

    let task = store.insert_task(new_task).await?;
    info!(task_id = %task.id, user_id = %requester.user_id, "Task created");

    store.get_task_view(task.id).await?.ok_or(TaskError::NotFound)
}

/// Applies a partial update; only the creator or an admin may do so
pub async fn update_task<S>(
    store: &S,
    requester: &AuthContext,
    id: Uuid,
    payload: TaskPayload,
) -> Result<TaskView, TaskError>
where
    S: TaskStore + ?Sized,
{
    let task = store.get_task(id).await?.ok_or(TaskError::NotFound)?;
    authorize(requester, &task, TaskAction::Update)?;

    let changes = payload.into_changes().map_err(TaskError::Validation)?;
    store
        .update_task(id, changes)
        .await?
        .ok_or(TaskError::NotFound)?;
    info!(task_id = %id, user_id = %requester.user_id, "Task updated");

    store.get_task_view(id).await?.ok_or(TaskError::NotFound)
}

/// Permanently removes a task; only the creator or an admin may do so
pub async fn delete_task<S>(store: &S, requester: &AuthContext, id: Uuid) -> Result<(), TaskError>
where
    S: TaskStore + ?Sized,
{
    let task = store.get_task(id).await?.ok_or(TaskError::NotFound)?;
    authorize(requester, &task, TaskAction::Delete)?;

    if !store.delete_task(id).await? {
        return Err(TaskError::NotFound);
    }
    info!(task_id = %id, user_id = %requester.user_id, "Task deleted");

    Ok(())
}

/// Counts of visible tasks per status and per priority
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStats {
    pub status: Vec<GroupCount>,
    pub priority: Vec<GroupCount>,
}

pub async fn task_stats<S>(store: &S, requester: &AuthContext) -> Result<TaskStats, TaskError>
where
    S: TaskStore + ?Sized,
{
    let query = scope_query(requester, &TaskFilter::default())?;

    Ok(TaskStats {
        status: store.count_tasks_by(GroupField::Status, &query).await?,
        priority: store.count_tasks_by(GroupField::Priority, &query).await?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;

    #[test]
    fn test_admin_query_is_unrestricted() {
        let admin = AuthContext::new(Uuid::new_v4(), Role::Admin);
        let query = scope_query(&admin, &TaskFilter::default()).unwrap();
        assert_eq!(query, TaskQuery::default());
    }

    #[test]
    fn test_member_query_keeps_visibility_with_search() {
        let member = AuthContext::new(Uuid::new_v4(), Role::Member);
        let filter = TaskFilter {
            search: Some("bug".to_string()),
            status: Some("todo".to_string()),
            ..Default::default()
        };

        let query = scope_query(&member, &filter).unwrap();
        assert_eq!(query.visible_to, Some(member.user_id));
        assert_eq!(query.search.as_deref(), Some("bug"));
        assert_eq!(query.status, Some(TaskStatus::Todo));
    }

    #[test]
    fn test_empty_filter_values_are_absent() {
        let member = AuthContext::new(Uuid::new_v4(), Role::Member);
        let filter = TaskFilter {
            status: Some(String::new()),
            priority: Some("  ".to_string()),
            assigned_to: Some(String::new()),
            search: Some(String::new()),
        };

        let query = scope_query(&member, &filter).unwrap();
        assert!(query.status.is_none());
        assert!(query.priority.is_none());
        assert!(query.assigned_to.is_none());
        assert!(query.search.is_none());
    }

    #[test]
    fn test_invalid_filters_all_reported() {
        let member = AuthContext::new(Uuid::new_v4(), Role::Member);
        let filter = TaskFilter {
            status: Some("done".to_string()),
            priority: Some("urgent".to_string()),
            assigned_to: Some("bob".to_string()),
            search: None,
        };

        match scope_query(&member, &filter) {
            Err(TaskError::Validation(errors)) => {
                let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["status", "priority", "assignedTo"]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
