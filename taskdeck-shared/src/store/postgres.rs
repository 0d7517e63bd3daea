/// PostgreSQL-backed store
///
/// Listings and aggregations are built with `QueryBuilder` so every filter
/// value is a bound parameter. Creator and assignee are resolved with LEFT
/// JOINs against `users`; a dangling reference simply joins to nothing.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;
use uuid::Uuid;

use super::{GroupCount, GroupField, StoreError, StoreResult, TaskQuery, TaskStore, UserStore};
use crate::db::pool::health_check;
use crate::models::task::{NewTask, Task, TaskChanges, TaskView, TaskViewRow, TASK_VIEW_SELECT};
use crate::models::user::{CreateUser, UpdateUser, User};

/// Store over a shared connection pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Escapes LIKE metacharacters so the search term matches literally
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Appends `WHERE ...` for `query`; `alias` is the tasks table alias
fn push_task_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &TaskQuery, alias: &str) {
    builder.push(" WHERE TRUE");

    if let Some(user_id) = query.visible_to {
        builder
            .push(format!(" AND ({alias}.created_by = "))
            .push_bind(user_id)
            .push(format!(" OR {alias}.assigned_to = "))
            .push_bind(user_id)
            .push(")");
    }
    if let Some(status) = query.status {
        builder.push(format!(" AND {alias}.status = ")).push_bind(status);
    }
    if let Some(priority) = query.priority {
        builder.push(format!(" AND {alias}.priority = ")).push_bind(priority);
    }
    if let Some(assignee) = query.assigned_to {
        builder.push(format!(" AND {alias}.assigned_to = ")).push_bind(assignee);
    }
    if let Some(ref search) = query.search {
        let pattern = escape_like(search);
        builder
            .push(format!(" AND ({alias}.title ILIKE "))
            .push_bind(pattern.clone())
            .push(format!(" OR {alias}.description ILIKE "))
            .push_bind(pattern)
            .push(")");
    }
}

/// Maps unique violations on the email constraint to a conflict
fn map_user_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation()
            && db_err.constraint().is_some_and(|c| c.contains("email"))
        {
            return StoreError::Conflict("User with this email already exists".to_string());
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl TaskStore for PgStore {
    async fn find_tasks(&self, query: &TaskQuery) -> StoreResult<Vec<TaskView>> {
        let mut builder = QueryBuilder::<Postgres>::new(TASK_VIEW_SELECT);
        push_task_filters(&mut builder, query, "t");
        builder.push(" ORDER BY t.created_at DESC");

        debug!(sql = builder.sql(), "Listing tasks");

        let rows = builder
            .build_query_as::<TaskViewRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(TaskView::from).collect())
    }

    async fn get_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        Ok(Task::find_by_id(&self.pool, id).await?)
    }

    async fn get_task_view(&self, id: Uuid) -> StoreResult<Option<TaskView>> {
        Ok(Task::find_view_by_id(&self.pool, id).await?)
    }

    async fn insert_task(&self, task: NewTask) -> StoreResult<Task> {
        Ok(Task::insert(&self.pool, &task).await?)
    }

    async fn update_task(&self, id: Uuid, changes: TaskChanges) -> StoreResult<Option<Task>> {
        Ok(Task::update(&self.pool, id, &changes).await?)
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        Ok(Task::delete(&self.pool, id).await?)
    }

    async fn count_tasks_by(&self, field: GroupField, query: &TaskQuery) -> StoreResult<Vec<GroupCount>> {
        let column = field.column();
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT t.{column}::text AS value, COUNT(*) AS count FROM tasks t"
        ));
        push_task_filters(&mut builder, query, "t");
        builder.push(format!(" GROUP BY t.{column} ORDER BY t.{column}"));

        let rows: Vec<(String, i64)> = builder.build_query_as().fetch_all(&self.pool).await?;

        Ok(rows
            .into_iter()
            .map(|(value, count)| GroupCount { value, count })
            .collect())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: CreateUser) -> StoreResult<User> {
        User::create(&self.pool, user).await.map_err(map_user_error)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        Ok(User::list(&self.pool).await?)
    }

    async fn update_user(&self, id: Uuid, changes: UpdateUser) -> StoreResult<Option<User>> {
        User::update(&self.pool, id, changes)
            .await
            .map_err(map_user_error)
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        Ok(User::delete(&self.pool, id).await?)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(health_check(&self.pool).await?)
    }
}
