/// Task endpoints
///
/// Thin HTTP layer over `taskdeck_shared::tasks`: visibility, authorization
/// and validation all happen in the engine. Successful creates and updates
/// schedule live notifications on a background task, so the response never
/// waits on delivery.
///
/// # Endpoints
///
/// - `GET /api/tasks` - List visible tasks (`status`, `priority`, `assignedTo`, `search`)
/// - `GET /api/tasks/stats` - Counts of visible tasks by status and priority
/// - `GET /api/tasks/:id` - Fetch one task
/// - `POST /api/tasks` - Create a task
/// - `PUT /api/tasks/:id` - Update a task (creator or admin)
/// - `DELETE /api/tasks/:id` - Delete a task (creator or admin)

use crate::{
    app::AppState,
    error::ApiResult,
    routes::{data, list, message, ApiJson, ApiPath, ApiQuery, DataResponse, MessageResponse},
};
use axum::{extract::State, http::StatusCode, Json};
use taskdeck_shared::{
    auth::middleware::AuthContext,
    models::task::TaskView,
    tasks::{self, TaskFilter, TaskPayload, TaskStats},
};
use uuid::Uuid;

pub async fn list_tasks(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(filter): ApiQuery<TaskFilter>,
) -> ApiResult<Json<DataResponse<Vec<TaskView>>>> {
    let tasks = tasks::list_tasks(state.store.as_ref(), &auth, &filter).await?;
    Ok(list(tasks))
}

pub async fn task_stats(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<DataResponse<TaskStats>>> {
    let stats = tasks::task_stats(state.store.as_ref(), &auth).await?;
    Ok(data(stats))
}

pub async fn get_task(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<DataResponse<TaskView>>> {
    let task = tasks::get_task(state.store.as_ref(), &auth, id).await?;
    Ok(data(task))
}

/// Creates a task owned by the requester and notifies its assignee
pub async fn create_task(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(payload): ApiJson<TaskPayload>,
) -> ApiResult<(StatusCode, Json<DataResponse<TaskView>>)> {
    let task = tasks::create_task(state.store.as_ref(), &auth, payload).await?;

    let notifier = state.notifier.clone();
    let task_id = task.id;
    tokio::spawn(async move { notifier.task_created(task_id).await });

    Ok((StatusCode::CREATED, data(task)))
}

/// Updates a task and notifies its creator and assignee
pub async fn update_task(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<TaskPayload>,
) -> ApiResult<Json<DataResponse<TaskView>>> {
    let task = tasks::update_task(state.store.as_ref(), &auth, id, payload).await?;

    let notifier = state.notifier.clone();
    tokio::spawn(async move { notifier.task_updated(id).await });

    Ok(data(task))
}

pub async fn delete_task(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    tasks::delete_task(state.store.as_ref(), &auth, id).await?;
    Ok(message("Task deleted successfully"))
}
