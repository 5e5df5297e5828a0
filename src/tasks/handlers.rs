use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use tracing::instrument;

use super::dto::{CreateTaskRequest, UpdateTaskRequest};
use super::extractors::{OwnedTask, TaskOwner};
use super::repo_types::Task;
use super::services;
use crate::{
    app::method_not_allowed,
    error::{ApiError, ApiResult},
    extract::JsonBody,
    state::AppState,
};

/// Task routes. Every handler needs the authorization layer in front of it.
pub fn task_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/user/:user_id/task",
            get(list_tasks)
                .post(create_task)
                .delete(delete_tasks)
                .fallback(method_not_allowed),
        )
        .route(
            "/user/:user_id/task/:task_id",
            patch(update_task).fallback(method_not_allowed),
        )
}

#[instrument(skip(state))]
pub async fn list_tasks(
    State(state): State<AppState>,
    owner: TaskOwner,
) -> ApiResult<Json<Vec<Task>>> {
    Ok(Json(services::list_tasks(&state, owner.user_id).await?))
}

#[instrument(skip(state, body))]
pub async fn create_task(
    State(state): State<AppState>,
    owner: TaskOwner,
    JsonBody(body): JsonBody<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let task = services::create_task(&state, owner.user_id, body).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// `DELETE /user/{id}/task?ids=1&ids=2`, answered with the bare count removed.
#[instrument(skip(state, query))]
pub async fn delete_tasks(
    State(state): State<AppState>,
    owner: TaskOwner,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> ApiResult<Json<u64>> {
    let Query(pairs) = query.map_err(|e| ApiError::UnprocessableEntity(e.body_text()))?;
    let ids = services::parse_task_ids(&pairs)?;
    let deleted = services::delete_tasks(&state, owner.user_id, &ids).await?;
    Ok(Json(deleted))
}

/// Answers `null` when the caller has no task with that id.
#[instrument(skip(state, body))]
pub async fn update_task(
    State(state): State<AppState>,
    task: OwnedTask,
    JsonBody(body): JsonBody<UpdateTaskRequest>,
) -> ApiResult<Json<Option<Task>>> {
    let task = services::update_task(&state, task.user_id, task.task_id, body).await?;
    Ok(Json(task))
}
