use time::{macros::format_description, OffsetDateTime, PrimitiveDateTime};
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::tasks::dto::{CreateTaskRequest, UpdateTaskRequest};
use crate::tasks::repo_types::{NewTask, Task, TaskPatch};

/// Parses `YYYY-MM-DD HH:MM:SS` as a UTC timestamp.
pub fn parse_deadline(raw: &str) -> ApiResult<OffsetDateTime> {
    PrimitiveDateTime::parse(
        raw.trim(),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    )
    .map(PrimitiveDateTime::assume_utc)
    .map_err(|_| {
        ApiError::UnprocessableEntity("invalid time format: use YYYY-MM-DD HH:MM:SS".into())
    })
}

fn future_deadline(raw: &str, now: OffsetDateTime) -> ApiResult<OffsetDateTime> {
    let deadline = parse_deadline(raw)?;
    if deadline <= now {
        return Err(ApiError::UnprocessableEntity(
            "deadline must be in the future".into(),
        ));
    }
    Ok(deadline)
}

fn non_empty_title(title: String) -> ApiResult<String> {
    if title.trim().is_empty() {
        return Err(ApiError::UnprocessableEntity("title cannot be empty".into()));
    }
    Ok(title)
}

pub fn validate_new_task(
    user_id: i64,
    req: CreateTaskRequest,
    now: OffsetDateTime,
) -> ApiResult<NewTask> {
    let title = non_empty_title(req.title.unwrap_or_default())?;
    let Some(raw_deadline) = req.deadline else {
        return Err(ApiError::UnprocessableEntity(
            "wrong format of deadline: use format YYYY-MM-DD HH:MM:SS".into(),
        ));
    };
    let deadline = future_deadline(&raw_deadline, now)?;
    Ok(NewTask {
        user_id,
        title,
        description: req.description,
        deadline,
        complete: req.complete.unwrap_or(false),
    })
}

/// Validates only the fields that are present.
pub fn validate_patch(req: UpdateTaskRequest, now: OffsetDateTime) -> ApiResult<TaskPatch> {
    Ok(TaskPatch {
        title: req.title.map(non_empty_title).transpose()?,
        description: req.description,
        deadline: req
            .deadline
            .map(|raw| future_deadline(&raw, now))
            .transpose()?,
        complete: req.complete,
    })
}

/// Collects every `ids` value from the query pairs.
pub fn parse_task_ids(pairs: &[(String, String)]) -> ApiResult<Vec<i64>> {
    pairs
        .iter()
        .filter(|(key, _)| key == "ids")
        .map(|(_, value)| {
            value.trim().parse::<i64>().map_err(|_| {
                ApiError::UnprocessableEntity(format!("invalid task id {value:?}"))
            })
        })
        .collect()
}

pub async fn list_tasks(state: &AppState, user_id: i64) -> ApiResult<Vec<Task>> {
    Ok(state.tasks.list_by_user(user_id).await?)
}

pub async fn create_task(
    state: &AppState,
    user_id: i64,
    req: CreateTaskRequest,
) -> ApiResult<Task> {
    let new = validate_new_task(user_id, req, OffsetDateTime::now_utc())?;
    let task = state.tasks.create(new).await?;
    info!(user_id, task_id = task.task_id, "task created");
    Ok(task)
}

pub async fn update_task(
    state: &AppState,
    user_id: i64,
    task_id: i64,
    req: UpdateTaskRequest,
) -> ApiResult<Option<Task>> {
    let patch = validate_patch(req, OffsetDateTime::now_utc())?;
    let task = state.tasks.update(user_id, task_id, &patch).await?;
    match &task {
        Some(_) if !patch.is_empty() => info!(user_id, task_id, "task updated"),
        Some(_) => {}
        None => debug!(user_id, task_id, "no task matched update"),
    }
    Ok(task)
}

/// Returns how many of `task_ids` were owned by `user_id` and removed.
pub async fn delete_tasks(state: &AppState, user_id: i64, task_ids: &[i64]) -> ApiResult<u64> {
    let deleted = state.tasks.delete_many(user_id, task_ids).await?;
    info!(user_id, requested = task_ids.len(), deleted, "tasks deleted");
    Ok(deleted)
}
