use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use serde::Deserialize;
use tracing::warn;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};

#[derive(Deserialize)]
struct CollectionParams {
    user_id: String,
}

#[derive(Deserialize)]
struct ItemParams {
    user_id: String,
    task_id: String,
}

/// `{user_id}` of `/user/{user_id}/task`, already checked against the caller.
#[derive(Debug, Clone, Copy)]
pub struct TaskOwner {
    pub user_id: i64,
}

/// `{user_id}` and `{task_id}` of `/user/{user_id}/task/{task_id}`, owner checked.
#[derive(Debug, Clone, Copy)]
pub struct OwnedTask {
    pub user_id: i64,
    pub task_id: i64,
}

// A non-numeric segment means the path does not have the task shape at all.
fn parse_id(raw: &str) -> ApiResult<i64> {
    raw.parse()
        .map_err(|_| ApiError::NotFound("not found".into()))
}

async fn check_owner<S: Send + Sync>(
    parts: &mut Parts,
    state: &S,
    user_id: i64,
) -> ApiResult<()> {
    let caller = AuthUser::from_request_parts(parts, state).await?;
    if caller.id() != user_id {
        warn!(caller = caller.id(), owner = user_id, "task access denied");
        return Err(ApiError::Forbidden("access denied".into()));
    }
    Ok(())
}

#[async_trait]
impl<S> FromRequestParts<S> for TaskOwner
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(params) = Path::<CollectionParams>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::NotFound("not found".into()))?;
        let user_id = parse_id(&params.user_id)?;
        check_owner(parts, state, user_id).await?;
        Ok(TaskOwner { user_id })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for OwnedTask
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(params) = Path::<ItemParams>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::NotFound("not found".into()))?;
        let user_id = parse_id(&params.user_id)?;
        let task_id = parse_id(&params.task_id)?;
        check_owner(parts, state, user_id).await?;
        Ok(OwnedTask { user_id, task_id })
    }
}
