use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use super::extractors::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Pulls `<token>` out of `Authorization: Bearer <token>`.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() || token.contains(char::is_whitespace) {
        return None;
    }
    Some(token)
}

/// Authorization layer for private routes.
///
/// Verifies the bearer token, loads its user and stores an [`AuthUser`] in the
/// request extensions. Every refusal is the same `401 unauthorized`.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> ApiResult<Response> {
    let token = bearer_token(req.headers()).ok_or_else(ApiError::unauthorized)?;

    let user_id = state.tokens.verify_access_token(token).map_err(|e| {
        debug!(reason = %e, "access token refused");
        ApiError::unauthorized()
    })?;

    let user = state.users.find_by_id(user_id).await?.ok_or_else(|| {
        debug!(user_id, "token for unknown user");
        ApiError::unauthorized()
    })?;

    req.extensions_mut().insert(AuthUser(user));
    Ok(next.run(req).await)
}
