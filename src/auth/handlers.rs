use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    app::method_not_allowed,
    auth::{
        dto::{
            AccessTokenResponse, LoginRequest, PublicUser, RefreshRequest, RegisterRequest,
            TokenPair,
        },
        extractors::AuthUser,
        services,
    },
    error::ApiResult,
    extract::JsonBody,
    state::AppState,
};

/// Unauthenticated endpoints.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register).fallback(method_not_allowed))
        .route("/login", post(login).fallback(method_not_allowed))
        .route("/refresh", post(refresh).fallback(method_not_allowed))
}

/// Endpoints that need an [`AuthUser`]; the caller adds the authorization layer.
pub fn whoami_routes() -> Router<AppState> {
    Router::new().route("/whoami", get(whoami).fallback(method_not_allowed))
}

#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<PublicUser>)> {
    let user = services::register(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(PublicUser::from(&user))))
}

#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> ApiResult<Json<TokenPair>> {
    Ok(Json(services::login(&state, payload).await?))
}

#[instrument(skip_all)]
pub async fn refresh(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RefreshRequest>,
) -> ApiResult<Json<AccessTokenResponse>> {
    let access_token = services::refresh(&state, payload).await?;
    Ok(Json(AccessTokenResponse { access_token }))
}

#[instrument(skip_all, fields(user_id = user.id()))]
pub async fn whoami(user: AuthUser) -> Json<PublicUser> {
    Json(PublicUser::from(user.user()))
}
