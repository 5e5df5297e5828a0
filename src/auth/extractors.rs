use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use super::repo_types::User;
use crate::error::ApiError;

/// The user resolved by [`require_auth`](super::middleware::require_auth).
///
/// Only the auth module can build one, so a handler that takes `AuthUser`
/// can only run behind the authorization middleware.
#[derive(Debug, Clone)]
pub struct AuthUser(pub(super) User);

impl AuthUser {
    pub fn id(&self) -> i64 {
        self.0.id
    }

    pub fn user(&self) -> &User {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(ApiError::unauthorized)
    }
}
