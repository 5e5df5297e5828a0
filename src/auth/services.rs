use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::auth::dto::{LoginRequest, RefreshRequest, RegisterRequest, TokenPair};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::repo_types::User;
use crate::auth::token::REFRESH_TOKEN_TTL;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Same message for unknown email and wrong password.
pub const BAD_CREDENTIALS: &str = "incorrected email or password";

const PASSWORD_MIN_LEN: usize = 8;
const PASSWORD_MAX_LEN: usize = 100;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

lazy_static! {
    /// Hash checked against when the email is unknown, so both login failures cost one argon2 run.
    static ref DUMMY_HASH: Option<String> = hash_password("dummy-password-never-matches").ok();
}

fn burn_password_check(plain: &str) {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(plain, hash);
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_registration(email: &str, password: &str) -> ApiResult<()> {
    if !is_valid_email(email) {
        return Err(ApiError::UnprocessableEntity(
            "email: must be a valid email address".into(),
        ));
    }
    let len = password.chars().count();
    if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len) {
        return Err(ApiError::UnprocessableEntity(format!(
            "password: the length must be between {PASSWORD_MIN_LEN} and {PASSWORD_MAX_LEN}"
        )));
    }
    Ok(())
}

pub async fn register(state: &AppState, req: RegisterRequest) -> ApiResult<User> {
    let email = normalize_email(&req.email);
    validate_registration(&email, &req.password)?;

    let hash = hash_password(&req.password)?;
    let user = state.users.create(&email, &hash).await.map_err(|e| {
        warn!(email = %email, error = %e, "registration rejected");
        ApiError::from(e)
    })?;

    info!(user_id = user.id, email = %user.email, "user registered");
    Ok(user)
}

/// Verifies credentials, issues a token pair and stores the refresh token,
/// replacing any previous one.
pub async fn login(state: &AppState, req: LoginRequest) -> ApiResult<TokenPair> {
    let email = normalize_email(&req.email);

    let Some(user) = state.users.find_by_email(&email).await? else {
        burn_password_check(&req.password);
        warn!(email = %email, "login unknown email");
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS.into()));
    };

    if !verify_password(&req.password, &user.password_hash)? {
        warn!(user_id = user.id, "login invalid password");
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS.into()));
    }

    let access_token = state.tokens.issue_access_token(user.id)?;
    let refresh_token = state.tokens.issue_refresh_token()?;
    let expires_at = OffsetDateTime::now_utc() + REFRESH_TOKEN_TTL;
    state
        .users
        .save_refresh_token(user.id, &refresh_token, expires_at)
        .await?;

    info!(user_id = user.id, "user logged in");
    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

/// Exchanges a stored, unexpired refresh token for a new access token.
pub async fn refresh(state: &AppState, req: RefreshRequest) -> ApiResult<String> {
    let Some(session) = state.users.find_by_refresh_token(&req.refresh_token).await? else {
        return Err(ApiError::Unauthorized("invalid refresh token".into()));
    };

    if session.expires_at < OffsetDateTime::now_utc() {
        warn!(user_id = session.user_id, "refresh token expired");
        return Err(ApiError::Unauthorized("refresh token expired".into()));
    }

    let access_token = state.tokens.issue_access_token(session.user_id)?;
    info!(user_id = session.user_id, "access token refreshed");
    Ok(access_token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use axum::http::StatusCode;
    use time::Duration;

    fn state() -> AppState {
        AppState::in_memory(AppConfig::for_tests("test-secret"))
    }

    fn credentials(email: &str, password: &str) -> (RegisterRequest, LoginRequest) {
        (
            RegisterRequest {
                email: email.into(),
                password: password.into(),
            },
            LoginRequest {
                email: email.into(),
                password: password.into(),
            },
        )
    }

    #[test]
    fn dummy_hash_is_a_real_argon2_hash() {
        let hash = DUMMY_HASH.as_deref().expect("dummy hash");
        assert!(hash.starts_with("$argon2id$"));
        assert!(!verify_password("password", hash).unwrap());
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("user@example.org"));
        assert!(!is_valid_email("invalid"));
        assert!(!is_valid_email("a b@example.org"));
        assert!(!is_valid_email(""));
    }

    #[tokio::test]
    async fn register_then_login_yields_token_for_same_user() {
        let state = state();
        let (reg, login_req) = credentials("User@Example.org ", "password");

        let user = register(&state, reg).await.unwrap();
        assert_eq!(user.email, "user@example.org");
        assert_ne!(user.password_hash, "password");

        let pair = login(&state, login_req).await.unwrap();
        assert!(!pair.refresh_token.is_empty());
        assert_eq!(
            state.tokens.verify_access_token(&pair.access_token).unwrap(),
            user.id
        );
    }

    #[tokio::test]
    async fn register_rejects_invalid_input() {
        let state = state();
        for (email, password) in [("invalid", "password"), ("a@example.org", "short")] {
            let (reg, _) = credentials(email, password);
            let err = register(&state, reg).await.unwrap_err();
            assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        }
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email() {
        let state = state();
        register(&state, credentials("a@example.org", "password").0)
            .await
            .unwrap();
        let err = register(&state, credentials("A@example.org", "password").0)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let state = state();
        register(&state, credentials("a@example.org", "password").0)
            .await
            .unwrap();

        let wrong = login(&state, credentials("a@example.org", "nope-nope").1)
            .await
            .unwrap_err();
        let unknown = login(&state, credentials("b@example.org", "password").1)
            .await
            .unwrap_err();
        for err in [wrong, unknown] {
            assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(err.to_string(), BAD_CREDENTIALS);
        }
    }

    #[tokio::test]
    async fn refresh_accepts_current_token_only() {
        let state = state();
        let (reg, login_req) = credentials("a@example.org", "password");
        let user = register(&state, reg).await.unwrap();

        let first = login(&state, login_req).await.unwrap();
        let access = refresh(
            &state,
            RefreshRequest {
                refresh_token: first.refresh_token.clone(),
            },
        )
        .await
        .unwrap();
        assert_eq!(state.tokens.verify_access_token(&access).unwrap(), user.id);

        let second = login(&state, credentials("a@example.org", "password").1)
            .await
            .unwrap();
        assert_ne!(first.refresh_token, second.refresh_token);

        let err = refresh(
            &state,
            RefreshRequest {
                refresh_token: first.refresh_token,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

        assert!(refresh(
            &state,
            RefreshRequest {
                refresh_token: second.refresh_token
            }
        )
        .await
        .is_ok());
    }

    #[tokio::test]
    async fn refresh_rejects_expired_token() {
        let state = state();
        let user = register(&state, credentials("a@example.org", "password").0)
            .await
            .unwrap();
        state
            .users
            .save_refresh_token(
                user.id,
                "stale",
                OffsetDateTime::now_utc() - Duration::minutes(1),
            )
            .await
            .unwrap();

        let err = refresh(
            &state,
            RefreshRequest {
                refresh_token: "stale".into(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.to_string(), "refresh token expired");
    }
}
