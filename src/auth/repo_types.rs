use sqlx::FromRow;
use time::OffsetDateTime;

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,                                     // assigned on insert
    pub email: String,                               // unique
    pub password_hash: String,                       // Argon2 PHC string, never exposed
    pub refresh_token: Option<String>,               // set on login
    pub refresh_token_exp: Option<OffsetDateTime>,   // only meaningful with refresh_token
}

/// Owner and expiry of a stored refresh token, read together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSession {
    pub user_id: i64,
    pub expires_at: OffsetDateTime,
}
