use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;

use crate::auth::repo_types::{RefreshSession, User};
use crate::error::StoreError;

/// Credential store used by the auth handlers and the authorization middleware.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a user. Fails with [`StoreError::DuplicateEmail`] if the email is taken.
    async fn create(&self, email: &str, password_hash: &str) -> Result<User, StoreError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    /// Token and expiry come from a single read, so a concurrent login cannot tear them.
    async fn find_by_refresh_token(&self, token: &str)
        -> Result<Option<RefreshSession>, StoreError>;
    /// Overwrites whatever refresh token the user had.
    async fn save_refresh_token(
        &self,
        id: i64,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const USER_COLUMNS: &str = "id, email, password_hash, refresh_token, refresh_token_exp";

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::DuplicateEmail,
            other => StoreError::Database(other),
        })?;
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_refresh_token(
        &self,
        token: &str,
    ) -> Result<Option<RefreshSession>, StoreError> {
        let row = sqlx::query_as::<_, (i64, Option<OffsetDateTime>)>(
            r#"
            SELECT id, refresh_token_exp
            FROM users
            WHERE refresh_token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.and_then(|(user_id, exp)| {
            exp.map(|expires_at| RefreshSession {
                user_id,
                expires_at,
            })
        }))
    }

    async fn save_refresh_token(
        &self,
        id: i64,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE users
               SET refresh_token = $1, refresh_token_exp = $2
             WHERE id = $3
            "#,
        )
        .bind(token)
        .bind(expires_at)
        .bind(id)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}
