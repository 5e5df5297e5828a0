use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::warn;

use crate::auth::repo::{PgUserStore, UserStore};
use crate::auth::token::TokenService;
use crate::config::AppConfig;
use crate::memory::MemoryStore;
use crate::tasks::repo::{PgTaskStore, TaskStore};

/// Shared by every request. Only the stores carry mutable state.
#[derive(Clone)]
pub struct AppState {
    pub tokens: TokenService,
    pub users: Arc<dyn UserStore>,
    pub tasks: Arc<dyn TaskStore>,
}

impl AppState {
    /// Connects to Postgres when configured. The pool is returned for migrations.
    pub async fn init(config: AppConfig) -> anyhow::Result<(Self, Option<PgPool>)> {
        match config.database_url.clone() {
            Some(url) => {
                let db = PgPoolOptions::new()
                    .max_connections(10)
                    .connect(&url)
                    .await
                    .context("connect to database")?;
                let state = Self::from_parts(
                    config,
                    Arc::new(PgUserStore::new(db.clone())),
                    Arc::new(PgTaskStore::new(db.clone())),
                );
                Ok((state, Some(db)))
            }
            None => {
                warn!("DATABASE_URL not set; using in-memory store, data is lost on exit");
                Ok((Self::in_memory(config), None))
            }
        }
    }

    pub fn from_parts(
        config: AppConfig,
        users: Arc<dyn UserStore>,
        tasks: Arc<dyn TaskStore>,
    ) -> Self {
        Self {
            tokens: TokenService::new(config.jwt.secret.as_bytes()),
            users,
            tasks,
        }
    }

    pub fn in_memory(config: AppConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::from_parts(config, store.clone(), store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_service_uses_configured_secret() {
        let state = AppState::in_memory(AppConfig::for_tests("state-secret"));
        let token = state.tokens.issue_access_token(3).unwrap();
        assert_eq!(
            TokenService::new(b"state-secret")
                .verify_access_token(&token)
                .unwrap(),
            3
        );
        assert!(TokenService::new(b"other").verify_access_token(&token).is_err());
    }
}
