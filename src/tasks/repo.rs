use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::StoreError;
use crate::tasks::repo_types::{NewTask, Task, TaskPatch};

/// Task persistence. Every operation is scoped by owner.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Task>, StoreError>;
    async fn create(&self, task: NewTask) -> Result<Task, StoreError>;
    /// Returns `None` when no task with that id belongs to `user_id`.
    async fn update(
        &self,
        user_id: i64,
        task_id: i64,
        patch: &TaskPatch,
    ) -> Result<Option<Task>, StoreError>;
    /// Deletes the listed tasks owned by `user_id` and returns how many went away.
    async fn delete_many(&self, user_id: i64, task_ids: &[i64]) -> Result<u64, StoreError>;
}

#[derive(Clone)]
pub struct PgTaskStore {
    db: PgPool,
}

impl PgTaskStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Task>, StoreError> {
        let rows = sqlx::query_as::<_, Task>(
            r#"
            SELECT task_id, user_id, title, description, deadline, complete
            FROM tasks
            WHERE user_id = $1
            ORDER BY task_id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn create(&self, task: NewTask) -> Result<Task, StoreError> {
        let row = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (user_id, title, description, deadline, complete)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING task_id, user_id, title, description, deadline, complete
            "#,
        )
        .bind(task.user_id)
        .bind(task.title)
        .bind(task.description)
        .bind(task.deadline)
        .bind(task.complete)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn update(
        &self,
        user_id: i64,
        task_id: i64,
        patch: &TaskPatch,
    ) -> Result<Option<Task>, StoreError> {
        let row = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
               SET title       = COALESCE($1, title),
                   description = COALESCE($2, description),
                   deadline    = COALESCE($3, deadline),
                   complete    = COALESCE($4, complete)
             WHERE task_id = $5 AND user_id = $6
            RETURNING task_id, user_id, title, description, deadline, complete
            "#,
        )
        .bind(patch.title.as_deref())
        .bind(patch.description.as_deref())
        .bind(patch.deadline)
        .bind(patch.complete)
        .bind(task_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn delete_many(&self, user_id: i64, task_ids: &[i64]) -> Result<u64, StoreError> {
        if task_ids.is_empty() {
            return Ok(0);
        }
        let res = sqlx::query("DELETE FROM tasks WHERE user_id = $1 AND task_id = ANY($2)")
            .bind(user_id)
            .bind(task_ids)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected())
    }
}
