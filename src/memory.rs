//! In-process store used by tests and by local runs without `DATABASE_URL`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::auth::repo::UserStore;
use crate::auth::repo_types::{RefreshSession, User};
use crate::error::StoreError;
use crate::tasks::repo::TaskStore;
use crate::tasks::repo_types::{NewTask, Task, TaskPatch};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    tasks: BTreeMap<i64, Task>,
    next_user_id: i64,
    next_task_id: i64,
}

/// Implements both [`UserStore`] and [`TaskStore`] behind one lock.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        let mut t = self.tables.lock().await;
        if t.users.values().any(|u| u.email == email) {
            return Err(StoreError::DuplicateEmail);
        }
        t.next_user_id += 1;
        let user = User {
            id: t.next_user_id,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            refresh_token: None,
            refresh_token_exp: None,
        };
        t.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_refresh_token(
        &self,
        token: &str,
    ) -> Result<Option<RefreshSession>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.users.values().find_map(|u| {
            match (u.refresh_token.as_deref(), u.refresh_token_exp) {
                (Some(stored), Some(expires_at)) if stored == token => Some(RefreshSession {
                    user_id: u.id,
                    expires_at,
                }),
                _ => None,
            }
        }))
    }

    async fn save_refresh_token(
        &self,
        id: i64,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), StoreError> {
        let mut t = self.tables.lock().await;
        if let Some(user) = t.users.get_mut(&id) {
            user.refresh_token = Some(token.to_string());
            user.refresh_token_exp = Some(expires_at);
        }
        Ok(())
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Task>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.tasks
            .values()
            .filter(|task| task.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create(&self, new: NewTask) -> Result<Task, StoreError> {
        let mut t = self.tables.lock().await;
        t.next_task_id += 1;
        let task = Task {
            task_id: t.next_task_id,
            user_id: new.user_id,
            title: Some(new.title),
            description: new.description,
            deadline: Some(new.deadline),
            complete: new.complete,
        };
        t.tasks.insert(task.task_id, task.clone());
        Ok(task)
    }

    async fn update(
        &self,
        user_id: i64,
        task_id: i64,
        patch: &TaskPatch,
    ) -> Result<Option<Task>, StoreError> {
        let mut t = self.tables.lock().await;
        match t.tasks.get_mut(&task_id) {
            Some(task) if task.user_id == user_id => {
                patch.apply(task);
                Ok(Some(task.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_many(&self, user_id: i64, task_ids: &[i64]) -> Result<u64, StoreError> {
        let mut t = self.tables.lock().await;
        let mut removed = 0;
        for id in task_ids {
            if t.tasks.get(id).is_some_and(|task| task.user_id == user_id) {
                t.tasks.remove(id);
                removed += 1;
            }
        }
        Ok(removed)
    }
}
