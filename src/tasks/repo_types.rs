use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

/// Task row, also the JSON shape returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Task {
    pub task_id: i64,
    pub user_id: i64,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub deadline: Option<OffsetDateTime>,
    pub complete: bool,
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub deadline: OffsetDateTime,
    pub complete: bool,
}

/// Fields to change on an existing task. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub deadline: Option<OffsetDateTime>,
    pub complete: Option<bool>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.deadline.is_none()
            && self.complete.is_none()
    }

    pub fn apply(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = Some(title.clone());
        }
        if let Some(description) = &self.description {
            task.description = Some(description.clone());
        }
        if let Some(deadline) = self.deadline {
            task.deadline = Some(deadline);
        }
        if let Some(complete) = self.complete {
            task.complete = complete;
        }
    }
}
