use serde::Deserialize;

/// Body of `POST /user/{id}/task`. Fields are optional so that missing ones
/// surface as validation errors (422) rather than malformed-body errors (400).
#[derive(Debug, Default, Deserialize)]
pub struct CreateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    /// `YYYY-MM-DD HH:MM:SS`, UTC.
    pub deadline: Option<String>,
    pub complete: Option<bool>,
}

/// Body of `PATCH /user/{id}/task/{task_id}`. Absent fields stay as they are.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub deadline: Option<String>,
    pub complete: Option<bool>,
}
