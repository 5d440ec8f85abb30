use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub created_at: String,
}

/// A single task row. `owner` is set at creation and never changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub complete: bool,
    pub owner: i64,
    pub created_at: String,
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub password1: String,
    pub password2: String,
}

/// Task create/update payload. There is deliberately no owner field;
/// unknown form keys are ignored, so a client-supplied owner never
/// reaches the store.
#[derive(Deserialize)]
pub struct TaskForm {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub complete: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub uid: i64,
    pub exp: usize,
}

/// Payload of `GET /tasks`.
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskListPage {
    pub tasks: Vec<Task>,
    /// Incomplete tasks for the owner, counted before the search filter.
    pub count: i64,
    pub search_input: String,
}
