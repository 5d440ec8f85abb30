//! Owner-scoped task handlers: list, detail, create, update, delete.
//!
//! Every handler takes `AuthedUser`, so anonymous callers are redirected
//! before any of these bodies run. Ownership is enforced by the store
//! queries themselves; a foreign task id behaves exactly like a missing one.

use crate::auth::AuthedUser;
use crate::db::{self, Db};
use crate::errors::AppError;
use crate::forms::validate_task;
use crate::models::{TaskForm, TaskListPage};
use crate::user_handlers::redirect_to;
use actix_web::{get, post, web, HttpResponse};
use log::info;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

const NEW_TASK_PAGE_HTML: &str = r#"
<!DOCTYPE html>
<html>
<head><title>New task</title></head>
<body>
    <h1>New task</h1>
    <form method="post" action="/tasks/new">
        <label>Title <input name="title"></label>
        <label>Description <textarea name="description"></textarea></label>
        <label>Complete <input name="complete" type="checkbox" value="true"></label>
        <button type="submit">Create</button>
    </form>
    <p><a href="/tasks">Back to tasks</a></p>
</body>
</html>
"#;

const DELETE_CONFIRM_PAGE_HTML: &str = r#"
<!DOCTYPE html>
<html>
<head><title>Delete task</title></head>
<body>
    <h1>Delete task?</h1>
    <form method="post" action="">
        <button type="submit">Delete</button>
    </form>
    <p><a href="/tasks">Cancel</a></p>
</body>
</html>
"#;

#[derive(Debug, Deserialize)]
pub struct TaskListQuery {
    #[serde(rename = "search-area", default)]
    search_area: Option<String>,
}

// Malformed ids get the same answer as foreign or unknown ones.
fn parse_task_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound)
}

#[get("/tasks")]
pub async fn task_list(
    user: AuthedUser,
    query: web::Query<TaskListQuery>,
    data: web::Data<Db>,
) -> Result<HttpResponse, AppError> {
    let conn = data.lock().await;
    // Count before the search filter: it reflects all of the user's open
    // tasks no matter what is currently being searched.
    let count = db::count_incomplete(&conn, user.id)?;
    let mut tasks = db::list_tasks(&conn, user.id)?;

    let search_input = query.search_area.clone().unwrap_or_default();
    if !search_input.is_empty() {
        tasks.retain(|task| task.title.starts_with(&search_input));
    }

    Ok(HttpResponse::Ok().json(TaskListPage {
        tasks,
        count,
        search_input,
    }))
}

#[get("/tasks/new")]
pub async fn task_create_page(_user: AuthedUser) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(NEW_TASK_PAGE_HTML)
}

#[post("/tasks/new")]
pub async fn task_create(
    user: AuthedUser,
    form: web::Form<TaskForm>,
    data: web::Data<Db>,
) -> Result<HttpResponse, AppError> {
    let valid = validate_task(&form).map_err(AppError::Validation)?;
    let conn = data.lock().await;
    // Owner comes from the session, never from the form.
    let task = db::insert_task(&conn, user.id, &valid)?;
    info!(
        "event=task_create module=tasks status=ok user={} task={}",
        user.username, task.id
    );
    Ok(redirect_to("/tasks"))
}

#[get("/tasks/{id}")]
pub async fn task_detail(
    user: AuthedUser,
    path: web::Path<String>,
    data: web::Data<Db>,
) -> Result<HttpResponse, AppError> {
    let id = parse_task_id(&path)?;
    let conn = data.lock().await;
    let task = db::get_task(&conn, user.id, id)?.ok_or(AppError::NotFound)?;
    Ok(HttpResponse::Ok().json(task))
}

#[get("/tasks/{id}/edit")]
pub async fn task_edit_page(
    user: AuthedUser,
    path: web::Path<String>,
    data: web::Data<Db>,
) -> Result<HttpResponse, AppError> {
    let id = parse_task_id(&path)?;
    let conn = data.lock().await;
    let task = db::get_task(&conn, user.id, id)?.ok_or(AppError::NotFound)?;
    Ok(HttpResponse::Ok().json(json!({
        "title": task.title,
        "description": task.description,
        "complete": task.complete,
    })))
}

#[post("/tasks/{id}/edit")]
pub async fn task_update(
    user: AuthedUser,
    path: web::Path<String>,
    form: web::Form<TaskForm>,
    data: web::Data<Db>,
) -> Result<HttpResponse, AppError> {
    let id = parse_task_id(&path)?;
    let valid = validate_task(&form).map_err(AppError::Validation)?;
    let conn = data.lock().await;
    db::update_task(&conn, user.id, id, &valid)?;
    Ok(redirect_to("/tasks"))
}

#[get("/tasks/{id}/delete")]
pub async fn task_delete_page(
    user: AuthedUser,
    path: web::Path<String>,
    data: web::Data<Db>,
) -> Result<HttpResponse, AppError> {
    let id = parse_task_id(&path)?;
    let conn = data.lock().await;
    db::get_task(&conn, user.id, id)?.ok_or(AppError::NotFound)?;
    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(DELETE_CONFIRM_PAGE_HTML))
}

#[post("/tasks/{id}/delete")]
pub async fn task_delete(
    user: AuthedUser,
    path: web::Path<String>,
    data: web::Data<Db>,
) -> Result<HttpResponse, AppError> {
    let id = parse_task_id(&path)?;
    let conn = data.lock().await;
    db::delete_task(&conn, user.id, id)?;
    Ok(redirect_to("/tasks"))
}
