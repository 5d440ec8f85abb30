use actix_web::{get, web, App, HttpResponse, HttpServer, Responder};
use flexi_logger::Logger;
use log::info;

mod auth;
mod db;
mod errors;
mod forms;
mod models;
mod task_handlers;
mod user_handlers;

#[get("/")]
async fn index() -> impl Responder {
    user_handlers::redirect_to("/tasks")
}

/// Simple health check
#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().body("OK")
}

/// Registers every route. Shared with the test harness so tests run
/// against the same app the server does.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(index)
        .service(health)
        .service(user_handlers::login_page)
        .service(user_handlers::login)
        .service(user_handlers::register_page)
        .service(user_handlers::register)
        .service(user_handlers::logout)
        .service(task_handlers::task_list)
        // `/tasks/new` must precede `/tasks/{id}`.
        .service(task_handlers::task_create_page)
        .service(task_handlers::task_create)
        .service(task_handlers::task_detail)
        .service(task_handlers::task_edit_page)
        .service(task_handlers::task_update)
        .service(task_handlers::task_delete_page)
        .service(task_handlers::task_delete);
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();

    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let _logger = Logger::try_with_env_or_str(&log_level)
        .and_then(|logger| logger.start())
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err.to_string()))?;

    let db_path = std::env::var("DATABASE_PATH").unwrap_or_else(|_| "tasknest.db".to_string());
    let conn = db::open_db(&db_path)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err.to_string()))?;
    let store = db::into_shared(conn);

    let port = std::env::var("PORT").unwrap_or_else(|_| "8000".to_string());
    let addr = format!("0.0.0.0:{}", port);
    info!("event=server_start module=main status=ok addr={}", addr);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(store.clone()))
            .configure(configure)
    })
    .bind(addr)?
    .run()
    .await
}
