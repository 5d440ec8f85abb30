//! Login, registration, and logout handlers.

use crate::auth::{create_session_token, removal_cookie, session_cookie, session_user};
use crate::db::{self, Db};
use crate::errors::AppError;
use crate::forms::validate_registration;
use crate::models::{LoginForm, RegisterForm};
use actix_web::http::header;
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use bcrypt::verify;
use log::info;

const LOGIN_PAGE_HTML: &str = r#"
<!DOCTYPE html>
<html>
<head><title>Log in</title></head>
<body>
    <h1>Log in</h1>
    <form method="post" action="/login">
        <label>Username <input name="username"></label>
        <label>Password <input name="password" type="password"></label>
        <button type="submit">Log in</button>
    </form>
    <p>No account? <a href="/register">Register</a></p>
</body>
</html>
"#;

const REGISTER_PAGE_HTML: &str = r#"
<!DOCTYPE html>
<html>
<head><title>Register</title></head>
<body>
    <h1>Register</h1>
    <form method="post" action="/register">
        <label>Username <input name="username"></label>
        <label>Password <input name="password1" type="password"></label>
        <label>Confirm password <input name="password2" type="password"></label>
        <button type="submit">Register</button>
    </form>
    <p>Already registered? <a href="/login">Log in</a></p>
</body>
</html>
"#;

pub fn redirect_to(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}

fn signed_in_redirect(token: String) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, "/tasks"))
        .cookie(session_cookie(token))
        .finish()
}

#[get("/login")]
pub async fn login_page(req: HttpRequest) -> HttpResponse {
    if session_user(&req).is_some() {
        return redirect_to("/tasks");
    }
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(LOGIN_PAGE_HTML)
}

#[post("/login")]
pub async fn login(
    req: HttpRequest,
    form: web::Form<LoginForm>,
    data: web::Data<Db>,
) -> Result<HttpResponse, AppError> {
    // Already signed in: skip the credential check entirely.
    if session_user(&req).is_some() {
        return Ok(redirect_to("/tasks"));
    }

    let conn = data.lock().await;
    if let Some(user) = db::find_user(&conn, &form.username)? {
        if verify(&form.password, &user.password_hash).unwrap_or(false) {
            let token = create_session_token(&user)?;
            info!("event=login module=auth status=ok user={}", user.username);
            return Ok(signed_in_redirect(token));
        }
    }
    // One rejection for unknown user and wrong password alike.
    info!("event=login module=auth status=rejected");
    Err(AppError::CredentialsRejected)
}

#[get("/register")]
pub async fn register_page(req: HttpRequest) -> HttpResponse {
    if session_user(&req).is_some() {
        return redirect_to("/tasks");
    }
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(REGISTER_PAGE_HTML)
}

#[post("/register")]
pub async fn register(
    req: HttpRequest,
    form: web::Form<RegisterForm>,
    data: web::Data<Db>,
) -> Result<HttpResponse, AppError> {
    if session_user(&req).is_some() {
        return Ok(redirect_to("/tasks"));
    }

    let valid = validate_registration(&form).map_err(AppError::Validation)?;
    let conn = data.lock().await;
    let user = db::create_user(&conn, &valid.username, &valid.password)?;
    // Auto-login: the caller never observes a created-but-signed-out user.
    let token = create_session_token(&user)?;
    info!(
        "event=register module=auth status=ok user={}",
        user.username
    );
    Ok(signed_in_redirect(token))
}

#[post("/logout")]
pub async fn logout() -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, "/login"))
        .cookie(removal_cookie())
        .finish()
}
