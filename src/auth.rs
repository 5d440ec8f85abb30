//! Session tokens and the per-request authentication gate.

use crate::errors::AppError;
use crate::models::{Claims, User};
use actix_web::cookie::Cookie;
use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use std::env;
use std::future::{ready, Ready};

pub const SESSION_COOKIE: &str = "session";
const SESSION_HOURS: i64 = 24;

fn secret() -> String {
    env::var("JWT_SECRET").unwrap_or_else(|_| "secret".to_string())
}

pub fn create_session_token(user: &User) -> Result<String, AppError> {
    let expiration = chrono::Utc::now()
        .checked_add_signed(chrono::Duration::hours(SESSION_HOURS))
        .ok_or_else(|| AppError::Internal("session expiry overflow".to_string()))?
        .timestamp() as usize;

    let claims = Claims {
        sub: user.username.clone(),
        uid: user.id,
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret().as_ref()),
    )
    .map_err(|err| AppError::Internal(format!("token signing failed: {err}")))
}

pub fn validate_session_token(token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret().as_ref()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .finish()
}

pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, "");
    cookie.set_path("/");
    cookie.make_removal();
    cookie
}

/// The authenticated identity of the current request.
#[derive(Debug, Clone)]
pub struct AuthedUser {
    pub id: i64,
    pub username: String,
}

/// Resolves the session cookie to an identity, or `None` for anonymous
/// callers. Login and registration use this directly for their re-entry
/// guard; everything else goes through the `FromRequest` impl below.
pub fn session_user(req: &HttpRequest) -> Option<AuthedUser> {
    let cookie = req.cookie(SESSION_COOKIE)?;
    let claims = validate_session_token(cookie.value()).ok()?;
    Some(AuthedUser {
        id: claims.uid,
        username: claims.sub,
    })
}

impl FromRequest for AuthedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    // Anonymous callers short-circuit here, before any handler body runs.
    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(session_user(req).ok_or(AppError::Unauthenticated))
    }
}
