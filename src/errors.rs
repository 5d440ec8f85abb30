//! Request-boundary error taxonomy.

use actix_web::http::{header, StatusCode};
use actix_web::{HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One failed field of a submitted form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Field-level validation failures, re-presented to the caller with the form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldErrors {
    pub errors: Vec<FieldError>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: &str) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: &str, message: &str) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug)]
pub enum AppError {
    /// No valid session; the caller is redirected to the login page.
    Unauthenticated,
    /// Id absent, malformed, or owned by a different user. One response for all.
    NotFound,
    /// Malformed form input; no mutation was applied.
    Validation(FieldErrors),
    /// Login rejected. Deliberately carries no detail about which field was wrong.
    CredentialsRejected,
    /// Storage-layer failure.
    Database(rusqlite::Error),
    /// Broken server setup, e.g. an unusable signing key.
    Internal(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "authentication required"),
            Self::NotFound => write!(f, "not found"),
            Self::Validation(errors) => {
                write!(f, "validation failed on {} field(s)", errors.errors.len())
            }
            Self::CredentialsRejected => write!(f, "invalid credentials"),
            Self::Database(err) => write!(f, "database error: {err}"),
            Self::Internal(message) => write!(f, "internal error: {message}"),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Database(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Database(value)
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::SEE_OTHER,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::CredentialsRejected => StatusCode::UNAUTHORIZED,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            Self::Unauthenticated => HttpResponse::SeeOther()
                .insert_header((header::LOCATION, "/login"))
                .finish(),
            Self::NotFound => HttpResponse::NotFound().json(json!({ "error": "not found" })),
            Self::Validation(errors) => HttpResponse::BadRequest().json(errors),
            Self::CredentialsRejected => {
                HttpResponse::Unauthorized().body("Invalid username or password")
            }
            Self::Database(err) => {
                log::error!("event=request_failed status=error error_code=database error={err}");
                HttpResponse::InternalServerError().body("internal error")
            }
            Self::Internal(message) => {
                log::error!("event=request_failed status=error error_code=internal error={message}");
                HttpResponse::InternalServerError().body("internal error")
            }
        }
    }
}
