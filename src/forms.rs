//! Form validation, independent of any rendering layer.

use crate::errors::FieldErrors;
use crate::models::{RegisterForm, TaskForm};
use lazy_static::lazy_static;
use regex::Regex;

const USERNAME_MAX_CHARS: usize = 150;
const PASSWORD_MIN_CHARS: usize = 8;
const TITLE_MAX_CHARS: usize = 200;

lazy_static! {
    static ref USERNAME_RE: Regex =
        Regex::new(r"^[A-Za-z0-9@.+_-]+$").expect("valid username regex");
}

/// A registration submission that passed every field check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRegistration {
    pub username: String,
    pub password: String,
}

/// A task submission that passed every field check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTask {
    pub title: String,
    pub description: Option<String>,
    pub complete: bool,
}

pub fn validate_registration(form: &RegisterForm) -> Result<ValidatedRegistration, FieldErrors> {
    let mut errors = FieldErrors::new();
    let username = form.username.trim();

    if username.is_empty() {
        errors.push("username", "This field is required.");
    } else if username.chars().count() > USERNAME_MAX_CHARS {
        errors.push("username", "Ensure this value has at most 150 characters.");
    } else if !USERNAME_RE.is_match(username) {
        errors.push(
            "username",
            "Enter a valid username. Letters, digits and @/./+/-/_ only.",
        );
    }

    if form.password1.chars().count() < PASSWORD_MIN_CHARS {
        errors.push(
            "password1",
            "This password is too short. It must contain at least 8 characters.",
        );
    } else if form.password1.chars().all(|c| c.is_ascii_digit()) {
        errors.push("password1", "This password is entirely numeric.");
    }

    if form.password1 != form.password2 {
        errors.push("password2", "The two password fields didn't match.");
    }

    if errors.is_empty() {
        Ok(ValidatedRegistration {
            username: username.to_string(),
            password: form.password1.clone(),
        })
    } else {
        Err(errors)
    }
}

pub fn validate_task(form: &TaskForm) -> Result<ValidatedTask, FieldErrors> {
    let mut errors = FieldErrors::new();
    let title = form.title.trim();

    if title.is_empty() {
        errors.push("title", "This field is required.");
    } else if title.chars().count() > TITLE_MAX_CHARS {
        errors.push("title", "Ensure this value has at most 200 characters.");
    }

    // Empty description collapses to "no description".
    let description = form
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string);

    if errors.is_empty() {
        Ok(ValidatedTask {
            title: title.to_string(),
            description,
            complete: form.complete,
        })
    } else {
        Err(errors)
    }
}
