use lazy_static::lazy_static;
use regex::Regex;

use crate::error::AppError;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Result of `generate_token`.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub access_token: String,
}

/// Public part of a user returned after sign-in. Deliberately has no password field.
#[derive(Debug, Clone)]
pub struct LoginResponse {
    pub id: i32,
    pub name: String,
    pub avatar: Option<String>,
    pub access_token: String,
}

/// Credentials submitted once per sign-in attempt.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn parse(email: &str, password: String) -> Result<Self, AppError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(AppError::BadRequest("email is required".into()));
        }
        if password.is_empty() {
            return Err(AppError::BadRequest("password is required".into()));
        }
        Ok(Self {
            email: email.to_string(),
            password,
        })
    }
}

/// Registration input after trimming and validation.
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub bio: Option<String>,
    pub avatar: Option<String>,
}

impl Registration {
    pub fn parse(
        name: &str,
        email: &str,
        password: String,
        bio: Option<String>,
        avatar: Option<String>,
    ) -> Result<Self, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::BadRequest("name is required".into()));
        }
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(AppError::BadRequest("Invalid email".into()));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AppError::BadRequest("Password too short".into()));
        }
        Ok(Self {
            name: name.to_string(),
            email: email.to_string(),
            password,
            bio: non_blank(bio),
            avatar: non_blank(avatar),
        })
    }
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}
