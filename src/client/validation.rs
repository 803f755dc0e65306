//! Form validation shared by the sign-in and sign-up controllers.
//!
//! The rules are the ones the server enforces, so a form that passes here is
//! only rejected for business reasons (taken username, bad credentials).

use crate::api::handlers::auth::utils::{
    PASSWORD_MIN_LEN, normalize_email, username_problem, valid_email, valid_password,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Username,
    Email,
    Password,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

impl FieldError {
    fn new(field: Field, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Both fields are required and must not be blank.
#[must_use]
pub fn sign_in_errors(identifier: &str, password: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if identifier.trim().is_empty() {
        errors.push(FieldError::new(Field::Username, "Username or email is required"));
    }
    if password.trim().is_empty() {
        errors.push(FieldError::new(Field::Password, "Password is required"));
    }
    errors
}

#[must_use]
pub fn sign_up_errors(username: &str, email: &str, password: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if let Some(problem) = username_problem(username.trim()) {
        errors.push(FieldError::new(Field::Username, problem));
    }
    if !valid_email(&normalize_email(email)) {
        errors.push(FieldError::new(Field::Email, "Invalid email address"));
    }
    if !valid_password(password) {
        errors.push(FieldError::new(
            Field::Password,
            format!("Password must be at least {PASSWORD_MIN_LEN} characters"),
        ));
    }
    errors
}
