//! API handlers and the JSON envelope they share.
//!
//! Every body carries a stable `success` flag and a human readable `message`.
//! Failures are logged where they happen and never expose internals.

pub mod auth;
pub mod feedbacks;
pub mod health;
pub mod messages;
pub mod root;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Minimal response body used by every endpoint without extra fields.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
}

impl ApiResponse {
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// `success:true` body with the given status.
pub(crate) fn ok(status: StatusCode, message: &str) -> Response {
    (status, Json(ApiResponse::ok(message))).into_response()
}

/// `success:false` body with the given status.
pub(crate) fn fail(status: StatusCode, message: &str) -> Response {
    (status, Json(ApiResponse::fail(message))).into_response()
}

/// Map a `require_auth` status into the shared failure body.
pub(crate) fn auth_failure(status: StatusCode) -> Response {
    if status == StatusCode::UNAUTHORIZED {
        fail(status, "user not authenticated")
    } else {
        fail(status, "error authenticating user")
    }
}
