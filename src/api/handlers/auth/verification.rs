//! Verification code confirmation.

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use tracing::{error, info, instrument};

use super::{types::VerifyCodeRequest, utils::valid_verify_code};
use crate::{
    api::handlers::{ApiResponse, fail, ok},
    store::DynStore,
};

#[utoipa::path(
    post,
    path = "/api/verify-code",
    request_body = VerifyCodeRequest,
    responses(
        (status = 200, description = "Account verified", body = ApiResponse),
        (status = 400, description = "Invalid, incorrect or expired code", body = ApiResponse),
        (status = 404, description = "User not found", body = ApiResponse),
        (status = 500, description = "Verification failed", body = ApiResponse)
    ),
    tag = "auth"
)]
#[instrument(skip(store, payload))]
pub async fn verify_code(
    store: Extension<DynStore>,
    payload: Option<Json<VerifyCodeRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return fail(StatusCode::BAD_REQUEST, "Missing payload");
    };
    let code = request.code.trim();
    if !valid_verify_code(code) {
        return fail(
            StatusCode::BAD_REQUEST,
            "Verification code must be 6 digits",
        );
    }

    let user = match store.find_user_by_username(request.username.trim()).await {
        Ok(Some(user)) => user,
        Ok(None) => return fail(StatusCode::NOT_FOUND, "User not found"),
        Err(err) => {
            error!("Verification lookup failed: {err:#}");
            return fail(StatusCode::INTERNAL_SERVER_ERROR, "Error verifying user");
        }
    };

    if user.is_verified {
        return fail(StatusCode::BAD_REQUEST, "Account is already verified");
    }
    // Expiry is checked before the code so stale codes always ask for a new sign-up.
    if user.verify_code_expires_at <= Utc::now() {
        return fail(
            StatusCode::BAD_REQUEST,
            "Verification code has expired, please sign up again",
        );
    }
    if user.verify_code != code {
        return fail(StatusCode::BAD_REQUEST, "Incorrect verification code");
    }

    if let Err(err) = store.mark_verified(user.id).await {
        error!("Failed to mark user verified: {err:#}");
        return fail(StatusCode::INTERNAL_SERVER_ERROR, "Error verifying user");
    }
    info!(username = %user.username, "account verified");
    ok(StatusCode::OK, "Account verified successfully")
}
