//! Account registration.
//!
//! Flow Overview:
//! 1) Validate username, email and password.
//! 2) Release the username if it is only held by an expired, unverified account.
//! 3) Reject emails owned by verified accounts; refresh unverified ones in place.
//! 4) Store the Argon2 hash with a fresh six-digit code and hand the code to the sender.

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, instrument};

use super::{
    code_sender::VerificationCode,
    state::AuthState,
    types::SignUpRequest,
    utils::{
        expires_after, generate_verify_code, hash_password, normalize_email, username_problem,
        valid_email, valid_password,
    },
};
use crate::{
    api::handlers::{ApiResponse, fail, ok},
    store::{DynStore, NewUser, WriteOutcome},
};

#[derive(Debug, PartialEq, Eq)]
enum SignUpOutcome {
    Created,
    UsernameTaken,
    EmailTaken,
}

#[utoipa::path(
    post,
    path = "/api/sign-up",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "Account created, verification code sent", body = ApiResponse),
        (status = 400, description = "Validation error", body = ApiResponse),
        (status = 409, description = "Username or email already in use", body = ApiResponse),
        (status = 500, description = "Registration failed", body = ApiResponse)
    ),
    tag = "auth"
)]
#[instrument(skip(store, auth_state, payload))]
pub async fn sign_up(
    store: Extension<DynStore>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<SignUpRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return fail(StatusCode::BAD_REQUEST, "Missing payload");
    };

    let username = request.username.trim().to_string();
    if let Some(problem) = username_problem(&username) {
        return fail(StatusCode::BAD_REQUEST, problem);
    }
    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return fail(StatusCode::BAD_REQUEST, "Invalid email address");
    }
    if !valid_password(&request.password) {
        return fail(
            StatusCode::BAD_REQUEST,
            "Password must be at least 6 characters",
        );
    }

    match register(&store, &auth_state, username, email, &request.password).await {
        Ok(SignUpOutcome::Created) => ok(
            StatusCode::CREATED,
            "User registered successfully. Please verify your account.",
        ),
        Ok(SignUpOutcome::UsernameTaken) => fail(StatusCode::CONFLICT, "Username is already taken"),
        Ok(SignUpOutcome::EmailTaken) => fail(
            StatusCode::CONFLICT,
            "User already exists with this email",
        ),
        Err(err) => {
            error!("Error registering user: {err:#}");
            fail(StatusCode::INTERNAL_SERVER_ERROR, "Error registering user")
        }
    }
}

async fn register(
    store: &DynStore,
    auth_state: &AuthState,
    username: String,
    email: String,
    password: &str,
) -> anyhow::Result<SignUpOutcome> {
    let now = Utc::now();

    if let Some(holder) = store.find_user_by_username(&username).await? {
        if holder.email != email {
            if holder.reserves_username(now) {
                return Ok(SignUpOutcome::UsernameTaken);
            }
            info!(username = %holder.username, "releasing expired unverified username");
            store.delete_unverified_user(holder.id).await?;
        }
    }

    let code = generate_verify_code();
    let expires_at = expires_after(now, auth_state.config().verify_code_ttl_seconds())?;
    let new_user = NewUser {
        username: username.clone(),
        email: email.clone(),
        password_hash: hash_password(password)?,
        verify_code: code.clone(),
        verify_code_expires_at: expires_at,
    };

    let outcome = match store.find_user_by_email(&email).await? {
        Some(existing) if existing.is_verified => return Ok(SignUpOutcome::EmailTaken),
        Some(existing) => store.refresh_unverified_user(existing.id, new_user).await?,
        None => store.create_user(new_user).await?,
    };
    // A concurrent sign-up claimed the username between the lookup and the write.
    if outcome == WriteOutcome::Conflict {
        return Ok(SignUpOutcome::UsernameTaken);
    }

    auth_state.code_sender().send(&VerificationCode {
        username,
        email,
        code,
    })?;
    Ok(SignUpOutcome::Created)
}
