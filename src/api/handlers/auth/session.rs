//! Session cookies, bearer tokens and the sign-out endpoint.

use axum::{
    extract::Extension,
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{AUTHORIZATION, COOKIE, InvalidHeaderValue, SET_COOKIE},
    },
    response::IntoResponse,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, instrument};
use uuid::Uuid;

use super::{
    state::{AuthConfig, AuthState},
    utils::{expires_after, generate_session_token, hash_session_token},
};
use crate::store::{DynStore, SessionRecord};

pub(crate) const SESSION_COOKIE_NAME: &str = "truefeedback_session";

const SESSION_INSERT_ATTEMPTS: usize = 3;

#[utoipa::path(
    post,
    path = "/api/sign-out",
    responses(
        (status = 204, description = "Session cleared")
    ),
    tag = "auth"
)]
#[instrument(skip(headers, store, auth_state))]
pub async fn sign_out(
    headers: HeaderMap,
    store: Extension<DynStore>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    if let Some(token) = extract_session_token(&headers) {
        let token_hash = hash_session_token(&token);
        if let Err(err) = store.delete_session(&token_hash).await {
            error!("Failed to delete session: {err}");
        }
    }

    // Cleared even when no session record was found.
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_session_cookie(auth_state.config()) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    (StatusCode::NO_CONTENT, response_headers).into_response()
}

/// Resolve the request's session token into a session record.
///
/// Returns `Ok(None)` when the token is missing, unknown or expired.
pub(crate) async fn authenticate_session(
    headers: &HeaderMap,
    store: &DynStore,
) -> Result<Option<SessionRecord>, StatusCode> {
    let Some(token) = extract_session_token(headers) else {
        return Ok(None);
    };
    let token_hash = hash_session_token(&token);
    store.lookup_session(&token_hash).await.map_err(|err| {
        error!("Failed to lookup session: {err}");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

/// Persist a fresh session for `user_id` and return the raw token.
pub(crate) async fn create_session(
    store: &DynStore,
    config: &AuthConfig,
    user_id: Uuid,
) -> anyhow::Result<String> {
    let expires_at = expires_after(Utc::now(), config.session_ttl_seconds())?;
    for _ in 0..SESSION_INSERT_ATTEMPTS {
        let token = generate_session_token()?;
        let token_hash = hash_session_token(&token);
        if store.insert_session(user_id, &token_hash, expires_at).await? {
            return Ok(token);
        }
    }
    Err(anyhow::anyhow!(
        "session token collided {SESSION_INSERT_ATTEMPTS} times"
    ))
}

/// Build the `HttpOnly` cookie carrying the session token.
pub(crate) fn session_cookie(
    config: &AuthConfig,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = config.session_ttl_seconds();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    );
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn clear_session_cookie(config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Bearer header wins over the cookie when both are present.
pub(crate) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_bearer_token(headers) {
        return Some(token);
    }
    let value = headers.get(COOKIE)?.to_str().ok()?;
    value.split(';').find_map(|pair| {
        let (key, val) = pair.trim().split_once('=')?;
        (key.trim() == SESSION_COOKIE_NAME && !val.trim().is_empty())
            .then(|| val.trim().to_string())
    })
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
