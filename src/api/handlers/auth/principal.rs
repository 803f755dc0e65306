//! Authenticated principal extraction.

use axum::http::{HeaderMap, StatusCode};

use super::session::authenticate_session;
use crate::store::DynStore;

/// Signed-in user derived from the session token.
#[derive(Clone, Debug)]
pub struct Principal {
    pub user_id: uuid::Uuid,
    pub username: String,
}

/// Resolve the session into a principal, or return 401 for missing sessions.
pub async fn require_auth(headers: &HeaderMap, store: &DynStore) -> Result<Principal, StatusCode> {
    match authenticate_session(headers, store).await {
        Ok(Some(record)) => Ok(Principal {
            user_id: record.user_id,
            username: record.username,
        }),
        Ok(None) => Err(StatusCode::UNAUTHORIZED),
        Err(status) => Err(status),
    }
}
