//! Password sign-in.
//!
//! The identifier is treated as an email when it contains `@`, otherwise as a
//! username. Unknown accounts and wrong passwords share the same 401 body.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::{error, instrument};

use super::{
    session::{create_session, session_cookie},
    state::AuthState,
    types::{SignInRequest, SignInResponse, SignedInUser},
    utils::{normalize_email, verify_password},
};
use crate::{
    api::handlers::{ApiResponse, fail},
    store::{DynStore, UserRecord},
};

#[utoipa::path(
    post,
    path = "/api/sign-in",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in, session cookie set", body = SignInResponse),
        (status = 400, description = "Validation error", body = ApiResponse),
        (status = 401, description = "Invalid credentials", body = ApiResponse),
        (status = 403, description = "Account not verified", body = ApiResponse),
        (status = 500, description = "Sign-in failed", body = ApiResponse)
    ),
    tag = "auth"
)]
#[instrument(skip(store, auth_state, payload))]
pub async fn sign_in(
    store: Extension<DynStore>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<SignInRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return fail(StatusCode::BAD_REQUEST, "Missing payload");
    };
    let identifier = request.username.trim();
    if identifier.is_empty() || request.password.trim().is_empty() {
        return fail(
            StatusCode::BAD_REQUEST,
            "Username and password are required",
        );
    }

    let user = match find_user(&store, identifier).await {
        Ok(Some(user)) => user,
        Ok(None) => return fail(StatusCode::UNAUTHORIZED, "Invalid credentials"),
        Err(err) => {
            error!("Sign-in lookup failed: {err:#}");
            return fail(StatusCode::INTERNAL_SERVER_ERROR, "Error signing in");
        }
    };

    if !verify_password(&request.password, &user.password_hash) {
        return fail(StatusCode::UNAUTHORIZED, "Invalid credentials");
    }
    if !user.is_verified {
        return fail(
            StatusCode::FORBIDDEN,
            "Please verify your account before login",
        );
    }

    let token = match create_session(&store, auth_state.config(), user.id).await {
        Ok(token) => token,
        Err(err) => {
            error!("Failed to create session: {err:#}");
            return fail(StatusCode::INTERNAL_SERVER_ERROR, "Error signing in");
        }
    };
    let cookie = match session_cookie(auth_state.config(), &token) {
        Ok(cookie) => cookie,
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            return fail(StatusCode::INTERNAL_SERVER_ERROR, "Error signing in");
        }
    };

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, cookie);
    let body = SignInResponse {
        success: true,
        message: "Signed in successfully".to_string(),
        user: SignedInUser {
            id: user.id.to_string(),
            username: user.username,
        },
    };
    (StatusCode::OK, headers, Json(body)).into_response()
}

async fn find_user(store: &DynStore, identifier: &str) -> anyhow::Result<Option<UserRecord>> {
    if identifier.contains('@') {
        store.find_user_by_email(&normalize_email(identifier)).await
    } else {
        store.find_user_by_username(identifier).await
    }
}

#[cfg(test)]
mod tests {
    use crate::api::{handlers::auth::AuthConfig, test_support::TestApp};
    use anyhow::{Context, Result};
    use axum::http::{Method, StatusCode, header::SET_COOKIE};
    use serde_json::json;

    #[tokio::test]
    async fn sign_in_sets_session_cookie() -> Result<()> {
        let app = TestApp::new()?;
        let user = app
            .verified_user("alice", "alice@example.com", "secret1")
            .await?;
        let response = app
            .call(
                Method::POST,
                "/api/sign-in",
                Some(json!({ "username": "alice", "password": "secret1" })),
                None,
            )
            .await?;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["user"]["id"], user.id.to_string());
        let cookie = response
            .headers
            .get(SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .context("missing cookie")?;
        assert!(cookie.starts_with("truefeedback_session="));
        assert!(cookie.contains("HttpOnly"));
        Ok(())
    }

    #[tokio::test]
    async fn https_frontend_marks_cookie_secure() -> Result<()> {
        let app = TestApp::with_config(AuthConfig::new("https://truefeedback.dev".to_string()))?;
        app.verified_user("alice", "alice@example.com", "secret1")
            .await?;
        let response = app
            .call(
                Method::POST,
                "/api/sign-in",
                Some(json!({ "username": "alice", "password": "secret1" })),
                None,
            )
            .await?;
        let cookie = response
            .headers
            .get(SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .context("missing cookie")?;
        assert!(cookie.ends_with("; Secure"));
        Ok(())
    }

    #[tokio::test]
    async fn unrepresentable_session_ttl_returns_error_body() -> Result<()> {
        let app = TestApp::with_config(
            AuthConfig::new("http://localhost:3000".to_string())
                .with_session_ttl_seconds(i64::MAX),
        )?;
        app.verified_user("alice", "alice@example.com", "secret1")
            .await?;
        let response = app
            .call(
                Method::POST,
                "/api/sign-in",
                Some(json!({ "username": "alice", "password": "secret1" })),
                None,
            )
            .await?;
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.body["success"], false);
        assert_eq!(response.body["message"], "Error signing in");
        assert!(response.headers.get(SET_COOKIE).is_none());
        Ok(())
    }

    #[tokio::test]
    async fn sign_in_accepts_email_identifier() -> Result<()> {
        let app = TestApp::new()?;
        app.verified_user("alice", "alice@example.com", "secret1")
            .await?;
        let response = app
            .call(
                Method::POST,
                "/api/sign-in",
                Some(json!({ "username": "ALICE@example.com", "password": "secret1" })),
                None,
            )
            .await?;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["user"]["username"], "alice");
        Ok(())
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_look_the_same() -> Result<()> {
        let app = TestApp::new()?;
        app.verified_user("alice", "alice@example.com", "secret1")
            .await?;
        let wrong = app
            .call(
                Method::POST,
                "/api/sign-in",
                Some(json!({ "username": "alice", "password": "wrong-pass" })),
                None,
            )
            .await?;
        let unknown = app
            .call(
                Method::POST,
                "/api/sign-in",
                Some(json!({ "username": "nobody", "password": "secret1" })),
                None,
            )
            .await?;
        assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
        assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong.body, unknown.body);
        assert!(wrong.headers.get(SET_COOKIE).is_none());
        Ok(())
    }

    #[tokio::test]
    async fn unverified_account_is_forbidden() -> Result<()> {
        let app = TestApp::new()?;
        app.call(
            Method::POST,
            "/api/sign-up",
            Some(json!({ "username": "alice", "email": "alice@example.com", "password": "secret1" })),
            None,
        )
        .await?;
        let response = app
            .call(
                Method::POST,
                "/api/sign-in",
                Some(json!({ "username": "alice", "password": "secret1" })),
                None,
            )
            .await?;
        assert_eq!(response.status, StatusCode::FORBIDDEN);
        assert_eq!(response.body["success"], false);
        Ok(())
    }

    #[tokio::test]
    async fn blank_fields_are_rejected() -> Result<()> {
        let app = TestApp::new()?;
        let response = app
            .call(
                Method::POST,
                "/api/sign-in",
                Some(json!({ "username": "  ", "password": "secret1" })),
                None,
            )
            .await?;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn sign_out_clears_cookie_and_session() -> Result<()> {
        let app = TestApp::new()?;
        app.verified_user("alice", "alice@example.com", "secret1")
            .await?;
        let token = app.session_token("alice", "secret1").await?;

        let response = app
            .call(Method::POST, "/api/sign-out", None, Some(&token))
            .await?;
        assert_eq!(response.status, StatusCode::NO_CONTENT);
        let cookie = response
            .headers
            .get(SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .context("missing cookie")?;
        assert!(cookie.contains("Max-Age=0"));

        let after = app
            .call(Method::GET, "/api/accept-messages", None, Some(&token))
            .await?;
        assert_eq!(after.status, StatusCode::UNAUTHORIZED);
        Ok(())
    }
}
