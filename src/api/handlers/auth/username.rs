//! Username availability checks for the sign-up form.

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::{error, instrument};

use super::{types::UsernameQuery, utils::username_problem};
use crate::{
    api::handlers::{ApiResponse, fail, ok},
    store::DynStore,
};

#[utoipa::path(
    get,
    path = "/api/check-username-uniqueness",
    params(UsernameQuery),
    responses(
        (status = 200, description = "Username is available", body = ApiResponse),
        (status = 400, description = "Username is invalid or already taken", body = ApiResponse),
        (status = 500, description = "Lookup failed", body = ApiResponse)
    ),
    tag = "auth"
)]
#[instrument(skip(store))]
pub async fn check_username_uniqueness(
    store: Extension<DynStore>,
    Query(query): Query<UsernameQuery>,
) -> impl IntoResponse {
    let username = query.username.unwrap_or_default();
    let username = username.trim();
    if let Some(problem) = username_problem(username) {
        return fail(StatusCode::BAD_REQUEST, problem);
    }

    match store.find_user_by_username(username).await {
        Ok(Some(user)) if user.reserves_username(Utc::now()) => {
            fail(StatusCode::BAD_REQUEST, "Username is already taken")
        }
        Ok(_) => ok(StatusCode::OK, "Username is unique"),
        Err(err) => {
            error!("Error checking username: {err:#}");
            fail(StatusCode::INTERNAL_SERVER_ERROR, "Error checking username")
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::TestApp;
    use anyhow::Result;
    use axum::http::{Method, StatusCode};

    #[tokio::test]
    async fn free_username_is_unique() -> Result<()> {
        let app = TestApp::new()?;
        let response = app
            .call(Method::GET, "/api/check-username-uniqueness?username=alice", None, None)
            .await?;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["success"], true);
        assert_eq!(response.body["message"], "Username is unique");
        Ok(())
    }

    #[tokio::test]
    async fn taken_username_is_rejected() -> Result<()> {
        let app = TestApp::new()?;
        app.verified_user("alice", "alice@example.com", "secret1")
            .await?;
        let response = app
            .call(Method::GET, "/api/check-username-uniqueness?username=alice", None, None)
            .await?;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.body["success"], false);
        assert_eq!(response.body["message"], "Username is already taken");
        Ok(())
    }

    #[tokio::test]
    async fn malformed_or_missing_username_is_rejected() -> Result<()> {
        let app = TestApp::new()?;
        for uri in [
            "/api/check-username-uniqueness",
            "/api/check-username-uniqueness?username=a",
            "/api/check-username-uniqueness?username=al%21ce",
        ] {
            let response = app.call(Method::GET, uri, None, None).await?;
            assert_eq!(response.status, StatusCode::BAD_REQUEST);
            assert_eq!(response.body["success"], false);
        }
        Ok(())
    }
}
