//! HTTP helpers for the TrueFeedback JSON API with a fixed timeout and
//! consistent error mapping. The client keeps a cookie jar so the session
//! cookie set by sign-in is sent on later calls; it never logs bodies.

use super::errors::AppError;
use crate::{
    APP_USER_AGENT,
    api::handlers::{
        ApiResponse,
        auth::types::{SignInRequest, SignInResponse, SignUpRequest},
        feedbacks::FeedbacksResponse,
    },
};
use reqwest::{Client, Response};
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;

/// Request timeout applied to every call.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Maximum number of error body characters surfaced to the UI.
const MAX_ERROR_CHARS: usize = 200;

#[derive(Clone, Debug)]
pub struct ApiClient {
    base_url: String,
    http: Client,
}

impl ApiClient {
    /// # Errors
    /// Returns `AppError::Config` if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        let http = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(DEFAULT_TIMEOUT)
            .cookie_store(true)
            .build()
            .map_err(|err| AppError::Config(format!("Failed to build HTTP client: {err}")))?;
        Ok(Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            http,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch JSON, sending the session cookie if one was set.
    ///
    /// # Errors
    /// Returns an `AppError` for transport failures, non-2xx statuses or bad JSON.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, AppError> {
        let response = self
            .http
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .map_err(map_request_error)?;
        handle_json_response(response).await
    }

    /// Post a JSON body and parse a JSON response.
    ///
    /// # Errors
    /// Returns an `AppError` for encoding or transport failures, non-2xx statuses or bad JSON.
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, AppError> {
        let payload = serde_json::to_vec(body)
            .map_err(|err| AppError::Serialization(format!("Failed to encode request: {err}")))?;
        let response = self
            .http
            .post(self.url(path))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .map_err(map_request_error)?;
        handle_json_response(response).await
    }

    /// Post without a body and ignore the response body.
    ///
    /// # Errors
    /// Returns an `AppError` for transport failures or non-2xx statuses.
    pub async fn post_empty(&self, path: &str) -> Result<(), AppError> {
        let response = self
            .http
            .post(self.url(path))
            .send()
            .await
            .map_err(map_request_error)?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(http_error(response).await)
        }
    }

    pub async fn sign_in(&self, request: &SignInRequest) -> Result<SignInResponse, AppError> {
        self.post_json("/api/sign-in", request).await
    }

    pub async fn sign_up(&self, request: &SignUpRequest) -> Result<ApiResponse, AppError> {
        self.post_json("/api/sign-up", request).await
    }

    pub async fn check_username(&self, username: &str) -> Result<ApiResponse, AppError> {
        self.get_json("/api/check-username-uniqueness", &[("username", username)])
            .await
    }

    pub async fn get_feedbacks(&self, page: u32) -> Result<FeedbacksResponse, AppError> {
        let page = page.to_string();
        self.get_json("/api/get-feedbacks", &[("page", page.as_str())])
            .await
    }

    pub async fn sign_out(&self) -> Result<(), AppError> {
        self.post_empty("/api/sign-out").await
    }

    fn url(&self, path: &str) -> String {
        let path = path.trim();
        if self.base_url.is_empty() {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }
}

fn map_request_error(err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        AppError::Timeout("Request timed out. Please try again.".to_string())
    } else if err.is_builder() {
        AppError::Config(format!("Invalid request: {err}"))
    } else {
        AppError::Network(format!("Unable to reach the server: {err}"))
    }
}

async fn handle_json_response<T: DeserializeOwned>(response: Response) -> Result<T, AppError> {
    if response.status().is_success() {
        response
            .json::<T>()
            .await
            .map_err(|err| AppError::Parse(format!("Failed to decode response: {err}")))
    } else {
        Err(http_error(response).await)
    }
}

async fn http_error(response: Response) -> AppError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    AppError::Http {
        status,
        message: sanitize_body(&body),
    }
}

/// Trim and truncate an error body for user-facing messages.
fn sanitize_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "Request failed.".to_string()
    } else {
        trimmed.chars().take(MAX_ERROR_CHARS).collect()
    }
}
