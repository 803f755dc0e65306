//! Router harness shared by the handler tests.

use crate::{
    api::{
        app,
        handlers::auth::{
            AuthConfig, AuthState, CodeSender, VerificationCode, session::SESSION_COOKIE_NAME,
            utils::hash_password,
        },
    },
    store::{DynStore, MemoryStore, NewUser, Store, UserRecord},
};
use anyhow::{Context, Result, anyhow};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{
        HeaderMap, Method, Request, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE, SET_COOKIE},
    },
};
use chrono::{Duration, Utc};
use serde_json::{Value, json};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};
use tower::ServiceExt;

/// Captures every code handed to it; can be told to fail the next send.
#[derive(Default)]
pub(crate) struct RecordingCodeSender {
    sent: Mutex<Vec<VerificationCode>>,
    fail_next: AtomicBool,
}

impl RecordingCodeSender {
    pub(crate) fn last(&self) -> Option<VerificationCode> {
        self.sent.lock().ok()?.last().cloned()
    }

    pub(crate) fn count(&self) -> usize {
        self.sent.lock().map(|sent| sent.len()).unwrap_or_default()
    }

    pub(crate) fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

impl CodeSender for RecordingCodeSender {
    fn send(&self, message: &VerificationCode) -> Result<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(anyhow!("delivery failed"));
        }
        self.sent
            .lock()
            .map_err(|_| anyhow!("sender lock poisoned"))?
            .push(message.clone());
        Ok(())
    }
}

pub(crate) struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// JSON body, a JSON string for text bodies, or `null` when empty.
    pub body: Value,
}

pub(crate) struct TestApp {
    pub store: Arc<MemoryStore>,
    pub sender: Arc<RecordingCodeSender>,
    router: Router,
}

impl TestApp {
    pub(crate) fn new() -> Result<Self> {
        Self::with_config(AuthConfig::new("http://localhost:3000".to_string()))
    }

    pub(crate) fn with_config(config: AuthConfig) -> Result<Self> {
        let store = Arc::new(MemoryStore::new());
        let sender = Arc::new(RecordingCodeSender::default());
        let dyn_store: DynStore = store.clone();
        let auth_state = Arc::new(AuthState::new(config, sender.clone()));
        Ok(Self {
            router: app(dyn_store, auth_state)?,
            store,
            sender,
        })
    }

    /// Send a request with an optional JSON body and bearer session token.
    pub(crate) async fn call(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Result<TestResponse> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        Ok(TestResponse {
            status,
            headers,
            body,
        })
    }

    /// Insert an already verified account directly into the store.
    pub(crate) async fn verified_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<UserRecord> {
        self.store
            .create_user(NewUser {
                username: username.to_string(),
                email: email.to_string(),
                password_hash: hash_password(password)?,
                verify_code: "000000".to_string(),
                verify_code_expires_at: Utc::now() + Duration::hours(1),
            })
            .await?;
        let user = self
            .store
            .find_user_by_username(username)
            .await?
            .context("created user missing")?;
        self.store.mark_verified(user.id).await?;
        Ok(UserRecord {
            is_verified: true,
            ..user
        })
    }

    /// Sign in through the router and return the raw session token from the cookie.
    pub(crate) async fn session_token(&self, username: &str, password: &str) -> Result<String> {
        let response = self
            .call(
                Method::POST,
                "/api/sign-in",
                Some(json!({ "username": username, "password": password })),
                None,
            )
            .await?;
        let cookie = response
            .headers
            .get(SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .context("sign-in did not set a cookie")?;
        let token = cookie
            .split(';')
            .next()
            .and_then(|pair| pair.strip_prefix(&format!("{SESSION_COOKIE_NAME}=")))
            .context("unexpected cookie format")?;
        Ok(token.to_string())
    }
}
