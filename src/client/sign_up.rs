//! Sign-up form controller with a debounced username availability check.
//!
//! Every availability check takes a ticket from a monotonically increasing
//! counter. A response is applied only if its ticket is still the latest one
//! issued, so a slow answer for an old username can never overwrite a newer one.

use super::{
    ApiClient, AppError, Navigator, Notifier,
    validation::{FieldError, sign_up_errors},
};
use crate::api::handlers::{ApiResponse, auth::types::SignUpRequest};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::{
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use tracing::{debug, instrument, warn};

pub const USERNAME_DEBOUNCE: Duration = Duration::from_millis(350);
pub const ACCOUNT_CREATED: &str = "Account Created. Please verify your email address.";
pub const ACCOUNT_EXISTS: &str = "Account Already Exists.";
pub const SIGN_UP_FAILED: &str = "Problem creating new account. Please Try Again Later.";

/// Remote calls made by the sign-up screen.
#[async_trait]
pub trait SignUpApi: Send + Sync {
    async fn check_username(&self, username: &str) -> Result<ApiResponse, AppError>;
    async fn sign_up(&self, request: &SignUpRequest) -> Result<ApiResponse, AppError>;
}

#[async_trait]
impl SignUpApi for ApiClient {
    async fn check_username(&self, username: &str) -> Result<ApiResponse, AppError> {
        ApiClient::check_username(self, username).await
    }

    async fn sign_up(&self, request: &SignUpRequest) -> Result<ApiResponse, AppError> {
        ApiClient::sign_up(self, request).await
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UsernameStatus {
    #[default]
    Idle,
    Checking,
    Available,
    Taken,
}

impl UsernameStatus {
    /// 200 with `success:true` is available, 400 is taken, anything else is unknown.
    #[must_use]
    pub fn from_check(result: &Result<ApiResponse, AppError>) -> Self {
        match result {
            Ok(response) if response.success => Self::Available,
            Err(AppError::Http { status: 400, .. }) => Self::Taken,
            _ => Self::Idle,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum SignUpOutcome {
    Invalid(Vec<FieldError>),
    Created,
    AlreadyExists,
    Failed,
    Ignored,
}

/// Waits out bursts of input: only the last call within the delay returns `true`.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    generation: AtomicU64,
}

impl Debouncer {
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: AtomicU64::new(0),
        }
    }

    pub async fn settle(&self) -> bool {
        let mine = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;
        self.generation.load(Ordering::SeqCst) == mine
    }
}

#[derive(Default)]
struct FormState {
    username: String,
    email: String,
    password: Option<SecretString>,
    confirm_password: Option<SecretString>,
    show_password: bool,
    show_confirm_password: bool,
    username_status: UsernameStatus,
    latest_check: u64,
    is_submitting: bool,
}

pub struct SignUpForm {
    api: Arc<dyn SignUpApi>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    debouncer: Debouncer,
    state: Mutex<FormState>,
}

impl SignUpForm {
    #[must_use]
    pub fn new(
        api: Arc<dyn SignUpApi>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            api,
            navigator,
            notifier,
            debouncer: Debouncer::new(USERNAME_DEBOUNCE),
            state: Mutex::new(FormState::default()),
        }
    }

    /// Record the new username and check it once typing has paused.
    pub async fn on_username_input(&self, value: &str) {
        self.set_username(value);
        if self.debouncer.settle().await {
            self.check_username().await;
        }
    }

    /// Check the current username now. Empty usernames leave the status unchanged.
    #[instrument(skip(self))]
    pub async fn check_username(&self) {
        let (ticket, username) = {
            let mut state = self.lock();
            let username = state.username.trim().to_string();
            if username.is_empty() {
                return;
            }
            state.latest_check += 1;
            state.username_status = UsernameStatus::Checking;
            (state.latest_check, username)
        };

        let result = self.api.check_username(&username).await;
        if let Err(err) = &result {
            debug!(error = %err, "username check did not succeed");
        }
        if !self.apply_check(ticket, UsernameStatus::from_check(&result)) {
            debug!(%username, ticket, "discarding stale username check");
        }
    }

    /// Returns `false` when a newer check has been issued since `ticket`.
    fn apply_check(&self, ticket: u64, status: UsernameStatus) -> bool {
        let mut state = self.lock();
        if ticket != state.latest_check {
            return false;
        }
        state.username_status = status;
        true
    }

    pub fn set_username(&self, value: &str) {
        self.lock().username = value.to_string();
    }

    pub fn set_email(&self, value: &str) {
        self.lock().email = value.to_string();
    }

    pub fn set_password(&self, value: &str) {
        self.lock().password = Some(SecretString::from(value.to_string()));
    }

    /// Collected for the UI; not compared with the password.
    pub fn set_confirm_password(&self, value: &str) {
        self.lock().confirm_password = Some(SecretString::from(value.to_string()));
    }

    pub fn toggle_password_visibility(&self) {
        let mut state = self.lock();
        state.show_password = !state.show_password;
    }

    pub fn toggle_confirm_password_visibility(&self) {
        let mut state = self.lock();
        state.show_confirm_password = !state.show_confirm_password;
    }

    #[must_use]
    pub fn password_visible(&self) -> (bool, bool) {
        let state = self.lock();
        (state.show_password, state.show_confirm_password)
    }

    #[must_use]
    pub fn username_status(&self) -> UsernameStatus {
        self.lock().username_status
    }

    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.lock().is_submitting
    }

    #[instrument(skip(self))]
    pub async fn submit(&self) -> SignUpOutcome {
        let request = {
            let mut state = self.lock();
            if state.is_submitting {
                return SignUpOutcome::Ignored;
            }
            let password = state
                .password
                .as_ref()
                .map(|secret| secret.expose_secret().to_string())
                .unwrap_or_default();
            let errors = sign_up_errors(&state.username, &state.email, &password);
            if !errors.is_empty() {
                return SignUpOutcome::Invalid(errors);
            }
            state.is_submitting = true;
            SignUpRequest {
                username: state.username.trim().to_string(),
                email: state.email.trim().to_string(),
                password,
            }
        };

        let result = self.api.sign_up(&request).await;
        self.lock().is_submitting = false;

        match result {
            Ok(response) if response.success => {
                self.notifier.success(ACCOUNT_CREATED);
                self.navigator
                    .replace(&format!("/verify-code/{}", request.username));
                SignUpOutcome::Created
            }
            Ok(_) | Err(AppError::Http { status: 409, .. }) => {
                self.notifier.error(ACCOUNT_EXISTS);
                SignUpOutcome::AlreadyExists
            }
            Err(err) => {
                warn!(error = %err, "sign-up failed");
                self.notifier.error(SIGN_UP_FAILED);
                SignUpOutcome::Failed
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, FormState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
