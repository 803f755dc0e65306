//! Sign-in form controller.
//!
//! Failures never reveal whether the account exists: every error becomes the
//! same "Invalid Credentials" toast and the detail only goes to the log.

use super::{
    ApiClient, AppError, Navigator, Notifier,
    validation::{FieldError, sign_in_errors},
};
use crate::api::handlers::auth::types::{SignInRequest, SignedInUser};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{instrument, warn};

pub const DASHBOARD_PATH: &str = "/dashboard";
pub const INVALID_CREDENTIALS: &str = "Invalid Credentials";

/// Remote half of sign-in.
#[async_trait]
pub trait SignInAction: Send + Sync {
    async fn sign_in(
        &self,
        identifier: &str,
        password: &SecretString,
    ) -> Result<SignedInUser, AppError>;
}

#[async_trait]
impl SignInAction for ApiClient {
    async fn sign_in(
        &self,
        identifier: &str,
        password: &SecretString,
    ) -> Result<SignedInUser, AppError> {
        let request = SignInRequest {
            username: identifier.to_string(),
            password: password.expose_secret().to_string(),
        };
        ApiClient::sign_in(self, &request)
            .await
            .map(|response| response.user)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum SignInOutcome {
    /// Client-side validation failed; nothing was sent.
    Invalid(Vec<FieldError>),
    SignedIn(SignedInUser),
    Rejected,
    /// A submission was already in flight.
    Ignored,
}

struct FormState {
    identifier: String,
    password: SecretString,
    is_submitting: bool,
}

pub struct SignInForm {
    action: Arc<dyn SignInAction>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    state: Mutex<FormState>,
}

impl SignInForm {
    #[must_use]
    pub fn new(
        action: Arc<dyn SignInAction>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            action,
            navigator,
            notifier,
            state: Mutex::new(FormState {
                identifier: String::new(),
                password: SecretString::from(String::new()),
                is_submitting: false,
            }),
        }
    }

    /// Username or email.
    pub fn set_identifier(&self, value: &str) {
        self.lock().identifier = value.to_string();
    }

    pub fn set_password(&self, value: &str) {
        self.lock().password = SecretString::from(value.to_string());
    }

    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.lock().is_submitting
    }

    #[instrument(skip(self))]
    pub async fn submit(&self) -> SignInOutcome {
        let (identifier, password) = {
            let mut state = self.lock();
            if state.is_submitting {
                return SignInOutcome::Ignored;
            }
            let errors = sign_in_errors(&state.identifier, state.password.expose_secret());
            if !errors.is_empty() {
                return SignInOutcome::Invalid(errors);
            }
            state.is_submitting = true;
            (state.identifier.trim().to_string(), state.password.clone())
        };

        let result = self.action.sign_in(&identifier, &password).await;
        self.lock().is_submitting = false;

        match result {
            Ok(user) => {
                self.navigator.replace(DASHBOARD_PATH);
                SignInOutcome::SignedIn(user)
            }
            Err(err) => {
                warn!(error = %err, "sign-in failed");
                self.notifier.error(INVALID_CREDENTIALS);
                SignInOutcome::Rejected
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, FormState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
