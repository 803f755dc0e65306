//! Delivery of sign-up verification codes.
//!
//! Sign-up hands each new code to a `CodeSender`. The default `LogCodeSender`
//! writes it to the log so local environments work without a mail provider.

use anyhow::Result;
use tracing::info;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationCode {
    pub username: String,
    pub email: String,
    pub code: String,
}

/// Code delivery abstraction used by the sign-up handler.
pub trait CodeSender: Send + Sync {
    /// Deliver the code or return an error so sign-up reports a failure.
    fn send(&self, message: &VerificationCode) -> Result<()>;
}

/// Local dev sender that logs the code instead of emailing it.
#[derive(Clone, Debug)]
pub struct LogCodeSender;

impl CodeSender for LogCodeSender {
    fn send(&self, message: &VerificationCode) -> Result<()> {
        info!(
            email = %message.email,
            username = %message.username,
            code = %message.code,
            "verification code send stub"
        );
        Ok(())
    }
}
