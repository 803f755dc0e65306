//! Auth handlers and supporting modules.
//!
//! Accounts are created unverified with a six-digit code that expires after the
//! configured TTL. Sign-in is refused until the code has been confirmed.
//!
//! ## Sessions
//!
//! A successful sign-in stores the SHA-256 hash of a random 32-byte token and
//! returns the raw token in an `HttpOnly` cookie. Handlers that need a user call
//! [`principal::require_auth`], which accepts the cookie or a bearer header.

mod code_sender;
pub(crate) mod principal;
pub(crate) mod session;
pub(crate) mod sign_in;
pub(crate) mod sign_up;
mod state;
pub mod types;
pub(crate) mod username;
pub(crate) mod utils;
pub(crate) mod verification;

pub use code_sender::{CodeSender, LogCodeSender, VerificationCode};
pub use state::{AuthConfig, AuthState};
