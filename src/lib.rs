//! # TrueFeedback (anonymous feedback messages)
//!
//! `truefeedback` lets people sign up, share a public profile link, and read the
//! anonymous messages others send them.
//!
//! ## Layout
//!
//! - [`api`]: the axum HTTP API (sign-up, username availability, sign-in, code
//!   verification, message submission and the paginated feedback listing).
//! - [`store`]: persistence behind the [`store::Store`] trait, with a Postgres
//!   backend and an in-memory backend for development and tests.
//! - [`client`]: form controllers for the sign-in and sign-up screens plus the
//!   HTTP helpers they use. They own state and side effects; rendering is left to
//!   whatever UI embeds them.
//! - [`cli`]: argument parsing, telemetry and the server action.
//!
//! ## Sessions
//!
//! Sign-in issues a random token carried by the `truefeedback_session` cookie (or a
//! bearer header). Only the SHA-256 hash is stored, so a database dump cannot be
//! replayed as a session.
//!
//! ## Tenancy
//!
//! Messages are owned by exactly one user. Every read is filtered by the
//! authenticated user id; there is no endpoint that lists another user's messages.

pub mod api;
pub mod cli;
pub mod client;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
