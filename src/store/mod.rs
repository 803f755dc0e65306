//! Persistence for users, sessions and messages.
//!
//! Handlers talk to an `Arc<dyn Store>` so the same routes run against Postgres in
//! production and the in-memory backend in development and tests.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// Fixed number of messages returned per feedback page.
pub const PAGE_SIZE: u32 = 9;

pub type DynStore = Arc<dyn Store>;

/// Stored account row.
#[derive(Clone, Debug)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub verify_code: String,
    pub verify_code_expires_at: DateTime<Utc>,
    pub is_verified: bool,
    pub is_accepting_messages: bool,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    /// An unverified account whose code has expired no longer reserves its username.
    #[must_use]
    pub fn reserves_username(&self, now: DateTime<Utc>) -> bool {
        self.is_verified || self.verify_code_expires_at > now
    }
}

/// Fields written when an account is created or an unverified one is refreshed.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub verify_code: String,
    pub verify_code_expires_at: DateTime<Utc>,
}

/// Result of a write that may collide with a unique username or email.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    Done,
    Conflict,
}

/// Minimal data returned for a valid session token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionRecord {
    pub user_id: Uuid,
    pub username: String,
}

/// A feedback message as returned to its owner.
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// One-based page of feedback messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page(u32);

impl Page {
    pub const FIRST: Self = Self(1);

    /// Build a page, treating zero as the first page.
    #[must_use]
    pub const fn new(number: u32) -> Self {
        if number == 0 { Self::FIRST } else { Self(number) }
    }

    #[must_use]
    pub const fn number(self) -> u32 {
        self.0
    }

    #[must_use]
    pub fn offset(self) -> i64 {
        i64::from(self.0 - 1) * i64::from(PAGE_SIZE)
    }

    #[must_use]
    pub fn limit(self) -> i64 {
        i64::from(PAGE_SIZE)
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<()>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<UserRecord>>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>>;

    /// Insert a new unverified account.
    async fn create_user(&self, user: NewUser) -> Result<WriteOutcome>;

    /// Replace the credentials and code of an account that has not been verified yet.
    async fn refresh_unverified_user(&self, user_id: Uuid, user: NewUser) -> Result<WriteOutcome>;

    /// Remove an unverified account. Verified accounts are never deleted.
    async fn delete_unverified_user(&self, user_id: Uuid) -> Result<()>;

    async fn mark_verified(&self, user_id: Uuid) -> Result<()>;

    /// Returns `false` when the user does not exist.
    async fn set_accepting_messages(&self, user_id: Uuid, accepting: bool) -> Result<bool>;

    /// Returns `false` if the token hash already exists.
    async fn insert_session(
        &self,
        user_id: Uuid,
        token_hash: &[u8],
        expires_at: DateTime<Utc>,
    ) -> Result<bool>;

    /// Resolve an unexpired session belonging to a verified user.
    async fn lookup_session(&self, token_hash: &[u8]) -> Result<Option<SessionRecord>>;

    async fn delete_session(&self, token_hash: &[u8]) -> Result<()>;

    async fn insert_message(&self, user_id: Uuid, content: &str) -> Result<Message>;

    /// Messages owned by `user_id`, newest first, ties broken by id descending.
    async fn list_messages(&self, user_id: Uuid, page: Page) -> Result<Vec<Message>>;
}
