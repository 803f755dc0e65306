//! In-memory store used for local development and tests.

use super::{Message, NewUser, Page, SessionRecord, Store, UserRecord, WriteOutcome};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
struct State {
    users: HashMap<Uuid, UserRecord>,
    sessions: HashMap<Vec<u8>, StoredSession>,
    messages: Vec<Message>,
}

#[derive(Debug, Clone)]
struct StoredSession {
    user_id: Uuid,
    expires_at: DateTime<Utc>,
}

impl State {
    fn username_in_use(&self, username: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|user| user.username == username && Some(user.id) != except)
    }

    fn email_in_use(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|user| user.email == email && Some(user.id) != except)
    }
}

/// Store backed by a `RwLock`-guarded map. Data is lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a message with an explicit timestamp, used to seed fixtures.
    pub async fn insert_message_at(
        &self,
        user_id: Uuid,
        content: &str,
        created_at: DateTime<Utc>,
    ) -> Message {
        let message = Message {
            id: Uuid::now_v7(),
            user_id,
            content: content.to_string(),
            created_at,
        };
        self.state.write().await.messages.push(message.clone());
        message
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|user| user.email == email).cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<WriteOutcome> {
        let mut state = self.state.write().await;
        if state.username_in_use(&user.username, None) || state.email_in_use(&user.email, None) {
            return Ok(WriteOutcome::Conflict);
        }
        let id = Uuid::new_v4();
        state.users.insert(
            id,
            UserRecord {
                id,
                username: user.username,
                email: user.email,
                password_hash: user.password_hash,
                verify_code: user.verify_code,
                verify_code_expires_at: user.verify_code_expires_at,
                is_verified: false,
                is_accepting_messages: true,
                created_at: Utc::now(),
            },
        );
        Ok(WriteOutcome::Done)
    }

    async fn refresh_unverified_user(&self, user_id: Uuid, user: NewUser) -> Result<WriteOutcome> {
        let mut state = self.state.write().await;
        if state.username_in_use(&user.username, Some(user_id))
            || state.email_in_use(&user.email, Some(user_id))
        {
            return Ok(WriteOutcome::Conflict);
        }
        if let Some(record) = state
            .users
            .get_mut(&user_id)
            .filter(|record| !record.is_verified)
        {
            record.username = user.username;
            record.email = user.email;
            record.password_hash = user.password_hash;
            record.verify_code = user.verify_code;
            record.verify_code_expires_at = user.verify_code_expires_at;
        }
        Ok(WriteOutcome::Done)
    }

    async fn delete_unverified_user(&self, user_id: Uuid) -> Result<()> {
        let mut state = self.state.write().await;
        if state
            .users
            .get(&user_id)
            .is_some_and(|record| !record.is_verified)
        {
            state.users.remove(&user_id);
            state.sessions.retain(|_, session| session.user_id != user_id);
        }
        Ok(())
    }

    async fn mark_verified(&self, user_id: Uuid) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(record) = state.users.get_mut(&user_id) {
            record.is_verified = true;
        }
        Ok(())
    }

    async fn set_accepting_messages(&self, user_id: Uuid, accepting: bool) -> Result<bool> {
        let mut state = self.state.write().await;
        Ok(state.users.get_mut(&user_id).is_some_and(|record| {
            record.is_accepting_messages = accepting;
            true
        }))
    }

    async fn insert_session(
        &self,
        user_id: Uuid,
        token_hash: &[u8],
        expires_at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        let now = Utc::now();
        state.sessions.retain(|_, session| session.expires_at > now);
        if state.sessions.contains_key(token_hash) {
            return Ok(false);
        }
        state.sessions.insert(
            token_hash.to_vec(),
            StoredSession {
                user_id,
                expires_at,
            },
        );
        Ok(true)
    }

    async fn lookup_session(&self, token_hash: &[u8]) -> Result<Option<SessionRecord>> {
        let state = self.state.read().await;
        let now = Utc::now();
        Ok(state
            .sessions
            .get(token_hash)
            .filter(|session| session.expires_at > now)
            .and_then(|session| state.users.get(&session.user_id))
            .filter(|user| user.is_verified)
            .map(|user| SessionRecord {
                user_id: user.id,
                username: user.username.clone(),
            }))
    }

    async fn delete_session(&self, token_hash: &[u8]) -> Result<()> {
        self.state.write().await.sessions.remove(token_hash);
        Ok(())
    }

    async fn insert_message(&self, user_id: Uuid, content: &str) -> Result<Message> {
        Ok(self.insert_message_at(user_id, content, Utc::now()).await)
    }

    async fn list_messages(&self, user_id: Uuid, page: Page) -> Result<Vec<Message>> {
        let state = self.state.read().await;
        let mut owned: Vec<&Message> = state
            .messages
            .iter()
            .filter(|message| message.user_id == user_id)
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);
        Ok(owned
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }
}
