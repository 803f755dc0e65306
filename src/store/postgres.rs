//! Postgres store on top of `sqlx::PgPool`. Schema lives in `sql/schema.sql`.

use super::{Message, NewUser, Page, SessionRecord, Store, UserRecord, WriteOutcome};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Connection, PgPool, Row, postgres::PgRow};
use tracing::{Instrument, Span, info_span};
use uuid::Uuid;

const USER_COLUMNS: &str = "id, username, email, password_hash, verify_code, \
     verify_code_expires_at, is_verified, is_accepting_messages, created_at";

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn query_span(operation: &str, statement: &str) -> Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

pub(super) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn user_from_row(row: &PgRow) -> UserRecord {
    UserRecord {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        verify_code: row.get("verify_code"),
        verify_code_expires_at: row.get("verify_code_expires_at"),
        is_verified: row.get("is_verified"),
        is_accepting_messages: row.get("is_accepting_messages"),
        created_at: row.get("created_at"),
    }
}

fn message_from_row(row: &PgRow) -> Message {
    Message {
        id: row.get("id"),
        user_id: row.get("user_id"),
        content: row.get("content"),
        created_at: row.get("created_at"),
    }
}

impl PgStore {
    async fn find_user_by(&self, column: &str, value: &str) -> Result<Option<UserRecord>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1");
        let row = sqlx::query(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", &query))
            .await
            .with_context(|| format!("failed to lookup user by {column}"))?;
        Ok(row.as_ref().map(user_from_row))
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<()> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self
            .pool
            .acquire()
            .instrument(acquire_span)
            .await
            .context("failed to acquire database connection")?;
        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping()
            .instrument(ping_span)
            .await
            .context("failed to ping database")
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        self.find_user_by("username", username).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        self.find_user_by("email", email).await
    }

    async fn create_user(&self, user: NewUser) -> Result<WriteOutcome> {
        let query = r"
            INSERT INTO users
                (username, email, password_hash, verify_code, verify_code_expires_at)
            VALUES ($1, $2, $3, $4, $5)
        ";
        let result = sqlx::query(query)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.verify_code)
            .bind(user.verify_code_expires_at)
            .execute(&self.pool)
            .instrument(query_span("INSERT", query))
            .await;

        match result {
            Ok(_) => Ok(WriteOutcome::Done),
            Err(err) if is_unique_violation(&err) => Ok(WriteOutcome::Conflict),
            Err(err) => Err(err).context("failed to insert user"),
        }
    }

    async fn refresh_unverified_user(&self, user_id: Uuid, user: NewUser) -> Result<WriteOutcome> {
        let query = r"
            UPDATE users
            SET username = $2,
                email = $3,
                password_hash = $4,
                verify_code = $5,
                verify_code_expires_at = $6
            WHERE id = $1 AND is_verified = FALSE
        ";
        let result = sqlx::query(query)
            .bind(user_id)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.verify_code)
            .bind(user.verify_code_expires_at)
            .execute(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await;

        match result {
            Ok(_) => Ok(WriteOutcome::Done),
            Err(err) if is_unique_violation(&err) => Ok(WriteOutcome::Conflict),
            Err(err) => Err(err).context("failed to refresh unverified user"),
        }
    }

    async fn delete_unverified_user(&self, user_id: Uuid) -> Result<()> {
        let query = "DELETE FROM users WHERE id = $1 AND is_verified = FALSE";
        sqlx::query(query)
            .bind(user_id)
            .execute(&self.pool)
            .instrument(query_span("DELETE", query))
            .await
            .context("failed to delete unverified user")?;
        Ok(())
    }

    async fn mark_verified(&self, user_id: Uuid) -> Result<()> {
        let query = "UPDATE users SET is_verified = TRUE WHERE id = $1";
        sqlx::query(query)
            .bind(user_id)
            .execute(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to mark user verified")?;
        Ok(())
    }

    async fn set_accepting_messages(&self, user_id: Uuid, accepting: bool) -> Result<bool> {
        let query = "UPDATE users SET is_accepting_messages = $2 WHERE id = $1";
        let result = sqlx::query(query)
            .bind(user_id)
            .bind(accepting)
            .execute(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to update accept-messages flag")?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_session(
        &self,
        user_id: Uuid,
        token_hash: &[u8],
        expires_at: DateTime<Utc>,
    ) -> Result<bool> {
        let purge = "DELETE FROM user_sessions WHERE expires_at <= NOW()";
        sqlx::query(purge)
            .execute(&self.pool)
            .instrument(query_span("DELETE", purge))
            .await
            .context("failed to purge expired sessions")?;

        let query = r"
            INSERT INTO user_sessions (session_hash, user_id, expires_at)
            VALUES ($1, $2, $3)
        ";
        let result = sqlx::query(query)
            .bind(token_hash)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .instrument(query_span("INSERT", query))
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err) if is_unique_violation(&err) => Ok(false),
            Err(err) => Err(err).context("failed to insert session"),
        }
    }

    async fn lookup_session(&self, token_hash: &[u8]) -> Result<Option<SessionRecord>> {
        // Only unexpired sessions of verified users count.
        let query = r"
            SELECT users.id, users.username
            FROM user_sessions
            JOIN users ON users.id = user_sessions.user_id
            WHERE user_sessions.session_hash = $1
              AND user_sessions.expires_at > NOW()
              AND users.is_verified = TRUE
            LIMIT 1
        ";
        let row = sqlx::query(query)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to lookup session")?;

        Ok(row.map(|row| SessionRecord {
            user_id: row.get("id"),
            username: row.get("username"),
        }))
    }

    async fn delete_session(&self, token_hash: &[u8]) -> Result<()> {
        let query = "DELETE FROM user_sessions WHERE session_hash = $1";
        sqlx::query(query)
            .bind(token_hash)
            .execute(&self.pool)
            .instrument(query_span("DELETE", query))
            .await
            .context("failed to delete session")?;
        Ok(())
    }

    async fn insert_message(&self, user_id: Uuid, content: &str) -> Result<Message> {
        let query = r"
            INSERT INTO messages (id, user_id, content)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, content, created_at
        ";
        let row = sqlx::query(query)
            .bind(Uuid::now_v7())
            .bind(user_id)
            .bind(content)
            .fetch_one(&self.pool)
            .instrument(query_span("INSERT", query))
            .await
            .context("failed to insert message")?;
        Ok(message_from_row(&row))
    }

    async fn list_messages(&self, user_id: Uuid, page: Page) -> Result<Vec<Message>> {
        let query = r"
            SELECT id, user_id, content, created_at
            FROM messages
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
        ";
        let rows = sqlx::query(query)
            .bind(user_id)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to list messages")?;
        Ok(rows.iter().map(message_from_row).collect())
    }
}
