//! Small helpers for auth validation, password hashing and session tokens.

use anyhow::{Context, Result, anyhow};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use base64::Engine;
use chrono::{DateTime, TimeDelta, Utc};
use rand::{Rng, RngCore, rngs::OsRng};
use regex::Regex;
use sha2::{Digest, Sha256};

pub(crate) const USERNAME_MIN_LEN: usize = 2;
pub(crate) const USERNAME_MAX_LEN: usize = 20;
pub(crate) const PASSWORD_MIN_LEN: usize = 6;
pub(crate) const MESSAGE_MIN_LEN: usize = 10;
pub(crate) const MESSAGE_MAX_LEN: usize = 300;

/// Normalize an email for lookup/uniqueness checks.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(crate) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

/// Describe why a username is rejected, or `None` when it is acceptable.
pub(crate) fn username_problem(username: &str) -> Option<&'static str> {
    let length = username.chars().count();
    if length < USERNAME_MIN_LEN {
        return Some("Username must be at least 2 characters");
    }
    if length > USERNAME_MAX_LEN {
        return Some("Username must be no more than 20 characters");
    }
    if !Regex::new(r"^[a-zA-Z0-9_]+$").is_ok_and(|regex| regex.is_match(username)) {
        return Some("Username must not contain special characters");
    }
    None
}

pub(crate) fn valid_password(password: &str) -> bool {
    password.chars().count() >= PASSWORD_MIN_LEN
}

pub(crate) fn valid_verify_code(code: &str) -> bool {
    code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit())
}

/// Message content bounds apply to the trimmed text.
pub(crate) fn valid_message_content(content: &str) -> bool {
    let length = content.trim().chars().count();
    (MESSAGE_MIN_LEN..=MESSAGE_MAX_LEN).contains(&length)
}

/// `now + ttl_seconds`, or an error when the TTL does not fit a timestamp.
pub(crate) fn expires_after(now: DateTime<Utc>, ttl_seconds: i64) -> Result<DateTime<Utc>> {
    TimeDelta::try_seconds(ttl_seconds)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| anyhow!("TTL of {ttl_seconds}s is out of range"))
}

/// Six random digits, zero padding impossible since the range starts at 100000.
pub(crate) fn generate_verify_code() -> String {
    OsRng.gen_range(100_000..1_000_000).to_string()
}

/// Create a new session token for the auth cookie.
/// The raw value is only returned to set the cookie; the database stores a hash.
pub(crate) fn generate_session_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session token")?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// Hash a session token so raw values never touch the database.
pub(crate) fn hash_session_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

/// Argon2id PHC string for storage.
pub(crate) fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| anyhow!("failed to hash password: {err}"))
}

/// Unparseable stored hashes verify as false.
pub(crate) fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email(" Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn valid_email_rejects_missing_parts() {
        assert!(valid_email("a@example.com"));
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("missing-domain@"));
    }

    #[test]
    fn username_rules() {
        assert_eq!(username_problem("al"), None);
        assert_eq!(username_problem("alice_01"), None);
        assert!(username_problem("a").is_some());
        assert!(username_problem(&"a".repeat(21)).is_some());
        assert!(username_problem("alice!").is_some());
        assert!(username_problem("ali ce").is_some());
    }

    #[test]
    fn password_and_code_rules() {
        assert!(valid_password("secret"));
        assert!(!valid_password("short"));
        assert!(valid_verify_code("012345"));
        assert!(!valid_verify_code("12345"));
        assert!(!valid_verify_code("12345a"));
    }

    #[test]
    fn message_content_bounds_use_trimmed_length() {
        assert!(valid_message_content("ten chars!"));
        assert!(!valid_message_content("   short   "));
        assert!(valid_message_content(&"x".repeat(300)));
        assert!(!valid_message_content(&"x".repeat(301)));
    }

    #[test]
    fn expires_after_rejects_out_of_range_ttl() -> Result<()> {
        let now = Utc::now();
        assert_eq!(expires_after(now, 60)?, now + TimeDelta::seconds(60));
        assert!(expires_after(now, 9_000_000_000_000_000).is_err());
        assert!(expires_after(now, i64::MAX).is_err());
        Ok(())
    }

    #[test]
    fn generate_verify_code_is_six_digits() {
        for _ in 0..32 {
            assert!(valid_verify_code(&generate_verify_code()));
        }
    }

    #[test]
    fn generate_session_token_is_32_bytes() {
        let decoded_len = generate_session_token()
            .ok()
            .and_then(|token| URL_SAFE_NO_PAD.decode(token.as_bytes()).ok())
            .map(|bytes| bytes.len());
        assert_eq!(decoded_len, Some(32));
    }

    #[test]
    fn hash_session_token_stable() {
        assert_eq!(hash_session_token("token"), hash_session_token("token"));
        assert_ne!(hash_session_token("token"), hash_session_token("other"));
    }

    #[test]
    fn password_hash_verifies_only_the_original() -> Result<()> {
        let hash = hash_password("correct horse")?;
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("correct horse", "not-a-phc-string"));
        Ok(())
    }
}
