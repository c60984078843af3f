//! Login gate for the invoice form. The credential rules are presentational
//! (there is no account backend); the gate's real job is owning the
//! `session` storage entry.

use crate::storage::{Storage, SESSION_KEY};
use crate::types::SessionRecord;
use chrono::Utc;
use std::sync::Arc;

const MIN_USER_NAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 6;
const WEAK_PASSWORDS: [&str; 6] = [
    "password",
    "123456",
    "12345678",
    "qwerty",
    "abc123",
    "password123",
];

#[derive(Clone)]
pub struct SessionGate {
    storage: Arc<Storage>,
}

impl SessionGate {
    pub fn new(storage: Arc<Storage>) -> Self {
        SessionGate { storage }
    }

    pub fn login(
        &self,
        user_name: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<SessionRecord, String> {
        check_credentials(user_name, password)?;
        let record = SessionRecord {
            is_logged_in: true,
            user_name: user_name.to_string(),
            login_time: Utc::now().to_rfc3339(),
            remember_me,
        };
        self.storage.write_json(SESSION_KEY, &record)?;
        Ok(record)
    }

    /// Fail-soft session read; a corrupt entry reads as logged out.
    pub fn current(&self) -> Option<SessionRecord> {
        self.storage
            .read_json::<SessionRecord>(SESSION_KEY)
            .filter(|record| record.is_logged_in)
    }

    pub fn end(&self) {
        if let Err(e) = self.storage.remove(SESSION_KEY) {
            eprintln!("[session] logout failed: {}", e);
        }
    }
}

fn check_credentials(user_name: &str, password: &str) -> Result<(), String> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err("Password must be at least 6 characters long.".to_string());
    }
    if user_name.len() < MIN_USER_NAME_LEN {
        return Err("Username must be at least 3 characters long.".to_string());
    }
    let lowered = password.to_lowercase();
    if WEAK_PASSWORDS.contains(&lowered.as_str()) {
        return Err("Password is too weak. Please choose a stronger password.".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain at least one number.".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_alphabetic()) {
        return Err("Password must contain at least one letter.".to_string());
    }
    Ok(())
}
