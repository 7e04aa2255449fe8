//! Emailed six-digit password reset codes.
//!
//! Only the argon2 hash of a code is stored, next to its expiry and the
//! number of wrong guesses so far.
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::password::{hash_password, verify_password, PasswordError};

pub const RESET_CODE_TTL_MINUTES: i64 = 15;
pub const MAX_RESET_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResetError {
    #[error("reset code has expired")]
    Expired,
    #[error("too many wrong reset codes, request a new one")]
    Locked,
    #[error("reset code does not match ({remaining} attempts left)")]
    Mismatch { remaining: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetState {
    pub code_hash: String,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub attempts: u32,
}

impl ResetState {
    /// Generate a fresh code. Returns the plain code (to be emailed) and the
    /// state to store.
    pub fn issue(now: DateTime<Utc>) -> Result<(String, ResetState), PasswordError> {
        let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000u32));
        let state = ResetState {
            code_hash: hash_password(&code)?,
            expires_at: now + Duration::minutes(RESET_CODE_TTL_MINUTES),
            attempts: 0,
        };
        Ok((code, state))
    }

    pub fn is_locked(&self) -> bool {
        self.attempts >= MAX_RESET_ATTEMPTS
    }

    /// Check a submitted code. Only a mismatch counts as an attempt; once
    /// [`MAX_RESET_ATTEMPTS`] mismatches accumulate every further check fails
    /// with [`ResetError::Locked`], even for the right code.
    pub fn check(&mut self, code: &str, now: DateTime<Utc>) -> Result<(), ResetError> {
        if now > self.expires_at {
            return Err(ResetError::Expired);
        }
        if self.is_locked() {
            return Err(ResetError::Locked);
        }
        if verify_password(&self.code_hash, code.trim()) {
            return Ok(());
        }
        self.attempts += 1;
        Err(ResetError::Mismatch {
            remaining: MAX_RESET_ATTEMPTS.saturating_sub(self.attempts),
        })
    }
}
