use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Opaque premium session token stored on the owning person document.
/// Issuing a new one overwrites (and so revokes) the previous one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl SessionToken {
    pub fn issue(now: DateTime<Utc>, ttl: Duration) -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self {
            token: hex::encode(bytes),
            expires_at: now + ttl,
        }
    }

    /// True when `presented` equals this token and it has not expired.
    pub fn accepts(&self, presented: &str, now: DateTime<Utc>) -> bool {
        now <= self.expires_at && constant_time_eq(self.token.as_bytes(), presented.as_bytes())
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
