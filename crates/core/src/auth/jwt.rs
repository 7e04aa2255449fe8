use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::DocumentId;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token could not be signed: {0}")]
    Sign(jsonwebtoken::errors::Error),
    #[error("invalid or expired token")]
    Invalid,
}

/// Claims of a ritual-service vendor token. `sub` is the vendor document id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// HS256 signing and verification keys for vendor tokens.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl JwtKeys {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn issue(&self, vendor: DocumentId, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = VendorClaims {
            sub: vendor.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(TokenError::Sign)
    }

    /// Vendor id carried by a valid, unexpired token.
    pub fn verify(&self, token: &str) -> Result<DocumentId, TokenError> {
        let data = decode::<VendorClaims>(token, &self.decoding, &Validation::default())
            .map_err(|_| TokenError::Invalid)?;
        DocumentId::parse(&data.claims.sub).map_err(|_| TokenError::Invalid)
    }
}

impl std::fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtKeys").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}
