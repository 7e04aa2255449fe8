//! Credentials: password hashes, email reset codes, premium sessions and
//! vendor access tokens.

pub mod jwt;
pub mod password;
pub mod reset;
pub mod session;

pub use jwt::{JwtKeys, TokenError, VendorClaims};
pub use password::{hash_password, verify_password, PasswordError};
pub use reset::{ResetError, ResetState, MAX_RESET_ATTEMPTS, RESET_CODE_TTL_MINUTES};
pub use session::SessionToken;
