//! # auth-adapters
//!
//! The identity service behind [`domains::IdentityProvider`]: Argon2 password
//! hashing over a [`domains::CredentialStore`], plus bearer tokens issued either
//! as HS256 JWTs (feature `auth-jwt`) or as opaque in-memory sessions.

pub mod error;
pub mod identity;
pub mod password;
pub mod sessions;

#[cfg(feature = "auth-jwt")]
pub mod jwt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use domains::AuthUser;

pub use error::AuthError;
pub use identity::LocalIdentityProvider;
pub use sessions::MemorySessions;

#[cfg(feature = "auth-jwt")]
pub use jwt::{JwtConfig, JwtTokens};

/// Issues and resolves bearer tokens for signed-in users.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// Returns the token and its expiry.
    async fn issue(
        &self,
        user: &AuthUser,
        now: DateTime<Utc>,
    ) -> Result<(String, DateTime<Utc>), AuthError>;

    /// `None` for unknown, malformed or expired tokens.
    async fn resolve(&self, token: &str, now: DateTime<Utc>) -> Result<Option<AuthUser>, AuthError>;
}
