//! Opaque bearer tokens kept in process memory. Sessions do not survive a
//! restart; used when JWT support is compiled out and in tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use domains::AuthUser;

use crate::{AuthError, TokenIssuer};

#[derive(Debug)]
pub struct MemorySessions {
    ttl: Duration,
    sessions: RwLock<HashMap<String, (AuthUser, DateTime<Utc>)>>,
}

impl MemorySessions {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl TokenIssuer for MemorySessions {
    async fn issue(
        &self,
        user: &AuthUser,
        now: DateTime<Utc>,
    ) -> Result<(String, DateTime<Utc>), AuthError> {
        let token = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        let expires_at = now + self.ttl;
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, (_, expiry)| *expiry > now);
        sessions.insert(token.clone(), (user.clone(), expires_at));
        Ok((token, expires_at))
    }

    async fn resolve(&self, token: &str, now: DateTime<Utc>) -> Result<Option<AuthUser>, AuthError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(token)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(user, _)| user.clone()))
    }
}
