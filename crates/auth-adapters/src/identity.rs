//! # LocalIdentityProvider
//!
//! Registration, sign-in and token resolution against our own credential
//! table.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};
use uuid::Uuid;

use domains::{
    AuthUser, Clock, CredentialStore, Credentials, DomainError, DomainResult, IdentityProvider,
    Session,
};

use crate::password::{hash_password_blocking, verify_password_blocking};
use crate::TokenIssuer;

const BAD_CREDENTIALS: &str = "invalid email or password";

pub struct LocalIdentityProvider {
    credentials: Arc<dyn CredentialStore>,
    tokens: Arc<dyn TokenIssuer>,
    clock: Arc<dyn Clock>,
}

impl LocalIdentityProvider {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        tokens: Arc<dyn TokenIssuer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            credentials,
            tokens,
            clock,
        }
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn register(&self, email: &str, password: &str) -> DomainResult<AuthUser> {
        if self
            .credentials
            .find_credentials_by_email(email)
            .await?
            .is_some()
        {
            return Err(DomainError::Conflict(
                "this e-mail address is already registered".into(),
            ));
        }
        let password_hash = hash_password_blocking(password.to_string()).await?;
        let user_id = Uuid::new_v4();
        self.credentials
            .insert_credentials(Credentials {
                user_id,
                email: email.to_string(),
                password_hash,
                created_at: self.clock.now(),
            })
            .await?;
        info!(%user_id, "credentials registered");
        Ok(AuthUser {
            id: user_id,
            email: email.to_string(),
        })
    }

    async fn authenticate(&self, email: &str, password: &str) -> DomainResult<Session> {
        let Some(credentials) = self.credentials.find_credentials_by_email(email).await? else {
            warn!("sign-in for unknown e-mail");
            return Err(DomainError::permission(BAD_CREDENTIALS));
        };
        let valid =
            verify_password_blocking(password.to_string(), credentials.password_hash.clone())
                .await?;
        if !valid {
            warn!(user_id = %credentials.user_id, "sign-in with wrong password");
            return Err(DomainError::permission(BAD_CREDENTIALS));
        }

        let user = AuthUser {
            id: credentials.user_id,
            email: credentials.email,
        };
        let (access_token, expires_at) = self.tokens.issue(&user, self.clock.now()).await?;
        Ok(Session {
            user_id: user.id,
            access_token,
            expires_at,
        })
    }

    async fn current_user(&self, access_token: &str) -> DomainResult<Option<AuthUser>> {
        Ok(self.tokens.resolve(access_token, self.clock.now()).await?)
    }

    async fn change_password(&self, user_id: Uuid, password: &str) -> DomainResult<()> {
        let password_hash = hash_password_blocking(password.to_string()).await?;
        self.credentials
            .update_password_hash(user_id, password_hash)
            .await
    }
}
