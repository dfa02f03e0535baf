//! HS256 access tokens. Stateless: sign-out is the client discarding the token.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use domains::AuthUser;

use crate::{AuthError, TokenIssuer};

#[derive(Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub audience: String,
    pub secret: String,
    pub ttl_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub sub: Uuid,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
    pub aud: String,
    pub iss: String,
}

pub struct JwtTokens {
    config: JwtConfig,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtTokens {
    pub fn new(config: JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            config,
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[self.config.audience.as_str()]);
        validation.set_issuer(&[self.config.issuer.as_str()]);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        validation
    }
}

#[async_trait]
impl TokenIssuer for JwtTokens {
    async fn issue(
        &self,
        user: &AuthUser,
        now: DateTime<Utc>,
    ) -> Result<(String, DateTime<Utc>), AuthError> {
        let ttl = i64::try_from(self.config.ttl_seconds).unwrap_or(i64::MAX / 2);
        let expires_at = now + Duration::seconds(ttl);
        let claims = AccessTokenClaims {
            sub: user.id,
            email: user.email.clone(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
            aud: self.config.audience.clone(),
            iss: self.config.issuer.clone(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok((token, expires_at))
    }

    /// Expiry is checked against `now` rather than the system clock.
    async fn resolve(&self, token: &str, now: DateTime<Utc>) -> Result<Option<AuthUser>, AuthError> {
        let claims = match decode::<AccessTokenClaims>(token, &self.decoding, &self.validation()) {
            Ok(data) => data.claims,
            Err(err) => {
                debug!(error = %err, "rejected access token");
                return Ok(None);
            }
        };
        let expired = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .map_or(true, |exp| exp <= now);
        if expired {
            return Ok(None);
        }
        Ok(Some(AuthUser {
            id: claims.sub,
            email: claims.email,
        }))
    }
}
