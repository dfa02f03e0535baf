//! # Request Context
//!
//! The acting user is passed explicitly into every operation instead of being
//! read from request-scoped state. The HTTP layer builds a [`RequestContext`]
//! from the bearer token; tests build one directly.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{DomainError, DomainResult};
use crate::models::{Profile, Role};

/// A signed-in user as seen by the lifecycle managers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
    /// Resolved against the clock when the context was built.
    pub is_banned: bool,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Actor {
            id,
            role,
            is_banned: false,
        }
    }

    pub fn from_profile(profile: &Profile, now: chrono::DateTime<chrono::Utc>) -> Self {
        Actor {
            id: profile.id,
            role: profile.role,
            is_banned: profile.is_banned_at(now),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub actor: Option<Actor>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        RequestContext { actor: None }
    }

    pub fn signed_in(actor: Actor) -> Self {
        RequestContext { actor: Some(actor) }
    }

    /// The actor, or `Unauthenticated`.
    pub fn actor(&self) -> DomainResult<&Actor> {
        self.actor.as_ref().ok_or(DomainError::Unauthenticated)
    }

    /// The actor, refusing banned users. Used by operations that publish content.
    pub fn contributor(&self) -> DomainResult<&Actor> {
        let actor = self.actor()?;
        if actor.is_banned {
            return Err(DomainError::permission("your account is banned"));
        }
        Ok(actor)
    }
}
