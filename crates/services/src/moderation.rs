//! # Profile moderation
//!
//! Bans and role changes. Moderators ban regular users; only admins ban
//! staff or change roles; nobody acts on their own account.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use domains::{
    BanRecord, Clock, DomainError, DomainResult, Profile, ProfileRepository, RequestContext, Role,
};

use crate::authz::{can_moderate, is_admin, require_admin, require_moderator};

#[derive(Clone)]
pub struct ModerationService {
    profiles: Arc<dyn ProfileRepository>,
    clock: Arc<dyn Clock>,
}

impl ModerationService {
    pub fn new(profiles: Arc<dyn ProfileRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { profiles, clock }
    }

    async fn target(&self, actor_id: Uuid, profile_id: Uuid) -> DomainResult<Profile> {
        if actor_id == profile_id {
            return Err(DomainError::permission("you cannot moderate your own account"));
        }
        self.profiles
            .find_profile(profile_id)
            .await?
            .ok_or_else(|| DomainError::not_found("profile", profile_id))
    }

    pub async fn ban_profile(
        &self,
        ctx: &RequestContext,
        profile_id: Uuid,
        reason: &str,
        until: Option<DateTime<Utc>>,
    ) -> DomainResult<Profile> {
        let actor = ctx.actor()?;
        require_moderator(actor, "ban users")?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(DomainError::validation("a ban needs a reason"));
        }
        let now = self.clock.now();
        if until.is_some_and(|until| until <= now) {
            return Err(DomainError::validation("a ban must end in the future"));
        }

        let target = self.target(actor.id, profile_id).await?;
        if can_moderate(target.role) && !is_admin(actor.role) {
            return Err(DomainError::permission("only an admin can ban a staff member"));
        }

        let profile = self
            .profiles
            .set_ban(
                profile_id,
                Some(BanRecord {
                    reason: reason.to_string(),
                    until,
                }),
                now,
            )
            .await?;
        info!(%profile_id, moderator = %actor.id, ?until, "profile banned");
        Ok(profile)
    }

    pub async fn unban_profile(&self, ctx: &RequestContext, profile_id: Uuid) -> DomainResult<Profile> {
        let actor = ctx.actor()?;
        require_moderator(actor, "lift bans")?;
        self.target(actor.id, profile_id).await?;
        let profile = self
            .profiles
            .set_ban(profile_id, None, self.clock.now())
            .await?;
        info!(%profile_id, moderator = %actor.id, "profile unbanned");
        Ok(profile)
    }

    pub async fn set_role(
        &self,
        ctx: &RequestContext,
        profile_id: Uuid,
        role: Role,
    ) -> DomainResult<Profile> {
        let actor = ctx.actor()?;
        require_admin(actor, "change roles")?;
        self.target(actor.id, profile_id).await?;
        let profile = self
            .profiles
            .set_role(profile_id, role, self.clock.now())
            .await?;
        info!(%profile_id, admin = %actor.id, %role, "role changed");
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fixed_clock, t0};
    use domains::{Actor, MockProfileRepository};

    fn profile(id: Uuid, role: Role) -> Profile {
        Profile {
            id,
            username: "target".into(),
            display_name: None,
            avatar_url: None,
            bio: None,
            role,
            is_banned: false,
            ban_reason: None,
            banned_until: None,
            posts_count: 0,
            threads_count: 0,
            reputation: 0,
            created_at: t0(),
            updated_at: t0(),
            last_seen_at: None,
        }
    }

    fn service(profiles: MockProfileRepository) -> ModerationService {
        ModerationService::new(Arc::new(profiles), Arc::new(fixed_clock(t0())))
    }

    #[tokio::test]
    async fn moderator_cannot_ban_another_moderator() {
        let mut profiles = MockProfileRepository::new();
        profiles
            .expect_find_profile()
            .returning(|id| Ok(Some(profile(id, Role::Moderator))));
        profiles.expect_set_ban().never();

        let ctx = RequestContext::signed_in(Actor::new(Uuid::new_v4(), Role::Moderator));
        let err = service(profiles)
            .ban_profile(&ctx, Uuid::new_v4(), "abuse", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Permission(_)));
    }

    #[tokio::test]
    async fn moderator_bans_user_until_date() {
        let until = t0() + chrono::Duration::days(7);
        let mut profiles = MockProfileRepository::new();
        profiles
            .expect_find_profile()
            .returning(|id| Ok(Some(profile(id, Role::User))));
        profiles
            .expect_set_ban()
            .withf(move |_, ban, _| ban.as_ref().is_some_and(|b| b.until == Some(until)))
            .returning(|id, ban, _| {
                let mut p = profile(id, Role::User);
                p.is_banned = ban.is_some();
                Ok(p)
            });

        let ctx = RequestContext::signed_in(Actor::new(Uuid::new_v4(), Role::Moderator));
        let banned = service(profiles)
            .ban_profile(&ctx, Uuid::new_v4(), "spam", Some(until))
            .await
            .unwrap();
        assert!(banned.is_banned);
    }

    #[tokio::test]
    async fn admin_cannot_change_own_role() {
        let admin = Uuid::new_v4();
        let ctx = RequestContext::signed_in(Actor::new(admin, Role::Admin));
        let err = service(MockProfileRepository::new())
            .set_role(&ctx, admin, Role::User)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Permission(_)));
    }
}
