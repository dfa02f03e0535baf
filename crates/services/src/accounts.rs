//! # Accounts
//!
//! Sign-up, sign-in, profile self-edit and password change, plus turning a
//! bearer token into an explicit [`RequestContext`].
//! Credentials live in the identity service; profiles in the forum store.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use domains::{
    Actor, Clock, DomainError, DomainResult, IdentityProvider, NewProfile, Profile, ProfilePatch,
    ProfileRepository, RequestContext, Session,
};

use crate::content::optional_text;

pub const MIN_USERNAME_CHARS: usize = 3;
pub const MAX_USERNAME_CHARS: usize = 30;
pub const MIN_PASSWORD_CHARS: usize = 8;
const MAX_DISPLAY_NAME_CHARS: usize = 50;
const MAX_BIO_CHARS: usize = 500;
const MAX_AVATAR_URL_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignUp {
    pub email: String,
    pub password: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

fn validate_username(username: &str) -> DomainResult<()> {
    let len = username.chars().count();
    if !(MIN_USERNAME_CHARS..=MAX_USERNAME_CHARS).contains(&len) {
        return Err(DomainError::validation(format!(
            "the username must be between {MIN_USERNAME_CHARS} and {MAX_USERNAME_CHARS} characters"
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(DomainError::validation(
            "the username may only contain letters, digits, '_' and '-'",
        ));
    }
    Ok(())
}

fn validate_password(password: &str) -> DomainResult<()> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(DomainError::validation(format!(
            "the password must be at least {MIN_PASSWORD_CHARS} characters"
        )));
    }
    Ok(())
}

fn normalize_email(email: &str) -> DomainResult<String> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(DomainError::validation("a valid e-mail address is required")),
    }
}

#[derive(Clone)]
pub struct AccountService {
    identity: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileRepository>,
    clock: Arc<dyn Clock>,
}

impl AccountService {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            identity,
            profiles,
            clock,
        }
    }

    pub async fn sign_up(&self, input: SignUp) -> DomainResult<Profile> {
        if input.email.trim().is_empty() || input.password.is_empty() || input.username.is_empty()
        {
            return Err(DomainError::validation("all fields are required"));
        }
        let username = input.username.trim().to_string();
        validate_username(&username)?;
        validate_password(&input.password)?;
        let email = normalize_email(&input.email)?;

        if self
            .profiles
            .find_profile_by_username(&username)
            .await?
            .is_some()
        {
            return Err(DomainError::Conflict("this username is already taken".into()));
        }

        let user = self.identity.register(&email, &input.password).await?;
        let profile = self
            .profiles
            .insert_profile(NewProfile {
                id: user.id,
                display_name: Some(username.clone()),
                username,
                created_at: self.clock.now(),
            })
            .await
            .inspect_err(|err| {
                error!(user_id = %user.id, error = %err, "credentials registered but profile insert failed");
            })?;

        info!(user_id = %profile.id, username = %profile.username, "account created");
        Ok(profile)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> DomainResult<Session> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(DomainError::validation("e-mail and password are required"));
        }
        let email = email.trim().to_lowercase();
        let session = self.identity.authenticate(&email, password).await?;
        if let Err(err) = self
            .profiles
            .touch_last_seen(session.user_id, self.clock.now())
            .await
        {
            warn!(user_id = %session.user_id, error = %err, "failed to record last_seen_at");
        }
        info!(user_id = %session.user_id, "signed in");
        Ok(session)
    }

    /// An unknown or expired token yields an anonymous context.
    pub async fn resolve_context(&self, access_token: Option<&str>) -> DomainResult<RequestContext> {
        let Some(token) = access_token else {
            return Ok(RequestContext::anonymous());
        };
        let Some(user) = self.identity.current_user(token).await? else {
            return Ok(RequestContext::anonymous());
        };
        match self.profiles.find_profile(user.id).await? {
            Some(profile) => Ok(RequestContext::signed_in(Actor::from_profile(
                &profile,
                self.clock.now(),
            ))),
            None => {
                warn!(user_id = %user.id, "authenticated user has no profile");
                Ok(RequestContext::anonymous())
            }
        }
    }

    pub async fn current_profile(&self, ctx: &RequestContext) -> DomainResult<Profile> {
        let actor = ctx.actor()?;
        self.profiles
            .find_profile(actor.id)
            .await?
            .ok_or_else(|| DomainError::not_found("profile", actor.id))
    }

    /// Replaces display name, bio and avatar; blank values clear them.
    pub async fn update_profile(
        &self,
        ctx: &RequestContext,
        update: ProfileUpdate,
    ) -> DomainResult<Profile> {
        let actor = ctx.actor()?;
        let patch = ProfilePatch {
            display_name: optional_text(update.display_name, "display name", MAX_DISPLAY_NAME_CHARS)?,
            bio: optional_text(update.bio, "bio", MAX_BIO_CHARS)?,
            avatar_url: optional_text(update.avatar_url, "avatar url", MAX_AVATAR_URL_CHARS)?,
        };
        let profile = self
            .profiles
            .update_profile(actor.id, patch, self.clock.now())
            .await?;
        info!(user_id = %actor.id, "profile updated");
        Ok(profile)
    }

    pub async fn update_password(
        &self,
        ctx: &RequestContext,
        password: &str,
        confirm_password: &str,
    ) -> DomainResult<()> {
        let actor = ctx.actor()?;
        if password.is_empty() || confirm_password.is_empty() {
            return Err(DomainError::validation("both passwords are required"));
        }
        if password != confirm_password {
            return Err(DomainError::validation("the passwords do not match"));
        }
        validate_password(password)?;
        self.identity.change_password(actor.id, password).await?;
        info!(user_id = %actor.id, "password changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fixed_clock, t0};
    use domains::{AuthUser, MockIdentityProvider, MockProfileRepository, Role};
    use uuid::Uuid;

    fn profile(id: Uuid, username: &str) -> Profile {
        Profile {
            id,
            username: username.into(),
            display_name: Some(username.into()),
            avatar_url: None,
            bio: None,
            role: Role::User,
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

    fn service(identity: MockIdentityProvider, profiles: MockProfileRepository) -> AccountService {
        AccountService::new(
            Arc::new(identity),
            Arc::new(profiles),
            Arc::new(fixed_clock(t0())),
        )
    }

    #[test]
    fn username_rules() {
        assert!(validate_username("ab").is_err());
        assert!(validate_username("abc").is_ok());
        assert!(validate_username(&"a".repeat(30)).is_ok());
        assert!(validate_username(&"a".repeat(31)).is_err());
        assert!(validate_username("no spaces").is_err());
    }

    #[tokio::test]
    async fn sign_up_rejects_taken_username_before_registering() {
        let mut profiles = MockProfileRepository::new();
        profiles
            .expect_find_profile_by_username()
            .returning(|name| Ok(Some(profile(Uuid::new_v4(), name))));
        let mut identity = MockIdentityProvider::new();
        identity.expect_register().never();

        let err = service(identity, profiles)
            .sign_up(SignUp {
                email: "a@example.com".into(),
                password: "long enough".into(),
                username: "sleuth".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn sign_up_creates_profile_with_identity_id() {
        let user_id = Uuid::new_v4();
        let mut profiles = MockProfileRepository::new();
        profiles
            .expect_find_profile_by_username()
            .returning(|_| Ok(None));
        profiles
            .expect_insert_profile()
            .withf(move |p| p.id == user_id && p.display_name.as_deref() == Some("sleuth"))
            .returning(|p| Ok(profile(p.id, &p.username)));
        let mut identity = MockIdentityProvider::new();
        identity
            .expect_register()
            .withf(|email, _| email == "a@example.com")
            .returning(move |email, _| {
                Ok(AuthUser {
                    id: user_id,
                    email: email.to_string(),
                })
            });

        let created = service(identity, profiles)
            .sign_up(SignUp {
                email: " A@Example.com ".into(),
                password: "long enough".into(),
                username: "sleuth".into(),
            })
            .await
            .unwrap();
        assert_eq!(created.id, user_id);
    }

    #[tokio::test]
    async fn mismatched_passwords_are_rejected() {
        let mut identity = MockIdentityProvider::new();
        identity.expect_change_password().never();
        let ctx = RequestContext::signed_in(Actor::new(Uuid::new_v4(), Role::User));
        let err = service(identity, MockProfileRepository::new())
            .update_password(&ctx, "password-one", "password-two")
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::validation("the passwords do not match"));
    }

    #[tokio::test]
    async fn unknown_token_resolves_to_anonymous() {
        let mut identity = MockIdentityProvider::new();
        identity.expect_current_user().returning(|_| Ok(None));
        let ctx = service(identity, MockProfileRepository::new())
            .resolve_context(Some("stale"))
            .await
            .unwrap();
        assert!(ctx.actor.is_none());
    }

    #[tokio::test]
    async fn token_resolves_to_actor_with_profile_role() {
        let id = Uuid::new_v4();
        let mut identity = MockIdentityProvider::new();
        identity.expect_current_user().returning(move |_| {
            Ok(Some(AuthUser {
                id,
                email: "mod@example.com".into(),
            }))
        });
        let mut profiles = MockProfileRepository::new();
        profiles.expect_find_profile().returning(|id| {
            let mut p = profile(id, "warden");
            p.role = Role::Moderator;
            Ok(Some(p))
        });
        let ctx = service(identity, profiles)
            .resolve_context(Some("token"))
            .await
            .unwrap();
        let actor = ctx.actor().unwrap();
        assert_eq!(actor.id, id);
        assert_eq!(actor.role, Role::Moderator);
    }
}
