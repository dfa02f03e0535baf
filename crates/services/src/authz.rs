//! # Moderation Authorization
//!
//! Pure decisions on who may act on what. Every lifecycle operation goes
//! through these helpers; nothing else inspects roles directly.

use uuid::Uuid;

use domains::{Actor, DomainError, DomainResult, RequestContext, Role};

/// Moderators and admins may act on any content.
pub fn can_moderate(role: Role) -> bool {
    matches!(role, Role::Admin | Role::Moderator)
}

pub fn is_admin(role: Role) -> bool {
    role == Role::Admin
}

/// Authors act on their own content; moderators on everyone's.
pub fn can_act_on_own(actor_id: Uuid, owner_id: Uuid, role: Role) -> bool {
    actor_id == owner_id || can_moderate(role)
}

/// Signed in as a moderator or admin.
pub(crate) fn is_moderating(ctx: &RequestContext) -> bool {
    ctx.actor.as_ref().is_some_and(|actor| can_moderate(actor.role))
}

pub(crate) fn require_moderator(actor: &Actor, action: &str) -> DomainResult<()> {
    if can_moderate(actor.role) {
        Ok(())
    } else {
        Err(DomainError::permission(format!(
            "you must be a moderator to {action}"
        )))
    }
}

pub(crate) fn require_admin(actor: &Actor, action: &str) -> DomainResult<()> {
    if is_admin(actor.role) {
        Ok(())
    } else {
        Err(DomainError::permission(format!(
            "you must be an admin to {action}"
        )))
    }
}

pub(crate) fn require_owner_or_moderator(
    actor: &Actor,
    owner_id: Uuid,
    action: &str,
) -> DomainResult<()> {
    if can_act_on_own(actor.id, owner_id, actor.role) {
        Ok(())
    } else {
        Err(DomainError::permission(format!(
            "you do not have permission to {action}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_staff_can_moderate() {
        assert!(can_moderate(Role::Admin));
        assert!(can_moderate(Role::Moderator));
        assert!(!can_moderate(Role::User));
    }

    #[test]
    fn owners_and_staff_act_on_content() {
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        assert!(can_act_on_own(owner, owner, Role::User));
        assert!(!can_act_on_own(stranger, owner, Role::User));
        assert!(can_act_on_own(stranger, owner, Role::Moderator));
        assert!(can_act_on_own(stranger, owner, Role::Admin));
    }

    #[test]
    fn refusal_names_the_action() {
        let actor = Actor::new(Uuid::new_v4(), Role::User);
        let err = require_moderator(&actor, "pin a thread").unwrap_err();
        assert_eq!(
            err.to_string(),
            "permission denied: you must be a moderator to pin a thread"
        );
        assert!(require_admin(&Actor::new(Uuid::new_v4(), Role::Moderator), "x").is_err());
    }
}
