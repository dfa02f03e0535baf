use chrono::Duration;

use domains::{Clock, DomainError, ReactionKind, ReportStatus, ReportType, Role};
use integration_tests::{chatter, Forum};
use services::posts::CreatePost;
use services::reports::{FileReport, ReviewReport};
use services::threads::CreateThread;
use uuid::Uuid;

fn post_report(post_id: Uuid) -> FileReport {
    FileReport {
        reported_type: ReportType::Post,
        reported_id: post_id,
        reason: "spoils the answer".into(),
        details: Some("posted the full solution in plain text".into()),
    }
}

#[tokio::test]
async fn banned_users_are_read_only_until_unbanned() {
    let forum = Forum::new();
    let enigma = forum.board().await;
    let (_, moderator) = forum.member(Role::Moderator).await;
    let (troll, troll_ctx) = forum.member(Role::User).await;
    let created = forum
        .services
        .threads
        .create_thread(
            &troll_ctx,
            CreateThread {
                enigma_id: enigma.id,
                title: "Totally legit hint".into(),
                content: chatter(),
            },
        )
        .await
        .unwrap();

    let banned = forum
        .services
        .moderation
        .ban_profile(&moderator, troll.id, "spam", None)
        .await
        .unwrap();
    assert!(banned.is_banned);
    assert_eq!(banned.ban_reason.as_deref(), Some("spam"));

    let ctx = forum.refreshed_context(troll.id).await;
    let reply = CreatePost {
        thread_id: created.thread.id,
        content: chatter(),
        parent_post_id: None,
    };
    let err = forum
        .services
        .posts
        .create_post(&ctx, reply.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Permission(_)));
    let err = forum
        .services
        .reactions
        .toggle_post_reaction(&ctx, created.first_post.id, ReactionKind::Like)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Permission(_)));
    let err = forum
        .services
        .reports
        .file_report(&ctx, post_report(created.first_post.id))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Permission(_)));

    forum
        .services
        .moderation
        .unban_profile(&moderator, troll.id)
        .await
        .unwrap();
    let ctx = forum.refreshed_context(troll.id).await;
    assert!(forum.services.posts.create_post(&ctx, reply).await.is_ok());
}

#[tokio::test]
async fn temporary_bans_lapse_on_their_own() {
    let forum = Forum::new();
    let (_, moderator) = forum.member(Role::Moderator).await;
    let (user, _) = forum.member(Role::User).await;

    let until = forum.clock.now() + Duration::hours(1);
    forum
        .services
        .moderation
        .ban_profile(&moderator, user.id, "cool down", Some(until))
        .await
        .unwrap();
    assert!(forum.refreshed_context(user.id).await.contributor().is_err());

    forum.advance(Duration::hours(2));
    assert!(forum.refreshed_context(user.id).await.contributor().is_ok());
}

#[tokio::test]
async fn staff_can_only_be_banned_by_admins() {
    let forum = Forum::new();
    let (mod_a, moderator) = forum.member(Role::Moderator).await;
    let (mod_b, _) = forum.member(Role::Moderator).await;
    let (_, admin) = forum.member(Role::Admin).await;

    let err = forum
        .services
        .moderation
        .ban_profile(&moderator, mod_b.id, "rival", None)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Permission(_)));

    let err = forum
        .services
        .moderation
        .ban_profile(&moderator, mod_a.id, "self", None)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Permission(_)));

    assert!(forum
        .services
        .moderation
        .ban_profile(&admin, mod_b.id, "abuse of power", None)
        .await
        .is_ok());
}

#[tokio::test]
async fn roles_are_granted_by_admins_only() {
    let forum = Forum::new();
    let (_, moderator) = forum.member(Role::Moderator).await;
    let (admin_profile, admin) = forum.member(Role::Admin).await;
    let (user, _) = forum.member(Role::User).await;

    let err = forum
        .services
        .moderation
        .set_role(&moderator, user.id, Role::Moderator)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Permission(_)));

    let err = forum
        .services
        .moderation
        .set_role(&admin, admin_profile.id, Role::User)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Permission(_)));

    let promoted = forum
        .services
        .moderation
        .set_role(&admin, user.id, Role::Moderator)
        .await
        .unwrap();
    assert_eq!(promoted.role, Role::Moderator);
    let ctx = forum.refreshed_context(user.id).await;
    assert_eq!(ctx.actor().unwrap().role, Role::Moderator);
}

#[tokio::test]
async fn reports_flow_through_the_moderation_queue() {
    let forum = Forum::new();
    let enigma = forum.board().await;
    let (_, author) = forum.member(Role::User).await;
    let (_, reporter) = forum.member(Role::User).await;
    let (moderator_profile, moderator) = forum.member(Role::Moderator).await;
    let post = forum
        .services
        .threads
        .create_thread(
            &author,
            CreateThread {
                enigma_id: enigma.id,
                title: "Full solution inside".into(),
                content: chatter(),
            },
        )
        .await
        .unwrap()
        .first_post;

    let report = forum
        .services
        .reports
        .file_report(&reporter, post_report(post.id))
        .await
        .unwrap();
    assert_eq!(report.status, ReportStatus::Pending);

    let err = forum
        .services
        .reports
        .pending_reports(&reporter, None)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Permission(_)));
    let queue = forum
        .services
        .reports
        .pending_reports(&moderator, None)
        .await
        .unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].id, report.id);

    let err = forum
        .services
        .reports
        .review_report(
            &moderator,
            report.id,
            ReviewReport {
                status: ReportStatus::Pending,
                notes: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    let reviewed = forum
        .services
        .reports
        .review_report(
            &moderator,
            report.id,
            ReviewReport {
                status: ReportStatus::Resolved,
                notes: Some("spoiler removed".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(reviewed.status, ReportStatus::Resolved);
    assert_eq!(reviewed.reviewed_by, Some(moderator_profile.id));
    assert!(forum
        .services
        .reports
        .pending_reports(&moderator, None)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn reports_must_target_something_real() {
    let forum = Forum::new();
    let (_, reporter) = forum.member(Role::User).await;

    let err = forum
        .services
        .reports
        .file_report(&reporter, post_report(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound { entity: "post", .. }));
}
