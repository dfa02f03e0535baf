use std::collections::HashSet;

use tokio_test::assert_ok;
use uuid::Uuid;

use domains::{DomainError, HuntRepository, Role, ThreadPatch};
use integration_tests::{chatter, Forum};
use services::threads::CreateThread;

fn new_thread(enigma_id: Uuid, title: &str) -> CreateThread {
    CreateThread {
        enigma_id,
        title: title.to_string(),
        content: "Check this out".to_string(),
    }
}

#[tokio::test]
async fn first_thread_gets_title_slug_and_opening_post() {
    let forum = Forum::new();
    let enigma = forum.board().await;
    let (alice, ctx) = forum.member(Role::User).await;

    let created = forum
        .services
        .threads
        .create_thread(&ctx, new_thread(enigma.id, "My first enigma theory"))
        .await
        .unwrap();

    assert_eq!(created.thread.slug, "my-first-enigma-theory");
    assert_eq!(created.thread.author_id, alice.id);
    assert_eq!(created.thread.posts_count, 1);
    assert_eq!(created.first_post.post_position, 1);
    assert_eq!(created.first_post.author_id, alice.id);
    assert_eq!(created.first_post.content, "Check this out");

    let page = forum
        .services
        .read
        .posts_page(&ctx, created.thread.id, None, None)
        .await
        .unwrap();
    assert_eq!(page.posts.len(), 1);
    assert_eq!(page.posts[0].author_username, alice.username);

    let enigma = forum.store.find_enigma(enigma.id).await.unwrap().unwrap();
    assert_eq!(enigma.threads_count, 1);
    assert_eq!(enigma.posts_count, 1);
}

#[tokio::test]
async fn same_title_yields_distinct_slugs() {
    let forum = Forum::new();
    let enigma = forum.board().await;
    let (_, ctx) = forum.member(Role::User).await;

    let mut slugs = HashSet::new();
    for _ in 0..4 {
        let created = forum
            .services
            .threads
            .create_thread(&ctx, new_thread(enigma.id, "The owl is in Paris"))
            .await
            .unwrap();
        assert!(created.thread.slug.starts_with("the-owl-is-in-paris"));
        slugs.insert(created.thread.slug);
    }
    assert_eq!(slugs.len(), 4);
}

#[tokio::test]
async fn concurrent_same_title_creations_never_share_a_slug() {
    let forum = std::sync::Arc::new(Forum::new());
    let enigma = forum.board().await;
    let (_, ctx) = forum.member(Role::User).await;
    let enigma_id = enigma.id;

    let tasks: Vec<_> = (0..6)
        .map(|_| {
            let forum = forum.clone();
            let ctx = ctx.clone();
            tokio::spawn(async move {
                forum
                    .services
                    .threads
                    .create_thread(&ctx, new_thread(enigma_id, "Moon riddle"))
                    .await
            })
        })
        .collect();

    let mut slugs = HashSet::new();
    for task in tasks {
        if let Ok(created) = task.await.unwrap() {
            assert!(slugs.insert(created.thread.slug));
        }
    }
    assert!(!slugs.is_empty());
}

#[tokio::test]
async fn failed_creation_leaves_nothing_behind() {
    let forum = Forum::new();
    let enigma = forum.board().await;
    let (_, ctx) = forum.member(Role::User).await;

    let err = forum
        .services
        .threads
        .create_thread(&ctx, new_thread(Uuid::new_v4(), "Lost in the void"))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound { entity: "enigma", .. }));

    let err = forum
        .services
        .threads
        .create_thread(
            &ctx,
            CreateThread {
                enigma_id: enigma.id,
                title: "Valid title".into(),
                content: "   ".into(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    let stats = forum.services.read.forum_stats().await.unwrap();
    assert_eq!(stats.threads, 0);
    assert_eq!(stats.posts, 0);
    let listing = forum
        .services
        .read
        .threads_page(enigma.id, None, None)
        .await
        .unwrap();
    assert!(listing.threads.is_empty());
}

#[tokio::test]
async fn anonymous_and_banned_users_cannot_open_threads() {
    let forum = Forum::new();
    let enigma = forum.board().await;
    let (_, moderator) = forum.member(Role::Moderator).await;
    let (target, _) = forum.member(Role::User).await;

    let err = forum
        .services
        .threads
        .create_thread(&Default::default(), new_thread(enigma.id, "Anonymous idea"))
        .await
        .unwrap_err();
    assert_eq!(err, DomainError::Unauthenticated);

    assert_ok!(
        forum
            .services
            .moderation
            .ban_profile(&moderator, target.id, "spam", None)
            .await
    );
    let banned = forum.refreshed_context(target.id).await;
    let err = forum
        .services
        .threads
        .create_thread(&banned, new_thread(enigma.id, "Buy cheap watches"))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Permission(_)));
}

#[tokio::test]
async fn only_author_or_moderator_updates_and_only_moderators_toggle() {
    let forum = Forum::new();
    let enigma = forum.board().await;
    let (_, author) = forum.member(Role::User).await;
    let (_, stranger) = forum.member(Role::User).await;
    let (_, moderator) = forum.member(Role::Moderator).await;
    let thread = forum
        .services
        .threads
        .create_thread(&author, new_thread(enigma.id, "Cipher in the margin"))
        .await
        .unwrap()
        .thread;

    let retitle = ThreadPatch {
        title: Some("Cipher in the left margin".into()),
        ..Default::default()
    };
    let err = forum
        .services
        .threads
        .update_thread(&stranger, thread.id, retitle.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Permission(_)));
    let updated = forum
        .services
        .threads
        .update_thread(&author, thread.id, retitle)
        .await
        .unwrap();
    assert_eq!(updated.title, "Cipher in the left margin");
    assert_eq!(updated.slug, thread.slug);

    let err = forum
        .services
        .threads
        .toggle_thread_pin(&author, thread.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Permission(_)));
    assert!(forum
        .services
        .threads
        .toggle_thread_pin(&moderator, thread.id)
        .await
        .unwrap());
    assert!(!forum
        .services
        .threads
        .toggle_thread_pin(&moderator, thread.id)
        .await
        .unwrap());
}

#[tokio::test]
async fn deleted_thread_disappears_from_listings_and_counters() {
    let forum = Forum::new();
    let enigma = forum.board().await;
    let (_, author) = forum.member(Role::User).await;
    let (_, moderator) = forum.member(Role::Moderator).await;
    let thread = forum
        .services
        .threads
        .create_thread(&author, new_thread(enigma.id, "Short lived idea"))
        .await
        .unwrap()
        .thread;
    forum
        .services
        .posts
        .create_post(
            &author,
            services::posts::CreatePost {
                thread_id: thread.id,
                content: chatter(),
                parent_post_id: None,
            },
        )
        .await
        .unwrap();

    forum
        .services
        .threads
        .delete_thread(&author, thread.id, Some("duplicate".into()))
        .await
        .unwrap();
    // The author no longer sees it; a moderator may repeat the delete harmlessly.
    let err = forum
        .services
        .threads
        .delete_thread(&author, thread.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound { .. }));
    assert_ok!(
        forum
            .services
            .threads
            .delete_thread(&moderator, thread.id, None)
            .await
    );

    let listing = forum
        .services
        .read
        .threads_page(enigma.id, None, None)
        .await
        .unwrap();
    assert!(listing.threads.is_empty());
    let enigma = forum.store.find_enigma(enigma.id).await.unwrap().unwrap();
    assert_eq!(enigma.threads_count, 0);
}
