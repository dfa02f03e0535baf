use std::collections::HashSet;

use chrono::Duration;

use tokio_test::{assert_err, assert_ok};

use domains::{DomainError, Enigma, ReactionKind, RequestContext, Role, Thread};
use integration_tests::{chatter, Forum};
use services::posts::{CreatePost, UpdatePost};
use services::threads::CreateThread;

async fn thread(forum: &Forum, ctx: &RequestContext, enigma: &Enigma, title: &str) -> Thread {
    forum
        .services
        .threads
        .create_thread(
            ctx,
            CreateThread {
                enigma_id: enigma.id,
                title: title.into(),
                content: chatter(),
            },
        )
        .await
        .unwrap()
        .thread
}

#[tokio::test]
async fn listing_puts_pinned_first_then_latest_activity() {
    let forum = Forum::new();
    let enigma = forum.board().await;
    let (_, author) = forum.member(Role::User).await;
    let (_, moderator) = forum.member(Role::Moderator).await;

    let oldest = thread(&forum, &author, &enigma, "Oldest theory").await;
    forum.advance(Duration::minutes(1));
    let middle = thread(&forum, &author, &enigma, "Middle theory").await;
    forum.advance(Duration::minutes(1));
    let newest = thread(&forum, &author, &enigma, "Newest theory").await;
    forum.advance(Duration::minutes(1));

    // A reply bumps the oldest thread to the top of the unpinned ones.
    forum
        .services
        .posts
        .create_post(
            &author,
            CreatePost {
                thread_id: oldest.id,
                content: chatter(),
                parent_post_id: None,
            },
        )
        .await
        .unwrap();
    forum
        .services
        .threads
        .toggle_thread_pin(&moderator, middle.id)
        .await
        .unwrap();

    let page = forum
        .services
        .read
        .threads_page(enigma.id, None, None)
        .await
        .unwrap();
    let order: Vec<_> = page.threads.iter().map(|t| t.id).collect();
    assert_eq!(order, vec![middle.id, oldest.id, newest.id]);
    assert_eq!(page.threads[1].posts_count, 2);
    assert!(page.next_cursor.is_none());
}

#[tokio::test]
async fn cursor_walks_every_thread_exactly_once() {
    let forum = Forum::new();
    let enigma = forum.board().await;
    let (_, author) = forum.member(Role::User).await;
    for n in 0..7 {
        thread(&forum, &author, &enigma, &format!("Theory number {n}")).await;
        forum.advance(Duration::seconds(30));
    }

    let mut seen = HashSet::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0;
    loop {
        let page = forum
            .services
            .read
            .threads_page(enigma.id, cursor.as_deref(), Some(3))
            .await
            .unwrap();
        pages += 1;
        for row in &page.threads {
            assert!(seen.insert(row.id), "thread listed twice");
        }
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }
    assert_eq!(seen.len(), 7);
    assert_eq!(pages, 3);
}

#[tokio::test]
async fn malformed_cursor_is_a_validation_error() {
    let forum = Forum::new();
    let enigma = forum.board().await;
    let err = forum
        .services
        .read
        .threads_page(enigma.id, Some("not a cursor"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
}

#[tokio::test]
async fn thread_by_slug_counts_views_and_hides_deleted_threads() {
    let forum = Forum::new();
    let hunt = forum.hunt("Sphinx Trail").await;
    let enigma = forum.enigma(&hunt, 3).await;
    let (_, author) = forum.member(Role::User).await;
    let (_, moderator) = forum.member(Role::Moderator).await;
    let created = thread(&forum, &author, &enigma, "Riddle of the sphinx").await;
    let read = &forum.services.read;

    let anonymous = RequestContext::anonymous();
    read.thread_by_slug(&anonymous, &hunt.slug, &enigma.slug, &created.slug)
        .await
        .unwrap();
    let viewed = read
        .thread_by_slug(&anonymous, &hunt.slug, &enigma.slug, &created.slug)
        .await
        .unwrap();
    assert_eq!(viewed.views, 1);

    forum
        .services
        .threads
        .delete_thread(&author, created.id, None)
        .await
        .unwrap();
    let err = read
        .thread_by_slug(&anonymous, &hunt.slug, &enigma.slug, &created.slug)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound { .. }));
    assert!(read
        .thread_by_slug(&moderator, &hunt.slug, &enigma.slug, &created.slug)
        .await
        .is_ok());
}

#[tokio::test]
async fn catalog_lookups_by_slug() {
    let forum = Forum::new();
    let hunt = forum.hunt("Sphinx Trail").await;
    let enigma = forum.enigma(&hunt, 1).await;
    let read = &forum.services.read;

    assert_eq!(read.hunt_by_slug("sphinx-trail").await.unwrap().id, hunt.id);
    assert_eq!(
        read.enigma_by_slug("sphinx-trail", &enigma.slug).await.unwrap().id,
        enigma.id
    );
    assert_eq!(read.enigmas_by_hunt("sphinx-trail").await.unwrap().len(), 1);
    assert!(matches!(
        read.hunt_by_slug("atlantis").await,
        Err(DomainError::NotFound { entity: "hunt", .. })
    ));
}

#[tokio::test]
async fn forum_stats_follow_mutations() {
    let forum = Forum::new();
    let enigma = forum.board().await;
    let (_, author) = forum.member(Role::User).await;

    let before = forum.services.read.forum_stats().await.unwrap();
    assert_eq!((before.hunts, before.enigmas, before.users), (1, 1, 1));
    assert_eq!(before.threads, 0);

    thread(&forum, &author, &enigma, "Stats changer").await;
    let after = forum.services.read.forum_stats().await.unwrap();
    assert_eq!(after.threads, 1);
    assert_eq!(after.posts, 1);
}

#[tokio::test]
async fn deleted_thread_hides_its_posts_from_everyone_but_moderators() {
    let forum = Forum::new();
    let enigma = forum.board().await;
    let (_, author) = forum.member(Role::User).await;
    let (_, reader) = forum.member(Role::User).await;
    let (_, moderator) = forum.member(Role::Moderator).await;

    let doomed = thread(&forum, &author, &enigma, "The answer is 42").await;
    let reply = forum
        .services
        .posts
        .create_post(
            &reader,
            CreatePost {
                thread_id: doomed.id,
                content: "reply".into(),
                parent_post_id: None,
            },
        )
        .await
        .unwrap();
    assert_ok!(forum.services.threads.delete_thread(&author, doomed.id, None).await);

    for ctx in [RequestContext::anonymous(), reader.clone(), author.clone()] {
        let err = forum
            .services
            .read
            .posts_page(&ctx, doomed.id, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }), "{err:?}");
    }
    let page = forum
        .services
        .read
        .posts_page(&moderator, doomed.id, None, None)
        .await
        .unwrap();
    assert_eq!(page.posts.len(), 2);

    let reaction = forum
        .services
        .reactions
        .toggle_post_reaction(&author, reply.id, ReactionKind::Like)
        .await;
    assert!(matches!(reaction, Err(DomainError::NotFound { .. })));

    let edit = UpdatePost {
        content: "edited".into(),
        edit_reason: None,
    };
    assert_err!(forum.services.posts.update_post(&reader, reply.id, edit.clone()).await);
    assert_ok!(forum.services.posts.update_post(&moderator, reply.id, edit).await);
}
