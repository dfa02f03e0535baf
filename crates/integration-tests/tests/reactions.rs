use std::sync::Arc;

use domains::{Post, PostRepository, ReactionKind, ReactionOutcome, RequestContext, Role};
use integration_tests::Forum;
use services::threads::CreateThread;

async fn opening_post(forum: &Forum, ctx: &RequestContext) -> Post {
    let enigma = forum.board().await;
    forum
        .services
        .threads
        .create_thread(
            ctx,
            CreateThread {
                enigma_id: enigma.id,
                title: "Reaction bait".into(),
                content: "React to me".into(),
            },
        )
        .await
        .unwrap()
        .first_post
}

async fn reactions_count(forum: &Forum, post: &Post) -> i64 {
    forum
        .store
        .find_post(post.id)
        .await
        .unwrap()
        .unwrap()
        .reactions_count
}

#[tokio::test]
async fn toggling_twice_restores_the_original_state() {
    let forum = Forum::new();
    let (_, author) = forum.member(Role::User).await;
    let (_, fan) = forum.member(Role::User).await;
    let post = opening_post(&forum, &author).await;
    let reactions = &forum.services.reactions;

    let first = reactions
        .toggle_post_reaction(&fan, post.id, ReactionKind::Insightful)
        .await
        .unwrap();
    assert_eq!(first, ReactionOutcome::Added);
    assert_eq!(reactions_count(&forum, &post).await, 1);
    assert_eq!(reactions.reactions(post.id).await.unwrap().len(), 1);

    let second = reactions
        .toggle_post_reaction(&fan, post.id, ReactionKind::Insightful)
        .await
        .unwrap();
    assert_eq!(second, ReactionOutcome::Removed);
    assert_eq!(reactions_count(&forum, &post).await, 0);
    assert!(reactions.reactions(post.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn kinds_are_independent() {
    let forum = Forum::new();
    let (_, author) = forum.member(Role::User).await;
    let (_, fan) = forum.member(Role::User).await;
    let post = opening_post(&forum, &author).await;

    for kind in ReactionKind::ALL {
        forum
            .services
            .reactions
            .toggle_post_reaction(&fan, post.id, *kind)
            .await
            .unwrap();
    }
    assert_eq!(reactions_count(&forum, &post).await, ReactionKind::ALL.len() as i64);
}

#[tokio::test]
async fn concurrent_toggles_keep_the_counter_consistent() {
    let forum = Arc::new(Forum::new());
    let (_, author) = forum.member(Role::User).await;
    let post = opening_post(&forum, &author).await;

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let (_, ctx) = forum.member(Role::User).await;
        let forum = forum.clone();
        let post_id = post.id;
        tasks.push(tokio::spawn(async move {
            forum
                .services
                .reactions
                .toggle_post_reaction(&ctx, post_id, ReactionKind::Like)
                .await
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap(), ReactionOutcome::Added);
    }

    let rows = forum.services.reactions.reactions(post.id).await.unwrap();
    assert_eq!(rows.len(), 8);
    assert_eq!(reactions_count(&forum, &post).await, 8);
}

#[tokio::test]
async fn anonymous_users_cannot_react() {
    let forum = Forum::new();
    let (_, author) = forum.member(Role::User).await;
    let post = opening_post(&forum, &author).await;

    let err = forum
        .services
        .reactions
        .toggle_post_reaction(&RequestContext::anonymous(), post.id, ReactionKind::Funny)
        .await
        .unwrap_err();
    assert_eq!(err, domains::DomainError::Unauthenticated);
}
