use std::sync::Arc;

use tokio_test::assert_ok;

use domains::{DomainError, MockListingCache, Role};
use integration_tests::{chatter, Forum};
use services::posts::CreatePost;
use services::threads::CreateThread;

fn unreachable_cache() -> MockListingCache {
    let mut cache = MockListingCache::new();
    cache
        .expect_invalidate_listings()
        .times(2..)
        .returning(|| Err(DomainError::Backend("cache unreachable".into())));
    cache
        .expect_cached_stats()
        .returning(|| Err(DomainError::Backend("cache unreachable".into())));
    cache
        .expect_listings_generation()
        .returning(|| Err(DomainError::Backend("cache unreachable".into())));
    cache.expect_store_stats().never();
    cache
}

#[tokio::test]
async fn a_failing_cache_never_fails_committed_writes_or_reads() {
    let forum = Forum::with_cache(Arc::new(unreachable_cache()));
    let enigma = forum.board().await;
    let (_, author) = forum.member(Role::User).await;

    let created = forum
        .services
        .threads
        .create_thread(
            &author,
            CreateThread {
                enigma_id: enigma.id,
                title: "Cache outage theory".into(),
                content: chatter(),
            },
        )
        .await
        .unwrap();
    assert_ok!(
        forum
            .services
            .posts
            .create_post(
                &author,
                CreatePost {
                    thread_id: created.thread.id,
                    content: chatter(),
                    parent_post_id: None,
                },
            )
            .await
    );

    let stats = forum.services.read.forum_stats().await.unwrap();
    assert_eq!((stats.threads, stats.posts), (1, 2));
}
