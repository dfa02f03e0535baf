//! # Thread Lifecycle Manager
//!
//! Creates, edits, pins, locks and soft-deletes threads. A thread is born
//! together with its opening post in one repository call.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use domains::{
    Actor, Clock, DomainError, DomainResult, HuntRepository, ListingCache, NewPost, NewThread,
    Post, RequestContext, SlugNamespace, Thread, ThreadFlag, ThreadPatch, ThreadRepository,
};

use crate::authz::{can_moderate, require_moderator, require_owner_or_moderator};
use crate::content::{render_html, validate_post_content, validate_title};
use crate::mark_listings_stale;
use crate::slug::SlugGenerator;

/// Slug allocation is retried this many times when the insert loses a race.
const SLUG_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateThread {
    pub enigma_id: Uuid,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedThread {
    pub thread: Thread,
    pub first_post: Post,
}

#[derive(Clone)]
pub struct ThreadService {
    hunts: Arc<dyn HuntRepository>,
    threads: Arc<dyn ThreadRepository>,
    slugs: SlugGenerator,
    cache: Arc<dyn ListingCache>,
    clock: Arc<dyn Clock>,
}

impl ThreadService {
    pub fn new(
        hunts: Arc<dyn HuntRepository>,
        threads: Arc<dyn ThreadRepository>,
        slugs: SlugGenerator,
        cache: Arc<dyn ListingCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            hunts,
            threads,
            slugs,
            cache,
            clock,
        }
    }

    pub async fn create_thread(
        &self,
        ctx: &RequestContext,
        input: CreateThread,
    ) -> DomainResult<CreatedThread> {
        let actor = ctx.contributor()?;
        let title = validate_title(&input.title)?;
        validate_post_content(&input.content)?;

        let enigma = self
            .hunts
            .find_enigma(input.enigma_id)
            .await?
            .filter(|enigma| enigma.is_active)
            .ok_or_else(|| DomainError::not_found("enigma", input.enigma_id))?;

        let content_html = render_html(&input.content);
        let mut attempt = 1;
        let (thread, first_post) = loop {
            let slug = self.slugs.generate(SlugNamespace::Threads, &title).await?;
            let now = self.clock.now();
            let thread_id = Uuid::new_v4();
            let new_thread = NewThread {
                id: thread_id,
                enigma_id: enigma.id,
                author_id: actor.id,
                title: title.clone(),
                slug: slug.clone(),
                created_at: now,
            };
            let first_post = NewPost {
                id: Uuid::new_v4(),
                thread_id,
                author_id: actor.id,
                parent_post_id: None,
                content: input.content.clone(),
                content_html: content_html.clone(),
                created_at: now,
            };

            match self
                .threads
                .create_thread_with_first_post(new_thread, first_post)
                .await
            {
                Ok(created) => break created,
                Err(DomainError::Conflict(reason)) if attempt < SLUG_ATTEMPTS => {
                    warn!(%slug, attempt, %reason, "thread slug taken at insert, regenerating");
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        };

        info!(
            thread_id = %thread.id,
            enigma_id = %enigma.id,
            author_id = %actor.id,
            slug = %thread.slug,
            "thread created"
        );
        mark_listings_stale(self.cache.as_ref()).await;
        Ok(CreatedThread { thread, first_post })
    }

    /// Author or moderator edits title and flags. No edit window applies.
    pub async fn update_thread(
        &self,
        ctx: &RequestContext,
        thread_id: Uuid,
        mut patch: ThreadPatch,
    ) -> DomainResult<Thread> {
        let actor = ctx.actor()?;
        let thread = self.visible_thread(actor, thread_id).await?;
        require_owner_or_moderator(actor, thread.author_id, "edit this thread")
            .inspect_err(|_| warn!(%thread_id, actor_id = %actor.id, "thread update refused"))?;

        if let Some(title) = patch.title.as_deref() {
            patch.title = Some(validate_title(title)?);
        }
        if patch.is_empty() {
            return Ok(thread);
        }

        let updated = self
            .threads
            .update_thread(thread_id, patch, self.clock.now())
            .await?;
        info!(%thread_id, actor_id = %actor.id, "thread updated");
        mark_listings_stale(self.cache.as_ref()).await;
        Ok(updated)
    }

    /// Moderators only. Returns the new pinned state.
    pub async fn toggle_thread_pin(
        &self,
        ctx: &RequestContext,
        thread_id: Uuid,
    ) -> DomainResult<bool> {
        self.toggle(ctx, thread_id, ThreadFlag::Pinned, "pin a thread")
            .await
    }

    /// Moderators only. Returns the new locked state.
    pub async fn toggle_thread_lock(
        &self,
        ctx: &RequestContext,
        thread_id: Uuid,
    ) -> DomainResult<bool> {
        self.toggle(ctx, thread_id, ThreadFlag::Locked, "lock a thread")
            .await
    }

    async fn toggle(
        &self,
        ctx: &RequestContext,
        thread_id: Uuid,
        flag: ThreadFlag,
        action: &str,
    ) -> DomainResult<bool> {
        let actor = ctx.actor()?;
        require_moderator(actor, action)?;

        let value = self
            .threads
            .toggle_thread_flag(thread_id, flag, self.clock.now())
            .await?;
        info!(%thread_id, actor_id = %actor.id, ?flag, value, "thread flag toggled");
        mark_listings_stale(self.cache.as_ref()).await;
        Ok(value)
    }

    /// Soft delete by the author or a moderator.
    pub async fn delete_thread(
        &self,
        ctx: &RequestContext,
        thread_id: Uuid,
        reason: Option<String>,
    ) -> DomainResult<()> {
        let actor = ctx.actor()?;
        let thread = self.visible_thread(actor, thread_id).await?;
        require_owner_or_moderator(actor, thread.author_id, "delete this thread")?;

        let changed = self
            .threads
            .soft_delete_thread(thread_id, reason, self.clock.now())
            .await?;
        if changed {
            info!(%thread_id, actor_id = %actor.id, "thread deleted");
            mark_listings_stale(self.cache.as_ref()).await;
        }
        Ok(())
    }

    async fn visible_thread(&self, actor: &Actor, thread_id: Uuid) -> DomainResult<Thread> {
        find_visible_thread(self.threads.as_ref(), thread_id, can_moderate(actor.role)).await
    }
}

/// Deleted threads, and everything in them, only exist for moderators.
pub(crate) async fn find_visible_thread(
    threads: &dyn ThreadRepository,
    thread_id: Uuid,
    moderator: bool,
) -> DomainResult<Thread> {
    threads
        .find_thread(thread_id)
        .await?
        .filter(|thread| !thread.state.is_deleted() || moderator)
        .ok_or_else(|| DomainError::not_found("thread", thread_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fixed_clock, quiet_cache, t0};
    use domains::{
        ContentState, Enigma, MockHuntRepository, MockListingCache, MockSlugRepository,
        MockThreadRepository, Role,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn enigma(id: Uuid) -> Enigma {
        Enigma {
            id,
            hunt_id: Uuid::new_v4(),
            slug: "the-lighthouse".into(),
            number: "1".into(),
            title: "The Lighthouse".into(),
            description: None,
            order_index: 1,
            is_active: true,
            is_solved: false,
            solved_at: None,
            threads_count: 0,
            posts_count: 0,
            views: 0,
            created_at: t0(),
        }
    }

    fn thread(author_id: Uuid) -> Thread {
        Thread {
            id: Uuid::new_v4(),
            enigma_id: Uuid::new_v4(),
            author_id,
            title: "Original title".into(),
            slug: "original-title".into(),
            is_pinned: false,
            is_locked: false,
            state: ContentState::Active,
            locked_reason: None,
            deleted_reason: None,
            views: 0,
            posts_count: 1,
            reactions_count: 0,
            last_post_at: t0(),
            last_post_by: Some(author_id),
            created_at: t0(),
            updated_at: t0(),
        }
    }

    fn stored(new_thread: &NewThread, new_post: &NewPost) -> (Thread, Post) {
        let mut thread = thread(new_thread.author_id);
        thread.id = new_thread.id;
        thread.slug = new_thread.slug.clone();
        thread.title = new_thread.title.clone();
        let post = Post {
            id: new_post.id,
            thread_id: new_post.thread_id,
            author_id: new_post.author_id,
            parent_post_id: None,
            content: new_post.content.clone(),
            content_html: Some(new_post.content_html.clone()),
            post_position: 1,
            state: ContentState::Active,
            deleted_reason: None,
            is_edited: false,
            edited_at: None,
            edit_reason: None,
            reactions_count: 0,
            created_at: new_post.created_at,
            updated_at: new_post.created_at,
        };
        (thread, post)
    }

    fn service(
        hunts: MockHuntRepository,
        threads: MockThreadRepository,
        slugs: MockSlugRepository,
        cache: MockListingCache,
    ) -> ThreadService {
        ThreadService::new(
            Arc::new(hunts),
            Arc::new(threads),
            SlugGenerator::new(Arc::new(slugs)),
            Arc::new(cache),
            Arc::new(fixed_clock(t0())),
        )
    }

    fn free_slugs() -> MockSlugRepository {
        let mut slugs = MockSlugRepository::new();
        slugs.expect_slug_exists().returning(|_, _| Ok(false));
        slugs
    }

    #[tokio::test]
    async fn create_thread_requires_sign_in() {
        let svc = service(
            MockHuntRepository::new(),
            MockThreadRepository::new(),
            MockSlugRepository::new(),
            MockListingCache::new(),
        );
        let err = svc
            .create_thread(
                &RequestContext::anonymous(),
                CreateThread {
                    enigma_id: Uuid::new_v4(),
                    title: "A proper title".into(),
                    content: "body".into(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::Unauthenticated);
    }

    #[tokio::test]
    async fn create_thread_rejects_short_title() {
        let svc = service(
            MockHuntRepository::new(),
            MockThreadRepository::new(),
            MockSlugRepository::new(),
            MockListingCache::new(),
        );
        let ctx = RequestContext::signed_in(Actor::new(Uuid::new_v4(), Role::User));
        let err = svc
            .create_thread(
                &ctx,
                CreateThread {
                    enigma_id: Uuid::new_v4(),
                    title: "Hey".into(),
                    content: "body".into(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn create_thread_writes_thread_and_opening_post_together() {
        let author = Uuid::new_v4();
        let enigma_id = Uuid::new_v4();

        let mut hunts = MockHuntRepository::new();
        hunts
            .expect_find_enigma()
            .returning(move |id| Ok(Some(enigma(id))));

        let mut threads = MockThreadRepository::new();
        threads
            .expect_create_thread_with_first_post()
            .times(1)
            .withf(move |t, p| {
                t.author_id == author
                    && p.author_id == author
                    && p.thread_id == t.id
                    && t.slug == "my-first-enigma-theory"
                    && p.parent_post_id.is_none()
            })
            .returning(|t, p| Ok(stored(&t, &p)));

        let svc = service(hunts, threads, free_slugs(), quiet_cache());
        let ctx = RequestContext::signed_in(Actor::new(author, Role::User));
        let created = svc
            .create_thread(
                &ctx,
                CreateThread {
                    enigma_id,
                    title: "My first enigma theory".into(),
                    content: "Check this out".into(),
                },
            )
            .await
            .unwrap();

        assert_eq!(created.thread.slug, "my-first-enigma-theory");
        assert_eq!(created.first_post.post_position, 1);
        assert_eq!(created.first_post.author_id, author);
    }

    #[tokio::test]
    async fn create_thread_regenerates_slug_after_insert_conflict() {
        let mut hunts = MockHuntRepository::new();
        hunts
            .expect_find_enigma()
            .returning(|id| Ok(Some(enigma(id))));

        let calls = Arc::new(AtomicUsize::new(0));
        let mut threads = MockThreadRepository::new();
        threads
            .expect_create_thread_with_first_post()
            .times(2)
            .returning(move |t, p| {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(DomainError::Conflict("slug taken".into()))
                } else {
                    Ok(stored(&t, &p))
                }
            });

        let svc = service(hunts, threads, free_slugs(), quiet_cache());
        let ctx = RequestContext::signed_in(Actor::new(Uuid::new_v4(), Role::User));
        let created = svc
            .create_thread(
                &ctx,
                CreateThread {
                    enigma_id: Uuid::new_v4(),
                    title: "Racing titles".into(),
                    content: "first!".into(),
                },
            )
            .await;
        tokio_test::assert_ok!(created);
    }

    #[tokio::test]
    async fn toggles_are_moderator_only() {
        let svc = service(
            MockHuntRepository::new(),
            MockThreadRepository::new(),
            MockSlugRepository::new(),
            MockListingCache::new(),
        );
        let ctx = RequestContext::signed_in(Actor::new(Uuid::new_v4(), Role::User));
        let err = svc.toggle_thread_pin(&ctx, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, DomainError::Permission(_)));
    }

    #[tokio::test]
    async fn toggle_lock_on_missing_thread_is_not_found() {
        let mut threads = MockThreadRepository::new();
        threads
            .expect_toggle_thread_flag()
            .returning(|id, _, _| Err(DomainError::not_found("thread", id)));
        let svc = service(
            MockHuntRepository::new(),
            threads,
            MockSlugRepository::new(),
            MockListingCache::new(),
        );
        let ctx = RequestContext::signed_in(Actor::new(Uuid::new_v4(), Role::Moderator));
        let err = svc.toggle_thread_lock(&ctx, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn stranger_cannot_delete_thread() {
        let existing = thread(Uuid::new_v4());
        let mut threads = MockThreadRepository::new();
        let found = existing.clone();
        threads
            .expect_find_thread()
            .returning(move |_| Ok(Some(found.clone())));
        threads.expect_soft_delete_thread().never();

        let svc = service(
            MockHuntRepository::new(),
            threads,
            MockSlugRepository::new(),
            MockListingCache::new(),
        );
        let ctx = RequestContext::signed_in(Actor::new(Uuid::new_v4(), Role::User));
        let err = svc
            .delete_thread(&ctx, existing.id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Permission(_)));
    }

    #[tokio::test]
    async fn deleted_thread_is_hidden_from_its_author() {
        let author = Uuid::new_v4();
        let mut existing = thread(author);
        existing.state = ContentState::Deleted;
        let mut threads = MockThreadRepository::new();
        threads
            .expect_find_thread()
            .returning(move |_| Ok(Some(existing.clone())));

        let svc = service(
            MockHuntRepository::new(),
            threads,
            MockSlugRepository::new(),
            MockListingCache::new(),
        );
        let ctx = RequestContext::signed_in(Actor::new(author, Role::User));
        let err = svc
            .update_thread(
                &ctx,
                Uuid::new_v4(),
                ThreadPatch {
                    title: Some("New title here".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }
}
