//! # Read Views
//!
//! Listings and aggregate counts consumed by the presentation layer.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};
use uuid::Uuid;

use domains::{
    DomainError, DomainResult, Enigma, ForumStats, Hunt, HuntRepository, ListingCache,
    PostRepository, PostView, RequestContext, StatsRepository, Thread, ThreadCursor,
    ThreadRepository, ThreadSummary,
};

use crate::authz::is_moderating;
use crate::threads::find_visible_thread;
use crate::ForumSettings;

pub const MAX_THREADS_PAGE: u32 = 50;
pub const MAX_POSTS_PAGE: u32 = 100;
const FEATURED_HUNTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadsPage {
    pub threads: Vec<ThreadSummary>,
    /// Opaque; pass back to fetch the following page.
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostsPage {
    pub posts: Vec<PostView>,
    pub page: u32,
    pub limit: u32,
}

pub fn encode_cursor(cursor: &ThreadCursor) -> String {
    // serializing a struct of plain fields cannot fail
    let json = serde_json::to_vec(cursor).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(json)
}

pub fn decode_cursor(raw: &str) -> DomainResult<ThreadCursor> {
    let bytes = URL_SAFE_NO_PAD
        .decode(raw)
        .map_err(|_| DomainError::validation("invalid page cursor"))?;
    serde_json::from_slice(&bytes).map_err(|_| DomainError::validation("invalid page cursor"))
}

#[derive(Clone)]
pub struct ReadViews {
    hunts: Arc<dyn HuntRepository>,
    threads: Arc<dyn ThreadRepository>,
    posts: Arc<dyn PostRepository>,
    stats: Arc<dyn StatsRepository>,
    cache: Arc<dyn ListingCache>,
    settings: ForumSettings,
}

impl ReadViews {
    pub fn new(
        hunts: Arc<dyn HuntRepository>,
        threads: Arc<dyn ThreadRepository>,
        posts: Arc<dyn PostRepository>,
        stats: Arc<dyn StatsRepository>,
        cache: Arc<dyn ListingCache>,
        settings: ForumSettings,
    ) -> Self {
        Self {
            hunts,
            threads,
            posts,
            stats,
            cache,
            settings,
        }
    }

    pub async fn list_hunts(&self) -> DomainResult<Vec<Hunt>> {
        self.hunts.list_active_hunts().await
    }

    pub async fn featured_hunts(&self) -> DomainResult<Vec<Hunt>> {
        let hunts = self.hunts.list_active_hunts().await?;
        Ok(hunts
            .into_iter()
            .filter(|hunt| hunt.is_featured)
            .take(FEATURED_HUNTS)
            .collect())
    }

    pub async fn hunt_by_slug(&self, slug: &str) -> DomainResult<Hunt> {
        self.hunts
            .find_hunt_by_slug(slug)
            .await?
            .filter(|hunt| hunt.is_active)
            .ok_or_else(|| DomainError::not_found("hunt", slug))
    }

    pub async fn enigmas_by_hunt(&self, hunt_slug: &str) -> DomainResult<Vec<Enigma>> {
        let hunt = self.hunt_by_slug(hunt_slug).await?;
        self.hunts.list_enigmas(hunt.id).await
    }

    pub async fn enigma_by_slug(&self, hunt_slug: &str, enigma_slug: &str) -> DomainResult<Enigma> {
        let hunt = self.hunt_by_slug(hunt_slug).await?;
        self.hunts
            .find_enigma_by_slug(hunt.id, enigma_slug)
            .await?
            .filter(|enigma| enigma.is_active)
            .ok_or_else(|| DomainError::not_found("enigma", enigma_slug))
    }

    /// Opens a thread by its URL path and counts the view.
    pub async fn thread_by_slug(
        &self,
        ctx: &RequestContext,
        hunt_slug: &str,
        enigma_slug: &str,
        thread_slug: &str,
    ) -> DomainResult<Thread> {
        let enigma = self.enigma_by_slug(hunt_slug, enigma_slug).await?;
        let moderator = is_moderating(ctx);
        let thread = self
            .threads
            .find_thread_by_slug(enigma.id, thread_slug)
            .await?
            .filter(|thread| !thread.state.is_deleted() || moderator)
            .ok_or_else(|| DomainError::not_found("thread", thread_slug))?;

        if let Err(err) = self.threads.increment_views(thread.id).await {
            warn!(thread_id = %thread.id, error = %err, "failed to count thread view");
        }
        Ok(thread)
    }

    /// Pinned threads first, then most recent activity.
    pub async fn threads_page(
        &self,
        enigma_id: Uuid,
        cursor: Option<&str>,
        limit: Option<u32>,
    ) -> DomainResult<ThreadsPage> {
        let limit = limit
            .unwrap_or(self.settings.threads_page_size)
            .clamp(1, MAX_THREADS_PAGE);
        let after = cursor.map(decode_cursor).transpose()?;

        let mut threads = self
            .threads
            .threads_page(enigma_id, after, limit + 1)
            .await?;
        let next_cursor = if threads.len() > limit as usize {
            threads.truncate(limit as usize);
            threads.last().map(|last| encode_cursor(&ThreadCursor::of(last)))
        } else {
            None
        };
        Ok(ThreadsPage {
            threads,
            next_cursor,
        })
    }

    /// Posts in position order. Deleted posts stay in place as blanked
    /// tombstones; a deleted thread shows its posts to moderators only.
    pub async fn posts_page(
        &self,
        ctx: &RequestContext,
        thread_id: Uuid,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> DomainResult<PostsPage> {
        find_visible_thread(self.threads.as_ref(), thread_id, is_moderating(ctx)).await?;
        let page = page.unwrap_or(1).max(1);
        let limit = limit
            .unwrap_or(self.settings.posts_page_size)
            .clamp(1, MAX_POSTS_PAGE);
        let offset = (page - 1).saturating_mul(limit);

        let mut posts = self.posts.posts_page(thread_id, offset, limit).await?;
        for post in posts.iter_mut().filter(|post| post.is_deleted) {
            post.content.clear();
            post.content_html = None;
        }
        Ok(PostsPage { posts, page, limit })
    }

    pub async fn forum_stats(&self) -> DomainResult<ForumStats> {
        match self.cache.cached_stats().await {
            Ok(Some(stats)) => {
                debug!("forum stats served from cache");
                return Ok(stats);
            }
            Ok(None) => {}
            Err(err) => error!(error = %err, "listing cache read failed"),
        }

        // read before counting, so a mutation landing meanwhile voids the store
        let generation = match self.cache.listings_generation().await {
            Ok(generation) => Some(generation),
            Err(err) => {
                error!(error = %err, "listing cache read failed");
                None
            }
        };
        let stats = self.stats.forum_stats().await?;
        if let Some(generation) = generation {
            if let Err(err) = self.cache.store_stats(stats, generation).await {
                error!(error = %err, "listing cache write failed");
            }
        }
        Ok(stats)
    }
}
