//! # Post Lifecycle Manager
//!
//! Replies, edits and soft deletion of posts.
//!
//! Rules:
//! - a locked thread refuses new posts from everyone, moderators included;
//! - authors edit within a fixed window counted from creation, moderators
//!   at any time;
//! - the opening post (position 1) is never deleted here, the thread is.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use domains::{
    Clock, DomainError, DomainResult, ListingCache, NewPost, Post, PostEdit, PostRepository,
    RequestContext, ThreadRepository,
};

use crate::authz::{can_moderate, require_owner_or_moderator};
use crate::content::{optional_text, render_html, validate_post_content};
use crate::mark_listings_stale;
use crate::threads::find_visible_thread;

const MAX_EDIT_REASON_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePost {
    pub thread_id: Uuid,
    pub content: String,
    pub parent_post_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatePost {
    pub content: String,
    pub edit_reason: Option<String>,
}

/// True while `now` is at most `window_minutes` after `created_at`.
/// Editing does not move `created_at`, so the window never renews.
pub fn within_edit_window(created_at: DateTime<Utc>, now: DateTime<Utc>, window_minutes: i64) -> bool {
    now - created_at <= Duration::minutes(window_minutes)
}

#[derive(Clone)]
pub struct PostService {
    threads: Arc<dyn ThreadRepository>,
    posts: Arc<dyn PostRepository>,
    cache: Arc<dyn ListingCache>,
    clock: Arc<dyn Clock>,
    edit_window_minutes: i64,
}

impl PostService {
    pub fn new(
        threads: Arc<dyn ThreadRepository>,
        posts: Arc<dyn PostRepository>,
        cache: Arc<dyn ListingCache>,
        clock: Arc<dyn Clock>,
        edit_window_minutes: i64,
    ) -> Self {
        Self {
            threads,
            posts,
            cache,
            clock,
            edit_window_minutes,
        }
    }

    pub async fn create_post(&self, ctx: &RequestContext, input: CreatePost) -> DomainResult<Post> {
        let actor = ctx.contributor()?;
        validate_post_content(&input.content)?;

        let thread = self
            .threads
            .find_thread(input.thread_id)
            .await?
            .filter(|thread| !thread.state.is_deleted())
            .ok_or_else(|| DomainError::not_found("thread", input.thread_id))?;

        if thread.is_locked {
            warn!(thread_id = %thread.id, actor_id = %actor.id, "post refused on locked thread");
            return Err(DomainError::ThreadLocked);
        }

        if let Some(parent_id) = input.parent_post_id {
            let parent = self
                .posts
                .find_post(parent_id)
                .await?
                .ok_or_else(|| DomainError::not_found("post", parent_id))?;
            if parent.thread_id != thread.id {
                return Err(DomainError::validation(
                    "a reply must target a post of the same thread",
                ));
            }
        }

        let post = self
            .posts
            .append_post(NewPost {
                id: Uuid::new_v4(),
                thread_id: thread.id,
                author_id: actor.id,
                parent_post_id: input.parent_post_id,
                content_html: render_html(&input.content),
                content: input.content,
                created_at: self.clock.now(),
            })
            .await?;

        info!(
            post_id = %post.id,
            thread_id = %thread.id,
            position = post.post_position,
            author_id = %actor.id,
            "post created"
        );
        mark_listings_stale(self.cache.as_ref()).await;
        Ok(post)
    }

    pub async fn update_post(
        &self,
        ctx: &RequestContext,
        post_id: Uuid,
        input: UpdatePost,
    ) -> DomainResult<Post> {
        let actor = ctx.contributor()?;
        validate_post_content(&input.content)?;
        let edit_reason = optional_text(input.edit_reason, "edit reason", MAX_EDIT_REASON_CHARS)?;

        let moderator = can_moderate(actor.role);
        let post = self
            .posts
            .find_post(post_id)
            .await?
            .filter(|post| !post.state.is_deleted() || moderator)
            .ok_or_else(|| DomainError::not_found("post", post_id))?;
        find_visible_thread(self.threads.as_ref(), post.thread_id, moderator).await?;

        require_owner_or_moderator(actor, post.author_id, "edit this post")?;

        let now = self.clock.now();
        if !moderator && !within_edit_window(post.created_at, now, self.edit_window_minutes) {
            warn!(%post_id, actor_id = %actor.id, "edit refused, window expired");
            return Err(DomainError::EditWindowExpired {
                minutes: self.edit_window_minutes,
            });
        }

        let updated = self
            .posts
            .edit_post(
                post_id,
                PostEdit {
                    content_html: render_html(&input.content),
                    content: input.content,
                    edit_reason,
                    edited_at: now,
                },
            )
            .await?;

        info!(%post_id, actor_id = %actor.id, moderator, "post edited");
        mark_listings_stale(self.cache.as_ref()).await;
        Ok(updated)
    }

    /// Soft delete by the author or a moderator. The opening post is refused
    /// for every role.
    pub async fn delete_post(
        &self,
        ctx: &RequestContext,
        post_id: Uuid,
        reason: Option<String>,
    ) -> DomainResult<()> {
        let actor = ctx.actor()?;
        let post = self
            .posts
            .find_post(post_id)
            .await?
            .ok_or_else(|| DomainError::not_found("post", post_id))?;

        if post.is_opening_post() {
            warn!(%post_id, actor_id = %actor.id, "refused to delete opening post");
            return Err(DomainError::InvariantViolation(
                "the first post of a thread cannot be deleted, delete the thread instead".into(),
            ));
        }

        require_owner_or_moderator(actor, post.author_id, "delete this post")?;

        let changed = self
            .posts
            .soft_delete_post(post_id, reason, self.clock.now())
            .await?;
        if changed {
            info!(%post_id, actor_id = %actor.id, "post deleted");
            mark_listings_stale(self.cache.as_ref()).await;
        }
        Ok(())
    }
}
