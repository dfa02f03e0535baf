//! # Reaction Toggle
//!
//! Adds or removes one (user, post, kind) reaction. Calling twice restores
//! the previous state; kinds are independent of each other.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use domains::{
    Clock, DomainError, DomainResult, ListingCache, PostReaction, PostRepository, ReactionKind,
    ReactionOutcome, ReactionRepository, RequestContext, ThreadRepository,
};

use crate::mark_listings_stale;
use crate::threads::find_visible_thread;

#[derive(Clone)]
pub struct ReactionService {
    threads: Arc<dyn ThreadRepository>,
    posts: Arc<dyn PostRepository>,
    reactions: Arc<dyn ReactionRepository>,
    cache: Arc<dyn ListingCache>,
    clock: Arc<dyn Clock>,
}

impl ReactionService {
    pub fn new(
        threads: Arc<dyn ThreadRepository>,
        posts: Arc<dyn PostRepository>,
        reactions: Arc<dyn ReactionRepository>,
        cache: Arc<dyn ListingCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            threads,
            posts,
            reactions,
            cache,
            clock,
        }
    }

    pub async fn toggle_post_reaction(
        &self,
        ctx: &RequestContext,
        post_id: Uuid,
        kind: ReactionKind,
    ) -> DomainResult<ReactionOutcome> {
        let actor = ctx.contributor()?;
        let post = self
            .posts
            .find_post(post_id)
            .await?
            .filter(|post| !post.state.is_deleted())
            .ok_or_else(|| DomainError::not_found("post", post_id))?;
        find_visible_thread(self.threads.as_ref(), post.thread_id, false).await?;

        let outcome = self
            .reactions
            .toggle_reaction(actor.id, post_id, kind, self.clock.now())
            .await?;

        info!(%post_id, actor_id = %actor.id, %kind, ?outcome, "reaction toggled");
        mark_listings_stale(self.cache.as_ref()).await;
        Ok(outcome)
    }

    pub async fn reactions(&self, post_id: Uuid) -> DomainResult<Vec<PostReaction>> {
        self.reactions.reactions_for_post(post_id).await
    }
}
