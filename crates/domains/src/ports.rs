//! # Ports
//!
//! Contracts the forum core consumes. Storage, identity and cache adapters
//! implement these; services only ever see the traits.
//!
//! Methods that change several rows (a thread and its first post, a post and
//! the counters it feeds, a reaction and `reactions_count`) are single calls so
//! the adapter can run them as one atomic unit.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::DomainResult;
use crate::models::{
    AuthUser, BanRecord, Credentials, Enigma, ForumStats, Hunt, NewEnigma, NewHunt, NewPost,
    NewProfile, NewReport, NewThread, Post, PostEdit, PostReaction, PostView, Profile,
    ProfilePatch, ReactionKind, ReactionOutcome, Report, ReportReview, Role, Session,
    SlugNamespace, Thread, ThreadCursor, ThreadFlag, ThreadPatch, ThreadSummary,
};

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn find_profile(&self, id: Uuid) -> DomainResult<Option<Profile>>;
    async fn find_profile_by_username(&self, username: &str) -> DomainResult<Option<Profile>>;
    /// Fails with `Conflict` when the username is taken.
    async fn insert_profile(&self, profile: NewProfile) -> DomainResult<Profile>;
    async fn update_profile(
        &self,
        id: Uuid,
        patch: ProfilePatch,
        at: DateTime<Utc>,
    ) -> DomainResult<Profile>;
    /// `None` lifts the ban.
    async fn set_ban(
        &self,
        id: Uuid,
        ban: Option<BanRecord>,
        at: DateTime<Utc>,
    ) -> DomainResult<Profile>;
    async fn set_role(&self, id: Uuid, role: Role, at: DateTime<Utc>) -> DomainResult<Profile>;
    async fn touch_last_seen(&self, id: Uuid, at: DateTime<Utc>) -> DomainResult<()>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait HuntRepository: Send + Sync {
    /// Active hunts, featured first, newest first.
    async fn list_active_hunts(&self) -> DomainResult<Vec<Hunt>>;
    async fn find_hunt(&self, id: Uuid) -> DomainResult<Option<Hunt>>;
    async fn find_hunt_by_slug(&self, slug: &str) -> DomainResult<Option<Hunt>>;
    async fn insert_hunt(&self, hunt: NewHunt) -> DomainResult<Hunt>;
    /// Active enigmas of a hunt ordered by `order_index`.
    async fn list_enigmas(&self, hunt_id: Uuid) -> DomainResult<Vec<Enigma>>;
    async fn find_enigma(&self, id: Uuid) -> DomainResult<Option<Enigma>>;
    async fn find_enigma_by_slug(&self, hunt_id: Uuid, slug: &str)
        -> DomainResult<Option<Enigma>>;
    /// Also bumps the hunt's `enigmas_count`.
    async fn insert_enigma(&self, enigma: NewEnigma) -> DomainResult<Enigma>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait SlugRepository: Send + Sync {
    async fn slug_exists(&self, namespace: &SlugNamespace, slug: &str) -> DomainResult<bool>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ThreadRepository: Send + Sync {
    /// Inserts the thread and its opening post (position 1) atomically and
    /// bumps enigma, hunt and author counters. `Conflict` when the slug is taken.
    async fn create_thread_with_first_post(
        &self,
        thread: NewThread,
        first_post: NewPost,
    ) -> DomainResult<(Thread, Post)>;
    async fn find_thread(&self, id: Uuid) -> DomainResult<Option<Thread>>;
    async fn find_thread_by_slug(&self, enigma_id: Uuid, slug: &str)
        -> DomainResult<Option<Thread>>;
    async fn update_thread(
        &self,
        id: Uuid,
        patch: ThreadPatch,
        at: DateTime<Utc>,
    ) -> DomainResult<Thread>;
    /// Flips the flag in place and returns its new value.
    async fn toggle_thread_flag(
        &self,
        id: Uuid,
        flag: ThreadFlag,
        at: DateTime<Utc>,
    ) -> DomainResult<bool>;
    /// Returns false when the thread was already deleted.
    async fn soft_delete_thread(
        &self,
        id: Uuid,
        reason: Option<String>,
        at: DateTime<Utc>,
    ) -> DomainResult<bool>;
    async fn increment_views(&self, id: Uuid) -> DomainResult<()>;
    async fn threads_page(
        &self,
        enigma_id: Uuid,
        after: Option<ThreadCursor>,
        limit: u32,
    ) -> DomainResult<Vec<ThreadSummary>>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Assigns the next position of the thread and inserts the post in one
    /// unit, updating thread, enigma, hunt and author counters.
    /// Fails with `ThreadLocked` if the thread is locked at insert time and
    /// `NotFound` if it is missing or deleted.
    async fn append_post(&self, post: NewPost) -> DomainResult<Post>;
    async fn find_post(&self, id: Uuid) -> DomainResult<Option<Post>>;
    async fn edit_post(&self, id: Uuid, edit: PostEdit) -> DomainResult<Post>;
    /// Returns false when the post was already deleted.
    async fn soft_delete_post(
        &self,
        id: Uuid,
        reason: Option<String>,
        at: DateTime<Utc>,
    ) -> DomainResult<bool>;
    async fn posts_page(&self, thread_id: Uuid, offset: u32, limit: u32)
        -> DomainResult<Vec<PostView>>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ReactionRepository: Send + Sync {
    /// Deletes the (user, post, kind) row if present, inserts it otherwise, and
    /// moves the post's and thread's `reactions_count` in the same unit.
    async fn toggle_reaction(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        kind: ReactionKind,
        at: DateTime<Utc>,
    ) -> DomainResult<ReactionOutcome>;
    async fn reactions_for_post(&self, post_id: Uuid) -> DomainResult<Vec<PostReaction>>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ReportRepository: Send + Sync {
    async fn insert_report(&self, report: NewReport) -> DomainResult<Report>;
    async fn find_report(&self, id: Uuid) -> DomainResult<Option<Report>>;
    /// Oldest first.
    async fn pending_reports(&self, limit: u32) -> DomainResult<Vec<Report>>;
    async fn review_report(&self, id: Uuid, review: ReportReview) -> DomainResult<Report>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait StatsRepository: Send + Sync {
    async fn forum_stats(&self) -> DomainResult<ForumStats>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// `Conflict` when the e-mail is already registered.
    async fn insert_credentials(&self, credentials: Credentials) -> DomainResult<()>;
    async fn find_credentials_by_email(&self, email: &str) -> DomainResult<Option<Credentials>>;
    async fn find_credentials(&self, user_id: Uuid) -> DomainResult<Option<Credentials>>;
    async fn update_password_hash(&self, user_id: Uuid, password_hash: String)
        -> DomainResult<()>;
}

/// The identity service: account registration, sign-in and token resolution.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn register(&self, email: &str, password: &str) -> DomainResult<AuthUser>;
    /// `Permission` on bad credentials.
    async fn authenticate(&self, email: &str, password: &str) -> DomainResult<Session>;
    /// `None` for an invalid or expired token.
    async fn current_user(&self, access_token: &str) -> DomainResult<Option<AuthUser>>;
    async fn change_password(&self, user_id: Uuid, password: &str) -> DomainResult<()>;
}

/// Cached listing views that mutations mark stale.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ListingCache: Send + Sync {
    /// Starts a new listings generation; nothing stored under an older one
    /// is served again.
    async fn invalidate_listings(&self) -> DomainResult<()>;
    async fn listings_generation(&self) -> DomainResult<u64>;
    async fn cached_stats(&self) -> DomainResult<Option<ForumStats>>;
    /// Stores stats computed while `generation` was current.
    async fn store_stats(&self, stats: ForumStats, generation: u64) -> DomainResult<()>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
