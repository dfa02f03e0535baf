//! # services
//!
//! The forum core: lifecycle managers for threads and posts, the reaction
//! toggle, moderation authorization, slug generation and read views.
//! Services depend only on the ports declared in `domains`.

pub mod accounts;
pub mod authz;
pub mod catalog;
pub mod content;
pub mod moderation;
pub mod posts;
pub mod reactions;
pub mod read_views;
pub mod reports;
pub mod slug;
pub mod threads;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::error;

use domains::{
    Clock, HuntRepository, IdentityProvider, ListingCache, PostRepository, ProfileRepository,
    ReactionRepository, ReportRepository, SlugRepository, StatsRepository, ThreadRepository,
    DEFAULT_EDIT_WINDOW_MINUTES,
};

pub use accounts::AccountService;
pub use catalog::CatalogService;
pub use moderation::ModerationService;
pub use posts::PostService;
pub use reactions::ReactionService;
pub use read_views::ReadViews;
pub use reports::ReportService;
pub use slug::SlugGenerator;
pub use threads::ThreadService;

/// Tunables of the forum core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForumSettings {
    pub edit_window_minutes: i64,
    pub threads_page_size: u32,
    pub posts_page_size: u32,
}

impl Default for ForumSettings {
    fn default() -> Self {
        Self {
            edit_window_minutes: DEFAULT_EDIT_WINDOW_MINUTES,
            threads_page_size: 20,
            posts_page_size: 20,
        }
    }
}

/// Every adapter the core talks to.
#[derive(Clone)]
pub struct Ports {
    pub profiles: Arc<dyn ProfileRepository>,
    pub hunts: Arc<dyn HuntRepository>,
    pub slugs: Arc<dyn SlugRepository>,
    pub threads: Arc<dyn ThreadRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub reactions: Arc<dyn ReactionRepository>,
    pub reports: Arc<dyn ReportRepository>,
    pub stats: Arc<dyn StatsRepository>,
    pub identity: Arc<dyn IdentityProvider>,
    pub cache: Arc<dyn ListingCache>,
    pub clock: Arc<dyn Clock>,
}

impl Ports {
    /// Every repository port served by one store.
    pub fn from_store<S>(
        store: Arc<S>,
        identity: Arc<dyn IdentityProvider>,
        cache: Arc<dyn ListingCache>,
        clock: Arc<dyn Clock>,
    ) -> Self
    where
        S: ProfileRepository
            + HuntRepository
            + SlugRepository
            + ThreadRepository
            + PostRepository
            + ReactionRepository
            + ReportRepository
            + StatsRepository
            + 'static,
    {
        Ports {
            profiles: store.clone(),
            hunts: store.clone(),
            slugs: store.clone(),
            threads: store.clone(),
            posts: store.clone(),
            reactions: store.clone(),
            reports: store.clone(),
            stats: store,
            identity,
            cache,
            clock,
        }
    }
}

/// All services wired against one set of ports.
#[derive(Clone)]
pub struct ForumServices {
    pub accounts: AccountService,
    pub catalog: CatalogService,
    pub threads: ThreadService,
    pub posts: PostService,
    pub reactions: ReactionService,
    pub reports: ReportService,
    pub moderation: ModerationService,
    pub read: ReadViews,
}

impl ForumServices {
    pub fn new(ports: Ports, settings: ForumSettings) -> Self {
        let slugs = SlugGenerator::new(ports.slugs.clone());
        Self {
            accounts: AccountService::new(
                ports.identity.clone(),
                ports.profiles.clone(),
                ports.clock.clone(),
            ),
            catalog: CatalogService::new(
                ports.hunts.clone(),
                slugs.clone(),
                ports.cache.clone(),
                ports.clock.clone(),
            ),
            threads: ThreadService::new(
                ports.hunts.clone(),
                ports.threads.clone(),
                slugs,
                ports.cache.clone(),
                ports.clock.clone(),
            ),
            posts: PostService::new(
                ports.threads.clone(),
                ports.posts.clone(),
                ports.cache.clone(),
                ports.clock.clone(),
                settings.edit_window_minutes,
            ),
            reactions: ReactionService::new(
                ports.threads.clone(),
                ports.posts.clone(),
                ports.reactions.clone(),
                ports.cache.clone(),
                ports.clock.clone(),
            ),
            reports: ReportService::new(
                ports.reports.clone(),
                ports.threads.clone(),
                ports.posts.clone(),
                ports.profiles.clone(),
                ports.clock.clone(),
            ),
            moderation: ModerationService::new(ports.profiles.clone(), ports.clock.clone()),
            read: ReadViews::new(
                ports.hunts,
                ports.threads,
                ports.posts,
                ports.stats,
                ports.cache,
                settings,
            ),
        }
    }
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Marks cached listings stale after a mutation. The mutation has already
/// been committed, so a cache failure is logged rather than returned.
pub(crate) async fn mark_listings_stale(cache: &dyn ListingCache) {
    if let Err(err) = cache.invalidate_listings().await {
        error!(error = %err, "failed to invalidate forum listings");
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{DateTime, TimeZone, Utc};
    use domains::{MockClock, MockListingCache};

    pub fn fixed_clock(at: DateTime<Utc>) -> MockClock {
        let mut clock = MockClock::new();
        clock.expect_now().return_const(at);
        clock
    }

    pub fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    pub fn quiet_cache() -> MockListingCache {
        let mut cache = MockListingCache::new();
        cache.expect_invalidate_listings().returning(|| Ok(()));
        cache
    }
}
