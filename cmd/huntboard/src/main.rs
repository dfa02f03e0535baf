//! # huntboard
//!
//! The server binary. Storage, token and cache backends are chosen from
//! compile-time features and the runtime settings; anything not configured
//! falls back to the in-process implementation.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use api_adapters::{router, AppState, HttpSettings};
use auth_adapters::{LocalIdentityProvider, MemorySessions, TokenIssuer};
use configs::Settings;
use domains::{Clock, CredentialStore, ListingCache};
use services::{ForumServices, ForumSettings, Ports, SystemClock};
use storage_adapters::{MemoryListingCache, MemoryStore};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let settings = Settings::load().context("failed to load configuration")?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let services = build_services(&settings, clock).await?;

    let http = HttpSettings {
        request_timeout: Duration::from_secs(settings.server.request_timeout_secs),
        body_limit_bytes: settings.server.body_limit_bytes,
    };
    let app = router(AppState::new(services), http);

    api_adapters::serve(settings.server.addr, app)
        .await
        .context("HTTP server failed")?;
    info!("server stopped");
    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_target(false)
        .init();
}

async fn build_services(settings: &Settings, clock: Arc<dyn Clock>) -> Result<ForumServices> {
    let tokens = token_issuer(settings)?;
    let cache = listing_cache(settings)?;

    #[cfg(feature = "db-postgres")]
    if let Some(url) = &settings.database.url {
        use secrecy::ExposeSecret;
        use storage_adapters::PgForumStore;

        let store = PgForumStore::connect(url.expose_secret(), settings.database.max_connections)
            .await
            .context("failed to connect to PostgreSQL")?;
        if settings.database.run_migrations {
            store.migrate().await.context("failed to run migrations")?;
        }
        store
            .check_ready()
            .await
            .context("PostgreSQL is not answering")?;
        info!("using PostgreSQL storage");
        return Ok(wire(Arc::new(store), tokens, cache, clock, settings));
    }

    if settings.database.url.is_some() {
        warn!("database.url is set but this build has no PostgreSQL support");
    }
    warn!("no database configured, all data is kept in memory and lost on restart");
    Ok(wire(Arc::new(MemoryStore::new()), tokens, cache, clock, settings))
}

fn wire<S>(
    store: Arc<S>,
    tokens: Arc<dyn TokenIssuer>,
    cache: Arc<dyn ListingCache>,
    clock: Arc<dyn Clock>,
    settings: &Settings,
) -> ForumServices
where
    S: CredentialStore
        + domains::ProfileRepository
        + domains::HuntRepository
        + domains::SlugRepository
        + domains::ThreadRepository
        + domains::PostRepository
        + domains::ReactionRepository
        + domains::ReportRepository
        + domains::StatsRepository
        + 'static,
{
    let identity = LocalIdentityProvider::new(store.clone(), tokens, clock.clone());
    let ports = Ports::from_store(store, Arc::new(identity), cache, clock);
    let forum = settings.forum;
    ForumServices::new(
        ports,
        ForumSettings {
            edit_window_minutes: forum.edit_window_minutes,
            threads_page_size: forum.threads_page_size,
            posts_page_size: forum.posts_page_size,
        },
    )
}

fn token_issuer(settings: &Settings) -> Result<Arc<dyn TokenIssuer>> {
    #[cfg(feature = "auth-jwt")]
    if let Some(secret) = &settings.auth.jwt_secret {
        use auth_adapters::{JwtConfig, JwtTokens};
        use secrecy::ExposeSecret;

        info!("issuing JWT access tokens");
        return Ok(Arc::new(JwtTokens::new(JwtConfig {
            issuer: settings.auth.issuer.clone(),
            audience: settings.auth.audience.clone(),
            secret: secret.expose_secret().to_string(),
            ttl_seconds: settings.auth.token_ttl_secs,
        })));
    }

    let ttl = i64::try_from(settings.auth.token_ttl_secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .context("auth.token_ttl_secs is out of range")?;
    warn!("no JWT secret configured, sessions are kept in memory");
    Ok(Arc::new(MemorySessions::new(ttl)))
}

fn listing_cache(settings: &Settings) -> Result<Arc<dyn ListingCache>> {
    let ttl = Duration::from_secs(settings.redis.cache_ttl_secs);

    #[cfg(feature = "redis")]
    if let Some(url) = &settings.redis.url {
        use secrecy::ExposeSecret;
        use storage_adapters::RedisListingCache;

        let cache = RedisListingCache::connect(url.expose_secret())
            .context("invalid Redis configuration")?
            .with_ttl(ttl);
        info!("using Redis listing cache");
        return Ok(Arc::new(cache));
    }

    Ok(Arc::new(MemoryListingCache::new().with_ttl(ttl)))
}
