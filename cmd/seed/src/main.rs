//! # seed
//!
//! Creates the first admin account and a sample hunt in the configured
//! PostgreSQL database. Safe to run more than once.
//!
//! ```text
//! SEED_ADMIN_EMAIL=admin@example.com SEED_ADMIN_PASSWORD=... cargo run -p seed
//! ```

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use secrecy::ExposeSecret;
use tracing::info;

use auth_adapters::{LocalIdentityProvider, MemorySessions};
use configs::Settings;
use domains::{Actor, Clock, DomainError, ProfileRepository, RequestContext, Role};
use services::accounts::SignUp;
use services::catalog::{CreateEnigma, CreateHunt};
use services::{ForumServices, ForumSettings, Ports, SystemClock};
use storage_adapters::{MemoryListingCache, PgForumStore};

const SAMPLE_HUNT: &str = "The Golden Owl";
const SAMPLE_ENIGMAS: [(&str, &str); 3] = [
    ("1", "The Path of the Owl"),
    ("2", "Sun and Moon"),
    ("3", "The Hidden Verse"),
];

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let settings = Settings::load().context("failed to load configuration")?;
    let Some(url) = &settings.database.url else {
        bail!("database.url is not set; nothing to seed");
    };
    let store = Arc::new(
        PgForumStore::connect(url.expose_secret(), settings.database.max_connections)
            .await
            .context("failed to connect to PostgreSQL")?,
    );
    store.migrate().await.context("failed to run migrations")?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let identity = LocalIdentityProvider::new(
        store.clone(),
        Arc::new(MemorySessions::new(chrono::Duration::minutes(5))),
        clock.clone(),
    );
    let ports = Ports::from_store(
        store.clone(),
        Arc::new(identity),
        Arc::new(MemoryListingCache::new()),
        clock.clone(),
    );
    let services = ForumServices::new(ports, ForumSettings::default());

    let admin = ensure_admin(&services, &store, clock.as_ref()).await?;
    seed_hunt(&services, &admin).await?;
    info!("seed complete");
    Ok(())
}

async fn ensure_admin(
    services: &ForumServices,
    store: &PgForumStore,
    clock: &dyn Clock,
) -> Result<RequestContext> {
    let username = std::env::var("SEED_ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());

    let profile = match store.find_profile_by_username(&username).await? {
        Some(profile) => {
            info!(%username, "admin account already exists");
            profile
        }
        None => {
            let email = std::env::var("SEED_ADMIN_EMAIL").context("SEED_ADMIN_EMAIL must be set")?;
            let password =
                std::env::var("SEED_ADMIN_PASSWORD").context("SEED_ADMIN_PASSWORD must be set")?;
            let profile = services
                .accounts
                .sign_up(SignUp {
                    email,
                    password,
                    username: username.clone(),
                })
                .await?;
            info!(%username, "admin account created");
            profile
        }
    };

    if profile.role != Role::Admin {
        store.set_role(profile.id, Role::Admin, clock.now()).await?;
    }
    Ok(RequestContext::signed_in(Actor::new(profile.id, Role::Admin)))
}

async fn seed_hunt(services: &ForumServices, admin: &RequestContext) -> Result<()> {
    let hunt = match services.read.hunt_by_slug("the-golden-owl").await {
        Ok(hunt) => {
            info!(slug = %hunt.slug, "sample hunt already exists");
            return Ok(());
        }
        Err(DomainError::NotFound { .. }) => {
            services
                .catalog
                .create_hunt(
                    admin,
                    CreateHunt {
                        name: SAMPLE_HUNT.to_string(),
                        description: Some("An armchair treasure hunt running since 1993.".into()),
                        is_featured: true,
                        difficulty: None,
                    },
                )
                .await?
        }
        Err(err) => return Err(err.into()),
    };

    for (index, (number, title)) in SAMPLE_ENIGMAS.into_iter().enumerate() {
        let enigma = services
            .catalog
            .create_enigma(
                admin,
                hunt.id,
                CreateEnigma {
                    number: number.to_string(),
                    title: title.to_string(),
                    description: None,
                    order_index: i32::try_from(index)?,
                },
            )
            .await?;
        info!(slug = %enigma.slug, "sample enigma created");
    }
    info!(slug = %hunt.slug, "sample hunt created");
    Ok(())
}
