//! # integration-tests
//!
//! Shared fixtures: the full service graph wired against the in-memory store,
//! a clock the test can move, and helpers that seed users, hunts and enigmas.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};
use fake::faker::lorem::en::Sentence;
use fake::faker::name::en::FirstName;
use fake::Fake;
use uuid::Uuid;

use auth_adapters::{LocalIdentityProvider, MemorySessions};
use domains::{
    Actor, Clock, Enigma, Hunt, HuntRepository, ListingCache, NewEnigma, NewHunt, NewProfile,
    Profile, ProfileRepository, RequestContext, Role,
};
use services::{ForumServices, ForumSettings, Ports};
use storage_adapters::{MemoryListingCache, MemoryStore};

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
}

pub struct Forum {
    pub services: ForumServices,
    pub store: MemoryStore,
    pub clock: Arc<ManualClock>,
}

impl Forum {
    pub fn new() -> Self {
        Self::with_settings(ForumSettings::default())
    }

    pub fn with_settings(settings: ForumSettings) -> Self {
        Self::wired(settings, Arc::new(MemoryListingCache::new()))
    }

    /// Default settings over a caller-supplied listing cache.
    pub fn with_cache(cache: Arc<dyn ListingCache>) -> Self {
        Self::wired(ForumSettings::default(), cache)
    }

    fn wired(settings: ForumSettings, cache: Arc<dyn ListingCache>) -> Self {
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::starting_at(start_time()));
        let identity = LocalIdentityProvider::new(
            Arc::new(store.clone()),
            Arc::new(MemorySessions::new(Duration::days(7))),
            clock.clone(),
        );
        let ports = Ports::from_store(
            Arc::new(store.clone()),
            Arc::new(identity),
            cache,
            clock.clone(),
        );
        Forum {
            services: ForumServices::new(ports, settings),
            store,
            clock,
        }
    }

    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    /// A profile with the given role, bypassing sign-up and password hashing.
    pub async fn member(&self, role: Role) -> (Profile, RequestContext) {
        let name: String = FirstName().fake();
        let username: String = name
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .take(16)
            .chain(Uuid::new_v4().simple().to_string().chars().take(8))
            .collect();
        let mut profile = self
            .store
            .insert_profile(NewProfile {
                id: Uuid::new_v4(),
                display_name: Some(name),
                username,
                created_at: self.clock.now(),
            })
            .await
            .unwrap();
        if role != Role::User {
            profile = self
                .store
                .set_role(profile.id, role, self.clock.now())
                .await
                .unwrap();
        }
        let ctx = self.context_for(&profile);
        (profile, ctx)
    }

    pub fn context_for(&self, profile: &Profile) -> RequestContext {
        RequestContext::signed_in(Actor::from_profile(profile, self.clock.now()))
    }

    /// Re-reads the profile, e.g. after a ban or role change.
    pub async fn refreshed_context(&self, profile_id: Uuid) -> RequestContext {
        let profile = self.store.find_profile(profile_id).await.unwrap().unwrap();
        self.context_for(&profile)
    }

    pub async fn hunt(&self, name: &str) -> Hunt {
        self.store
            .insert_hunt(NewHunt {
                id: Uuid::new_v4(),
                slug: name.to_lowercase().replace(' ', "-"),
                name: name.to_string(),
                description: Some(Sentence(4..8).fake()),
                is_featured: false,
                difficulty: None,
                created_by: Uuid::new_v4(),
                created_at: self.clock.now(),
            })
            .await
            .unwrap()
    }

    pub async fn enigma(&self, hunt: &Hunt, number: u32) -> Enigma {
        self.store
            .insert_enigma(NewEnigma {
                id: Uuid::new_v4(),
                hunt_id: hunt.id,
                slug: format!("enigma-{number}"),
                number: number.to_string(),
                title: format!("Enigma {number}"),
                description: None,
                order_index: number as i32,
                created_at: self.clock.now(),
            })
            .await
            .unwrap()
    }

    /// A fresh hunt with one enigma.
    pub async fn board(&self) -> Enigma {
        let suffix = Uuid::new_v4().simple().to_string();
        let hunt = self.hunt(&format!("Golden Owl {}", &suffix[..8])).await;
        self.enigma(&hunt, 1).await
    }
}

impl Default for Forum {
    fn default() -> Self {
        Self::new()
    }
}

/// Post body text for tests that do not care about content.
pub fn chatter() -> String {
    Sentence(3..10).fake()
}
