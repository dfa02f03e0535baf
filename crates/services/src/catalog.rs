//! # Catalog
//!
//! Admin-only creation of hunts and their enigmas.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use domains::{
    Clock, Difficulty, DomainError, DomainResult, Enigma, Hunt, HuntRepository, ListingCache,
    NewEnigma, NewHunt, RequestContext, SlugNamespace,
};

use crate::authz::require_admin;
use crate::content::optional_text;
use crate::mark_listings_stale;
use crate::slug::SlugGenerator;

const MAX_NAME_CHARS: usize = 120;
const MAX_DESCRIPTION_CHARS: usize = 5000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateHunt {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
    pub difficulty: Option<Difficulty>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateEnigma {
    pub number: String,
    pub title: String,
    pub description: Option<String>,
    pub order_index: i32,
}

fn required_name(value: &str, field: &str) -> DomainResult<String> {
    let value = value.trim();
    if value.is_empty() || value.chars().count() > MAX_NAME_CHARS {
        return Err(DomainError::validation(format!(
            "{field} must be between 1 and {MAX_NAME_CHARS} characters"
        )));
    }
    Ok(value.to_string())
}

#[derive(Clone)]
pub struct CatalogService {
    hunts: Arc<dyn HuntRepository>,
    slugs: SlugGenerator,
    cache: Arc<dyn ListingCache>,
    clock: Arc<dyn Clock>,
}

impl CatalogService {
    pub fn new(
        hunts: Arc<dyn HuntRepository>,
        slugs: SlugGenerator,
        cache: Arc<dyn ListingCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            hunts,
            slugs,
            cache,
            clock,
        }
    }

    pub async fn create_hunt(&self, ctx: &RequestContext, input: CreateHunt) -> DomainResult<Hunt> {
        let actor = ctx.actor()?;
        require_admin(actor, "create hunts")?;
        let name = required_name(&input.name, "the name")?;
        let description = optional_text(input.description, "the description", MAX_DESCRIPTION_CHARS)?;

        let slug = self.slugs.generate(SlugNamespace::Hunts, &name).await?;
        let hunt = self
            .hunts
            .insert_hunt(NewHunt {
                id: Uuid::new_v4(),
                slug,
                name,
                description,
                is_featured: input.is_featured,
                difficulty: input.difficulty,
                created_by: actor.id,
                created_at: self.clock.now(),
            })
            .await?;
        info!(hunt_id = %hunt.id, slug = %hunt.slug, admin = %actor.id, "hunt created");
        mark_listings_stale(self.cache.as_ref()).await;
        Ok(hunt)
    }

    pub async fn create_enigma(
        &self,
        ctx: &RequestContext,
        hunt_id: Uuid,
        input: CreateEnigma,
    ) -> DomainResult<Enigma> {
        let actor = ctx.actor()?;
        require_admin(actor, "create enigmas")?;
        let title = required_name(&input.title, "the title")?;
        let number = required_name(&input.number, "the number")?;
        let description = optional_text(input.description, "the description", MAX_DESCRIPTION_CHARS)?;

        let hunt = self
            .hunts
            .find_hunt(hunt_id)
            .await?
            .ok_or_else(|| DomainError::not_found("hunt", hunt_id))?;
        let slug = self
            .slugs
            .generate(SlugNamespace::Enigmas { hunt_id: hunt.id }, &title)
            .await?;

        let enigma = self
            .hunts
            .insert_enigma(NewEnigma {
                id: Uuid::new_v4(),
                hunt_id: hunt.id,
                slug,
                number,
                title,
                description,
                order_index: input.order_index,
                created_at: self.clock.now(),
            })
            .await?;
        info!(enigma_id = %enigma.id, hunt_id = %hunt.id, slug = %enigma.slug, "enigma created");
        mark_listings_stale(self.cache.as_ref()).await;
        Ok(enigma)
    }
}
