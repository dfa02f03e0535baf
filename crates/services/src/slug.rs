//! # Slug Generator
//!
//! Derives URL-safe identifiers from free text and makes them unique within a
//! table namespace by appending `-2`, `-3`, ... on collision.
//!
//! The check happens before the insert, so two concurrent creations can still
//! pick the same candidate. Storage holds a unique constraint on every slug
//! column and callers regenerate on `Conflict`.

use std::sync::Arc;

use tracing::{debug, error};

use domains::{DomainError, DomainResult, SlugNamespace, SlugRepository};

pub const MAX_SLUG_LEN: usize = 80;
const MAX_PROBES: u32 = 1000;

/// Lowercase, accent-folded, hyphen-separated form of `text`.
/// Returns an empty string when `text` has no letters or digits.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars().flat_map(char::to_lowercase) {
        let folded = fold(c);
        match folded {
            Some(s) => {
                if pending_dash && !slug.is_empty() {
                    slug.push('-');
                }
                pending_dash = false;
                slug.push_str(s);
            }
            None => pending_dash = true,
        }
        if slug.len() >= MAX_SLUG_LEN {
            break;
        }
    }

    slug.truncate(MAX_SLUG_LEN);
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// ASCII spelling of a lowercase character, `None` for separators.
fn fold(c: char) -> Option<&'static str> {
    const ASCII: &str = "abcdefghijklmnopqrstuvwxyz0123456789";
    if let Some(idx) = ASCII.find(c) {
        return Some(&ASCII[idx..idx + 1]);
    }
    let s = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => "a",
        'æ' => "ae",
        'ç' => "c",
        'è' | 'é' | 'ê' | 'ë' => "e",
        'ì' | 'í' | 'î' | 'ï' => "i",
        'ñ' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' => "o",
        'œ' => "oe",
        'ù' | 'ú' | 'û' | 'ü' => "u",
        'ý' | 'ÿ' => "y",
        'ß' => "ss",
        _ => return None,
    };
    Some(s)
}

fn candidate(base: &str, attempt: u32) -> String {
    if attempt == 1 {
        base.to_string()
    } else {
        format!("{base}-{attempt}")
    }
}

#[derive(Clone)]
pub struct SlugGenerator {
    slugs: Arc<dyn SlugRepository>,
}

impl SlugGenerator {
    pub fn new(slugs: Arc<dyn SlugRepository>) -> Self {
        Self { slugs }
    }

    /// First free slug for `text` in `namespace`.
    pub async fn generate(&self, namespace: SlugNamespace, text: &str) -> DomainResult<String> {
        let mut base = slugify(text);
        if base.is_empty() {
            base = namespace.fallback().to_string();
        }

        for attempt in 1..=MAX_PROBES {
            let slug = candidate(&base, attempt);
            let taken = self
                .slugs
                .slug_exists(&namespace, &slug)
                .await
                .inspect_err(|err| {
                    error!(table = namespace.table(), error = %err, "slug lookup failed");
                })?;
            if !taken {
                debug!(table = namespace.table(), %slug, attempt, "slug allocated");
                return Ok(slug);
            }
        }

        Err(DomainError::Conflict(format!(
            "no free slug for \"{base}\" in {}",
            namespace.table()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::MockSlugRepository;
    use mockall::predicate::eq;

    #[test]
    fn slugify_lowercases_and_hyphenates() {
        assert_eq!(slugify("My first enigma theory"), "my-first-enigma-theory");
        assert_eq!(slugify("  Hello,   World!! "), "hello-world");
        assert_eq!(slugify("Énigme n°3 : la clé"), "enigme-n-3-la-cle");
        assert_eq!(slugify("Cœur & Âme"), "coeur-ame");
    }

    #[test]
    fn slugify_of_symbols_is_empty() {
        assert_eq!(slugify("!!! ???"), "");
        assert_eq!(slugify("日本語"), "");
    }

    #[test]
    fn slugify_caps_length_without_trailing_dash() {
        let long = "word ".repeat(40);
        let slug = slugify(&long);
        assert!(slug.len() <= MAX_SLUG_LEN);
        assert!(!slug.ends_with('-'));
    }

    #[tokio::test]
    async fn generate_appends_counter_on_collision() {
        let mut repo = MockSlugRepository::new();
        repo.expect_slug_exists()
            .withf(|_, slug| slug == "the-owl" || slug == "the-owl-2")
            .times(2)
            .returning(|_, _| Ok(true));
        repo.expect_slug_exists()
            .withf(|_, slug| slug == "the-owl-3")
            .returning(|_, _| Ok(false));

        let generator = SlugGenerator::new(Arc::new(repo));
        let slug = generator
            .generate(SlugNamespace::Threads, "The Owl")
            .await
            .unwrap();
        assert_eq!(slug, "the-owl-3");
    }

    #[tokio::test]
    async fn generate_falls_back_for_empty_slug() {
        let mut repo = MockSlugRepository::new();
        repo.expect_slug_exists()
            .with(eq(SlugNamespace::Hunts), eq("hunt"))
            .returning(|_, _| Ok(false));

        let generator = SlugGenerator::new(Arc::new(repo));
        let slug = generator.generate(SlugNamespace::Hunts, "???").await.unwrap();
        assert_eq!(slug, "hunt");
    }

    #[tokio::test]
    async fn generate_surfaces_backend_failure() {
        let mut repo = MockSlugRepository::new();
        repo.expect_slug_exists()
            .returning(|_, _| Err(DomainError::backend("connection refused")));

        let generator = SlugGenerator::new(Arc::new(repo));
        let err = generator
            .generate(SlugNamespace::Threads, "anything")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Backend(_)));
    }
}
