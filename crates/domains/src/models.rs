//! # Domain Models
//!
//! These structs represent the core entities of the forum: profiles, hunts,
//! enigmas, threads, posts, reactions and reports.
//! Identifiers are UUIDs; timestamps are UTC instants.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;

/// Generates `as_str`, `Display` and `FromStr` for a fieldless enum stored as
/// lowercase text.
macro_rules! text_enum {
    ($name:ident, $what:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(DomainError::Validation(format!(
                        "unknown {}: {other}",
                        $what
                    ))),
                }
            }
        }
    };
}

// ── Enumerations ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Moderator,
    Admin,
}

text_enum!(Role, "role", { User => "user", Moderator => "moderator", Admin => "admin" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Like,
    Helpful,
    Insightful,
    Funny,
}

text_enum!(ReactionKind, "reaction", {
    Like => "like",
    Helpful => "helpful",
    Insightful => "insightful",
    Funny => "funny",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    Post,
    Thread,
    Profile,
}

text_enum!(ReportType, "report type", { Post => "post", Thread => "thread", Profile => "profile" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    #[default]
    Pending,
    Reviewed,
    Resolved,
    Dismissed,
}

text_enum!(ReportStatus, "report status", {
    Pending => "pending",
    Reviewed => "reviewed",
    Resolved => "resolved",
    Dismissed => "dismissed",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Expert,
}

text_enum!(Difficulty, "difficulty", {
    Easy => "easy",
    Medium => "medium",
    Hard => "hard",
    Expert => "expert",
});

/// Lifecycle of user-generated content. Deleted content stays in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentState {
    #[default]
    Active,
    Deleted,
}

impl ContentState {
    pub fn from_deleted_flag(is_deleted: bool) -> Self {
        if is_deleted {
            ContentState::Deleted
        } else {
            ContentState::Active
        }
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, ContentState::Deleted)
    }
}

/// Thread flags that moderators flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadFlag {
    Pinned,
    Locked,
}

/// Outcome of a reaction toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionOutcome {
    Added,
    Removed,
}

/// A table namespace in which slugs must be unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlugNamespace {
    Hunts,
    /// Enigma slugs are unique within their hunt.
    Enigmas { hunt_id: Uuid },
    Threads,
}

impl SlugNamespace {
    pub fn table(&self) -> &'static str {
        match self {
            SlugNamespace::Hunts => "hunts",
            SlugNamespace::Enigmas { .. } => "enigmas",
            SlugNamespace::Threads => "threads",
        }
    }

    /// Used when the source text yields no slug characters at all.
    pub fn fallback(&self) -> &'static str {
        match self {
            SlugNamespace::Hunts => "hunt",
            SlugNamespace::Enigmas { .. } => "enigma",
            SlugNamespace::Threads => "thread",
        }
    }
}

// ── Entities ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub role: Role,
    pub is_banned: bool,
    pub ban_reason: Option<String>,
    /// `None` with `is_banned` means a permanent ban.
    pub banned_until: Option<DateTime<Utc>>,
    pub posts_count: i64,
    pub threads_count: i64,
    pub reputation: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_seen_at: Option<DateTime<Utc>>,
}

impl Profile {
    pub fn is_banned_at(&self, now: DateTime<Utc>) -> bool {
        self.is_banned && self.banned_until.map_or(true, |until| until > now)
    }
}

/// A treasure-hunt campaign grouping related enigmas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hunt {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub is_featured: bool,
    pub difficulty: Option<Difficulty>,
    pub enigmas_count: i64,
    pub threads_count: i64,
    pub posts_count: i64,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// An individual puzzle belonging to a hunt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enigma {
    pub id: Uuid,
    pub hunt_id: Uuid,
    pub slug: String,
    pub number: String,
    pub title: String,
    pub description: Option<String>,
    pub order_index: i32,
    pub is_active: bool,
    pub is_solved: bool,
    pub solved_at: Option<DateTime<Utc>>,
    pub threads_count: i64,
    pub posts_count: i64,
    pub views: i64,
    pub created_at: DateTime<Utc>,
}

/// A discussion topic attached to one enigma.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub id: Uuid,
    pub enigma_id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub slug: String,
    pub is_pinned: bool,
    pub is_locked: bool,
    pub state: ContentState,
    pub locked_reason: Option<String>,
    pub deleted_reason: Option<String>,
    pub views: i64,
    pub posts_count: i64,
    pub reactions_count: i64,
    pub last_post_at: DateTime<Utc>,
    pub last_post_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single message within a thread. Position 1 is the thread's body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub thread_id: Uuid,
    pub author_id: Uuid,
    /// Weak reply reference; never owns the parent.
    pub parent_post_id: Option<Uuid>,
    pub content: String,
    pub content_html: Option<String>,
    pub post_position: i32,
    pub state: ContentState,
    pub deleted_reason: Option<String>,
    pub is_edited: bool,
    pub edited_at: Option<DateTime<Utc>>,
    pub edit_reason: Option<String>,
    pub reactions_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn is_opening_post(&self) -> bool {
        self.post_position == 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostReaction {
    pub user_id: Uuid,
    pub post_id: Uuid,
    pub kind: ReactionKind,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub reported_type: ReportType,
    pub reported_id: Uuid,
    pub reporter_id: Uuid,
    pub reason: String,
    pub details: Option<String>,
    pub status: ReportStatus,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Stored login credentials, owned by the identity service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user_id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// The identity service's view of a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: Uuid,
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

// ── Write inputs ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct NewProfile {
    pub id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Self-edit of a profile. Every field is replaced; `None` clears it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProfilePatch {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BanRecord {
    pub reason: String,
    pub until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewHunt {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub is_featured: bool,
    pub difficulty: Option<Difficulty>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewEnigma {
    pub id: Uuid,
    pub hunt_id: Uuid,
    pub slug: String,
    pub number: String,
    pub title: String,
    pub description: Option<String>,
    pub order_index: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewThread {
    pub id: Uuid,
    pub enigma_id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

/// A post before storage assigns its position.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    pub id: Uuid,
    pub thread_id: Uuid,
    pub author_id: Uuid,
    pub parent_post_id: Option<Uuid>,
    pub content: String,
    pub content_html: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ThreadPatch {
    pub title: Option<String>,
    pub is_pinned: Option<bool>,
    pub is_locked: Option<bool>,
}

impl ThreadPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.is_pinned.is_none() && self.is_locked.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostEdit {
    pub content: String,
    pub content_html: String,
    pub edit_reason: Option<String>,
    pub edited_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewReport {
    pub id: Uuid,
    pub reported_type: ReportType,
    pub reported_id: Uuid,
    pub reporter_id: Uuid,
    pub reason: String,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportReview {
    pub status: ReportStatus,
    pub reviewed_by: Uuid,
    pub reviewed_at: DateTime<Utc>,
    pub review_notes: Option<String>,
}

// ── Read views ──────────────────────────────────────────────────────────────

/// One row of an enigma's thread listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadSummary {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub author_id: Uuid,
    pub author_username: String,
    pub posts_count: i64,
    pub views: i64,
    pub is_pinned: bool,
    pub is_locked: bool,
    pub last_post_at: DateTime<Utc>,
    pub last_post_by_username: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Keyset position inside a thread listing (pinned first, newest activity first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadCursor {
    pub is_pinned: bool,
    pub last_post_at: DateTime<Utc>,
    pub id: Uuid,
}

impl ThreadCursor {
    pub fn of(summary: &ThreadSummary) -> Self {
        ThreadCursor {
            is_pinned: summary.is_pinned,
            last_post_at: summary.last_post_at,
            id: summary.id,
        }
    }

    /// True when `row` sorts strictly after this cursor.
    pub fn precedes(&self, is_pinned: bool, last_post_at: DateTime<Utc>, id: Uuid) -> bool {
        (!is_pinned, std::cmp::Reverse(last_post_at), id)
            > (!self.is_pinned, std::cmp::Reverse(self.last_post_at), self.id)
    }
}

/// One row of a thread's post listing, joined with its author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostView {
    pub id: Uuid,
    pub parent_post_id: Option<Uuid>,
    pub content: String,
    pub content_html: Option<String>,
    pub author_id: Uuid,
    pub author_username: String,
    pub author_role: Role,
    pub author_posts_count: i64,
    pub post_position: i32,
    pub is_deleted: bool,
    pub is_edited: bool,
    pub edited_at: Option<DateTime<Utc>>,
    pub reactions_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ForumStats {
    pub hunts: i64,
    pub enigmas: i64,
    pub threads: i64,
    pub posts: i64,
    pub users: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn role_parses_and_serializes_lowercase() {
        assert_eq!("moderator".parse::<Role>().unwrap(), Role::Moderator);
        assert!("root".parse::<Role>().is_err());
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
    }

    #[test]
    fn reaction_kinds_round_trip_through_text() {
        for kind in ReactionKind::ALL {
            assert_eq!(kind.as_str().parse::<ReactionKind>().unwrap(), *kind);
        }
    }

    #[test]
    fn temporary_ban_expires() {
        let now = Utc::now();
        let mut profile = Profile {
            id: Uuid::new_v4(),
            username: "sleuth".into(),
            display_name: None,
            avatar_url: None,
            bio: None,
            role: Role::User,
            is_banned: true,
            ban_reason: Some("spam".into()),
            banned_until: Some(now + Duration::hours(1)),
            posts_count: 0,
            threads_count: 0,
            reputation: 0,
            created_at: now,
            updated_at: now,
            last_seen_at: None,
        };
        assert!(profile.is_banned_at(now));
        assert!(!profile.is_banned_at(now + Duration::hours(2)));

        profile.banned_until = None;
        assert!(profile.is_banned_at(now + Duration::days(365)));
    }

    #[test]
    fn cursor_orders_pinned_before_recent() {
        let now = Utc::now();
        let cursor = ThreadCursor {
            is_pinned: true,
            last_post_at: now,
            id: Uuid::nil(),
        };
        // an unpinned thread always comes after a pinned cursor
        assert!(cursor.precedes(false, now + Duration::hours(1), Uuid::new_v4()));
        // an older pinned thread comes after
        assert!(cursor.precedes(true, now - Duration::minutes(1), Uuid::new_v4()));
        // a newer pinned thread comes before
        assert!(!cursor.precedes(true, now + Duration::minutes(1), Uuid::new_v4()));
    }
}
