//! # PostgreSQL store
//!
//! Maps the relational schema in `migrations/` onto the domain models.
//! Multi-row writes run inside one transaction; counters move with in-statement
//! increments so concurrent writers never lose an update. Post positions come
//! from an `UPDATE ... RETURNING` on the thread row, which also serializes
//! concurrent appends to the same thread.

use std::fmt::Display;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row, Transaction};
use tracing::info;
use uuid::Uuid;

use domains::{
    BanRecord, ContentState, CredentialStore, Credentials, DomainError, DomainResult, Enigma,
    ForumStats, Hunt, HuntRepository, NewEnigma, NewHunt, NewPost, NewProfile, NewReport,
    NewThread, Post, PostEdit, PostReaction, PostRepository, PostView, Profile, ProfilePatch,
    ProfileRepository, ReactionKind, ReactionOutcome, ReactionRepository, Report,
    ReportRepository, ReportReview, Role, SlugNamespace, SlugRepository, StatsRepository, Thread,
    ThreadCursor, ThreadFlag, ThreadPatch, ThreadRepository, ThreadSummary,
};

use crate::error::StorageError;

macro_rules! profile_columns {
    () => {
        "id, username, display_name, avatar_url, bio, role, is_banned, ban_reason, \
         banned_until, posts_count, threads_count, reputation, created_at, updated_at, \
         last_seen_at"
    };
}

macro_rules! hunt_columns {
    () => {
        "id, slug, name, description, is_active, is_featured, difficulty, enigmas_count, \
         threads_count, posts_count, created_by, created_at"
    };
}

macro_rules! enigma_columns {
    () => {
        "id, hunt_id, slug, number, title, description, order_index, is_active, is_solved, \
         solved_at, threads_count, posts_count, views, created_at"
    };
}

macro_rules! thread_columns {
    () => {
        "id, enigma_id, author_id, title, slug, is_pinned, is_locked, is_deleted, \
         locked_reason, deleted_reason, views, posts_count, reactions_count, last_post_at, \
         last_post_by, created_at, updated_at"
    };
}

macro_rules! post_columns {
    () => {
        "id, thread_id, author_id, parent_post_id, content, content_html, post_position, \
         is_deleted, deleted_reason, is_edited, edited_at, edit_reason, reactions_count, \
         created_at, updated_at"
    };
}

macro_rules! report_columns {
    () => {
        "id, reported_type, reported_id, reporter_id, reason, details, status, reviewed_by, \
         reviewed_at, review_notes, created_at"
    };
}

fn db(err: sqlx::Error) -> DomainError {
    StorageError::from(err).into()
}

fn parse<T>(raw: String) -> Result<T, StorageError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse()
        .map_err(|err: T::Err| StorageError::Corrupt(err.to_string()))
}

// ── Row mapping ─────────────────────────────────────────────────────────────

fn profile_row(row: &PgRow) -> Result<Profile, StorageError> {
    Ok(Profile {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        display_name: row.try_get("display_name")?,
        avatar_url: row.try_get("avatar_url")?,
        bio: row.try_get("bio")?,
        role: parse(row.try_get("role")?)?,
        is_banned: row.try_get("is_banned")?,
        ban_reason: row.try_get("ban_reason")?,
        banned_until: row.try_get("banned_until")?,
        posts_count: row.try_get("posts_count")?,
        threads_count: row.try_get("threads_count")?,
        reputation: row.try_get("reputation")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        last_seen_at: row.try_get("last_seen_at")?,
    })
}

fn hunt_row(row: &PgRow) -> Result<Hunt, StorageError> {
    Ok(Hunt {
        id: row.try_get("id")?,
        slug: row.try_get("slug")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        is_active: row.try_get("is_active")?,
        is_featured: row.try_get("is_featured")?,
        difficulty: row
            .try_get::<Option<String>, _>("difficulty")?
            .map(parse)
            .transpose()?,
        enigmas_count: row.try_get("enigmas_count")?,
        threads_count: row.try_get("threads_count")?,
        posts_count: row.try_get("posts_count")?,
        created_by: row.try_get("created_by")?,
        created_at: row.try_get("created_at")?,
    })
}

fn enigma_row(row: &PgRow) -> Result<Enigma, StorageError> {
    Ok(Enigma {
        id: row.try_get("id")?,
        hunt_id: row.try_get("hunt_id")?,
        slug: row.try_get("slug")?,
        number: row.try_get("number")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        order_index: row.try_get("order_index")?,
        is_active: row.try_get("is_active")?,
        is_solved: row.try_get("is_solved")?,
        solved_at: row.try_get("solved_at")?,
        threads_count: row.try_get("threads_count")?,
        posts_count: row.try_get("posts_count")?,
        views: row.try_get("views")?,
        created_at: row.try_get("created_at")?,
    })
}

fn thread_row(row: &PgRow) -> Result<Thread, StorageError> {
    Ok(Thread {
        id: row.try_get("id")?,
        enigma_id: row.try_get("enigma_id")?,
        author_id: row.try_get("author_id")?,
        title: row.try_get("title")?,
        slug: row.try_get("slug")?,
        is_pinned: row.try_get("is_pinned")?,
        is_locked: row.try_get("is_locked")?,
        state: ContentState::from_deleted_flag(row.try_get("is_deleted")?),
        locked_reason: row.try_get("locked_reason")?,
        deleted_reason: row.try_get("deleted_reason")?,
        views: row.try_get("views")?,
        posts_count: row.try_get("posts_count")?,
        reactions_count: row.try_get("reactions_count")?,
        last_post_at: row.try_get("last_post_at")?,
        last_post_by: row.try_get("last_post_by")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn post_row(row: &PgRow) -> Result<Post, StorageError> {
    Ok(Post {
        id: row.try_get("id")?,
        thread_id: row.try_get("thread_id")?,
        author_id: row.try_get("author_id")?,
        parent_post_id: row.try_get("parent_post_id")?,
        content: row.try_get("content")?,
        content_html: row.try_get("content_html")?,
        post_position: row.try_get("post_position")?,
        state: ContentState::from_deleted_flag(row.try_get("is_deleted")?),
        deleted_reason: row.try_get("deleted_reason")?,
        is_edited: row.try_get("is_edited")?,
        edited_at: row.try_get("edited_at")?,
        edit_reason: row.try_get("edit_reason")?,
        reactions_count: row.try_get("reactions_count")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn report_row(row: &PgRow) -> Result<Report, StorageError> {
    Ok(Report {
        id: row.try_get("id")?,
        reported_type: parse(row.try_get("reported_type")?)?,
        reported_id: row.try_get("reported_id")?,
        reporter_id: row.try_get("reporter_id")?,
        reason: row.try_get("reason")?,
        details: row.try_get("details")?,
        status: parse(row.try_get("status")?)?,
        reviewed_by: row.try_get("reviewed_by")?,
        reviewed_at: row.try_get("reviewed_at")?,
        review_notes: row.try_get("review_notes")?,
        created_at: row.try_get("created_at")?,
    })
}

fn credentials_row(row: &PgRow) -> Result<Credentials, StorageError> {
    Ok(Credentials {
        user_id: row.try_get("user_id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        created_at: row.try_get("created_at")?,
    })
}

// ── Store ───────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct PgForumStore {
    pool: PgPool,
}

impl PgForumStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), StorageError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("database migrations applied");
        Ok(())
    }

    pub async fn check_ready(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn begin(&self) -> DomainResult<Transaction<'static, Postgres>> {
        self.pool.begin().await.map_err(db)
    }
}

/// Moves an enigma's thread/post counters and its hunt's in the same transaction.
async fn bump_catalog(
    tx: &mut Transaction<'static, Postgres>,
    enigma_id: Uuid,
    threads: i64,
    posts: i64,
) -> DomainResult<()> {
    let hunt_id: Option<Uuid> = sqlx::query_scalar(
        "UPDATE enigmas SET threads_count = threads_count + $2, posts_count = posts_count + $3 \
         WHERE id = $1 RETURNING hunt_id",
    )
    .bind(enigma_id)
    .bind(threads)
    .bind(posts)
    .fetch_optional(&mut **tx)
    .await
    .map_err(db)?;
    let hunt_id = hunt_id.ok_or_else(|| DomainError::not_found("enigma", enigma_id))?;

    sqlx::query(
        "UPDATE hunts SET threads_count = threads_count + $2, posts_count = posts_count + $3 \
         WHERE id = $1",
    )
    .bind(hunt_id)
    .bind(threads)
    .bind(posts)
    .execute(&mut **tx)
    .await
    .map_err(db)?;
    Ok(())
}

async fn insert_post(
    tx: &mut Transaction<'static, Postgres>,
    post: &NewPost,
    position: i32,
) -> DomainResult<Post> {
    let row = sqlx::query(concat!(
        "INSERT INTO posts (id, thread_id, author_id, parent_post_id, content, content_html, \
         post_position, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8) RETURNING ",
        post_columns!()
    ))
    .bind(post.id)
    .bind(post.thread_id)
    .bind(post.author_id)
    .bind(post.parent_post_id)
    .bind(&post.content)
    .bind(&post.content_html)
    .bind(position)
    .bind(post.created_at)
    .fetch_one(&mut **tx)
    .await
    .map_err(db)?;
    Ok(post_row(&row)?)
}

async fn bump_author(
    tx: &mut Transaction<'static, Postgres>,
    author_id: Uuid,
    threads: i64,
    posts: i64,
) -> DomainResult<()> {
    let updated = sqlx::query(
        "UPDATE profiles SET threads_count = threads_count + $2, posts_count = posts_count + $3 \
         WHERE id = $1",
    )
    .bind(author_id)
    .bind(threads)
    .bind(posts)
    .execute(&mut **tx)
    .await
    .map_err(db)?;
    if updated.rows_affected() == 0 {
        return Err(DomainError::not_found("profile", author_id));
    }
    Ok(())
}

#[async_trait]
impl ProfileRepository for PgForumStore {
    async fn find_profile(&self, id: Uuid) -> DomainResult<Option<Profile>> {
        let row = sqlx::query(concat!("SELECT ", profile_columns!(), " FROM profiles WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;
        Ok(row.as_ref().map(profile_row).transpose()?)
    }

    async fn find_profile_by_username(&self, username: &str) -> DomainResult<Option<Profile>> {
        let row = sqlx::query(concat!(
            "SELECT ",
            profile_columns!(),
            " FROM profiles WHERE lower(username) = lower($1)"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(db)?;
        Ok(row.as_ref().map(profile_row).transpose()?)
    }

    async fn insert_profile(&self, profile: NewProfile) -> DomainResult<Profile> {
        let row = sqlx::query(concat!(
            "INSERT INTO profiles (id, username, display_name, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $4) RETURNING ",
            profile_columns!()
        ))
        .bind(profile.id)
        .bind(&profile.username)
        .bind(&profile.display_name)
        .bind(profile.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db)?;
        Ok(profile_row(&row)?)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        patch: ProfilePatch,
        at: DateTime<Utc>,
    ) -> DomainResult<Profile> {
        let row = sqlx::query(concat!(
            "UPDATE profiles SET display_name = $2, bio = $3, avatar_url = $4, updated_at = $5 \
             WHERE id = $1 RETURNING ",
            profile_columns!()
        ))
        .bind(id)
        .bind(patch.display_name)
        .bind(patch.bio)
        .bind(patch.avatar_url)
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(db)?
        .ok_or_else(|| DomainError::not_found("profile", id))?;
        Ok(profile_row(&row)?)
    }

    async fn set_ban(
        &self,
        id: Uuid,
        ban: Option<BanRecord>,
        at: DateTime<Utc>,
    ) -> DomainResult<Profile> {
        let (reason, until) = match &ban {
            Some(ban) => (Some(ban.reason.as_str()), ban.until),
            None => (None, None),
        };
        let row = sqlx::query(concat!(
            "UPDATE profiles SET is_banned = $2, ban_reason = $3, banned_until = $4, \
             updated_at = $5 WHERE id = $1 RETURNING ",
            profile_columns!()
        ))
        .bind(id)
        .bind(ban.is_some())
        .bind(reason)
        .bind(until)
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(db)?
        .ok_or_else(|| DomainError::not_found("profile", id))?;
        Ok(profile_row(&row)?)
    }

    async fn set_role(&self, id: Uuid, role: Role, at: DateTime<Utc>) -> DomainResult<Profile> {
        let row = sqlx::query(concat!(
            "UPDATE profiles SET role = $2, updated_at = $3 WHERE id = $1 RETURNING ",
            profile_columns!()
        ))
        .bind(id)
        .bind(role.as_str())
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(db)?
        .ok_or_else(|| DomainError::not_found("profile", id))?;
        Ok(profile_row(&row)?)
    }

    async fn touch_last_seen(&self, id: Uuid, at: DateTime<Utc>) -> DomainResult<()> {
        sqlx::query("UPDATE profiles SET last_seen_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(db)?;
        Ok(())
    }
}

#[async_trait]
impl HuntRepository for PgForumStore {
    async fn list_active_hunts(&self) -> DomainResult<Vec<Hunt>> {
        let rows = sqlx::query(concat!(
            "SELECT ",
            hunt_columns!(),
            " FROM hunts WHERE is_active ORDER BY is_featured DESC, created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;
        Ok(rows.iter().map(hunt_row).collect::<Result<_, _>>()?)
    }

    async fn find_hunt(&self, id: Uuid) -> DomainResult<Option<Hunt>> {
        let row = sqlx::query(concat!("SELECT ", hunt_columns!(), " FROM hunts WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;
        Ok(row.as_ref().map(hunt_row).transpose()?)
    }

    async fn find_hunt_by_slug(&self, slug: &str) -> DomainResult<Option<Hunt>> {
        let row = sqlx::query(concat!("SELECT ", hunt_columns!(), " FROM hunts WHERE slug = $1"))
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;
        Ok(row.as_ref().map(hunt_row).transpose()?)
    }

    async fn insert_hunt(&self, hunt: NewHunt) -> DomainResult<Hunt> {
        let row = sqlx::query(concat!(
            "INSERT INTO hunts (id, slug, name, description, is_featured, difficulty, \
             created_by, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING ",
            hunt_columns!()
        ))
        .bind(hunt.id)
        .bind(&hunt.slug)
        .bind(&hunt.name)
        .bind(&hunt.description)
        .bind(hunt.is_featured)
        .bind(hunt.difficulty.map(|d| d.as_str()))
        .bind(hunt.created_by)
        .bind(hunt.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db)?;
        Ok(hunt_row(&row)?)
    }

    async fn list_enigmas(&self, hunt_id: Uuid) -> DomainResult<Vec<Enigma>> {
        let rows = sqlx::query(concat!(
            "SELECT ",
            enigma_columns!(),
            " FROM enigmas WHERE hunt_id = $1 AND is_active ORDER BY order_index, created_at"
        ))
        .bind(hunt_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;
        Ok(rows.iter().map(enigma_row).collect::<Result<_, _>>()?)
    }

    async fn find_enigma(&self, id: Uuid) -> DomainResult<Option<Enigma>> {
        let row = sqlx::query(concat!("SELECT ", enigma_columns!(), " FROM enigmas WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;
        Ok(row.as_ref().map(enigma_row).transpose()?)
    }

    async fn find_enigma_by_slug(
        &self,
        hunt_id: Uuid,
        slug: &str,
    ) -> DomainResult<Option<Enigma>> {
        let row = sqlx::query(concat!(
            "SELECT ",
            enigma_columns!(),
            " FROM enigmas WHERE hunt_id = $1 AND slug = $2"
        ))
        .bind(hunt_id)
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(db)?;
        Ok(row.as_ref().map(enigma_row).transpose()?)
    }

    async fn insert_enigma(&self, enigma: NewEnigma) -> DomainResult<Enigma> {
        let mut tx = self.begin().await?;
        let bumped = sqlx::query("UPDATE hunts SET enigmas_count = enigmas_count + 1 WHERE id = $1")
            .bind(enigma.hunt_id)
            .execute(&mut *tx)
            .await
            .map_err(db)?;
        if bumped.rows_affected() == 0 {
            return Err(DomainError::not_found("hunt", enigma.hunt_id));
        }
        let row = sqlx::query(concat!(
            "INSERT INTO enigmas (id, hunt_id, slug, number, title, description, order_index, \
             created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING ",
            enigma_columns!()
        ))
        .bind(enigma.id)
        .bind(enigma.hunt_id)
        .bind(&enigma.slug)
        .bind(&enigma.number)
        .bind(&enigma.title)
        .bind(&enigma.description)
        .bind(enigma.order_index)
        .bind(enigma.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(db)?;
        tx.commit().await.map_err(db)?;
        Ok(enigma_row(&row)?)
    }
}

#[async_trait]
impl SlugRepository for PgForumStore {
    async fn slug_exists(&self, namespace: &SlugNamespace, slug: &str) -> DomainResult<bool> {
        let query = match namespace {
            SlugNamespace::Hunts => {
                sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM hunts WHERE slug = $1)").bind(slug)
            }
            SlugNamespace::Enigmas { hunt_id } => sqlx::query_scalar(
                "SELECT EXISTS (SELECT 1 FROM enigmas WHERE slug = $1 AND hunt_id = $2)",
            )
            .bind(slug)
            .bind(*hunt_id),
            SlugNamespace::Threads => {
                sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM threads WHERE slug = $1)")
                    .bind(slug)
            }
        };
        query.fetch_one(&self.pool).await.map_err(db)
    }
}

#[async_trait]
impl ThreadRepository for PgForumStore {
    async fn create_thread_with_first_post(
        &self,
        thread: NewThread,
        first_post: NewPost,
    ) -> DomainResult<(Thread, Post)> {
        let mut tx = self.begin().await?;
        bump_catalog(&mut tx, thread.enigma_id, 1, 1).await?;

        let row = sqlx::query(concat!(
            "INSERT INTO threads (id, enigma_id, author_id, title, slug, posts_count, \
             next_post_position, last_post_at, last_post_by, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, 1, 2, $6, $3, $6, $6) RETURNING ",
            thread_columns!()
        ))
        .bind(thread.id)
        .bind(thread.enigma_id)
        .bind(thread.author_id)
        .bind(&thread.title)
        .bind(&thread.slug)
        .bind(thread.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(db)?;
        let stored = thread_row(&row)?;

        let first_post = NewPost {
            thread_id: stored.id,
            author_id: stored.author_id,
            parent_post_id: None,
            ..first_post
        };
        let post = insert_post(&mut tx, &first_post, 1).await?;
        bump_author(&mut tx, stored.author_id, 1, 1).await?;

        tx.commit().await.map_err(db)?;
        Ok((stored, post))
    }

    async fn find_thread(&self, id: Uuid) -> DomainResult<Option<Thread>> {
        let row = sqlx::query(concat!("SELECT ", thread_columns!(), " FROM threads WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;
        Ok(row.as_ref().map(thread_row).transpose()?)
    }

    async fn find_thread_by_slug(
        &self,
        enigma_id: Uuid,
        slug: &str,
    ) -> DomainResult<Option<Thread>> {
        let row = sqlx::query(concat!(
            "SELECT ",
            thread_columns!(),
            " FROM threads WHERE enigma_id = $1 AND slug = $2"
        ))
        .bind(enigma_id)
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(db)?;
        Ok(row.as_ref().map(thread_row).transpose()?)
    }

    async fn update_thread(
        &self,
        id: Uuid,
        patch: ThreadPatch,
        at: DateTime<Utc>,
    ) -> DomainResult<Thread> {
        let row = sqlx::query(concat!(
            "UPDATE threads SET title = COALESCE($2, title), \
             is_pinned = COALESCE($3, is_pinned), is_locked = COALESCE($4, is_locked), \
             updated_at = $5 WHERE id = $1 RETURNING ",
            thread_columns!()
        ))
        .bind(id)
        .bind(patch.title)
        .bind(patch.is_pinned)
        .bind(patch.is_locked)
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(db)?
        .ok_or_else(|| DomainError::not_found("thread", id))?;
        Ok(thread_row(&row)?)
    }

    async fn toggle_thread_flag(
        &self,
        id: Uuid,
        flag: ThreadFlag,
        at: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let sql = match flag {
            ThreadFlag::Pinned => {
                "UPDATE threads SET is_pinned = NOT is_pinned, updated_at = $2 \
                 WHERE id = $1 RETURNING is_pinned"
            }
            ThreadFlag::Locked => {
                "UPDATE threads SET is_locked = NOT is_locked, updated_at = $2 \
                 WHERE id = $1 RETURNING is_locked"
            }
        };
        sqlx::query_scalar(sql)
            .bind(id)
            .bind(at)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?
            .ok_or_else(|| DomainError::not_found("thread", id))
    }

    async fn soft_delete_thread(
        &self,
        id: Uuid,
        reason: Option<String>,
        at: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let mut tx = self.begin().await?;
        let enigma_id: Option<Uuid> = sqlx::query_scalar(
            "UPDATE threads SET is_deleted = TRUE, deleted_reason = $2, updated_at = $3 \
             WHERE id = $1 AND NOT is_deleted RETURNING enigma_id",
        )
        .bind(id)
        .bind(reason)
        .bind(at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db)?;

        let Some(enigma_id) = enigma_id else {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM threads WHERE id = $1)")
                .bind(id)
                .fetch_one(&mut *tx)
                .await
                .map_err(db)?;
            return if exists {
                Ok(false)
            } else {
                Err(DomainError::not_found("thread", id))
            };
        };

        bump_catalog(&mut tx, enigma_id, -1, 0).await?;
        tx.commit().await.map_err(db)?;
        Ok(true)
    }

    async fn increment_views(&self, id: Uuid) -> DomainResult<()> {
        sqlx::query("UPDATE threads SET views = views + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db)?;
        Ok(())
    }

    async fn threads_page(
        &self,
        enigma_id: Uuid,
        after: Option<ThreadCursor>,
        limit: u32,
    ) -> DomainResult<Vec<ThreadSummary>> {
        let rows = sqlx::query(
            "SELECT t.id, t.title, t.slug, t.author_id, a.username AS author_username, \
                    t.posts_count, t.views, t.is_pinned, t.is_locked, t.last_post_at, \
                    lp.username AS last_post_by_username, t.created_at \
             FROM threads t \
             JOIN profiles a ON a.id = t.author_id \
             LEFT JOIN profiles lp ON lp.id = t.last_post_by \
             WHERE t.enigma_id = $1 AND NOT t.is_deleted \
               AND ($2::boolean IS NULL \
                    OR t.is_pinned < $2 \
                    OR (t.is_pinned = $2 AND (t.last_post_at < $3 \
                        OR (t.last_post_at = $3 AND t.id > $4)))) \
             ORDER BY t.is_pinned DESC, t.last_post_at DESC, t.id \
             LIMIT $5",
        )
        .bind(enigma_id)
        .bind(after.map(|c| c.is_pinned))
        .bind(after.map(|c| c.last_post_at))
        .bind(after.map(|c| c.id))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        rows.iter()
            .map(|row| -> Result<ThreadSummary, sqlx::Error> {
                Ok(ThreadSummary {
                    id: row.try_get("id")?,
                    title: row.try_get("title")?,
                    slug: row.try_get("slug")?,
                    author_id: row.try_get("author_id")?,
                    author_username: row.try_get("author_username")?,
                    posts_count: row.try_get("posts_count")?,
                    views: row.try_get("views")?,
                    is_pinned: row.try_get("is_pinned")?,
                    is_locked: row.try_get("is_locked")?,
                    last_post_at: row.try_get("last_post_at")?,
                    last_post_by_username: row.try_get("last_post_by_username")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect::<Result<_, sqlx::Error>>()
            .map_err(db)
    }
}

#[async_trait]
impl PostRepository for PgForumStore {
    async fn append_post(&self, post: NewPost) -> DomainResult<Post> {
        let mut tx = self.begin().await?;
        // Takes the thread row lock; concurrent appends queue behind it.
        let claimed = sqlx::query(
            "UPDATE threads SET next_post_position = next_post_position + 1, \
                    posts_count = posts_count + 1, last_post_at = $2, last_post_by = $3, \
                    updated_at = $2 \
             WHERE id = $1 AND NOT is_deleted AND NOT is_locked \
             RETURNING next_post_position - 1 AS position, enigma_id",
        )
        .bind(post.thread_id)
        .bind(post.created_at)
        .bind(post.author_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db)?;

        let Some(claimed) = claimed else {
            let locked: Option<bool> =
                sqlx::query_scalar("SELECT is_locked FROM threads WHERE id = $1 AND NOT is_deleted")
                    .bind(post.thread_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(db)?;
            return Err(match locked {
                Some(true) => DomainError::ThreadLocked,
                _ => DomainError::not_found("thread", post.thread_id),
            });
        };
        let position: i32 = claimed.try_get("position").map_err(db)?;
        let enigma_id: Uuid = claimed.try_get("enigma_id").map_err(db)?;

        let stored = insert_post(&mut tx, &post, position).await?;
        bump_catalog(&mut tx, enigma_id, 0, 1).await?;
        bump_author(&mut tx, post.author_id, 0, 1).await?;
        tx.commit().await.map_err(db)?;
        Ok(stored)
    }

    async fn find_post(&self, id: Uuid) -> DomainResult<Option<Post>> {
        let row = sqlx::query(concat!("SELECT ", post_columns!(), " FROM posts WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;
        Ok(row.as_ref().map(post_row).transpose()?)
    }

    async fn edit_post(&self, id: Uuid, edit: PostEdit) -> DomainResult<Post> {
        let row = sqlx::query(concat!(
            "UPDATE posts SET content = $2, content_html = $3, is_edited = TRUE, \
             edited_at = $4, edit_reason = $5, updated_at = $4 WHERE id = $1 RETURNING ",
            post_columns!()
        ))
        .bind(id)
        .bind(edit.content)
        .bind(edit.content_html)
        .bind(edit.edited_at)
        .bind(edit.edit_reason)
        .fetch_optional(&self.pool)
        .await
        .map_err(db)?
        .ok_or_else(|| DomainError::not_found("post", id))?;
        Ok(post_row(&row)?)
    }

    async fn soft_delete_post(
        &self,
        id: Uuid,
        reason: Option<String>,
        at: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let mut tx = self.begin().await?;
        let thread_id: Option<Uuid> = sqlx::query_scalar(
            "UPDATE posts SET is_deleted = TRUE, deleted_reason = $2, updated_at = $3 \
             WHERE id = $1 AND NOT is_deleted RETURNING thread_id",
        )
        .bind(id)
        .bind(reason)
        .bind(at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db)?;

        let Some(thread_id) = thread_id else {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM posts WHERE id = $1)")
                .bind(id)
                .fetch_one(&mut *tx)
                .await
                .map_err(db)?;
            return if exists {
                Ok(false)
            } else {
                Err(DomainError::not_found("post", id))
            };
        };

        let enigma_id: Uuid = sqlx::query_scalar(
            "UPDATE threads SET posts_count = posts_count - 1 WHERE id = $1 RETURNING enigma_id",
        )
        .bind(thread_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db)?;
        bump_catalog(&mut tx, enigma_id, 0, -1).await?;
        tx.commit().await.map_err(db)?;
        Ok(true)
    }

    async fn posts_page(
        &self,
        thread_id: Uuid,
        offset: u32,
        limit: u32,
    ) -> DomainResult<Vec<PostView>> {
        let rows = sqlx::query(
            "SELECT p.id, p.parent_post_id, p.content, p.content_html, p.author_id, \
                    a.username AS author_username, a.role AS author_role, \
                    a.posts_count AS author_posts_count, p.post_position, p.is_deleted, \
                    p.is_edited, p.edited_at, p.reactions_count, p.created_at \
             FROM posts p JOIN profiles a ON a.id = p.author_id \
             WHERE p.thread_id = $1 \
             ORDER BY p.post_position \
             OFFSET $2 LIMIT $3",
        )
        .bind(thread_id)
        .bind(i64::from(offset))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        let views = rows
            .iter()
            .map(|row| -> Result<PostView, StorageError> {
                Ok(PostView {
                    id: row.try_get("id")?,
                    parent_post_id: row.try_get("parent_post_id")?,
                    content: row.try_get("content")?,
                    content_html: row.try_get("content_html")?,
                    author_id: row.try_get("author_id")?,
                    author_username: row.try_get("author_username")?,
                    author_role: parse(row.try_get("author_role")?)?,
                    author_posts_count: row.try_get("author_posts_count")?,
                    post_position: row.try_get("post_position")?,
                    is_deleted: row.try_get("is_deleted")?,
                    is_edited: row.try_get("is_edited")?,
                    edited_at: row.try_get("edited_at")?,
                    reactions_count: row.try_get("reactions_count")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(views)
    }
}

#[async_trait]
impl ReactionRepository for PgForumStore {
    async fn toggle_reaction(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        kind: ReactionKind,
        at: DateTime<Utc>,
    ) -> DomainResult<ReactionOutcome> {
        let mut tx = self.begin().await?;
        let thread_id: Uuid = sqlx::query_scalar(
            "SELECT thread_id FROM posts WHERE id = $1 AND NOT is_deleted FOR UPDATE",
        )
        .bind(post_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db)?
        .ok_or_else(|| DomainError::not_found("post", post_id))?;

        let removed = sqlx::query(
            "DELETE FROM post_reactions WHERE post_id = $1 AND user_id = $2 AND kind = $3",
        )
        .bind(post_id)
        .bind(user_id)
        .bind(kind.as_str())
        .execute(&mut *tx)
        .await
        .map_err(db)?
        .rows_affected();

        let (outcome, delta) = if removed > 0 {
            (ReactionOutcome::Removed, -1_i64)
        } else {
            sqlx::query(
                "INSERT INTO post_reactions (post_id, user_id, kind, created_at) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(post_id)
            .bind(user_id)
            .bind(kind.as_str())
            .bind(at)
            .execute(&mut *tx)
            .await
            .map_err(db)?;
            (ReactionOutcome::Added, 1)
        };

        sqlx::query("UPDATE posts SET reactions_count = reactions_count + $2 WHERE id = $1")
            .bind(post_id)
            .bind(delta)
            .execute(&mut *tx)
            .await
            .map_err(db)?;
        sqlx::query("UPDATE threads SET reactions_count = reactions_count + $2 WHERE id = $1")
            .bind(thread_id)
            .bind(delta)
            .execute(&mut *tx)
            .await
            .map_err(db)?;
        tx.commit().await.map_err(db)?;
        Ok(outcome)
    }

    async fn reactions_for_post(&self, post_id: Uuid) -> DomainResult<Vec<PostReaction>> {
        let rows = sqlx::query(
            "SELECT post_id, user_id, kind, created_at FROM post_reactions \
             WHERE post_id = $1 ORDER BY created_at, user_id",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;
        let reactions = rows
            .iter()
            .map(|row| -> Result<PostReaction, StorageError> {
                Ok(PostReaction {
                    user_id: row.try_get("user_id")?,
                    post_id: row.try_get("post_id")?,
                    kind: parse(row.try_get("kind")?)?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(reactions)
    }
}

#[async_trait]
impl ReportRepository for PgForumStore {
    async fn insert_report(&self, report: NewReport) -> DomainResult<Report> {
        let row = sqlx::query(concat!(
            "INSERT INTO reports (id, reported_type, reported_id, reporter_id, reason, details, \
             created_at) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING ",
            report_columns!()
        ))
        .bind(report.id)
        .bind(report.reported_type.as_str())
        .bind(report.reported_id)
        .bind(report.reporter_id)
        .bind(&report.reason)
        .bind(&report.details)
        .bind(report.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db)?;
        Ok(report_row(&row)?)
    }

    async fn find_report(&self, id: Uuid) -> DomainResult<Option<Report>> {
        let row = sqlx::query(concat!("SELECT ", report_columns!(), " FROM reports WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;
        Ok(row.as_ref().map(report_row).transpose()?)
    }

    async fn pending_reports(&self, limit: u32) -> DomainResult<Vec<Report>> {
        let rows = sqlx::query(concat!(
            "SELECT ",
            report_columns!(),
            " FROM reports WHERE status = 'pending' ORDER BY created_at LIMIT $1"
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;
        Ok(rows.iter().map(report_row).collect::<Result<_, _>>()?)
    }

    async fn review_report(&self, id: Uuid, review: ReportReview) -> DomainResult<Report> {
        let row = sqlx::query(concat!(
            "UPDATE reports SET status = $2, reviewed_by = $3, reviewed_at = $4, \
             review_notes = $5 WHERE id = $1 RETURNING ",
            report_columns!()
        ))
        .bind(id)
        .bind(review.status.as_str())
        .bind(review.reviewed_by)
        .bind(review.reviewed_at)
        .bind(review.review_notes)
        .fetch_optional(&self.pool)
        .await
        .map_err(db)?
        .ok_or_else(|| DomainError::not_found("report", id))?;
        Ok(report_row(&row)?)
    }
}

#[async_trait]
impl StatsRepository for PgForumStore {
    async fn forum_stats(&self) -> DomainResult<ForumStats> {
        let row = sqlx::query(
            "SELECT (SELECT count(*) FROM hunts WHERE is_active) AS hunts, \
                    (SELECT count(*) FROM enigmas WHERE is_active) AS enigmas, \
                    (SELECT count(*) FROM threads WHERE NOT is_deleted) AS threads, \
                    (SELECT count(*) FROM posts WHERE NOT is_deleted) AS posts, \
                    (SELECT count(*) FROM profiles) AS users",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(db)?;
        let count = |column: &str| row.try_get::<i64, _>(column).map_err(db);
        Ok(ForumStats {
            hunts: count("hunts")?,
            enigmas: count("enigmas")?,
            threads: count("threads")?,
            posts: count("posts")?,
            users: count("users")?,
        })
    }
}

#[async_trait]
impl CredentialStore for PgForumStore {
    async fn insert_credentials(&self, credentials: Credentials) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO credentials (user_id, email, password_hash, created_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(credentials.user_id)
        .bind(&credentials.email)
        .bind(&credentials.password_hash)
        .bind(credentials.created_at)
        .execute(&self.pool)
        .await
        .map_err(db)?;
        Ok(())
    }

    async fn find_credentials_by_email(&self, email: &str) -> DomainResult<Option<Credentials>> {
        let row = sqlx::query(
            "SELECT user_id, email, password_hash, created_at FROM credentials \
             WHERE lower(email) = lower($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(db)?;
        Ok(row.as_ref().map(credentials_row).transpose()?)
    }

    async fn find_credentials(&self, user_id: Uuid) -> DomainResult<Option<Credentials>> {
        let row = sqlx::query(
            "SELECT user_id, email, password_hash, created_at FROM credentials WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db)?;
        Ok(row.as_ref().map(credentials_row).transpose()?)
    }

    async fn update_password_hash(&self, user_id: Uuid, password_hash: String) -> DomainResult<()> {
        let updated = sqlx::query("UPDATE credentials SET password_hash = $2 WHERE user_id = $1")
            .bind(user_id)
            .bind(password_hash)
            .execute(&self.pool)
            .await
            .map_err(db)?;
        if updated.rows_affected() == 0 {
            return Err(DomainError::not_found("account", user_id));
        }
        Ok(())
    }
}
