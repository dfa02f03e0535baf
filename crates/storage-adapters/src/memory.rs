//! # MemoryStore
//!
//! Every forum table in process memory behind a single `tokio::sync::RwLock`.
//! Each port call takes the lock once, so multi-row writes (thread plus first
//! post, post plus counters, reaction plus counters) are atomic with respect
//! to every other call.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use domains::{
    BanRecord, ContentState, CredentialStore, Credentials, DomainError, DomainResult, Enigma,
    ForumStats, Hunt, HuntRepository, NewEnigma, NewHunt, NewPost, NewProfile, NewReport,
    NewThread, Post, PostEdit, PostReaction, PostRepository, PostView, Profile, ProfilePatch,
    ProfileRepository, ReactionKind, ReactionOutcome, ReactionRepository, Report,
    ReportRepository, ReportReview, ReportStatus, Role, SlugNamespace, SlugRepository,
    StatsRepository, Thread, ThreadCursor, ThreadFlag, ThreadPatch, ThreadRepository,
    ThreadSummary,
};

const UNKNOWN_AUTHOR: &str = "[deleted]";

type ReactionKey = (Uuid, Uuid, ReactionKind);

#[derive(Default)]
struct Tables {
    profiles: HashMap<Uuid, Profile>,
    credentials: HashMap<Uuid, Credentials>,
    hunts: HashMap<Uuid, Hunt>,
    enigmas: HashMap<Uuid, Enigma>,
    threads: HashMap<Uuid, Thread>,
    /// Next post position per thread.
    next_position: HashMap<Uuid, i32>,
    posts: HashMap<Uuid, Post>,
    /// (post, user, kind) -> reacted at.
    reactions: HashMap<ReactionKey, DateTime<Utc>>,
    reports: HashMap<Uuid, Report>,
}

impl Tables {
    fn profile_mut(&mut self, id: Uuid) -> DomainResult<&mut Profile> {
        self.profiles
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("profile", id))
    }

    fn username(&self, id: Option<Uuid>) -> Option<String> {
        id.and_then(|id| self.profiles.get(&id))
            .map(|profile| profile.username.clone())
    }

    /// Moves the enigma's and its hunt's thread/post counters.
    fn bump_catalog(&mut self, enigma_id: Uuid, threads: i64, posts: i64) {
        let Some(enigma) = self.enigmas.get_mut(&enigma_id) else {
            return;
        };
        enigma.threads_count += threads;
        enigma.posts_count += posts;
        if let Some(hunt) = self.hunts.get_mut(&enigma.hunt_id) {
            hunt.threads_count += threads;
            hunt.posts_count += posts;
        }
    }

    fn summary(&self, thread: &Thread) -> ThreadSummary {
        ThreadSummary {
            id: thread.id,
            title: thread.title.clone(),
            slug: thread.slug.clone(),
            author_id: thread.author_id,
            author_username: self
                .username(Some(thread.author_id))
                .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
            posts_count: thread.posts_count,
            views: thread.views,
            is_pinned: thread.is_pinned,
            is_locked: thread.is_locked,
            last_post_at: thread.last_post_at,
            last_post_by_username: self.username(thread.last_post_by),
            created_at: thread.created_at,
        }
    }

    fn post_view(&self, post: &Post) -> PostView {
        let author = self.profiles.get(&post.author_id);
        PostView {
            id: post.id,
            parent_post_id: post.parent_post_id,
            content: post.content.clone(),
            content_html: post.content_html.clone(),
            author_id: post.author_id,
            author_username: author
                .map(|a| a.username.clone())
                .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
            author_role: author.map(|a| a.role).unwrap_or_default(),
            author_posts_count: author.map_or(0, |a| a.posts_count),
            post_position: post.post_position,
            is_deleted: post.state.is_deleted(),
            is_edited: post.is_edited,
            edited_at: post.edited_at,
            reactions_count: post.reactions_count,
            created_at: post.created_at,
        }
    }
}

fn stored_post(post: NewPost, position: i32) -> Post {
    Post {
        id: post.id,
        thread_id: post.thread_id,
        author_id: post.author_id,
        parent_post_id: post.parent_post_id,
        content: post.content,
        content_html: Some(post.content_html),
        post_position: position,
        state: ContentState::Active,
        deleted_reason: None,
        is_edited: false,
        edited_at: None,
        edit_reason: None,
        reactions_count: 0,
        created_at: post.created_at,
        updated_at: post.created_at,
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileRepository for MemoryStore {
    async fn find_profile(&self, id: Uuid) -> DomainResult<Option<Profile>> {
        Ok(self.tables.read().await.profiles.get(&id).cloned())
    }

    async fn find_profile_by_username(&self, username: &str) -> DomainResult<Option<Profile>> {
        let tables = self.tables.read().await;
        Ok(tables
            .profiles
            .values()
            .find(|p| p.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn insert_profile(&self, profile: NewProfile) -> DomainResult<Profile> {
        let mut tables = self.tables.write().await;
        if tables
            .profiles
            .values()
            .any(|p| p.username.eq_ignore_ascii_case(&profile.username))
        {
            return Err(DomainError::Conflict("this username is already taken".into()));
        }
        let stored = Profile {
            id: profile.id,
            username: profile.username,
            display_name: profile.display_name,
            avatar_url: None,
            bio: None,
            role: Role::User,
            is_banned: false,
            ban_reason: None,
            banned_until: None,
            posts_count: 0,
            threads_count: 0,
            reputation: 0,
            created_at: profile.created_at,
            updated_at: profile.created_at,
            last_seen_at: None,
        };
        tables.profiles.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        patch: ProfilePatch,
        at: DateTime<Utc>,
    ) -> DomainResult<Profile> {
        let mut tables = self.tables.write().await;
        let profile = tables.profile_mut(id)?;
        profile.display_name = patch.display_name;
        profile.bio = patch.bio;
        profile.avatar_url = patch.avatar_url;
        profile.updated_at = at;
        Ok(profile.clone())
    }

    async fn set_ban(
        &self,
        id: Uuid,
        ban: Option<BanRecord>,
        at: DateTime<Utc>,
    ) -> DomainResult<Profile> {
        let mut tables = self.tables.write().await;
        let profile = tables.profile_mut(id)?;
        match ban {
            Some(ban) => {
                profile.is_banned = true;
                profile.ban_reason = Some(ban.reason);
                profile.banned_until = ban.until;
            }
            None => {
                profile.is_banned = false;
                profile.ban_reason = None;
                profile.banned_until = None;
            }
        }
        profile.updated_at = at;
        Ok(profile.clone())
    }

    async fn set_role(&self, id: Uuid, role: Role, at: DateTime<Utc>) -> DomainResult<Profile> {
        let mut tables = self.tables.write().await;
        let profile = tables.profile_mut(id)?;
        profile.role = role;
        profile.updated_at = at;
        Ok(profile.clone())
    }

    async fn touch_last_seen(&self, id: Uuid, at: DateTime<Utc>) -> DomainResult<()> {
        let mut tables = self.tables.write().await;
        tables.profile_mut(id)?.last_seen_at = Some(at);
        Ok(())
    }
}

#[async_trait]
impl HuntRepository for MemoryStore {
    async fn list_active_hunts(&self) -> DomainResult<Vec<Hunt>> {
        let tables = self.tables.read().await;
        let mut hunts: Vec<Hunt> = tables
            .hunts
            .values()
            .filter(|h| h.is_active)
            .cloned()
            .collect();
        hunts.sort_by_key(|h| (!h.is_featured, Reverse(h.created_at)));
        Ok(hunts)
    }

    async fn find_hunt(&self, id: Uuid) -> DomainResult<Option<Hunt>> {
        Ok(self.tables.read().await.hunts.get(&id).cloned())
    }

    async fn find_hunt_by_slug(&self, slug: &str) -> DomainResult<Option<Hunt>> {
        let tables = self.tables.read().await;
        Ok(tables.hunts.values().find(|h| h.slug == slug).cloned())
    }

    async fn insert_hunt(&self, hunt: NewHunt) -> DomainResult<Hunt> {
        let mut tables = self.tables.write().await;
        if tables.hunts.values().any(|h| h.slug == hunt.slug) {
            return Err(DomainError::Conflict(format!("hunt slug {} is already taken", hunt.slug)));
        }
        let stored = Hunt {
            id: hunt.id,
            slug: hunt.slug,
            name: hunt.name,
            description: hunt.description,
            is_active: true,
            is_featured: hunt.is_featured,
            difficulty: hunt.difficulty,
            enigmas_count: 0,
            threads_count: 0,
            posts_count: 0,
            created_by: Some(hunt.created_by),
            created_at: hunt.created_at,
        };
        tables.hunts.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn list_enigmas(&self, hunt_id: Uuid) -> DomainResult<Vec<Enigma>> {
        let tables = self.tables.read().await;
        let mut enigmas: Vec<Enigma> = tables
            .enigmas
            .values()
            .filter(|e| e.hunt_id == hunt_id && e.is_active)
            .cloned()
            .collect();
        enigmas.sort_by_key(|e| (e.order_index, e.created_at));
        Ok(enigmas)
    }

    async fn find_enigma(&self, id: Uuid) -> DomainResult<Option<Enigma>> {
        Ok(self.tables.read().await.enigmas.get(&id).cloned())
    }

    async fn find_enigma_by_slug(
        &self,
        hunt_id: Uuid,
        slug: &str,
    ) -> DomainResult<Option<Enigma>> {
        let tables = self.tables.read().await;
        Ok(tables
            .enigmas
            .values()
            .find(|e| e.hunt_id == hunt_id && e.slug == slug)
            .cloned())
    }

    async fn insert_enigma(&self, enigma: NewEnigma) -> DomainResult<Enigma> {
        let mut tables = self.tables.write().await;
        if !tables.hunts.contains_key(&enigma.hunt_id) {
            return Err(DomainError::not_found("hunt", enigma.hunt_id));
        }
        if tables
            .enigmas
            .values()
            .any(|e| e.hunt_id == enigma.hunt_id && e.slug == enigma.slug)
        {
            return Err(DomainError::Conflict(format!(
                "enigma slug {} is already taken",
                enigma.slug
            )));
        }
        let stored = Enigma {
            id: enigma.id,
            hunt_id: enigma.hunt_id,
            slug: enigma.slug,
            number: enigma.number,
            title: enigma.title,
            description: enigma.description,
            order_index: enigma.order_index,
            is_active: true,
            is_solved: false,
            solved_at: None,
            threads_count: 0,
            posts_count: 0,
            views: 0,
            created_at: enigma.created_at,
        };
        if let Some(hunt) = tables.hunts.get_mut(&stored.hunt_id) {
            hunt.enigmas_count += 1;
        }
        tables.enigmas.insert(stored.id, stored.clone());
        Ok(stored)
    }
}

#[async_trait]
impl SlugRepository for MemoryStore {
    async fn slug_exists(&self, namespace: &SlugNamespace, slug: &str) -> DomainResult<bool> {
        let tables = self.tables.read().await;
        Ok(match namespace {
            SlugNamespace::Hunts => tables.hunts.values().any(|h| h.slug == slug),
            SlugNamespace::Enigmas { hunt_id } => tables
                .enigmas
                .values()
                .any(|e| e.hunt_id == *hunt_id && e.slug == slug),
            SlugNamespace::Threads => tables.threads.values().any(|t| t.slug == slug),
        })
    }
}

#[async_trait]
impl ThreadRepository for MemoryStore {
    async fn create_thread_with_first_post(
        &self,
        thread: NewThread,
        first_post: NewPost,
    ) -> DomainResult<(Thread, Post)> {
        let mut tables = self.tables.write().await;
        // every check happens before the first write
        if !tables.enigmas.contains_key(&thread.enigma_id) {
            return Err(DomainError::not_found("enigma", thread.enigma_id));
        }
        if !tables.profiles.contains_key(&thread.author_id) {
            return Err(DomainError::not_found("profile", thread.author_id));
        }
        if tables.threads.values().any(|t| t.slug == thread.slug) {
            return Err(DomainError::Conflict(format!(
                "thread slug {} is already taken",
                thread.slug
            )));
        }

        let stored = Thread {
            id: thread.id,
            enigma_id: thread.enigma_id,
            author_id: thread.author_id,
            title: thread.title,
            slug: thread.slug,
            is_pinned: false,
            is_locked: false,
            state: ContentState::Active,
            locked_reason: None,
            deleted_reason: None,
            views: 0,
            posts_count: 1,
            reactions_count: 0,
            last_post_at: thread.created_at,
            last_post_by: Some(thread.author_id),
            created_at: thread.created_at,
            updated_at: thread.created_at,
        };
        let post = stored_post(
            NewPost {
                thread_id: stored.id,
                author_id: stored.author_id,
                parent_post_id: None,
                ..first_post
            },
            1,
        );

        tables.bump_catalog(stored.enigma_id, 1, 1);
        let author = tables.profile_mut(stored.author_id)?;
        author.threads_count += 1;
        author.posts_count += 1;
        tables.next_position.insert(stored.id, 2);
        tables.posts.insert(post.id, post.clone());
        tables.threads.insert(stored.id, stored.clone());
        Ok((stored, post))
    }

    async fn find_thread(&self, id: Uuid) -> DomainResult<Option<Thread>> {
        Ok(self.tables.read().await.threads.get(&id).cloned())
    }

    async fn find_thread_by_slug(
        &self,
        enigma_id: Uuid,
        slug: &str,
    ) -> DomainResult<Option<Thread>> {
        let tables = self.tables.read().await;
        Ok(tables
            .threads
            .values()
            .find(|t| t.enigma_id == enigma_id && t.slug == slug)
            .cloned())
    }

    async fn update_thread(
        &self,
        id: Uuid,
        patch: ThreadPatch,
        at: DateTime<Utc>,
    ) -> DomainResult<Thread> {
        let mut tables = self.tables.write().await;
        let thread = tables
            .threads
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("thread", id))?;
        if let Some(title) = patch.title {
            thread.title = title;
        }
        if let Some(pinned) = patch.is_pinned {
            thread.is_pinned = pinned;
        }
        if let Some(locked) = patch.is_locked {
            thread.is_locked = locked;
        }
        thread.updated_at = at;
        Ok(thread.clone())
    }

    async fn toggle_thread_flag(
        &self,
        id: Uuid,
        flag: ThreadFlag,
        at: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let mut tables = self.tables.write().await;
        let thread = tables
            .threads
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("thread", id))?;
        let value = match flag {
            ThreadFlag::Pinned => &mut thread.is_pinned,
            ThreadFlag::Locked => &mut thread.is_locked,
        };
        *value = !*value;
        let value = *value;
        thread.updated_at = at;
        Ok(value)
    }

    async fn soft_delete_thread(
        &self,
        id: Uuid,
        reason: Option<String>,
        at: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let mut tables = self.tables.write().await;
        let thread = tables
            .threads
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("thread", id))?;
        if thread.state.is_deleted() {
            return Ok(false);
        }
        thread.state = ContentState::Deleted;
        thread.deleted_reason = reason;
        thread.updated_at = at;
        let enigma_id = thread.enigma_id;
        tables.bump_catalog(enigma_id, -1, 0);
        Ok(true)
    }

    async fn increment_views(&self, id: Uuid) -> DomainResult<()> {
        let mut tables = self.tables.write().await;
        let thread = tables
            .threads
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("thread", id))?;
        thread.views += 1;
        Ok(())
    }

    async fn threads_page(
        &self,
        enigma_id: Uuid,
        after: Option<ThreadCursor>,
        limit: u32,
    ) -> DomainResult<Vec<ThreadSummary>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<&Thread> = tables
            .threads
            .values()
            .filter(|t| t.enigma_id == enigma_id && !t.state.is_deleted())
            .filter(|t| {
                after.map_or(true, |cursor| cursor.precedes(t.is_pinned, t.last_post_at, t.id))
            })
            .collect();
        rows.sort_by_key(|t| (!t.is_pinned, Reverse(t.last_post_at), t.id));
        Ok(rows
            .into_iter()
            .take(limit as usize)
            .map(|t| tables.summary(t))
            .collect())
    }
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn append_post(&self, post: NewPost) -> DomainResult<Post> {
        let mut tables = self.tables.write().await;
        let thread = tables
            .threads
            .get(&post.thread_id)
            .filter(|t| !t.state.is_deleted())
            .ok_or_else(|| DomainError::not_found("thread", post.thread_id))?;
        if thread.is_locked {
            return Err(DomainError::ThreadLocked);
        }
        let enigma_id = thread.enigma_id;
        if !tables.profiles.contains_key(&post.author_id) {
            return Err(DomainError::not_found("profile", post.author_id));
        }

        let position = {
            let next = tables.next_position.entry(post.thread_id).or_insert(2);
            let position = *next;
            *next += 1;
            position
        };
        let stored = stored_post(post, position);

        if let Some(thread) = tables.threads.get_mut(&stored.thread_id) {
            thread.posts_count += 1;
            thread.last_post_at = stored.created_at;
            thread.last_post_by = Some(stored.author_id);
            thread.updated_at = stored.created_at;
        }
        tables.bump_catalog(enigma_id, 0, 1);
        tables.profile_mut(stored.author_id)?.posts_count += 1;
        tables.posts.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_post(&self, id: Uuid) -> DomainResult<Option<Post>> {
        Ok(self.tables.read().await.posts.get(&id).cloned())
    }

    async fn edit_post(&self, id: Uuid, edit: PostEdit) -> DomainResult<Post> {
        let mut tables = self.tables.write().await;
        let post = tables
            .posts
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("post", id))?;
        post.content = edit.content;
        post.content_html = Some(edit.content_html);
        post.is_edited = true;
        post.edited_at = Some(edit.edited_at);
        post.edit_reason = edit.edit_reason;
        post.updated_at = edit.edited_at;
        Ok(post.clone())
    }

    async fn soft_delete_post(
        &self,
        id: Uuid,
        reason: Option<String>,
        at: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let mut tables = self.tables.write().await;
        let post = tables
            .posts
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("post", id))?;
        if post.state.is_deleted() {
            return Ok(false);
        }
        post.state = ContentState::Deleted;
        post.deleted_reason = reason;
        post.updated_at = at;
        let thread_id = post.thread_id;

        let enigma_id = tables.threads.get_mut(&thread_id).map(|thread| {
            thread.posts_count -= 1;
            thread.enigma_id
        });
        if let Some(enigma_id) = enigma_id {
            tables.bump_catalog(enigma_id, 0, -1);
        }
        Ok(true)
    }

    async fn posts_page(
        &self,
        thread_id: Uuid,
        offset: u32,
        limit: u32,
    ) -> DomainResult<Vec<PostView>> {
        let tables = self.tables.read().await;
        let mut posts: Vec<&Post> = tables
            .posts
            .values()
            .filter(|p| p.thread_id == thread_id)
            .collect();
        posts.sort_by_key(|p| p.post_position);
        Ok(posts
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|p| tables.post_view(p))
            .collect())
    }
}

#[async_trait]
impl ReactionRepository for MemoryStore {
    async fn toggle_reaction(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        kind: ReactionKind,
        at: DateTime<Utc>,
    ) -> DomainResult<ReactionOutcome> {
        let mut tables = self.tables.write().await;
        let thread_id = tables
            .posts
            .get(&post_id)
            .filter(|p| !p.state.is_deleted())
            .map(|p| p.thread_id)
            .ok_or_else(|| DomainError::not_found("post", post_id))?;

        let key = (post_id, user_id, kind);
        let (outcome, delta) = if tables.reactions.remove(&key).is_some() {
            (ReactionOutcome::Removed, -1)
        } else {
            tables.reactions.insert(key, at);
            (ReactionOutcome::Added, 1)
        };
        if let Some(post) = tables.posts.get_mut(&post_id) {
            post.reactions_count += delta;
        }
        if let Some(thread) = tables.threads.get_mut(&thread_id) {
            thread.reactions_count += delta;
        }
        Ok(outcome)
    }

    async fn reactions_for_post(&self, post_id: Uuid) -> DomainResult<Vec<PostReaction>> {
        let tables = self.tables.read().await;
        let mut reactions: Vec<PostReaction> = tables
            .reactions
            .iter()
            .filter(|((post, _, _), _)| *post == post_id)
            .map(|(&(post_id, user_id, kind), &created_at)| PostReaction {
                user_id,
                post_id,
                kind,
                created_at,
            })
            .collect();
        reactions.sort_by_key(|r| (r.created_at, r.user_id));
        Ok(reactions)
    }
}

#[async_trait]
impl ReportRepository for MemoryStore {
    async fn insert_report(&self, report: NewReport) -> DomainResult<Report> {
        let stored = Report {
            id: report.id,
            reported_type: report.reported_type,
            reported_id: report.reported_id,
            reporter_id: report.reporter_id,
            reason: report.reason,
            details: report.details,
            status: ReportStatus::Pending,
            reviewed_by: None,
            reviewed_at: None,
            review_notes: None,
            created_at: report.created_at,
        };
        self.tables
            .write()
            .await
            .reports
            .insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_report(&self, id: Uuid) -> DomainResult<Option<Report>> {
        Ok(self.tables.read().await.reports.get(&id).cloned())
    }

    async fn pending_reports(&self, limit: u32) -> DomainResult<Vec<Report>> {
        let tables = self.tables.read().await;
        let mut pending: Vec<Report> = tables
            .reports
            .values()
            .filter(|r| r.status == ReportStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|r| r.created_at);
        pending.truncate(limit as usize);
        Ok(pending)
    }

    async fn review_report(&self, id: Uuid, review: ReportReview) -> DomainResult<Report> {
        let mut tables = self.tables.write().await;
        let report = tables
            .reports
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("report", id))?;
        report.status = review.status;
        report.reviewed_by = Some(review.reviewed_by);
        report.reviewed_at = Some(review.reviewed_at);
        report.review_notes = review.review_notes;
        Ok(report.clone())
    }
}

#[async_trait]
impl StatsRepository for MemoryStore {
    async fn forum_stats(&self) -> DomainResult<ForumStats> {
        let tables = self.tables.read().await;
        let count = |n: usize| n as i64;
        Ok(ForumStats {
            hunts: count(tables.hunts.values().filter(|h| h.is_active).count()),
            enigmas: count(tables.enigmas.values().filter(|e| e.is_active).count()),
            threads: count(
                tables
                    .threads
                    .values()
                    .filter(|t| !t.state.is_deleted())
                    .count(),
            ),
            posts: count(tables.posts.values().filter(|p| !p.state.is_deleted()).count()),
            users: count(tables.profiles.len()),
        })
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn insert_credentials(&self, credentials: Credentials) -> DomainResult<()> {
        let mut tables = self.tables.write().await;
        if tables
            .credentials
            .values()
            .any(|c| c.email.eq_ignore_ascii_case(&credentials.email))
        {
            return Err(DomainError::Conflict(
                "this e-mail address is already registered".into(),
            ));
        }
        tables.credentials.insert(credentials.user_id, credentials);
        Ok(())
    }

    async fn find_credentials_by_email(&self, email: &str) -> DomainResult<Option<Credentials>> {
        let tables = self.tables.read().await;
        Ok(tables
            .credentials
            .values()
            .find(|c| c.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_credentials(&self, user_id: Uuid) -> DomainResult<Option<Credentials>> {
        Ok(self.tables.read().await.credentials.get(&user_id).cloned())
    }

    async fn update_password_hash(&self, user_id: Uuid, password_hash: String) -> DomainResult<()> {
        let mut tables = self.tables.write().await;
        let credentials = tables
            .credentials
            .get_mut(&user_id)
            .ok_or_else(|| DomainError::not_found("account", user_id))?;
        credentials.password_hash = password_hash;
        Ok(())
    }
}
