use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use domains::{Post, Thread, ThreadPatch};
use services::posts::CreatePost;
use services::read_views::{PostsPage, ThreadsPage};
use services::threads::{CreateThread, CreatedThread};

use crate::error::ApiResult;
use crate::extract::{ApiPath, ApiQuery, Ctx, JsonBody};
use crate::state::AppState;

pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/enigmas/{id}/threads", get(threads_page).post(create_thread))
        .route("/threads/{id}", patch(update_thread).delete(delete_thread))
        .route("/threads/{id}/pin", post(toggle_pin))
        .route("/threads/{id}/lock", post(toggle_lock))
        .route("/threads/{id}/posts", get(posts_page).post(create_post))
}

#[derive(Debug, Deserialize)]
struct ThreadsQuery {
    cursor: Option<String>,
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct PostsQuery {
    page: Option<u32>,
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeleteQuery {
    pub(crate) reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewThreadBody {
    title: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct NewPostBody {
    content: String,
    parent_post_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
struct Pinned {
    is_pinned: bool,
}

#[derive(Debug, Serialize)]
struct Locked {
    is_locked: bool,
}

async fn threads_page(
    State(state): State<AppState>,
    ApiPath(enigma_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<ThreadsQuery>,
) -> ApiResult<Json<ThreadsPage>> {
    let page = state
        .services
        .read
        .threads_page(enigma_id, query.cursor.as_deref(), query.limit)
        .await?;
    Ok(Json(page))
}

async fn create_thread(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ApiPath(enigma_id): ApiPath<Uuid>,
    JsonBody(body): JsonBody<NewThreadBody>,
) -> ApiResult<(StatusCode, Json<CreatedThread>)> {
    let input = CreateThread {
        enigma_id,
        title: body.title,
        content: body.content,
    };
    let created = state.services.threads.create_thread(&ctx, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_thread(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ApiPath(thread_id): ApiPath<Uuid>,
    JsonBody(patch): JsonBody<ThreadPatch>,
) -> ApiResult<Json<Thread>> {
    let thread = state
        .services
        .threads
        .update_thread(&ctx, thread_id, patch)
        .await?;
    Ok(Json(thread))
}

async fn delete_thread(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ApiPath(thread_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<DeleteQuery>,
) -> ApiResult<StatusCode> {
    state
        .services
        .threads
        .delete_thread(&ctx, thread_id, query.reason)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn toggle_pin(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ApiPath(thread_id): ApiPath<Uuid>,
) -> ApiResult<Json<Pinned>> {
    let is_pinned = state
        .services
        .threads
        .toggle_thread_pin(&ctx, thread_id)
        .await?;
    Ok(Json(Pinned { is_pinned }))
}

async fn toggle_lock(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ApiPath(thread_id): ApiPath<Uuid>,
) -> ApiResult<Json<Locked>> {
    let is_locked = state
        .services
        .threads
        .toggle_thread_lock(&ctx, thread_id)
        .await?;
    Ok(Json(Locked { is_locked }))
}

async fn posts_page(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ApiPath(thread_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<PostsQuery>,
) -> ApiResult<Json<PostsPage>> {
    let page = state
        .services
        .read
        .posts_page(&ctx, thread_id, query.page, query.limit)
        .await?;
    Ok(Json(page))
}

async fn create_post(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ApiPath(thread_id): ApiPath<Uuid>,
    JsonBody(body): JsonBody<NewPostBody>,
) -> ApiResult<(StatusCode, Json<Post>)> {
    let input = CreatePost {
        thread_id,
        content: body.content,
        parent_post_id: body.parent_post_id,
    };
    let post = state.services.posts.create_post(&ctx, input).await?;
    Ok((StatusCode::CREATED, Json(post)))
}
