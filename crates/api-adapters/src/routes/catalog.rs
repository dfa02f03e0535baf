//! Hunts, enigmas and the slug-addressed thread view.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use domains::{Enigma, ForumStats, Hunt, Thread};
use services::catalog::{CreateEnigma, CreateHunt};

use crate::error::ApiResult;
use crate::extract::{ApiPath, Ctx, JsonBody};
use crate::state::AppState;

pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/hunts", get(list_hunts).post(create_hunt))
        .route("/hunts/featured", get(featured_hunts))
        .route("/hunts/{hunt}", get(hunt_by_slug))
        .route("/hunts/{hunt}/enigmas", get(enigmas_by_hunt).post(create_enigma))
        .route("/hunts/{hunt}/enigmas/{enigma}", get(enigma_by_slug))
        .route(
            "/hunts/{hunt}/enigmas/{enigma}/threads/{thread}",
            get(thread_by_slug),
        )
        .route("/stats", get(forum_stats))
}

async fn list_hunts(State(state): State<AppState>) -> ApiResult<Json<Vec<Hunt>>> {
    Ok(Json(state.services.read.list_hunts().await?))
}

async fn featured_hunts(State(state): State<AppState>) -> ApiResult<Json<Vec<Hunt>>> {
    Ok(Json(state.services.read.featured_hunts().await?))
}

async fn hunt_by_slug(
    State(state): State<AppState>,
    ApiPath(hunt): ApiPath<String>,
) -> ApiResult<Json<Hunt>> {
    Ok(Json(state.services.read.hunt_by_slug(&hunt).await?))
}

async fn create_hunt(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    JsonBody(input): JsonBody<CreateHunt>,
) -> ApiResult<(StatusCode, Json<Hunt>)> {
    let hunt = state.services.catalog.create_hunt(&ctx, input).await?;
    Ok((StatusCode::CREATED, Json(hunt)))
}

async fn enigmas_by_hunt(
    State(state): State<AppState>,
    ApiPath(hunt): ApiPath<String>,
) -> ApiResult<Json<Vec<Enigma>>> {
    Ok(Json(state.services.read.enigmas_by_hunt(&hunt).await?))
}

async fn create_enigma(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ApiPath(hunt): ApiPath<String>,
    JsonBody(input): JsonBody<CreateEnigma>,
) -> ApiResult<(StatusCode, Json<Enigma>)> {
    let hunt = state.services.read.hunt_by_slug(&hunt).await?;
    let enigma = state
        .services
        .catalog
        .create_enigma(&ctx, hunt.id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(enigma)))
}

async fn enigma_by_slug(
    State(state): State<AppState>,
    ApiPath((hunt, enigma)): ApiPath<(String, String)>,
) -> ApiResult<Json<Enigma>> {
    Ok(Json(state.services.read.enigma_by_slug(&hunt, &enigma).await?))
}

async fn thread_by_slug(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ApiPath((hunt, enigma, thread)): ApiPath<(String, String, String)>,
) -> ApiResult<Json<Thread>> {
    let thread = state
        .services
        .read
        .thread_by_slug(&ctx, &hunt, &enigma, &thread)
        .await?;
    Ok(Json(thread))
}

async fn forum_stats(State(state): State<AppState>) -> ApiResult<Json<ForumStats>> {
    Ok(Json(state.services.read.forum_stats().await?))
}
