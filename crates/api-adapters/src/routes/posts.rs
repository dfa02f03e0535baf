use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Serialize;
use uuid::Uuid;

use domains::{Post, PostReaction, ReactionKind, ReactionOutcome};
use services::posts::UpdatePost;

use super::threads::DeleteQuery;
use crate::error::ApiResult;
use crate::extract::{ApiPath, ApiQuery, Ctx, JsonBody};
use crate::state::AppState;

pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/posts/{id}", patch(update_post).delete(delete_post))
        .route("/posts/{id}/reactions", get(reactions))
        .route("/posts/{id}/reactions/{kind}", post(toggle_reaction))
}

#[derive(Debug, Serialize)]
struct Toggled {
    outcome: ReactionOutcome,
}

async fn update_post(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ApiPath(post_id): ApiPath<Uuid>,
    JsonBody(edit): JsonBody<UpdatePost>,
) -> ApiResult<Json<Post>> {
    Ok(Json(state.services.posts.update_post(&ctx, post_id, edit).await?))
}

async fn delete_post(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ApiPath(post_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<DeleteQuery>,
) -> ApiResult<StatusCode> {
    state
        .services
        .posts
        .delete_post(&ctx, post_id, query.reason)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn reactions(
    State(state): State<AppState>,
    ApiPath(post_id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<PostReaction>>> {
    Ok(Json(state.services.reactions.reactions(post_id).await?))
}

async fn toggle_reaction(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ApiPath((post_id, kind)): ApiPath<(Uuid, ReactionKind)>,
) -> ApiResult<Json<Toggled>> {
    let outcome = state
        .services
        .reactions
        .toggle_post_reaction(&ctx, post_id, kind)
        .await?;
    Ok(Json(Toggled { outcome }))
}
