//! Reports and profile moderation.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use domains::{Profile, Report, Role};
use services::reports::{FileReport, ReviewReport};

use crate::error::ApiResult;
use crate::extract::{ApiPath, ApiQuery, Ctx, JsonBody};
use crate::state::AppState;

pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/reports", post(file_report))
        .route("/reports/pending", get(pending_reports))
        .route("/reports/{id}", patch(review_report))
        .route("/profiles/{id}/ban", post(ban_profile).delete(unban_profile))
        .route("/profiles/{id}/role", put(set_role))
}

#[derive(Debug, Deserialize)]
struct PendingQuery {
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct BanRequest {
    reason: String,
    /// Permanent when absent.
    until: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct RoleChange {
    role: Role,
}

async fn file_report(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    JsonBody(input): JsonBody<FileReport>,
) -> ApiResult<(StatusCode, Json<Report>)> {
    let report = state.services.reports.file_report(&ctx, input).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

async fn pending_reports(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ApiQuery(query): ApiQuery<PendingQuery>,
) -> ApiResult<Json<Vec<Report>>> {
    let reports = state
        .services
        .reports
        .pending_reports(&ctx, query.limit)
        .await?;
    Ok(Json(reports))
}

async fn review_report(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ApiPath(report_id): ApiPath<Uuid>,
    JsonBody(review): JsonBody<ReviewReport>,
) -> ApiResult<Json<Report>> {
    let report = state
        .services
        .reports
        .review_report(&ctx, report_id, review)
        .await?;
    Ok(Json(report))
}

async fn ban_profile(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ApiPath(profile_id): ApiPath<Uuid>,
    JsonBody(ban): JsonBody<BanRequest>,
) -> ApiResult<Json<Profile>> {
    let profile = state
        .services
        .moderation
        .ban_profile(&ctx, profile_id, &ban.reason, ban.until)
        .await?;
    Ok(Json(profile))
}

async fn unban_profile(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ApiPath(profile_id): ApiPath<Uuid>,
) -> ApiResult<Json<Profile>> {
    Ok(Json(
        state
            .services
            .moderation
            .unban_profile(&ctx, profile_id)
            .await?,
    ))
}

async fn set_role(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ApiPath(profile_id): ApiPath<Uuid>,
    JsonBody(change): JsonBody<RoleChange>,
) -> ApiResult<Json<Profile>> {
    let profile = state
        .services
        .moderation
        .set_role(&ctx, profile_id, change.role)
        .await?;
    Ok(Json(profile))
}
