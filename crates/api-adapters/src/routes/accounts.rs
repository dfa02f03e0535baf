use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;

use domains::{Profile, Session};
use services::accounts::{ProfileUpdate, SignUp};

use crate::error::ApiResult;
use crate::extract::{Ctx, JsonBody};
use crate::state::AppState;

pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/sign-up", post(sign_up))
        .route("/auth/sign-in", post(sign_in))
        .route("/auth/sign-out", post(sign_out))
        .route("/me", get(current_profile).patch(update_profile))
        .route("/me/password", put(update_password))
}

#[derive(Debug, Deserialize)]
struct SignIn {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct PasswordChange {
    password: String,
    confirm: String,
}

async fn sign_up(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<SignUp>,
) -> ApiResult<(StatusCode, Json<Profile>)> {
    let profile = state.services.accounts.sign_up(input).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

async fn sign_in(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<SignIn>,
) -> ApiResult<Json<Session>> {
    let session = state
        .services
        .accounts
        .sign_in(&input.email, &input.password)
        .await?;
    Ok(Json(session))
}

/// Tokens are not tracked server side; the client drops its copy.
async fn sign_out() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn current_profile(State(state): State<AppState>, Ctx(ctx): Ctx) -> ApiResult<Json<Profile>> {
    Ok(Json(state.services.accounts.current_profile(&ctx).await?))
}

async fn update_profile(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    JsonBody(update): JsonBody<ProfileUpdate>,
) -> ApiResult<Json<Profile>> {
    Ok(Json(state.services.accounts.update_profile(&ctx, update).await?))
}

async fn update_password(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    JsonBody(change): JsonBody<PasswordChange>,
) -> ApiResult<StatusCode> {
    state
        .services
        .accounts
        .update_password(&ctx, &change.password, &change.confirm)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
