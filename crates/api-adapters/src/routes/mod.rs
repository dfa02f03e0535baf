//! Route table. Paths use axum's `{param}` syntax.

mod accounts;
mod catalog;
mod moderation;
mod posts;
mod system;
mod threads;

use axum::{middleware, Router};

use crate::layers::{apply_standard_layers, HttpSettings};
use crate::metrics::track_requests;
use crate::state::AppState;

pub fn router(state: AppState, settings: HttpSettings) -> Router {
    let routes = Router::new()
        .merge(accounts::routes())
        .merge(catalog::routes())
        .merge(threads::routes())
        .merge(posts::routes())
        .merge(moderation::routes())
        .merge(system::routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), track_requests))
        .with_state(state);
    apply_standard_layers(routes, settings)
}
