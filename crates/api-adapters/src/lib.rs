//! # api-adapters
//!
//! JSON over HTTP for the forum. Every route resolves the bearer token into a
//! [`domains::RequestContext`], calls one service operation and maps
//! [`domains::DomainError`] onto a status code with a single `{"error": ...}`
//! body.
//!
//! Everything here is behind the `web-axum` feature.

#[cfg(feature = "web-axum")]
pub mod error;
#[cfg(feature = "web-axum")]
pub mod extract;
#[cfg(feature = "web-axum")]
pub mod layers;
#[cfg(feature = "web-axum")]
pub mod metrics;
#[cfg(feature = "web-axum")]
pub mod routes;
#[cfg(feature = "web-axum")]
pub mod server;
#[cfg(feature = "web-axum")]
pub mod state;

#[cfg(feature = "web-axum")]
pub use error::ApiError;
#[cfg(feature = "web-axum")]
pub use layers::HttpSettings;
#[cfg(feature = "web-axum")]
pub use metrics::HttpMetrics;
#[cfg(feature = "web-axum")]
pub use routes::router;
#[cfg(feature = "web-axum")]
pub use server::serve;
#[cfg(feature = "web-axum")]
pub use state::AppState;
