use std::sync::Arc;

use services::ForumServices;

use crate::metrics::HttpMetrics;

/// Shared by every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub services: ForumServices,
    pub metrics: Arc<HttpMetrics>,
}

impl AppState {
    pub fn new(services: ForumServices) -> Self {
        Self {
            services,
            metrics: Arc::new(HttpMetrics::new()),
        }
    }
}
