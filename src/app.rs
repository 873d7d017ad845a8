use crate::config::Config;
use crate::handlers::{self, AppState};
use crate::leads::LeadService;
use crate::services::ScoringService;
use crate::store::LeadStore;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Maximum accepted request body (1 MiB); lead payloads are tiny.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Builds the shared state from a store and the configured scoring provider.
pub fn build_state(store: Arc<dyn LeadStore>, config: &Config) -> Arc<AppState> {
    Arc::new(AppState {
        leads: LeadService::new(store, ScoringService::new(config)),
    })
}

/// Lead API routes. Rate limiting is layered on by the binary since it needs
/// the peer address.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/leads", get(handlers::list_leads).post(handlers::create_lead))
        .route(
            "/leads/:id",
            get(handlers::get_lead)
                .put(handlers::update_lead)
                .delete(handlers::delete_lead),
        )
        .route("/analytics", get(handlers::get_analytics))
        .route("/events/leads", get(handlers::lead_events))
        .route("/admin/leads/clear", post(handlers::clear_leads))
        .route("/admin/leads/reset", post(handlers::reset_leads))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
}

/// Complete application: health check, API routes, tracing and CORS.
pub fn build_router(state: Arc<AppState>, api: Router<Arc<AppState>>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .merge(api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Router without rate limiting, as used by the integration tests.
pub fn router(state: Arc<AppState>) -> Router {
    build_router(state, api_routes())
}
