//! HTTP API for the content factory: sources, content review, pipeline runs
//! and carousel downloads.

pub mod error;
pub mod extract;
pub mod rest;

use std::sync::Arc;

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

use content_factory_common::file_config::ServerConfig;
use content_factory_pipeline::{PipelineDeps, RunQueue};
use content_factory_store::ContentStore;

pub use error::ApiError;

pub struct AppState {
    pub deps: PipelineDeps,
    pub queue: RunQueue,
}

impl AppState {
    pub fn store(&self) -> &dyn ContentStore {
        self.deps.store.as_ref()
    }
}

fn cors(server: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if server.allowed_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = server
        .allowed_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = cors(&state.deps.config.server);

    Router::new()
        .route("/api/health", get(rest::health))
        .route("/api/stats", get(rest::stats))
        .route(
            "/api/accounts",
            get(rest::accounts::list_accounts).post(rest::accounts::create_account),
        )
        .route(
            "/api/accounts/{id}",
            axum::routing::patch(rest::accounts::update_account),
        )
        .route("/api/sources", post(rest::accounts::add_source))
        .route("/api/content", get(rest::content::list_content))
        .route("/api/content/{id}", get(rest::content::get_content))
        .route("/api/content/{id}/archive", post(rest::content::archive_content))
        .route("/api/ideas", get(rest::content::list_ideas))
        .route("/api/ideas/{id}/approve", post(rest::content::approve_idea))
        .route("/api/parse/instagram", post(rest::runs::parse_instagram))
        .route("/api/analyze", post(rest::runs::analyze))
        .route(
            "/api/runs",
            get(rest::runs::list_runs).post(rest::runs::create_run),
        )
        .route("/api/runs/{id}", get(rest::runs::get_run))
        .route("/api/carousels", get(rest::carousels::list_carousels))
        .route("/api/carousels/{id}", get(rest::carousels::get_carousel))
        .route(
            "/api/carousels/{id}/download",
            get(rest::carousels::download_carousel),
        )
        .with_state(state)
        .layer(cors)
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}
