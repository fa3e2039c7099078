pub mod accounts;
pub mod carousels;
pub mod content;
pub mod runs;

use std::sync::Arc;

use axum::{extract::State, response::Json};
use serde::Deserialize;

use content_factory_common::{DashboardStats, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

use crate::{ApiError, AppState};

// --- Query structs ---

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PageQuery {
    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }
}

// --- Handlers ---

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "Content Factory API",
    }))
}

pub async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<DashboardStats>, ApiError> {
    Ok(Json(state.store().dashboard_stats().await?))
}
