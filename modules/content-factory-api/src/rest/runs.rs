use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;

use content_factory_common::{ContentFactoryError, PipelineRun, RunKind};
use content_factory_pipeline::stages::{self, hashtag, scoring};

use super::PageQuery;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct CreateRunRequest {
    pub kind: String,
    #[serde(default)]
    pub config: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct RunsQuery {
    pub kind: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HashtagQuery {
    pub hashtag: Option<String>,
}

pub async fn create_run(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<CreateRunRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let kind: RunKind = body.kind.parse()?;
    if !(body.config.is_null() || body.config.is_object()) {
        return Err(ApiError::BadRequest("config must be a JSON object".into()));
    }
    stages::validate_config(kind, &body.config)?;
    let run = state.queue.enqueue(kind, body.config).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "run_id": run.id, "status": run.status })),
    ))
}

pub async fn list_runs(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<RunsQuery>,
) -> Result<Json<Vec<PipelineRun>>, ApiError> {
    let kind = query
        .kind
        .filter(|k| !k.trim().is_empty())
        .map(|k| k.parse::<RunKind>())
        .transpose()?;
    let limit = PageQuery {
        limit: query.limit,
        offset: None,
    }
    .limit();
    Ok(Json(state.store().list_runs(kind, limit).await?))
}

pub async fn get_run(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<PipelineRun>, ApiError> {
    state
        .store()
        .get_run(id)
        .await?
        .map(Json)
        .ok_or_else(|| ContentFactoryError::not_found("run", id).into())
}

/// Scrape a hashtag right away and store reels and carousels as pending content.
pub async fn parse_instagram(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<HashtagQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let hashtag = query
        .hashtag
        .filter(|h| !h.trim().trim_start_matches('#').is_empty())
        .unwrap_or_else(|| state.deps.config.hashtag.default_hashtag.clone());
    let stats = hashtag::ingest(&state.deps, &hashtag).await?;
    Ok(Json(serde_json::json!({
        "status": "success",
        "parsed": stats.parsed,
        "saved": stats.saved,
        "hashtag": hashtag,
    })))
}

/// Score a small batch of pending items right away.
pub async fn analyze(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if state.store().pending_content(1).await?.is_empty() {
        return Ok(Json(serde_json::json!({
            "status": "ok",
            "message": "No pending items to analyze",
        })));
    }
    let stats = scoring::quick_analyze(&state.deps).await?;
    Ok(Json(serde_json::json!({
        "status": "success",
        "analyzed": stats.scored,
    })))
}
