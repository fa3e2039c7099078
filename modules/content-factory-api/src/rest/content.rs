use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use tracing::info;

use content_factory_common::{ContentFactoryError, ContentFilter, ContentSource, ContentStatus, RunKind};

use super::PageQuery;
use crate::extract::{ApiPath, ApiQuery};
use crate::{ApiError, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct ContentQuery {
    pub status: Option<String>,
    pub platform: Option<String>,
    pub search: Option<String>,
    pub min_score: Option<f64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ContentQuery {
    fn into_filter(self) -> Result<ContentFilter, ContentFactoryError> {
        let non_blank = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        Ok(ContentFilter {
            status: non_blank(self.status).map(|s| s.parse()).transpose()?,
            statuses: Vec::new(),
            platform: non_blank(self.platform).map(|p| p.parse()).transpose()?,
            search: self.search,
            min_score: self.min_score,
            limit: self.limit,
            offset: self.offset,
        })
    }
}

pub async fn list_content(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<ContentQuery>,
) -> Result<Json<Vec<ContentSource>>, ApiError> {
    let filter = query.into_filter()?;
    Ok(Json(state.store().list_content(&filter).await?))
}

pub async fn get_content(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ContentSource>, ApiError> {
    state
        .store()
        .get_content(id)
        .await?
        .map(Json)
        .ok_or_else(|| ContentFactoryError::not_found("content", id).into())
}

pub async fn archive_content(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ContentSource>, ApiError> {
    let item = state
        .store()
        .set_content_status(id, ContentStatus::Archived)
        .await?;
    info!(content_id = id, "Content archived");
    Ok(Json(item))
}

/// Scored and approved items, best first.
pub async fn list_ideas(
    State(state): State<Arc<AppState>>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> Result<Json<Vec<ContentSource>>, ApiError> {
    let filter = ContentFilter {
        statuses: vec![ContentStatus::Scored, ContentStatus::Approved],
        limit: Some(page.limit()),
        offset: page.offset,
        ..Default::default()
    };
    Ok(Json(state.store().list_content(&filter).await?))
}

/// Approve an idea and queue carousel generation for it.
pub async fn approve_idea(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let item = state
        .store()
        .get_content(id)
        .await?
        .ok_or(ContentFactoryError::not_found("content", id))?;
    item.status.transition(ContentStatus::Approved)?;

    state
        .store()
        .set_content_status(id, ContentStatus::Approved)
        .await?;
    let run = state
        .queue
        .enqueue(
            RunKind::Generation,
            serde_json::json!({ "content_source_id": id }),
        )
        .await?;

    info!(content_id = id, run_id = run.id, "Idea approved, generation queued");
    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "status": "accepted", "run_id": run.id })),
    ))
}
