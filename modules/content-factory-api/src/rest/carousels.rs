use std::sync::Arc;

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Json},
};
use tracing::warn;

use content_factory_common::{CarouselSummary, ContentFactoryError};

use super::PageQuery;
use crate::extract::{ApiPath, ApiQuery};
use crate::{ApiError, AppState};

pub async fn list_carousels(
    State(state): State<Arc<AppState>>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> Result<Json<Vec<CarouselSummary>>, ApiError> {
    Ok(Json(state.store().list_carousels(page.limit()).await?))
}

pub async fn get_carousel(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<CarouselSummary>, ApiError> {
    state
        .store()
        .get_carousel(id)
        .await?
        .map(Json)
        .ok_or_else(|| ContentFactoryError::not_found("carousel", id).into())
}

pub async fn download_carousel(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = state
        .store()
        .get_carousel(id)
        .await?
        .ok_or(ContentFactoryError::not_found("carousel", id))?;

    let key = &summary.carousel.zip_object_key;
    let bytes = state.deps.storage.get(key).await.map_err(|e| {
        warn!(carousel_id = id, key = %key, error = %e, "Carousel bundle missing from storage");
        ApiError::NotFound(format!("bundle for carousel {id} is missing"))
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"carousel_{id}.zip\""),
            ),
        ],
        bytes,
    ))
}
