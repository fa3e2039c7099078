use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::error;

use content_factory_common::ContentFactoryError;
use content_factory_pipeline::PipelineError;

/// Handler error rendered as `{"error": "..."}` with a matching status.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unavailable(String),

    #[error(transparent)]
    Internal(anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ContentFactoryError> for ApiError {
    fn from(e: ContentFactoryError) -> Self {
        match e {
            ContentFactoryError::NotFound { .. } => ApiError::NotFound(e.to_string()),
            ContentFactoryError::InvalidTransition { .. } | ContentFactoryError::Conflict(_) => {
                ApiError::Conflict(e.to_string())
            }
            ContentFactoryError::Validation(_) => ApiError::BadRequest(e.to_string()),
            ContentFactoryError::Anyhow(inner) => ApiError::from(inner),
            other => ApiError::Internal(other.into()),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::NotConfigured(_) => ApiError::Unavailable(e.to_string()),
            PipelineError::InvalidConfig { .. } => ApiError::BadRequest(e.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(e: PathRejection) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        let e = match e.downcast::<ContentFactoryError>() {
            Ok(domain) => return domain.into(),
            Err(e) => e,
        };
        match e.downcast::<PipelineError>() {
            Ok(pipeline) => pipeline.into(),
            Err(e) => ApiError::Internal(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Internal(e) => {
                error!(error = %format!("{e:#}"), "Request failed");
                format!("{e:#}")
            }
            other => other.to_string(),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
