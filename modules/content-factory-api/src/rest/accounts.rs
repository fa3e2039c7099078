use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use content_factory_common::{
    instagram_username, parse_source_url, Account, NewAccount, NewContentSource, Platform,
};

use crate::extract::{ApiJson, ApiPath};
use crate::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct UpdateAccountRequest {
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct AddSourceRequest {
    pub url: String,
}

/// What a submitted source URL became.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceOutcome {
    /// An Instagram profile, tracked for harvesting.
    Account {
        platform: Platform,
        username: String,
        created: bool,
    },
    /// Any other URL, queued for scoring as a content item.
    Content {
        platform: Platform,
        url: String,
        created: bool,
    },
}

pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Account>>, ApiError> {
    Ok(Json(state.store().list_accounts().await?))
}

pub async fn create_account(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<NewAccount>,
) -> Result<(StatusCode, Json<Account>), ApiError> {
    let username = body.username.trim().trim_start_matches('@');
    if username.is_empty() {
        return Err(ApiError::BadRequest("username is required".into()));
    }
    let account = state
        .store()
        .create_account(NewAccount {
            username: username.to_string(),
            ..body
        })
        .await?;
    info!(account_id = account.id, username = %account.username, "Account created");
    Ok((StatusCode::CREATED, Json(account)))
}

pub async fn update_account(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<UpdateAccountRequest>,
) -> Result<Json<Account>, ApiError> {
    Ok(Json(
        state.store().set_account_active(id, body.is_active).await?,
    ))
}

/// Classify a URL by platform. Instagram profiles become accounts; anything
/// else becomes a pending content item.
pub async fn add_source(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<AddSourceRequest>,
) -> Result<(StatusCode, Json<SourceOutcome>), ApiError> {
    let platform = Platform::from_url(&body.url)?;
    let store = state.store();

    let outcome = match (platform, instagram_username(&body.url)) {
        (Platform::Instagram, Some(username)) => {
            let created = store
                .insert_candidate_account(Platform::Instagram, &username, None)
                .await?;
            SourceOutcome::Account {
                platform,
                username,
                created,
            }
        }
        _ => {
            let url = parse_source_url(&body.url)?.to_string();
            let created = store
                .insert_content_if_new(NewContentSource {
                    url: url.clone(),
                    platform,
                    caption: None,
                    metadata: serde_json::json!({}),
                })
                .await?;
            SourceOutcome::Content {
                platform,
                url,
                created,
            }
        }
    };

    info!(?outcome, "Source added");
    let status = match &outcome {
        SourceOutcome::Account { created: true, .. }
        | SourceOutcome::Content { created: true, .. } => StatusCode::CREATED,
        _ => StatusCode::OK,
    };
    Ok((status, Json(outcome)))
}
