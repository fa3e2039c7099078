use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ContentFactoryError, Result};
use crate::status::{
    text_enum, CarouselStatus, ContentStatus, PlanStatus, RunKind, RunStatus, Theme,
};

text_enum!(
    /// Social platform a source or account lives on.
    Platform {
        Instagram => "instagram",
        Youtube => "youtube",
        Tiktok => "tiktok",
        Telegram => "telegram",
        Web => "web",
    }
);

impl Platform {
    /// Classify a URL by its host. Anything unrecognised is `Web`.
    pub fn from_url(raw: &str) -> Result<Platform> {
        let parsed = parse_source_url(raw)?;
        let host = parsed
            .host_str()
            .unwrap_or_default()
            .trim_start_matches("www.")
            .trim_start_matches("m.")
            .to_ascii_lowercase();

        let matches = |domain: &str| host == domain || host.ends_with(&format!(".{domain}"));

        Ok(if matches("instagram.com") {
            Platform::Instagram
        } else if matches("youtube.com") || matches("youtu.be") {
            Platform::Youtube
        } else if matches("tiktok.com") {
            Platform::Tiktok
        } else if matches("t.me") || matches("telegram.me") {
            Platform::Telegram
        } else {
            Platform::Web
        })
    }
}

/// Parse a user-supplied source URL, accepting bare hosts like `instagram.com/foo`.
pub fn parse_source_url(raw: &str) -> Result<url::Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ContentFactoryError::Validation("URL is required".into()));
    }
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    let parsed = url::Url::parse(&candidate)
        .map_err(|e| ContentFactoryError::Validation(format!("invalid URL '{trimmed}': {e}")))?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some_and(|h| h.contains('.')) => Ok(parsed),
        _ => Err(ContentFactoryError::Validation(format!(
            "invalid URL '{trimmed}'"
        ))),
    }
}

/// Extract the username from an Instagram profile URL (`instagram.com/{username}/`).
///
/// Post, reel and story URLs are not profiles and yield `None`.
pub fn instagram_username(raw: &str) -> Option<String> {
    let parsed = parse_source_url(raw).ok()?;
    let mut segments = parsed.path_segments()?.filter(|s| !s.is_empty());
    let first = segments.next()?;
    if segments.next().is_some()
        || matches!(first, "p" | "reel" | "reels" | "stories" | "explore" | "tv")
    {
        return None;
    }
    Some(first.trim_start_matches('@').to_string())
}

// --- Accounts ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub platform: Platform,
    pub username: String,
    pub followers: Option<i64>,
    pub category: Option<String>,
    pub is_active: bool,
    pub last_parsed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAccount {
    pub platform: Platform,
    pub username: String,
    #[serde(default)]
    pub followers: Option<i64>,
    #[serde(default)]
    pub category: Option<String>,
}

// --- Content sources ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentSource {
    pub id: i64,
    pub url: String,
    pub platform: Platform,
    pub caption: Option<String>,
    /// Raw scrape data: likes, views, comments, author and whatever else the scraper returned.
    pub metadata: serde_json::Value,
    pub status: ContentStatus,
    pub score: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContentSource {
    fn metadata_i64(&self, key: &str) -> Option<i64> {
        self.metadata.get(key).and_then(serde_json::Value::as_i64)
    }

    pub fn likes(&self) -> i64 {
        self.metadata_i64("likes").unwrap_or(0)
    }

    pub fn views(&self) -> i64 {
        self.metadata_i64("views").unwrap_or(0)
    }

    pub fn author(&self) -> &str {
        self.metadata
            .get("author")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("unknown")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewContentSource {
    pub url: String,
    pub platform: Platform,
    pub caption: Option<String>,
    pub metadata: serde_json::Value,
}

// --- Plans and carousels ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarouselPlan {
    pub id: i64,
    pub source_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub structure: serde_json::Value,
    pub status: PlanStatus,
    pub theme: Theme,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCarouselPlan {
    pub source_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub structure: serde_json::Value,
    pub status: PlanStatus,
    pub theme: Theme,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Carousel {
    pub id: i64,
    pub plan_id: i64,
    pub bundle_id: Uuid,
    pub zip_object_key: String,
    pub thumbnail_object_key: Option<String>,
    pub slide_count: i32,
    pub status: CarouselStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCarousel {
    pub plan_id: i64,
    pub bundle_id: Uuid,
    pub zip_object_key: String,
    pub thumbnail_object_key: Option<String>,
    pub slide_count: i32,
}

/// A carousel joined with the plan it was rendered from, for history listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarouselSummary {
    #[serde(flatten)]
    pub carousel: Carousel,
    pub plan_title: String,
    pub source_id: Option<i64>,
}

// --- Runs ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: i64,
    pub kind: RunKind,
    pub status: RunStatus,
    pub config: serde_json::Value,
    pub stats: serde_json::Value,
    pub error_log: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

// --- Queries ---

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentFilter {
    pub status: Option<ContentStatus>,
    /// Match any of these statuses; combined with `status` when both are set.
    #[serde(default)]
    pub statuses: Vec<ContentStatus>,
    pub platform: Option<Platform>,
    pub search: Option<String>,
    pub min_score: Option<f64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ContentFilter {
    pub fn effective_limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn effective_offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }

    /// All statuses the filter accepts; empty means any.
    pub fn status_set(&self) -> Vec<ContentStatus> {
        let mut set = self.statuses.clone();
        if let Some(s) = self.status {
            if !set.contains(&s) {
                set.push(s);
            }
        }
        set
    }

    /// Case-insensitive search term, `None` when blank.
    pub fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DashboardStats {
    pub content_total: i64,
    pub content_by_status: BTreeMap<String, i64>,
    pub carousels_total: i64,
    pub accounts_active: i64,
    pub average_score: Option<f64>,
}
