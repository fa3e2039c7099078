use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wrapper for Apify API responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

/// Apify actor run metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct RunData {
    pub id: String,
    pub status: String,
    #[serde(rename = "defaultDatasetId")]
    pub default_dataset_id: String,
    #[serde(rename = "startedAt")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(rename = "finishedAt")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunData {
    pub fn succeeded(&self) -> bool {
        self.status == "SUCCEEDED"
    }

    /// True once the run can no longer change state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status.as_str(),
            "SUCCEEDED" | "FAILED" | "ABORTED" | "TIMED-OUT"
        )
    }
}

// --- Instagram search scraper (account discovery) ---

/// Input for the apify/instagram-search-scraper actor.
#[derive(Debug, Clone, Serialize)]
pub struct InstagramSearchInput {
    pub search: String,
    #[serde(rename = "searchType")]
    pub search_type: String,
    #[serde(rename = "resultsLimit")]
    pub results_limit: u32,
}

impl InstagramSearchInput {
    pub fn users(query: impl Into<String>, limit: u32) -> Self {
        Self {
            search: query.into(),
            search_type: "user".to_string(),
            results_limit: limit,
        }
    }
}

/// An account returned by the search scraper.
#[derive(Debug, Clone, Deserialize)]
pub struct InstagramUser {
    pub username: Option<String>,
    #[serde(rename = "fullName")]
    pub full_name: Option<String>,
    #[serde(rename = "followersCount")]
    pub followers_count: Option<i64>,
}

// --- Instagram profile scraper (harvest) ---

/// Input for the apify/instagram-scraper actor in profile-posts mode.
#[derive(Debug, Clone, Serialize)]
pub struct InstagramProfileInput {
    #[serde(rename = "directUrls")]
    pub direct_urls: Vec<String>,
    #[serde(rename = "resultsLimit")]
    pub results_limit: u32,
    #[serde(rename = "resultsType")]
    pub results_type: String,
}

impl InstagramProfileInput {
    pub fn posts_for(usernames: &[String], per_profile: u32) -> Self {
        Self {
            direct_urls: usernames.iter().map(|u| profile_url(u)).collect(),
            results_limit: per_profile,
            results_type: "posts".to_string(),
        }
    }
}

/// Canonical profile URL for an Instagram username.
pub fn profile_url(username: &str) -> String {
    format!("https://www.instagram.com/{}/", username.trim_start_matches('@'))
}

// --- Instagram hashtag scraper ---

/// Input for the apify/instagram-hashtag-scraper actor.
#[derive(Debug, Clone, Serialize)]
pub struct InstagramHashtagInput {
    pub hashtags: Vec<String>,
    #[serde(rename = "resultsLimit")]
    pub results_limit: u32,
}

/// A single Instagram post from the Apify dataset.
/// Shared by the profile and hashtag scrapers (same schema).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstagramPost {
    pub url: Option<String>,
    pub caption: Option<String>,
    #[serde(rename = "ownerUsername")]
    pub owner_username: Option<String>,
    #[serde(rename = "shortCode")]
    pub short_code: Option<String>,
    #[serde(rename = "displayUrl")]
    pub display_url: Option<String>,
    #[serde(rename = "videoUrl")]
    pub video_url: Option<String>,
    #[serde(rename = "likesCount")]
    pub likes_count: Option<i64>,
    #[serde(rename = "commentsCount")]
    pub comments_count: Option<i64>,
    #[serde(rename = "videoViewCount")]
    pub video_view_count: Option<i64>,
    #[serde(rename = "videoPlayCount")]
    pub video_play_count: Option<i64>,
    pub timestamp: Option<DateTime<Utc>>,
    /// "Image", "Video" or "Sidecar".
    #[serde(rename = "type")]
    pub post_type: Option<String>,
    /// Every other field of the dataset item, kept as-is.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Coarse media classification of an Instagram post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Reel,
    Carousel,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Reel => "reel",
            MediaKind::Carousel => "carousel",
        }
    }
}

impl InstagramPost {
    pub fn media_kind(&self) -> MediaKind {
        match self.post_type.as_deref() {
            Some("Video") => MediaKind::Reel,
            Some("Sidecar") => MediaKind::Carousel,
            _ => MediaKind::Photo,
        }
    }

    /// Play count when present, falling back to view count.
    pub fn views(&self) -> Option<i64> {
        self.video_play_count.or(self.video_view_count)
    }

    /// Post URL, reconstructed from the short code when the scraper omits it.
    pub fn permalink(&self) -> Option<String> {
        self.url
            .clone()
            .filter(|u| !u.is_empty())
            .or_else(|| {
                self.short_code
                    .as_ref()
                    .map(|code| format!("https://www.instagram.com/p/{code}/"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_input_builds_direct_urls() {
        let input = InstagramProfileInput::posts_for(&["wb_guru".into(), "@seller".into()], 10);
        assert_eq!(
            input.direct_urls,
            vec![
                "https://www.instagram.com/wb_guru/",
                "https://www.instagram.com/seller/"
            ]
        );
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["resultsType"], "posts");
        assert_eq!(json["resultsLimit"], 10);
    }

    #[test]
    fn search_input_serializes_camel_case() {
        let json = serde_json::to_value(InstagramSearchInput::users("wildberries", 5)).unwrap();
        assert_eq!(json["searchType"], "user");
        assert_eq!(json["resultsLimit"], 5);
    }

    #[test]
    fn post_media_kind_and_views() {
        let post: InstagramPost = serde_json::from_value(serde_json::json!({
            "shortCode": "Cabc",
            "type": "Video",
            "videoViewCount": 120,
            "videoPlayCount": 300
        }))
        .unwrap();
        assert_eq!(post.media_kind(), MediaKind::Reel);
        assert_eq!(post.views(), Some(300));
        assert_eq!(
            post.permalink().as_deref(),
            Some("https://www.instagram.com/p/Cabc/")
        );
    }

    #[test]
    fn run_terminal_states() {
        let run: RunData = serde_json::from_value(serde_json::json!({
            "id": "r1",
            "status": "TIMED-OUT",
            "defaultDatasetId": "d1"
        }))
        .unwrap();
        assert!(run.is_terminal());
        assert!(!run.succeeded());
    }
}
