// Trait seams for the pipeline's external dependencies.
//
// SocialScraper hides Apify, ContentAnalyzer hides OpenAI, BlobStorage hides
// where bundles land. Stages only see these traits, so tests run against
// the mocks in `testing` with no network.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use content_factory_common::{ContentSource, PlanStructure};

/// An account returned by a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedAccount {
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub followers: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    Reel,
    Carousel,
    Photo,
}

impl PostKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostKind::Reel => "reel",
            PostKind::Carousel => "carousel",
            PostKind::Photo => "photo",
        }
    }
}

/// A post returned by a profile or hashtag scrape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedPost {
    pub url: Option<String>,
    pub caption: Option<String>,
    pub author: Option<String>,
    pub kind: PostKind,
    pub likes: Option<i64>,
    pub comments: Option<i64>,
    pub views: Option<i64>,
    pub video_url: Option<String>,
    pub thumbnail_url: Option<String>,
    /// The scraper's item as received.
    pub raw: serde_json::Value,
}

impl ScrapedPost {
    /// Normalized metadata stored alongside the content item.
    pub fn metadata(&self) -> serde_json::Value {
        serde_json::json!({
            "likes": self.likes.unwrap_or(0),
            "comments": self.comments.unwrap_or(0),
            "views": self.views.unwrap_or(0),
            "author": self.author,
            "type": self.kind.as_str(),
            "video_url": self.video_url,
            "thumbnail_url": self.thumbnail_url,
        })
    }
}

#[async_trait]
pub trait SocialScraper: Send + Sync {
    /// Search accounts matching a query.
    async fn search_accounts(&self, query: &str, limit: u32) -> Result<Vec<ScrapedAccount>>;

    /// Recent posts from the given profiles, in one batch.
    async fn profile_posts(&self, usernames: &[String], per_profile: u32)
        -> Result<Vec<ScrapedPost>>;

    /// Recent posts for a hashtag (without the leading `#`).
    async fn hashtag_posts(&self, hashtag: &str, amount: u32) -> Result<Vec<ScrapedPost>>;
}

#[async_trait]
pub trait ContentAnalyzer: Send + Sync {
    /// Relevance score in `0..=100`.
    async fn score(&self, content: &ContentSource) -> Result<f64>;

    /// Slide-by-slide carousel plan derived from the content.
    async fn plan(&self, content: &ContentSource) -> Result<PlanStructure>;
}

#[async_trait]
pub trait BlobStorage: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    async fn delete(&self, key: &str) -> Result<()>;
}
