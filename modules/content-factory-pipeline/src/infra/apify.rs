use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use apify_client::{ApifyClient, InstagramPost, MediaKind};
use content_factory_common::FileConfig;

use crate::traits::{PostKind, ScrapedAccount, ScrapedPost, SocialScraper};

/// Apify-backed scraper. Actor ids come from the TOML config.
pub struct ApifyScraper {
    client: ApifyClient,
    search_actor: String,
    profile_actor: String,
    hashtag_actor: String,
    timeout: Duration,
}

impl ApifyScraper {
    pub fn new(client: ApifyClient, config: &FileConfig) -> Self {
        Self {
            client,
            search_actor: config.discovery.actor_id.clone(),
            profile_actor: config.harvest.actor_id.clone(),
            hashtag_actor: config.hashtag.actor_id.clone(),
            timeout: config.workers.apify_timeout(),
        }
    }
}

impl From<InstagramPost> for ScrapedPost {
    fn from(post: InstagramPost) -> Self {
        let raw = serde_json::to_value(&post).unwrap_or(serde_json::Value::Null);
        ScrapedPost {
            url: post.permalink(),
            kind: match post.media_kind() {
                MediaKind::Reel => PostKind::Reel,
                MediaKind::Carousel => PostKind::Carousel,
                MediaKind::Photo => PostKind::Photo,
            },
            views: post.views(),
            caption: post.caption,
            author: post.owner_username,
            likes: post.likes_count,
            comments: post.comments_count,
            video_url: post.video_url,
            thumbnail_url: post.display_url,
            raw,
        }
    }
}

#[async_trait]
impl SocialScraper for ApifyScraper {
    async fn search_accounts(&self, query: &str, limit: u32) -> Result<Vec<ScrapedAccount>> {
        let users = self
            .client
            .search_instagram_users(&self.search_actor, query, limit, self.timeout)
            .await
            .with_context(|| format!("Apify account search for '{query}' failed"))?;
        info!(query, count = users.len(), "Account search finished");
        Ok(users
            .into_iter()
            .map(|u| ScrapedAccount {
                username: u.username,
                full_name: u.full_name,
                followers: u.followers_count,
            })
            .collect())
    }

    async fn profile_posts(
        &self,
        usernames: &[String],
        per_profile: u32,
    ) -> Result<Vec<ScrapedPost>> {
        let posts = self
            .client
            .scrape_instagram_profiles(&self.profile_actor, usernames, per_profile, self.timeout)
            .await
            .context("Apify profile scrape failed")?;
        Ok(posts.into_iter().map(ScrapedPost::from).collect())
    }

    async fn hashtag_posts(&self, hashtag: &str, amount: u32) -> Result<Vec<ScrapedPost>> {
        let posts = self
            .client
            .scrape_instagram_hashtag(&self.hashtag_actor, hashtag, amount, self.timeout)
            .await
            .with_context(|| format!("Apify hashtag scrape for #{hashtag} failed"))?;
        Ok(posts.into_iter().map(ScrapedPost::from).collect())
    }
}
