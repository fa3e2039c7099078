pub mod error;
pub mod types;

pub use error::{ApifyError, Result};
pub use types::{
    profile_url, InstagramHashtagInput, InstagramPost, InstagramProfileInput,
    InstagramSearchInput, InstagramUser, MediaKind, RunData,
};

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use types::ApiResponse;

const BASE_URL: &str = "https://api.apify.com/v2";

/// Longest wait the Apify API accepts for `waitForFinish`.
const MAX_WAIT_SECS: u64 = 60;

/// Default actor for account discovery.
pub const INSTAGRAM_SEARCH_SCRAPER: &str = "apify/instagram-search-scraper";

/// Default actor for profile post harvesting.
pub const INSTAGRAM_SCRAPER: &str = "apify/instagram-scraper";

/// Default actor for hashtag search.
pub const INSTAGRAM_HASHTAG_SCRAPER: &str = "apify/instagram-hashtag-scraper";

#[derive(Clone)]
pub struct ApifyClient {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

/// Apify addresses named actors as `owner~name` in URL paths.
fn actor_path(actor_id: &str) -> String {
    actor_id.replace('/', "~")
}

impl ApifyClient {
    pub fn new(token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApifyError::Api {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(resp)
    }

    /// Start an actor run. Returns immediately with run metadata.
    pub async fn start_actor<I: Serialize + ?Sized>(
        &self,
        actor_id: &str,
        input: &I,
    ) -> Result<RunData> {
        let url = format!("{}/acts/{}/runs", self.base_url, actor_path(actor_id));
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(input)
            .send()
            .await?;

        let api_resp: ApiResponse<RunData> = Self::check(resp).await?.json().await?;
        Ok(api_resp.data)
    }

    /// Fetch the current state of a run, optionally long-polling up to `wait_secs`.
    pub async fn get_run(&self, run_id: &str, wait_secs: Option<u64>) -> Result<RunData> {
        let mut url = format!("{}/actor-runs/{}", self.base_url, run_id);
        if let Some(secs) = wait_secs {
            url.push_str(&format!("?waitForFinish={}", secs.min(MAX_WAIT_SECS)));
        }
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let api_resp: ApiResponse<RunData> = Self::check(resp).await?.json().await?;
        Ok(api_resp.data)
    }

    /// Poll until a run completes or `timeout` elapses.
    pub async fn wait_for_run(&self, run_id: &str, timeout: Duration) -> Result<RunData> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Err(ApifyError::Timeout {
                    run_id: run_id.to_string(),
                    timeout,
                });
            }

            let wait = remaining.as_secs().clamp(1, MAX_WAIT_SECS);
            let run = self.get_run(run_id, Some(wait)).await?;
            match run.status.as_str() {
                "SUCCEEDED" => return Ok(run),
                "FAILED" | "ABORTED" | "TIMED-OUT" => {
                    return Err(ApifyError::RunFailed(run.status));
                }
                _ => {
                    tracing::debug!(run_id, status = %run.status, "Run still in progress");
                    // The server honours waitForFinish; this only guards against
                    // a backend that answers immediately.
                    tokio::time::sleep(Duration::from_millis(250).min(remaining)).await;
                }
            }
        }
    }

    /// Fetch dataset items from a completed run.
    pub async fn get_dataset_items<T: DeserializeOwned>(&self, dataset_id: &str) -> Result<Vec<T>> {
        let url = format!("{}/datasets/{}/items?format=json", self.base_url, dataset_id);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let items: Vec<T> = Self::check(resp).await?.json().await?;
        Ok(items)
    }

    /// Run an actor end-to-end: start, wait for completion, fetch its dataset.
    pub async fn run_actor<I, T>(&self, actor_id: &str, input: &I, timeout: Duration) -> Result<Vec<T>>
    where
        I: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        tracing::info!(actor_id, "Starting Apify actor run");
        let run = self.start_actor(actor_id, input).await?;
        tracing::info!(run_id = %run.id, "Apify run started, polling for completion");

        let completed = self.wait_for_run(&run.id, timeout).await?;
        tracing::info!(
            run_id = %completed.id,
            dataset_id = %completed.default_dataset_id,
            "Run completed, fetching results"
        );

        let items: Vec<T> = self.get_dataset_items(&completed.default_dataset_id).await?;
        tracing::info!(actor_id, count = items.len(), "Fetched dataset items");
        Ok(items)
    }

    /// Search Instagram accounts matching a query.
    pub async fn search_instagram_users(
        &self,
        actor_id: &str,
        query: &str,
        limit: u32,
        timeout: Duration,
    ) -> Result<Vec<InstagramUser>> {
        let input = InstagramSearchInput::users(query, limit);
        self.run_actor(actor_id, &input, timeout).await
    }

    /// Scrape recent posts from a set of Instagram profiles in one run.
    pub async fn scrape_instagram_profiles(
        &self,
        actor_id: &str,
        usernames: &[String],
        per_profile: u32,
        timeout: Duration,
    ) -> Result<Vec<InstagramPost>> {
        let input = InstagramProfileInput::posts_for(usernames, per_profile);
        self.run_actor(actor_id, &input, timeout).await
    }

    /// Scrape recent posts for a hashtag.
    pub async fn scrape_instagram_hashtag(
        &self,
        actor_id: &str,
        hashtag: &str,
        limit: u32,
        timeout: Duration,
    ) -> Result<Vec<InstagramPost>> {
        let input = InstagramHashtagInput {
            hashtags: vec![hashtag.trim_start_matches('#').to_string()],
            results_limit: limit,
        };
        self.run_actor(actor_id, &input, timeout).await
    }
}
