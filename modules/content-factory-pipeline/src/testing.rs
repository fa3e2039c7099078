// Test mocks for the pipeline.
//
// One mock per trait boundary:
// - MockScraper (SocialScraper): query/username/hashtag keyed responses
// - MockAnalyzer (ContentAnalyzer): fixed score, per-id overrides and failures
// - MemoryBlobStorage (BlobStorage): HashMap of keys to bytes
//
// Plus `TestPipeline`, which wires them to a MemoryStore and a font-less
// renderer.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde_json::json;

use content_factory_common::{
    CallToAction, ContentSource, FileConfig, PlanStructure, Slide, Theme,
};
use content_factory_renderer::CarouselRenderer;
use content_factory_store::MemoryStore;

use crate::traits::{
    BlobStorage, ContentAnalyzer, PostKind, ScrapedAccount, ScrapedPost, SocialScraper,
};
use crate::PipelineDeps;

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn account(username: &str, followers: i64) -> ScrapedAccount {
    ScrapedAccount {
        username: Some(username.to_string()),
        full_name: None,
        followers: Some(followers),
    }
}

pub fn post(url: &str, kind: PostKind, likes: i64) -> ScrapedPost {
    ScrapedPost {
        url: Some(url.to_string()),
        caption: Some(format!("caption for {url}")),
        author: Some("seller".into()),
        kind,
        likes: Some(likes),
        comments: Some(0),
        views: Some(likes * 10),
        video_url: None,
        thumbnail_url: None,
        raw: json!({"url": url}),
    }
}

pub fn sample_plan(slides: u32) -> PlanStructure {
    PlanStructure {
        title: "5 ошибок селлера".into(),
        description: Some("Разбор типичных ошибок".into()),
        slides: (1..=slides)
            .map(|n| Slide {
                number: n,
                slide_type: Some(if n == 1 { "cover" } else { "content" }.into()),
                headline: format!("Ошибка {n}"),
                body_text: Some("Считайте юнит-экономику".into()),
                visual_hint: None,
            })
            .collect(),
        cta_final: Some(CallToAction {
            text: "Подписывайтесь".into(),
            link: None,
        }),
    }
}

// ---------------------------------------------------------------------------
// MockScraper
// ---------------------------------------------------------------------------

/// Unregistered searches return nothing; unregistered hashtags error.
/// Builder pattern: `.on_search()`, `.on_profile()`, `.on_hashtag()`.
#[derive(Default)]
pub struct MockScraper {
    searches: HashMap<String, Vec<ScrapedAccount>>,
    profiles: HashMap<String, Vec<ScrapedPost>>,
    hashtags: HashMap<String, Vec<ScrapedPost>>,
    failing: bool,
    profile_requests: Mutex<Vec<Vec<String>>>,
}

impl MockScraper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_search(mut self, query: &str, accounts: Vec<ScrapedAccount>) -> Self {
        self.searches.insert(query.to_string(), accounts);
        self
    }

    pub fn on_profile(mut self, username: &str, posts: Vec<ScrapedPost>) -> Self {
        self.profiles.insert(username.to_string(), posts);
        self
    }

    pub fn on_hashtag(mut self, hashtag: &str, posts: Vec<ScrapedPost>) -> Self {
        self.hashtags.insert(hashtag.to_string(), posts);
        self
    }

    /// Every call fails, as an expired token would.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Username batches passed to `profile_posts`, in call order.
    pub fn profile_requests(&self) -> Vec<Vec<String>> {
        self.profile_requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SocialScraper for MockScraper {
    async fn search_accounts(&self, query: &str, limit: u32) -> Result<Vec<ScrapedAccount>> {
        if self.failing {
            bail!("apify: 401 Unauthorized");
        }
        let mut accounts = self.searches.get(query).cloned().unwrap_or_default();
        accounts.truncate(limit as usize);
        Ok(accounts)
    }

    async fn profile_posts(
        &self,
        usernames: &[String],
        per_profile: u32,
    ) -> Result<Vec<ScrapedPost>> {
        if self.failing {
            bail!("apify: 401 Unauthorized");
        }
        if let Ok(mut requests) = self.profile_requests.lock() {
            requests.push(usernames.to_vec());
        }
        Ok(usernames
            .iter()
            .filter_map(|u| self.profiles.get(u))
            .flat_map(|posts| posts.iter().take(per_profile as usize).cloned())
            .collect())
    }

    async fn hashtag_posts(&self, hashtag: &str, amount: u32) -> Result<Vec<ScrapedPost>> {
        if self.failing {
            bail!("apify: 401 Unauthorized");
        }
        let posts = self
            .hashtags
            .get(hashtag)
            .ok_or_else(|| anyhow!("MockScraper: no hashtag registered for #{hashtag}"))?;
        Ok(posts.iter().take(amount as usize).cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// MockAnalyzer
// ---------------------------------------------------------------------------

pub struct MockAnalyzer {
    default_score: f64,
    scores: HashMap<i64, f64>,
    failing: HashSet<i64>,
    plan: Option<PlanStructure>,
}

impl MockAnalyzer {
    pub fn new() -> Self {
        Self {
            default_score: 50.0,
            scores: HashMap::new(),
            failing: HashSet::new(),
            plan: Some(sample_plan(3)),
        }
    }

    pub fn default_score(mut self, score: f64) -> Self {
        self.default_score = score;
        self
    }

    pub fn score_for(mut self, content_id: i64, score: f64) -> Self {
        self.scores.insert(content_id, score);
        self
    }

    pub fn fail_for(mut self, content_id: i64) -> Self {
        self.failing.insert(content_id);
        self
    }

    pub fn with_plan(mut self, plan: PlanStructure) -> Self {
        self.plan = Some(plan);
        self
    }

    pub fn without_plan(mut self) -> Self {
        self.plan = None;
        self
    }
}

impl Default for MockAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentAnalyzer for MockAnalyzer {
    async fn score(&self, content: &ContentSource) -> Result<f64> {
        if self.failing.contains(&content.id) {
            bail!("openai: 500 Internal Server Error");
        }
        Ok(self
            .scores
            .get(&content.id)
            .copied()
            .unwrap_or(self.default_score))
    }

    async fn plan(&self, content: &ContentSource) -> Result<PlanStructure> {
        self.plan
            .clone()
            .ok_or_else(|| anyhow!("MockAnalyzer: no plan for content {}", content.id))
    }
}

// ---------------------------------------------------------------------------
// MemoryBlobStorage
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryBlobStorage {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .blobs
            .lock()
            .map(|b| b.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

#[async_trait]
impl BlobStorage for MemoryBlobStorage {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.blobs
            .lock()
            .map_err(|_| anyhow!("blob map poisoned"))?
            .insert(key.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.blobs
            .lock()
            .map_err(|_| anyhow!("blob map poisoned"))?
            .get(key)
            .cloned()
            .ok_or_else(|| anyhow!("blob not found: {key}"))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.blobs
            .lock()
            .map_err(|_| anyhow!("blob map poisoned"))?
            .remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TestPipeline
// ---------------------------------------------------------------------------

/// Pipeline deps over in-memory fakes, with handles kept for assertions.
pub struct TestPipeline {
    pub store: Arc<MemoryStore>,
    pub storage: Arc<MemoryBlobStorage>,
    pub scraper: Option<Arc<MockScraper>>,
    pub analyzer: Option<Arc<MockAnalyzer>>,
    pub config: FileConfig,
}

impl TestPipeline {
    /// No scraper and no analyzer, default config.
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            storage: Arc::new(MemoryBlobStorage::new()),
            scraper: None,
            analyzer: None,
            config: FileConfig::default(),
        }
    }

    pub fn with_scraper(mut self, scraper: MockScraper) -> Self {
        self.scraper = Some(Arc::new(scraper));
        self
    }

    pub fn with_analyzer(mut self, analyzer: MockAnalyzer) -> Self {
        self.analyzer = Some(Arc::new(analyzer));
        self
    }

    pub fn with_config(mut self, config: FileConfig) -> Self {
        self.config = config;
        self
    }

    pub fn deps(&self) -> PipelineDeps {
        PipelineDeps {
            store: self.store.clone(),
            scraper: self
                .scraper
                .clone()
                .map(|s| s as Arc<dyn SocialScraper>),
            analyzer: self
                .analyzer
                .clone()
                .map(|a| a as Arc<dyn ContentAnalyzer>),
            storage: self.storage.clone(),
            renderer: Arc::new(CarouselRenderer::without_fonts(
                Theme::Dark,
                self.config.renderer.footer.clone(),
            )),
            config: Arc::new(self.config.clone()),
        }
    }
}

impl Default for TestPipeline {
    fn default() -> Self {
        Self::new()
    }
}
