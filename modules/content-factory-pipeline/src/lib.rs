//! Discovery, harvest, scoring and generation stages, plus the run queue
//! that executes them in the background.

pub mod executor;
pub mod infra;
pub mod queue;
pub mod stages;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;

pub use executor::RunExecutor;
pub use queue::{recover_runs, spawn_heartbeat, RunQueue};
pub use traits::{BlobStorage, ContentAnalyzer, PostKind, ScrapedAccount, ScrapedPost, SocialScraper};

use std::sync::Arc;

use content_factory_common::FileConfig;
use content_factory_renderer::CarouselRenderer;
use content_factory_store::ContentStore;

/// Errors callers branch on. Everything else travels as `anyhow::Error`.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("invalid {kind} config: {message}")]
    InvalidConfig { kind: &'static str, message: String },
}

/// Shared dependencies for every stage.
///
/// Scraper and analyzer are optional so the server can start without API
/// keys; stages that need them fail with `PipelineError::NotConfigured`.
#[derive(Clone)]
pub struct PipelineDeps {
    pub store: Arc<dyn ContentStore>,
    pub scraper: Option<Arc<dyn SocialScraper>>,
    pub analyzer: Option<Arc<dyn ContentAnalyzer>>,
    pub storage: Arc<dyn BlobStorage>,
    pub renderer: Arc<CarouselRenderer>,
    pub config: Arc<FileConfig>,
}

impl PipelineDeps {
    pub fn scraper(&self) -> Result<&Arc<dyn SocialScraper>, PipelineError> {
        self.scraper
            .as_ref()
            .ok_or(PipelineError::NotConfigured("APIFY_API_TOKEN"))
    }

    pub fn analyzer(&self) -> Result<&Arc<dyn ContentAnalyzer>, PipelineError> {
        self.analyzer
            .as_ref()
            .ok_or(PipelineError::NotConfigured("OPENAI_API_KEY"))
    }
}
