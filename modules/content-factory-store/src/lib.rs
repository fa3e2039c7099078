//! Persistence for accounts, content items, plans, carousels and pipeline runs.
//!
//! `ContentStore` is the seam the pipeline and API depend on. `PgStore` is the
//! production implementation; `MemoryStore` backs tests and `--in-memory` mode
//! and must behave identically.

mod memory;
mod pg;

pub use memory::MemoryStore;
pub use pg::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use content_factory_common::{
    Account, Carousel, CarouselPlan, CarouselSummary, ContentFilter, ContentSource,
    ContentStatus, DashboardStats, NewAccount, NewCarousel, NewCarouselPlan, NewContentSource,
    PipelineRun, Platform, Result, RunKind, RunStatus,
};

#[async_trait]
pub trait ContentStore: Send + Sync {
    // --- Accounts ---

    /// Errors with `Conflict` when the platform/username pair already exists.
    async fn create_account(&self, account: NewAccount) -> Result<Account>;

    /// Insert a discovered account. Returns false when it already exists.
    async fn insert_candidate_account(
        &self,
        platform: Platform,
        username: &str,
        followers: Option<i64>,
    ) -> Result<bool>;

    async fn list_accounts(&self) -> Result<Vec<Account>>;

    /// Active accounts, least recently parsed first (never-parsed before all).
    async fn active_accounts(&self, limit: i64) -> Result<Vec<Account>>;

    async fn set_account_active(&self, id: i64, active: bool) -> Result<Account>;

    async fn mark_accounts_parsed(&self, ids: &[i64], at: DateTime<Utc>) -> Result<()>;

    // --- Content ---

    /// Insert as `pending` unless the URL is already known. Returns whether a row was added.
    async fn insert_content_if_new(&self, content: NewContentSource) -> Result<bool>;

    async fn get_content(&self, id: i64) -> Result<Option<ContentSource>>;

    async fn list_content(&self, filter: &ContentFilter) -> Result<Vec<ContentSource>>;

    /// Pending items, oldest first.
    async fn pending_content(&self, limit: i64) -> Result<Vec<ContentSource>>;

    /// Store a score and move the item from pending to scored.
    async fn record_score(&self, id: i64, score: f64) -> Result<ContentSource>;

    /// Move an item to `status`, validated against the content state machine.
    async fn set_content_status(&self, id: i64, status: ContentStatus) -> Result<ContentSource>;

    // --- Plans and carousels ---

    async fn create_plan(&self, plan: NewCarouselPlan) -> Result<CarouselPlan>;

    async fn get_plan(&self, id: i64) -> Result<Option<CarouselPlan>>;

    async fn create_carousel(&self, carousel: NewCarousel) -> Result<Carousel>;

    async fn get_carousel(&self, id: i64) -> Result<Option<CarouselSummary>>;

    /// Newest first.
    async fn list_carousels(&self, limit: i64) -> Result<Vec<CarouselSummary>>;

    // --- Runs ---

    /// Create a run in `queued` status.
    async fn create_run(&self, kind: RunKind, config: serde_json::Value) -> Result<PipelineRun>;

    async fn get_run(&self, id: i64) -> Result<Option<PipelineRun>>;

    /// Newest first, optionally restricted to one kind.
    async fn list_runs(&self, kind: Option<RunKind>, limit: i64) -> Result<Vec<PipelineRun>>;

    async fn start_run(&self, id: i64) -> Result<PipelineRun>;

    async fn complete_run(&self, id: i64, stats: serde_json::Value) -> Result<PipelineRun>;

    async fn fail_run(&self, id: i64, error: &str) -> Result<PipelineRun>;

    /// Oldest first.
    async fn runs_with_status(&self, status: RunStatus) -> Result<Vec<PipelineRun>>;

    // --- Dashboard ---

    async fn dashboard_stats(&self) -> Result<DashboardStats>;
}

/// Run lists are capped the same way content pages are.
pub(crate) fn clamp_limit(limit: i64) -> i64 {
    limit.clamp(1, content_factory_common::MAX_PAGE_SIZE)
}
