// In-memory ContentStore. Same ordering and transition rules as PgStore,
// so pipeline and API tests exercise the real semantics without Postgres.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use content_factory_common::{
    Account, Carousel, CarouselPlan, CarouselStatus, CarouselSummary, ContentFactoryError,
    ContentFilter, ContentSource, ContentStatus, DashboardStats, NewAccount, NewCarousel,
    NewCarouselPlan, NewContentSource, PipelineRun, Platform, Result, RunKind, RunStatus,
};

use crate::{clamp_limit, ContentStore};

#[derive(Default)]
struct Tables {
    accounts: BTreeMap<i64, Account>,
    content: BTreeMap<i64, ContentSource>,
    plans: BTreeMap<i64, CarouselPlan>,
    carousels: BTreeMap<i64, Carousel>,
    runs: BTreeMap<i64, PipelineRun>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn summary(&self, carousel: &Carousel) -> CarouselSummary {
        let plan = self.plans.get(&carousel.plan_id);
        CarouselSummary {
            carousel: carousel.clone(),
            plan_title: plan.map(|p| p.title.clone()).unwrap_or_default(),
            source_id: plan.and_then(|p| p.source_id),
        }
    }

    fn run_mut(&mut self, id: i64) -> Result<&mut PipelineRun> {
        self.runs
            .get_mut(&id)
            .ok_or_else(|| ContentFactoryError::not_found("run", id))
    }

    fn content_mut(&mut self, id: i64) -> Result<&mut ContentSource> {
        self.content
            .get_mut(&id)
            .ok_or_else(|| ContentFactoryError::not_found("content", id))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Score descending with unscored items last, then newest first.
fn by_score_then_newest(a: &ContentSource, b: &ContentSource) -> Ordering {
    match (a.score, b.score) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| b.created_at.cmp(&a.created_at))
    .then_with(|| b.id.cmp(&a.id))
}

fn matches_filter(item: &ContentSource, filter: &ContentFilter) -> bool {
    let statuses = filter.status_set();
    if !statuses.is_empty() && !statuses.contains(&item.status) {
        return false;
    }
    if filter.platform.is_some_and(|p| p != item.platform) {
        return false;
    }
    if let Some(min) = filter.min_score {
        if item.score.is_none_or(|s| s < min) {
            return false;
        }
    }
    if let Some(term) = filter.search_term() {
        let caption_hit = item
            .caption
            .as_deref()
            .is_some_and(|c| c.to_lowercase().contains(&term));
        if !caption_hit && !item.url.to_lowercase().contains(&term) {
            return false;
        }
    }
    true
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn create_account(&self, account: NewAccount) -> Result<Account> {
        let mut t = self.tables.write().await;
        let username = account.username.trim().trim_start_matches('@').to_string();
        if username.is_empty() {
            return Err(ContentFactoryError::Validation("username is required".into()));
        }
        if t
            .accounts
            .values()
            .any(|a| a.platform == account.platform && a.username == username)
        {
            return Err(ContentFactoryError::Conflict(format!(
                "{} account '{}' already exists",
                account.platform, username
            )));
        }
        let now = Utc::now();
        let id = t.next_id();
        let row = Account {
            id,
            platform: account.platform,
            username,
            followers: account.followers,
            category: account.category,
            is_active: true,
            last_parsed_at: None,
            created_at: now,
            updated_at: now,
        };
        t.accounts.insert(id, row.clone());
        Ok(row)
    }

    async fn insert_candidate_account(
        &self,
        platform: Platform,
        username: &str,
        followers: Option<i64>,
    ) -> Result<bool> {
        let result = self
            .create_account(NewAccount {
                platform,
                username: username.to_string(),
                followers,
                category: Some("candidate".into()),
            })
            .await;
        match result {
            Ok(_) => Ok(true),
            Err(ContentFactoryError::Conflict(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn list_accounts(&self) -> Result<Vec<Account>> {
        let t = self.tables.read().await;
        let mut rows: Vec<Account> = t.accounts.values().cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn active_accounts(&self, limit: i64) -> Result<Vec<Account>> {
        let t = self.tables.read().await;
        let mut rows: Vec<Account> = t.accounts.values().filter(|a| a.is_active).cloned().collect();
        // None sorts before Some, so never-parsed accounts come first.
        rows.sort_by(|a, b| a.last_parsed_at.cmp(&b.last_parsed_at).then(a.id.cmp(&b.id)));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn set_account_active(&self, id: i64, active: bool) -> Result<Account> {
        let mut t = self.tables.write().await;
        let account = t
            .accounts
            .get_mut(&id)
            .ok_or_else(|| ContentFactoryError::not_found("account", id))?;
        account.is_active = active;
        account.updated_at = Utc::now();
        Ok(account.clone())
    }

    async fn mark_accounts_parsed(&self, ids: &[i64], at: DateTime<Utc>) -> Result<()> {
        let mut t = self.tables.write().await;
        for id in ids {
            if let Some(account) = t.accounts.get_mut(id) {
                account.last_parsed_at = Some(at);
                account.updated_at = at;
            }
        }
        Ok(())
    }

    async fn insert_content_if_new(&self, content: NewContentSource) -> Result<bool> {
        let mut t = self.tables.write().await;
        if t.content.values().any(|c| c.url == content.url) {
            return Ok(false);
        }
        let now = Utc::now();
        let id = t.next_id();
        t.content.insert(
            id,
            ContentSource {
                id,
                url: content.url,
                platform: content.platform,
                caption: content.caption,
                metadata: content.metadata,
                status: ContentStatus::Pending,
                score: None,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(true)
    }

    async fn get_content(&self, id: i64) -> Result<Option<ContentSource>> {
        Ok(self.tables.read().await.content.get(&id).cloned())
    }

    async fn list_content(&self, filter: &ContentFilter) -> Result<Vec<ContentSource>> {
        let t = self.tables.read().await;
        let mut rows: Vec<ContentSource> = t
            .content
            .values()
            .filter(|c| matches_filter(c, filter))
            .cloned()
            .collect();
        rows.sort_by(by_score_then_newest);
        Ok(rows
            .into_iter()
            .skip(filter.effective_offset() as usize)
            .take(filter.effective_limit() as usize)
            .collect())
    }

    async fn pending_content(&self, limit: i64) -> Result<Vec<ContentSource>> {
        let t = self.tables.read().await;
        let mut rows: Vec<ContentSource> = t
            .content
            .values()
            .filter(|c| c.status == ContentStatus::Pending)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn record_score(&self, id: i64, score: f64) -> Result<ContentSource> {
        let mut t = self.tables.write().await;
        let item = t.content_mut(id)?;
        if item.status != ContentStatus::Pending {
            return Err(ContentFactoryError::InvalidTransition {
                entity: "content",
                from: item.status.to_string(),
                to: ContentStatus::Scored.to_string(),
            });
        }
        item.status = item.status.transition(ContentStatus::Scored)?;
        item.score = Some(score);
        item.updated_at = Utc::now();
        Ok(item.clone())
    }

    async fn set_content_status(&self, id: i64, status: ContentStatus) -> Result<ContentSource> {
        let mut t = self.tables.write().await;
        let item = t.content_mut(id)?;
        item.status = item.status.transition(status)?;
        item.updated_at = Utc::now();
        Ok(item.clone())
    }

    async fn create_plan(&self, plan: NewCarouselPlan) -> Result<CarouselPlan> {
        let mut t = self.tables.write().await;
        if let Some(source_id) = plan.source_id {
            if !t.content.contains_key(&source_id) {
                return Err(ContentFactoryError::not_found("content", source_id));
            }
        }
        let id = t.next_id();
        let row = CarouselPlan {
            id,
            source_id: plan.source_id,
            title: plan.title,
            description: plan.description,
            structure: plan.structure,
            status: plan.status,
            theme: plan.theme,
            created_at: Utc::now(),
        };
        t.plans.insert(id, row.clone());
        Ok(row)
    }

    async fn get_plan(&self, id: i64) -> Result<Option<CarouselPlan>> {
        Ok(self.tables.read().await.plans.get(&id).cloned())
    }

    async fn create_carousel(&self, carousel: NewCarousel) -> Result<Carousel> {
        let mut t = self.tables.write().await;
        if !t.plans.contains_key(&carousel.plan_id) {
            return Err(ContentFactoryError::not_found("plan", carousel.plan_id));
        }
        let id = t.next_id();
        let row = Carousel {
            id,
            plan_id: carousel.plan_id,
            bundle_id: carousel.bundle_id,
            zip_object_key: carousel.zip_object_key,
            thumbnail_object_key: carousel.thumbnail_object_key,
            slide_count: carousel.slide_count,
            status: CarouselStatus::Ready,
            published_at: None,
            created_at: Utc::now(),
        };
        t.carousels.insert(id, row.clone());
        Ok(row)
    }

    async fn get_carousel(&self, id: i64) -> Result<Option<CarouselSummary>> {
        let t = self.tables.read().await;
        Ok(t.carousels.get(&id).map(|c| t.summary(c)))
    }

    async fn list_carousels(&self, limit: i64) -> Result<Vec<CarouselSummary>> {
        let t = self.tables.read().await;
        let mut rows: Vec<CarouselSummary> = t.carousels.values().map(|c| t.summary(c)).collect();
        rows.sort_by(|a, b| {
            b.carousel
                .created_at
                .cmp(&a.carousel.created_at)
                .then(b.carousel.id.cmp(&a.carousel.id))
        });
        rows.truncate(clamp_limit(limit) as usize);
        Ok(rows)
    }

    async fn create_run(&self, kind: RunKind, config: serde_json::Value) -> Result<PipelineRun> {
        let mut t = self.tables.write().await;
        let id = t.next_id();
        let run = PipelineRun {
            id,
            kind,
            status: RunStatus::Queued,
            config,
            stats: serde_json::json!({}),
            error_log: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        };
        t.runs.insert(id, run.clone());
        Ok(run)
    }

    async fn get_run(&self, id: i64) -> Result<Option<PipelineRun>> {
        Ok(self.tables.read().await.runs.get(&id).cloned())
    }

    async fn list_runs(&self, kind: Option<RunKind>, limit: i64) -> Result<Vec<PipelineRun>> {
        let t = self.tables.read().await;
        let mut rows: Vec<PipelineRun> = t
            .runs
            .values()
            .filter(|r| kind.is_none_or(|k| r.kind == k))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        rows.truncate(clamp_limit(limit) as usize);
        Ok(rows)
    }

    async fn start_run(&self, id: i64) -> Result<PipelineRun> {
        let mut t = self.tables.write().await;
        let run = t.run_mut(id)?;
        run.status = run.status.transition(RunStatus::Running)?;
        run.started_at = Some(Utc::now());
        Ok(run.clone())
    }

    async fn complete_run(&self, id: i64, stats: serde_json::Value) -> Result<PipelineRun> {
        let mut t = self.tables.write().await;
        let run = t.run_mut(id)?;
        run.status = run.status.transition(RunStatus::Completed)?;
        run.stats = stats;
        run.finished_at = Some(Utc::now());
        Ok(run.clone())
    }

    async fn fail_run(&self, id: i64, error: &str) -> Result<PipelineRun> {
        let mut t = self.tables.write().await;
        let run = t.run_mut(id)?;
        run.status = run.status.transition(RunStatus::Failed)?;
        run.error_log = Some(error.to_string());
        run.finished_at = Some(Utc::now());
        Ok(run.clone())
    }

    async fn runs_with_status(&self, status: RunStatus) -> Result<Vec<PipelineRun>> {
        let t = self.tables.read().await;
        Ok(t.runs.values().filter(|r| r.status == status).cloned().collect())
    }

    async fn dashboard_stats(&self) -> Result<DashboardStats> {
        let t = self.tables.read().await;
        let mut stats = DashboardStats {
            content_total: t.content.len() as i64,
            carousels_total: t.carousels.len() as i64,
            accounts_active: t.accounts.values().filter(|a| a.is_active).count() as i64,
            ..Default::default()
        };
        for item in t.content.values() {
            *stats
                .content_by_status
                .entry(item.status.to_string())
                .or_insert(0) += 1;
        }
        let scores: Vec<f64> = t.content.values().filter_map(|c| c.score).collect();
        if !scores.is_empty() {
            stats.average_score = Some(scores.iter().sum::<f64>() / scores.len() as f64);
        }
        Ok(stats)
    }
}
