use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{error, info, info_span, Instrument};

use content_factory_common::{ContentFactoryError, PipelineRun, RunKind, RunStatus};

use crate::stages::{self, parse_params};
use crate::PipelineDeps;

/// Executes one pipeline run: queued → running → completed | failed.
pub struct RunExecutor {
    deps: PipelineDeps,
}

fn to_stats<T: Serialize>(stats: T) -> Result<serde_json::Value> {
    serde_json::to_value(stats).context("Failed to serialize run stats")
}

impl RunExecutor {
    pub fn new(deps: PipelineDeps) -> Self {
        Self { deps }
    }

    pub fn deps(&self) -> &PipelineDeps {
        &self.deps
    }

    /// Execute a queued run to a terminal state.
    ///
    /// Returns `None` when the run was not queued (already picked up or
    /// finished) and was skipped. Stage failures are recorded on the run,
    /// not returned; only store errors surface as `Err`.
    pub async fn execute(&self, run_id: i64) -> Result<Option<PipelineRun>> {
        let store = &self.deps.store;
        let run = store
            .get_run(run_id)
            .await?
            .ok_or(ContentFactoryError::not_found("run", run_id))?;

        if run.status != RunStatus::Queued {
            info!(run_id, status = %run.status, "Run is not queued, skipping");
            return Ok(None);
        }

        let run = match store.start_run(run_id).await {
            Ok(run) => run,
            // Another worker won the race.
            Err(ContentFactoryError::InvalidTransition { .. }) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let span = info_span!("run", run_id, kind = %run.kind);
        let outcome = self.dispatch(&run).instrument(span).await;

        let finished = match outcome {
            Ok(stats) => {
                info!(run_id, kind = %run.kind, stats = %stats, "Run completed");
                store.complete_run(run_id, stats).await?
            }
            Err(e) => {
                let message = format!("{e:#}");
                error!(run_id, kind = %run.kind, error = %message, "Run failed");
                store.fail_run(run_id, &message).await?
            }
        };
        Ok(Some(finished))
    }

    async fn dispatch(&self, run: &PipelineRun) -> Result<serde_json::Value> {
        let deps = &self.deps;
        match run.kind {
            RunKind::Discovery => {
                let params = parse_params("discovery", &run.config)?;
                to_stats(stages::discovery::run(deps, params).await?)
            }
            RunKind::Harvest => {
                let params = parse_params("harvest", &run.config)?;
                to_stats(stages::harvest::run(deps, params).await?)
            }
            RunKind::Scoring => {
                let params = parse_params("scoring", &run.config)?;
                to_stats(stages::scoring::run(deps, params).await?)
            }
            RunKind::Generation => {
                let params = parse_params("generation", &run.config)?;
                to_stats(stages::generation::run(deps, params).await?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use content_factory_common::{NewContentSource, Platform};
    use content_factory_store::ContentStore;

    use crate::testing::{account, MockAnalyzer, MockScraper, TestPipeline};

    #[tokio::test]
    async fn completed_run_records_stats() {
        let t = TestPipeline::new().with_scraper(
            MockScraper::new().on_search("wb", vec![account("wb_guru", 10)]),
        );
        let executor = RunExecutor::new(t.deps());
        let run = t
            .store
            .create_run(RunKind::Discovery, json!({"queries": ["wb"]}))
            .await
            .unwrap();

        let done = executor.execute(run.id).await.unwrap().unwrap();

        assert_eq!(done.status, RunStatus::Completed);
        assert_eq!(done.stats, json!({"found": 1, "saved": 1}));
        assert!(done.started_at.is_some());
        assert!(done.finished_at.is_some());
        assert!(done.error_log.is_none());
    }

    #[tokio::test]
    async fn stage_error_fails_run_with_message() {
        let t = TestPipeline::new();
        let executor = RunExecutor::new(t.deps());
        let run = t
            .store
            .create_run(RunKind::Discovery, serde_json::Value::Null)
            .await
            .unwrap();

        let done = executor.execute(run.id).await.unwrap().unwrap();

        assert_eq!(done.status, RunStatus::Failed);
        assert_eq!(
            done.error_log.as_deref(),
            Some("APIFY_API_TOKEN is not configured")
        );
    }

    #[tokio::test]
    async fn invalid_config_fails_run() {
        let t = TestPipeline::new().with_analyzer(MockAnalyzer::new());
        let executor = RunExecutor::new(t.deps());
        let run = t
            .store
            .create_run(RunKind::Scoring, json!({"batch_size": "lots"}))
            .await
            .unwrap();

        let done = executor.execute(run.id).await.unwrap().unwrap();
        assert_eq!(done.status, RunStatus::Failed);
        assert!(done
            .error_log
            .unwrap_or_default()
            .starts_with("invalid scoring config"));
    }

    #[tokio::test]
    async fn scoring_run_completes_despite_item_failures() {
        let t = TestPipeline::new();
        t.store
            .insert_content_if_new(NewContentSource {
                url: "https://www.instagram.com/reel/x/".into(),
                platform: Platform::Instagram,
                caption: None,
                metadata: json!({}),
            })
            .await
            .unwrap();
        let id = t.store.pending_content(1).await.unwrap()[0].id;
        let t = t.with_analyzer(MockAnalyzer::new().fail_for(id));
        let executor = RunExecutor::new(t.deps());
        let run = t
            .store
            .create_run(RunKind::Scoring, json!({}))
            .await
            .unwrap();

        let done = executor.execute(run.id).await.unwrap().unwrap();
        assert_eq!(done.status, RunStatus::Completed);
        assert_eq!(done.stats, json!({"scored": 0, "failed": 1}));
    }

    #[tokio::test]
    async fn non_queued_run_is_skipped() {
        let t = TestPipeline::new();
        let executor = RunExecutor::new(t.deps());
        let run = t
            .store
            .create_run(RunKind::Harvest, json!({}))
            .await
            .unwrap();
        t.store.start_run(run.id).await.unwrap();

        assert!(executor.execute(run.id).await.unwrap().is_none());
        let still = t.store.get_run(run.id).await.unwrap().unwrap();
        assert_eq!(still.status, RunStatus::Running);
    }

    #[tokio::test]
    async fn missing_run_is_an_error() {
        let t = TestPipeline::new();
        let executor = RunExecutor::new(t.deps());
        assert!(executor.execute(12345).await.is_err());
    }
}
