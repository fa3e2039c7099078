use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::PipelineDeps;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringParams {
    pub batch_size: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringStats {
    pub scored: usize,
    pub failed: usize,
}

/// Score up to `batch_size` pending items, oldest first.
///
/// A failure on one item is logged and leaves it pending for the next run.
pub async fn run(deps: &PipelineDeps, params: ScoringParams) -> Result<ScoringStats> {
    let batch = params.batch_size.unwrap_or(deps.config.scoring.batch_size);
    score_pending(deps, batch).await
}

/// Synchronous scoring for the analyze endpoint, capped at `quick_batch_size`.
pub async fn quick_analyze(deps: &PipelineDeps) -> Result<ScoringStats> {
    score_pending(deps, deps.config.scoring.quick_batch_size).await
}

async fn score_pending(deps: &PipelineDeps, batch: u32) -> Result<ScoringStats> {
    let analyzer = deps.analyzer()?;
    let pending = deps.store.pending_content(batch as i64).await?;

    let mut stats = ScoringStats::default();
    for item in &pending {
        let outcome = match analyzer.score(item).await {
            Ok(score) => deps
                .store
                .record_score(item.id, score)
                .await
                .map_err(anyhow::Error::from),
            Err(e) => Err(e),
        };
        match outcome {
            Ok(_) => stats.scored += 1,
            Err(e) => {
                error!(content_id = item.id, error = %format!("{e:#}"), "Scoring failed");
                stats.failed += 1;
            }
        }
    }

    info!(scored = stats.scored, failed = stats.failed, "Scoring finished");
    Ok(stats)
}
