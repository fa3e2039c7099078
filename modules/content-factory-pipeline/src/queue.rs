// In-process run queue. The pipeline_runs table is the durable record; the
// channel only carries run ids to the workers. Anything lost on shutdown is
// picked up again by `recover_runs` on the next start.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use content_factory_common::{PipelineRun, RunKind, RunStatus};
use content_factory_store::ContentStore;

use crate::RunExecutor;

pub const INTERRUPTED_BY_RESTART: &str = "interrupted by restart";

#[derive(Clone)]
pub struct RunQueue {
    store: Arc<dyn ContentStore>,
    tx: mpsc::Sender<i64>,
    rx: Arc<Mutex<mpsc::Receiver<i64>>>,
}

impl RunQueue {
    pub fn new(store: Arc<dyn ContentStore>, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            store,
            tx,
            rx: Arc::new(Mutex::new(rx)),
        }
    }

    /// Create a queued run and hand it to the workers.
    pub async fn enqueue(&self, kind: RunKind, config: serde_json::Value) -> Result<PipelineRun> {
        let run = self.store.create_run(kind, config).await?;
        self.push(run.id).await?;
        info!(run_id = run.id, kind = %kind, "Run queued");
        Ok(run)
    }

    /// Push an existing run id. Waits while the queue is full.
    pub async fn push(&self, run_id: i64) -> Result<()> {
        self.tx
            .send(run_id)
            .await
            .map_err(|_| anyhow!("run queue is closed"))
    }

    /// Run ids waiting for a worker.
    pub fn depth(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    /// Start `n` workers sharing the queue. They exit when `shutdown` fires.
    pub fn spawn_workers(
        &self,
        n: usize,
        executor: Arc<RunExecutor>,
        shutdown: CancellationToken,
    ) -> Vec<JoinHandle<()>> {
        (0..n.max(1))
            .map(|worker| {
                let rx = self.rx.clone();
                let executor = executor.clone();
                let shutdown = shutdown.clone();
                tokio::spawn(async move {
                    info!(worker, "Run worker started");
                    loop {
                        let next = tokio::select! {
                            _ = shutdown.cancelled() => break,
                            id = async { rx.lock().await.recv().await } => id,
                        };
                        let Some(run_id) = next else { break };
                        if let Err(e) = executor.execute(run_id).await {
                            error!(worker, run_id, error = %format!("{e:#}"), "Run execution error");
                        }
                    }
                    info!(worker, "Run worker stopped");
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryStats {
    pub failed: usize,
    pub requeued: usize,
}

/// Fail runs a previous process left running and requeue the ones it left queued.
///
/// Call after the workers are spawned so a long backlog cannot fill the channel.
pub async fn recover_runs(store: &dyn ContentStore, queue: &RunQueue) -> Result<RecoveryStats> {
    let mut stats = RecoveryStats::default();

    for run in store.runs_with_status(RunStatus::Running).await? {
        warn!(run_id = run.id, kind = %run.kind, "Failing run orphaned by restart");
        store.fail_run(run.id, INTERRUPTED_BY_RESTART).await?;
        stats.failed += 1;
    }

    for run in store.runs_with_status(RunStatus::Queued).await? {
        queue.push(run.id).await?;
        stats.requeued += 1;
    }

    if stats.failed > 0 || stats.requeued > 0 {
        info!(failed = stats.failed, requeued = stats.requeued, "Recovered runs from previous process");
    }
    Ok(stats)
}

/// Periodic liveness log with the current queue depth.
pub fn spawn_heartbeat(
    queue: RunQueue,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => info!(queue_depth = queue.depth(), "pong"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::testing::{account, MockScraper, TestPipeline};

    async fn wait_for_terminal(store: &dyn ContentStore, run_id: i64) -> PipelineRun {
        for _ in 0..200 {
            let run = store.get_run(run_id).await.unwrap().unwrap();
            if run.status.is_terminal() {
                return run;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("run {run_id} never finished");
    }

    #[tokio::test]
    async fn workers_execute_enqueued_runs() {
        let t = TestPipeline::new().with_scraper(
            MockScraper::new().on_search("wb", vec![account("wb_guru", 1)]),
        );
        let queue = RunQueue::new(t.store.clone(), 8);
        let shutdown = CancellationToken::new();
        let handles = queue.spawn_workers(2, Arc::new(RunExecutor::new(t.deps())), shutdown.clone());

        let first = queue
            .enqueue(RunKind::Discovery, json!({"queries": ["wb"]}))
            .await
            .unwrap();
        let second = queue.enqueue(RunKind::Harvest, json!({})).await.unwrap();
        assert_eq!(first.status, RunStatus::Queued);

        let first = wait_for_terminal(t.store.as_ref(), first.id).await;
        let second = wait_for_terminal(t.store.as_ref(), second.id).await;
        assert_eq!(first.status, RunStatus::Completed);
        assert_eq!(second.status, RunStatus::Completed);
        assert_eq!(second.stats["message"], "No active accounts to harvest");

        shutdown.cancel();
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn recovery_fails_running_and_requeues_queued() {
        let t = TestPipeline::new();
        let store = t.store.clone();
        let orphan = store.create_run(RunKind::Scoring, json!({})).await.unwrap();
        store.start_run(orphan.id).await.unwrap();
        let waiting = store.create_run(RunKind::Harvest, json!({})).await.unwrap();

        let queue = RunQueue::new(store.clone(), 8);
        let stats = recover_runs(store.as_ref(), &queue).await.unwrap();

        assert_eq!(stats, RecoveryStats { failed: 1, requeued: 1 });
        assert_eq!(queue.depth(), 1);
        let orphan = store.get_run(orphan.id).await.unwrap().unwrap();
        assert_eq!(orphan.status, RunStatus::Failed);
        assert_eq!(orphan.error_log.as_deref(), Some(INTERRUPTED_BY_RESTART));

        let shutdown = CancellationToken::new();
        queue.spawn_workers(1, Arc::new(RunExecutor::new(t.deps())), shutdown.clone());
        let waiting = wait_for_terminal(store.as_ref(), waiting.id).await;
        assert_eq!(waiting.status, RunStatus::Completed);
        assert_eq!(queue.depth(), 0);
        shutdown.cancel();
    }

    #[tokio::test]
    async fn heartbeat_stops_on_shutdown() {
        let t = TestPipeline::new();
        let queue = RunQueue::new(t.store.clone(), 4);
        let shutdown = CancellationToken::new();
        let handle = spawn_heartbeat(queue, Duration::from_millis(5), shutdown.clone());
        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.cancel();
        handle.await.unwrap();
    }
}
