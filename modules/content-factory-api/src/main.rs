use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ai_client::OpenAi;
use apify_client::ApifyClient;
use content_factory_api::{router, AppState};
use content_factory_common::file_config::{load_config_or_default, DEFAULT_CONFIG_PATH};
use content_factory_common::AppConfig;
use content_factory_pipeline::infra::{ApifyScraper, LocalBlobStorage, OpenAiAnalyzer};
use content_factory_pipeline::{
    recover_runs, spawn_heartbeat, ContentAnalyzer, PipelineDeps, RunExecutor, RunQueue,
    SocialScraper,
};
use content_factory_renderer::CarouselRenderer;
use content_factory_store::{ContentStore, MemoryStore, PgStore};

#[derive(Parser)]
#[command(name = "content-factory-api", about = "Content Factory pipeline API")]
struct Cli {
    /// Path to config TOML file
    #[arg(long, env = "CONTENT_FACTORY_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Keep everything in memory instead of Postgres
    #[arg(long)]
    in_memory: bool,
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| anyhow::anyhow!("failed to init tracing: {e}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing()?;
    let cli = Cli::parse();

    let file_config = Arc::new(load_config_or_default(&cli.config)?);
    let config = AppConfig::from_env()?;

    let store: Arc<dyn ContentStore> = if cli.in_memory {
        info!("Using in-memory store; data is lost on exit");
        Arc::new(MemoryStore::new())
    } else {
        let store = PgStore::connect(config.require_database_url()?, 10)
            .await
            .context("Failed to connect to Postgres")?;
        store.migrate().await.context("Failed to run migrations")?;
        info!("Connected to database, migrations complete");
        Arc::new(store)
    };

    let scraper = config.apify_api_token.as_ref().map(|token| {
        Arc::new(ApifyScraper::new(ApifyClient::new(token.clone()), &file_config))
            as Arc<dyn SocialScraper>
    });
    let analyzer = config.openai_api_key.as_ref().map(|key| {
        let ai = OpenAi::new(key.as_str(), file_config.models.scoring.as_str());
        Arc::new(OpenAiAnalyzer::new(ai, &file_config)) as Arc<dyn ContentAnalyzer>
    });
    if scraper.is_none() {
        tracing::warn!("APIFY_API_TOKEN not set, scraping endpoints will return 503");
    }
    if analyzer.is_none() {
        tracing::warn!("OPENAI_API_KEY not set, scoring and generation will fail");
    }

    let deps = PipelineDeps {
        store: store.clone(),
        scraper,
        analyzer,
        storage: Arc::new(LocalBlobStorage::new(&config.storage_dir)),
        renderer: Arc::new(CarouselRenderer::new(&file_config.renderer)),
        config: file_config.clone(),
    };

    // Workers first, so requeued runs cannot fill the channel with nobody reading.
    let workers = &file_config.workers;
    let shutdown = CancellationToken::new();
    let queue = RunQueue::new(store.clone(), workers.queue_capacity);
    let executor = Arc::new(RunExecutor::new(deps.clone()));
    let handles = queue.spawn_workers(workers.concurrency, executor, shutdown.clone());
    recover_runs(store.as_ref(), &queue).await?;
    spawn_heartbeat(queue.clone(), workers.heartbeat_interval(), shutdown.clone());

    let app = router(Arc::new(AppState { deps, queue }));

    let addr = format!("{}:{}", file_config.server.host, file_config.server.port);
    info!(workers = handles.len(), "Content Factory API starting on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown requested");
            signal.cancel();
        })
        .await?;

    for handle in handles {
        handle.await.ok();
    }
    Ok(())
}
