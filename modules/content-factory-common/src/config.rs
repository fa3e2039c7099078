use std::path::PathBuf;

use anyhow::{Context, Result};

pub const DEFAULT_STORAGE_DIR: &str = "./storage";

/// Application configuration loaded from environment variables.
/// Contains only secrets and env-specific values; models, actors and
/// batch sizes live in the TOML FileConfig.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // Database (absent only in --in-memory mode)
    pub database_url: Option<String>,

    // AI
    pub openai_api_key: Option<String>,

    // Scraping
    pub apify_api_token: Option<String>,

    // Blob storage root for carousel bundles
    pub storage_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let config = Self::from_lookup(|key| std::env::var(key).ok());
        config.log_keys();
        Ok(config)
    }

    /// Build from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            database_url: get("DATABASE_URL"),
            openai_api_key: get("OPENAI_API_KEY"),
            apify_api_token: get("APIFY_API_TOKEN").or_else(|| get("APIFY_API_KEY")),
            storage_dir: get("STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR)),
        }
    }

    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL is required (or pass --in-memory)")
    }

    fn log_keys(&self) {
        fn preview(val: &Option<String>) -> String {
            match val {
                Some(v) if !v.is_empty() => {
                    let prefix: String = v.chars().take(5).collect();
                    format!("{}...({} chars)", prefix, v.len())
                }
                _ => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!(
            "  DATABASE_URL: {}",
            if self.database_url.is_some() { "<set>" } else { "<not set>" }
        );
        tracing::info!("  OPENAI_API_KEY: {}", preview(&self.openai_api_key));
        tracing::info!("  APIFY_API_TOKEN: {}", preview(&self.apify_api_token));
        tracing::info!("  STORAGE_DIR: {}", self.storage_dir.display());
    }
}
