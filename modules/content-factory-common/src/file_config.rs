use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::status::Theme;

pub const DEFAULT_CONFIG_PATH: &str = "./config/content-factory.toml";

/// TOML-backed configuration loaded from disk.
/// Secrets (API keys, DB URL) stay as env vars. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub server: ServerConfig,
    pub models: ModelsConfig,
    pub discovery: DiscoveryConfig,
    pub harvest: HarvestConfig,
    pub hashtag: HashtagConfig,
    pub scoring: ScoringConfig,
    pub renderer: RendererConfig,
    pub workers: WorkersConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// `*` allows any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            allowed_origins: vec!["*".into()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelsConfig {
    pub scoring: String,
    pub planning: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            scoring: "gpt-4-turbo-preview".into(),
            planning: "gpt-4-turbo-preview".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiscoveryConfig {
    pub actor_id: String,
    pub queries: Vec<String>,
    pub limit_per_query: u32,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            actor_id: "apify/instagram-search-scraper".into(),
            queries: vec!["wildberries".into(), "бизнес на вб".into()],
            limit_per_query: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarvestConfig {
    pub actor_id: String,
    pub accounts_limit: u32,
    pub posts_per_profile: u32,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            actor_id: "apify/instagram-scraper".into(),
            accounts_limit: 5,
            posts_per_profile: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HashtagConfig {
    pub actor_id: String,
    pub amount: u32,
    pub default_hashtag: String,
}

impl Default for HashtagConfig {
    fn default() -> Self {
        Self {
            actor_id: "apify/instagram-hashtag-scraper".into(),
            amount: 10,
            default_hashtag: "wildberries".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringConfig {
    pub batch_size: u32,
    pub quick_batch_size: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            quick_batch_size: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RendererConfig {
    pub theme: String,
    pub font_bold: PathBuf,
    pub font_regular: PathBuf,
    pub footer: String,
}

impl RendererConfig {
    pub fn theme(&self) -> Theme {
        Theme::from_name(&self.theme)
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            theme: "dark".into(),
            font_bold: PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf"),
            font_regular: PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"),
            footer: "CONTENT FACTORY | WILDBERRIES".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkersConfig {
    pub concurrency: usize,
    pub queue_capacity: usize,
    pub heartbeat_secs: u64,
    pub apify_timeout_secs: u64,
}

impl WorkersConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs.max(1))
    }

    pub fn apify_timeout(&self) -> Duration {
        Duration::from_secs(self.apify_timeout_secs.max(1))
    }
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            concurrency: 2,
            queue_capacity: 256,
            heartbeat_secs: 60,
            apify_timeout_secs: 300,
        }
    }
}

/// Load and parse a TOML config file.
pub fn load_config(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

pub fn parse_config(content: &str) -> Result<FileConfig> {
    Ok(toml::from_str(content)?)
}

/// Load the config if the file exists; a missing file means all defaults.
pub fn load_config_or_default(path: &Path) -> Result<FileConfig> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::info!(path = %path.display(), "No config file found, using defaults");
        Ok(FileConfig::default())
    }
}
