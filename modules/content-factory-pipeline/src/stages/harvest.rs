use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use content_factory_common::{NewContentSource, Platform};

use crate::PipelineDeps;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HarvestParams {
    pub accounts_limit: Option<u32>,
    pub posts_per_profile: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HarvestStats {
    pub found: usize,
    pub saved: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub const NO_ACCOUNTS_MESSAGE: &str = "No active accounts to harvest";

/// Scrape recent posts from the least recently parsed active accounts.
pub async fn run(deps: &PipelineDeps, params: HarvestParams) -> Result<HarvestStats> {
    let defaults = &deps.config.harvest;
    let accounts_limit = params.accounts_limit.unwrap_or(defaults.accounts_limit);
    let per_profile = params.posts_per_profile.unwrap_or(defaults.posts_per_profile);

    let accounts = deps.store.active_accounts(accounts_limit as i64).await?;
    if accounts.is_empty() {
        info!("{NO_ACCOUNTS_MESSAGE}");
        return Ok(HarvestStats {
            message: Some(NO_ACCOUNTS_MESSAGE.into()),
            ..Default::default()
        });
    }

    let scraper = deps.scraper()?;
    let usernames: Vec<String> = accounts.iter().map(|a| a.username.clone()).collect();
    let posts = scraper.profile_posts(&usernames, per_profile).await?;

    let mut stats = HarvestStats {
        found: posts.len(),
        ..Default::default()
    };
    for post in posts {
        let Some(url) = post.url.clone() else {
            continue;
        };
        let mut metadata = post.metadata();
        metadata["raw"] = post.raw.clone();
        let inserted = deps
            .store
            .insert_content_if_new(NewContentSource {
                url,
                platform: Platform::Instagram,
                caption: post.caption.clone(),
                metadata,
            })
            .await?;
        if inserted {
            stats.saved += 1;
        }
    }

    let ids: Vec<i64> = accounts.iter().map(|a| a.id).collect();
    deps.store.mark_accounts_parsed(&ids, Utc::now()).await?;

    info!(
        accounts = accounts.len(),
        found = stats.found,
        saved = stats.saved,
        "Harvest finished"
    );
    Ok(stats)
}
