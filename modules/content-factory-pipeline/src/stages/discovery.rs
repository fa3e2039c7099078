use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use content_factory_common::Platform;

use crate::PipelineDeps;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscoveryParams {
    pub queries: Option<Vec<String>>,
    pub limit_per_query: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryStats {
    pub found: usize,
    pub saved: usize,
}

/// Search for accounts by keyword and store new ones as active candidates.
pub async fn run(deps: &PipelineDeps, params: DiscoveryParams) -> Result<DiscoveryStats> {
    let scraper = deps.scraper()?;
    let defaults = &deps.config.discovery;
    let queries = params.queries.unwrap_or_else(|| defaults.queries.clone());
    let limit = params.limit_per_query.unwrap_or(defaults.limit_per_query);

    let mut stats = DiscoveryStats::default();
    for query in queries.iter().map(|q| q.trim()).filter(|q| !q.is_empty()) {
        let accounts = scraper.search_accounts(query, limit).await?;
        stats.found += accounts.len();

        for account in accounts {
            let Some(username) = account.username.filter(|u| !u.trim().is_empty()) else {
                warn!(query, "Search result without username, skipping");
                continue;
            };
            if deps
                .store
                .insert_candidate_account(Platform::Instagram, &username, account.followers)
                .await?
            {
                stats.saved += 1;
            }
        }
    }

    info!(found = stats.found, saved = stats.saved, "Discovery finished");
    Ok(stats)
}
