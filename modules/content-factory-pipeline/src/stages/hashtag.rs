use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

use content_factory_common::{NewContentSource, Platform};

use crate::traits::PostKind;
use crate::PipelineDeps;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestStats {
    pub parsed: usize,
    pub saved: usize,
}

/// Scrape a hashtag and keep reels and carousels as pending content.
pub async fn ingest(deps: &PipelineDeps, hashtag: &str) -> Result<IngestStats> {
    let scraper = deps.scraper()?;
    let hashtag = hashtag.trim().trim_start_matches('#');
    let posts = scraper
        .hashtag_posts(hashtag, deps.config.hashtag.amount)
        .await?;

    let kept: Vec<_> = posts
        .into_iter()
        .filter(|p| matches!(p.kind, PostKind::Reel | PostKind::Carousel))
        .collect();

    let mut stats = IngestStats {
        parsed: kept.len(),
        saved: 0,
    };
    for post in kept {
        let Some(url) = post.url.clone() else {
            continue;
        };
        let inserted = deps
            .store
            .insert_content_if_new(NewContentSource {
                url,
                platform: Platform::Instagram,
                caption: post.caption.clone(),
                metadata: post.metadata(),
            })
            .await?;
        if inserted {
            stats.saved += 1;
        }
    }

    info!(hashtag, parsed = stats.parsed, saved = stats.saved, "Hashtag ingest finished");
    Ok(stats)
}
