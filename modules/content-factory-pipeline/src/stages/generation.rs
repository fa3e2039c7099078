use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use content_factory_common::{
    ContentFactoryError, ContentStatus, NewCarousel, NewCarouselPlan, PlanStatus,
};

use crate::PipelineDeps;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerationParams {
    pub content_source_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub plan_id: i64,
    pub carousel_id: i64,
    pub slides: usize,
}

pub fn zip_key(plan_id: i64) -> String {
    format!("carousels/carousel_{plan_id}.zip")
}

pub fn thumbnail_key(plan_id: i64) -> String {
    format!("carousels/carousel_{plan_id}.png")
}

/// Plan, render, upload and record a carousel for one approved content item.
pub async fn run(deps: &PipelineDeps, params: GenerationParams) -> Result<GenerationStats> {
    let source_id = params
        .content_source_id
        .context("generation requires content_source_id")?;

    let source = deps
        .store
        .get_content(source_id)
        .await?
        .ok_or(ContentFactoryError::not_found("content", source_id))?;
    if source.status != ContentStatus::Approved {
        bail!(
            "content {source_id} is {} and must be approved before generation",
            source.status
        );
    }

    let plan = deps.analyzer()?.plan(&source).await?;

    let plan_row = deps
        .store
        .create_plan(NewCarouselPlan {
            source_id: Some(source.id),
            title: plan.title.clone(),
            description: plan.description.clone(),
            structure: plan.to_value(),
            status: PlanStatus::Ready,
            theme: deps.config.renderer.theme(),
        })
        .await?;

    let renderer = deps.renderer.clone();
    let bundle = tokio::task::spawn_blocking(move || renderer.package(&plan))
        .await
        .context("render task panicked")??;

    let zip_object_key = zip_key(plan_row.id);
    let thumbnail_object_key = thumbnail_key(plan_row.id);
    deps.storage.put(&zip_object_key, bundle.zip).await?;
    deps.storage
        .put(&thumbnail_object_key, bundle.thumbnail)
        .await?;

    let carousel = deps
        .store
        .create_carousel(NewCarousel {
            plan_id: plan_row.id,
            bundle_id: bundle.bundle_id,
            zip_object_key,
            thumbnail_object_key: Some(thumbnail_object_key),
            slide_count: bundle.slide_count as i32,
        })
        .await?;

    deps.store
        .set_content_status(source.id, ContentStatus::Completed)
        .await?;

    info!(
        content_id = source.id,
        plan_id = plan_row.id,
        carousel_id = carousel.id,
        bundle_id = %bundle.bundle_id,
        slides = bundle.slide_count,
        "Carousel generated"
    );

    Ok(GenerationStats {
        plan_id: plan_row.id,
        carousel_id: carousel.id,
        slides: bundle.slide_count,
    })
}
