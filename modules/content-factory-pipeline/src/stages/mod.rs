//! One module per pipeline stage. Each takes its JSON params (unknown keys
//! ignored, missing keys fall back to the TOML defaults) and returns stats.

pub mod discovery;
pub mod generation;
pub mod harvest;
pub mod hashtag;
pub mod scoring;

use serde::de::DeserializeOwned;

use content_factory_common::RunKind;

use crate::PipelineError;

/// Parse a run's config object. `null` means all defaults.
pub(crate) fn parse_params<T: DeserializeOwned + Default>(
    kind: &'static str,
    config: &serde_json::Value,
) -> Result<T, PipelineError> {
    if config.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(config.clone()).map_err(|e| PipelineError::InvalidConfig {
        kind,
        message: e.to_string(),
    })
}

/// Check a config against its kind's params without running anything.
pub fn validate_config(kind: RunKind, config: &serde_json::Value) -> Result<(), PipelineError> {
    match kind {
        RunKind::Discovery => parse_params::<discovery::DiscoveryParams>("discovery", config)
            .map(drop),
        RunKind::Harvest => parse_params::<harvest::HarvestParams>("harvest", config).map(drop),
        RunKind::Scoring => parse_params::<scoring::ScoringParams>("scoring", config).map(drop),
        RunKind::Generation => parse_params::<generation::GenerationParams>("generation", config)
            .map(drop),
    }
}
