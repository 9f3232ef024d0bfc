//! Store configuration
//!
//! Conventions of the network data model that the store needs to know about.
//! Every field has a default, so an empty JSON object is a valid config.

use anyhow::Context;
use serde::Deserialize;
use std::path::Path;

/// Proximity tolerance in coordinate degrees (roughly one metre)
pub const DEFAULT_HIT_TOLERANCE: f64 = 0.000_01;
/// Layer whose elements are the trace entry points
pub const DEFAULT_SOURCE_LAYER: &str = "MVPT_HEADER";
/// Layer token used for domains shared by every layer
pub const DEFAULT_WILDCARD_LAYER: &str = "All_Layers";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub hit_tolerance: f64,
    pub source_layer_code: String,
    pub wildcard_layer_code: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            hit_tolerance: DEFAULT_HIT_TOLERANCE,
            source_layer_code: DEFAULT_SOURCE_LAYER.to_string(),
            wildcard_layer_code: DEFAULT_WILDCARD_LAYER.to_string(),
        }
    }
}

impl StoreConfig {
    pub fn from_json_str(text: &str) -> anyhow::Result<Self> {
        let config: StoreConfig =
            serde_json::from_str(text).context("Failed to parse store config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read store config {}", path.display()))?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.hit_tolerance.is_finite() && self.hit_tolerance > 0.0,
            "hit_tolerance must be a positive number, got {}",
            self.hit_tolerance
        );
        anyhow::ensure!(
            !self.wildcard_layer_code.trim().is_empty(),
            "wildcard_layer_code must not be blank"
        );
        Ok(())
    }
}
