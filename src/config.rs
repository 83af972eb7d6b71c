// src/config.rs
use crate::utils::AppError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment override for [`ExtractorConfig::summary_max_chars`].
pub const SUMMARY_MAX_CHARS_ENV: &str = "ATS_SUMMARY_MAX_CHARS";

/// Item anchor names of the narrative sections the extractor reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionAnchors {
    pub order_types: String,
    pub display: String,
    pub products: String,
    pub market_data: String,
    pub segmentation: String,
}

impl Default for SectionAnchors {
    fn default() -> Self {
        Self {
            order_types: "partIIIitem7".to_string(),
            display: "partIIIitem15".to_string(),
            products: "partIIitem5".to_string(),
            market_data: "partIIIitem23".to_string(),
            segmentation: "partIIIitem13".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub anchors: SectionAnchors,
    /// Append the market-data item to the display narrative.
    pub include_market_data_item: bool,
    /// Free-text summaries longer than this are cut and suffixed with "...".
    pub summary_max_chars: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            anchors: SectionAnchors::default(),
            include_market_data_item: true,
            summary_max_chars: 750,
        }
    }
}

impl ExtractorConfig {
    /// Reads a JSON config file; missing fields keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| AppError::Config(format!("Invalid config file {}: {}", path.display(), e)))
    }

    /// Applies `ATS_SUMMARY_MAX_CHARS` if it is set.
    pub fn with_env_overrides(mut self) -> Result<Self, AppError> {
        if let Ok(value) = std::env::var(SUMMARY_MAX_CHARS_ENV) {
            self.summary_max_chars = value.trim().parse().map_err(|_| {
                AppError::Config(format!("{} must be a positive integer, got '{}'", SUMMARY_MAX_CHARS_ENV, value))
            })?;
            tracing::debug!("Using {}={} from environment", SUMMARY_MAX_CHARS_ENV, self.summary_max_chars);
        }
        Ok(self)
    }
}
