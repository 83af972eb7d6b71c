// src/lib.rs

//! Feature extraction for Form ATS-N style disclosure filings.
//!
//! [`FeatureExtractor::extract`] turns the text of one filing into an ordered
//! [`FeatureSet`]. Fetching filings ([`edgar`]), fanning out over a directory
//! ([`batch`]) and writing results ([`storage`]) sit around that core.

pub mod batch;
pub mod config;
pub mod document;
pub mod edgar;
pub mod extractors;
pub mod storage;
pub mod utils;

pub use config::ExtractorConfig;
pub use extractors::{FeatureExtractor, FeatureSet, PatternLibrary, RadioAnswer};
pub use utils::error::DocumentError;
