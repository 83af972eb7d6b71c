// src/extractors/mod.rs
pub mod compose;
pub mod features;
pub mod normalize;
pub mod patterns;
pub mod questions;
pub mod radio;
pub mod section;

// Re-export key extraction types for convenience
pub use features::{FeatureExtractor, FeatureSet};
pub use normalize::normalize_label;
pub use patterns::PatternLibrary;
pub use radio::{RadioAnswer, RowIndex};
pub use section::SectionExtractor;
