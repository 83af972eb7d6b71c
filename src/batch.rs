// src/batch.rs
use crate::extractors::FeatureExtractor;
use crate::extractors::FeatureSet;
use crate::utils::AppError;
use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};

const FILING_EXTENSIONS: &[&str] = &["htm", "html", "xml"];

/// Features exported as 1 / 0 / null in the binary panel.
pub const BINARY_KEYS: &[&str] = &[
    "offers_hosted_pool",
    "subscriber_opt_out_capability",
    "internal_trading_allowed",
    "affiliate_access_to_ats",
    "routing_to_affiliate_venue",
    "segmentation_supported",
    "segmentation_customer_flag",
    "segmentation_disclosed",
    "segmentation_uniform",
    "market_data_feed_available",
    "display_to_persons",
    "display_procedures_uniform",
    "supports_iois",
    "custom_order_types",
    "ecn_status",
];

/// Order types counted into `order_type_complexity`.
const COMPLEXITY_KEYS: &[&str] = &[
    "supports_midpoint_orders",
    "supports_market_peg_orders",
    "supports_primary_peg_orders",
    "supports_vwap_orders",
    "supports_post_only_orders",
    "supports_conditional_orders",
];

/// Free-text features carried next to the binary flags in the long-text panel.
pub const TEXT_KEYS: &[&str] = &[
    "trading_access_summary",
    "custom_order_types_list",
    "unrecognised_custom_orders",
];

#[derive(Debug, Default)]
pub struct BatchReport {
    pub feature_sets: Vec<FeatureSet>,
    pub failures: usize,
}

/// One row of the numeric panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BinaryRow {
    pub ats_id: Option<String>,
    pub year: Option<i32>,
    pub order_type_complexity: u8,
    #[serde(flatten)]
    pub flags: IndexMap<&'static str, Option<u8>>,
}

impl BinaryRow {
    pub fn from_features(set: &FeatureSet) -> Self {
        let flags = BINARY_KEYS
            .iter()
            .map(|&key| (key, tri_state_indicator(set.get(key))))
            .collect();
        let order_type_complexity = COMPLEXITY_KEYS
            .iter()
            .filter(|&&key| tri_state_indicator(set.get(key)) == Some(1))
            .count() as u8;

        Self {
            ats_id: set.ats_id.clone(),
            year: set.year,
            order_type_complexity,
            flags,
        }
    }
}

/// One row of the long-text panel: the binary row plus [`TEXT_KEYS`], with
/// missing text as `""`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LongTextRow {
    #[serde(flatten)]
    pub binary: BinaryRow,
    #[serde(flatten)]
    pub text: IndexMap<&'static str, String>,
}

impl LongTextRow {
    pub fn from_features(set: &FeatureSet) -> Self {
        let text = TEXT_KEYS
            .iter()
            .map(|&key| (key, set.get(key).unwrap_or_default().to_string()))
            .collect();
        Self {
            binary: BinaryRow::from_features(set),
            text,
        }
    }
}

/// Downstream reading of a feature word: "Yes…" → 1, "Unclear…"/missing → None, else 0.
pub fn tri_state_indicator(value: Option<&str>) -> Option<u8> {
    match value {
        None => None,
        Some(v) if v.starts_with("Unclear") => None,
        Some(v) if v.starts_with("Yes") => Some(1),
        Some(_) => Some(0),
    }
}

/// `SGMT_2025` → ("SGMT", 2025).
pub fn parse_stem(stem: &str) -> Option<(String, i32)> {
    let (ats_id, year) = stem.rsplit_once('_')?;
    if ats_id.is_empty() {
        return None;
    }
    let year = year.parse().ok()?;
    Some((ats_id.to_string(), year))
}

/// Filing files in `dir`, sorted by name.
pub fn list_filings<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>, AppError> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir.as_ref())? {
        let path = entry?.path();
        let is_filing = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| FILING_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if path.is_file() && is_filing {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Extracts every filing in `dir` in parallel. A failing document is logged
/// and counted, never fatal for the batch.
pub fn run_batch<P: AsRef<Path>>(dir: P, extractor: &FeatureExtractor<'_>) -> Result<BatchReport, AppError> {
    let files = list_filings(&dir)?;
    tracing::info!("Parsing {} filings from {}", files.len(), dir.as_ref().display());

    let results: Vec<(PathBuf, Result<FeatureSet, AppError>)> = files
        .into_par_iter()
        .map(|path| {
            let result = process_file(&path, extractor);
            (path, result)
        })
        .collect();

    let mut report = BatchReport::default();
    for (path, result) in results {
        match result {
            Ok(set) => report.feature_sets.push(set),
            Err(e) => {
                tracing::warn!("Skipping {}: {}", path.display(), e);
                report.failures += 1;
            }
        }
    }

    tracing::info!(
        "Batch finished. Success: {}, Failures: {}",
        report.feature_sets.len(),
        report.failures
    );
    Ok(report)
}

fn process_file(path: &Path, extractor: &FeatureExtractor<'_>) -> Result<FeatureSet, AppError> {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    let (ats_id, year) = parse_stem(stem)
        .ok_or_else(|| AppError::Processing(format!("File name '{}' is not <ATSID>_<YEAR>", stem)))?;

    let raw = std::fs::read_to_string(path)?;
    Ok(extractor.extract(&raw, Some(&ats_id), Some(year))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractorConfig;

    #[test]
    fn test_parse_stem() {
        assert_eq!(parse_stem("SGMT_2025"), Some(("SGMT".to_string(), 2025)));
        assert_eq!(parse_stem("MS_POOL_2021"), Some(("MS_POOL".to_string(), 2021)));
        assert_eq!(parse_stem("SGMT"), None);
        assert_eq!(parse_stem("SGMT_latest"), None);
        assert_eq!(parse_stem("_2024"), None);
    }

    #[test]
    fn test_tri_state_indicator() {
        assert_eq!(tri_state_indicator(Some("Yes")), Some(1));
        assert_eq!(tri_state_indicator(Some("Yes — Subscriber can opt out of both")), Some(1));
        assert_eq!(tri_state_indicator(Some("No — Subscriber cannot opt out from either")), Some(0));
        assert_eq!(tri_state_indicator(Some("Unclear — whatever")), None);
        assert_eq!(tri_state_indicator(None), None);
    }

    #[test]
    fn test_binary_row_counts_complex_order_types() {
        let mut set = FeatureSet::tagged(Some("UBSA"), Some(2024));
        set.insert("offers_hosted_pool", "Yes");
        set.insert("supports_midpoint_orders", "Yes");
        set.insert("supports_vwap_orders", "Yes");
        set.insert("supports_limit_orders", "Yes");
        set.insert("ecn_status", "No");

        let row = BinaryRow::from_features(&set);
        assert_eq!(row.order_type_complexity, 2);
        assert_eq!(row.flags["offers_hosted_pool"], Some(1));
        assert_eq!(row.flags["ecn_status"], Some(0));
        assert_eq!(row.flags["supports_iois"], None);
        assert_eq!(row.flags.len(), BINARY_KEYS.len());
    }

    #[test]
    fn test_long_text_row_extends_binary_row() {
        let mut set = FeatureSet::tagged(Some("UBSA"), Some(2024));
        set.insert("offers_hosted_pool", "Yes");
        set.insert("custom_order_types_list", "FOOBAR, midpoint");

        let row = LongTextRow::from_features(&set);
        assert_eq!(row.binary, BinaryRow::from_features(&set));
        assert_eq!(row.text["custom_order_types_list"], "FOOBAR, midpoint");
        assert_eq!(row.text["trading_access_summary"], "");
        assert_eq!(row.text.keys().copied().collect::<Vec<_>>(), TEXT_KEYS);
    }

    #[test]
    fn test_run_batch_skips_bad_documents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("SGMT_2025.html"), "<html><body><p>hosted pool</p></body></html>").unwrap();
        std::fs::write(dir.path().join("UBSA_2024.xml"), r#"<?xml version="1.0"?><root><open></root>"#).unwrap();
        std::fs::write(dir.path().join("noyear.html"), "<html></html>").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let extractor = FeatureExtractor::with_config(ExtractorConfig::default());
        let report = run_batch(dir.path(), &extractor).unwrap();

        assert_eq!(report.failures, 1);
        assert_eq!(report.feature_sets.len(), 2);
        let set = &report.feature_sets[0];
        assert_eq!(set.ats_id.as_deref(), Some("SGMT"));
        assert_eq!(set.year, Some(2025));
        assert_eq!(set.get("offers_hosted_pool"), Some("Yes"));

        // Broken XML is still extracted through the HTML parser.
        let xml_set = &report.feature_sets[1];
        assert_eq!(xml_set.ats_id.as_deref(), Some("UBSA"));
        assert_eq!(xml_set.get("offers_hosted_pool"), Some("No"));
    }
}
