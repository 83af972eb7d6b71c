// src/extractors/features.rs

//! FeatureSet and the master extractor.
//!
//! Stages run in a fixed order because later stages consume keys written by
//! earlier ones: parse + row index, presence rules, atomic radio answers,
//! composers, order types, display/feeds, segmentation.

use crate::config::ExtractorConfig;
use crate::document::Document;
use crate::extractors::compose;
use crate::extractors::normalize::normalize_label;
use crate::extractors::patterns::PatternLibrary;
use crate::extractors::questions::YES_NO_QUESTIONS;
use crate::extractors::radio::{RadioAnswer, RowIndex};
use crate::extractors::section::SectionExtractor;
use crate::utils::error::DocumentError;
use indexmap::IndexMap;
use serde::Serialize;

pub const CUSTOM_ORDER_TYPES_DETECTED: &str = "custom_order_types_detected";
pub const CUSTOM_ORDER_TYPES_LIST: &str = "custom_order_types_list";
pub const CUSTOM_ORDER_TYPES_RAW_MATCHES: &str = "custom_order_types_raw_matches";
pub const UNRECOGNISED_CUSTOM_ORDERS: &str = "unrecognised_custom_orders";
pub const DISPLAY_MECHANISM: &str = "display_mechanism";
pub const DISPLAY_PUBLIC_PRIVATE_GUESS: &str = "display_public_private_guess";
pub const DISPLAY_FEED_NAMES: &str = "display_feed_names";
pub const DISPLAY_DESCRIPTION_SUMMARY: &str = "display_description_summary";

const NONE: &str = "None";
const NOT_FOUND: &str = "Not found";
const UNSPECIFIED_MECHANISM: &str = "Unspecified mechanism";
const ELLIPSIS: &str = "...";

/// Ordered feature mapping for one filing, optionally tagged with the
/// caller's venue identifier and period.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeatureSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ats_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(flatten)]
    features: IndexMap<&'static str, String>,
}

impl FeatureSet {
    pub fn tagged(ats_id: Option<&str>, year: Option<i32>) -> Self {
        Self {
            ats_id: ats_id.map(str::to_string),
            year,
            features: IndexMap::new(),
        }
    }

    /// Inserts or overwrites; a new key goes to the end.
    pub fn insert(&mut self, key: &'static str, value: impl Into<String>) {
        self.features.insert(key, value.into());
    }

    pub fn insert_answer(&mut self, key: &'static str, answer: RadioAnswer) {
        self.insert(key, answer.as_word());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.features.get(key).map(String::as_str)
    }

    /// Removes `key`, keeping the order of the remaining keys.
    pub fn take(&mut self, key: &str) -> Option<String> {
        self.features.shift_remove(key)
    }

    /// Removes an atomic answer; a missing key reads as Unknown.
    pub fn take_answer(&mut self, key: &str) -> RadioAnswer {
        self.take(key)
            .map(|word| RadioAnswer::from_word(&word))
            .unwrap_or(RadioAnswer::Unknown)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.features.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        self.features.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Cuts `text` to `max_chars` characters and marks the cut with "...".
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((cut, _)) => format!("{}{}", text[..cut].trim_end(), ELLIPSIS),
    }
}

/// Runs every extraction stage over one filing.
///
/// Holds no per-document state: the same extractor can be shared across
/// threads and called concurrently.
#[derive(Debug, Clone)]
pub struct FeatureExtractor<'p> {
    patterns: &'p PatternLibrary,
    sections: SectionExtractor,
    config: ExtractorConfig,
}

impl FeatureExtractor<'static> {
    /// Extractor over the process-wide pattern library.
    pub fn with_config(config: ExtractorConfig) -> Self {
        Self::new(PatternLibrary::shared(), config)
    }
}

impl<'p> FeatureExtractor<'p> {
    pub fn new(patterns: &'p PatternLibrary, config: ExtractorConfig) -> Self {
        Self {
            patterns,
            sections: SectionExtractor::new(),
            config,
        }
    }

    pub fn patterns(&self) -> &'p PatternLibrary {
        self.patterns
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extracts the full feature set. Only parsing can fail; every later
    /// stage falls back to Unclear / "None" / "none detected".
    pub fn extract(&self, raw: &str, ats_id: Option<&str>, year: Option<i32>) -> Result<FeatureSet, DocumentError> {
        let label = ats_id.unwrap_or("<untagged>");

        // 1. Parse and index once
        let doc = Document::parse(raw)?;
        let rows = RowIndex::build(&doc);
        tracing::debug!("[{}] parsed {:?} document: {} nodes, {} labeled rows", label, doc.kind(), doc.len(), rows.len());

        let mut set = FeatureSet::tagged(ats_id, year);

        // 2. Presence rules over the raw text
        for (key, answer) in self.patterns.presence_features(raw) {
            set.insert_answer(key, answer);
        }

        // 3. Atomic radio answers
        for &(key, fragment) in YES_NO_QUESTIONS {
            set.insert_answer(key, rows.resolve(fragment));
        }

        // 4. Composites, each consuming its atomic inputs
        compose::subscriber_opt_out(&mut set);
        compose::counterparty_selection(&mut set);
        compose::trading_access(&mut set);
        compose::ioi_support(&mut set);

        // 5-7. Narrative sections
        self.order_type_features(&doc, &mut set);
        self.display_features(&doc, &mut set);
        let segmentation = self.sections.extract(&doc, &self.config.anchors.segmentation);
        compose::segmentation(&mut set, &self.patterns.segmentation_tags(&segmentation));

        tracing::info!("[{}] extracted {} features", label, set.len());
        Ok(set)
    }

    fn order_type_features(&self, doc: &Document, set: &mut FeatureSet) {
        let narrative = self.sections.extract(doc, &self.config.anchors.order_types);
        let report = self.patterns.detect_order_types(&narrative);

        for &(key, supported) in &report.supported {
            set.insert_answer(key, RadioAnswer::from_presence(supported));
        }
        let any = !report.detected.is_empty() || !report.unrecognized.is_empty();
        set.insert_answer(CUSTOM_ORDER_TYPES_DETECTED, RadioAnswer::from_presence(any));

        let list = report.combined_list();
        set.insert(CUSTOM_ORDER_TYPES_LIST, if list.is_empty() { NONE.to_string() } else { list });
        set.insert(CUSTOM_ORDER_TYPES_RAW_MATCHES, report.raw_matches());
        set.insert(
            UNRECOGNISED_CUSTOM_ORDERS,
            if report.unrecognized.is_empty() { NONE.to_string() } else { report.unrecognized.join(", ") },
        );
    }

    fn display_features(&self, doc: &Document, set: &mut FeatureSet) {
        let anchors = &self.config.anchors;
        let display = self.sections.extract(doc, &anchors.display);

        let mut blocks = vec![display.clone(), self.sections.extract(doc, &anchors.products)];
        if self.config.include_market_data_item {
            blocks.push(self.sections.extract(doc, &anchors.market_data));
        }
        let text = blocks
            .into_iter()
            .filter(|b| !b.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        let feeds = self.patterns.discover_feeds(&text);
        let mechanism = self.patterns.display_mechanism(&text);
        let exposure = self.patterns.classify_exposure(&normalize_label(&text));

        set.insert(DISPLAY_MECHANISM, mechanism.unwrap_or_else(|| UNSPECIFIED_MECHANISM.to_string()));
        set.insert(DISPLAY_PUBLIC_PRIVATE_GUESS, exposure.as_str());
        set.insert(DISPLAY_FEED_NAMES, if feeds.is_empty() { NONE.to_string() } else { feeds.join(", ") });
        set.insert(
            DISPLAY_DESCRIPTION_SUMMARY,
            if display.is_empty() {
                NOT_FOUND.to_string()
            } else {
                truncate_with_ellipsis(&display, self.config.summary_max_chars)
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::compose::*;
    use crate::extractors::questions::*;

    const CHECKED: &str = r#"<img src="radio-checked.jpg" alt="Radio button checked">"#;
    const UNCHECKED: &str = r#"<img src="radio-unchecked.jpg" alt="Radio button not checked">"#;

    fn answer_row(label: &str, yes: bool) -> String {
        let cell = if yes {
            format!("{} Yes {} No", CHECKED, UNCHECKED)
        } else {
            format!("{} Yes {} No", UNCHECKED, CHECKED)
        };
        format!(r#"<tr><td class="label">{}</td><td><span class="yesNo">{}</span></td></tr>"#, label, cell)
    }

    fn filing(rows: &[String], body: &str) -> String {
        format!(
            "<!DOCTYPE html><html><head><title>Form ATS-N</title></head><body><table>{}</table>{}</body></html>",
            rows.concat(),
            body
        )
    }

    fn expected_keys(patterns: &PatternLibrary) -> Vec<&'static str> {
        let mut keys: Vec<&'static str> = patterns.presence_rules().iter().map(|r| r.key).collect();
        keys.extend([
            ECN_STATUS,
            DISPLAY_TO_PERSONS,
            DISPLAY_PROCEDURES_UNIFORM,
            SUBSCRIBER_OPT_OUT_CAPABILITY,
            COUNTERPARTY_SELECTION,
            INTERNAL_TRADING_ALLOWED,
            AFFILIATE_ACCESS_TO_ATS,
            ROUTING_TO_AFFILIATE_VENUE,
            TRADING_ACCESS_SUMMARY,
            SUPPORTS_IOIS,
        ]);
        keys.extend(patterns.order_type_rules().iter().map(|r| r.key));
        keys.extend([
            CUSTOM_ORDER_TYPES_DETECTED,
            CUSTOM_ORDER_TYPES_LIST,
            CUSTOM_ORDER_TYPES_RAW_MATCHES,
            UNRECOGNISED_CUSTOM_ORDERS,
            DISPLAY_MECHANISM,
            DISPLAY_PUBLIC_PRIVATE_GUESS,
            DISPLAY_FEED_NAMES,
            DISPLAY_DESCRIPTION_SUMMARY,
            SEGMENTATION_TAGS,
        ]);
        keys.extend(SEGMENTATION_KEYS);
        keys
    }

    fn extractor() -> FeatureExtractor<'static> {
        FeatureExtractor::with_config(ExtractorConfig::default())
    }

    #[test]
    fn test_opt_out_end_to_end() {
        let html = filing(
            &[
                answer_row(
                    "a. Can any Subscriber opt out from interacting with orders and trading interest of the Broker-Dealer Operator in the NMS Stock ATS?",
                    true,
                ),
                answer_row(
                    "b. Can any Subscriber opt out from interacting with the orders and trading interest of an Affiliate of the Broker-Dealer Operator in the NMS Stock ATS?",
                    false,
                ),
            ],
            "",
        );

        let set = extractor().extract(&html, Some("TEST"), Some(2024)).unwrap();
        assert_eq!(
            set.get(SUBSCRIBER_OPT_OUT_CAPABILITY),
            Some("Yes — Subscriber can opt out of ATS operator but not affiliates")
        );
        assert!(set.get(SUBSCRIBER_OPT_OUT_BDO).is_none());
        assert!(set.get(SUBSCRIBER_OPT_OUT_AFFILIATE).is_none());
        assert_eq!(set.ats_id.as_deref(), Some("TEST"));
        assert_eq!(set.year, Some(2024));
    }

    #[test]
    fn test_key_set_is_fixed_and_ordered() {
        let patterns = PatternLibrary::shared();
        let empty = extractor().extract("<html><body><p>Nothing here.</p></body></html>", None, None).unwrap();
        let keys: Vec<&str> = empty.keys().collect();
        assert_eq!(keys, expected_keys(patterns));

        for (key, value) in empty.iter() {
            assert!(!value.is_empty(), "{} is empty", key);
        }
        assert_eq!(empty.get(SEGMENTATION_TAGS), Some("none detected"));
        assert_eq!(empty.get(DISPLAY_FEED_NAMES), Some("None"));
        assert_eq!(empty.get(DISPLAY_MECHANISM), Some("Unspecified mechanism"));
        assert_eq!(empty.get(DISPLAY_DESCRIPTION_SUMMARY), Some("Not found"));
        assert_eq!(empty.get(DISPLAY_PUBLIC_PRIVATE_GUESS), Some("unclear"));
        assert_eq!(empty.get(CUSTOM_ORDER_TYPES_DETECTED), Some("No"));
        assert!(empty.get(SUPPORTS_IOIS).unwrap().starts_with("Unclear"));
    }

    #[test]
    fn test_no_atomic_keys_leak() {
        let set = extractor().extract(&filing(&[], ""), None, None).unwrap();
        for atomic in [
            SUBSCRIBER_OPT_OUT_BDO,
            SUBSCRIBER_OPT_OUT_AFFILIATE,
            COUNTERPARTY_SELECTION_SUPPORTED,
            COUNTERPARTY_SELECTION_UNIFORM,
            IOI_SUPPORTED,
            IOI_UNIFORM_TREATMENT,
        ] {
            assert!(set.get(atomic).is_none(), "{} leaked", atomic);
        }
    }

    #[test]
    fn test_narrative_sections_feed_features() {
        let body = r#"
            <a name="partIIIitem7"></a><p>The ATS supports Mid Peg and VWAP orders plus a FOOBAR order.</p>
            <a name="partIIIitem13"></a><p>Subscribers are assigned a Taker Level and a Category ID.</p>
            <a name="partIIIitem15"></a><p>Order information is sent to the internal SOR via the IQX data feed.</p>
            <a name="partIIIitem16"></a><p>Unrelated text about a hosted pool.</p>
        "#;
        let set = extractor().extract(&filing(&[], body), None, None).unwrap();

        assert_eq!(set.get("supports_midpoint_orders"), Some("Yes"));
        assert_eq!(set.get("supports_vwap_orders"), Some("Yes"));
        assert_eq!(set.get("supports_limit_orders"), Some("No"));
        assert_eq!(set.get(UNRECOGNISED_CUSTOM_ORDERS), Some("FOOBAR"));
        assert_eq!(set.get(CUSTOM_ORDER_TYPES_LIST), Some("FOOBAR, midpoint, vwap"));
        assert_eq!(set.get(CUSTOM_ORDER_TYPES_DETECTED), Some("Yes"));

        assert_eq!(set.get(SEGMENTATION_TAGS), Some("category id, taker level"));

        assert_eq!(set.get(DISPLAY_FEED_NAMES), Some("IQX"));
        assert_eq!(set.get(DISPLAY_MECHANISM), Some("SOR"));
        assert_eq!(set.get(DISPLAY_PUBLIC_PRIVATE_GUESS), Some("private_like"));
        assert_eq!(
            set.get(DISPLAY_DESCRIPTION_SUMMARY),
            Some("Order information is sent to the internal SOR via the IQX data feed.")
        );
        assert_eq!(set.get("offers_hosted_pool"), Some("Yes"));
    }

    #[test]
    fn test_empty_segmentation_section_reports_none_detected() {
        let body = r#"<a name="partIIIitem13"></a><a name="partIIIitem14"></a><p>Item 14 text with taker level.</p>"#;
        let set = extractor().extract(&filing(&[], body), None, None).unwrap();
        assert_eq!(set.get(SEGMENTATION_TAGS), Some("none detected"));
    }

    #[test]
    fn test_segmentation_answers_follow_tags() {
        let set = extractor()
            .extract(&filing(&[answer_row("a. Are orders segmented into categories, classifications, tiers, or levels?", true)], ""), None, None)
            .unwrap();
        let keys: Vec<&str> = set.keys().collect();
        let tags_at = keys.iter().position(|k| *k == SEGMENTATION_TAGS).unwrap();
        assert_eq!(&keys[tags_at + 1..], &SEGMENTATION_KEYS[..]);
        assert_eq!(set.get(SEGMENTATION_SUPPORTED), Some("Yes"));
    }

    #[test]
    fn test_summary_truncation() {
        let config = ExtractorConfig { summary_max_chars: 10, ..ExtractorConfig::default() };
        let body = r#"<a name="partIIIitem15"></a><p>Display procedures are described at length here.</p>"#;
        let set = FeatureExtractor::with_config(config).extract(&filing(&[], body), None, None).unwrap();
        assert_eq!(set.get(DISPLAY_DESCRIPTION_SUMMARY), Some("Display pr..."));

        assert_eq!(truncate_with_ellipsis("short", 10), "short");
        assert_eq!(truncate_with_ellipsis("héllo wörld", 6), "héllo...");
    }

    #[test]
    fn test_market_data_item_toggle() {
        let body = r#"<a name="partIIIitem23"></a><p>The Ocean data feed is available to all Subscribers.</p>"#;
        let with = extractor().extract(&filing(&[], body), None, None).unwrap();
        assert_eq!(with.get(DISPLAY_FEED_NAMES), Some("OCEAN"));
        assert_eq!(with.get(DISPLAY_PUBLIC_PRIVATE_GUESS), Some("public_like"));

        let config = ExtractorConfig { include_market_data_item: false, ..ExtractorConfig::default() };
        let without = FeatureExtractor::with_config(config).extract(&filing(&[], body), None, None).unwrap();
        assert_eq!(without.get(DISPLAY_FEED_NAMES), Some("None"));
    }

    #[test]
    fn test_xml_document_yields_full_key_set() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?><edgarSubmission><formData><text>We operate a hosted pool.</text></formData></edgarSubmission>"#;
        let set = extractor().extract(xml, None, None).unwrap();
        assert_eq!(set.get("offers_hosted_pool"), Some("Yes"));
        assert_eq!(set.len(), expected_keys(PatternLibrary::shared()).len());
    }

    #[test]
    fn test_xml_with_bad_entities_still_extracts() {
        let xml = r#"<?xml version="1.0"?><edgarSubmission><text>AT&T runs a hosted pool&nbsp;here</text></edgarSubmission>"#;
        let set = extractor().extract(xml, None, None).unwrap();
        assert_eq!(set.get("offers_hosted_pool"), Some("Yes"));
        assert_eq!(set.len(), expected_keys(PatternLibrary::shared()).len());
    }

    #[test]
    fn test_unparseable_document_is_an_error() {
        assert_eq!(extractor().extract("no markup at all", None, None).unwrap_err(), DocumentError::NoMarkup);
    }

    #[test]
    fn test_serialized_tags_come_first() {
        let set = extractor().extract("<html><body></body></html>", Some("SGMT"), Some(2025)).unwrap();
        let json = serde_json::to_string(&set).unwrap();
        assert!(json.starts_with(r#"{"ats_id":"SGMT","year":2025,"offers_hosted_pool":"No""#), "{}", json);
    }
}
