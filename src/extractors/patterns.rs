// src/extractors/patterns.rs

//! Curated matching rules, compiled once and shared read-only.
//!
//! Five independent families: document-wide presence rules, order-type
//! synonyms with an unknown-token fallback, feed-name discovery, the
//! public/private narrative classifier and segmentation tags.

use crate::extractors::normalize::collapse_hyphens;
use crate::extractors::radio::RadioAnswer;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};

/// Literal reported when no segmentation tag matches.
pub const NO_SEGMENTATION_TAGS: &str = "none detected";

// --- Rule Tables ---

/// (feature key, pattern) scanned case-insensitively over the raw document.
const PRESENCE_RULES: &[(&str, &str)] = &[
    ("offers_hosted_pool", r"hosted\s+pool|private\s+room|segregated\s+environment"),
    ("custom_order_types", r"non[- ]?displayed|custom.*order\s+type|dark\s+liquidity"),
    (
        "market_data_feed_available",
        r"(?:market|proprietary|depth[- ]of[- ]book|order|liquidity).*data.*feed|data.*(?:distribution|service|availability)",
    ),
];

/// (category, feature key, synonyms). Synonyms are word-bounded at compile time.
const ORDER_TYPE_RULES: &[(&str, &str, &[&str])] = &[
    ("midpoint", "supports_midpoint_orders", &[r"mid point peg", r"mid peg", r"midpoint peg", r"mp peg"]),
    ("market_peg", "supports_market_peg_orders", &[r"market peg"]),
    ("primary_peg", "supports_primary_peg_orders", &[r"primary peg"]),
    ("vwap", "supports_vwap_orders", &[r"vwap"]),
    ("post_only", "supports_post_only_orders", &[r"post ?only", r"add liquidity only", r"alo"]),
    ("conditional", "supports_conditional_orders", &[r"conditional order", r"firm up"]),
    ("displayed", "supports_displayed_orders", &[r"displayed order", r"non displayed"]),
    ("market", "supports_market_orders", &[r"market order"]),
    ("limit", "supports_limit_orders", &[r"limit order"]),
    ("iceberg", "supports_iceberg_orders", &[r"ice ?berg", r"reserve order", r"hidden size"]),
    ("discretionary", "supports_discretionary_orders", &[r"discretionary order", r"disc ?order", r"dqr"]),
];

/// Words that precede "order(s)"/"peg" in prose but are not order-type names.
const ORDER_STOPWORDS: &[&str] = &[
    "THE", "AND", "FOR", "UPON", "WHICH", "EACH", "OTHER", "SUCH", "THESE", "THREE",
    "ANOTHER", "DAY", "BUY", "SELL", "FIRM", "ORDER", "ORDERS", "LIMIT", "MARKET",
    "PRIMARY", "PEGGED", "ARRIVING", "FOLLOWING", "INCOMPLETE", "NECESSARY", "CENTERS.",
    "CONNECTIVITY.", "CONTRA-SIDE", "ATTRIBUTES", "ALL", "ANY", "NEW", "ITS", "THEIR",
];

const UNKNOWN_ORDER_PATTERN: &str =
    r"(?i)\b([A-Z0-9+/.\-]{3,})\s+(?:orders\s+types?|order\s+type|orders?|peg(?:ged)?)\b";

const CAP_FEED_PATTERN: &str =
    r#"(?i)['"]?([A-Z0-9][A-Z0-9_\-]{1,})['"]?\s+(?:depth[- ]of[- ]book\s+)?data\s+feed"#;
const GENERIC_FEED_PATTERN: &str = r"(?i)\b(\w+?)\s+data\s+feed\b";

const VENDORS: &str = r"Bloomberg|Pico|Exegy|ICE|CQS|CQG|Thesys|Extranet|SIP";
const PRIVATE_HINTS_PATTERN: &str = r"(?i)internal\s+(?:SOR|router|algo|tool)|internal\s+only|not\s+displayed|aggregated\s+and\s+anonymized";

const MECHANISM_PATTERN: &str = r"(?i)\b(data\s+feed|depth[- ]of[- ]book|ioi|fix|sor)\b";

const SEGMENTATION_TAGS: &[&str] = &[
    r"taker\s+level",
    r"taker\s+category",
    r"inclusion\s+level",
    r"contra\s+category",
    r"counterparty\s+classification",
    r"mark[- ]?out\s+analysis",
    r"category\s+id",
    r"taker\s+token",
    r"order\s+type\s+segmentation",
    r"participant\s+(?:type|class|segmentation)",
    r"counterparty\s+restriction",
    r"segmentation\s+(?:token|label|category)",
];

static SHARED: Lazy<PatternLibrary> =
    Lazy::new(|| PatternLibrary::compile().expect("Failed to compile pattern library"));

// --- Data Structures ---

#[derive(Debug)]
pub struct PresenceRule {
    pub key: &'static str,
    pub regex: Regex,
}

#[derive(Debug)]
pub struct OrderTypeRule {
    pub category: &'static str,
    pub key: &'static str,
    pub synonyms: Vec<Regex>,
}

/// Result of scanning one order-type narrative.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderTypeReport {
    /// (feature key, supported) for every known category, in rule order.
    pub supported: Vec<(&'static str, bool)>,
    /// Categories with at least one synonym hit, in rule order.
    pub detected: Vec<&'static str>,
    /// (category, literal hits) for traceability.
    pub raw_hits: Vec<(&'static str, Vec<String>)>,
    /// Sorted, deduplicated uppercase candidates not covered by any rule.
    pub unrecognized: Vec<String>,
}

impl OrderTypeReport {
    /// `midpoint:Mid Peg; vwap:VWAP`, or "None".
    pub fn raw_matches(&self) -> String {
        if self.raw_hits.is_empty() {
            return "None".to_string();
        }
        self.raw_hits
            .iter()
            .map(|(category, hits)| format!("{}:{}", category, hits.join("|")))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Known categories plus unrecognized tokens, sorted, comma-joined.
    pub fn combined_list(&self) -> String {
        let mut all: Vec<String> = self.detected.iter().map(|c| c.to_string()).collect();
        all.extend(self.unrecognized.iter().cloned());
        all.sort();
        all.join(", ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exposure {
    PublicLike,
    PrivateLike,
    Unclear,
}

impl Exposure {
    pub fn as_str(self) -> &'static str {
        match self {
            Exposure::PublicLike => "public_like",
            Exposure::PrivateLike => "private_like",
            Exposure::Unclear => "unclear",
        }
    }
}

/// Compiled rule set. Build once, then share by reference.
#[derive(Debug)]
pub struct PatternLibrary {
    presence: Vec<PresenceRule>,
    order_types: Vec<OrderTypeRule>,
    unknown_order: Regex,
    order_stopwords: HashSet<&'static str>,
    cap_feed: Regex,
    generic_feed: Regex,
    public_hints: Regex,
    private_hints: Regex,
    mechanism: Regex,
    segmentation: Regex,
}

impl PatternLibrary {
    /// Process-wide instance, compiled on first use.
    pub fn shared() -> &'static PatternLibrary {
        &SHARED
    }

    pub fn compile() -> Result<Self, regex::Error> {
        let presence = PRESENCE_RULES
            .iter()
            .map(|&(key, pat)| {
                Ok::<_, regex::Error>(PresenceRule { key, regex: Regex::new(&format!("(?i){}", pat))? })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;

        let order_types = ORDER_TYPE_RULES
            .iter()
            .map(|&(category, key, synonyms)| {
                let synonyms = synonyms
                    .iter()
                    .map(|s| Regex::new(&format!(r"(?i)\b{}\b", s)))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok::<_, regex::Error>(OrderTypeRule { category, key, synonyms })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;

        let public_hints = format!(
            r"(?i)available to (?:all )?(?:participants|subscribers)|open to external|full depth of book|via (?:{})",
            VENDORS
        );

        Ok(Self {
            presence,
            order_types,
            unknown_order: Regex::new(UNKNOWN_ORDER_PATTERN)?,
            order_stopwords: ORDER_STOPWORDS.iter().copied().collect(),
            cap_feed: Regex::new(CAP_FEED_PATTERN)?,
            generic_feed: Regex::new(GENERIC_FEED_PATTERN)?,
            public_hints: Regex::new(&public_hints)?,
            private_hints: Regex::new(PRIVATE_HINTS_PATTERN)?,
            mechanism: Regex::new(MECHANISM_PATTERN)?,
            segmentation: Regex::new(&format!("(?i){}", SEGMENTATION_TAGS.join("|")))?,
        })
    }

    pub fn presence_rules(&self) -> &[PresenceRule] {
        &self.presence
    }

    pub fn order_type_rules(&self) -> &[OrderTypeRule] {
        &self.order_types
    }

    /// Yes/No for every presence rule over the whole raw document.
    pub fn presence_features(&self, raw: &str) -> Vec<(&'static str, RadioAnswer)> {
        self.presence
            .iter()
            .map(|rule| (rule.key, RadioAnswer::from_presence(rule.regex.is_match(raw))))
            .collect()
    }

    pub fn detect_order_types(&self, narrative: &str) -> OrderTypeReport {
        let text = collapse_hyphens(narrative);
        let mut report = OrderTypeReport::default();

        for rule in &self.order_types {
            let hits: Vec<String> = rule
                .synonyms
                .iter()
                .filter_map(|rx| rx.find(&text).map(|m| m.as_str().to_string()))
                .collect();
            let hit = !hits.is_empty();
            report.supported.push((rule.key, hit));
            if hit {
                report.detected.push(rule.category);
                report.raw_hits.push((rule.category, hits));
            }
        }

        // Words already explained by a known hit ("MID" of "Mid Peg") are not candidates.
        let covered: HashSet<String> = report
            .raw_hits
            .iter()
            .flat_map(|(_, hits)| hits.iter())
            .flat_map(|hit| hit.split_whitespace().map(str::to_uppercase).collect::<Vec<_>>())
            .chain(report.detected.iter().map(|c| c.to_uppercase()))
            .collect();

        let unknown: BTreeSet<String> = self
            .unknown_order
            .captures_iter(narrative)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().to_uppercase())
            .filter(|tok| !covered.contains(tok) && !self.order_stopwords.contains(tok.as_str()))
            .collect();
        report.unrecognized = unknown.into_iter().collect();

        tracing::debug!(
            "Order types: {} known categories, {} unrecognized",
            report.detected.len(),
            report.unrecognized.len()
        );
        report
    }

    /// Every feed token in the text, uppercased, deduplicated and sorted.
    pub fn discover_feeds(&self, text: &str) -> Vec<String> {
        let tokens: BTreeSet<String> = self
            .cap_feed
            .captures_iter(text)
            .chain(self.generic_feed.captures_iter(text))
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().to_uppercase())
            .collect();
        tokens.into_iter().collect()
    }

    /// Public hints take precedence over private hints.
    pub fn classify_exposure(&self, text: &str) -> Exposure {
        if self.public_hints.is_match(text) {
            Exposure::PublicLike
        } else if self.private_hints.is_match(text) {
            Exposure::PrivateLike
        } else {
            Exposure::Unclear
        }
    }

    /// First dissemination mechanism named in the text, verbatim.
    pub fn display_mechanism(&self, text: &str) -> Option<String> {
        self.mechanism
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// Distinct segmentation phrases, lowercased and sorted.
    pub fn segmentation_tags(&self, text: &str) -> Vec<String> {
        let tags: BTreeSet<String> = self
            .segmentation
            .find_iter(text)
            .map(|m| m.as_str().to_lowercase())
            .collect();
        tags.into_iter().collect()
    }
}
