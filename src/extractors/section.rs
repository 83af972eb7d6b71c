// src/extractors/section.rs

// --- Imports ---
use crate::document::{Document, NodeKind};
use once_cell::sync::Lazy;
use regex::Regex;

// --- Regex Patterns (Lazy Static) ---
// Item anchors look like `partIIIitem7`, `partIIitem5`, `partIIIitem13a`.
static ITEM_ANCHOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^part[ivx]+item\d+[a-z]?$").expect("Failed to compile ITEM_ANCHOR_RE")
});

/// True when `name` follows the numbered item-anchor naming convention.
pub fn is_item_anchor(name: &str) -> bool {
    ITEM_ANCHOR_RE.is_match(name)
}

/// Pulls the narrative text of one numbered item out of a filing.
#[derive(Debug, Default, Clone, Copy)]
pub struct SectionExtractor;

impl SectionExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Visible text from the anchor named `anchor_name` up to (excluding) the
    /// next different item anchor, joined with single spaces. A missing anchor
    /// yields an empty string; a last item runs to the end of the document.
    pub fn extract(&self, doc: &Document, anchor_name: &str) -> String {
        let Some(start) = doc.find_anchor(anchor_name) else {
            tracing::debug!("Anchor '{}' not present, section is empty", anchor_name);
            return String::new();
        };

        let mut bits: Vec<&str> = Vec::new();
        for id in start + 1..doc.len() {
            if let NodeKind::Anchor { name } = &doc.node(id).kind {
                if name != anchor_name && is_item_anchor(name) {
                    tracing::trace!("Section '{}' ends at anchor '{}'", anchor_name, name);
                    break;
                }
            }
            if let Some(text) = doc.visible_text(id) {
                bits.push(text);
            }
        }

        let section = bits.join(" ");
        tracing::debug!("Extracted section '{}' ({} chars)", anchor_name, section.len());
        section
    }
}
