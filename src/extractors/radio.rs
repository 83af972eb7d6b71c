// src/extractors/radio.rs

//! Row Index and radio-button answer decoding.
//!
//! Filings encode a Yes/No answer as a row holding a label cell and two radio
//! images; the chosen option is the checked image followed by its loose
//! "Yes"/"No" text node. Each labeled row is flattened once into a list of
//! typed tokens so lookups never re-walk the tree.

use crate::document::{Document, NodeId, NodeKind};
use crate::extractors::normalize::normalize_label;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

// "a." / "b." sub-question prefix on a normalized label.
static LETTERED_SUBITEM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z]\.").expect("Failed to compile LETTERED_SUBITEM_RE")
});

/// Resolved Yes/No question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RadioAnswer {
    Yes,
    No,
    Unknown,
}

impl RadioAnswer {
    /// Output word; Unknown is reported as "Unclear".
    pub fn as_word(self) -> &'static str {
        match self {
            RadioAnswer::Yes => "Yes",
            RadioAnswer::No => "No",
            RadioAnswer::Unknown => "Unclear",
        }
    }

    /// Inverse of [`RadioAnswer::as_word`]; anything unrecognized is Unknown.
    pub fn from_word(word: &str) -> Self {
        match word {
            "Yes" => RadioAnswer::Yes,
            "No" => RadioAnswer::No,
            _ => RadioAnswer::Unknown,
        }
    }

    pub fn from_presence(found: bool) -> Self {
        if found { RadioAnswer::Yes } else { RadioAnswer::No }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowToken {
    Marker { selected: bool, parent: Option<NodeId> },
    Text { text: String, parent: Option<NodeId> },
    /// Any other element; skipped during answer decoding.
    Markup { parent: Option<NodeId> },
}

impl RowToken {
    fn parent(&self) -> Option<NodeId> {
        match self {
            RowToken::Marker { parent, .. }
            | RowToken::Text { parent, .. }
            | RowToken::Markup { parent } => *parent,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Row {
    pub node: NodeId,
    pub label: String,
    pub tokens: Vec<RowToken>,
}

/// Every labeled table row of one document, in document order.
#[derive(Debug, Clone, Default)]
pub struct RowIndex {
    rows: Vec<Row>,
}

impl RowIndex {
    /// Indexes every `<tr>` holding a `td.label` cell. No content filtering.
    pub fn build(doc: &Document) -> Self {
        let mut rows = Vec::new();

        for id in doc.ids() {
            if doc.tag_name(id) != Some("tr") {
                continue;
            }
            let label_cell = doc
                .descendants(id)
                .find(|&d| doc.tag_name(d) == Some("td") && doc.has_class(d, "label"));
            let Some(label_cell) = label_cell else { continue };

            let label = normalize_label(&doc.text_content(label_cell));
            let tokens = tokenize_row(doc, id);
            tracing::trace!("Indexed row {} ({} tokens): '{}'", id, tokens.len(), label);
            rows.push(Row { node: id, label, tokens });
        }

        tracing::debug!("Row index built with {} labeled rows", rows.len());
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// First row whose label equals the fragment, or contains it under a
    /// lettered "x." sub-question prefix. Later matches are ignored.
    pub fn find(&self, label_fragment: &str) -> Option<&Row> {
        let fragment = normalize_label(label_fragment);
        if fragment.is_empty() {
            return None;
        }
        self.rows.iter().find(|row| {
            row.label == fragment
                || (row.label.contains(&fragment) && LETTERED_SUBITEM_RE.is_match(&row.label))
        })
    }

    /// Tri-state answer for the first row matching `label_fragment`.
    pub fn resolve(&self, label_fragment: &str) -> RadioAnswer {
        match self.find(label_fragment) {
            Some(row) => decode_row(row),
            None => {
                tracing::trace!("No labeled row matches '{}'", label_fragment);
                RadioAnswer::Unknown
            }
        }
    }
}

/// Reads the checked marker and the first non-blank text node after it among
/// the marker's siblings. Markup and further markers in between are skipped.
pub fn decode_row(row: &Row) -> RadioAnswer {
    let selected = row
        .tokens
        .iter()
        .position(|t| matches!(t, RowToken::Marker { selected: true, .. }));
    let Some(start) = selected else {
        return RadioAnswer::Unknown;
    };
    let scope = row.tokens[start].parent();

    for token in row.tokens[start + 1..].iter().filter(|t| t.parent() == scope) {
        match token {
            RowToken::Text { text, .. } => {
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }
                return match text.to_lowercase().as_str() {
                    "yes" => RadioAnswer::Yes,
                    "no" => RadioAnswer::No,
                    _ => RadioAnswer::Unknown,
                };
            }
            RowToken::Markup { .. } | RowToken::Marker { .. } => continue,
        }
    }
    RadioAnswer::Unknown
}

fn tokenize_row(doc: &Document, row: NodeId) -> Vec<RowToken> {
    doc.descendants(row)
        .map(|id| {
            let node = doc.node(id);
            let parent = node.parent;
            match &node.kind {
                NodeKind::Text(text) => RowToken::Text { text: text.clone(), parent },
                NodeKind::Element { name, .. } if name == "img" => match radio_state(doc, id) {
                    Some(selected) => RowToken::Marker { selected, parent },
                    None => RowToken::Markup { parent },
                },
                _ => RowToken::Markup { parent },
            }
        })
        .collect()
}

/// `Some(checked)` when the image is a radio marker, `None` otherwise.
fn radio_state(doc: &Document, img: NodeId) -> Option<bool> {
    let src = doc.attr(img, "src").unwrap_or_default().to_ascii_lowercase();
    let alt = doc.attr(img, "alt").unwrap_or_default().to_ascii_lowercase();

    if src.contains("radio-checked") || alt == "radio button checked" {
        return Some(true);
    }
    if src.contains("radio") || alt.contains("radio button") {
        return Some(false);
    }
    None
}
