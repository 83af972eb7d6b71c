// src/document/mod.rs

//! Parsed filing tree.
//!
//! Both HTML-rooted and XML-rooted filings are copied into one arena of
//! tagged nodes (`Text | Element | Anchor`). Nodes are stored in document
//! order (pre-order), so "walk forward in the document" is an index range and
//! the descendants of a node are the contiguous slice up to its `subtree_end`.

use crate::utils::error::DocumentError;
use scraper::Html;

/// How far into the input the root sniffer looks for an `<html` tag behind an XML prolog.
const SNIFF_WINDOW: usize = 2048;

pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Html,
    Xml,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Text(String),
    Element {
        name: String,
        attrs: Vec<(String, String)>,
    },
    /// `<a name="...">` named anchor point.
    Anchor { name: String },
}

#[derive(Debug, Clone)]
pub struct NodeData {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// One past the last descendant of this node.
    pub subtree_end: NodeId,
    /// Set for text under `<script>`, `<style>` or `<head>`.
    pub hidden: bool,
}

#[derive(Debug, Clone)]
pub struct Document {
    kind: DocumentKind,
    nodes: Vec<NodeData>,
}

impl Document {
    /// Sniffs the root, parses with the matching parser and copies the result
    /// into the arena. XML that roxmltree rejects is re-read by the lenient
    /// HTML parser; only input with no markup at all fails.
    pub fn parse(raw: &str) -> Result<Self, DocumentError> {
        if !raw.contains('<') {
            return Err(DocumentError::NoMarkup);
        }

        let kind = sniff_kind(raw);
        tracing::debug!("Sniffed document root as {:?} ({} bytes)", kind, raw.len());

        match kind {
            DocumentKind::Html => Ok(Self::from_html(raw)),
            DocumentKind::Xml => match Self::from_xml(raw) {
                Ok(doc) => Ok(doc),
                Err(e) => {
                    tracing::warn!("{}; falling back to the HTML parser", e);
                    Ok(Self::from_html(raw))
                }
            },
        }
    }

    fn from_html(raw: &str) -> Self {
        let html = Html::parse_document(raw);
        let mut builder = TreeBuilder::default();

        // Explicit stack instead of recursion; filings nest tables deeply.
        let mut stack = vec![(html.tree.root(), None::<NodeId>, false)];
        while let Some((node, parent, hidden)) = stack.pop() {
            let (kind, hides) = match node.value() {
                scraper::Node::Document | scraper::Node::Fragment => {
                    for child in node.children().rev() {
                        stack.push((child, parent, hidden));
                    }
                    continue;
                }
                scraper::Node::Text(text) => (NodeKind::Text(text.text.to_string()), false),
                scraper::Node::Element(el) => {
                    let attrs = el
                        .attrs()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect();
                    let name = el.name().to_ascii_lowercase();
                    let hides = matches!(name.as_str(), "script" | "style" | "head");
                    (element_or_anchor(name, attrs), hides)
                }
                _ => continue, // Comments, doctype, processing instructions
            };

            let id = builder.push(parent, kind, hidden);
            for child in node.children().rev() {
                stack.push((child, Some(id), hidden || hides));
            }
        }

        builder.finish(DocumentKind::Html)
    }

    fn from_xml(raw: &str) -> Result<Self, DocumentError> {
        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..roxmltree::ParsingOptions::default()
        };
        let xml = roxmltree::Document::parse_with_options(raw, options)
            .map_err(|e| DocumentError::MalformedXml(e.to_string()))?;
        let mut builder = TreeBuilder::default();

        let mut stack = vec![(xml.root(), None::<NodeId>)];
        while let Some((node, parent)) = stack.pop() {
            let kind = if node.is_root() {
                for child in node.children().rev() {
                    stack.push((child, parent));
                }
                continue;
            } else if node.is_element() {
                let attrs = node
                    .attributes()
                    .map(|a| (a.name().to_string(), a.value().to_string()))
                    .collect();
                element_or_anchor(node.tag_name().name().to_ascii_lowercase(), attrs)
            } else if node.is_text() {
                NodeKind::Text(node.text().unwrap_or_default().to_string())
            } else {
                continue;
            };

            let id = builder.push(parent, kind, false);
            for child in node.children().rev() {
                stack.push((child, Some(id)));
            }
        }

        Ok(builder.finish(DocumentKind::Xml))
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id]
    }

    /// All node ids in document order.
    pub fn ids(&self) -> std::ops::Range<NodeId> {
        0..self.nodes.len()
    }

    /// Strict descendants of `id`, in document order.
    pub fn descendants(&self, id: NodeId) -> std::ops::Range<NodeId> {
        id + 1..self.nodes[id].subtree_end
    }

    /// Tag name for elements (`"a"` for anchors), `None` for text.
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id].kind {
            NodeKind::Element { name, .. } => Some(name),
            NodeKind::Anchor { .. } => Some("a"),
            NodeKind::Text(_) => None,
        }
    }

    pub fn attr(&self, id: NodeId, key: &str) -> Option<&str> {
        match &self.nodes[id].kind {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v.as_str()),
            NodeKind::Anchor { name } if key.eq_ignore_ascii_case("name") => Some(name),
            _ => None,
        }
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attr(id, "class")
            .map(|classes| classes.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    /// Visible descendant text, each piece trimmed, joined by single spaces.
    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .filter_map(|i| self.visible_text(i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Trimmed text of a visible, non-blank text node.
    pub fn visible_text(&self, id: NodeId) -> Option<&str> {
        let node = &self.nodes[id];
        match &node.kind {
            NodeKind::Text(text) if !node.hidden => {
                let trimmed = text.trim();
                (!trimmed.is_empty()).then_some(trimmed)
            }
            _ => None,
        }
    }

    /// First anchor named exactly `name`.
    pub fn find_anchor(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| match &n.kind {
            NodeKind::Anchor { name: anchor } => anchor == name,
            _ => false,
        })
    }

    pub fn anchor_name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id].kind {
            NodeKind::Anchor { name } => Some(name),
            _ => None,
        }
    }
}

fn element_or_anchor(name: String, attrs: Vec<(String, String)>) -> NodeKind {
    if name == "a" {
        if let Some((_, anchor)) = attrs.iter().find(|(k, _)| k.eq_ignore_ascii_case("name")) {
            return NodeKind::Anchor { name: anchor.clone() };
        }
    }
    NodeKind::Element { name, attrs }
}

/// XML when the input opens with an XML prolog or a non-HTML root tag, unless
/// an `<html` root follows shortly after (XSL-rendered filings carry both).
fn sniff_kind(raw: &str) -> DocumentKind {
    let head = raw.trim_start_matches('\u{feff}').trim_start();
    let window: String = head.chars().take(SNIFF_WINDOW).collect::<String>().to_ascii_lowercase();

    if window.starts_with("<!doctype html") || window.starts_with("<html") {
        return DocumentKind::Html;
    }
    if window.contains("<html") {
        return DocumentKind::Html;
    }
    if window.starts_with("<?xml") {
        return DocumentKind::Xml;
    }

    // Bare fragments (`<table>...`) and anything else go through the lenient HTML parser.
    DocumentKind::Html
}

#[derive(Default)]
struct TreeBuilder {
    nodes: Vec<NodeData>,
}

impl TreeBuilder {
    fn push(&mut self, parent: Option<NodeId>, kind: NodeKind, hidden: bool) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(NodeData {
            kind,
            parent,
            children: Vec::new(),
            subtree_end: id + 1,
            hidden,
        });
        if let Some(p) = parent {
            self.nodes[p].children.push(id);
        }
        id
    }

    /// Nodes were pushed in pre-order; fold subtree ends bottom-up.
    fn finish(mut self, kind: DocumentKind) -> Document {
        for id in (0..self.nodes.len()).rev() {
            let end = self.nodes[id].subtree_end;
            if let Some(p) = self.nodes[id].parent {
                if self.nodes[p].subtree_end < end {
                    self.nodes[p].subtree_end = end;
                }
            }
        }
        Document { kind, nodes: self.nodes }
    }
}
