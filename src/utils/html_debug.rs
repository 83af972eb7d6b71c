// src/utils/html_debug.rs
use crate::utils::error::AppError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs::File;
use std::io::Write;
use std::path::Path;

static ITEM_ANCHOR_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(?:name|id)\s*=\s*["']?part[ivx]+item\d+[a-z]?"#).expect("Invalid item anchor regex")
});

/// Wraps every highlight span of `html` in a tagged `<span>`. Spans overlapping
/// an earlier one are dropped.
pub fn annotate_html(html: &str, highlights: &[(usize, usize, &str)]) -> String {
    // Add debug styling in head
    let mut debug_html = String::from("<!DOCTYPE html>\n<html>\n<head>\n<style>\n");
    debug_html.push_str(".highlight-anchor { background-color: #90EE90; }\n");
    debug_html.push_str(".highlight-presence { background-color: #FFFF00; }\n");
    debug_html.push_str(".highlight-custom { background-color: #FFC0CB; }\n");
    debug_html.push_str("</style>\n</head>\n<body>\n");

    let mut last_pos = 0;
    let mut sorted_highlights = highlights.to_vec();
    sorted_highlights.sort_by_key(|h| (h.0, std::cmp::Reverse(h.1)));

    for (start, end, highlight_type) in sorted_highlights {
        if start < last_pos || end <= start {
            continue;
        }
        debug_html.push_str(&html[last_pos..start]);

        let css_class = match highlight_type {
            "anchor" => "highlight-anchor",
            t if t.starts_with("presence") => "highlight-presence",
            _ => "highlight-custom",
        };

        debug_html.push_str(&format!(
            "<span class=\"{}\" title=\"Position: {}-{}, Type: {}\">",
            css_class, start, end, highlight_type
        ));
        debug_html.push_str(&html[start..end]);
        debug_html.push_str("</span>");

        last_pos = end;
    }

    debug_html.push_str(&html[last_pos..]);
    debug_html.push_str("\n</body>\n</html>");
    debug_html
}

/// Saves an annotated copy of a filing with item anchors and every hit of
/// `patterns` highlighted.
pub fn create_debug_html(html: &str, filename: &Path, patterns: &[(&Regex, &str)]) -> Result<(), AppError> {
    let mut highlights: Vec<(usize, usize, &str)> = ITEM_ANCHOR_ATTR
        .find_iter(html)
        .map(|m| (m.start(), m.end(), "anchor"))
        .collect();

    for (re, highlight_type) in patterns {
        for mat in re.find_iter(html) {
            highlights.push((mat.start(), mat.end(), *highlight_type));
        }
    }

    let mut file = File::create(filename)?;
    file.write_all(annotate_html(html, &highlights).as_bytes())?;

    tracing::info!("Saved debug HTML to {} ({} highlights)", filename.display(), highlights.len());
    Ok(())
}
