// src/edgar/models.rs
use serde::{Deserialize, Serialize};

const SEC_ROOT: &str = "https://www.sec.gov";

/// `Archives/edgar/data/<CIK>/index.json` and `<accession>/index.json`
#[derive(Debug, Deserialize)]
pub struct DirectoryListing {
    pub directory: Directory,
}

#[derive(Debug, Deserialize)]
pub struct Directory {
    pub item: Vec<DirectoryItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryItem {
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(rename = "last-modified")]
    pub last_modified: String,
}

/// One ATS to download: market participant id plus the operator's CIK.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtsEntry {
    pub mpid: String,
    pub cik: String,
    #[serde(default)]
    pub status: Option<String>,
}

impl AtsEntry {
    pub fn is_ceased(&self) -> bool {
        self.status
            .as_deref()
            .map(|s| s.eq_ignore_ascii_case("ceased"))
            .unwrap_or(false)
    }
}

/// Zero-padded CIK as used in archive paths. Non-numeric input is kept as-is.
pub fn padded_cik(cik: &str) -> String {
    match cik.trim().parse::<u64>() {
        Ok(n) => format!("{:010}", n),
        Err(_) => cik.trim().to_string(),
    }
}

pub fn cik_index_url(cik: &str) -> String {
    format!("{}/Archives/edgar/data/{}/index.json", SEC_ROOT, padded_cik(cik))
}

pub fn accession_base_url(cik: &str, accession: &str) -> String {
    format!("{}/Archives/edgar/data/{}/{}", SEC_ROOT, padded_cik(cik), accession)
}

/// Newest accession folder last modified in `year`.
pub fn latest_accession(items: &[DirectoryItem], year: u32) -> Option<&DirectoryItem> {
    let year = year.to_string();
    items
        .iter()
        .filter(|i| i.item_type.starts_with("folder") && i.last_modified.starts_with(&year))
        .max_by(|a, b| a.last_modified.cmp(&b.last_modified))
}

/// Fallback primary documents from an accession listing: every `primary_doc*`
/// ordered by extension preference .html, .htm, .xml.
pub fn primary_docs_in_listing(items: &[DirectoryItem]) -> Vec<&DirectoryItem> {
    [".html", ".htm", ".xml"]
        .iter()
        .flat_map(|ext| {
            items.iter().filter(move |i| {
                let name = i.name.to_ascii_lowercase();
                name.starts_with("primary_doc") && name.ends_with(ext)
            })
        })
        .collect()
}

/// A downloaded primary document.
#[derive(Debug, Clone)]
pub struct PrimaryDoc {
    pub file_name: String,
    pub body: Vec<u8>,
}

impl PrimaryDoc {
    /// Lowercased extension including the dot, `.html` by default.
    pub fn extension(&self) -> String {
        std::path::Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_ascii_lowercase()))
            .unwrap_or_else(|| ".html".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, item_type: &str, modified: &str) -> DirectoryItem {
        DirectoryItem {
            name: name.to_string(),
            item_type: item_type.to_string(),
            last_modified: modified.to_string(),
        }
    }

    #[test]
    fn test_latest_accession_picks_newest_in_year() {
        let items = vec![
            item("000123", "folder.gif", "2024-02-01 10:00:00"),
            item("000456", "folder.gif", "2024-11-05 09:00:00"),
            item("000789", "folder.gif", "2025-01-03 09:00:00"),
            item("index.xml", "text.gif", "2024-12-31 09:00:00"),
        ];
        assert_eq!(latest_accession(&items, 2024).map(|i| i.name.as_str()), Some("000456"));
        assert!(latest_accession(&items, 2020).is_none());
    }

    #[test]
    fn test_primary_doc_extension_preference() {
        let items = vec![
            item("primary_doc.xml", "text.gif", "2024"),
            item("PRIMARY_DOC.htm", "text.gif", "2024"),
            item("other.html", "text.gif", "2024"),
        ];
        let names: Vec<&str> = primary_docs_in_listing(&items).iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["PRIMARY_DOC.htm", "primary_doc.xml"]);
        assert!(primary_docs_in_listing(&items[2..]).is_empty());
    }

    #[test]
    fn test_urls_use_padded_cik() {
        assert_eq!(padded_cik("230611"), "0000230611");
        assert_eq!(cik_index_url("0000042352"), "https://www.sec.gov/Archives/edgar/data/0000042352/index.json");
        assert_eq!(
            accession_base_url("42352", "000004235224000001"),
            "https://www.sec.gov/Archives/edgar/data/0000042352/000004235224000001"
        );
    }

    #[test]
    fn test_lookup_entries() {
        let entries: Vec<AtsEntry> = serde_json::from_str(
            r#"[{"mpid": "UBSA", "cik": "0000230611"}, {"mpid": "OLD", "cik": "1", "status": "Ceased"}]"#,
        )
        .unwrap();
        assert!(!entries[0].is_ceased());
        assert!(entries[1].is_ceased());
    }

    #[test]
    fn test_primary_doc_extension() {
        let doc = PrimaryDoc { file_name: "primary_doc.XML".to_string(), body: Vec::new() };
        assert_eq!(doc.extension(), ".xml");
    }
}
