// src/edgar/client.rs
use crate::edgar::models::{
    accession_base_url, cik_index_url, latest_accession, primary_docs_in_listing, AtsEntry, DirectoryItem,
    DirectoryListing, PrimaryDoc,
};
use crate::utils::error::EdgarError;
use reqwest::{header, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

// IMPORTANT: SEC requires a contact in the User-Agent. Replace with your details.
const EDGAR_USER_AGENT: &str = "ats-extractor/0.1 research-contact@example.com";
// SEC asks for 10 requests/second max. Stay far below.
const EDGAR_REQUEST_DELAY_MS: u64 = 800;
const EDGAR_TIMEOUT_SECS: u64 = 25;
const MAX_JSON_ATTEMPTS: u32 = 5;

/// Paths tried before falling back to the accession listing.
const XSL_PRIMARY_DOCS: &[&str] = &["xslATS-N_X01/primary_doc.html", "xslATS-N_X01/primary_doc.xml"];

/// Creates a reqwest client configured for EDGAR interaction.
fn build_edgar_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(EDGAR_USER_AGENT)
        .timeout(Duration::from_secs(EDGAR_TIMEOUT_SECS))
        .build()
}

/// Statuses worth retrying with back-off.
pub fn is_retryable(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 502 | 503 | 504)
}

/// 1 s, 2 s, 4 s, ...
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt.min(6))
}

#[derive(Debug, Default)]
pub struct FetchSummary {
    pub saved: Vec<PathBuf>,
    pub missing: usize,
    pub failed: usize,
}

/// EDGAR client for Form ATS-N primary documents. Caches one archive
/// listing per CIK.
pub struct EdgarClient {
    client: reqwest::Client,
    index_cache: HashMap<String, Vec<DirectoryItem>>,
}

impl EdgarClient {
    pub fn new() -> Result<Self, EdgarError> {
        Ok(Self {
            client: build_edgar_client()?,
            index_cache: HashMap::new(),
        })
    }

    /// GET + JSON decode, retrying transient statuses with exponential back-off.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, EdgarError> {
        for attempt in 0..MAX_JSON_ATTEMPTS {
            tokio::time::sleep(Duration::from_millis(EDGAR_REQUEST_DELAY_MS)).await;

            let response = self
                .client
                .get(url)
                .header(header::ACCEPT, "application/json")
                .send()
                .await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response.json().await?);
            }
            if is_retryable(status) {
                let delay = backoff_delay(attempt);
                tracing::warn!("HTTP {} for {}, retrying in {:?}", status, url, delay);
                tokio::time::sleep(delay).await;
                continue;
            }
            if status == StatusCode::FORBIDDEN {
                tracing::warn!("Received 403 Forbidden - check User-Agent and rate limits.");
                return Err(EdgarError::RateLimited);
            }
            tracing::error!("HTTP error status: {} for URL: {}", status, url);
            return Err(EdgarError::Http(status));
        }
        Err(EdgarError::RateLimited)
    }

    /// Body of `url`, or `None` for any non-success status.
    async fn try_get(&self, url: &str) -> Result<Option<Vec<u8>>, EdgarError> {
        tokio::time::sleep(Duration::from_millis(EDGAR_REQUEST_DELAY_MS)).await;

        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/xml,text/html,text/plain,*/*")
            .send()
            .await?;
        if !response.status().is_success() {
            tracing::debug!("HTTP {} for {}", response.status(), url);
            return Ok(None);
        }
        Ok(Some(response.bytes().await?.to_vec()))
    }

    /// Archive listing for a CIK, fetched once.
    pub async fn cik_index(&mut self, cik: &str) -> Result<Vec<DirectoryItem>, EdgarError> {
        if let Some(items) = self.index_cache.get(cik) {
            return Ok(items.clone());
        }

        let url = cik_index_url(cik);
        let listing: DirectoryListing = self.get_json(&url).await.map_err(|e| match e {
            EdgarError::Http(StatusCode::NOT_FOUND) => EdgarError::IndexNotFound(cik.to_string()),
            other => other,
        })?;
        tracing::debug!("CIK {} has {} archive entries", cik, listing.directory.item.len());

        self.index_cache.insert(cik.to_string(), listing.directory.item.clone());
        Ok(listing.directory.item)
    }

    /// Primary document of one accession: the XSL-rendered HTML, then the XSL
    /// folder XML, then each `primary_doc*` in the accession listing until one downloads.
    pub async fn download_primary(&self, cik: &str, accession: &str) -> Result<PrimaryDoc, EdgarError> {
        let base = accession_base_url(cik, accession);

        for &path in XSL_PRIMARY_DOCS {
            if let Some(body) = self.try_get(&format!("{}/{}", base, path)).await? {
                let file_name = path.rsplit('/').next().unwrap_or(path).to_string();
                return Ok(PrimaryDoc { file_name, body });
            }
        }

        let listing: DirectoryListing = self.get_json(&format!("{}/index.json", base)).await?;
        for item in primary_docs_in_listing(&listing.directory.item) {
            if let Some(body) = self.try_get(&format!("{}/{}", base, item.name)).await? {
                return Ok(PrimaryDoc { file_name: item.name.clone(), body });
            }
        }

        Err(EdgarError::FilingDocNotFound(accession.to_string()))
    }

    /// Downloads the newest filing of every year for every entry into
    /// `out_dir/<MPID>_<YEAR>.<ext>`. Per-filing failures are logged and counted.
    pub async fn fetch_filings(
        &mut self,
        entries: &[AtsEntry],
        years: std::ops::RangeInclusive<u32>,
        out_dir: &Path,
    ) -> Result<FetchSummary, EdgarError> {
        tokio::fs::create_dir_all(out_dir)
            .await
            .map_err(|e| EdgarError::Parse(format!("Cannot create {}: {}", out_dir.display(), e)))?;

        let mut summary = FetchSummary::default();
        for entry in entries {
            for year in years.clone() {
                match self.fetch_one(entry, year, out_dir).await {
                    Ok(Some(path)) => {
                        tracing::info!("{} {} -> {}", entry.mpid, year, path.display());
                        summary.saved.push(path);
                    }
                    Ok(None) => {
                        tracing::warn!("{} {}: no filing", entry.mpid, year);
                        summary.missing += 1;
                    }
                    Err(e) => {
                        tracing::error!("{} {}: {}", entry.mpid, year, e);
                        summary.failed += 1;
                    }
                }
            }
        }
        Ok(summary)
    }

    async fn fetch_one(&mut self, entry: &AtsEntry, year: u32, out_dir: &Path) -> Result<Option<PathBuf>, EdgarError> {
        let items = self.cik_index(&entry.cik).await?;
        let Some(accession) = latest_accession(&items, year) else {
            return Ok(None);
        };

        let doc = self.download_primary(&entry.cik, &accession.name).await?;
        let path = out_dir.join(format!("{}_{}{}", entry.mpid, year, doc.extension()));
        tokio::fs::write(&path, &doc.body)
            .await
            .map_err(|e| EdgarError::Parse(format!("Cannot write {}: {}", path.display(), e)))?;
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_retryable(StatusCode::NOT_FOUND));
        assert!(!is_retryable(StatusCode::FORBIDDEN));
    }

    #[test]
    fn test_backoff_doubles() {
        assert_eq!(backoff_delay(0), Duration::from_secs(1));
        assert_eq!(backoff_delay(3), Duration::from_secs(8));
        assert_eq!(backoff_delay(40), Duration::from_secs(64));
    }
}
