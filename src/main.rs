// src/main.rs
use ats_extractor::batch::{run_batch, BinaryRow, LongTextRow};
use ats_extractor::edgar::models::AtsEntry;
use ats_extractor::edgar::EdgarClient;
use ats_extractor::storage::StorageManager;
use ats_extractor::utils::{self, AppError};
use ats_extractor::{ExtractorConfig, FeatureExtractor, FeatureSet};
use chrono::Datelike;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

/// First year Form ATS-N filings exist on EDGAR.
const FIRST_ATS_N_YEAR: u32 = 2019;

/// Command Line Interface for the Form ATS-N feature extractor
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    extractor: ExtractorArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct ExtractorArgs {
    /// JSON config file (anchors, summary length, market-data toggle)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Maximum characters of the display description summary
    #[arg(long, global = true)]
    summary_max_chars: Option<usize>,

    /// Do not append the market-data item to the display narrative
    #[arg(long, global = true)]
    skip_market_data_item: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract features from a single filing
    Extract {
        /// Filing document (HTML or XML)
        file: PathBuf,

        /// ATS identifier to tag the result with
        #[arg(long)]
        ats_id: Option<String>,

        /// Filing year to tag the result with
        #[arg(long)]
        year: Option<i32>,

        /// Write results here instead of printing only
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Debug mode - save an annotated HTML copy of the filing
        #[arg(short, long)]
        debug: bool,
    },
    /// Extract features from every <ATSID>_<YEAR> filing in a directory
    Batch {
        input_dir: PathBuf,

        #[arg(short, long, default_value = "./output")]
        output_dir: PathBuf,
    },
    /// Download Form ATS-N primary documents from EDGAR
    Fetch {
        /// Market participant id, used for file names
        #[arg(long, requires = "cik", conflicts_with = "lookup")]
        mpid: Option<String>,

        /// CIK of the ATS operator
        #[arg(long, requires = "mpid")]
        cik: Option<String>,

        /// JSON file with a list of {"mpid", "cik", "status"} entries
        #[arg(long)]
        lookup: Option<PathBuf>,

        /// Leave out lookup entries whose status is "ceased"
        #[arg(long, requires = "lookup")]
        skip_ceased: bool,

        #[arg(long)]
        start_year: Option<u32>,

        #[arg(long)]
        end_year: Option<u32>,

        #[arg(short, long, default_value = "./filings")]
        output_dir: PathBuf,
    },
}

impl ExtractorArgs {
    fn load(&self) -> Result<ExtractorConfig, AppError> {
        let mut config = match &self.config {
            Some(path) => ExtractorConfig::from_file(path)?,
            None => ExtractorConfig::default(),
        }
        .with_env_overrides()?;

        if let Some(max) = self.summary_max_chars {
            config.summary_max_chars = max;
        }
        if self.skip_market_data_item {
            config.include_market_data_item = false;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging();

    // 2. Parse CLI Arguments
    let cli = Cli::parse();
    tracing::info!("Starting processing for args: {:?}", cli);

    match cli.command {
        Command::Extract { file, ats_id, year, output_dir, debug } => {
            let extractor = FeatureExtractor::with_config(cli.extractor.load()?);
            extract_one(&extractor, &file, ats_id.as_deref(), year, output_dir.as_deref(), debug)
        }
        Command::Batch { input_dir, output_dir } => {
            let extractor = FeatureExtractor::with_config(cli.extractor.load()?);
            batch(&extractor, &input_dir, &output_dir)
        }
        Command::Fetch { mpid, cik, lookup, skip_ceased, start_year, end_year, output_dir } => {
            let entries = match (mpid, cik, lookup) {
                (Some(mpid), Some(cik), _) => vec![AtsEntry { mpid, cik, status: None }],
                (_, _, Some(path)) => load_lookup(&path, skip_ceased)?,
                _ => return Err(AppError::Config("Either --mpid/--cik or --lookup is required".to_string())),
            };
            let start = start_year.unwrap_or(FIRST_ATS_N_YEAR);
            let end = end_year.unwrap_or_else(|| chrono::Utc::now().year() as u32);
            if start > end {
                return Err(AppError::Config(format!("--start-year {} is after --end-year {}", start, end)));
            }

            let mut client = EdgarClient::new()?;
            let summary = client.fetch_filings(&entries, start..=end, &output_dir).await?;
            tracing::info!(
                "Fetch finished. Saved: {}, Missing: {}, Failures: {}",
                summary.saved.len(),
                summary.missing,
                summary.failed
            );
            Ok(())
        }
    }
}

fn extract_one(
    extractor: &FeatureExtractor<'_>,
    file: &Path,
    ats_id: Option<&str>,
    year: Option<i32>,
    output_dir: Option<&Path>,
    debug: bool,
) -> Result<(), AppError> {
    let raw = std::fs::read_to_string(file)?;
    tracing::info!("Read {} ({} bytes)", file.display(), raw.len());

    let features = extractor.extract(&raw, ats_id, year)?;
    print_features(&features);

    if let Some(dir) = output_dir {
        let storage = StorageManager::new(dir)?;
        storage.save_feature_set(&features)?;
        storage.save_feature_metadata(&features)?;
    }

    if debug {
        let debug_dir = output_dir.unwrap_or_else(|| Path::new(".")).join("debug");
        std::fs::create_dir_all(&debug_dir)?;
        let stem = file.file_stem().and_then(|s| s.to_str()).unwrap_or("filing");
        let debug_html_path = debug_dir.join(format!("{}_annotated.html", stem));

        let labels: Vec<String> = extractor
            .patterns()
            .presence_rules()
            .iter()
            .map(|rule| format!("presence:{}", rule.key))
            .collect();
        let patterns: Vec<_> = extractor
            .patterns()
            .presence_rules()
            .iter()
            .zip(&labels)
            .map(|(rule, label)| (&rule.regex, label.as_str()))
            .collect();

        if let Err(e) = utils::html_debug::create_debug_html(&raw, &debug_html_path, &patterns) {
            tracing::warn!("Failed to create debug HTML: {}", e);
        }
    }
    Ok(())
}

fn batch(extractor: &FeatureExtractor<'_>, input_dir: &Path, output_dir: &Path) -> Result<(), AppError> {
    let report = run_batch(input_dir, extractor)?;
    let storage = StorageManager::new(output_dir)?;

    let mut save_failures = 0;
    for features in &report.feature_sets {
        if let Err(e) = storage.save_feature_set(features) {
            tracing::error!("Failed to save features for {:?} {:?}: {}", features.ats_id, features.year, e);
            save_failures += 1;
        }
    }

    let rows: Vec<BinaryRow> = report.feature_sets.iter().map(BinaryRow::from_features).collect();
    storage.save_binary_panel(&rows)?;
    let text_rows: Vec<LongTextRow> = report.feature_sets.iter().map(LongTextRow::from_features).collect();
    storage.save_longtext_panel(&text_rows)?;

    if report.feature_sets.is_empty() && report.failures > 0 {
        return Err(AppError::Processing(format!(
            "Failed to extract features from any of {} filings",
            report.failures
        )));
    }
    if save_failures > 0 {
        tracing::warn!("{} feature sets could not be saved", save_failures);
    }
    Ok(())
}

/// Ceased ATSs are kept by default so historical years stay in the panels.
fn load_lookup(path: &Path, skip_ceased: bool) -> Result<Vec<AtsEntry>, AppError> {
    let raw = std::fs::read_to_string(path)?;
    let entries: Vec<AtsEntry> = serde_json::from_str(&raw)
        .map_err(|e| AppError::Config(format!("Invalid lookup file {}: {}", path.display(), e)))?;
    Ok(select_entries(entries, skip_ceased))
}

fn select_entries(entries: Vec<AtsEntry>, skip_ceased: bool) -> Vec<AtsEntry> {
    if !skip_ceased {
        return entries;
    }
    let (ceased, active): (Vec<_>, Vec<_>) = entries.into_iter().partition(AtsEntry::is_ceased);
    if !ceased.is_empty() {
        tracing::info!("Skipping {} ceased ATSs", ceased.len());
    }
    active
}

fn print_features(features: &FeatureSet) {
    if let (Some(ats_id), Some(year)) = (&features.ats_id, features.year) {
        println!("{} {}", ats_id, year);
    }
    for (key, value) in features.iter() {
        println!("{:35}: {}", key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries() -> Vec<AtsEntry> {
        serde_json::from_str(r#"[{"mpid": "UBSA", "cik": "230611"}, {"mpid": "OLD", "cik": "1", "status": "Ceased"}]"#)
            .unwrap()
    }

    #[test]
    fn test_ceased_entries_kept_by_default() {
        let kept = select_entries(entries(), false);
        assert_eq!(kept.len(), 2);

        let active = select_entries(entries(), true);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].mpid, "UBSA");
    }

    #[test]
    fn test_lookup_file_keeps_ceased() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lookup.json");
        std::fs::write(&path, r#"[{"mpid": "OLD", "cik": "1", "status": "ceased"}]"#).unwrap();
        assert_eq!(load_lookup(&path, false).unwrap().len(), 1);
        assert!(load_lookup(&path, true).unwrap().is_empty());
    }
}
