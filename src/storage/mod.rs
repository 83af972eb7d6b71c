// src/storage/mod.rs
use crate::batch::{BinaryRow, LongTextRow};
use crate::extractors::FeatureSet;
use crate::utils::error::StorageError;
use std::fs;
use std::path::{Path, PathBuf};

const UNTAGGED_DIR: &str = "untagged";

pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(StorageError::IoError)?;
        }

        Ok(Self { base_dir: base_path })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Saves one feature set as pretty JSON under `<ATSID>/<YEAR>/`.
    pub fn save_feature_set(&self, features: &FeatureSet) -> Result<PathBuf, StorageError> {
        let file_path = self.target_dir(features)?.join(format!("{}_features.json", file_prefix(features)));

        let json = serde_json::to_string_pretty(features)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        fs::write(&file_path, json).map_err(StorageError::IoError)?;

        tracing::info!("Saved features to {}", file_path.display());
        Ok(file_path)
    }

    /// Saves metadata about the extraction in JSON format
    pub fn save_feature_metadata(&self, features: &FeatureSet) -> Result<PathBuf, StorageError> {
        let file_path = self.target_dir(features)?.join(format!("{}_features_meta.json", file_prefix(features)));

        let unclear = features.iter().filter(|(_, v)| v.starts_with("Unclear")).count();
        let metadata = serde_json::json!({
            "ats_id": features.ats_id,
            "year": features.year,
            "feature_count": features.len(),
            "unclear_count": unclear,
            "extraction_timestamp": chrono::Utc::now().to_rfc3339(),
        });

        let metadata_str = serde_json::to_string_pretty(&metadata)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        fs::write(&file_path, metadata_str).map_err(StorageError::IoError)?;

        tracing::info!("Saved metadata to {}", file_path.display());
        Ok(file_path)
    }

    /// Writes the numeric panel for a whole batch.
    pub fn save_binary_panel(&self, rows: &[BinaryRow]) -> Result<PathBuf, StorageError> {
        let file_path = self.base_dir.join("ats_features_binary.json");
        let json = serde_json::to_string_pretty(rows)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        fs::write(&file_path, json).map_err(StorageError::IoError)?;

        tracing::info!("Saved binary panel ({} rows) to {}", rows.len(), file_path.display());
        Ok(file_path)
    }

    /// Writes the binary panel extended with the free-text features.
    pub fn save_longtext_panel(&self, rows: &[LongTextRow]) -> Result<PathBuf, StorageError> {
        let file_path = self.base_dir.join("ats_features_longtext.json");
        let json = serde_json::to_string_pretty(rows)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        fs::write(&file_path, json).map_err(StorageError::IoError)?;

        tracing::info!("Saved long-text panel ({} rows) to {}", rows.len(), file_path.display());
        Ok(file_path)
    }

    /// `<base>/<ATSID>/<YEAR>/`, or `<base>/untagged/` without tags.
    fn target_dir(&self, features: &FeatureSet) -> Result<PathBuf, StorageError> {
        let target_dir = match (&features.ats_id, features.year) {
            (Some(ats_id), Some(year)) => self.base_dir.join(ats_id.to_uppercase()).join(year.to_string()),
            (Some(ats_id), None) => self.base_dir.join(ats_id.to_uppercase()),
            _ => self.base_dir.join(UNTAGGED_DIR),
        };

        if !target_dir.exists() {
            fs::create_dir_all(&target_dir).map_err(StorageError::IoError)?;
        }
        Ok(target_dir)
    }
}

fn file_prefix(features: &FeatureSet) -> String {
    match (&features.ats_id, features.year) {
        (Some(ats_id), Some(year)) => format!("{}_{}", ats_id.to_uppercase(), year),
        (Some(ats_id), None) => ats_id.to_uppercase(),
        _ => UNTAGGED_DIR.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_feature_set_layout() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path().join("out")).unwrap();

        let mut set = FeatureSet::tagged(Some("sgmt"), Some(2025));
        set.insert("offers_hosted_pool", "Yes");
        set.insert("supports_iois", "Unclear — IOI support answer was not found or could not be parsed");

        let path = storage.save_feature_set(&set).unwrap();
        assert_eq!(path, dir.path().join("out/SGMT/2025/SGMT_2025_features.json"));

        let written: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["ats_id"], "sgmt");
        assert_eq!(written["offers_hosted_pool"], "Yes");

        let meta_path = storage.save_feature_metadata(&set).unwrap();
        let meta: serde_json::Value = serde_json::from_str(&fs::read_to_string(meta_path).unwrap()).unwrap();
        assert_eq!(meta["feature_count"], 2);
        assert_eq!(meta["unclear_count"], 1);
    }

    #[test]
    fn test_untagged_feature_set() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path()).unwrap();
        let path = storage.save_feature_set(&FeatureSet::default()).unwrap();
        assert_eq!(path, dir.path().join("untagged/untagged_features.json"));
    }

    #[test]
    fn test_binary_panel_uses_nulls() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path()).unwrap();
        let mut set = FeatureSet::tagged(Some("UBSA"), Some(2024));
        set.insert("offers_hosted_pool", "No");

        let path = storage.save_binary_panel(&[BinaryRow::from_features(&set)]).unwrap();
        let panel: serde_json::Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(panel[0]["offers_hosted_pool"], 0);
        assert!(panel[0]["supports_iois"].is_null());
        assert_eq!(panel[0]["order_type_complexity"], 0);
    }

    #[test]
    fn test_longtext_panel_keeps_text_and_flags() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path()).unwrap();
        let mut set = FeatureSet::tagged(Some("UBSA"), Some(2024));
        set.insert("offers_hosted_pool", "Yes");
        set.insert("unrecognised_custom_orders", "FOOBAR");

        let path = storage.save_longtext_panel(&[LongTextRow::from_features(&set)]).unwrap();
        assert_eq!(path, dir.path().join("ats_features_longtext.json"));

        let panel: serde_json::Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(panel[0]["ats_id"], "UBSA");
        assert_eq!(panel[0]["offers_hosted_pool"], 1);
        assert!(panel[0]["supports_iois"].is_null());
        assert_eq!(panel[0]["unrecognised_custom_orders"], "FOOBAR");
        assert_eq!(panel[0]["trading_access_summary"], "");
    }
}
