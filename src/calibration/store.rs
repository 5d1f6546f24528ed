// Persistence for the trim table

use std::ffi::OsString;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::state::CalibrationTable;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("calibration storage I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("calibration data is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub trait CalibrationStore: Send {
    /// `Ok(None)` when nothing has been saved yet
    fn load_table(&self) -> Result<Option<CalibrationTable>, StorageError>;

    fn save_table(&mut self, table: &CalibrationTable) -> Result<(), StorageError>;
}

/// Pretty JSON file. Saves go to a sibling temp file first and are renamed
/// over the target, so a crash mid-save keeps the previous table.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl CalibrationStore for JsonFileStore {
    fn load_table(&self) -> Result<Option<CalibrationTable>, StorageError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No calibration file at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let table = serde_json::from_str(&contents)?;
        info!("Loaded calibration from {}", self.path.display());
        Ok(Some(table))
    }

    fn save_table(&mut self, table: &CalibrationTable) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let temp = self.temp_path();
        fs::write(&temp, serde_json::to_string_pretty(table)?)?;
        fs::rename(&temp, &self.path)?;
        info!("Saved calibration to {}", self.path.display());
        Ok(())
    }
}

/// Keeps the table in memory only
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    table: Option<CalibrationTable>,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(table: CalibrationTable) -> Self {
        Self {
            table: Some(table),
            saves: 0,
        }
    }

    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl CalibrationStore for MemoryStore {
    fn load_table(&self) -> Result<Option<CalibrationTable>, StorageError> {
        Ok(self.table)
    }

    fn save_table(&mut self, table: &CalibrationTable) -> Result<(), StorageError> {
        self.table = Some(*table);
        self.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinematics::Joint;

    #[test]
    fn test_missing_file_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("trims.json"));
        assert!(store.load_table().unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("nested").join("trims.json"));
        let mut table = CalibrationTable::default();
        table.adjust(2, Joint::Femur, -6);
        table.adjust(4, Joint::Coxa, 3);

        store.save_table(&table).unwrap();
        assert_eq!(store.load_table().unwrap(), Some(table));
        assert!(!store.temp_path().exists(), "temp file should be renamed away");
    }

    #[test]
    fn test_save_replaces_previous_table() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("trims.json"));
        let mut table = CalibrationTable::default();
        store.save_table(&table).unwrap();
        table.adjust(0, Joint::Tibia, 12);
        store.save_table(&table).unwrap();
        assert_eq!(store.load_table().unwrap().unwrap().trim(0, Joint::Tibia), 12);
    }

    #[test]
    fn test_corrupt_file_is_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trims.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            JsonFileStore::new(path).load_table(),
            Err(StorageError::Json(_))
        ));
    }

    #[test]
    fn test_memory_store_counts_saves() {
        let mut store = MemoryStore::new();
        assert!(store.load_table().unwrap().is_none());
        store.save_table(&CalibrationTable::default()).unwrap();
        assert_eq!(store.saves(), 1);
        assert_eq!(store.load_table().unwrap(), Some(CalibrationTable::default()));
    }
}
