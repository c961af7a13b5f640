use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::Result;

/// Directory structure for persisted catalog data
#[derive(Debug, Clone)]
pub struct StorageLayout {
    pub base_dir: PathBuf, // Root directory
    pub meta_dir: PathBuf, // Catalog snapshots
}

impl StorageLayout {
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        let meta_dir = base_dir.join("meta");
        fs::create_dir_all(&meta_dir)?;
        Ok(StorageLayout { base_dir, meta_dir })
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.meta_dir.join("catalog.bin")
    }

    pub fn meta_dir(&self) -> &Path {
        &self.meta_dir
    }
}
