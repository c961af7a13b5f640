use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::error::{Error, ErrorKind, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextScorer {
    Okapi,
    Cosine,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage_dir: PathBuf,
    pub sync_on_commit: bool,

    // Keyword buckets switch from a flat set to a tree set at this size
    pub keyword_tree_threshold: usize,

    // Full-text engine
    pub text_scorer: TextScorer,
    pub okapi_k1: f64,
    pub okapi_b: f64,
    pub default_stopwords: bool,
    pub remove_single_chars: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage_dir: PathBuf::from("./catalog_data"),
            sync_on_commit: true,
            keyword_tree_threshold: 64,
            text_scorer: TextScorer::Okapi,
            okapi_k1: 1.2,
            okapi_b: 0.75,
            default_stopwords: true,
            remove_single_chars: false,
        }
    }
}

impl Config {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.keyword_tree_threshold == 0 {
            return Err(Error::new(
                ErrorKind::Configuration,
                "keyword_tree_threshold must be at least 1",
            ));
        }
        if !self.okapi_k1.is_finite() || self.okapi_k1 < 0.0 {
            return Err(Error::new(
                ErrorKind::Configuration,
                format!("okapi_k1 must be a non-negative number, got {}", self.okapi_k1),
            ));
        }
        if !(0.0..=1.0).contains(&self.okapi_b) {
            return Err(Error::new(
                ErrorKind::Configuration,
                format!("okapi_b must lie in [0, 1], got {}", self.okapi_b),
            ));
        }
        Ok(())
    }
}
