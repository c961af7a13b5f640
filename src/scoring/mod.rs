pub mod cosine;
pub mod okapi;
pub mod scorer;

pub use cosine::CosineScorer;
pub use okapi::OkapiScorer;
pub use scorer::{inverse_doc_frequency, CorpusStats, Scorer};

use crate::core::config::{Config, TextScorer};

/// Scorer selected by the configuration
pub fn scorer_from_config(config: &Config) -> Box<dyn Scorer> {
    match config.text_scorer {
        TextScorer::Okapi => Box::new(OkapiScorer::new(config.okapi_k1, config.okapi_b)),
        TextScorer::Cosine => Box::new(CosineScorer),
    }
}
