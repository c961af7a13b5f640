use std::collections::BTreeMap;

use crate::analysis::lexicon::Wid;
use crate::core::config::TextScorer;
use crate::scoring::scorer::{count_words, CorpusStats, Scorer};
use crate::sets::Weighted;

/// Cosine-similarity scorer. Posting weights are `1 + ln(count)` divided
/// by the document's Euclidean norm.
#[derive(Debug, Clone, Copy, Default)]
pub struct CosineScorer;

impl Scorer for CosineScorer {
    fn name(&self) -> &str {
        "cosine"
    }

    fn kind(&self) -> TextScorer {
        TextScorer::Cosine
    }

    fn frequencies(&self, wids: &[Wid]) -> (BTreeMap<Wid, f64>, f64) {
        let mut weights = count_words(wids);
        for w in weights.values_mut() {
            *w = 1.0 + w.ln();
        }
        let norm = weights.values().map(|w| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for w in weights.values_mut() {
                *w /= norm;
            }
        }
        (weights, norm)
    }

    fn term_scores(&self, postings: &Weighted, idf: f64, _stats: &CorpusStats) -> (Weighted, f64) {
        (postings.clone(), idf)
    }

    fn query_weight(&self, idfs: &[f64]) -> f64 {
        idfs.iter().map(|idf| idf * idf).sum::<f64>().sqrt()
    }

    fn clone_box(&self) -> Box<dyn Scorer> {
        Box::new(*self)
    }
}
