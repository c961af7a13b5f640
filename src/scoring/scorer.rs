use std::collections::BTreeMap;

use crate::analysis::lexicon::Wid;
use crate::core::config::TextScorer;
use crate::core::types::DocId;
use crate::sets::Weighted;

/// Collection statistics a scorer may consult at query time
#[derive(Debug, Clone)]
pub struct CorpusStats<'a> {
    pub num_docs: usize,
    pub total_doc_len: f64,
    pub doc_weight: &'a BTreeMap<DocId, f64>,
}

impl CorpusStats<'_> {
    pub fn mean_doc_len(&self) -> f64 {
        if self.num_docs == 0 {
            return 0.0;
        }
        self.total_doc_len / self.num_docs as f64
    }
}

/// Scoring model of a full-text posting store.
pub trait Scorer: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> TextScorer;

    /// Posting weight per word and the document weight for one document's
    /// word-id stream.
    fn frequencies(&self, wids: &[Wid]) -> (BTreeMap<Wid, f64>, f64);

    /// Scores for one query word: per-document values and the factor the
    /// weighted union multiplies them by.
    fn term_scores(&self, postings: &Weighted, idf: f64, stats: &CorpusStats) -> (Weighted, f64);

    /// Normalizer for the summed score of a query with these word idfs.
    fn query_weight(&self, idfs: &[f64]) -> f64;

    fn clone_box(&self) -> Box<dyn Scorer>;
}

impl Clone for Box<dyn Scorer> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// `ln(1 + N / df)`
pub fn inverse_doc_frequency(doc_freq: usize, num_docs: usize) -> f64 {
    if doc_freq == 0 {
        return 0.0;
    }
    (1.0 + num_docs as f64 / doc_freq as f64).ln()
}

pub(crate) fn count_words(wids: &[Wid]) -> BTreeMap<Wid, f64> {
    let mut counts = BTreeMap::new();
    for &wid in wids {
        *counts.entry(wid).or_insert(0.0) += 1.0;
    }
    counts
}
