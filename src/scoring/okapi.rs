use std::collections::BTreeMap;

use crate::analysis::lexicon::Wid;
use crate::core::config::TextScorer;
use crate::scoring::scorer::{count_words, CorpusStats, Scorer};
use crate::sets::Weighted;

/// Okapi BM25 scorer
#[derive(Debug, Clone, Copy)]
pub struct OkapiScorer {
    pub k1: f64, // Term frequency saturation (default: 1.2)
    pub b: f64,  // Length normalization strength (default: 0.75)
}

impl Default for OkapiScorer {
    fn default() -> Self {
        OkapiScorer { k1: 1.2, b: 0.75 }
    }
}

impl OkapiScorer {
    pub fn new(k1: f64, b: f64) -> Self {
        OkapiScorer { k1, b }
    }
}

impl Scorer for OkapiScorer {
    fn name(&self) -> &str {
        "okapi"
    }

    fn kind(&self) -> TextScorer {
        TextScorer::Okapi
    }

    /// Raw term counts; the document weight is the document length.
    fn frequencies(&self, wids: &[Wid]) -> (BTreeMap<Wid, f64>, f64) {
        (count_words(wids), wids.len() as f64)
    }

    fn term_scores(&self, postings: &Weighted, idf: f64, stats: &CorpusStats) -> (Weighted, f64) {
        let mean_doc_len = stats.mean_doc_len();
        let scores = postings
            .iter()
            .map(|(&docid, &f)| {
                let doc_len = stats.doc_weight.get(&docid).copied().unwrap_or(0.0);
                let len_weight = if mean_doc_len > 0.0 {
                    (1.0 - self.b) + self.b * doc_len / mean_doc_len
                } else {
                    1.0
                };
                let tf = f * (self.k1 + 1.0) / (f + self.k1 * len_weight);
                (docid, tf * idf)
            })
            .collect();
        (scores, 1.0)
    }

    /// Upper bound of the summed score: every term saturated.
    fn query_weight(&self, idfs: &[f64]) -> f64 {
        idfs.iter().sum::<f64>() * (self.k1 + 1.0)
    }

    fn clone_box(&self) -> Box<dyn Scorer> {
        Box::new(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::DocId;

    #[test]
    fn test_frequencies_use_document_length() {
        let (freqs, weight) = OkapiScorer::default().frequencies(&[1, 2, 1]);
        assert_eq!(freqs.get(&1), Some(&2.0));
        assert_eq!(weight, 3.0);
    }

    #[test]
    fn test_average_length_document_score() {
        let scorer = OkapiScorer::default();
        let doc_weight: BTreeMap<DocId, f64> = [(DocId(1), 4.0), (DocId(2), 4.0)].into_iter().collect();
        let stats = CorpusStats { num_docs: 2, total_doc_len: 8.0, doc_weight: &doc_weight };
        let postings: Weighted = [(DocId(1), 1.0)].into_iter().collect();

        let (scores, factor) = scorer.term_scores(&postings, 2.0, &stats);
        assert_eq!(factor, 1.0);
        // len_weight == 1, so tf == (k1 + 1) / (1 + k1) == 1
        assert!((scores[&DocId(1)] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_longer_documents_score_lower() {
        let scorer = OkapiScorer::default();
        let doc_weight: BTreeMap<DocId, f64> = [(DocId(1), 2.0), (DocId(2), 10.0)].into_iter().collect();
        let stats = CorpusStats { num_docs: 2, total_doc_len: 12.0, doc_weight: &doc_weight };
        let postings: Weighted = [(DocId(1), 1.0), (DocId(2), 1.0)].into_iter().collect();
        let (scores, _) = scorer.term_scores(&postings, 1.0, &stats);
        assert!(scores[&DocId(1)] > scores[&DocId(2)]);
    }

    #[test]
    fn test_query_weight() {
        assert!((OkapiScorer::default().query_weight(&[1.0, 0.5]) - 3.3).abs() < 1e-12);
    }
}
