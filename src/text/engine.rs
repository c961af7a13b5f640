use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::analysis::lexicon::{Lexicon, LexiconData, Wid, OOV};
use crate::compression::WidCode;
use crate::core::error::Result;
use crate::core::types::DocId;
use crate::scoring::{inverse_doc_frequency, CorpusStats, Scorer};
use crate::sets::Weighted;
use crate::text::setops::{mass_weighted_intersection, mass_weighted_union, Scored};

/// Posting tables of the full-text engine. The three maps always hold the
/// same set of document ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostingData {
    pub word_info: BTreeMap<Wid, Weighted>,
    pub doc_weight: BTreeMap<DocId, f64>,
    pub doc_words: BTreeMap<DocId, Vec<u8>>,
    pub total_doc_len: f64,
}

/// Everything the engine persists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextEngineData {
    pub lexicon: LexiconData,
    pub postings: PostingData,
}

/// Full-text posting store: lexicon, postings and a scoring model.
#[derive(Clone)]
pub struct TextEngine {
    lexicon: Lexicon,
    postings: PostingData,
    scorer: Box<dyn Scorer>,
}

impl TextEngine {
    pub fn new(lexicon: Lexicon, scorer: Box<dyn Scorer>) -> Self {
        TextEngine {
            lexicon,
            postings: PostingData::default(),
            scorer,
        }
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    pub fn scorer(&self) -> &dyn Scorer {
        self.scorer.as_ref()
    }

    pub fn document_count(&self) -> usize {
        self.postings.doc_weight.len()
    }

    /// Number of distinct words with at least one posting.
    pub fn word_count(&self) -> usize {
        self.postings.word_info.len()
    }

    pub fn has_doc(&self, docid: DocId) -> bool {
        self.postings.doc_words.contains_key(&docid)
    }

    /// Index `text` under `docid`, returning the number of words indexed.
    pub fn index_doc(&mut self, docid: DocId, text: &str) -> Result<usize> {
        if self.has_doc(docid) {
            return self.reindex_doc(docid, text);
        }
        let wids = self.lexicon.source_to_word_ids(text);
        let (wid2weight, doc_weight) = self.scorer.frequencies(&wids);
        for (wid, weight) in wid2weight {
            self.postings.word_info.entry(wid).or_default().insert(docid, weight);
        }
        self.postings.doc_weight.insert(docid, doc_weight);
        self.postings.doc_words.insert(docid, WidCode::encode_u32_list(&wids));
        self.postings.total_doc_len += wids.len() as f64;
        Ok(wids.len())
    }

    /// Only postings whose weight actually changed are rewritten.
    fn reindex_doc(&mut self, docid: DocId, text: &str) -> Result<usize> {
        let old_wids = self.get_words(docid)?;
        let (old_weights, _) = self.scorer.frequencies(&old_wids);

        let new_wids = self.lexicon.source_to_word_ids(text);
        let (new_weights, new_doc_weight) = self.scorer.frequencies(&new_wids);

        for wid in old_weights.keys().filter(|wid| !new_weights.contains_key(wid)) {
            self.del_word_info(*wid, docid);
        }
        for (wid, &weight) in &new_weights {
            if old_weights.get(wid) != Some(&weight) {
                self.postings.word_info.entry(*wid).or_default().insert(docid, weight);
            }
        }

        self.postings.doc_weight.insert(docid, new_doc_weight);
        self.postings.doc_words.insert(docid, WidCode::encode_u32_list(&new_wids));
        self.postings.total_doc_len += new_wids.len() as f64 - old_wids.len() as f64;
        Ok(new_wids.len())
    }

    fn del_word_info(&mut self, wid: Wid, docid: DocId) {
        if let Some(postings) = self.postings.word_info.get_mut(&wid) {
            postings.remove(&docid);
            if postings.is_empty() {
                self.postings.word_info.remove(&wid);
            }
        }
    }

    /// Unknown documents are ignored.
    pub fn unindex_doc(&mut self, docid: DocId) -> Result<()> {
        if !self.has_doc(docid) {
            return Ok(());
        }
        let wids = self.get_words(docid)?;
        let distinct: BTreeSet<Wid> = wids.iter().copied().collect();
        for wid in distinct {
            self.del_word_info(wid, docid);
        }
        self.postings.doc_words.remove(&docid);
        self.postings.doc_weight.remove(&docid);
        self.postings.total_doc_len -= wids.len() as f64;
        Ok(())
    }

    /// Decoded word-id stream of a document (empty if unknown).
    pub fn get_words(&self, docid: DocId) -> Result<Vec<Wid>> {
        match self.postings.doc_words.get(&docid) {
            Some(code) => WidCode::decode_u32_list(code),
            None => Ok(Vec::new()),
        }
    }

    pub fn document_repr(&self, docid: DocId) -> Option<String> {
        if !self.has_doc(docid) {
            return None;
        }
        let wids = self.get_words(docid).ok()?;
        let words: Vec<&str> = wids.iter().filter_map(|&wid| self.lexicon.get_word(wid)).collect();
        Some(words.join(" "))
    }

    fn remove_oov(wids: Vec<Wid>) -> Vec<Wid> {
        wids.into_iter().filter(|&wid| wid != OOV).collect()
    }

    fn search_wids(&self, wids: &[Wid]) -> Vec<Scored> {
        let stats = CorpusStats {
            num_docs: self.document_count(),
            total_doc_len: self.postings.total_doc_len,
            doc_weight: &self.postings.doc_weight,
        };
        wids.iter()
            .filter_map(|wid| self.postings.word_info.get(wid))
            .map(|postings| {
                let idf = inverse_doc_frequency(postings.len(), stats.num_docs);
                self.scorer.term_scores(postings, idf, &stats)
            })
            .collect()
    }

    /// Documents containing any word of `term`. `None` when the term
    /// yields no words at all, which means every document matches.
    pub fn search(&self, term: &str) -> Option<Weighted> {
        let wids = self.lexicon.term_to_word_ids(term);
        if wids.is_empty() {
            return None;
        }
        let wids = Self::remove_oov(wids);
        Some(mass_weighted_union(self.search_wids(&wids)))
    }

    pub fn search_glob(&self, pattern: &str) -> Result<Weighted> {
        let wids = Self::remove_oov(self.lexicon.glob_to_word_ids(pattern)?);
        Ok(mass_weighted_union(self.search_wids(&wids)))
    }

    /// Documents containing the words of `phrase` consecutively and in order.
    pub fn search_phrase(&self, phrase: &str) -> Weighted {
        let wids = self.lexicon.term_to_word_ids(phrase);
        if wids.contains(&OOV) {
            return Weighted::new();
        }
        let parts = self.search_wids(&wids).into_iter().map(Some).collect();
        let hits = mass_weighted_intersection(parts);
        if hits.is_empty() {
            return hits;
        }
        let code = WidCode::encode_u32_list(&wids);
        hits.into_iter()
            .filter(|(docid, _)| {
                self.postings
                    .doc_words
                    .get(docid)
                    .is_some_and(|words| WidCode::contains_run(words, &code))
            })
            .collect()
    }

    /// Normalizer for the summed scores of a query made of `terms`.
    pub fn query_weight(&self, terms: &[String]) -> f64 {
        let num_docs = self.document_count();
        let idfs: Vec<f64> = terms
            .iter()
            .flat_map(|term| self.lexicon.term_to_word_ids(term))
            .filter(|&wid| wid != OOV)
            .map(|wid| {
                let df = self.postings.word_info.get(&wid).map_or(0, BTreeMap::len);
                inverse_doc_frequency(df, num_docs)
            })
            .collect();
        self.scorer.query_weight(&idfs)
    }

    pub fn docids(&self) -> impl Iterator<Item = DocId> + '_ {
        self.postings.doc_weight.keys().copied()
    }

    pub fn clear(&mut self) {
        self.lexicon.clear();
        self.postings = PostingData::default();
    }

    pub fn snapshot(&self) -> TextEngineData {
        TextEngineData {
            lexicon: self.lexicon.snapshot(),
            postings: self.postings.clone(),
        }
    }

    pub fn restore(&mut self, data: TextEngineData) {
        self.lexicon.restore(data.lexicon);
        self.postings = data.postings;
    }
}

impl std::fmt::Debug for TextEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextEngine")
            .field("scorer", &self.scorer.name())
            .field("documents", &self.document_count())
            .field("words", &self.word_count())
            .finish()
    }
}
