use std::any::Any;
use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::analysis::{Lexicon, Pipeline, Wid};
use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::core::types::{DocId, Document, Value};
use crate::index::sorting::SortType;
use crate::index::{kind_mismatch, CatalogIndex, Discriminator, IndexKind, IndexSnapshot};
use crate::scoring::{scorer_from_config, OkapiScorer, Scorer};
use crate::sets::{DocSet, Results, Weighted};
use crate::text::{ParseTree, QueryParser, TextEngine, TextEngineData};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextData {
    pub engine: TextEngineData,
    pub not_indexed: DocSet,
}

/// Full-text index answering relevance-ranked text queries.
#[derive(Debug, Clone)]
pub struct TextIndex {
    discriminator: Discriminator,
    engine: TextEngine,
    not_indexed: DocSet,
}

impl TextIndex {
    /// Standard pipeline and Okapi scoring.
    pub fn new(discriminator: Discriminator) -> Self {
        TextIndex::with_engine(
            discriminator,
            Lexicon::new(Pipeline::standard()),
            Box::new(OkapiScorer::default()),
        )
    }

    pub fn with_engine(discriminator: Discriminator, lexicon: Lexicon, scorer: Box<dyn Scorer>) -> Self {
        TextIndex {
            discriminator,
            engine: TextEngine::new(lexicon, scorer),
            not_indexed: DocSet::new(),
        }
    }

    pub fn from_config(discriminator: Discriminator, config: &Config) -> Self {
        TextIndex::with_engine(
            discriminator,
            Lexicon::new(Pipeline::from_config(config)),
            scorer_from_config(config),
        )
    }

    pub fn engine(&self) -> &TextEngine {
        &self.engine
    }

    pub fn lexicon(&self) -> &Lexicon {
        self.engine.lexicon()
    }

    pub fn has_doc(&self, docid: DocId) -> bool {
        self.engine.has_doc(docid)
    }

    pub fn get_words(&self, docid: DocId) -> Result<Vec<Wid>> {
        self.engine.get_words(docid)
    }

    pub fn index_text(&mut self, docid: DocId, text: &str) -> Result<usize> {
        self.not_indexed.remove(&docid);
        self.engine.index_doc(docid, text)
    }

    pub fn search(&self, term: &str) -> Option<Weighted> {
        self.engine.search(term)
    }

    pub fn search_phrase(&self, phrase: &str) -> Weighted {
        self.engine.search_phrase(phrase)
    }

    pub fn search_glob(&self, pattern: &str) -> Result<Weighted> {
        self.engine.search_glob(pattern)
    }

    pub fn parse_query(&self, query: &str) -> Result<ParseTree> {
        QueryParser::new(self.engine.lexicon()).parse_query(query)
    }

    /// The parse tree plus the stop words the parser dropped.
    pub fn parse_query_ex(&self, query: &str) -> Result<(ParseTree, Vec<String>)> {
        QueryParser::new(self.engine.lexicon()).parse_query_ex(query)
    }

    /// Run a text query, scaling each score by the query weight.
    pub fn query(&self, query: &str) -> Result<Weighted> {
        let tree = self.parse_query(query)?;
        let Some(mut results) = tree.execute(&self.engine)? else {
            return Ok(Weighted::new());
        };
        if results.is_empty() {
            return Ok(results);
        }

        let mut query_weight = self.engine.query_weight(&tree.terms());
        if query_weight == 0.0 {
            query_weight = 1.0;
        }
        for (docid, score) in results.iter_mut() {
            let scaled = *score / query_weight;
            *score = if scaled.is_finite() {
                scaled
            } else {
                warn!(%docid, score = *score, query_weight, "text score overflow clamped");
                f64::MAX
            };
        }
        Ok(results)
    }

    fn discriminated_text(&self, value: Value) -> Result<String> {
        match value {
            Value::Text(text) => Ok(text),
            Value::List(items) => {
                let mut parts = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Text(text) => parts.push(text),
                        other => {
                            return Err(Error::invalid_argument(format!(
                                "text index can only index strings, got {}",
                                other
                            )));
                        }
                    }
                }
                Ok(parts.join(" "))
            }
            other => Err(Error::invalid_argument(format!(
                "text index can only index strings, got {}",
                other
            ))),
        }
    }
}

impl CatalogIndex for TextIndex {
    fn kind(&self) -> IndexKind {
        IndexKind::Text
    }

    fn discriminator(&self) -> &Discriminator {
        &self.discriminator
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn index_doc(&mut self, docid: DocId, document: &Document) -> Result<()> {
        match self.discriminator.discriminate(document)? {
            None => {
                self.engine.unindex_doc(docid)?;
                self.not_indexed.insert(docid);
            }
            Some(value) => {
                let text = self.discriminated_text(value)?;
                self.index_text(docid, &text)?;
            }
        }
        Ok(())
    }

    fn unindex_doc(&mut self, docid: DocId) -> Result<()> {
        if self.not_indexed.remove(&docid) {
            return Ok(());
        }
        self.engine.unindex_doc(docid)
    }

    fn reset(&mut self) {
        self.engine.clear();
        self.not_indexed.clear();
    }

    fn indexed(&self) -> DocSet {
        self.engine.docids().collect()
    }

    fn not_indexed(&self) -> &DocSet {
        &self.not_indexed
    }

    fn indexed_count(&self) -> usize {
        self.engine.document_count()
    }

    fn word_count(&self) -> usize {
        self.engine.word_count()
    }

    fn document_repr(&self, docid: DocId) -> Option<String> {
        self.engine.document_repr(docid)
    }

    fn apply(&self, query: &Value) -> Result<Results> {
        match query {
            Value::Text(text) => Ok(Results::Weighted(self.query(text)?)),
            other => Err(Error::invalid_argument(format!("text query must be a string, got {}", other))),
        }
    }

    fn apply_eq(&self, value: &Value) -> Result<Results> {
        self.apply(value)
    }

    fn apply_contains(&self, value: &Value) -> Result<Results> {
        self.apply(value)
    }

    /// Ranks by relevance, best first unless `reverse`.
    fn sort(
        &self,
        docids: &Results,
        reverse: bool,
        limit: Option<usize>,
        _sort_type: Option<SortType>,
    ) -> Result<Vec<DocId>> {
        if limit == Some(0) {
            return Err(Error::invalid_argument("limit must be 1 or greater"));
        }
        if docids.is_empty() {
            return Ok(Vec::new());
        }
        let Some(weights) = docids.weights() else {
            return Err(Error::invalid_argument(
                "Unable to sort by relevance because the search result does not contain weights",
            ));
        };

        let mut ranked: Vec<(f64, DocId)> = weights.iter().map(|(&docid, &score)| (score, docid)).collect();
        ranked.sort_by(|a, b| match a.0.total_cmp(&b.0) {
            Ordering::Equal => a.1.cmp(&b.1),
            other => other,
        });
        if !reverse {
            ranked.reverse();
        }
        if let Some(limit) = limit {
            ranked.truncate(limit);
        }
        Ok(ranked.into_iter().map(|(_, docid)| docid).collect())
    }

    fn snapshot(&self) -> IndexSnapshot {
        IndexSnapshot::Text(TextData {
            engine: self.engine.snapshot(),
            not_indexed: self.not_indexed.clone(),
        })
    }

    fn restore(&mut self, snapshot: IndexSnapshot) -> Result<()> {
        match snapshot {
            IndexSnapshot::Text(data) => {
                self.engine.restore(data.engine);
                self.not_indexed = data.not_indexed;
                Ok(())
            }
            other => Err(kind_mismatch(IndexKind::Text, other.kind())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::TextScorer;
    use crate::core::error::ErrorKind;

    fn ids(list: &[i64]) -> DocSet {
        list.iter().map(|&i| DocId(i)).collect()
    }

    fn populated() -> TextIndex {
        let mut index = TextIndex::new(Discriminator::attribute("body").unwrap());
        let texts = [
            (1, "now is the time"),
            (2, "for all good men"),
            (3, "country music"),
            (4, "good country roads and good country music"),
        ];
        for (docid, text) in texts {
            let doc = Document::new().with_field("body", text);
            index.index_doc(DocId(docid), &doc).unwrap();
        }
        index
    }

    #[test]
    fn test_query_ranks_and_normalizes() {
        let index = populated();
        let results = index.apply(&Value::from("country")).unwrap();
        assert_eq!(results.to_set(), ids(&[3, 4]));
        assert!(results.weights().unwrap().values().all(|&w| w > 0.0));

        let ranked = index.sort(&results, false, None, None).unwrap();
        assert_eq!(ranked.len(), 2);
        let reversed = index.sort(&results, true, Some(1), None).unwrap();
        assert_eq!(reversed, vec![ranked[1]]);
    }

    #[test]
    fn test_unknown_word_matches_nothing() {
        let index = populated();
        assert!(index.apply(&Value::from("nonexistent")).unwrap().is_empty());
        assert_eq!(index.search("nonexistent"), Some(Weighted::new()));
    }

    #[test]
    fn test_boolean_text_queries() {
        let index = populated();
        let out = index.apply(&Value::from("good AND NOT country")).unwrap().into_set();
        assert_eq!(out, ids(&[2]));
        let out = index.apply(&Value::from("time OR music")).unwrap().into_set();
        assert_eq!(out, ids(&[1, 3, 4]));
        let out = index.apply(&Value::from("\"country music\"")).unwrap().into_set();
        assert_eq!(out, ids(&[3, 4]));
        let out = index.apply(&Value::from("\"music country\"")).unwrap().into_set();
        assert!(out.is_empty());
        let out = index.apply(&Value::from("coun*")).unwrap().into_set();
        assert_eq!(out, ids(&[3, 4]));
    }

    #[test]
    fn test_query_errors() {
        let index = populated();
        assert_eq!(index.apply(&Value::from("the")).unwrap_err().kind, ErrorKind::Parse);
        assert_eq!(index.search_glob("*try").unwrap_err().kind, ErrorKind::Query);
        assert!(index.apply(&Value::Int(3)).is_err());
        let (_, ignored) = index.parse_query_ex("the music").unwrap();
        assert_eq!(ignored, vec!["the"]);
    }

    #[test]
    fn test_contains_and_negation() {
        let index = populated();
        let music = Value::from("music");
        assert_eq!(index.apply_contains(&music).unwrap().to_set(), ids(&[3, 4]));
        assert_eq!(index.apply_not_contains(&music).unwrap().into_set(), ids(&[1, 2]));
        assert_eq!(index.apply_not_eq(&Value::from("zzz")).unwrap().into_set(), ids(&[1, 2, 3, 4]));
    }

    #[test]
    fn test_sort_requires_weights() {
        let index = populated();
        let plain = Results::Set(ids(&[1, 2]));
        assert_eq!(index.sort(&plain, false, None, None).unwrap_err().kind, ErrorKind::InvalidArgument);
        let results = index.apply(&Value::from("good")).unwrap();
        assert!(index.sort(&results, false, Some(0), None).is_err());
    }

    #[test]
    fn test_index_lists_and_missing_values() {
        let mut index = populated();
        let doc = Document::new().with_field("body", vec!["jazz", "blues"]);
        index.index_doc(DocId(5), &doc).unwrap();
        assert_eq!(index.document_repr(DocId(5)), Some("jazz blues".to_string()));
        assert_eq!(index.get_words(DocId(5)).unwrap().len(), 2);

        index.index_doc(DocId(5), &Document::new()).unwrap();
        assert!(!index.has_doc(DocId(5)));
        assert!(index.not_indexed().contains(&DocId(5)));
        assert_eq!(index.docids_count(), 5);

        let bad = Document::new().with_field("body", 7);
        assert!(index.index_doc(DocId(6), &bad).is_err());
    }

    #[test]
    fn test_cosine_from_config() {
        let config = Config {
            text_scorer: TextScorer::Cosine,
            ..Config::default()
        };
        let mut index = TextIndex::from_config(Discriminator::attribute("body").unwrap(), &config);
        index.index_text(DocId(1), "country music").unwrap();
        index.index_text(DocId(2), "country roads").unwrap();
        let results = index.apply(&Value::from("music")).unwrap();
        assert_eq!(results.to_set(), ids(&[1]));
        assert_eq!(index.engine().scorer().kind(), TextScorer::Cosine);
    }

    #[test]
    fn test_snapshot_restore_and_reset() {
        let index = populated();
        let mut other = TextIndex::new(Discriminator::attribute("body").unwrap());
        other.restore(index.snapshot()).unwrap();
        assert_eq!(other.apply(&Value::from("music")).unwrap().to_set(), ids(&[3, 4]));
        other.reset();
        assert_eq!(other.indexed_count(), 0);
        assert_eq!(other.lexicon().length(), 0);
    }
}
