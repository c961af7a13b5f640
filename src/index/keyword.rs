use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{DocId, Document, Value};
use crate::index::{kind_mismatch, CatalogIndex, Discriminator, IndexKind, IndexSnapshot};
use crate::sets::{Bucket, BucketKind, DocSet, Results};

pub const DEFAULT_TREE_THRESHOLD: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperator {
    And,
    Or,
}

impl FromStr for SetOperator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "and" => Ok(SetOperator::And),
            "or" => Ok(SetOperator::Or),
            other => Err(Error::invalid_argument(format!("operator not valid: {}", other))),
        }
    }
}

/// Keyword normalization applied both when indexing and when querying.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Normalizer {
    #[default]
    Identity,
    /// Lowercase text keywords.
    Lowercase,
}

impl Normalizer {
    pub fn normalize(&self, value: &Value) -> Value {
        match (self, value) {
            (Normalizer::Lowercase, Value::Text(s)) => Value::Text(s.to_lowercase()),
            _ => value.clone(),
        }
    }
}

/// Inverted keyword store shared by keyword and facet indexes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordData {
    pub forward: BTreeMap<Value, Bucket>,
    pub reverse: BTreeMap<DocId, BTreeSet<Value>>,
    pub not_indexed: DocSet,
    pub num_docs: usize,
    pub tree_threshold: usize,
}

impl Default for KeywordData {
    fn default() -> Self {
        KeywordData::with_threshold(DEFAULT_TREE_THRESHOLD)
    }
}

impl KeywordData {
    pub fn with_threshold(tree_threshold: usize) -> Self {
        KeywordData {
            forward: BTreeMap::new(),
            reverse: BTreeMap::new(),
            not_indexed: DocSet::new(),
            num_docs: 0,
            tree_threshold,
        }
    }

    /// Replace the keywords of `docid`. Only buckets of words that were
    /// added or removed are touched; an empty set unindexes the document.
    pub fn insert(&mut self, docid: DocId, keywords: BTreeSet<Value>) {
        if keywords.is_empty() {
            self.remove(docid);
            return;
        }
        self.not_indexed.remove(&docid);

        match self.reverse.get(&docid) {
            None => {
                for word in &keywords {
                    self.add_to_bucket(word, docid);
                }
                self.num_docs += 1;
            }
            Some(old) => {
                let removed: Vec<Value> = old.difference(&keywords).cloned().collect();
                let added: Vec<Value> = keywords.difference(old).cloned().collect();
                for word in &removed {
                    self.remove_from_bucket(word, docid);
                }
                for word in &added {
                    self.add_to_bucket(word, docid);
                }
            }
        }
        self.reverse.insert(docid, keywords);
    }

    /// Unknown docids are ignored.
    pub fn remove(&mut self, docid: DocId) {
        if self.not_indexed.remove(&docid) {
            return;
        }
        let Some(words) = self.reverse.remove(&docid) else {
            return;
        };
        for word in &words {
            self.remove_from_bucket(word, docid);
        }
        self.num_docs -= 1;
    }

    pub fn mark_not_indexed(&mut self, docid: DocId) {
        self.remove(docid);
        self.not_indexed.insert(docid);
    }

    fn add_to_bucket(&mut self, word: &Value, docid: DocId) {
        let threshold = self.tree_threshold;
        let bucket = self.forward.entry(word.clone()).or_default();
        bucket.insert(docid);
        if bucket.kind() == BucketKind::Flat && bucket.len() >= threshold {
            bucket.to_tree();
        }
    }

    fn remove_from_bucket(&mut self, word: &Value, docid: DocId) {
        if let Some(bucket) = self.forward.get_mut(word) {
            bucket.remove(&docid);
            if bucket.is_empty() {
                self.forward.remove(word);
            }
        }
    }

    /// `And` intersects the buckets smallest first and stops as soon as the
    /// running result is empty; `Or` takes their union.
    pub fn search(&self, words: &[Value], operator: SetOperator) -> DocSet {
        match operator {
            SetOperator::Or => words
                .iter()
                .filter_map(|word| self.forward.get(word))
                .flat_map(Bucket::iter)
                .collect(),
            SetOperator::And => {
                let mut buckets = Vec::with_capacity(words.len());
                for word in words {
                    match self.forward.get(word) {
                        Some(bucket) => buckets.push(bucket),
                        None => return DocSet::new(),
                    }
                }
                buckets.sort_by_key(|bucket| bucket.len());

                let mut iter = buckets.into_iter();
                let Some(first) = iter.next() else {
                    return DocSet::new();
                };
                let mut result = first.to_set();
                for bucket in iter {
                    result.retain(|docid| bucket.contains(docid));
                    if result.is_empty() {
                        break;
                    }
                }
                result
            }
        }
    }

    /// Convert every bucket to the representation its size calls for.
    pub fn optimize(&mut self) {
        let threshold = self.tree_threshold;
        for bucket in self.forward.values_mut() {
            if bucket.len() >= threshold {
                bucket.to_tree();
            } else {
                bucket.to_flat();
            }
        }
    }

    pub fn indexed(&self) -> DocSet {
        self.reverse.keys().copied().collect()
    }

    pub fn document_repr(&self, docid: DocId) -> Option<String> {
        self.reverse.get(&docid).map(|words| {
            let words: Vec<String> = words.iter().map(Value::to_string).collect();
            format!("[{}]", words.join(", "))
        })
    }
}

/// Multi-value index: each document holds a set of keywords.
#[derive(Debug, Clone)]
pub struct KeywordIndex {
    discriminator: Discriminator,
    normalizer: Normalizer,
    data: KeywordData,
}

impl KeywordIndex {
    pub fn new(discriminator: Discriminator) -> Self {
        KeywordIndex::with_options(discriminator, Normalizer::Identity, DEFAULT_TREE_THRESHOLD)
    }

    pub fn with_options(discriminator: Discriminator, normalizer: Normalizer, tree_threshold: usize) -> Self {
        KeywordIndex {
            discriminator,
            normalizer,
            data: KeywordData::with_threshold(tree_threshold),
        }
    }

    pub fn normalizer(&self) -> Normalizer {
        self.normalizer
    }

    pub fn tree_threshold(&self) -> usize {
        self.data.tree_threshold
    }

    /// Takes effect for buckets as they grow, or for all of them on the next
    /// [`KeywordIndex::optimize`].
    pub fn set_tree_threshold(&mut self, tree_threshold: usize) {
        self.data.tree_threshold = tree_threshold;
    }

    pub fn optimize(&mut self) {
        self.data.optimize();
    }

    pub fn has_doc(&self, docid: DocId) -> bool {
        self.data.reverse.contains_key(&docid)
    }

    pub fn keywords_of(&self, docid: DocId) -> Option<&BTreeSet<Value>> {
        self.data.reverse.get(&docid)
    }

    pub fn bucket_kind(&self, word: &Value) -> Option<BucketKind> {
        self.data.forward.get(&self.normalizer.normalize(word)).map(Bucket::kind)
    }

    /// Index a keyword list directly. An empty list unindexes the document.
    pub fn index_keywords(&mut self, docid: DocId, keywords: &[Value]) {
        let keywords = keywords.iter().map(|word| self.normalizer.normalize(word)).collect();
        self.data.insert(docid, keywords);
    }

    pub fn search(&self, words: &[Value], operator: SetOperator) -> DocSet {
        let words: Vec<Value> = words.iter().map(|word| self.normalizer.normalize(word)).collect();
        self.data.search(&words, operator)
    }
}

impl CatalogIndex for KeywordIndex {
    fn kind(&self) -> IndexKind {
        IndexKind::Keyword
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
            None => self.data.mark_not_indexed(docid),
            Some(Value::List(keywords)) => self.index_keywords(docid, &keywords),
            Some(Value::Text(_)) => {
                return Err(Error::invalid_argument(
                    "keyword index value must be a list of keywords, not a string",
                ));
            }
            Some(other) => {
                return Err(Error::new(
                    ErrorKind::InvalidArgument,
                    format!("keyword index value must be a list, got {}", other),
                ));
            }
        }
        Ok(())
    }

    fn unindex_doc(&mut self, docid: DocId) -> Result<()> {
        self.data.remove(docid);
        Ok(())
    }

    fn reset(&mut self) {
        self.data = KeywordData::with_threshold(self.data.tree_threshold);
    }

    fn indexed(&self) -> DocSet {
        self.data.indexed()
    }

    fn not_indexed(&self) -> &DocSet {
        &self.data.not_indexed
    }

    fn indexed_count(&self) -> usize {
        self.data.num_docs
    }

    fn word_count(&self) -> usize {
        self.data.forward.len()
    }

    fn document_repr(&self, docid: DocId) -> Option<String> {
        self.data.document_repr(docid)
    }

    fn apply(&self, query: &Value) -> Result<Results> {
        let words = query.clone().into_items();
        Ok(Results::Set(self.search(&words, SetOperator::And)))
    }

    fn apply_eq(&self, value: &Value) -> Result<Results> {
        Ok(Results::Set(self.search(std::slice::from_ref(value), SetOperator::And)))
    }

    fn apply_any(&self, values: &[Value]) -> Result<Results> {
        Ok(Results::Set(self.search(values, SetOperator::Or)))
    }

    fn apply_all(&self, values: &[Value]) -> Result<Results> {
        Ok(Results::Set(self.search(values, SetOperator::And)))
    }

    fn snapshot(&self) -> IndexSnapshot {
        IndexSnapshot::Keyword(self.data.clone())
    }

    fn restore(&mut self, snapshot: IndexSnapshot) -> Result<()> {
        match snapshot {
            IndexSnapshot::Keyword(data) => {
                self.data = data;
                Ok(())
            }
            other => Err(kind_mismatch(IndexKind::Keyword, other.kind())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[i64]) -> DocSet {
        list.iter().map(|&i| DocId(i)).collect()
    }

    fn words(list: &[&str]) -> Vec<Value> {
        list.iter().map(|&w| Value::from(w)).collect()
    }

    fn doc(list: &[&str]) -> Document {
        Document::new().with_field("tags", Value::List(words(list)))
    }

    fn populated() -> KeywordIndex {
        let mut index = KeywordIndex::new(Discriminator::attribute("tags").unwrap());
        index.index_doc(DocId(1), &doc(&["red", "green"])).unwrap();
        index.index_doc(DocId(2), &doc(&["green", "blue"])).unwrap();
        index.index_doc(DocId(3), &doc(&["red", "blue", "green"])).unwrap();
        index
    }

    #[test]
    fn test_search_operators() {
        let index = populated();
        assert_eq!(index.search(&words(&["red", "green"]), SetOperator::And), ids(&[1, 3]));
        assert_eq!(index.search(&words(&["red", "blue"]), SetOperator::Or), ids(&[1, 2, 3]));
        assert_eq!(index.search(&words(&["red", "purple"]), SetOperator::And), ids(&[]));
        assert_eq!(index.search(&[], SetOperator::And), ids(&[]));
    }

    #[test]
    fn test_set_operator_from_str() {
        assert_eq!("or".parse::<SetOperator>().unwrap(), SetOperator::Or);
        let err = "xor".parse::<SetOperator>().unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_comparators_and_negation() {
        let index = populated();
        let red = Value::from("red");
        assert_eq!(index.apply_eq(&red).unwrap().into_set(), ids(&[1, 3]));
        assert_eq!(index.apply_not_eq(&red).unwrap().into_set(), ids(&[2]));
        assert_eq!(index.apply_all(&words(&["blue", "green"])).unwrap().into_set(), ids(&[2, 3]));
        assert_eq!(index.apply_any(&words(&["red", "nope"])).unwrap().into_set(), ids(&[1, 3]));
        assert_eq!(index.apply_not_all(&words(&["blue", "red"])).unwrap().into_set(), ids(&[1, 2]));
        assert_eq!(index.apply(&Value::from(vec!["red", "blue"])).unwrap().into_set(), ids(&[3]));
        assert!(index.apply_in_range(&crate::index::RangeQuery::new(None, None, false, false)).is_err());
    }

    #[test]
    fn test_reindex_updates_only_changed_words() {
        let mut index = populated();
        index.index_doc(DocId(1), &doc(&["green", "yellow"])).unwrap();
        assert_eq!(index.apply_eq(&Value::from("red")).unwrap().into_set(), ids(&[3]));
        assert_eq!(index.apply_eq(&Value::from("yellow")).unwrap().into_set(), ids(&[1]));
        assert_eq!(index.apply_eq(&Value::from("green")).unwrap().into_set(), ids(&[1, 2, 3]));
        assert_eq!(index.indexed_count(), 3);
    }

    #[test]
    fn test_bare_string_is_rejected() {
        let mut index = populated();
        let bad = Document::new().with_field("tags", "red");
        assert_eq!(index.index_doc(DocId(9), &bad).unwrap_err().kind, ErrorKind::InvalidArgument);
        let bad = Document::new().with_field("tags", 5);
        assert!(index.index_doc(DocId(9), &bad).is_err());
    }

    #[test]
    fn test_empty_list_unindexes() {
        let mut index = populated();
        index.index_doc(DocId(2), &doc(&[])).unwrap();
        assert!(!index.has_doc(DocId(2)));
        assert!(index.not_indexed().is_empty());
        assert_eq!(index.apply_eq(&Value::from("blue")).unwrap().into_set(), ids(&[3]));
        assert_eq!(index.indexed_count(), 2);
    }

    #[test]
    fn test_missing_value_is_not_indexed() {
        let mut index = populated();
        index.index_doc(DocId(1), &Document::new()).unwrap();
        assert_eq!(index.not_indexed(), &ids(&[1]));
        assert_eq!(index.docids(), ids(&[1, 2, 3]));
        assert_eq!(index.apply_not_eq(&Value::from("blue")).unwrap().into_set(), ids(&[1]));
    }

    #[test]
    fn test_tree_threshold_and_optimize() {
        let mut index = KeywordIndex::with_options(Discriminator::attribute("tags").unwrap(), Normalizer::Identity, 2);
        let shared = Value::from("shared");
        index.index_doc(DocId(1), &doc(&["shared"])).unwrap();
        assert_eq!(index.bucket_kind(&shared), Some(BucketKind::Flat));
        index.index_doc(DocId(2), &doc(&["shared"])).unwrap();
        index.index_doc(DocId(3), &doc(&["shared"])).unwrap();
        assert_eq!(index.bucket_kind(&shared), Some(BucketKind::Tree));

        index.set_tree_threshold(64);
        index.optimize();
        assert_eq!(index.bucket_kind(&shared), Some(BucketKind::Flat));
        assert_eq!(index.apply_eq(&shared).unwrap().into_set(), ids(&[1, 2, 3]));

        index.set_tree_threshold(3);
        index.optimize();
        assert_eq!(index.bucket_kind(&shared), Some(BucketKind::Tree));
    }

    #[test]
    fn test_lowercase_normalizer() {
        let mut index = KeywordIndex::with_options(Discriminator::attribute("tags").unwrap(), Normalizer::Lowercase, 64);
        index.index_doc(DocId(1), &doc(&["Red", "GREEN"])).unwrap();
        assert_eq!(index.apply_eq(&Value::from("RED")).unwrap().into_set(), ids(&[1]));
        assert_eq!(index.keywords_of(DocId(1)).unwrap().len(), 2);
        assert_eq!(index.document_repr(DocId(1)), Some("['green', 'red']".to_string()));
    }

    #[test]
    fn test_snapshot_restore() {
        let index = populated();
        let mut other = KeywordIndex::new(Discriminator::attribute("tags").unwrap());
        other.restore(index.snapshot()).unwrap();
        assert_eq!(other.apply_eq(&Value::from("red")).unwrap().into_set(), ids(&[1, 3]));
        assert!(other.restore(IndexSnapshot::Facet(KeywordData::default())).is_err());
    }
}
