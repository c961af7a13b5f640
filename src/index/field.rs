use std::any::Any;
use std::collections::BTreeMap;
use std::ops::Bound;

use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::core::types::{DocId, Document, Value};
use crate::index::sorting::{self, SortType};
use crate::index::{kind_mismatch, CatalogIndex, Discriminator, IndexKind, IndexSnapshot, RangeQuery};
use crate::sets::ops::multiunion;
use crate::sets::{DocSet, Results};

/// Forward and reverse maps of a field index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldData {
    pub forward: BTreeMap<Value, DocSet>,
    pub reverse: BTreeMap<DocId, Value>,
    pub not_indexed: DocSet,
    pub num_docs: usize,
}

/// Exact-value index: one value per document, ordered for range queries
/// and sorting.
#[derive(Debug, Clone)]
pub struct FieldIndex {
    discriminator: Discriminator,
    data: FieldData,
}

impl FieldIndex {
    pub fn new(discriminator: Discriminator) -> Self {
        FieldIndex {
            discriminator,
            data: FieldData::default(),
        }
    }

    /// Index `value` directly, bypassing the discriminator. `None` records
    /// the document as not indexed.
    pub fn index_value(&mut self, docid: DocId, value: Option<Value>) {
        let Some(value) = value else {
            self.unindex(docid);
            self.data.not_indexed.insert(docid);
            return;
        };

        if self.data.reverse.get(&docid) == Some(&value) {
            return;
        }
        self.unindex(docid);

        self.data.forward.entry(value.clone()).or_default().insert(docid);
        self.data.reverse.insert(docid, value);
        self.data.num_docs += 1;
    }

    fn unindex(&mut self, docid: DocId) {
        if self.data.not_indexed.remove(&docid) {
            return;
        }
        let Some(value) = self.data.reverse.remove(&docid) else {
            return;
        };
        if let Some(bucket) = self.data.forward.get_mut(&value) {
            bucket.remove(&docid);
            if bucket.is_empty() {
                self.data.forward.remove(&value);
            }
        }
        self.data.num_docs -= 1;
    }

    pub fn value_of(&self, docid: DocId) -> Option<&Value> {
        self.data.reverse.get(&docid)
    }

    /// Distinct indexed values in order.
    pub fn unique_values(&self) -> impl Iterator<Item = &Value> {
        self.data.forward.keys()
    }

    fn bucket(&self, value: &Value) -> DocSet {
        self.data.forward.get(value).cloned().unwrap_or_default()
    }
}

impl CatalogIndex for FieldIndex {
    fn kind(&self) -> IndexKind {
        IndexKind::Field
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
        let value = self.discriminator.discriminate(document)?;
        self.index_value(docid, value);
        Ok(())
    }

    fn unindex_doc(&mut self, docid: DocId) -> Result<()> {
        self.unindex(docid);
        Ok(())
    }

    fn reset(&mut self) {
        self.data = FieldData::default();
    }

    fn indexed(&self) -> DocSet {
        self.data.reverse.keys().copied().collect()
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
        self.data.reverse.get(&docid).map(Value::to_string)
    }

    fn apply(&self, query: &Value) -> Result<Results> {
        match query {
            Value::List(values) => self.apply_any(values),
            value => self.apply_eq(value),
        }
    }

    fn sort(
        &self,
        docids: &Results,
        reverse: bool,
        limit: Option<usize>,
        sort_type: Option<SortType>,
    ) -> Result<Vec<DocId>> {
        sorting::sort_by_value(&self.data.forward, &self.data.reverse, docids, reverse, limit, sort_type)
    }

    fn apply_eq(&self, value: &Value) -> Result<Results> {
        Ok(Results::Set(self.bucket(value)))
    }

    fn apply_any(&self, values: &[Value]) -> Result<Results> {
        let buckets = values.iter().filter_map(|v| self.data.forward.get(v));
        Ok(Results::Set(multiunion(buckets)))
    }

    fn apply_in_range(&self, range: &RangeQuery) -> Result<Results> {
        if let (Some(start), Some(end)) = (&range.start, &range.end) {
            // BTreeMap::range panics on an inverted or empty-exclusive range
            if start > end || (start == end && (range.start_exclusive || range.end_exclusive)) {
                return Ok(Results::empty());
            }
        }
        let lower = match &range.start {
            Some(v) if range.start_exclusive => Bound::Excluded(v),
            Some(v) => Bound::Included(v),
            None => Bound::Unbounded,
        };
        let upper = match &range.end {
            Some(v) if range.end_exclusive => Bound::Excluded(v),
            Some(v) => Bound::Included(v),
            None => Bound::Unbounded,
        };
        let buckets = self.data.forward.range::<Value, _>((lower, upper)).map(|(_, docids)| docids);
        Ok(Results::Set(multiunion(buckets)))
    }

    fn snapshot(&self) -> IndexSnapshot {
        IndexSnapshot::Field(self.data.clone())
    }

    fn restore(&mut self, snapshot: IndexSnapshot) -> Result<()> {
        match snapshot {
            IndexSnapshot::Field(data) => {
                self.data = data;
                Ok(())
            }
            other => Err(kind_mismatch(IndexKind::Field, other.kind())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[i64]) -> DocSet {
        list.iter().map(|&i| DocId(i)).collect()
    }

    fn field_index() -> FieldIndex {
        FieldIndex::new(Discriminator::attribute("field").unwrap())
    }

    fn populated() -> FieldIndex {
        let mut index = field_index();
        for (docid, value) in [(1, "field1"), (2, "field2"), (3, "field3")] {
            let doc = Document::new().with_field("field", value);
            index.index_doc(DocId(docid), &doc).unwrap();
        }
        index
    }

    #[test]
    fn test_eq_matches_numbers_exactly() {
        let mut index = field_index();
        index.index_doc(DocId(1), &Document::new().with_field("field", (1i64 << 53) + 1)).unwrap();
        index.index_doc(DocId(2), &Document::new().with_field("field", -0.0)).unwrap();

        assert!(index.apply_eq(&Value::Float(9_007_199_254_740_992.0)).unwrap().is_empty());
        assert_eq!(index.apply_eq(&Value::Int((1 << 53) + 1)).unwrap().into_set(), ids(&[1]));
        assert_eq!(index.apply_eq(&Value::Int(0)).unwrap().into_set(), ids(&[2]));
        assert_eq!(index.apply_eq(&Value::Float(0.0)).unwrap().into_set(), ids(&[2]));
    }

    #[test]
    fn test_eq_and_not_eq() {
        let index = populated();
        let value = Value::from("field2");
        assert_eq!(index.apply_eq(&value).unwrap().into_set(), ids(&[2]));
        assert_eq!(index.apply_not_eq(&value).unwrap().into_set(), ids(&[1, 3]));
        assert_eq!(index.apply(&value).unwrap().into_set(), ids(&[2]));
    }

    #[test]
    fn test_not_eq_unknown_value_returns_everything() {
        let mut index = populated();
        index.index_doc(DocId(4), &Document::new()).unwrap();
        let out = index.apply_not_eq(&Value::from("missing")).unwrap().into_set();
        assert_eq!(out, ids(&[1, 2, 3, 4]));
        // docs without a value are part of every negation
        let out = index.apply_not_eq(&Value::from("field1")).unwrap().into_set();
        assert_eq!(out, ids(&[2, 3, 4]));
    }

    #[test]
    fn test_reindex_moves_the_document() {
        let mut index = populated();
        let doc = Document::new().with_field("field", "field3");
        index.index_doc(DocId(1), &doc).unwrap();

        assert_eq!(index.value_of(DocId(1)), Some(&Value::from("field3")));
        assert_eq!(index.apply_eq(&Value::from("field1")).unwrap().into_set(), ids(&[]));
        assert_eq!(index.apply_eq(&Value::from("field3")).unwrap().into_set(), ids(&[1, 3]));
        assert_eq!(index.indexed_count(), 3);
        assert_eq!(index.word_count(), 2);
    }

    #[test]
    fn test_index_is_idempotent() {
        let mut index = populated();
        let before = index.data.clone();
        let doc = Document::new().with_field("field", "field2");
        index.index_doc(DocId(2), &doc).unwrap();
        assert_eq!(index.data, before);
    }

    #[test]
    fn test_missing_value_moves_to_not_indexed() {
        let mut index = populated();
        index.index_doc(DocId(2), &Document::new()).unwrap();
        assert!(index.not_indexed().contains(&DocId(2)));
        assert_eq!(index.value_of(DocId(2)), None);
        assert_eq!(index.indexed_count(), 2);
        assert_eq!(index.docids(), ids(&[1, 2, 3]));
        assert_eq!(index.docids_count(), 3);

        index.unindex_doc(DocId(2)).unwrap();
        assert!(index.not_indexed().is_empty());
        // unknown docids are ignored
        index.unindex_doc(DocId(99)).unwrap();
        assert_eq!(index.docids(), ids(&[1, 3]));
    }

    #[test]
    fn test_ranges() {
        let mut index = field_index();
        for i in 0..10 {
            index.index_value(DocId(i), Some(Value::Int(i * 10)));
        }
        let range = RangeQuery::new(Some(Value::Int(20)), Some(Value::Int(50)), false, true);
        assert_eq!(index.apply_in_range(&range).unwrap().into_set(), ids(&[2, 3, 4]));
        assert_eq!(index.apply_gt(&Value::Int(70)).unwrap().into_set(), ids(&[8, 9]));
        assert_eq!(index.apply_ge(&Value::Int(70)).unwrap().into_set(), ids(&[7, 8, 9]));
        assert_eq!(index.apply_lt(&Value::Int(10)).unwrap().into_set(), ids(&[0]));
        assert_eq!(index.apply_le(&Value::Float(10.0)).unwrap().into_set(), ids(&[0, 1]));
        let not_range = index.apply_not_in_range(&range).unwrap().into_set();
        assert_eq!(not_range, ids(&[0, 1, 5, 6, 7, 8, 9]));

        let inverted = RangeQuery::new(Some(Value::Int(50)), Some(Value::Int(20)), false, false);
        assert!(index.apply_in_range(&inverted).unwrap().is_empty());
        let point = RangeQuery::new(Some(Value::Int(50)), Some(Value::Int(50)), true, false);
        assert!(index.apply_in_range(&point).unwrap().is_empty());
    }

    #[test]
    fn test_any_and_list_apply() {
        let index = populated();
        let query = Value::from(vec!["field1", "field3", "nope"]);
        assert_eq!(index.apply(&query).unwrap().into_set(), ids(&[1, 3]));
        let not_any = index.apply_not_any(&[Value::from("field1")]).unwrap().into_set();
        assert_eq!(not_any, ids(&[2, 3]));
    }

    #[test]
    fn test_unsupported_operations() {
        let index = populated();
        let err = index.apply_contains(&Value::from("x")).unwrap_err();
        assert_eq!(err.context, "Contains is not supported for FieldIndex");
    }

    #[test]
    fn test_sort() {
        let mut index = field_index();
        for (docid, value) in [(5, 3), (6, 1), (7, 2), (8, 1)] {
            index.index_value(DocId(docid), Some(Value::Int(value)));
        }
        let docids = Results::Set(ids(&[5, 6, 7, 8, 100]));
        let asc = index.sort(&docids, false, None, None).unwrap();
        assert_eq!(asc, vec![DocId(6), DocId(8), DocId(7), DocId(5)]);
        let desc = index.sort(&docids, true, Some(2), None).unwrap();
        assert_eq!(desc, vec![DocId(5), DocId(7)]);
        assert!(index.sort(&docids, false, Some(0), None).is_err());
        let values: Vec<_> = index.unique_values().cloned().collect();
        assert_eq!(values, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    }

    #[test]
    fn test_snapshot_restore() {
        let index = populated();
        let snapshot = index.snapshot();
        let mut other = field_index();
        other.restore(snapshot).unwrap();
        assert_eq!(other.apply_eq(&Value::from("field1")).unwrap().into_set(), ids(&[1]));
        assert_eq!(other.document_repr(DocId(3)), Some("'field3'".to_string()));

        other.reset();
        assert_eq!(other.docids_count(), 0);
        let wrong = IndexSnapshot::Keyword(Default::default());
        assert!(other.restore(wrong).is_err());
    }
}
