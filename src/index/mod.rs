pub mod discriminator;
pub mod facet;
pub mod field;
pub mod keyword;
pub mod sorting;
pub mod text;

use std::any::Any;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::error::{Error, Result};
use crate::core::types::{DocId, Document, Value};
use crate::sets::ops::{difference, weighted_intersection};
use crate::sets::{DocSet, Results};

pub use discriminator::Discriminator;
pub use facet::FacetIndex;
pub use field::FieldIndex;
pub use keyword::{KeywordIndex, SetOperator};
pub use sorting::SortType;
pub use text::TextIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexKind {
    Field,
    Keyword,
    Facet,
    Text,
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            IndexKind::Field => "FieldIndex",
            IndexKind::Keyword => "KeywordIndex",
            IndexKind::Facet => "FacetIndex",
            IndexKind::Text => "TextIndex",
        };
        write!(f, "{}", name)
    }
}

/// Bounds of a range query. A missing bound is open.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeQuery {
    pub start: Option<Value>,
    pub end: Option<Value>,
    pub start_exclusive: bool,
    pub end_exclusive: bool,
}

impl RangeQuery {
    pub fn new(start: Option<Value>, end: Option<Value>, start_exclusive: bool, end_exclusive: bool) -> Self {
        RangeQuery { start, end, start_exclusive, end_exclusive }
    }

    pub fn contains(&self, value: &Value) -> bool {
        let above = match &self.start {
            Some(s) if self.start_exclusive => value > s,
            Some(s) => value >= s,
            None => true,
        };
        let below = match &self.end {
            Some(e) if self.end_exclusive => value < e,
            Some(e) => value <= e,
            None => true,
        };
        above && below
    }
}

/// Persisted state of one index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IndexSnapshot {
    Field(field::FieldData),
    Keyword(keyword::KeywordData),
    Facet(keyword::KeywordData),
    Text(text::TextData),
}

impl IndexSnapshot {
    pub fn kind(&self) -> IndexKind {
        match self {
            IndexSnapshot::Field(_) => IndexKind::Field,
            IndexSnapshot::Keyword(_) => IndexKind::Keyword,
            IndexSnapshot::Facet(_) => IndexKind::Facet,
            IndexSnapshot::Text(_) => IndexKind::Text,
        }
    }
}

/// Operations every catalog index supports.
///
/// The comparator methods default to an "unsupported" error; each index
/// overrides the ones that make sense for it. The negated forms are derived
/// from the positive ones through [`CatalogIndex::negate`].
pub trait CatalogIndex: Send + Sync {
    fn kind(&self) -> IndexKind;

    fn discriminator(&self) -> &Discriminator;

    /// Access to the concrete index for kind-specific operations.
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn index_doc(&mut self, docid: DocId, document: &Document) -> Result<()>;

    /// Removing an unknown document is not an error.
    fn unindex_doc(&mut self, docid: DocId) -> Result<()>;

    fn reindex_doc(&mut self, docid: DocId, document: &Document) -> Result<()> {
        self.unindex_doc(docid)?;
        self.index_doc(docid, document)
    }

    fn reset(&mut self);

    /// Documents holding a value.
    fn indexed(&self) -> DocSet;

    /// Documents seen without a value.
    fn not_indexed(&self) -> &DocSet;

    fn indexed_count(&self) -> usize;

    fn not_indexed_count(&self) -> usize {
        self.not_indexed().len()
    }

    fn word_count(&self) -> usize;

    fn docids(&self) -> DocSet {
        let not_indexed = self.not_indexed();
        if not_indexed.is_empty() {
            return self.indexed();
        }
        let mut indexed = self.indexed();
        if indexed.is_empty() {
            return not_indexed.clone();
        }
        indexed.extend(not_indexed.iter().copied());
        indexed
    }

    fn docids_count(&self) -> usize {
        self.indexed_count() + self.not_indexed_count()
    }

    fn document_repr(&self, docid: DocId) -> Option<String>;

    /// Every known document except those in `positive`.
    fn negate(&self, positive: Results) -> Results {
        let all = Results::Set(self.docids());
        if positive.is_empty() {
            return all;
        }
        difference(all, &positive)
    }

    /// Index-specific query.
    fn apply(&self, query: &Value) -> Result<Results>;

    fn apply_intersect(&self, query: &Value, docids: Option<&Results>) -> Result<Results> {
        let result = self.apply(query)?;
        match docids {
            None => Ok(result),
            Some(docids) => Ok(weighted_intersection(result, 1.0, docids.clone(), 1.0)),
        }
    }

    fn sort(
        &self,
        _docids: &Results,
        _reverse: bool,
        _limit: Option<usize>,
        _sort_type: Option<SortType>,
    ) -> Result<Vec<DocId>> {
        Err(Error::unsupported("sort", &self.kind().to_string()))
    }

    fn apply_eq(&self, _value: &Value) -> Result<Results> {
        Err(Error::unsupported("Eq", &self.kind().to_string()))
    }

    fn apply_not_eq(&self, value: &Value) -> Result<Results> {
        Ok(self.negate(self.apply_eq(value)?))
    }

    fn apply_contains(&self, _value: &Value) -> Result<Results> {
        Err(Error::unsupported("Contains", &self.kind().to_string()))
    }

    fn apply_not_contains(&self, value: &Value) -> Result<Results> {
        Ok(self.negate(self.apply_contains(value)?))
    }

    fn apply_any(&self, _values: &[Value]) -> Result<Results> {
        Err(Error::unsupported("Any", &self.kind().to_string()))
    }

    fn apply_not_any(&self, values: &[Value]) -> Result<Results> {
        Ok(self.negate(self.apply_any(values)?))
    }

    fn apply_all(&self, _values: &[Value]) -> Result<Results> {
        Err(Error::unsupported("All", &self.kind().to_string()))
    }

    fn apply_not_all(&self, values: &[Value]) -> Result<Results> {
        Ok(self.negate(self.apply_all(values)?))
    }

    fn apply_in_range(&self, _range: &RangeQuery) -> Result<Results> {
        Err(Error::unsupported("InRange", &self.kind().to_string()))
    }

    fn apply_not_in_range(&self, range: &RangeQuery) -> Result<Results> {
        Ok(self.negate(self.apply_in_range(range)?))
    }

    fn apply_gt(&self, value: &Value) -> Result<Results> {
        self.apply_in_range(&RangeQuery::new(Some(value.clone()), None, true, false))
    }

    fn apply_ge(&self, value: &Value) -> Result<Results> {
        self.apply_in_range(&RangeQuery::new(Some(value.clone()), None, false, false))
    }

    fn apply_lt(&self, value: &Value) -> Result<Results> {
        self.apply_in_range(&RangeQuery::new(None, Some(value.clone()), false, true))
    }

    fn apply_le(&self, value: &Value) -> Result<Results> {
        self.apply_in_range(&RangeQuery::new(None, Some(value.clone()), false, false))
    }

    fn snapshot(&self) -> IndexSnapshot;

    fn restore(&mut self, snapshot: IndexSnapshot) -> Result<()>;
}

pub(crate) fn kind_mismatch(expected: IndexKind, found: IndexKind) -> Error {
    Error::new(
        crate::core::error::ErrorKind::InvalidState,
        format!("cannot restore {} data into a {}", found, expected),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_contains() {
        let range = RangeQuery::new(Some(Value::Int(1)), Some(Value::Int(5)), true, false);
        assert!(!range.contains(&Value::Int(1)));
        assert!(range.contains(&Value::Int(2)));
        assert!(range.contains(&Value::Int(5)));
        assert!(!range.contains(&Value::Int(6)));
        let open = RangeQuery::new(None, Some(Value::Int(0)), false, true);
        assert!(open.contains(&Value::Int(-100)));
        assert!(!open.contains(&Value::Int(0)));
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(IndexKind::Keyword.to_string(), "KeywordIndex");
    }
}
