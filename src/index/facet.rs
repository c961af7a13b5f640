use std::any::Any;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{DocId, Document, Value};
use crate::index::keyword::{KeywordData, SetOperator, DEFAULT_TREE_THRESHOLD};
use crate::index::{kind_mismatch, CatalogIndex, Discriminator, IndexKind, IndexSnapshot};
use crate::sets::{DocSet, Results};

const SEPARATOR: char = ':';

/// Every prefix path of a facet: `"a:b:c"` gives `a`, `a:b`, `a:b:c`.
fn prefixes(facet: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut path = String::new();
    for (i, segment) in facet.split(SEPARATOR).enumerate() {
        if i > 0 {
            path.push(SEPARATOR);
        }
        path.push_str(segment);
        out.push(path.clone());
    }
    out
}

/// Keyword index over hierarchical facets. A document is indexed under
/// every registered taxonomy node that prefixes one of its facets.
#[derive(Debug, Clone)]
pub struct FacetIndex {
    discriminator: Discriminator,
    taxonomy: BTreeSet<String>,
    data: KeywordData,
}

impl FacetIndex {
    pub fn new<I, S>(discriminator: Discriminator, taxonomy: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let taxonomy: BTreeSet<String> = taxonomy.into_iter().map(Into::into).collect();
        if taxonomy.is_empty() {
            return Err(Error::new(ErrorKind::Configuration, "facet taxonomy must not be empty"));
        }
        if let Some(bad) = taxonomy.iter().find(|f| f.split(SEPARATOR).any(str::is_empty)) {
            return Err(Error::new(
                ErrorKind::Configuration,
                format!("facet {:?} has an empty path segment", bad),
            ));
        }
        Ok(FacetIndex {
            discriminator,
            taxonomy,
            data: KeywordData::with_threshold(DEFAULT_TREE_THRESHOLD),
        })
    }

    pub fn taxonomy(&self) -> &BTreeSet<String> {
        &self.taxonomy
    }

    pub fn index_facets<S: AsRef<str>>(&mut self, docid: DocId, facets: &[S]) {
        let nodes: BTreeSet<Value> = facets
            .iter()
            .flat_map(|facet| prefixes(facet.as_ref()))
            .filter(|path| self.taxonomy.contains(path))
            .map(Value::Text)
            .collect();
        self.data.insert(docid, nodes);
    }

    pub fn facets_of(&self, docid: DocId) -> Vec<&str> {
        self.data
            .reverse
            .get(&docid)
            .map(|nodes| nodes.iter().filter_map(Value::as_text).collect())
            .unwrap_or_default()
    }

    pub fn search<S: AsRef<str>>(&self, facets: &[S], operator: SetOperator) -> DocSet {
        let words: Vec<Value> = facets.iter().map(|f| Value::from(f.as_ref())).collect();
        self.data.search(&words, operator)
    }

    /// Per-facet document counts over `docids`, leaving out each facet in
    /// `omit_facets` together with its ancestors. Facets with no documents
    /// are absent from the map.
    pub fn counts<S: AsRef<str>>(&self, docids: &DocSet, omit_facets: &[S]) -> BTreeMap<String, usize> {
        let omitted: BTreeSet<String> = omit_facets.iter().flat_map(|f| prefixes(f.as_ref())).collect();
        let include: BTreeSet<&String> = self.taxonomy.difference(&omitted).collect();

        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        // Documents often share a facet set; intersect each distinct set once
        let mut memo: HashMap<BTreeSet<String>, Vec<String>> = HashMap::new();

        for docid in docids {
            let Some(available) = self.data.reverse.get(docid) else {
                continue;
            };
            let key: BTreeSet<String> = available.iter().filter_map(Value::as_text).map(str::to_string).collect();
            let appropriate = memo
                .entry(key)
                .or_insert_with_key(|key| key.iter().filter(|f| include.contains(f)).cloned().collect());
            for facet in appropriate.iter() {
                *counts.entry(facet.clone()).or_insert(0) += 1;
            }
        }
        counts
    }
}

impl CatalogIndex for FacetIndex {
    fn kind(&self) -> IndexKind {
        IndexKind::Facet
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
            Some(Value::List(items)) => {
                let mut facets = Vec::with_capacity(items.len());
                for item in &items {
                    match item.as_text() {
                        Some(facet) => facets.push(facet),
                        None => {
                            return Err(Error::invalid_argument(format!("facet must be a string, got {}", item)));
                        }
                    }
                }
                self.index_facets(docid, &facets);
            }
            Some(other) => {
                return Err(Error::invalid_argument(format!(
                    "facet index value must be a list of facets, got {}",
                    other
                )));
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
        Ok(Results::Set(self.data.search(&words, SetOperator::And)))
    }

    fn apply_eq(&self, value: &Value) -> Result<Results> {
        Ok(Results::Set(self.data.search(std::slice::from_ref(value), SetOperator::And)))
    }

    fn apply_any(&self, values: &[Value]) -> Result<Results> {
        Ok(Results::Set(self.data.search(values, SetOperator::Or)))
    }

    fn apply_all(&self, values: &[Value]) -> Result<Results> {
        Ok(Results::Set(self.data.search(values, SetOperator::And)))
    }

    fn snapshot(&self) -> IndexSnapshot {
        IndexSnapshot::Facet(self.data.clone())
    }

    fn restore(&mut self, snapshot: IndexSnapshot) -> Result<()> {
        match snapshot {
            IndexSnapshot::Facet(data) => {
                self.data = data;
                Ok(())
            }
            other => Err(kind_mismatch(IndexKind::Facet, other.kind())),
        }
    }
}
