use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::DocId;
use crate::index::{CatalogIndex, SortType};
use crate::sets::{Results, Weighted};

/// Ordered query results.
///
/// `numids` is the number of matches before any limit was applied, so it
/// may exceed `ids.len()`. `weights` is present when the results came from
/// a relevance-ranked index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub ids: Vec<DocId>,
    pub numids: usize,
    pub weights: Option<Weighted>,
}

impl ResultSet {
    pub fn new(ids: Vec<DocId>, numids: usize, weights: Option<Weighted>) -> Self {
        ResultSet { ids, numids, weights }
    }

    /// Results in docid order, unlimited.
    pub fn from_results(results: Results) -> Self {
        let ids = results.ids();
        let numids = ids.len();
        let weights = match results {
            Results::Weighted(weights) => Some(weights),
            Results::Set(_) => None,
        };
        ResultSet { ids, numids, weights }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DocId> {
        self.ids.iter()
    }

    pub fn all(&self) -> &[DocId] {
        &self.ids
    }

    pub fn first(&self) -> Option<DocId> {
        self.ids.first().copied()
    }

    /// The single result. Zero or several results are errors carrying the
    /// ids that were found.
    pub fn one(&self) -> Result<DocId> {
        match self.ids.as_slice() {
            [docid] => Ok(*docid),
            [] => Err(Error::with_results(ErrorKind::NoResults, "no results", Vec::new())),
            many => Err(Error::with_results(
                ErrorKind::MultipleResults,
                format!("{} results", many.len()),
                many.to_vec(),
            )),
        }
    }

    pub fn score(&self, docid: DocId) -> Option<f64> {
        self.weights.as_ref().and_then(|weights| weights.get(&docid).copied())
    }

    fn to_results(&self) -> Results {
        match &self.weights {
            Some(weights) => Results::Weighted(
                self.ids
                    .iter()
                    .filter_map(|docid| weights.get(docid).map(|w| (*docid, *w)))
                    .collect(),
            ),
            None => Results::Set(self.ids.iter().copied().collect()),
        }
    }

    /// Reorder these results by `index`.
    pub fn sort(
        &self,
        index: &dyn CatalogIndex,
        reverse: bool,
        limit: Option<usize>,
        sort_type: Option<SortType>,
    ) -> Result<ResultSet> {
        let ids = index.sort(&self.to_results(), reverse, limit, sort_type)?;
        let numids = match limit {
            Some(limit) => self.numids.min(limit),
            None => self.numids,
        };
        Ok(ResultSet {
            ids,
            numids,
            weights: self.weights.clone(),
        })
    }
}

impl IntoIterator for ResultSet {
    type Item = DocId;
    type IntoIter = std::vec::IntoIter<DocId>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.into_iter()
    }
}
