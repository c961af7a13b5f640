use tracing::debug;

use crate::catalog::catalog::Catalog;
use crate::catalog::results::ResultSet;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{DocId, Value};
use crate::index::SortType;
use crate::query::{parse_query, Names, Query};
use crate::sets::ops::weighted_intersection;
use crate::sets::Results;

/// Sorting, limiting and name bindings for a catalog query.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub sort_index: Option<String>,
    pub limit: Option<usize>,
    pub sort_type: Option<SortType>,
    pub reverse: bool,
    pub names: Names,
    /// For [`CatalogQuery::search`]: apply indexes in this order, each
    /// intersecting with the results so far.
    pub index_query_order: Option<Vec<String>>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sort_by(mut self, index: &str) -> Self {
        self.sort_index = Some(index.to_string());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn sort_type(mut self, sort_type: SortType) -> Self {
        self.sort_type = Some(sort_type);
        self
    }

    pub fn reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    pub fn bind(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.names.insert(name.to_string(), value.into());
        self
    }

    pub fn index_query_order<I, S>(mut self, order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.index_query_order = Some(order.into_iter().map(Into::into).collect());
        self
    }
}

/// A query given either as a built tree or as query-language text.
#[derive(Debug, Clone, Copy)]
pub enum QuerySource<'a> {
    Text(&'a str),
    Tree(&'a Query),
}

impl<'a> From<&'a str> for QuerySource<'a> {
    fn from(text: &'a str) -> Self {
        QuerySource::Text(text)
    }
}

impl<'a> From<&'a String> for QuerySource<'a> {
    fn from(text: &'a String) -> Self {
        QuerySource::Text(text)
    }
}

impl<'a> From<&'a Query> for QuerySource<'a> {
    fn from(query: &'a Query) -> Self {
        QuerySource::Tree(query)
    }
}

/// Query entry point over a catalog. Every method returns the number of
/// matches (capped at the limit when sorting) with the docids in order.
pub struct CatalogQuery<'a> {
    catalog: &'a Catalog,
}

impl<'a> CatalogQuery<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        CatalogQuery { catalog }
    }

    pub fn query<'q>(&self, source: impl Into<QuerySource<'q>>, options: &QueryOptions) -> Result<(usize, Vec<DocId>)> {
        let results = self.evaluate(source.into(), options)?;
        self.sort(&results, options)
    }

    /// Like [`CatalogQuery::query`], keeping relevance weights.
    pub fn results<'q>(&self, source: impl Into<QuerySource<'q>>, options: &QueryOptions) -> Result<ResultSet> {
        let results = self.evaluate(source.into(), options)?;
        let (numids, ids) = self.sort(&results, options)?;
        let weights = match results {
            Results::Weighted(weights) => Some(weights),
            Results::Set(_) => None,
        };
        Ok(ResultSet::new(ids, numids, weights))
    }

    fn evaluate(&self, source: QuerySource<'_>, options: &QueryOptions) -> Result<Results> {
        match source {
            QuerySource::Tree(query) => query.apply(self.catalog, &options.names),
            QuerySource::Text(text) => {
                let query = parse_query(text)?;
                if let Some(missing) = query.index_names().into_iter().find(|name| !self.catalog.contains(name)) {
                    return Err(Error::new(ErrorKind::UnknownIndex, format!("No such index {}", missing)));
                }
                debug!(query = %query, "parsed catalog query");
                query.apply(self.catalog, &options.names)
            }
        }
    }

    /// Keyword-style search: every `(index, value)` pair is applied with
    /// the index's own `apply` and the results are intersected.
    pub fn search(&self, terms: &[(&str, Value)], options: &QueryOptions) -> Result<(usize, Vec<DocId>)> {
        let result = match &options.index_query_order {
            None => self.search_unordered(terms)?,
            Some(order) => self.search_ordered(terms, order)?,
        };
        match result {
            Some(result) if !result.is_empty() => self.sort(&result, options),
            _ => Ok((0, Vec::new())),
        }
    }

    fn search_unordered(&self, terms: &[(&str, Value)]) -> Result<Option<Results>> {
        let mut results = Vec::with_capacity(terms.len());
        for (name, value) in terms {
            let found = self.catalog.get(name)?.apply(value)?;
            if found.is_empty() {
                return Ok(None);
            }
            results.push(found);
        }
        // smallest first keeps the running intersection small
        results.sort_by_key(Results::len);
        let mut results = results.into_iter();
        let Some(first) = results.next() else {
            return Ok(None);
        };
        Ok(Some(results.fold(first, |acc, r| weighted_intersection(acc, 1.0, r, 1.0))))
    }

    fn search_ordered(&self, terms: &[(&str, Value)], order: &[String]) -> Result<Option<Results>> {
        let mut result: Option<Results> = None;
        for name in order {
            let Some((_, value)) = terms.iter().find(|(term, _)| *term == name.as_str()) else {
                continue;
            };
            let found = self.catalog.get(name)?.apply_intersect(value, result.as_ref())?;
            if found.is_empty() {
                return Ok(None);
            }
            result = Some(found);
        }
        Ok(result)
    }

    /// Order `results` by the sort index in `options`. Without a sort
    /// index the ids come back in docid order and unlimited.
    pub fn sort(&self, results: &Results, options: &QueryOptions) -> Result<(usize, Vec<DocId>)> {
        let numdocs = results.len();
        let Some(sort_index) = &options.sort_index else {
            return Ok((numdocs, results.ids()));
        };
        let index = self.catalog.get(sort_index)?;
        let sorted = index.sort(results, options.reverse, options.limit, options.sort_type)?;
        let numdocs = match options.limit {
            Some(limit) => numdocs.min(limit),
            None => numdocs,
        };
        Ok((numdocs, sorted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Document;
    use crate::index::keyword::Normalizer;
    use crate::index::Discriminator;

    fn docids(list: &[i64]) -> Vec<DocId> {
        list.iter().map(|&i| DocId(i)).collect()
    }

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.add_field_index("price", Discriminator::attribute("price").unwrap()).unwrap();
        catalog.add_field_index("kind", Discriminator::attribute("kind").unwrap()).unwrap();
        catalog
            .add_keyword_index("tags", Discriminator::attribute("tags").unwrap(), Normalizer::Identity)
            .unwrap();
        catalog.add_text_index("text", Discriminator::attribute("text").unwrap()).unwrap();
        let docs = [
            (1, 50, "book", vec!["new"], "rust systems programming"),
            (2, 20, "book", vec!["used"], "gardening for beginners"),
            (3, 80, "video", vec!["new"], "rust tutorial video on programming"),
            (4, 10, "book", vec!["new", "sale"], "cooking basics"),
        ];
        for (docid, price, kind, tags, text) in docs {
            let doc = Document::new()
                .with_field("price", price)
                .with_field("kind", kind)
                .with_field("tags", tags)
                .with_field("text", text);
            catalog.index_doc(DocId(docid), &doc).unwrap();
        }
        catalog
    }

    #[test]
    fn test_text_query_with_sort() {
        let catalog = catalog();
        let q = CatalogQuery::new(&catalog);
        let options = QueryOptions::new().sort_by("price");
        assert_eq!(q.query("kind == 'book'", &options).unwrap(), (3, docids(&[4, 2, 1])));

        let options = QueryOptions::new().sort_by("price").reverse(true).limit(2);
        assert_eq!(q.query("tags == 'new'", &options).unwrap(), (2, docids(&[3, 1])));

        let options = QueryOptions::new();
        assert_eq!(q.query("20 <= price < 80", &options).unwrap(), (2, docids(&[1, 2])));
    }

    #[test]
    fn test_query_tree_and_names() {
        let catalog = catalog();
        let q = CatalogQuery::new(&catalog);
        let tree = Query::eq("kind", "book") & Query::gt("price", crate::query::Term::name("floor"));
        let options = QueryOptions::new().bind("floor", 15).sort_by("price");
        assert_eq!(q.query(&tree, &options).unwrap(), (2, docids(&[2, 1])));

        let err = q.query(&tree, &QueryOptions::new()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnboundName);
        let err = q.query("colour == 'red'", &QueryOptions::new()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownIndex);
        let err = q.query("colour = 'red'", &QueryOptions::new()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Parse);
    }

    #[test]
    fn test_relevance_results() {
        let catalog = catalog();
        let q = CatalogQuery::new(&catalog);
        let results = q.results("'rust' in text", &QueryOptions::new().sort_by("text")).unwrap();
        assert_eq!(results.numids, 2);
        let mut ids = results.ids.clone();
        ids.sort();
        assert_eq!(ids, docids(&[1, 3]));
        let best = results.ids[0];
        assert!(results.score(best).unwrap() >= results.score(results.ids[1]).unwrap());
    }

    #[test]
    fn test_legacy_search() {
        let catalog = catalog();
        let q = CatalogQuery::new(&catalog);
        let terms = [("kind", Value::from("book")), ("tags", Value::from(vec!["new"]))];
        let options = QueryOptions::new().sort_by("price");
        assert_eq!(q.search(&terms, &options).unwrap(), (2, docids(&[4, 1])));

        let ordered = options.clone().index_query_order(["tags", "kind"]);
        assert_eq!(q.search(&terms, &ordered).unwrap(), (2, docids(&[4, 1])));

        let nothing = [("kind", Value::from("vinyl")), ("missing", Value::Int(1))];
        assert_eq!(q.search(&nothing, &options).unwrap(), (0, Vec::new()));
        let unknown = [("missing", Value::Int(1))];
        assert_eq!(q.search(&unknown, &options).unwrap_err().kind, ErrorKind::UnknownIndex);
        assert_eq!(q.search(&[], &options).unwrap(), (0, Vec::new()));
    }

    #[test]
    fn test_sort_errors() {
        let catalog = catalog();
        let q = CatalogQuery::new(&catalog);
        let bad = QueryOptions::new().sort_by("price").limit(0);
        assert!(q.query("kind == 'book'", &bad).is_err());
        let fwscan_reverse = QueryOptions::new().sort_by("price").reverse(true).sort_type(SortType::ForwardScan);
        assert!(q.query("kind == 'book'", &fwscan_reverse).is_err());
        let unknown = QueryOptions::new().sort_by("nope");
        assert_eq!(q.query("kind == 'book'", &unknown).unwrap_err().kind, ErrorKind::UnknownIndex);
    }
}
