use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::ops::{BitAnd, BitOr, Not, Sub};

use crate::catalog::Catalog;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::Value;
use crate::index::{CatalogIndex, RangeQuery};
use crate::sets::ops::{difference, weighted_intersection, weighted_union};
use crate::sets::Results;

/// Values bound to the free names of a query at execution time.
pub type Names = HashMap<String, Value>;

/// Operand of a comparator: a literal, a name resolved at execution time,
/// or a list of either.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Literal(Value),
    Name(String),
    List(Vec<Term>),
}

impl Term {
    pub fn name(name: &str) -> Self {
        Term::Name(name.to_string())
    }

    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Term>,
    {
        Term::List(items.into_iter().map(Into::into).collect())
    }

    pub fn resolve(&self, names: &Names) -> Result<Value> {
        match self {
            Term::Literal(value) => Ok(value.clone()),
            Term::Name(name) => names
                .get(name)
                .cloned()
                .ok_or_else(|| Error::new(ErrorKind::UnboundName, format!("name '{}' is not defined", name))),
            Term::List(items) => {
                let values = items.iter().map(|item| item.resolve(names)).collect::<Result<Vec<_>>>()?;
                Ok(Value::List(values))
            }
        }
    }
}

impl From<Value> for Term {
    fn from(value: Value) -> Self {
        Term::Literal(value)
    }
}

impl From<i64> for Term {
    fn from(v: i64) -> Self {
        Term::Literal(Value::Int(v))
    }
}

impl From<i32> for Term {
    fn from(v: i32) -> Self {
        Term::Literal(Value::from(v))
    }
}

impl From<f64> for Term {
    fn from(v: f64) -> Self {
        Term::Literal(Value::Float(v))
    }
}

impl From<bool> for Term {
    fn from(v: bool) -> Self {
        Term::Literal(Value::Bool(v))
    }
}

impl From<&str> for Term {
    fn from(v: &str) -> Self {
        Term::Literal(Value::from(v))
    }
}

impl From<String> for Term {
    fn from(v: String) -> Self {
        Term::Literal(Value::Text(v))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Term::Literal(value) => write!(f, "{}", value),
            Term::Name(name) => write!(f, "{}", name),
            Term::List(items) => {
                let items: Vec<String> = items.iter().map(Term::to_string).collect();
                write!(f, "[{}]", items.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeTerm {
    pub start: Term,
    pub end: Term,
    pub start_exclusive: bool,
    pub end_exclusive: bool,
}

impl RangeTerm {
    fn resolve(&self, names: &Names) -> Result<RangeQuery> {
        Ok(RangeQuery::new(
            Some(self.start.resolve(names)?),
            Some(self.end.resolve(names)?),
            self.start_exclusive,
            self.end_exclusive,
        ))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Comparison {
    Eq(Term),
    NotEq(Term),
    Gt(Term),
    Ge(Term),
    Lt(Term),
    Le(Term),
    Contains(Term),
    NotContains(Term),
    Any(Term),
    NotAny(Term),
    All(Term),
    NotAll(Term),
    InRange(RangeTerm),
    NotInRange(RangeTerm),
}

impl Comparison {
    pub fn negate(&self) -> Comparison {
        match self.clone() {
            Comparison::Eq(t) => Comparison::NotEq(t),
            Comparison::NotEq(t) => Comparison::Eq(t),
            Comparison::Gt(t) => Comparison::Le(t),
            Comparison::Ge(t) => Comparison::Lt(t),
            Comparison::Lt(t) => Comparison::Ge(t),
            Comparison::Le(t) => Comparison::Gt(t),
            Comparison::Contains(t) => Comparison::NotContains(t),
            Comparison::NotContains(t) => Comparison::Contains(t),
            Comparison::Any(t) => Comparison::NotAny(t),
            Comparison::NotAny(t) => Comparison::Any(t),
            Comparison::All(t) => Comparison::NotAll(t),
            Comparison::NotAll(t) => Comparison::All(t),
            Comparison::InRange(r) => Comparison::NotInRange(r),
            Comparison::NotInRange(r) => Comparison::InRange(r),
        }
    }

    fn apply(&self, index: &dyn CatalogIndex, names: &Names) -> Result<Results> {
        match self {
            Comparison::Eq(t) => index.apply_eq(&t.resolve(names)?),
            Comparison::NotEq(t) => index.apply_not_eq(&t.resolve(names)?),
            Comparison::Gt(t) => index.apply_gt(&t.resolve(names)?),
            Comparison::Ge(t) => index.apply_ge(&t.resolve(names)?),
            Comparison::Lt(t) => index.apply_lt(&t.resolve(names)?),
            Comparison::Le(t) => index.apply_le(&t.resolve(names)?),
            Comparison::Contains(t) => index.apply_contains(&t.resolve(names)?),
            Comparison::NotContains(t) => index.apply_not_contains(&t.resolve(names)?),
            Comparison::Any(t) => index.apply_any(&t.resolve(names)?.into_items()),
            Comparison::NotAny(t) => index.apply_not_any(&t.resolve(names)?.into_items()),
            Comparison::All(t) => index.apply_all(&t.resolve(names)?.into_items()),
            Comparison::NotAll(t) => index.apply_not_all(&t.resolve(names)?.into_items()),
            Comparison::InRange(r) => index.apply_in_range(&r.resolve(names)?),
            Comparison::NotInRange(r) => index.apply_not_in_range(&r.resolve(names)?),
        }
    }
}

/// A query tree. Nodes hold no results; a tree is evaluated afresh on
/// every [`Query::apply`].
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Comparator { index: String, comparison: Comparison },
    And(Vec<Query>),
    Or(Vec<Query>),
    Not(Box<Query>),
    Difference(Box<Query>, Box<Query>),
}

fn comparator(index: &str, comparison: Comparison) -> Query {
    Query::Comparator {
        index: index.to_string(),
        comparison,
    }
}

impl Query {
    pub fn eq(index: &str, value: impl Into<Term>) -> Self {
        comparator(index, Comparison::Eq(value.into()))
    }

    pub fn not_eq(index: &str, value: impl Into<Term>) -> Self {
        comparator(index, Comparison::NotEq(value.into()))
    }

    pub fn gt(index: &str, value: impl Into<Term>) -> Self {
        comparator(index, Comparison::Gt(value.into()))
    }

    pub fn ge(index: &str, value: impl Into<Term>) -> Self {
        comparator(index, Comparison::Ge(value.into()))
    }

    pub fn lt(index: &str, value: impl Into<Term>) -> Self {
        comparator(index, Comparison::Lt(value.into()))
    }

    pub fn le(index: &str, value: impl Into<Term>) -> Self {
        comparator(index, Comparison::Le(value.into()))
    }

    pub fn contains(index: &str, value: impl Into<Term>) -> Self {
        comparator(index, Comparison::Contains(value.into()))
    }

    pub fn not_contains(index: &str, value: impl Into<Term>) -> Self {
        comparator(index, Comparison::NotContains(value.into()))
    }

    pub fn any(index: &str, values: impl Into<Term>) -> Self {
        comparator(index, Comparison::Any(values.into()))
    }

    pub fn not_any(index: &str, values: impl Into<Term>) -> Self {
        comparator(index, Comparison::NotAny(values.into()))
    }

    pub fn all(index: &str, values: impl Into<Term>) -> Self {
        comparator(index, Comparison::All(values.into()))
    }

    pub fn not_all(index: &str, values: impl Into<Term>) -> Self {
        comparator(index, Comparison::NotAll(values.into()))
    }

    pub fn in_range(
        index: &str,
        start: impl Into<Term>,
        end: impl Into<Term>,
        start_exclusive: bool,
        end_exclusive: bool,
    ) -> Self {
        comparator(
            index,
            Comparison::InRange(RangeTerm {
                start: start.into(),
                end: end.into(),
                start_exclusive,
                end_exclusive,
            }),
        )
    }

    pub fn not_in_range(
        index: &str,
        start: impl Into<Term>,
        end: impl Into<Term>,
        start_exclusive: bool,
        end_exclusive: bool,
    ) -> Self {
        comparator(
            index,
            Comparison::NotInRange(RangeTerm {
                start: start.into(),
                end: end.into(),
                start_exclusive,
                end_exclusive,
            }),
        )
    }

    /// Intersection; nested `And` children are flattened into this node.
    pub fn and(queries: Vec<Query>) -> Self {
        let mut flat = Vec::with_capacity(queries.len());
        for query in queries {
            match query {
                Query::And(children) => flat.extend(children),
                other => flat.push(other),
            }
        }
        Query::And(flat)
    }

    /// Union; nested `Or` children are flattened into this node.
    pub fn or(queries: Vec<Query>) -> Self {
        let mut flat = Vec::with_capacity(queries.len());
        for query in queries {
            match query {
                Query::Or(children) => flat.extend(children),
                other => flat.push(other),
            }
        }
        Query::Or(flat)
    }

    pub fn negated(query: Query) -> Self {
        Query::Not(Box::new(query))
    }

    pub fn difference(left: Query, right: Query) -> Self {
        Query::Difference(Box::new(left), Box::new(right))
    }

    pub fn is_bool_op(&self) -> bool {
        matches!(self, Query::And(_) | Query::Or(_) | Query::Difference(..))
    }

    /// The logical complement of this query.
    pub fn negate(&self) -> Query {
        match self {
            Query::Comparator { index, comparison } => comparator(index, comparison.negate()),
            Query::And(children) => Query::or(children.iter().map(Query::negate).collect()),
            Query::Or(children) => Query::and(children.iter().map(Query::negate).collect()),
            Query::Not(inner) => (**inner).clone(),
            Query::Difference(left, right) => Query::or(vec![left.negate(), (**right).clone()]),
        }
    }

    pub fn children(&self) -> Vec<&Query> {
        match self {
            Query::Comparator { .. } => Vec::new(),
            Query::And(children) | Query::Or(children) => children.iter().collect(),
            Query::Not(inner) => vec![inner.as_ref()],
            Query::Difference(left, right) => vec![left.as_ref(), right.as_ref()],
        }
    }

    /// Names of every index the query touches.
    pub fn index_names(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.collect_index_names(&mut out);
        out
    }

    fn collect_index_names<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        if let Query::Comparator { index, .. } = self {
            out.insert(index.as_str());
        }
        for child in self.children() {
            child.collect_index_names(out);
        }
    }

    pub fn apply(&self, catalog: &Catalog, names: &Names) -> Result<Results> {
        match self {
            Query::Comparator { index, comparison } => comparison.apply(catalog.get(index)?, names),
            Query::And(children) => {
                if children.is_empty() {
                    return Err(Error::invalid_argument("And requires at least one query"));
                }
                let mut result: Option<Results> = None;
                for child in children {
                    let next = child.apply(catalog, names)?;
                    let combined = match result {
                        None => next,
                        Some(acc) => weighted_intersection(acc, 1.0, next, 1.0),
                    };
                    if combined.is_empty() {
                        return Ok(combined);
                    }
                    result = Some(combined);
                }
                Ok(result.unwrap_or_default())
            }
            Query::Or(children) => {
                if children.is_empty() {
                    return Err(Error::invalid_argument("Or requires at least one query"));
                }
                let mut result = Results::empty();
                for child in children {
                    let next = child.apply(catalog, names)?;
                    if next.is_empty() {
                        continue;
                    }
                    result = if result.is_empty() { next } else { weighted_union(result, 1.0, next, 1.0) };
                }
                Ok(result)
            }
            Query::Not(inner) => inner.negate().apply(catalog, names),
            Query::Difference(left, right) => {
                let left = left.apply(catalog, names)?;
                if left.is_empty() {
                    return Ok(left);
                }
                let right = right.apply(catalog, names)?;
                Ok(difference(left, &right))
            }
        }
    }
}

fn write_child(f: &mut fmt::Formatter, query: &Query) -> fmt::Result {
    if query.is_bool_op() {
        write!(f, "({})", query)
    } else {
        write!(f, "{}", query)
    }
}

fn write_joined(f: &mut fmt::Formatter, children: &[Query], op: &str) -> fmt::Result {
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            write!(f, " {} ", op)?;
        }
        write_child(f, child)?;
    }
    Ok(())
}

fn write_range(f: &mut fmt::Formatter, index: &str, range: &RangeTerm) -> fmt::Result {
    let lower = if range.start_exclusive { "<" } else { "<=" };
    let upper = if range.end_exclusive { "<" } else { "<=" };
    write!(f, "{} {} {} {} {}", range.start, lower, index, upper, range.end)
}

/// Renders the query in the textual query language.
impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Query::Comparator { index, comparison } => match comparison {
                Comparison::Eq(t) => write!(f, "{} == {}", index, t),
                Comparison::NotEq(t) => write!(f, "{} != {}", index, t),
                Comparison::Gt(t) => write!(f, "{} > {}", index, t),
                Comparison::Ge(t) => write!(f, "{} >= {}", index, t),
                Comparison::Lt(t) => write!(f, "{} < {}", index, t),
                Comparison::Le(t) => write!(f, "{} <= {}", index, t),
                Comparison::Contains(t) => write!(f, "{} in {}", t, index),
                Comparison::NotContains(t) => write!(f, "{} not in {}", t, index),
                Comparison::Any(t) => write!(f, "{} in any({})", index, t),
                Comparison::NotAny(t) => write!(f, "{} not in any({})", index, t),
                Comparison::All(t) => write!(f, "{} in all({})", index, t),
                Comparison::NotAll(t) => write!(f, "{} not in all({})", index, t),
                Comparison::InRange(r) => write_range(f, index, r),
                Comparison::NotInRange(r) => {
                    write!(f, "not(")?;
                    write_range(f, index, r)?;
                    write!(f, ")")
                }
            },
            Query::And(children) => write_joined(f, children, "and"),
            Query::Or(children) => write_joined(f, children, "or"),
            Query::Not(inner) => write!(f, "not({})", inner),
            Query::Difference(left, right) => {
                write!(f, "({}) - ({})", left, right)
            }
        }
    }
}

impl BitAnd for Query {
    type Output = Query;

    fn bitand(self, rhs: Query) -> Query {
        Query::and(vec![self, rhs])
    }
}

impl BitOr for Query {
    type Output = Query;

    fn bitor(self, rhs: Query) -> Query {
        Query::or(vec![self, rhs])
    }
}

impl Sub for Query {
    type Output = Query;

    fn sub(self, rhs: Query) -> Query {
        Query::difference(self, rhs)
    }
}

impl Not for Query {
    type Output = Query;

    fn not(self) -> Query {
        Query::negated(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{DocId, Document};
    use crate::index::{Discriminator, FieldIndex, KeywordIndex};
    use crate::sets::DocSet;

    fn ids(list: &[i64]) -> DocSet {
        list.iter().map(|&i| DocId(i)).collect()
    }

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.add_index("a", Box::new(FieldIndex::new(Discriminator::attribute("a").unwrap()))).unwrap();
        catalog.add_index("tags", Box::new(KeywordIndex::new(Discriminator::attribute("tags").unwrap()))).unwrap();
        for i in 0..6 {
            let doc = Document::new()
                .with_field("a", i)
                .with_field("tags", if i % 2 == 0 { vec!["even"] } else { vec!["odd"] });
            catalog.index_doc(DocId(i), &doc).unwrap();
        }
        catalog
    }

    fn run(query: &Query) -> DocSet {
        query.apply(&catalog(), &Names::new()).unwrap().into_set()
    }

    #[test]
    fn test_negation_table() {
        let cases = [
            (Query::eq("a", 1), Query::not_eq("a", 1)),
            (Query::gt("a", 1), Query::le("a", 1)),
            (Query::lt("a", 1), Query::ge("a", 1)),
            (Query::ge("a", 1), Query::lt("a", 1)),
            (Query::le("a", 1), Query::gt("a", 1)),
            (Query::contains("a", 1), Query::not_contains("a", 1)),
            (Query::any("a", Term::list([1, 2])), Query::not_any("a", Term::list([1, 2]))),
            (Query::all("a", Term::list([1])), Query::not_all("a", Term::list([1]))),
            (Query::in_range("a", 0, 5, true, false), Query::not_in_range("a", 0, 5, true, false)),
        ];
        for (query, negated) in cases {
            assert_eq!(query.negate(), negated);
        }
        assert_eq!(Query::not_eq("a", 1).negate(), Query::eq("a", 1));

        let and = Query::eq("a", 1) & Query::eq("b", 2);
        assert_eq!(and.negate(), Query::or(vec![Query::not_eq("a", 1), Query::not_eq("b", 2)]));
        let not = !Query::eq("a", 1);
        assert_eq!(not.negate(), Query::eq("a", 1));
    }

    #[test]
    fn test_operators_flatten() {
        let q = Query::eq("a", 1) & Query::eq("a", 2) & Query::eq("a", 3);
        assert_eq!(q.children().len(), 3);
        let q = Query::eq("a", 1) | (Query::eq("a", 2) | Query::eq("a", 3));
        assert_eq!(q.children().len(), 3);
        let q = (Query::eq("a", 1) | Query::eq("a", 2)) & Query::eq("a", 3);
        assert_eq!(q.children().len(), 2);
    }

    #[test]
    fn test_display() {
        assert_eq!(Query::eq("index", "val").to_string(), "index == 'val'");
        assert_eq!(Query::not_eq("index", "val").to_string(), "index != 'val'");
        assert_eq!(Query::gt("index", "val").to_string(), "index > 'val'");
        assert_eq!(Query::contains("index", "val").to_string(), "'val' in index");
        assert_eq!(Query::not_contains("index", "val").to_string(), "'val' not in index");
        assert_eq!(Query::in_range("index", 0, 5, false, false).to_string(), "0 <= index <= 5");
        assert_eq!(Query::in_range("index", 0, 5, true, true).to_string(), "0 < index < 5");
        assert_eq!(Query::not_in_range("index", 0, 5, false, false).to_string(), "not(0 <= index <= 5)");
        assert_eq!(Query::any("a", Term::list([1, 2])).to_string(), "a in any([1, 2])");
        assert_eq!(Query::eq("a", Term::name("foo")).to_string(), "a == foo");
        let q = Query::eq("a", 1) | (Query::eq("b", 2) & Query::gt("c", 3));
        assert_eq!(q.to_string(), "a == 1 or (b == 2 and c > 3)");
        assert_eq!((Query::eq("a", 1) - Query::eq("b", 2)).to_string(), "(a == 1) - (b == 2)");
    }

    #[test]
    fn test_comparators_apply() {
        assert_eq!(run(&Query::eq("a", 2)), ids(&[2]));
        assert_eq!(run(&Query::not_eq("a", 2)), ids(&[0, 1, 3, 4, 5]));
        assert_eq!(run(&Query::gt("a", 3)), ids(&[4, 5]));
        assert_eq!(run(&Query::le("a", 1)), ids(&[0, 1]));
        assert_eq!(run(&Query::any("a", Term::list([1, 4, 9]))), ids(&[1, 4]));
        assert_eq!(run(&Query::in_range("a", 1, 3, false, true)), ids(&[1, 2]));
        assert_eq!(run(&Query::not_in_range("a", 1, 3, false, true)), ids(&[0, 3, 4, 5]));
        assert_eq!(run(&Query::all("tags", Term::list(["even"]))), ids(&[0, 2, 4]));
    }

    #[test]
    fn test_boolean_apply() {
        let q = Query::eq("tags", "even") & Query::gt("a", 1);
        assert_eq!(run(&q), ids(&[2, 4]));
        let q = Query::eq("a", 0) | Query::eq("a", 5) | Query::eq("a", 99);
        assert_eq!(run(&q), ids(&[0, 5]));
        let q = !(Query::eq("tags", "even") | Query::eq("a", 1));
        assert_eq!(run(&q), ids(&[3, 5]));
        let q = Query::eq("tags", "odd") - Query::lt("a", 3);
        assert_eq!(run(&q), ids(&[3, 5]));
        let q = Query::eq("a", 99) & Query::eq("missing", 1);
        // the empty left side means the unknown index is never consulted
        assert_eq!(run(&q), ids(&[]));
        assert!(Query::And(Vec::new()).apply(&catalog(), &Names::new()).is_err());
    }

    #[test]
    fn test_names() {
        let catalog = catalog();
        let q = Query::in_range("a", Term::name("lo"), Term::name("hi"), false, false);
        let mut names = Names::new();
        names.insert("lo".to_string(), Value::Int(2));
        assert_eq!(q.apply(&catalog, &names).unwrap_err().kind, ErrorKind::UnboundName);
        names.insert("hi".to_string(), Value::Int(3));
        assert_eq!(q.apply(&catalog, &names).unwrap().into_set(), ids(&[2, 3]));

        let q = Query::any("a", Term::name("choices"));
        names.insert("choices".to_string(), Value::from(vec![0, 5]));
        assert_eq!(q.apply(&catalog, &names).unwrap().into_set(), ids(&[0, 5]));
        let q = Query::any("a", Term::List(vec![Term::name("lo"), Term::from(4)]));
        assert_eq!(q.apply(&catalog, &names).unwrap().into_set(), ids(&[2, 4]));
    }

    #[test]
    fn test_unknown_index() {
        let err = Query::eq("nope", 1).apply(&catalog(), &Names::new()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownIndex);
        let q = Query::eq("a", 1) & Query::eq("b", 1);
        let names: Vec<&str> = q.index_names().into_iter().collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
