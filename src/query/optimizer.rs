use std::collections::HashMap;

use tracing::trace;

use crate::query::ast::{Comparison, Query, RangeTerm, Term};

/// Trait for query rewrite rules. A rule returns `None` when it does not
/// apply to the node.
pub trait OptimizationRule: Send + Sync {
    fn name(&self) -> &str;
    fn optimize(&self, query: Query) -> Option<Query>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BoolKind {
    And,
    Or,
}

fn bool_parts(query: Query) -> Option<(BoolKind, Vec<Query>)> {
    match query {
        Query::And(children) => Some((BoolKind::And, children)),
        Query::Or(children) => Some((BoolKind::Or, children)),
        _ => None,
    }
}

fn rebuild(kind: BoolKind, children: Vec<Query>) -> Query {
    match kind {
        BoolKind::And => Query::and(children),
        BoolKind::Or => Query::or(children),
    }
}

/// Rule: lift children of the same boolean kind into their parent.
pub struct FlattenRule;

impl OptimizationRule for FlattenRule {
    fn name(&self) -> &str {
        "flatten"
    }

    fn optimize(&self, query: Query) -> Option<Query> {
        let (kind, children) = bool_parts(query)?;
        let nested = children.iter().any(|child| match kind {
            BoolKind::And => matches!(child, Query::And(_)),
            BoolKind::Or => matches!(child, Query::Or(_)),
        });
        nested.then(|| rebuild(kind, children))
    }
}

/// Rule: repeated `Eq`/`NotEq` on one index become a single set comparator.
///
/// Under `Or`, `Eq` runs become `Any` and `NotEq` runs become `NotAll`;
/// under `And`, `Eq` runs become `All` and `NotEq` runs become `NotAny`.
pub struct GroupAnyAllRule;

impl OptimizationRule for GroupAnyAllRule {
    fn name(&self) -> &str {
        "group_any_all"
    }

    fn optimize(&self, query: Query) -> Option<Query> {
        let (kind, children) = bool_parts(query)?;

        // (index, negated) -> positions of the matching comparators
        let mut groups: HashMap<(String, bool), Vec<usize>> = HashMap::new();
        for (pos, child) in children.iter().enumerate() {
            if let Query::Comparator { index, comparison } = child {
                match comparison {
                    Comparison::Eq(_) => groups.entry((index.clone(), false)).or_default().push(pos),
                    Comparison::NotEq(_) => groups.entry((index.clone(), true)).or_default().push(pos),
                    _ => {}
                }
            }
        }
        if groups.values().all(|positions| positions.len() < 2) {
            return None;
        }

        let mut slots: Vec<Option<Query>> = children.into_iter().map(Some).collect();
        for ((index, negated), positions) in groups {
            if positions.len() < 2 {
                continue;
            }
            let mut values = Vec::with_capacity(positions.len());
            for &pos in &positions {
                if let Some(Query::Comparator {
                    comparison: Comparison::Eq(term) | Comparison::NotEq(term),
                    ..
                }) = slots[pos].take()
                {
                    values.push(term);
                }
            }
            let list = Term::List(values);
            let grouped = match (kind, negated) {
                (BoolKind::Or, false) => Query::any(&index, list),
                (BoolKind::And, false) => Query::all(&index, list),
                (BoolKind::And, true) => Query::not_any(&index, list),
                (BoolKind::Or, true) => Query::not_all(&index, list),
            };
            slots[positions[0]] = Some(grouped);
        }
        Some(rebuild(kind, slots.into_iter().flatten().collect()))
    }
}

#[derive(Clone)]
struct Bound {
    pos: usize,
    value: Term,
    inclusive: bool,
}

/// Rule: a lower and an upper bound on one index merge into a range.
///
/// Under `And` the pair becomes `InRange`; under `Or` the pair covers the
/// outside of the interval and becomes `NotInRange`. The merged node takes
/// the position of whichever bound came first.
pub struct RangeMergeRule;

impl OptimizationRule for RangeMergeRule {
    fn name(&self) -> &str {
        "range_merge"
    }

    fn optimize(&self, query: Query) -> Option<Query> {
        let (kind, children) = bool_parts(query)?;

        let mut lowers: HashMap<String, Bound> = HashMap::new();
        let mut uppers: HashMap<String, Bound> = HashMap::new();
        let mut merges: Vec<(String, Bound, Bound)> = Vec::new();

        for (pos, child) in children.iter().enumerate() {
            let Query::Comparator { index, comparison } = child else {
                continue;
            };
            let (is_lower, value, inclusive) = match comparison {
                Comparison::Gt(t) => (true, t, false),
                Comparison::Ge(t) => (true, t, true),
                Comparison::Lt(t) => (false, t, false),
                Comparison::Le(t) => (false, t, true),
                _ => continue,
            };
            let bound = Bound { pos, value: value.clone(), inclusive };
            let (own, other) = if is_lower { (&mut lowers, &mut uppers) } else { (&mut uppers, &mut lowers) };
            match other.remove(index) {
                Some(partner) => {
                    let (lower, upper) = if is_lower { (bound, partner) } else { (partner, bound) };
                    merges.push((index.clone(), lower, upper));
                }
                None => {
                    own.entry(index.clone()).or_insert(bound);
                }
            }
        }
        if merges.is_empty() {
            return None;
        }

        let mut slots: Vec<Option<Query>> = children.into_iter().map(Some).collect();
        for (index, lower, upper) in merges {
            let first = lower.pos.min(upper.pos);
            slots[lower.pos] = None;
            slots[upper.pos] = None;
            let comparison = match kind {
                BoolKind::And => Comparison::InRange(RangeTerm {
                    start: lower.value,
                    end: upper.value,
                    start_exclusive: !lower.inclusive,
                    end_exclusive: !upper.inclusive,
                }),
                // a < s or a > e  ==  not(s <= a <= e)
                BoolKind::Or => Comparison::NotInRange(RangeTerm {
                    start: upper.value,
                    end: lower.value,
                    start_exclusive: upper.inclusive,
                    end_exclusive: lower.inclusive,
                }),
            };
            slots[first] = Some(Query::Comparator { index, comparison });
        }
        Some(rebuild(kind, slots.into_iter().flatten().collect()))
    }
}

/// Rule: a boolean node with a single child is that child.
pub struct UnwrapSingleRule;

impl OptimizationRule for UnwrapSingleRule {
    fn name(&self) -> &str {
        "unwrap_single"
    }

    fn optimize(&self, query: Query) -> Option<Query> {
        let (_, mut children) = bool_parts(query)?;
        if children.len() == 1 { children.pop() } else { None }
    }
}

/// Query optimizer. Children are optimized before their parent; `Not`
/// nodes are pushed into their operand before anything else.
pub struct QueryOptimizer {
    pub rules: Vec<Box<dyn OptimizationRule>>,
}

impl Default for QueryOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryOptimizer {
    pub fn new() -> Self {
        QueryOptimizer {
            rules: vec![
                Box::new(FlattenRule),
                Box::new(GroupAnyAllRule),
                Box::new(RangeMergeRule),
                Box::new(UnwrapSingleRule),
            ],
        }
    }

    pub fn optimize(&self, query: Query) -> Query {
        let query = match query {
            Query::Not(inner) => return self.optimize(inner.negate()),
            Query::And(children) => Query::And(children.into_iter().map(|c| self.optimize(c)).collect()),
            Query::Or(children) => Query::Or(children.into_iter().map(|c| self.optimize(c)).collect()),
            Query::Difference(left, right) => Query::difference(self.optimize(*left), self.optimize(*right)),
            comparator @ Query::Comparator { .. } => return comparator,
        };

        let mut optimized = query;
        for rule in &self.rules {
            if let Some(rewritten) = rule.optimize(optimized.clone()) {
                trace!(rule = rule.name(), "rewrote query");
                optimized = rewritten;
            }
        }
        optimized
    }
}
