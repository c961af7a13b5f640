use std::collections::{BTreeMap, BTreeSet};

use crate::core::types::DocId;

pub type DocSet = BTreeSet<DocId>;
pub type Weighted = BTreeMap<DocId, f64>;

/// Result of applying a query: either a plain id set or ids paired with
/// relevance weights (full-text results).
#[derive(Debug, Clone, PartialEq)]
pub enum Results {
    Set(DocSet),
    Weighted(Weighted),
}

impl Default for Results {
    fn default() -> Self {
        Results::Set(DocSet::new())
    }
}

impl Results {
    pub fn empty() -> Self {
        Results::default()
    }

    pub fn len(&self) -> usize {
        match self {
            Results::Set(s) => s.len(),
            Results::Weighted(w) => w.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, docid: &DocId) -> bool {
        match self {
            Results::Set(s) => s.contains(docid),
            Results::Weighted(w) => w.contains_key(docid),
        }
    }

    /// Ids in ascending order.
    pub fn ids(&self) -> Vec<DocId> {
        match self {
            Results::Set(s) => s.iter().copied().collect(),
            Results::Weighted(w) => w.keys().copied().collect(),
        }
    }

    pub fn to_set(&self) -> DocSet {
        match self {
            Results::Set(s) => s.clone(),
            Results::Weighted(w) => w.keys().copied().collect(),
        }
    }

    pub fn into_set(self) -> DocSet {
        match self {
            Results::Set(s) => s,
            Results::Weighted(w) => w.into_keys().collect(),
        }
    }

    pub fn weights(&self) -> Option<&Weighted> {
        match self {
            Results::Weighted(w) => Some(w),
            Results::Set(_) => None,
        }
    }
}

impl From<DocSet> for Results {
    fn from(set: DocSet) -> Self {
        Results::Set(set)
    }
}

impl From<Weighted> for Results {
    fn from(weights: Weighted) -> Self {
        Results::Weighted(weights)
    }
}

/// Union of two results. Two plain sets give a plain set; otherwise the
/// weights are summed, set members counting as weight 1, each side scaled
/// by its factor.
pub fn weighted_union(a: Results, wa: f64, b: Results, wb: f64) -> Results {
    match (a, b) {
        (Results::Set(mut x), Results::Set(y)) => {
            if x.len() < y.len() {
                let mut y = y;
                y.extend(x);
                return Results::Set(y);
            }
            x.extend(y);
            Results::Set(x)
        }
        (a, b) => {
            let mut out = Weighted::new();
            accumulate(&mut out, &a, wa);
            accumulate(&mut out, &b, wb);
            Results::Weighted(out)
        }
    }
}

fn accumulate(out: &mut Weighted, r: &Results, factor: f64) {
    match r {
        Results::Set(s) => {
            for d in s {
                *out.entry(*d).or_insert(0.0) += factor;
            }
        }
        Results::Weighted(w) => {
            for (d, v) in w {
                *out.entry(*d).or_insert(0.0) += v * factor;
            }
        }
    }
}

fn weight_of(r: &Results, docid: &DocId) -> f64 {
    match r {
        Results::Set(_) => 1.0,
        Results::Weighted(w) => w.get(docid).copied().unwrap_or(0.0),
    }
}

/// Intersection of two results with the same weighting rules as
/// [`weighted_union`].
pub fn weighted_intersection(a: Results, wa: f64, b: Results, wb: f64) -> Results {
    match (a, b) {
        (Results::Set(x), Results::Set(y)) => {
            let (small, large) = if x.len() <= y.len() { (x, y) } else { (y, x) };
            Results::Set(small.into_iter().filter(|d| large.contains(d)).collect())
        }
        (a, b) => {
            let (small, large, ws, wl) = if a.len() <= b.len() { (a, b, wa, wb) } else { (b, a, wb, wa) };
            let out = small
                .ids()
                .into_iter()
                .filter(|d| large.contains(d))
                .map(|d| (d, weight_of(&small, &d) * ws + weight_of(&large, &d) * wl))
                .collect();
            Results::Weighted(out)
        }
    }
}

pub fn union(a: Results, b: Results) -> Results {
    weighted_union(a, 1.0, b, 1.0)
}

pub fn intersection(a: Results, b: Results) -> Results {
    weighted_intersection(a, 1.0, b, 1.0)
}

/// Members of `a` not in `b`; weights of `a` are kept.
pub fn difference(a: Results, b: &Results) -> Results {
    if b.is_empty() {
        return a;
    }
    match a {
        Results::Set(mut s) => {
            s.retain(|d| !b.contains(d));
            Results::Set(s)
        }
        Results::Weighted(mut w) => {
            w.retain(|d, _| !b.contains(d));
            Results::Weighted(w)
        }
    }
}

/// Union of many plain sets.
pub fn multiunion<'a, I>(sets: I) -> DocSet
where
    I: IntoIterator<Item = &'a DocSet>,
{
    let mut out = DocSet::new();
    for set in sets {
        out.extend(set.iter().copied());
    }
    out
}
