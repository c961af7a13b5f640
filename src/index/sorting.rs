use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};
use std::str::FromStr;

use tracing::debug;

use crate::core::error::{Error, Result};
use crate::core::types::{DocId, Value};
use crate::sets::{DocSet, Results};

/// Sort algorithm of a field index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortType {
    /// Walk the forward index in key order, keeping requested ids.
    ForwardScan,
    /// Bounded heap holding only the best `limit` entries.
    NBest,
    /// Materialize and sort every requested id.
    FullSort,
}

impl FromStr for SortType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "fwscan" | "forward_scan" => Ok(SortType::ForwardScan),
            "nbest" | "n_best" => Ok(SortType::NBest),
            "timsort" | "full_sort" => Ok(SortType::FullSort),
            other => Err(Error::invalid_argument(format!("Unknown sort type {}", other))),
        }
    }
}

const DIV: f64 = 65536.0;

// (docratio lower bound, docratio upper bound, limitratio ceiling), all /65536
const FWSCAN_BANDS: [(f64, f64, f64); 5] = [
    (512.0, 1024.0, 4.0),
    (1024.0, 2048.0, 32.0),
    (2048.0, 4096.0, 128.0),
    (4096.0, 8192.0, 512.0),
    (8192.0, 16384.0, 4096.0),
];

fn limit_ratio(limit: Option<usize>, numdocs: usize) -> f64 {
    match limit {
        Some(limit) => limit as f64 / numdocs as f64,
        None => 1.0,
    }
}

/// Whether a forward scan is expected to beat both n-best and a full sort.
/// Empirical curve fit; the thresholds are measured, not derived.
pub fn fwscan_wins(limit: Option<usize>, rlen: usize, numdocs: usize) -> bool {
    let docratio = rlen as f64 / numdocs as f64;
    let limitratio = limit_ratio(limit, numdocs);

    if docratio >= 16384.0 / DIV {
        return true;
    }
    if docratio >= 256.0 / DIV {
        return FWSCAN_BANDS.iter().any(|&(lo, hi, ceiling)| {
            lo / DIV <= docratio && docratio < hi / DIV && limitratio <= ceiling / DIV
        });
    }
    false
}

/// Whether an ascending n-best is expected to beat a full sort.
pub fn nbest_ascending_wins(limit: Option<usize>, rlen: usize, numdocs: usize) -> bool {
    let Some(limit) = limit else {
        return false;
    };
    let limitratio = limit as f64 / numdocs as f64;

    if numdocs <= 768 {
        return true;
    }

    let docratio = rlen as f64 / numdocs as f64;
    if docratio < 4096.0 / DIV {
        return true;
    }

    if docratio == 1.0 && limitratio <= 8192.0 / DIV {
        true
    } else if 1.0 > docratio && docratio >= 32768.0 / DIV && limitratio <= 4096.0 / DIV {
        true
    } else {
        32768.0 / DIV > docratio && docratio >= 4096.0 / DIV && limitratio <= 2048.0 / DIV
    }
}

/// Automatic choice for an ascending sort.
pub fn choose_forward(limit: Option<usize>, rlen: usize, numdocs: usize) -> SortType {
    if fwscan_wins(limit, rlen, numdocs) {
        SortType::ForwardScan
    } else if limit.is_some() && nbest_ascending_wins(limit, rlen, numdocs) {
        SortType::NBest
    } else {
        SortType::FullSort
    }
}

/// Automatic choice for a descending sort.
pub fn choose_reverse(limit: Option<usize>, rlen: usize) -> SortType {
    match limit {
        Some(limit) if limit < 300 || limit as f64 / rlen as f64 > 0.09 => SortType::NBest,
        _ => SortType::FullSort,
    }
}

/// Sort `docids` by the values an index holds for them. Ids the index does
/// not know are dropped. Ties order by docid in the sort direction.
pub fn sort_by_value(
    forward: &BTreeMap<Value, DocSet>,
    reverse_map: &BTreeMap<DocId, Value>,
    docids: &Results,
    reverse: bool,
    limit: Option<usize>,
    sort_type: Option<SortType>,
) -> Result<Vec<DocId>> {
    if limit == Some(0) {
        return Err(Error::invalid_argument("limit must be 1 or greater"));
    }
    let numdocs = reverse_map.len();
    if docids.is_empty() || numdocs == 0 {
        return Ok(Vec::new());
    }
    let rlen = docids.len();

    let sort_type = match sort_type {
        Some(explicit) => explicit,
        None if reverse => choose_reverse(limit, rlen),
        None => choose_forward(limit, rlen, numdocs),
    };
    debug!(rlen, numdocs, ?limit, reverse, ?sort_type, "sorting by value");

    match (sort_type, reverse) {
        (SortType::ForwardScan, false) => Ok(scan_forward(forward, docids, limit)),
        (SortType::ForwardScan, true) => Err(Error::invalid_argument(
            "forward scan cannot produce a reversed sort",
        )),
        (SortType::NBest, _) => {
            let limit = limit.ok_or_else(|| Error::invalid_argument("nbest requires a limit"))?;
            Ok(if reverse {
                nbest_descending(reverse_map, docids, limit)
            } else {
                nbest_ascending(reverse_map, docids, limit)
            })
        }
        (SortType::FullSort, _) => Ok(full_sort(reverse_map, docids, reverse, limit)),
    }
}

pub fn scan_forward(forward: &BTreeMap<Value, DocSet>, docids: &Results, limit: Option<usize>) -> Vec<DocId> {
    let max = limit.unwrap_or(usize::MAX);
    forward
        .values()
        .flat_map(|bucket| bucket.iter().copied())
        .filter(|docid| docids.contains(docid))
        .take(max)
        .collect()
}

fn pairs<'a>(reverse_map: &'a BTreeMap<DocId, Value>, docids: &Results) -> Vec<(&'a Value, DocId)> {
    docids
        .ids()
        .into_iter()
        .filter_map(|docid| reverse_map.get(&docid).map(|value| (value, docid)))
        .collect()
}

/// Keeps the `limit` smallest entries in a bounded max-heap.
pub fn nbest_ascending(reverse_map: &BTreeMap<DocId, Value>, docids: &Results, limit: usize) -> Vec<DocId> {
    let mut heap = BinaryHeap::with_capacity(limit + 1);
    for entry in pairs(reverse_map, docids) {
        if heap.len() < limit {
            heap.push(entry);
        } else if heap.peek().is_some_and(|top| entry < *top) {
            heap.pop();
            heap.push(entry);
        }
    }
    heap.into_sorted_vec().into_iter().map(|(_, docid)| docid).collect()
}

/// Keeps the `limit` largest entries in a bounded min-heap.
pub fn nbest_descending(reverse_map: &BTreeMap<DocId, Value>, docids: &Results, limit: usize) -> Vec<DocId> {
    let mut heap = BinaryHeap::with_capacity(limit + 1);
    for entry in pairs(reverse_map, docids) {
        let entry = Reverse(entry);
        if heap.len() < limit {
            heap.push(entry);
        } else if heap.peek().is_some_and(|top| entry < *top) {
            heap.pop();
            heap.push(entry);
        }
    }
    heap.into_sorted_vec().into_iter().map(|Reverse((_, docid))| docid).collect()
}

pub fn full_sort(
    reverse_map: &BTreeMap<DocId, Value>,
    docids: &Results,
    reverse: bool,
    limit: Option<usize>,
) -> Vec<DocId> {
    let mut entries = pairs(reverse_map, docids);
    entries.sort();
    if reverse {
        entries.reverse();
    }
    if let Some(limit) = limit {
        entries.truncate(limit);
    }
    entries.into_iter().map(|(_, docid)| docid).collect()
}
