use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::sets::Weighted;

/// A result map and the factor its weights are scaled by.
pub type Scored = (Weighted, f64);

fn scaled(map: Weighted, factor: f64) -> Weighted {
    if factor == 1.0 {
        return map;
    }
    map.into_iter().map(|(d, w)| (d, w * factor)).collect()
}

fn union_pair((x, wx): Scored, (y, wy): Scored) -> Weighted {
    let (mut big, wb, small, ws) = if x.len() >= y.len() { (x, wx, y, wy) } else { (y, wy, x, wx) };
    if wb != 1.0 {
        for w in big.values_mut() {
            *w *= wb;
        }
    }
    for (d, w) in small {
        *big.entry(d).or_insert(0.0) += w * ws;
    }
    big
}

fn intersect_pair((x, wx): Scored, (y, wy): &Scored) -> Weighted {
    x.into_iter()
        .filter_map(|(d, w)| y.get(&d).map(|v| (d, w * wx + v * wy)))
        .collect()
}

/// Weighted union of many maps, always merging the two smallest so far.
pub fn mass_weighted_union(parts: Vec<Scored>) -> Weighted {
    if parts.len() < 2 {
        return trivial(parts);
    }

    let mut slots: Vec<Option<Scored>> = Vec::with_capacity(parts.len() * 2);
    let mut heap = BinaryHeap::new();
    for part in parts {
        heap.push(Reverse((part.0.len(), slots.len())));
        slots.push(Some(part));
    }

    while heap.len() > 1 {
        let (Some(Reverse((_, a))), Some(Reverse((_, b)))) = (heap.pop(), heap.pop()) else {
            break;
        };
        let (Some(x), Some(y)) = (slots[a].take(), slots[b].take()) else {
            break;
        };
        let merged = union_pair(x, y);
        heap.push(Reverse((merged.len(), slots.len())));
        slots.push(Some((merged, 1.0)));
    }

    heap.pop()
        .and_then(|Reverse((_, i))| slots[i].take())
        .map(|(map, factor)| scaled(map, factor))
        .unwrap_or_default()
}

/// Weighted intersection of many maps, smallest first. `None` entries
/// mean "matches everything" and are skipped.
pub fn mass_weighted_intersection(parts: Vec<Option<Scored>>) -> Weighted {
    let mut parts: Vec<Scored> = parts.into_iter().flatten().collect();
    if parts.len() < 2 {
        return trivial(parts);
    }
    parts.sort_by_key(|(map, _)| map.len());

    let mut iter = parts.into_iter();
    let (Some(first), Some(second)) = (iter.next(), iter.next()) else {
        return Weighted::new();
    };
    let mut result = intersect_pair(first, &second);
    for part in iter {
        if result.is_empty() {
            break;
        }
        result = intersect_pair((result, 1.0), &part);
    }
    result
}

fn trivial(parts: Vec<Scored>) -> Weighted {
    match parts.into_iter().next() {
        Some((map, factor)) => scaled(map, factor),
        None => Weighted::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::DocId;

    fn map(pairs: &[(i64, f64)]) -> Weighted {
        pairs.iter().map(|&(d, w)| (DocId(d), w)).collect()
    }

    #[test]
    fn test_single_part_is_scaled() {
        assert_eq!(mass_weighted_union(vec![(map(&[(1, 2.0)]), 3.0)]), map(&[(1, 6.0)]));
        assert_eq!(mass_weighted_intersection(vec![Some((map(&[(1, 2.0)]), 0.5))]), map(&[(1, 1.0)]));
        assert!(mass_weighted_union(vec![]).is_empty());
    }

    #[test]
    fn test_union_sums_scaled_weights() {
        let out = mass_weighted_union(vec![
            (map(&[(1, 1.0), (2, 1.0)]), 2.0),
            (map(&[(2, 1.0)]), 1.0),
            (map(&[(3, 4.0)]), 0.5),
        ]);
        assert_eq!(out, map(&[(1, 2.0), (2, 3.0), (3, 2.0)]));
    }

    #[test]
    fn test_intersection_skips_none_and_sums() {
        let out = mass_weighted_intersection(vec![
            Some((map(&[(1, 1.0), (2, 1.0), (3, 1.0)]), 1.0)),
            None,
            Some((map(&[(2, 2.0), (3, 1.0)]), 2.0)),
            Some((map(&[(3, 1.0)]), 1.0)),
        ]);
        assert_eq!(out, map(&[(3, 4.0)]));
    }
}
