use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::core::types::DocId;
use crate::sets::ops::DocSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketKind {
    Flat,
    Tree,
}

/// Docid bucket of an inverted index. Small buckets are a sorted vector;
/// large ones a tree set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Bucket {
    Flat(Vec<DocId>),
    Tree(BTreeSet<DocId>),
}

impl Default for Bucket {
    fn default() -> Self {
        Bucket::Flat(Vec::new())
    }
}

impl Bucket {
    pub fn kind(&self) -> BucketKind {
        match self {
            Bucket::Flat(_) => BucketKind::Flat,
            Bucket::Tree(_) => BucketKind::Tree,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Bucket::Flat(v) => v.len(),
            Bucket::Tree(t) => t.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, docid: &DocId) -> bool {
        match self {
            Bucket::Flat(v) => v.binary_search(docid).is_ok(),
            Bucket::Tree(t) => t.contains(docid),
        }
    }

    /// Returns true if the docid was not already present.
    pub fn insert(&mut self, docid: DocId) -> bool {
        match self {
            Bucket::Flat(v) => match v.binary_search(&docid) {
                Ok(_) => false,
                Err(pos) => {
                    v.insert(pos, docid);
                    true
                }
            },
            Bucket::Tree(t) => t.insert(docid),
        }
    }

    pub fn remove(&mut self, docid: &DocId) -> bool {
        match self {
            Bucket::Flat(v) => match v.binary_search(docid) {
                Ok(pos) => {
                    v.remove(pos);
                    true
                }
                Err(_) => false,
            },
            Bucket::Tree(t) => t.remove(docid),
        }
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = DocId> + '_> {
        match self {
            Bucket::Flat(v) => Box::new(v.iter().copied()),
            Bucket::Tree(t) => Box::new(t.iter().copied()),
        }
    }

    pub fn to_set(&self) -> DocSet {
        self.iter().collect()
    }

    pub fn to_tree(&mut self) {
        if let Bucket::Flat(v) = self {
            let tree = std::mem::take(v).into_iter().collect();
            *self = Bucket::Tree(tree);
        }
    }

    pub fn to_flat(&mut self) {
        if let Bucket::Tree(t) = self {
            let flat = std::mem::take(t).into_iter().collect();
            *self = Bucket::Flat(flat);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_insert_keeps_order() {
        let mut bucket = Bucket::default();
        assert!(bucket.insert(DocId(5)));
        assert!(bucket.insert(DocId(1)));
        assert!(!bucket.insert(DocId(5)));
        assert_eq!(bucket.iter().collect::<Vec<_>>(), vec![DocId(1), DocId(5)]);
    }

    #[test]
    fn test_conversion_preserves_members() {
        let mut bucket = Bucket::default();
        for i in [3, 1, 2] {
            bucket.insert(DocId(i));
        }
        bucket.to_tree();
        assert_eq!(bucket.kind(), BucketKind::Tree);
        assert!(bucket.remove(&DocId(2)));
        bucket.to_flat();
        assert_eq!(bucket.kind(), BucketKind::Flat);
        assert_eq!(bucket.to_set().len(), 2);
        assert!(bucket.contains(&DocId(3)));
    }
}
