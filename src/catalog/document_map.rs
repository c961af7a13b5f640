use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::error::{Error, Result};
use crate::core::types::{DocId, Value};

pub type Metadata = BTreeMap<String, Value>;

/// Two-way map between application addresses (paths, keys) and docids,
/// with optional per-document metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMap {
    docid_to_address: BTreeMap<DocId, String>,
    address_to_docid: BTreeMap<String, DocId>,
    docid_to_metadata: BTreeMap<DocId, Metadata>,
    #[serde(skip)]
    next_id: Option<i64>,
}

impl DocumentMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.docid_to_address.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docid_to_address.is_empty()
    }

    pub fn docid_for_address(&self, address: &str) -> Option<DocId> {
        self.address_to_docid.get(address).copied()
    }

    pub fn address_for_docid(&self, docid: DocId) -> Option<&str> {
        self.docid_to_address.get(&docid).map(String::as_str)
    }

    /// Map `address` to `docid`, or to a fresh docid when none is given.
    /// Any previous mapping of either side is dropped first, together with
    /// its metadata.
    pub fn add(&mut self, address: &str, docid: Option<DocId>) -> DocId {
        let docid = match docid {
            Some(docid) => docid,
            None => self.new_docid(),
        };
        self.remove_docid(docid);
        self.remove_address(address);
        self.docid_to_address.insert(docid, address.to_string());
        self.address_to_docid.insert(address.to_string(), docid);
        docid
    }

    /// Returns whether `docid` was mapped.
    pub fn remove_docid(&mut self, docid: DocId) -> bool {
        let Some(address) = self.docid_to_address.remove(&docid) else {
            return false;
        };
        if self.address_to_docid.get(&address) == Some(&docid) {
            self.address_to_docid.remove(&address);
        }
        self.docid_to_metadata.remove(&docid);
        true
    }

    /// Returns whether `address` was mapped.
    pub fn remove_address(&mut self, address: &str) -> bool {
        let Some(docid) = self.address_to_docid.remove(address) else {
            return false;
        };
        if self.docid_to_address.get(&docid).map(String::as_str) == Some(address) {
            self.docid_to_address.remove(&docid);
        }
        self.docid_to_metadata.remove(&docid);
        true
    }

    /// Merge `data` into the metadata of `docid`, overwriting existing keys.
    pub fn add_metadata(&mut self, docid: DocId, data: Metadata) -> Result<()> {
        if !self.docid_to_address.contains_key(&docid) {
            return Err(unknown_docid(docid));
        }
        if data.is_empty() {
            return Ok(());
        }
        self.docid_to_metadata.entry(docid).or_default().extend(data);
        Ok(())
    }

    /// Remove the given keys, or all metadata when `keys` is empty.
    /// Keys without a value are ignored.
    pub fn remove_metadata(&mut self, docid: DocId, keys: &[&str]) -> Result<()> {
        let Some(meta) = self.docid_to_metadata.get_mut(&docid) else {
            return Err(unknown_docid(docid));
        };
        if keys.is_empty() {
            self.docid_to_metadata.remove(&docid);
            return Ok(());
        }
        for key in keys {
            meta.remove(*key);
        }
        if meta.is_empty() {
            self.docid_to_metadata.remove(&docid);
        }
        Ok(())
    }

    pub fn get_metadata(&self, docid: DocId) -> Result<&Metadata> {
        self.docid_to_metadata.get(&docid).ok_or_else(|| unknown_docid(docid))
    }

    /// A docid not mapped yet. Ids are handed out sequentially from a
    /// random starting point; a collision picks a new starting point.
    pub fn new_docid(&mut self) -> DocId {
        let mut rng = rand::thread_rng();
        loop {
            let candidate = match self.next_id {
                Some(id) => id,
                None => rng.gen_range(i64::from(i32::MIN)..i64::from(i32::MAX)),
            };
            self.next_id = candidate.checked_add(1);
            if !self.docid_to_address.contains_key(&DocId(candidate)) {
                return DocId(candidate);
            }
            self.next_id = None;
        }
    }
}

fn unknown_docid(docid: DocId) -> Error {
    Error::invalid_argument(format!("no metadata for docid {}", docid.value()))
}
