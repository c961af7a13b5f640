use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::core::config::Config;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{DocId, Document};
use crate::index::keyword::Normalizer;
use crate::index::{CatalogIndex, Discriminator, FacetIndex, FieldIndex, IndexSnapshot, KeywordIndex, TextIndex};

/// Persisted contents of every index in a catalog, keyed by index name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub indexes: BTreeMap<String, IndexSnapshot>,
}

/// Named collection of indexes. Document operations fan out to every
/// index in name order.
pub struct Catalog {
    config: Config,
    indexes: BTreeMap<String, Box<dyn CatalogIndex>>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    pub fn new() -> Self {
        Catalog {
            config: Config::default(),
            indexes: BTreeMap::new(),
        }
    }

    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Catalog {
            config,
            indexes: BTreeMap::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Register `index` under `name`, replacing any index already there.
    pub fn add_index(&mut self, name: &str, index: Box<dyn CatalogIndex>) -> Result<()> {
        if name.is_empty() {
            return Err(Error::invalid_argument("index name must not be empty"));
        }
        debug!(name, kind = %index.kind(), "registered index");
        self.indexes.insert(name.to_string(), index);
        Ok(())
    }

    pub fn add_field_index(&mut self, name: &str, discriminator: Discriminator) -> Result<()> {
        self.add_index(name, Box::new(FieldIndex::new(discriminator)))
    }

    /// Keyword index using the configured bucket threshold.
    pub fn add_keyword_index(&mut self, name: &str, discriminator: Discriminator, normalizer: Normalizer) -> Result<()> {
        let index = KeywordIndex::with_options(discriminator, normalizer, self.config.keyword_tree_threshold);
        self.add_index(name, Box::new(index))
    }

    pub fn add_facet_index<I, S>(&mut self, name: &str, discriminator: Discriminator, taxonomy: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let index = FacetIndex::new(discriminator, taxonomy)?;
        self.add_index(name, Box::new(index))
    }

    /// Text index using the configured lexicon pipeline and scorer.
    pub fn add_text_index(&mut self, name: &str, discriminator: Discriminator) -> Result<()> {
        let index = TextIndex::from_config(discriminator, &self.config);
        self.add_index(name, Box::new(index))
    }

    pub fn remove_index(&mut self, name: &str) -> Option<Box<dyn CatalogIndex>> {
        self.indexes.remove(name)
    }

    pub fn get(&self, name: &str) -> Result<&dyn CatalogIndex> {
        self.indexes
            .get(name)
            .map(|index| index.as_ref())
            .ok_or_else(|| unknown_index(name))
    }

    /// The index under `name` as its concrete type.
    pub fn get_as<T: CatalogIndex + 'static>(&self, name: &str) -> Result<&T> {
        let index = self.get(name)?;
        let kind = index.kind();
        index.as_any().downcast_ref::<T>().ok_or_else(|| {
            Error::invalid_argument(format!("index '{}' is a {}", name, kind))
        })
    }

    pub fn get_as_mut<T: CatalogIndex + 'static>(&mut self, name: &str) -> Result<&mut T> {
        let index = self.indexes.get_mut(name).ok_or_else(|| unknown_index(name))?;
        let kind = index.kind();
        index.as_any_mut().downcast_mut::<T>().ok_or_else(|| {
            Error::invalid_argument(format!("index '{}' is a {}", name, kind))
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.indexes.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.indexes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    /// Index `document` in every registered index, in name order.
    ///
    /// Stops at the first index that fails; indexes before it keep the
    /// update. Use [`crate::storage::Transaction`] for all-or-nothing changes.
    pub fn index_doc(&mut self, docid: DocId, document: &Document) -> Result<()> {
        for (name, index) in self.indexes.iter_mut() {
            trace!(index = %name, docid = docid.value(), "index_doc");
            index.index_doc(docid, document)?;
        }
        Ok(())
    }

    /// Remove `docid` from every index. Not atomic, see [`Catalog::index_doc`].
    pub fn unindex_doc(&mut self, docid: DocId) -> Result<()> {
        for (name, index) in self.indexes.iter_mut() {
            trace!(index = %name, docid = docid.value(), "unindex_doc");
            index.unindex_doc(docid)?;
        }
        Ok(())
    }

    /// Replace the indexed data of `docid`. Not atomic, see [`Catalog::index_doc`].
    pub fn reindex_doc(&mut self, docid: DocId, document: &Document) -> Result<()> {
        for (name, index) in self.indexes.iter_mut() {
            trace!(index = %name, docid = docid.value(), "reindex_doc");
            index.reindex_doc(docid, document)?;
        }
        Ok(())
    }

    /// Clear every index. Registrations are kept.
    pub fn reset(&mut self) {
        debug!(indexes = self.indexes.len(), "resetting catalog");
        for index in self.indexes.values_mut() {
            index.reset();
        }
    }

    pub fn snapshot(&self) -> CatalogSnapshot {
        CatalogSnapshot {
            indexes: self
                .indexes
                .iter()
                .map(|(name, index)| (name.clone(), index.snapshot()))
                .collect(),
        }
    }

    /// Load `snapshot` into the registered indexes. Every name in the
    /// snapshot must be registered with an index of the same kind; indexes
    /// missing from the snapshot are reset.
    pub fn restore(&mut self, snapshot: CatalogSnapshot) -> Result<()> {
        for (name, data) in &snapshot.indexes {
            let index = self.get(name)?;
            if index.kind() != data.kind() {
                return Err(Error::new(
                    ErrorKind::InvalidState,
                    format!("index '{}' is a {} but the snapshot holds {} data", name, index.kind(), data.kind()),
                ));
            }
        }
        let mut snapshot = snapshot.indexes;
        for (name, index) in self.indexes.iter_mut() {
            match snapshot.remove(name) {
                Some(data) => index.restore(data)?,
                None => index.reset(),
            }
        }
        Ok(())
    }
}

fn unknown_index(name: &str) -> Error {
    Error::new(ErrorKind::UnknownIndex, format!("No such index {}", name))
}
