use std::fmt;
use std::sync::Arc;

use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{Document, Value};

pub type Extractor = Arc<dyn Fn(&Document) -> Option<Value> + Send + Sync>;

/// How an index pulls the value to index out of a document.
#[derive(Clone)]
pub enum Discriminator {
    Callable(Extractor),
    Attribute(String),
}

impl Discriminator {
    pub fn callable<F>(f: F) -> Self
    where
        F: Fn(&Document) -> Option<Value> + Send + Sync + 'static,
    {
        Discriminator::Callable(Arc::new(f))
    }

    pub fn attribute(name: &str) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(Error::new(
                ErrorKind::Configuration,
                "discriminator attribute name must not be empty",
            ));
        }
        Ok(Discriminator::Attribute(name.to_string()))
    }

    /// The value to index, or `None` when the document has none.
    pub fn discriminate(&self, document: &Document) -> Result<Option<Value>> {
        let value = match self {
            Discriminator::Callable(f) => f(document),
            Discriminator::Attribute(name) => document.get_field(name).cloned(),
        };
        match value {
            Some(v) if v.is_reference() => Err(Error::invalid_argument(format!(
                "Catalog cannot index persistent object {}",
                v
            ))),
            other => Ok(other),
        }
    }
}

impl fmt::Debug for Discriminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discriminator::Callable(_) => write!(f, "Callable(..)"),
            Discriminator::Attribute(name) => write!(f, "Attribute({:?})", name),
        }
    }
}
