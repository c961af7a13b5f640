use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};

use crate::catalog::{Catalog, CatalogSnapshot};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{DocId, Document};
use crate::storage::store::Store;

/// Transaction ID generator
static TRANSACTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Transaction state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Active,
    Committed,
    Aborted,
}

/// A unit of catalog mutations. All of them become durable together on
/// [`Transaction::commit`]; [`Transaction::rollback`], a failed commit or
/// dropping an active transaction puts the catalog back as it was.
///
/// Only document operations go through a transaction. The catalog stays
/// mutably borrowed until it ends, so the set of registered indexes the
/// rollback snapshot was taken against cannot change underneath it.
pub struct Transaction<'a> {
    pub id: u64,
    store: &'a Store,
    catalog: &'a mut Catalog,
    rollback: Option<CatalogSnapshot>,
    state: TransactionState,
}

impl<'a> Transaction<'a> {
    pub(crate) fn begin(store: &'a Store, catalog: &'a mut Catalog) -> Self {
        let id = TRANSACTION_ID_COUNTER.fetch_add(1, Ordering::SeqCst);
        let rollback = Some(catalog.snapshot());
        debug!(id, "transaction started");
        Transaction {
            id,
            store,
            catalog,
            rollback,
            state: TransactionState::Active,
        }
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Read access to the catalog, including uncommitted changes.
    pub fn catalog(&self) -> &Catalog {
        &*self.catalog
    }

    pub fn index_doc(&mut self, docid: DocId, document: &Document) -> Result<()> {
        self.check_active()?;
        self.catalog.index_doc(docid, document)
    }

    pub fn unindex_doc(&mut self, docid: DocId) -> Result<()> {
        self.check_active()?;
        self.catalog.unindex_doc(docid)
    }

    pub fn reindex_doc(&mut self, docid: DocId, document: &Document) -> Result<()> {
        self.check_active()?;
        self.catalog.reindex_doc(docid, document)
    }

    /// Write the catalog to the store. When the write fails the catalog is
    /// rolled back and the caller may retry in a new transaction.
    pub fn commit(&mut self) -> Result<()> {
        self.check_active()?;
        if let Err(err) = self.store.save(&*self.catalog) {
            warn!(id = self.id, error = %err, "commit failed, rolling back");
            self.abort()?;
            return Err(err);
        }
        self.rollback = None;
        self.state = TransactionState::Committed;
        debug!(id = self.id, "transaction committed");
        Ok(())
    }

    pub fn rollback(&mut self) -> Result<()> {
        self.check_active()?;
        self.abort()?;
        debug!(id = self.id, "transaction rolled back");
        Ok(())
    }

    fn abort(&mut self) -> Result<()> {
        self.state = TransactionState::Aborted;
        match self.rollback.take() {
            Some(snapshot) => self.catalog.restore(snapshot),
            None => Ok(()),
        }
    }

    fn check_active(&self) -> Result<()> {
        if self.state != TransactionState::Active {
            return Err(Error::new(
                ErrorKind::InvalidState,
                format!("transaction {} is {:?}", self.id, self.state),
            ));
        }
        Ok(())
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.state == TransactionState::Active {
            debug!(id = self.id, "dropping active transaction, rolling back");
            if let Err(err) = self.abort() {
                warn!(id = self.id, error = %err, "rollback on drop failed");
            }
        }
    }
}
