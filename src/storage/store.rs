use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::catalog::{Catalog, CatalogSnapshot};
use crate::core::config::Config;
use crate::core::error::{Error, ErrorKind, Result};
use crate::storage::layout::StorageLayout;
use crate::storage::transaction::Transaction;

const MAGIC: &[u8; 4] = b"CTLX";
const FORMAT_VERSION: u32 = 1;
// magic + version + checksum + payload length
const HEADER_LEN: usize = 4 + 4 + 4 + 8;

/// Durable home of a catalog's index data.
///
/// The whole catalog snapshot is written as one file; a write goes to a
/// temporary file that replaces the previous snapshot only once complete.
/// Clones share one write lock, so concurrent commits are serialized.
#[derive(Debug, Clone)]
pub struct Store {
    layout: StorageLayout,
    sync_on_commit: bool,
    write_lock: Arc<Mutex<()>>,
}

impl Store {
    pub fn open(base_dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Store {
            layout: StorageLayout::new(base_dir)?,
            sync_on_commit: true,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Store {
            layout: StorageLayout::new(config.storage_dir.clone())?,
            sync_on_commit: config.sync_on_commit,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Start a transaction over `catalog`. Changes made through it are
    /// written on commit and undone on rollback or drop.
    pub fn begin<'a>(&'a self, catalog: &'a mut Catalog) -> Transaction<'a> {
        Transaction::begin(self, catalog)
    }

    pub fn save(&self, catalog: &Catalog) -> Result<()> {
        self.write_snapshot(&catalog.snapshot())
    }

    pub(crate) fn write_snapshot(&self, snapshot: &CatalogSnapshot) -> Result<()> {
        let payload = bincode::serialize(snapshot)?;
        let checksum = crc32fast::hash(&payload);

        let mut buffer = Vec::with_capacity(HEADER_LEN + payload.len());
        buffer.extend_from_slice(MAGIC);
        buffer.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        buffer.extend_from_slice(&checksum.to_le_bytes());
        buffer.extend_from_slice(&(payload.len() as u64).to_le_bytes());
        buffer.extend_from_slice(&payload);

        let _guard = self.write_lock.lock();
        let mut file = NamedTempFile::new_in(self.layout.meta_dir())?;
        file.write_all(&buffer)?;
        if self.sync_on_commit {
            file.as_file().sync_all()?;
        }
        let path = self.layout.catalog_path();
        file.persist(&path)?;

        debug!(
            path = %path.display(),
            bytes = buffer.len(),
            indexes = snapshot.indexes.len(),
            "saved catalog snapshot"
        );
        Ok(())
    }

    /// The persisted snapshot, or `None` when nothing was saved yet.
    pub fn load(&self) -> Result<Option<CatalogSnapshot>> {
        let path = self.layout.catalog_path();
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read(&path)?;
        let snapshot = decode(&data)?;
        debug!(path = %path.display(), indexes = snapshot.indexes.len(), "loaded catalog snapshot");
        Ok(Some(snapshot))
    }

    /// Restore persisted data into `catalog`, whose indexes must already be
    /// registered under the saved names. Returns whether a snapshot existed.
    pub fn load_into(&self, catalog: &mut Catalog) -> Result<bool> {
        match self.load()? {
            Some(snapshot) => {
                catalog.restore(snapshot)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

fn corruption(context: impl Into<String>) -> Error {
    Error::new(ErrorKind::Corruption, context)
}

fn decode(data: &[u8]) -> Result<CatalogSnapshot> {
    if data.len() < HEADER_LEN {
        return Err(corruption("catalog file is truncated"));
    }
    let (header, payload) = data.split_at(HEADER_LEN);
    if &header[0..4] != MAGIC {
        return Err(corruption("not a catalog file"));
    }
    let mut word = [0u8; 4];
    word.copy_from_slice(&header[4..8]);
    let version = u32::from_le_bytes(word);
    if version != FORMAT_VERSION {
        return Err(corruption(format!("unsupported catalog format version {}", version)));
    }
    word.copy_from_slice(&header[8..12]);
    let checksum = u32::from_le_bytes(word);
    let mut len = [0u8; 8];
    len.copy_from_slice(&header[12..20]);
    let len = u64::from_le_bytes(len);

    if payload.len() as u64 != len {
        return Err(corruption(format!(
            "catalog payload is {} bytes, header says {}",
            payload.len(),
            len
        )));
    }
    if crc32fast::hash(payload) != checksum {
        return Err(corruption("catalog checksum mismatch"));
    }
    Ok(bincode::deserialize(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{DocId, Document, Value};
    use crate::index::Discriminator;

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.add_field_index("title", Discriminator::attribute("title").unwrap()).unwrap();
        catalog.add_text_index("body", Discriminator::attribute("body").unwrap()).unwrap();
        catalog
    }

    fn populated() -> Catalog {
        let mut catalog = catalog();
        let doc = Document::new().with_field("title", "hello").with_field("body", "hello wide world");
        catalog.index_doc(DocId(1), &doc).unwrap();
        catalog
    }

    #[test]
    fn test_save_and_load_into() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        assert!(store.load().unwrap().is_none());
        store.save(&populated()).unwrap();

        let mut fresh = catalog();
        assert!(store.load_into(&mut fresh).unwrap());
        let found = fresh.get("body").unwrap().apply(&Value::from("world")).unwrap();
        assert!(found.contains(&DocId(1)));
        assert_eq!(fresh.snapshot(), populated().snapshot());
    }

    #[test]
    fn test_detects_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        store.save(&populated()).unwrap();

        let path = store.layout().catalog_path();
        let mut data = fs::read(&path).unwrap();
        let last = data.len() - 1;
        data[last] ^= 0xff;
        fs::write(&path, &data).unwrap();
        assert_eq!(store.load().unwrap_err().kind, ErrorKind::Corruption);

        fs::write(&path, b"CTLX").unwrap();
        assert_eq!(store.load().unwrap_err().kind, ErrorKind::Corruption);
        fs::write(&path, vec![0u8; 64]).unwrap();
        assert_eq!(store.load().unwrap_err().kind, ErrorKind::Corruption);
    }

    #[test]
    fn test_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            storage_dir: dir.path().join("data"),
            sync_on_commit: false,
            ..Config::default()
        };
        let store = Store::from_config(&config).unwrap();
        store.save(&populated()).unwrap();
        assert!(dir.path().join("data").join("meta").join("catalog.bin").exists());
    }

    #[test]
    fn test_concurrent_saves_leave_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let snapshot = populated().snapshot();
        std::thread::scope(|scope| {
            for _ in 0..4 {
                let store = store.clone();
                let snapshot = &snapshot;
                scope.spawn(move || store.write_snapshot(snapshot).unwrap());
            }
        });
        assert_eq!(store.load().unwrap(), Some(snapshot));
    }
}
