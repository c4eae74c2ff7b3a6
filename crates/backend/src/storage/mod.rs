use overwatch_shared::error::StorageError;
use overwatch_shared::store::CollectionStorage;
use redb::{Database, ReadableDatabase, ReadableTableMetadata, TableDefinition};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One row per serialized collection, keyed by storage key.
const COLLECTIONS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("collections");

fn backend(e: impl std::fmt::Display) -> StorageError {
    StorageError::Backend(e.to_string())
}

pub struct RedbStorage {
    db: Database,
    path: PathBuf,
}

impl RedbStorage {
    pub fn open(path: &Path) -> Result<Arc<Self>, StorageError> {
        let db = Database::create(path)
            .map_err(|e| StorageError::Unavailable(format!("{}: {e}", path.display())))?;

        // Ensure table exists
        let write_txn = db.begin_write().map_err(backend)?;
        {
            write_txn.open_table(COLLECTIONS_TABLE).map_err(backend)?;
        }
        write_txn.commit().map_err(backend)?;

        tracing::info!(path = %path.display(), "Opened collection database");
        Ok(Arc::new(RedbStorage {
            db,
            path: path.to_path_buf(),
        }))
    }

    pub fn load_collection(&self, key: &str) -> Result<Option<String>, StorageError> {
        let read_txn = self.db.begin_read().map_err(backend)?;
        let table = read_txn.open_table(COLLECTIONS_TABLE).map_err(backend)?;

        match table.get(key).map_err(backend)? {
            Some(value) => {
                let payload = String::from_utf8(value.value().to_vec()).map_err(backend)?;
                Ok(Some(payload))
            }
            None => Ok(None),
        }
    }

    pub fn save_collection(&self, key: &str, payload: &str) -> Result<(), StorageError> {
        let write_txn = self.db.begin_write().map_err(backend)?;
        {
            let mut table = write_txn.open_table(COLLECTIONS_TABLE).map_err(backend)?;
            table
                .insert(key, payload.as_bytes())
                .map_err(backend)?;
        }
        write_txn.commit().map_err(backend)?;
        tracing::debug!(%key, bytes = payload.len(), "Stored collection");
        Ok(())
    }

    /// Number of stored collection rows.
    pub fn count_collections(&self) -> Result<u64, StorageError> {
        let read_txn = self.db.begin_read().map_err(backend)?;
        let table = read_txn.open_table(COLLECTIONS_TABLE).map_err(backend)?;
        table.len().map_err(backend)
    }

    pub fn db_size_bytes(&self) -> Result<u64, StorageError> {
        std::fs::metadata(&self.path)
            .map(|m| m.len())
            .map_err(backend)
    }
}

impl CollectionStorage for RedbStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.load_collection(key)
    }

    fn save(&self, key: &str, payload: &str) -> Result<(), StorageError> {
        self.save_collection(key, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overwatch_shared::models::{LatLon, OwnForce, Target};
    use overwatch_shared::store::EntityStore;

    fn temp_storage() -> (tempfile::TempDir, Arc<RedbStorage>) {
        let dir = tempfile::tempdir().unwrap();
        let storage = RedbStorage::open(&dir.path().join("test.redb")).unwrap();
        (dir, storage)
    }

    /// Lets an `EntityStore` own a handle to shared redb storage.
    struct Shared(Arc<RedbStorage>);

    impl CollectionStorage for Shared {
        fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.0.load(key)
        }

        fn save(&self, key: &str, payload: &str) -> Result<(), StorageError> {
            self.0.save(key, payload)
        }
    }

    #[test]
    fn test_missing_key_loads_none() {
        let (_dir, storage) = temp_storage();
        assert_eq!(storage.load_collection("tactical.targets").unwrap(), None);
        assert_eq!(storage.count_collections().unwrap(), 0);
    }

    #[test]
    fn test_save_then_load() {
        let (_dir, storage) = temp_storage();
        storage.save_collection("tactical.areas", "[]").unwrap();
        assert_eq!(
            storage.load_collection("tactical.areas").unwrap().as_deref(),
            Some("[]")
        );
        storage.save_collection("tactical.areas", "[ ]").unwrap();
        assert_eq!(
            storage.load_collection("tactical.areas").unwrap().as_deref(),
            Some("[ ]")
        );
        assert_eq!(storage.count_collections().unwrap(), 1);
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reopen.redb");
        {
            let storage = RedbStorage::open(&path).unwrap();
            storage.save_collection("k", "[1]").unwrap();
        }
        let storage = RedbStorage::open(&path).unwrap();
        assert_eq!(storage.load_collection("k").unwrap().as_deref(), Some("[1]"));
        assert!(storage.db_size_bytes().unwrap() > 0);
    }

    #[test]
    fn test_entity_store_round_trips_through_redb() {
        let (_dir, storage) = temp_storage();
        let now = chrono::Utc::now();
        let target = Target::placed(LatLon::new(59.91, 10.75), now);
        let force = OwnForce::placed(LatLon::new(60.0, 11.0), now);
        {
            let mut store = EntityStore::open(Box::new(Shared(storage.clone())), "tactical");
            store.add(target.clone()).unwrap();
            store.add(force.clone()).unwrap();
        }
        let store = EntityStore::open(Box::new(Shared(storage.clone())), "tactical");
        assert_eq!(store.all::<Target>(), vec![target]);
        assert_eq!(store.all::<OwnForce>(), vec![force]);
        assert_eq!(storage.count_collections().unwrap(), 2);
    }
}
