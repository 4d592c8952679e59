//! Persistent KV backed by redb.

use crate::blob::Blob;
use crate::error::{Result, StrataError};
use crate::kv::{check_key, CheckFn, Kv};
use redb::{Database, ReadableTable, TableDefinition};
use std::fmt;
use std::path::Path;

const OBJECTS: TableDefinition<&str, &[u8]> = TableDefinition::new("objects");

fn storage_err(e: impl fmt::Display) -> StrataError {
    StrataError::Storage(e.to_string())
}

/// On-disk KV over a single redb table.
///
/// redb's exclusive write transaction is what makes [`Kv::put_if`] an atomic
/// read-check-write; read transactions see a consistent snapshot.
pub struct RedbKv {
    db: Database,
}

impl RedbKv {
    /// Opens (or creates) the database file at the given path.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the file cannot be opened or created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::create(path.as_ref()).map_err(storage_err)?;
        Ok(Self { db })
    }
}

impl Kv for RedbKv {
    fn get(&self, key: &str) -> Result<Blob> {
        check_key(key)?;
        let txn = self.db.begin_read().map_err(storage_err)?;
        let table = match txn.open_table(OBJECTS) {
            Ok(table) => table,
            // A fresh database has no table yet; every key is absent.
            Err(redb::TableError::TableDoesNotExist(_)) => {
                return Err(StrataError::KeyNotFound(key.to_string()))
            }
            Err(e) => return Err(storage_err(e)),
        };
        match table.get(key).map_err(storage_err)? {
            Some(guard) => Ok(Blob::new(guard.value().to_vec())),
            None => Err(StrataError::KeyNotFound(key.to_string())),
        }
    }

    fn has(&self, key: &str) -> Result<bool> {
        check_key(key)?;
        let txn = self.db.begin_read().map_err(storage_err)?;
        let table = match txn.open_table(OBJECTS) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(false),
            Err(e) => return Err(storage_err(e)),
        };
        Ok(table
            .get(key)
            .map_err(storage_err)?
            .is_some_and(|guard| !guard.value().is_empty()))
    }

    fn put(&self, key: &str, blob: &Blob) -> Result<()> {
        check_key(key)?;
        let txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut table = txn.open_table(OBJECTS).map_err(storage_err)?;
            table.insert(key, blob.as_bytes()).map_err(storage_err)?;
        }
        txn.commit().map_err(storage_err)?;
        Ok(())
    }

    fn put_if(&self, key: &str, blob: &Blob, check: CheckFn<'_>) -> Result<bool> {
        check_key(key)?;
        let txn = self.db.begin_write().map_err(storage_err)?;
        let changed = {
            let mut table = txn.open_table(OBJECTS).map_err(storage_err)?;
            let prev = table
                .get(key)
                .map_err(storage_err)?
                .map(|guard| guard.value().to_vec())
                .unwrap_or_default();
            let changed = check(&prev, blob.as_bytes())?;
            if changed {
                table.insert(key, blob.as_bytes()).map_err(storage_err)?;
            }
            changed
        };
        if changed {
            txn.commit().map_err(storage_err)?;
        } else {
            txn.abort().map_err(storage_err)?;
        }
        Ok(changed)
    }
}
