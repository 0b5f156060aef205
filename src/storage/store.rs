use super::pending::{DEAD_LETTER_PREFIX, PENDING_PREFIX};
use redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;
use thiserror::Error;

const CONTACTS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("contacts");

/// Errors that can occur during store operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Record encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Durable key-value store for one node.
///
/// Live contacts and the reserved namespaces share a single ordered table,
/// mirroring the flat key space of the wire protocol. All operations are
/// individual transactions; scans run inside one read transaction and are
/// therefore snapshot-consistent for their duration.
pub struct ContactStore {
    db: Database,
}

impl ContactStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = Database::create(path)?;

        // Ensure the table exists so later read transactions can open it.
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(CONTACTS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    pub fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(CONTACTS_TABLE)?;
            table.insert(key, value)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CONTACTS_TABLE)?;

        Ok(table.get(key)?.map(|guard| guard.value().to_string()))
    }

    /// Removes a key. Deleting an absent key is not an error.
    pub fn delete(&self, key: &str) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(CONTACTS_TABLE)?;
            table.remove(key)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// All key-value pairs whose key starts with `prefix`, in key order.
    ///
    /// Uses a range query over the engine's sorted B-tree; the scan sees a
    /// single snapshot of the table.
    pub fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CONTACTS_TABLE)?;

        let mut result = Vec::new();
        for entry in table.range(prefix..)? {
            let (key, value) = entry?;
            if !key.value().starts_with(prefix) {
                break;
            }
            result.push((key.value().to_string(), value.value().to_string()));
        }
        Ok(result)
    }

    /// All live contacts, in name order. Reserved namespaces (pending
    /// fallback entries and quarantined records) are excluded: they are
    /// not authoritative data from this node's perspective.
    pub fn list_contacts(&self) -> Result<Vec<(String, String)>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CONTACTS_TABLE)?;

        let mut result = Vec::new();
        for entry in table.iter()? {
            let (key, value) = entry?;
            let name = key.value();
            if name.starts_with(PENDING_PREFIX) || name.starts_with(DEAD_LETTER_PREFIX) {
                continue;
            }
            result.push((name.to_string(), value.value().to_string()));
        }
        Ok(result)
    }
}
