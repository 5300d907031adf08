//! Durable store backed by a redb embedded database.
//!
//! Holds the namespaced session records that survive a restart, plus the
//! flat (unprefixed) rehydration keys read directly by the authoritative
//! application state on startup.

use anyhow::{Context, Result};
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::path::PathBuf;

/// Namespaced session records (key: qualified key, value: MessagePack bytes).
const RECORDS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("session_records");

/// Flat rehydration values (key: flat name, value: JSON bytes).
const FLAT_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("rehydration_state");

/// Durable key/value store for session records and flat rehydration keys.
pub struct DurableStore {
    db: Database,
}

impl DurableStore {
    /// Open or create the durable store at the given path.
    pub fn open(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }

        let db = Database::create(&path)
            .with_context(|| format!("Failed to open durable session store: {:?}", path))?;

        // Initialize tables
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(RECORDS_TABLE)?;
            let _ = write_txn.open_table(FLAT_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    pub fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(RECORDS_TABLE)?;
            table.insert(key, bytes)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RECORDS_TABLE)?;
        Ok(table.get(key)?.map(|v| v.value().to_vec()))
    }

    pub fn remove(&self, key: &str) -> Result<bool> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(RECORDS_TABLE)?;
            let was_present = table.remove(key)?.is_some();
            was_present
        };
        write_txn.commit()?;
        Ok(removed)
    }

    /// Remove every namespaced record. Returns the number removed.
    pub fn clear_records(&self) -> Result<usize> {
        let keys: Vec<String> = {
            let read_txn = self.db.begin_read()?;
            let table = read_txn.open_table(RECORDS_TABLE)?;
            let mut keys = Vec::new();
            for entry in table.iter()? {
                let (key, _) = entry?;
                keys.push(key.value().to_string());
            }
            keys
        };

        if keys.is_empty() {
            return Ok(0);
        }

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(RECORDS_TABLE)?;
            for key in &keys {
                table.remove(key.as_str())?;
            }
        }
        write_txn.commit()?;
        Ok(keys.len())
    }

    pub fn put_flat(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(FLAT_TABLE)?;
            table.insert(key, bytes)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get_flat(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(FLAT_TABLE)?;
        Ok(table.get(key)?.map(|v| v.value().to_vec()))
    }

    /// Remove every flat rehydration key. Returns the number removed.
    pub fn clear_flat(&self) -> Result<usize> {
        let keys: Vec<String> = {
            let read_txn = self.db.begin_read()?;
            let table = read_txn.open_table(FLAT_TABLE)?;
            let mut keys = Vec::new();
            for entry in table.iter()? {
                let (key, _) = entry?;
                keys.push(key.value().to_string());
            }
            keys
        };

        if keys.is_empty() {
            return Ok(0);
        }

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(FLAT_TABLE)?;
            for key in &keys {
                table.remove(key.as_str())?;
            }
        }
        write_txn.commit()?;
        Ok(keys.len())
    }

    /// True when neither table holds any entry.
    pub fn is_empty(&self) -> Result<bool> {
        let read_txn = self.db.begin_read()?;
        let records = read_txn.open_table(RECORDS_TABLE)?;
        let flat = read_txn.open_table(FLAT_TABLE)?;
        Ok(records.len()? == 0 && flat.len()? == 0)
    }
}
