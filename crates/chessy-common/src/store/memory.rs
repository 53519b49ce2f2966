//! In-memory record store for tests and local runs.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::StoreError;

use super::RecordStore;

/// A `RecordStore` backed by a process-local map.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    tables: Mutex<HashMap<String, HashMap<String, Value>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently in a table.
    pub fn len(&self, table: &str) -> usize {
        self.tables
            .lock()
            .expect("record store lock poisoned")
            .get(table)
            .map_or(0, HashMap::len)
    }

    pub fn is_empty(&self, table: &str) -> bool {
        self.len(table) == 0
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn put(&self, table: &str, id: &str, document: Value) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().expect("record store lock poisoned");
        tables
            .entry(table.to_string())
            .or_default()
            .insert(id.to_string(), document);
        Ok(())
    }

    async fn get(&self, table: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let tables = self.tables.lock().expect("record store lock poisoned");
        Ok(tables.get(table).and_then(|t| t.get(id)).cloned())
    }

    async fn scan(&self, table: &str) -> Result<Vec<Value>, StoreError> {
        let tables = self.tables.lock().expect("record store lock poisoned");
        Ok(tables
            .get(table)
            .map(|t| t.values().cloned().collect())
            .unwrap_or_default())
    }
}
