//! The record store contract.
//!
//! The pipeline persists everything through this put/get/scan interface,
//! keyed by an opaque string `id` within a named logical table. Writes are
//! full-document upserts: repeating a write with the same id overwrites
//! rather than duplicates, which is what makes at-least-once delivery safe
//! downstream.

mod memory;
mod object;

pub use memory::MemoryRecordStore;
pub use object::ObjectRecordStore;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::error::StoreError;

/// A reference-counted record store handle.
pub type RecordStoreRef = Arc<dyn RecordStore>;

/// Key-value persistence contract with five logical tables.
///
/// The store's only atomicity guarantee is per-key: a `put` either fully
/// replaces the document at `(table, id)` or fails. The pipeline relies on
/// nothing stronger.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Idempotent upsert of a JSON document at `(table, id)`.
    async fn put(&self, table: &str, id: &str, document: Value) -> Result<(), StoreError>;

    /// Fetch the document at `(table, id)`, or `None` if absent.
    async fn get(&self, table: &str, id: &str) -> Result<Option<Value>, StoreError>;

    /// Return every document in the table (unordered).
    async fn scan(&self, table: &str) -> Result<Vec<Value>, StoreError>;
}
