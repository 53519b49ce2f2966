//! Record store backed by object storage.
//!
//! Each document lives at `{table}/{id}.json` on the provider, so a `put`
//! maps to a single object PUT and inherits the store's per-key atomicity.
//! Ids must therefore be object-key safe; the pipeline's deterministic id
//! derivation guarantees this.

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use snafu::prelude::*;

use crate::error::{StoreDecodeSnafu, StoreError, StoreSerializeSnafu, StoreStorageSnafu};
use crate::storage::StorageProviderRef;

use super::RecordStore;

/// A `RecordStore` persisting one JSON object per key.
#[derive(Debug, Clone)]
pub struct ObjectRecordStore {
    storage: StorageProviderRef,
}

impl ObjectRecordStore {
    pub fn new(storage: StorageProviderRef) -> Self {
        Self { storage }
    }

    fn key_for(table: &str, id: &str) -> String {
        format!("{table}/{id}.json")
    }
}

#[async_trait]
impl RecordStore for ObjectRecordStore {
    async fn put(&self, table: &str, id: &str, document: Value) -> Result<(), StoreError> {
        let body = serde_json::to_vec(&document).context(StoreSerializeSnafu { table, id })?;
        self.storage
            .put(&Self::key_for(table, id), Bytes::from(body))
            .await
            .context(StoreStorageSnafu)
    }

    async fn get(&self, table: &str, id: &str) -> Result<Option<Value>, StoreError> {
        match self.storage.get(&Self::key_for(table, id)).await {
            Ok(bytes) => {
                let document =
                    serde_json::from_slice(&bytes).context(StoreDecodeSnafu { table, id })?;
                Ok(Some(document))
            }
            Err(e) if e.is_not_found() => Ok(None),
            Err(source) => Err(StoreError::StoreStorage { source }),
        }
    }

    async fn scan(&self, table: &str) -> Result<Vec<Value>, StoreError> {
        let keys = self
            .storage
            .list(Some(table))
            .await
            .context(StoreStorageSnafu)?;

        let mut documents = Vec::with_capacity(keys.len());
        for key in keys {
            let bytes = self.storage.get(&key).await.context(StoreStorageSnafu)?;
            let document = serde_json::from_slice(&bytes).context(StoreDecodeSnafu {
                table,
                id: key.as_str(),
            })?;
            documents.push(document);
        }
        Ok(documents)
    }
}
