//! Object storage abstraction.
//!
//! Provides a unified interface over `object_store` for the archive bucket
//! and the record store's backing location. Supports S3 (`s3://bucket/prefix`)
//! and the local filesystem (`file://path` or a plain path).

use bytes::Bytes;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::path::Path;
use object_store::prefix::PrefixStore;
use object_store::{ObjectStore, PutPayload};
use snafu::prelude::*;
use std::sync::Arc;

use crate::error::{InvalidUrlSnafu, IoSnafu, NotUtf8Snafu, ObjectStoreSnafu, S3ConfigSnafu, StorageError};

/// A reference-counted storage provider.
pub type StorageProviderRef = Arc<StorageProvider>;

/// Storage provider that abstracts over S3 and the local filesystem.
#[derive(Clone)]
pub struct StorageProvider {
    object_store: Arc<dyn ObjectStore>,
    canonical_url: String,
}

impl std::fmt::Debug for StorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StorageProvider<{}>", self.canonical_url)
    }
}

impl StorageProvider {
    /// Create a storage provider for the given URL.
    ///
    /// Credentials and region for S3 are taken from the environment, the
    /// way the deployment injects them; they are never part of the URL.
    pub async fn for_url(url: &str) -> Result<Self, StorageError> {
        if let Some(rest) = url.strip_prefix("s3://") {
            Self::construct_s3(url, rest)
        } else {
            let path = url.strip_prefix("file://").unwrap_or(url);
            ensure!(!path.is_empty(), InvalidUrlSnafu { url });
            Self::construct_local(path).await
        }
    }

    fn construct_s3(url: &str, rest: &str) -> Result<Self, StorageError> {
        let (bucket, key_prefix) = match rest.split_once('/') {
            Some((bucket, key)) => (bucket, Some(key.trim_end_matches('/'))),
            None => (rest, None),
        };
        ensure!(!bucket.is_empty(), InvalidUrlSnafu { url });

        let store = AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .build()
            .context(S3ConfigSnafu)?;

        let object_store: Arc<dyn ObjectStore> = match key_prefix.filter(|p| !p.is_empty()) {
            Some(prefix) => Arc::new(PrefixStore::new(store, Path::from(prefix))),
            None => Arc::new(store),
        };

        Ok(Self {
            object_store,
            canonical_url: url.to_string(),
        })
    }

    async fn construct_local(path: &str) -> Result<Self, StorageError> {
        tokio::fs::create_dir_all(path).await.context(IoSnafu)?;

        let object_store: Arc<dyn ObjectStore> =
            Arc::new(LocalFileSystem::new_with_prefix(path).context(ObjectStoreSnafu)?);

        Ok(Self {
            object_store,
            canonical_url: format!("file://{path}"),
        })
    }

    /// The canonical URL this provider was constructed from.
    pub fn url(&self) -> &str {
        &self.canonical_url
    }

    /// List object keys under the given prefix (or the root).
    ///
    /// Returns paths relative to the provider's configured prefix.
    pub async fn list(&self, prefix: Option<&str>) -> Result<Vec<String>, StorageError> {
        let prefix_path = prefix.map(Path::from);
        let objects: Vec<_> = self
            .object_store
            .list(prefix_path.as_ref())
            .try_collect()
            .await
            .context(ObjectStoreSnafu)?;

        Ok(objects
            .into_iter()
            .map(|meta| meta.location.to_string())
            .collect())
    }

    /// Fetch an object's full contents.
    pub async fn get(&self, key: &str) -> Result<Bytes, StorageError> {
        let result = self
            .object_store
            .get(&Path::from(key))
            .await
            .context(ObjectStoreSnafu)?;
        result.bytes().await.context(ObjectStoreSnafu)
    }

    /// Fetch an object and decode it as UTF-8 text.
    pub async fn get_string(&self, key: &str) -> Result<String, StorageError> {
        let bytes = self.get(key).await?;
        String::from_utf8(bytes.to_vec())
            .ok()
            .context(NotUtf8Snafu { path: key })
    }

    /// Write an object, replacing any existing contents atomically.
    pub async fn put(&self, key: &str, data: Bytes) -> Result<(), StorageError> {
        self.object_store
            .put(&Path::from(key), PutPayload::from(data))
            .await
            .context(ObjectStoreSnafu)?;
        Ok(())
    }

    /// Delete an object. Missing objects are not an error.
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        match self.object_store.delete(&Path::from(key)).await {
            Ok(()) => Ok(()),
            Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(source) => Err(StorageError::ObjectStore { source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_put_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageProvider::for_url(dir.path().to_str().unwrap())
            .await
            .unwrap();

        storage
            .put("archives/games.pgn", Bytes::from_static(b"[Event \"x\"]"))
            .await
            .unwrap();

        let text = storage.get_string("archives/games.pgn").await.unwrap();
        assert_eq!(text, "[Event \"x\"]");
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageProvider::for_url(dir.path().to_str().unwrap())
            .await
            .unwrap();

        let err = storage.get("nope.pgn").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_returns_relative_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageProvider::for_url(dir.path().to_str().unwrap())
            .await
            .unwrap();

        storage.put("a.pgn", Bytes::from_static(b"x")).await.unwrap();
        storage.put("b.pgn", Bytes::from_static(b"y")).await.unwrap();

        let mut keys = storage.list(None).await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["a.pgn", "b.pgn"]);
    }
}
