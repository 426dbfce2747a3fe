//! An in-memory [`ValueReader`]/[`ValueReadWriter`], used by every unit test
//! in this crate and a fine starting point for embedding the core in a
//! process that does not need durability.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StoreError;
use crate::value::{ContentHash, Ref};

use super::{ValueReader, ValueReadWriter};

/// Cheaply `Clone`able: every clone shares the same backing map, so a
/// [`crate::collections::Blob::reader`] can hand out an independent reader
/// over the same chunks without the caller needing to wrap the store in an
/// `Arc` itself.
pub struct MemoryStore<T> {
    chunks: Arc<RwLock<HashMap<ContentHash, Vec<u8>>>>,
    _marker: std::marker::PhantomData<T>,
}

impl<T> Clone for MemoryStore<T> {
    fn clone(&self) -> Self {
        MemoryStore {
            chunks: self.chunks.clone(),
            _marker: std::marker::PhantomData,
        }
    }
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        MemoryStore {
            chunks: Arc::new(RwLock::new(HashMap::new())),
            _marker: std::marker::PhantomData,
        }
    }
}

impl<T> MemoryStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.chunks.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.chunks.read().unwrap().contains_key(hash)
    }
}

#[async_trait]
impl<T> ValueReader<T> for MemoryStore<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn read_value(&self, hash: ContentHash) -> Result<Option<T>, StoreError> {
        let guard = self.chunks.read().unwrap();
        match guard.get(&hash) {
            Some(bytes) => Ok(Some(postcard::from_bytes(bytes)?)),
            None => Ok(None),
        }
    }

    fn read_value_sync(&self, hash: ContentHash) -> Option<T> {
        let guard = self.chunks.read().unwrap();
        guard
            .get(&hash)
            .and_then(|bytes| postcard::from_bytes(bytes).ok())
    }
}

#[async_trait]
impl<T> ValueReadWriter<T> for MemoryStore<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn write_value(&self, value: &T, height: u32) -> Result<Ref, StoreError> {
        let encoded = postcard::to_stdvec(value)?;
        let target_hash = ContentHash::of_bytes(&encoded);

        let mut guard = self.chunks.write().unwrap();
        let is_new = !guard.contains_key(&target_hash);
        guard.entry(target_hash).or_insert(encoded);
        tracing::trace!(hash = ?target_hash, height, is_new, "wrote chunk");

        Ok(Ref {
            target_hash,
            height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let store: MemoryStore<String> = MemoryStore::new();
        let r = store.write_value(&"hello".to_string(), 0).await.unwrap();
        let back = store.read_value(r.target_hash).await.unwrap();
        assert_eq!(back, Some("hello".to_string()));
    }

    #[tokio::test]
    async fn write_is_idempotent_by_content_hash() {
        let store: MemoryStore<String> = MemoryStore::new();
        let r1 = store.write_value(&"x".to_string(), 0).await.unwrap();
        let r2 = store.write_value(&"x".to_string(), 0).await.unwrap();
        assert_eq!(r1.target_hash, r2.target_hash);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn missing_ref_reads_as_none() {
        let store: MemoryStore<String> = MemoryStore::new();
        let missing = ContentHash::of_bytes(b"never written");
        assert_eq!(store.read_value(missing).await.unwrap(), None);
    }
}
