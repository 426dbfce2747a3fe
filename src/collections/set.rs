//! `Set<V>`: an ordered collection of unique values — spec §4.7.

use std::fmt;
use std::sync::Arc;

use crate::chunker::chunk_sequence;
use crate::error::CoreError;
use crate::hash::ChunkConfig;
use crate::schema::SetSchema;
use crate::sequence::SequenceNode;
use crate::store::ValueReadWriter;
use crate::value::{OrderedKey, Value};

use super::collect_all;

pub struct Set<V, R> {
    store: R,
    config: ChunkConfig,
    root: Arc<SequenceNode<SetSchema<V>>>,
}

impl<V, R> Set<V, R>
where
    V: Value + serde::Serialize + serde::de::DeserializeOwned,
    R: ValueReadWriter<SequenceNode<SetSchema<V>>>,
{
    pub fn new(store: R, config: ChunkConfig) -> Self {
        Set {
            store,
            config,
            root: Arc::new(SequenceNode::Leaf(crate::sequence::LeafSequence::new(
                Vec::new(),
            ))),
        }
    }

    /// Builds a set from values, silently collapsing duplicates — spec §4.7.
    pub async fn from_iter(
        store: R,
        config: ChunkConfig,
        values: impl IntoIterator<Item = V>,
    ) -> Result<Self, CoreError> {
        let mut sorted: Vec<V> = values.into_iter().collect();
        sorted.sort();
        sorted.dedup();
        let root = chunk_sequence(&store, config, sorted).await?;
        Ok(Set { store, config, root })
    }

    pub fn len(&self) -> u64 {
        self.root.num_leaves()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub async fn contains(&self, value: &V) -> Result<bool, CoreError> {
        if self.root.is_empty() {
            return Ok(false);
        }
        let wanted = OrderedKey::new(value.clone());
        let cursor = crate::cursor::SequenceCursor::new_cursor_at_key(
            self.root.clone(),
            Some(&wanted),
            false,
            false,
            &self.store,
        )
        .await?;
        Ok(matches!(cursor.current_item(), Some(v) if v == value))
    }

    pub async fn to_vec(&self) -> Result<Vec<V>, CoreError> {
        collect_all(&self.root, &self.store).await
    }

    /// Returns `true` if `value` was newly inserted.
    pub async fn insert(&mut self, value: V) -> Result<bool, CoreError> {
        let mut items = self.to_vec().await?;
        match items.binary_search(&value) {
            Ok(_) => Ok(false),
            Err(i) => {
                items.insert(i, value);
                self.root = chunk_sequence(&self.store, self.config, items).await?;
                Ok(true)
            }
        }
    }

    /// Returns `true` if `value` was present and removed.
    pub async fn remove(&mut self, value: &V) -> Result<bool, CoreError> {
        let mut items = self.to_vec().await?;
        match items.binary_search(value) {
            Ok(i) => {
                items.remove(i);
                self.root = chunk_sequence(&self.store, self.config, items).await?;
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }

    pub fn store(&self) -> &R {
        &self.store
    }
}

impl<V, R> fmt::Debug for Set<V, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Set")
            .field("num_leaves", &self.root.num_leaves())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    #[tokio::test]
    async fn from_iter_collapses_duplicates() {
        let store = MemoryStore::new();
        let set = Set::from_iter(store, ChunkConfig::default(), vec![3, 1, 2, 1, 3])
            .await
            .unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.to_vec().await.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn insert_and_remove() {
        let store = MemoryStore::new();
        let mut set = Set::new(store, ChunkConfig::default());
        assert!(set.insert(5).await.unwrap());
        assert!(!set.insert(5).await.unwrap());
        assert!(set.contains(&5).await.unwrap());
        assert!(set.remove(&5).await.unwrap());
        assert!(!set.contains(&5).await.unwrap());
    }
}
