//! `Map<K, V>`: an ordered key-value collection, sorted by key — spec §4.7.

use std::fmt;
use std::sync::Arc;

use crate::chunker::chunk_sequence;
use crate::error::CoreError;
use crate::hash::ChunkConfig;
use crate::schema::MapSchema;
use crate::sequence::SequenceNode;
use crate::store::ValueReadWriter;
use crate::value::{OrderedKey, Value};

use super::collect_all;

pub struct Map<K, V, R> {
    store: R,
    config: ChunkConfig,
    root: Arc<SequenceNode<MapSchema<K, V>>>,
}

impl<K, V, R> Map<K, V, R>
where
    K: Value + serde::Serialize + serde::de::DeserializeOwned,
    V: Clone + Send + Sync + 'static + serde::Serialize + serde::de::DeserializeOwned,
    R: ValueReadWriter<SequenceNode<MapSchema<K, V>>>,
{
    pub fn new(store: R, config: ChunkConfig) -> Self {
        Map {
            store,
            config,
            root: Arc::new(SequenceNode::Leaf(crate::sequence::LeafSequence::new(
                Vec::new(),
            ))),
        }
    }

    /// Builds a map from `(key, value)` pairs, later duplicates winning —
    /// spec §4.7 "duplicate collapse on construction".
    pub async fn from_pairs(
        store: R,
        config: ChunkConfig,
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Self, CoreError> {
        let mut sorted: Vec<(K, V)> = pairs.into_iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        sorted.dedup_by(|a, b| {
            if a.0 == b.0 {
                std::mem::swap(a, b);
                true
            } else {
                false
            }
        });
        let root = chunk_sequence(&store, config, sorted).await?;
        Ok(Map { store, config, root })
    }

    pub fn len(&self) -> u64 {
        self.root.num_leaves()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub async fn get(&self, key: &K) -> Result<Option<V>, CoreError> {
        if self.root.is_empty() {
            return Ok(None);
        }
        let wanted = OrderedKey::new(key.clone());
        let cursor = crate::cursor::SequenceCursor::new_cursor_at_key(
            self.root.clone(),
            Some(&wanted),
            false,
            false,
            &self.store,
        )
        .await?;
        match cursor.current_item() {
            Some((k, v)) if k == key => Ok(Some(v.clone())),
            _ => Ok(None),
        }
    }

    pub async fn contains_key(&self, key: &K) -> Result<bool, CoreError> {
        Ok(self.get(key).await?.is_some())
    }

    pub async fn to_vec(&self) -> Result<Vec<(K, V)>, CoreError> {
        collect_all(&self.root, &self.store).await
    }

    /// Inserts or overwrites `key`, returning the value it replaced, if any.
    pub async fn insert(&mut self, key: K, value: V) -> Result<Option<V>, CoreError> {
        let mut items = self.to_vec().await?;
        let pos = items.binary_search_by(|(k, _)| k.cmp(&key));
        let old = match pos {
            Ok(i) => {
                let old = items[i].1.clone();
                items[i] = (key, value);
                Some(old)
            }
            Err(i) => {
                items.insert(i, (key, value));
                None
            }
        };
        self.root = chunk_sequence(&self.store, self.config, items).await?;
        Ok(old)
    }

    pub async fn remove(&mut self, key: &K) -> Result<Option<V>, CoreError> {
        let mut items = self.to_vec().await?;
        match items.binary_search_by(|(k, _)| k.cmp(key)) {
            Ok(i) => {
                let (_, v) = items.remove(i);
                self.root = chunk_sequence(&self.store, self.config, items).await?;
                Ok(Some(v))
            }
            Err(_) => Ok(None),
        }
    }

    pub fn store(&self) -> &R {
        &self.store
    }

    pub fn root(&self) -> &Arc<SequenceNode<MapSchema<K, V>>> {
        &self.root
    }
}

impl<K, V, R> fmt::Debug for Map<K, V, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Map")
            .field("num_leaves", &self.root.num_leaves())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    #[tokio::test]
    async fn later_duplicate_wins_on_construction() {
        let store = MemoryStore::new();
        let map = Map::from_pairs(
            store,
            ChunkConfig::default(),
            vec![("a".to_string(), 1), ("b".to_string(), 2), ("a".to_string(), 99)],
        )
        .await
        .unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&"a".to_string()).await.unwrap(), Some(99));
    }

    #[tokio::test]
    async fn insert_and_remove_round_trip() {
        let store = MemoryStore::new();
        let mut map: Map<String, i32, _> = Map::new(store, ChunkConfig::default());
        for i in 0..100 {
            map.insert(format!("key-{:04}", i), i).await.unwrap();
        }
        assert_eq!(map.len(), 100);
        assert_eq!(map.get(&"key-0050".to_string()).await.unwrap(), Some(50));

        let removed = map.remove(&"key-0050".to_string()).await.unwrap();
        assert_eq!(removed, Some(50));
        assert_eq!(map.get(&"key-0050".to_string()).await.unwrap(), None);
        assert_eq!(map.len(), 99);
    }
}
