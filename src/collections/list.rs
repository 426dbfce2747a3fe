//! `List<V>`: an ordered, indexed sequence of values — spec §4.7.

use std::fmt;
use std::sync::Arc;

use crate::chunker::chunk_sequence;
use crate::error::CoreError;
use crate::hash::ChunkConfig;
use crate::schema::ListSchema;
use crate::sequence::SequenceNode;
use crate::store::ValueReadWriter;
use crate::value::Value;

use super::collect_all;

/// An immutable-by-value, content-addressed list. Every mutating method
/// returns a new root built in the caller's store; nothing is ever edited in
/// place.
pub struct List<V, R> {
    store: R,
    config: ChunkConfig,
    root: Arc<SequenceNode<ListSchema<V>>>,
}

impl<V, R> List<V, R>
where
    V: Value + serde::Serialize + serde::de::DeserializeOwned,
    R: ValueReadWriter<SequenceNode<ListSchema<V>>>,
{
    /// An empty list. Building the canonical empty root needs no store
    /// access, so this is the one constructor that isn't async.
    pub fn new(store: R, config: ChunkConfig) -> Self {
        List {
            store,
            config,
            root: Arc::new(SequenceNode::Leaf(crate::sequence::LeafSequence::new(
                Vec::new(),
            ))),
        }
    }

    pub async fn from_iter(
        store: R,
        config: ChunkConfig,
        items: impl IntoIterator<Item = V>,
    ) -> Result<Self, CoreError> {
        let root = chunk_sequence(&store, config, items).await?;
        Ok(List { store, config, root })
    }

    pub fn len(&self) -> u64 {
        self.root.num_leaves()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub async fn get(&self, index: u64) -> Result<Option<V>, CoreError> {
        if index >= self.len() {
            return Ok(None);
        }
        let cursor = crate::cursor::SequenceCursor::new_cursor_at_index(
            self.root.clone(),
            index,
            &self.store,
        )
        .await?;
        Ok(cursor.current_item().cloned())
    }

    pub async fn to_vec(&self) -> Result<Vec<V>, CoreError> {
        collect_all(&self.root, &self.store).await
    }

    /// Replaces `items[start..start + delete_count]` with `insert`, clamping
    /// `delete_count` to the list's length — spec §4.6/§4.7 `splice`.
    pub async fn splice(
        &mut self,
        start: u64,
        delete_count: u64,
        insert: Vec<V>,
    ) -> Result<(), CoreError> {
        let mut items = self.to_vec().await?;
        let start = (start as usize).min(items.len());
        let end = (start + delete_count as usize).min(items.len());
        items.splice(start..end, insert);
        self.root = chunk_sequence(&self.store, self.config, items).await?;
        Ok(())
    }

    pub async fn push(&mut self, value: V) -> Result<(), CoreError> {
        let len = self.len();
        self.splice(len, 0, vec![value]).await
    }

    pub fn store(&self) -> &R {
        &self.store
    }
}

impl<V, R> fmt::Debug for List<V, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("List")
            .field("num_leaves", &self.root.num_leaves())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    #[tokio::test]
    async fn from_iter_then_get_round_trips() {
        let store = MemoryStore::new();
        let list = List::from_iter(store, ChunkConfig::default(), 0..500u64)
            .await
            .unwrap();
        assert_eq!(list.len(), 500);
        assert_eq!(list.get(0).await.unwrap(), Some(0));
        assert_eq!(list.get(499).await.unwrap(), Some(499));
        assert_eq!(list.get(500).await.unwrap(), None);
    }

    #[tokio::test]
    async fn splice_inserts_and_deletes() {
        let store = MemoryStore::new();
        let mut list = List::from_iter(store, ChunkConfig::default(), vec![1, 2, 3, 4, 5])
            .await
            .unwrap();
        list.splice(1, 2, vec![20, 30, 40]).await.unwrap();
        assert_eq!(list.to_vec().await.unwrap(), vec![1, 20, 30, 40, 4, 5]);
    }

    #[tokio::test]
    async fn push_appends_one_item_at_a_time() {
        let store = MemoryStore::new();
        let mut list = List::new(store, ChunkConfig::default());
        for i in 0..50u64 {
            list.push(i).await.unwrap();
        }
        assert_eq!(list.len(), 50);
        assert_eq!(list.to_vec().await.unwrap(), (0..50u64).collect::<Vec<_>>());
    }
}
