//! The prolly-tree's two node shapes plus the empty sentinel — spec §4.3,
//! §9 ("dynamic dispatch across Leaf/Meta/Empty sequences").

pub mod leaf;
pub mod meta;

pub use leaf::LeafSequence;
pub use meta::{MetaSequence, MetaTuple};

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::StoreError;
use crate::schema::SequenceSchema;
use crate::store::ValueReader;
use crate::value::OrderedKey;

/// A node of the tree: a leaf, a meta (internal) node, or the empty
/// sentinel used by the diff algorithm for zero-length slices of meta
/// sequences (per DESIGN NOTES §9).
#[derive(Clone, Serialize, Deserialize)]
#[serde(bound(
    serialize = "S::Item: Serialize, S::Key: Serialize",
    deserialize = "S::Item: serde::de::DeserializeOwned, S::Key: serde::de::DeserializeOwned"
))]
pub enum SequenceNode<S: SequenceSchema> {
    Leaf(LeafSequence<S>),
    Meta(MetaSequence<S>),
    Empty,
}

impl<S: SequenceSchema> SequenceNode<S> {
    pub fn is_meta(&self) -> bool {
        matches!(self, SequenceNode::Meta(_))
    }

    pub fn is_empty_sentinel(&self) -> bool {
        matches!(self, SequenceNode::Empty)
    }

    pub fn length(&self) -> usize {
        match self {
            SequenceNode::Leaf(l) => l.len(),
            SequenceNode::Meta(m) => m.len(),
            SequenceNode::Empty => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.length() == 0
    }

    pub fn num_leaves(&self) -> u64 {
        match self {
            SequenceNode::Leaf(l) => l.num_leaves(),
            SequenceNode::Meta(m) => m.num_leaves(),
            SequenceNode::Empty => 0,
        }
    }

    pub fn cumulative_number_of_leaves(&self, i: usize) -> u64 {
        match self {
            SequenceNode::Leaf(l) => l.cumulative_number_of_leaves(i),
            SequenceNode::Meta(m) => m.cumulative_number_of_leaves(i),
            SequenceNode::Empty => 0,
        }
    }

    pub fn get_key(&self, i: usize) -> OrderedKey<S::Key> {
        match self {
            SequenceNode::Leaf(l) => l.get_key(i),
            SequenceNode::Meta(m) => m.get_key(i),
            SequenceNode::Empty => panic!("get_key on empty sequence"),
        }
    }

    /// Lazily fetches the child sequence at index `i`, or `None` for a leaf
    /// (a leaf has no children) — spec §4.3.
    pub async fn get_child_sequence<R>(
        &self,
        store: &R,
        i: usize,
    ) -> Result<Option<Arc<SequenceNode<S>>>, StoreError>
    where
        R: ValueReader<SequenceNode<S>>,
    {
        match self {
            SequenceNode::Leaf(_) | SequenceNode::Empty => Ok(None),
            SequenceNode::Meta(m) => {
                let tuple = &m.items()[i];
                if let Some(cached) = &tuple.cached_child {
                    return Ok(Some(cached.clone()));
                }
                let hash = tuple.child_ref.target_hash;
                let node = store
                    .read_value(hash)
                    .await?
                    .ok_or(StoreError::MissingRef { hash })?;
                Ok(Some(Arc::new(node)))
            }
        }
    }

    /// Synchronous variant, legal only when the child is cached in memory
    /// (a fresh, not-yet-persisted chunk) — spec §4.3.
    pub fn get_child_sequence_sync(&self, i: usize) -> Option<Arc<SequenceNode<S>>> {
        match self {
            SequenceNode::Leaf(_) | SequenceNode::Empty => None,
            SequenceNode::Meta(m) => m.items()[i].cached_child.clone(),
        }
    }

    /// The leaf items in `[a, b)`, obtained by descending and concatenating
    /// — spec §4.3 `range`. Only meaningful on a leaf directly; meta-level
    /// ranging is done by the collection façades via the cursor.
    pub fn leaf_range(&self, a: usize, b: usize) -> &[S::Item] {
        match self {
            SequenceNode::Leaf(l) => &l.items()[a..b],
            _ => panic!("leaf_range called on a non-leaf sequence"),
        }
    }
}
