use serde::{Deserialize, Serialize};

use crate::schema::SequenceSchema;
use crate::value::OrderedKey;

/// Immutable vector of items `items[0..n)` — spec §3.
///
/// `num_leaves = n`, `is_meta = false`, `cumulative_number_of_leaves(i) = i`,
/// `get_child_sequence(i) = None`: a leaf is always the bottom of the tree.
#[derive(Clone, Serialize, Deserialize)]
#[serde(bound = "S::Item: Serialize + serde::de::DeserializeOwned")]
pub struct LeafSequence<S: SequenceSchema> {
    items: Vec<S::Item>,
}

impl<S: SequenceSchema> LeafSequence<S> {
    pub fn new(items: Vec<S::Item>) -> Self {
        LeafSequence { items }
    }

    pub fn items(&self) -> &[S::Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn num_leaves(&self) -> u64 {
        self.items.len() as u64
    }

    pub fn cumulative_number_of_leaves(&self, i: usize) -> u64 {
        i as u64
    }

    /// `getKey(i)` — for indexed schemas this is the local position (global
    /// position is reconstructed by the cursor); for ordered schemas it is
    /// derived from the item's content.
    pub fn get_key(&self, i: usize) -> OrderedKey<S::Key> {
        if S::INDEXED {
            S::index_key(i as u64)
        } else {
            S::item_key(&self.items[i])
        }
    }

    pub fn get(&self, i: usize) -> &S::Item {
        &self.items[i]
    }
}
