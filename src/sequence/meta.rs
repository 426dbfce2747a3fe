use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::schema::SequenceSchema;
use crate::value::{OrderedKey, Ref};

use super::SequenceNode;

/// `(child-ref, boundary key, leaf count)` — spec §3/GLOSSARY.
///
/// A tuple logically owns the subtree reachable via `child_ref`; it is
/// physically read through a [`crate::store::ValueReader`] on demand. It may
/// also cache a strong reference to an in-memory child — a chunk built by
/// the chunker in this run that has not (yet) round-tripped through the
/// store, kept around so a cursor walking the fresh tree doesn't need an
/// async fetch for a node it already has in hand.
#[derive(Clone, Serialize, Deserialize)]
pub struct MetaTuple<S: SequenceSchema> {
    pub child_ref: Ref,
    pub key: OrderedKey<S::Key>,
    pub num_leaves: u64,

    #[serde(skip)]
    pub cached_child: Option<Arc<SequenceNode<S>>>,
}

impl<S: SequenceSchema> MetaTuple<S> {
    pub fn new(child_ref: Ref, key: OrderedKey<S::Key>, num_leaves: u64) -> Self {
        MetaTuple {
            child_ref,
            key,
            num_leaves,
            cached_child: None,
        }
    }

    pub fn with_cached_child(mut self, child: Arc<SequenceNode<S>>) -> Self {
        self.cached_child = Some(child);
        self
    }
}

/// Immutable vector of [`MetaTuple`]s — spec §3.
///
/// `offsets[i] = sum(items[0..i].num_leaves)`, precomputed at construction;
/// `is_meta = true`, `length = items.len()`, `num_leaves = offsets.last()`,
/// `cumulative_number_of_leaves(i) = offsets[i]`.
#[derive(Clone, Serialize, Deserialize)]
#[serde(bound = "S::Key: Serialize + serde::de::DeserializeOwned")]
pub struct MetaSequence<S: SequenceSchema> {
    items: Vec<MetaTuple<S>>,
    offsets: Vec<u64>,
}

impl<S: SequenceSchema> MetaSequence<S> {
    pub fn new(items: Vec<MetaTuple<S>>) -> Self {
        let mut offsets = Vec::with_capacity(items.len());
        let mut running = 0u64;
        for item in &items {
            running += item.num_leaves;
            offsets.push(running);
        }
        MetaSequence { items, offsets }
    }

    pub fn items(&self) -> &[MetaTuple<S>] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn num_leaves(&self) -> u64 {
        self.offsets.last().copied().unwrap_or(0)
    }

    pub fn cumulative_number_of_leaves(&self, i: usize) -> u64 {
        self.offsets[i]
    }

    /// Leaves reachable strictly before child `i`.
    pub fn leaves_before(&self, i: usize) -> u64 {
        if i == 0 { 0 } else { self.offsets[i - 1] }
    }

    pub fn get_key(&self, i: usize) -> OrderedKey<S::Key> {
        self.items[i].key.clone()
    }

    /// Binary search for the smallest `i` with `idx < cumulative_number_of_leaves(i)`.
    pub fn search_by_index(&self, idx: u64) -> usize {
        match self.offsets.binary_search_by(|cum| {
            if *cum > idx {
                std::cmp::Ordering::Greater
            } else {
                std::cmp::Ordering::Less
            }
        }) {
            Ok(i) | Err(i) => i.min(self.items.len().saturating_sub(1)),
        }
    }

    /// Binary search for the smallest `i` with `get_key(i).compare(key) >= 0`.
    pub fn search_by_key(&self, key: &OrderedKey<S::Key>) -> Option<usize> {
        let mut lo = 0usize;
        let mut hi = self.items.len();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.items[mid].key.compare(key) != std::cmp::Ordering::Less {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        if lo < self.items.len() { Some(lo) } else { None }
    }
}
