//! Rebuilds a sequence's chunk tree from a stream of items, writing each
//! completed chunk as its boundary is crossed — spec §4.6.
//!
//! Grounded in the teacher's `PtNode::chunk_and_save` (`pt.rs`): feed each
//! item's bytes to a rolling hasher, close a chunk when the hasher reports a
//! boundary, and persist it immediately. This module generalizes that single
//! flat pass into the full multi-level cascade the original Noms chunker
//! describes (spec §9): closing a chunk at level `L` appends a `MetaTuple`
//! to level `L+1`, which can itself cross a boundary and cascade further up.
//!
//! The one piece of the original algorithm this module does not attempt is
//! `advanceTo`'s logarithmic reuse of untouched subtrees across a splice —
//! see `DESIGN.md` for why a full replay was chosen instead. Because chunk
//! boundaries are a pure function of byte content (§4.2's determinism
//! invariant), replaying every surviving item still reproduces byte-identical
//! chunks and refs; it is only asymptotically worse, not incorrect.

use std::sync::Arc;

use crate::error::ChunkerError;
use crate::hash::{ChunkConfig, RollingValueHasher};
use crate::schema::SequenceSchema;
use crate::sequence::{LeafSequence, MetaSequence, MetaTuple, SequenceNode};
use crate::store::ValueReadWriter;

enum PendingLevel<S: SequenceSchema> {
    Leaf {
        hasher: RollingValueHasher,
        items: Vec<S::Item>,
    },
    Meta {
        hasher: RollingValueHasher,
        items: Vec<MetaTuple<S>>,
    },
}

impl<S: SequenceSchema> PendingLevel<S> {
    fn is_empty(&self) -> bool {
        match self {
            PendingLevel::Leaf { items, .. } => items.is_empty(),
            PendingLevel::Meta { items, .. } => items.is_empty(),
        }
    }

    fn reset_hasher(&mut self) {
        match self {
            PendingLevel::Leaf { hasher, .. } => hasher.reset(),
            PendingLevel::Meta { hasher, .. } => hasher.reset(),
        }
    }
}

/// Incrementally rebuilds a tree's chunk structure, level by level, from a
/// stream of leaf items — spec §4.6.
pub struct SequenceChunker<S: SequenceSchema> {
    config: ChunkConfig,
    levels: Vec<PendingLevel<S>>,
    /// Absolute ordinal of the next item to be appended at level 0, used to
    /// derive an indexed schema's boundary key without holding the item.
    next_leaf_index: u64,
}

impl<S: SequenceSchema> SequenceChunker<S> {
    pub fn new(config: ChunkConfig) -> Self {
        SequenceChunker {
            config,
            levels: vec![PendingLevel::Leaf {
                hasher: RollingValueHasher::for_level(config, 0),
                items: Vec::new(),
            }],
            next_leaf_index: 0,
        }
    }

    /// Appends one leaf item, closing (and persisting) the current chunk —
    /// and cascading into parent levels — if this item crosses a boundary.
    pub async fn append<R>(&mut self, store: &R, item: S::Item) -> Result<(), ChunkerError>
    where
        R: ValueReadWriter<SequenceNode<S>>,
    {
        let mut buf = Vec::new();
        S::write_item_bytes(&item, &mut buf);

        let crossed = {
            let PendingLevel::Leaf { hasher, items } = &mut self.levels[0] else {
                unreachable!("level 0 is always the leaf level")
            };
            items.push(item);
            hasher.hash_raw(&buf);
            hasher.crossed_boundary()
        };
        self.next_leaf_index += 1;

        if crossed {
            self.flush_level(store, 0).await?;
        }
        Ok(())
    }

    /// Closes the pending chunk at `level`, persists it, and folds the
    /// resulting `MetaTuple` into `level + 1` — cascading further up if that
    /// also crosses a boundary.
    fn flush_level<'a, R>(
        &'a mut self,
        store: &'a R,
        level: usize,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), ChunkerError>> + 'a>>
    where
        R: ValueReadWriter<SequenceNode<S>>,
    {
        Box::pin(async move {
            let (node, key, num_leaves) = match &mut self.levels[level] {
                PendingLevel::Leaf { items, .. } => {
                    let taken = std::mem::take(items);
                    let n = taken.len() as u64;
                    let start = self.next_leaf_index - n;
                    // Ordered schemas key a chunk by its *largest* item (spec
                    // §3): `search_by_key`/`new_cursor_at_key` pick the
                    // smallest tuple key >= target and descend with no
                    // fallback to the previous tuple, so a tuple keyed by its
                    // minimum would make every non-maximal key in that chunk
                    // un-findable once more than one chunk exists.
                    let key = if S::INDEXED {
                        S::index_key(start)
                    } else {
                        S::item_key(taken.last().expect("just-flushed chunk is non-empty"))
                    };
                    (SequenceNode::Leaf(LeafSequence::new(taken)), key, n)
                }
                PendingLevel::Meta { items, .. } => {
                    let taken = std::mem::take(items);
                    let n: u64 = taken.iter().map(|t| t.num_leaves).sum();
                    let key = taken
                        .last()
                        .expect("just-flushed chunk is non-empty")
                        .key
                        .clone();
                    (SequenceNode::Meta(MetaSequence::new(taken)), key, n)
                }
            };
            self.levels[level].reset_hasher();

            let height = level as u32;
            let child_ref = store.write_value(&node, height).await?;
            tracing::trace!(height, num_leaves, hash = ?child_ref.target_hash, "closed chunk");
            let tuple = MetaTuple::new(child_ref, key, num_leaves).with_cached_child(Arc::new(node));

            if self.levels.len() == level + 1 {
                self.levels.push(PendingLevel::Meta {
                    hasher: RollingValueHasher::for_level(self.config, (level + 1) as u32),
                    items: Vec::new(),
                });
            }

            let mut buf = Vec::new();
            buf.extend_from_slice(tuple.child_ref.target_hash.as_bytes());
            match tuple.key.value() {
                Some(k) => {
                    if let Ok(bytes) = postcard::to_stdvec(k) {
                        buf.extend_from_slice(&bytes);
                    }
                }
                None => {
                    if let crate::value::OrderedKey::Hash(h) = &tuple.key {
                        buf.extend_from_slice(h.as_bytes());
                    }
                }
            }

            let crossed = {
                let PendingLevel::Meta { hasher, items } = &mut self.levels[level + 1] else {
                    unreachable!("level above a flushed level is always a meta level")
                };
                items.push(tuple);
                hasher.hash_raw(&buf);
                hasher.crossed_boundary()
            };
            if crossed {
                self.flush_level(store, level + 1).await?;
            }
            Ok(())
        })
    }

    /// Finalizes the tree: force-flushes every level's remaining pending
    /// content bottom-up, then collapses any chain of single-child meta
    /// nodes at the top — spec §4.6 `Done`.
    ///
    /// The very top chunk is deliberately left unwritten (the "unwrittenCol"
    /// behavior from spec §9): whether it ever needs a persisted `Ref`
    /// depends on what the caller does with it, so writing eagerly here
    /// would risk persisting chunks nothing ends up referencing.
    pub async fn done<R>(mut self, store: &R) -> Result<Arc<SequenceNode<S>>, ChunkerError>
    where
        R: ValueReadWriter<SequenceNode<S>>,
    {
        // Flush every level except whatever ends up being the topmost one —
        // that one is left as the (unwritten) root. `flush_level` can push
        // new, initially-empty levels and can itself cascade a forced flush
        // into the level above, so re-checking `self.levels.len()` each
        // iteration is what lets this loop track a growing stack correctly.
        let mut level = 0;
        while level + 1 < self.levels.len() {
            if !self.levels[level].is_empty() {
                self.flush_level(store, level).await?;
            }
            level += 1;
        }

        let top = self.levels.pop().expect("at least one level always exists");
        let mut root = match top {
            PendingLevel::Leaf { items, .. } => SequenceNode::Leaf(LeafSequence::new(items)),
            PendingLevel::Meta { items, .. } => {
                if items.is_empty() {
                    SequenceNode::Leaf(LeafSequence::new(Vec::new()))
                } else {
                    SequenceNode::Meta(MetaSequence::new(items))
                }
            }
        };

        // Collapse a chain of single-child meta nodes: a root with exactly
        // one child is exactly as tall as it needs to be one level shorter.
        loop {
            let collapsed = match &root {
                SequenceNode::Meta(m) if m.len() == 1 => m.items()[0].cached_child.clone(),
                _ => None,
            };
            match collapsed {
                Some(child) => root = Arc::try_unwrap(child).unwrap_or_else(|arc| (*arc).clone()),
                None => break,
            }
        }

        Ok(Arc::new(root))
    }
}

/// Builds a complete tree from a fresh stream of items — spec §4.6
/// `chunkSequence`, the common case used by a collection's constructors and
/// by `splice` (which replays the untouched prefix/suffix plus the edit).
#[tracing::instrument(skip(store, items))]
pub async fn chunk_sequence<S, R, I>(
    store: &R,
    config: ChunkConfig,
    items: I,
) -> Result<Arc<SequenceNode<S>>, ChunkerError>
where
    S: SequenceSchema,
    R: ValueReadWriter<SequenceNode<S>>,
    I: IntoIterator<Item = S::Item>,
{
    let mut chunker = SequenceChunker::<S>::new(config);
    for item in items {
        chunker.append(store, item).await?;
    }
    chunker.done(store).await
}
