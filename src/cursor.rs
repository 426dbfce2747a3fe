//! Stack-of-frames cursor over a prolly-tree, with lazy async descent and a
//! synchronous in-chunk fast path — spec §4.4.
//!
//! Per DESIGN NOTES §9, the parent–child relationship is modeled as an
//! explicit `Vec<Frame>` indexed by depth rather than a frame owning a
//! back-pointer to its parent — frame `d`'s node is always the child of
//! frame `d-1` at `frame[d-1].idx`.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::error::CursorError;
use crate::schema::SequenceSchema;
use crate::sequence::SequenceNode;
use crate::store::ValueReader;
use crate::value::OrderedKey;

/// Sentinel for "before the first item".
pub const BEFORE_START: isize = -1;

struct Frame<S: SequenceSchema> {
    node: Arc<SequenceNode<S>>,
    /// Valid range is `0..length`; `BEFORE_START` and `length` are the two
    /// legal-but-invalid sentinels.
    idx: isize,
}

impl<S: SequenceSchema> Clone for Frame<S> {
    fn clone(&self) -> Self {
        Frame {
            node: self.node.clone(),
            idx: self.idx,
        }
    }
}

/// A cursor locating a single item in the tree, as a stack of
/// `(node, index)` frames — spec §4.4.
pub struct SequenceCursor<S: SequenceSchema> {
    frames: Vec<Frame<S>>,
}

impl<S: SequenceSchema> Clone for SequenceCursor<S> {
    fn clone(&self) -> Self {
        SequenceCursor {
            frames: self.frames.clone(),
        }
    }
}

impl<S: SequenceSchema> SequenceCursor<S> {
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    fn leaf_depth(&self) -> usize {
        self.frames.len() - 1
    }

    /// `0 <= idx < length` at the leaf frame.
    pub fn valid(&self) -> bool {
        let f = &self.frames[self.leaf_depth()];
        f.idx >= 0 && (f.idx as usize) < f.node.length()
    }

    pub fn idx(&self) -> isize {
        self.frames[self.leaf_depth()].idx
    }

    pub fn current_item(&self) -> Option<&S::Item> {
        if !self.valid() {
            return None;
        }
        let f = &self.frames[self.leaf_depth()];
        match f.node.as_ref() {
            SequenceNode::Leaf(l) => Some(l.get(f.idx as usize)),
            _ => None,
        }
    }

    /// Reconstructs the absolute leaf-ordinal position of the cursor from
    /// the cumulative counts carried by every meta frame above the leaf.
    pub fn global_index(&self) -> u64 {
        let mut total = 0u64;
        for d in 0..self.frames.len() - 1 {
            let f = &self.frames[d];
            if let SequenceNode::Meta(m) = f.node.as_ref() {
                if f.idx > 0 {
                    total += m.leaves_before(f.idx as usize);
                }
            }
        }
        let leaf = &self.frames[self.leaf_depth()];
        total + leaf.idx.max(0) as u64
    }

    /// Descends from `root` to the item at absolute position `idx` — spec
    /// §4.4 `newCursorAtIndex`.
    pub async fn new_cursor_at_index<R>(
        root: Arc<SequenceNode<S>>,
        idx: u64,
        store: &R,
    ) -> Result<Self, CursorError>
    where
        R: ValueReader<SequenceNode<S>>,
    {
        let mut frames = Vec::new();
        let mut node = root;
        let mut remaining = idx;

        loop {
            match node.as_ref() {
                SequenceNode::Meta(m) => {
                    let i = m.search_by_index(remaining);
                    let before = m.leaves_before(i);
                    frames.push(Frame {
                        node: node.clone(),
                        idx: i as isize,
                    });
                    remaining -= before;
                    let child = node
                        .get_child_sequence(store, i)
                        .await?
                        .expect("meta child must exist");
                    node = child;
                }
                SequenceNode::Leaf(l) => {
                    // Clamp to the last item rather than past-end, per §4.4.
                    let i = (remaining as usize).min(l.len().saturating_sub(1));
                    frames.push(Frame {
                        node: node.clone(),
                        idx: i as isize,
                    });
                    break;
                }
                SequenceNode::Empty => {
                    frames.push(Frame {
                        node: node.clone(),
                        idx: BEFORE_START,
                    });
                    break;
                }
            }
        }

        Ok(SequenceCursor { frames })
    }

    /// Descends from `root` to the first item whose key is `>= key` — spec
    /// §4.4 `newCursorAtKey`. If `last` is true and `key` is `None`,
    /// descends rightmost. `for_insertion` relaxes the "not found" case so
    /// an insertion point past all existing keys can still be located.
    pub async fn new_cursor_at_key<R>(
        root: Arc<SequenceNode<S>>,
        key: Option<&OrderedKey<S::Key>>,
        for_insertion: bool,
        last: bool,
        store: &R,
    ) -> Result<Self, CursorError>
    where
        R: ValueReader<SequenceNode<S>>,
    {
        let mut frames = Vec::new();
        let mut node = root;

        loop {
            let length = node.length();
            if length == 0 {
                frames.push(Frame {
                    node: node.clone(),
                    idx: BEFORE_START,
                });
                break;
            }

            let idx = match key {
                None if last => length - 1,
                None => 0,
                Some(k) => match node.as_ref() {
                    SequenceNode::Meta(m) => match m.search_by_key(k) {
                        Some(i) => i,
                        None if for_insertion || last => length - 1,
                        None => length,
                    },
                    SequenceNode::Leaf(l) => seek_leaf(l, k, for_insertion || last),
                    SequenceNode::Empty => 0,
                },
            };

            let is_leaf = matches!(node.as_ref(), SequenceNode::Leaf(_) | SequenceNode::Empty);
            frames.push(Frame {
                node: node.clone(),
                idx: idx as isize,
            });

            if is_leaf {
                break;
            }
            if idx >= length {
                break;
            }
            let child = node
                .get_child_sequence(store, idx)
                .await?
                .expect("meta child must exist");
            node = child;
        }

        Ok(SequenceCursor { frames })
    }

    /// Binary search for the smallest `i` with `node.get_key(i).compare(key)
    /// >= 0` at the current (leaf) frame — spec §4.4 `seekTo`. Returns
    /// `true` iff the resulting index is within range (or, when missing and
    /// `last_if_missing`, iff the leaf is non-empty).
    pub fn seek_to(&mut self, key: &OrderedKey<S::Key>, last_if_missing: bool) -> bool {
        let depth = self.leaf_depth();
        let idx = match self.frames[depth].node.as_ref() {
            SequenceNode::Leaf(l) => seek_leaf(l, key, last_if_missing),
            _ => return false,
        };
        self.frames[depth].idx = idx as isize;
        let len = self.frames[depth].node.length();
        idx < len
    }

    /// Synchronous, in-chunk-only advance. Returns `true` iff the new
    /// position is valid. If already at the last valid index and
    /// `allow_past_end`, moves to `length` (returning `false`) — spec §4.4.
    pub fn advance_local(&mut self, allow_past_end: bool) -> bool {
        let depth = self.leaf_depth();
        let len = self.frames[depth].node.length() as isize;
        let idx = self.frames[depth].idx;
        if idx + 1 < len {
            self.frames[depth].idx = idx + 1;
            true
        } else {
            if allow_past_end && idx + 1 == len {
                self.frames[depth].idx = len;
            }
            false
        }
    }

    pub fn can_advance_local(&self) -> bool {
        let depth = self.leaf_depth();
        let len = self.frames[depth].node.length() as isize;
        self.frames[depth].idx + 1 < len
    }

    /// Symmetric in-chunk-only retreat.
    pub fn retreat_local(&mut self, allow_before_start: bool) -> bool {
        let depth = self.leaf_depth();
        let idx = self.frames[depth].idx;
        if idx - 1 >= 0 {
            self.frames[depth].idx = idx - 1;
            true
        } else {
            if allow_before_start && idx - 1 == BEFORE_START {
                self.frames[depth].idx = BEFORE_START;
            }
            false
        }
    }

    /// Advances one item, hopping up to the parent (and re-descending) at
    /// chunk boundaries; suspends only when a not-yet-loaded child must be
    /// fetched — spec §4.4 `advance`.
    pub async fn advance<R>(&mut self, store: &R) -> Result<bool, CursorError>
    where
        R: ValueReader<SequenceNode<S>>,
    {
        if self.advance_local(false) {
            return Ok(true);
        }

        let mut depth = self.leaf_depth();
        loop {
            if depth == 0 {
                let len = self.frames[0].node.length() as isize;
                self.frames[0].idx = len;
                return Ok(false);
            }
            depth -= 1;
            let len = self.frames[depth].node.length() as isize;
            if self.frames[depth].idx + 1 < len {
                self.frames[depth].idx += 1;
                break;
            }
        }
        self.resync_descendants(store, depth, true).await?;
        Ok(true)
    }

    /// Symmetric to [`Self::advance`] — spec §4.4 `retreat`.
    pub async fn retreat<R>(&mut self, store: &R) -> Result<bool, CursorError>
    where
        R: ValueReader<SequenceNode<S>>,
    {
        if self.retreat_local(false) {
            return Ok(true);
        }

        let mut depth = self.leaf_depth();
        loop {
            if depth == 0 {
                self.frames[0].idx = BEFORE_START;
                return Ok(false);
            }
            depth -= 1;
            if self.frames[depth].idx - 1 >= 0 {
                self.frames[depth].idx -= 1;
                break;
            }
        }
        self.resync_descendants(store, depth, false).await?;
        Ok(true)
    }

    /// Jumps to the last item of the current chunk, then performs one
    /// `advance` — which, since the chunk is now exhausted, necessarily
    /// hops to the parent — spec §4.4 `advanceChunk`.
    pub async fn advance_chunk<R>(&mut self, store: &R) -> Result<bool, CursorError>
    where
        R: ValueReader<SequenceNode<S>>,
    {
        let depth = self.leaf_depth();
        let len = self.frames[depth].node.length() as isize;
        if len > 0 {
            self.frames[depth].idx = len - 1;
        }
        self.advance(store).await
    }

    /// Re-descends from `depth` (whose index just changed) down through the
    /// leaf, landing each rebuilt frame at its first (`to_start`) or last
    /// item.
    async fn resync_descendants<R>(
        &mut self,
        store: &R,
        mut depth: usize,
        to_start: bool,
    ) -> Result<(), CursorError>
    where
        R: ValueReader<SequenceNode<S>>,
    {
        self.frames.truncate(depth + 1);
        loop {
            let parent = &self.frames[depth];
            if !parent.node.is_meta() {
                break;
            }
            let i = parent.idx as usize;
            let child = parent
                .node
                .get_child_sequence(store, i)
                .await?
                .expect("meta child must exist");
            let child_len = child.length();
            let idx = if to_start {
                0
            } else {
                (child_len as isize) - 1
            };
            self.frames.push(Frame { node: child, idx });
            depth += 1;
        }
        Ok(())
    }

    /// Walks forward from the current position, yielding `(item, absolute
    /// index)` pairs to `cb` until it returns `true` or the sequence is
    /// exhausted. Uses [`Self::advance_local`] where possible so purely
    /// in-chunk iteration never suspends — spec §4.4 `iter`.
    pub async fn iter<R, F>(&mut self, store: &R, mut cb: F) -> Result<(), CursorError>
    where
        R: ValueReader<SequenceNode<S>>,
        F: FnMut(&S::Item, u64) -> bool,
    {
        loop {
            if !self.valid() {
                return Ok(());
            }
            let idx = self.global_index();
            let stop = match self.current_item() {
                Some(item) => cb(item, idx),
                None => return Ok(()),
            };
            if stop {
                return Ok(());
            }
            if self.can_advance_local() {
                self.advance_local(false);
            } else if !self.advance(store).await? {
                return Ok(());
            }
        }
    }
}

fn seek_leaf<S: SequenceSchema>(
    l: &crate::sequence::LeafSequence<S>,
    key: &OrderedKey<S::Key>,
    last_if_missing: bool,
) -> usize {
    let len = l.len();
    let mut lo = 0usize;
    let mut hi = len;
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if l.get_key(mid).compare(key) != Ordering::Less {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    if lo == len && last_if_missing && len > 0 {
        len - 1
    } else {
        lo
    }
}
