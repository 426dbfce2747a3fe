//! The four user-facing collection façades — spec §4.7.
//!
//! Each façade is a thin, schema-specific wrapper around a `SequenceNode`
//! root plus the store it was built against. None of them mutate a tree in
//! place: every edit collects the current contents via a cursor, splices the
//! change into a plain `Vec`, and re-chunks from scratch (see `DESIGN.md` for
//! why `chunker::SequenceChunker`'s `advanceTo`-style reuse was not carried
//! over). That keeps every façade's edit API a thin wrapper over
//! [`crate::chunker::chunk_sequence`] and [`crate::cursor::SequenceCursor`].

pub mod blob;
pub mod list;
pub mod map;
pub mod set;

pub use blob::{Blob, BlobReader, SEEK_CUR, SEEK_END, SEEK_SET};
pub use list::List;
pub use map::Map;
pub use set::Set;

use std::sync::Arc;

use crate::cursor::SequenceCursor;
use crate::error::CoreError;
use crate::schema::SequenceSchema;
use crate::sequence::SequenceNode;
use crate::store::ValueReader;

/// Walks the whole tree via a cursor and clones every leaf item into a
/// `Vec`, in order. The common first step of every façade's edit path.
pub(crate) async fn collect_all<S, R>(
    root: &Arc<SequenceNode<S>>,
    store: &R,
) -> Result<Vec<S::Item>, CoreError>
where
    S: SequenceSchema,
    R: ValueReader<SequenceNode<S>>,
{
    let mut items = Vec::with_capacity(root.num_leaves() as usize);
    if root.is_empty() {
        return Ok(items);
    }
    let mut cursor = SequenceCursor::new_cursor_at_index(root.clone(), 0, store).await?;
    cursor
        .iter(store, |item, _idx| {
            items.push(item.clone());
            false
        })
        .await?;
    Ok(items)
}
