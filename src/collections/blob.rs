//! `Blob`: an indexed sequence of bytes, plus a non-reentrant streaming
//! reader over it — spec §4.7.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::chunker::chunk_sequence;
use crate::cursor::SequenceCursor;
use crate::error::{BlobReaderError, CoreError};
use crate::hash::ChunkConfig;
use crate::schema::BlobSchema;
use crate::sequence::SequenceNode;
use crate::store::{ValueReader, ValueReadWriter};

use super::collect_all;

/// Seek relative to the start of the blob.
pub const SEEK_SET: u8 = 0;
/// Seek relative to the reader's current position.
pub const SEEK_CUR: u8 = 1;
/// Seek relative to the end of the blob.
pub const SEEK_END: u8 = 2;

pub struct Blob<R> {
    store: R,
    config: ChunkConfig,
    root: Arc<SequenceNode<BlobSchema>>,
}

impl<R> Blob<R>
where
    R: ValueReadWriter<SequenceNode<BlobSchema>>,
{
    pub fn new(store: R, config: ChunkConfig) -> Self {
        Blob {
            store,
            config,
            root: Arc::new(SequenceNode::Leaf(crate::sequence::LeafSequence::new(
                Vec::new(),
            ))),
        }
    }

    pub async fn from_bytes(
        store: R,
        config: ChunkConfig,
        bytes: impl IntoIterator<Item = u8>,
    ) -> Result<Self, CoreError> {
        let root = chunk_sequence(&store, config, bytes).await?;
        Ok(Blob { store, config, root })
    }

    pub fn len(&self) -> u64 {
        self.root.num_leaves()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub async fn get(&self, index: u64) -> Result<Option<u8>, CoreError> {
        if index >= self.len() {
            return Ok(None);
        }
        let cursor =
            SequenceCursor::new_cursor_at_index(self.root.clone(), index, &self.store).await?;
        Ok(cursor.current_item().copied())
    }

    pub async fn to_vec(&self) -> Result<Vec<u8>, CoreError> {
        collect_all(&self.root, &self.store).await
    }

    pub async fn splice(
        &mut self,
        start: u64,
        delete_count: u64,
        insert: Vec<u8>,
    ) -> Result<(), CoreError> {
        let mut bytes = self.to_vec().await?;
        let start = (start as usize).min(bytes.len());
        let end = (start + delete_count as usize).min(bytes.len());
        bytes.splice(start..end, insert);
        self.root = chunk_sequence(&self.store, self.config, bytes).await?;
        Ok(())
    }

    /// Wraps this blob's current root in a fresh, independent reader.
    pub fn reader(&self) -> BlobReader<R>
    where
        R: Clone,
    {
        BlobReader::new(self.root.clone(), self.store.clone())
    }

    pub fn store(&self) -> &R {
        &self.store
    }
}

impl<R> fmt::Debug for Blob<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blob")
            .field("num_leaves", &self.root.num_leaves())
            .finish()
    }
}

/// A streaming reader with an absolute cursor position. Non-reentrant: a
/// second `read`/`seek` call made while one is already in flight on the same
/// reader fails with [`BlobReaderError::Busy`] rather than interleaving —
/// spec §4.7.
pub struct BlobReader<R> {
    store: R,
    root: Arc<SequenceNode<BlobSchema>>,
    pos: AtomicU64,
    busy: AtomicBool,
}

impl<R> BlobReader<R>
where
    R: ValueReader<SequenceNode<BlobSchema>>,
{
    pub fn new(root: Arc<SequenceNode<BlobSchema>>, store: R) -> Self {
        BlobReader {
            store,
            root,
            pos: AtomicU64::new(0),
            busy: AtomicBool::new(false),
        }
    }

    pub fn position(&self) -> u64 {
        self.pos.load(Ordering::Acquire)
    }

    fn acquire(&self) -> Result<(), BlobReaderError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| BlobReaderError::Busy)
    }

    fn release(&self) {
        self.busy.store(false, Ordering::Release);
    }

    /// Moves the reader's position relative to `whence` — spec §4.7
    /// `seek(offset, whence)`. `whence` is one of [`SEEK_SET`], [`SEEK_CUR`],
    /// [`SEEK_END`]; `offset` may be negative (e.g. `seek(-100, SEEK_END)`
    /// seeks to 100 bytes before the end). Errors rather than wrapping if the
    /// resulting position would be negative. Returns the new absolute
    /// position.
    pub fn seek(&self, offset: i64, whence: u8) -> Result<u64, BlobReaderError> {
        self.acquire()?;
        let base: i64 = match whence {
            SEEK_SET => 0,
            SEEK_CUR => self.pos.load(Ordering::Acquire) as i64,
            SEEK_END => self.root.num_leaves() as i64,
            _ => {
                self.release();
                return Err(BlobReaderError::InvalidWhence(whence));
            }
        };
        let target = base.checked_add(offset).filter(|p| *p >= 0);
        let result = match target {
            Some(p) => {
                self.pos.store(p as u64, Ordering::Release);
                Ok(p as u64)
            }
            None => Err(BlobReaderError::NegativeSeek),
        };
        self.release();
        result
    }

    /// Fills `buf` with up to `buf.len()` bytes starting at the current
    /// position, advancing it by the number of bytes read. Returns `0` at
    /// end of blob.
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize, BlobReaderError> {
        self.acquire()?;
        let result = self.read_locked(buf).await;
        self.release();
        result
    }

    async fn read_locked(&self, buf: &mut [u8]) -> Result<usize, BlobReaderError> {
        let total = self.root.num_leaves();
        let start = self.pos.load(Ordering::Acquire);
        if start >= total || buf.is_empty() {
            return Ok(0);
        }

        let mut cursor =
            SequenceCursor::new_cursor_at_index(self.root.clone(), start, &self.store).await?;
        let mut n = 0usize;
        while n < buf.len() && cursor.valid() {
            buf[n] = *cursor.current_item().expect("cursor.valid() guarantees an item");
            n += 1;
            if n == buf.len() {
                break;
            }
            if !cursor.advance(&self.store).await? {
                break;
            }
        }
        self.pos.fetch_add(n as u64, Ordering::AcqRel);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    #[tokio::test]
    async fn get_and_to_vec_round_trip() {
        let store = MemoryStore::new();
        let bytes: Vec<u8> = (0..400).map(|i| (i % 256) as u8).collect();
        let blob = Blob::from_bytes(store, ChunkConfig::default(), bytes.clone())
            .await
            .unwrap();
        assert_eq!(blob.len(), 400);
        assert_eq!(blob.get(10).await.unwrap(), Some(bytes[10]));
        assert_eq!(blob.to_vec().await.unwrap(), bytes);
    }

    #[tokio::test]
    async fn reader_reads_in_chunks_and_seeks() {
        let store = MemoryStore::new();
        let bytes: Vec<u8> = (0..200u16).map(|i| (i % 256) as u8).collect();
        let blob = Blob::from_bytes(store, ChunkConfig::default(), bytes.clone())
            .await
            .unwrap();
        let reader = blob.reader();

        let mut buf = [0u8; 50];
        let n = reader.read(&mut buf).await.unwrap();
        assert_eq!(n, 50);
        assert_eq!(&buf[..], &bytes[0..50]);

        reader.seek(100, SEEK_SET).unwrap();
        let n = reader.read(&mut buf).await.unwrap();
        assert_eq!(n, 50);
        assert_eq!(&buf[..], &bytes[100..150]);

        reader.seek(-10, SEEK_CUR).unwrap();
        assert_eq!(reader.position(), 140);

        reader.seek(-100, SEEK_END).unwrap();
        assert_eq!(reader.position(), 100);

        assert!(matches!(
            reader.seek(-1, SEEK_SET),
            Err(BlobReaderError::NegativeSeek)
        ));
    }
}
