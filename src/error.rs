use thiserror::Error;

use crate::value::ContentHash;

/// Aggregate error type surfaced by the collection façades.
///
/// Every fallible operation in the core funnels into one of these variants;
/// there are no retryable errors here, per the error handling design — retry
/// belongs to whatever backs [`crate::store::ValueReader`]/[`crate::store::ValueReadWriter`].
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("cursor error")]
    Cursor(#[from] CursorError),

    #[error("chunker error")]
    Chunker(#[from] ChunkerError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("precondition violated: {0}")]
    Precondition(String),
}

/// Storage-layer failures: a missing ref is a fatal invariant violation, not
/// something the core retries.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("chunk not found for ref {hash:?}")]
    MissingRef { hash: ContentHash },

    #[cfg(feature = "redb-store")]
    #[error("redb error")]
    Redb(#[from] redb::Error),

    #[cfg(feature = "redb-store")]
    #[error("redb transaction error")]
    RedbTransaction(#[from] redb::TransactionError),

    #[cfg(feature = "redb-store")]
    #[error("redb table error")]
    RedbTable(#[from] redb::TableError),

    #[cfg(feature = "redb-store")]
    #[error("redb storage error")]
    RedbStorage(#[from] redb::StorageError),

    #[cfg(feature = "redb-store")]
    #[error("redb commit error")]
    RedbCommit(#[from] redb::CommitError),

    #[error("could not encode/decode a chunk")]
    Codec(#[from] postcard::Error),
}

#[derive(Error, Debug)]
pub enum CursorError {
    #[error("negative index")]
    NegativeIndex,

    #[error("seek to negative position")]
    NegativeSeek,

    #[error("cursor used past its valid range")]
    OutOfRange,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from [`crate::blob::BlobReader`].
#[derive(Error, Debug)]
pub enum BlobReaderError {
    #[error("reader is busy servicing a previous read/seek")]
    Busy,

    #[error("seek to negative absolute offset")]
    NegativeSeek,

    #[error("invalid whence value {0}, expected SEEK_SET, SEEK_CUR or SEEK_END")]
    InvalidWhence(u8),

    #[error(transparent)]
    Cursor(#[from] CursorError),
}

#[derive(Error, Debug)]
pub enum ChunkerError {
    #[error("non-leaf chunker ended up with zero entries and no parent")]
    EmptyRootWithNoParent,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Cursor(#[from] CursorError),
}
