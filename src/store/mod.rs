//! External collaborators the core reads/writes chunks through (spec §6).
//!
//! The core never assumes anything about how chunks are actually persisted;
//! it only needs a [`ValueReader`] to resolve a hash to bytes and,
//! optionally, a [`ValueReadWriter`] to persist new chunks. This module
//! ships one always-available in-memory implementation
//! ([`memory::MemoryStore`]) used by every test in this crate, and one
//! optional `redb`-backed implementation (feature `redb-store`) that
//! demonstrates the contract against a real embedded engine without making
//! persistence part of the core's required dependency set.

pub mod memory;

#[cfg(feature = "redb-store")]
pub mod redb_store;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::value::{ContentHash, Ref};

/// Resolves a persisted chunk by its content hash.
///
/// A missing ref for a hash the caller believes was written is a fatal
/// invariant violation (storage corruption), not a recoverable condition —
/// see spec §7.
#[async_trait]
pub trait ValueReader<T>: Send + Sync {
    async fn read_value(&self, hash: ContentHash) -> Result<Option<T>, StoreError>;

    /// Synchronous read, only legal when the caller already knows the chunk
    /// is resident (e.g. a freshly built, not-yet-flushed chunk kept in a
    /// cache by the store). Implementations that cannot guarantee this
    /// should simply return `None`.
    fn read_value_sync(&self, _hash: ContentHash) -> Option<T> {
        None
    }
}

/// Persists a value and returns a [`Ref`] identifying it. Must be
/// idempotent by content hash: writing the same bytes twice is a no-op the
/// second time.
#[async_trait]
pub trait ValueReadWriter<T>: ValueReader<T> {
    async fn write_value(&self, value: &T, height: u32) -> Result<Ref, StoreError>;
}
