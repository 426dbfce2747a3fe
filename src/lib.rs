//! `prollytree`: immutable, content-addressed ordered collections backed by
//! a probabilistic B-tree (a "prolly tree").
//!
//! A prolly tree is a persistent, history-independent search tree: chunk
//! boundaries are chosen by a rolling hash over each leaf's content rather
//! than by a fixed branching factor, so two trees holding mostly the same
//! data end up sharing most of their chunks regardless of how each was
//! built. That's what makes diffing and incremental sync cheap.
//!
//! - [`List`], [`Map`], [`Set`], [`Blob`] are the user-facing collections.
//! - [`store::ValueReader`]/[`store::ValueReadWriter`] are the storage
//!   contract; [`store::memory::MemoryStore`] is the in-memory
//!   implementation every test in this crate runs against, and
//!   `store::redb_store::RedbStore` (behind the `redb-store` feature) backs
//!   the same contract with a real embedded engine.
//! - [`diff`] compares two collections built on the same schema.

pub mod chunker;
pub mod collections;
pub mod cursor;
pub mod diff;
pub mod error;
pub mod hash;
pub mod schema;
pub mod sequence;
pub mod store;
pub mod value;

pub use collections::{Blob, BlobReader, List, Map, SEEK_CUR, SEEK_END, SEEK_SET, Set};
pub use error::CoreError;
pub use hash::ChunkConfig;
pub use value::{ContentHash, OrderedKey, Ref, Value};
