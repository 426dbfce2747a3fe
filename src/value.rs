//! The `Value` contract and the `OrderedKey` total order used throughout
//! the tree (spec §3, §4.1).

use std::cmp::Ordering;
use std::fmt;

use serde::{Serialize, de::DeserializeOwned};

/// A 32-byte content hash, produced by hashing a chunk's serialized bytes.
///
/// Used both as the persisted identity of a chunk (the `Ref` target) and,
/// for hash-ordered keys, as the sort key itself.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, serde::Deserialize)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    pub fn of_bytes(bytes: &[u8]) -> Self {
        ContentHash(*blake3::hash(bytes).as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0[..4] {
            write!(f, "{:02x}", b)?;
        }
        write!(f, "…")
    }
}

/// Opaque, totally ordered, content-hashable item stored in leaves.
///
/// The core only ever needs `compare`/`equals` (via `Ord`/`PartialEq`) and a
/// deterministic byte serialization, `write_bytes`, fed to both the rolling
/// hasher (boundary detection) and the persistent chunk encoder. These two
/// uses must see bit-identical bytes — that is the "must be bit-identical"
/// requirement from §6.
pub trait Value: Ord + Clone + Send + Sync + 'static {
    fn write_bytes(&self, out: &mut Vec<u8>);
}

/// Blanket impl for any type with a stable postcard encoding. This is how
/// the crate gets `write_bytes` "for free" for the primitive types used in
/// tests and docs, while still letting a caller hand-roll `Value` for types
/// whose natural byte representation differs from their postcard encoding.
impl<T> Value for T
where
    T: Ord + Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn write_bytes(&self, out: &mut Vec<u8>) {
        // postcard's encoding is deterministic for a given value, which is
        // exactly what boundary detection and content-addressing need.
        if let Ok(bytes) = postcard::to_stdvec(self) {
            out.extend_from_slice(&bytes);
        }
    }
}

/// Either a value-ordered key (sorts by the wrapped value) or a
/// hash-ordered key (sorts by an out-of-band content hash) — spec §4.1.
///
/// Value-ordered keys precede hash-ordered keys; two same-kind keys compare
/// by their payload. This rule is arbitrary but must be identical between
/// peers reading the same persisted trees.
#[derive(Clone, Debug)]
pub enum OrderedKey<K> {
    Value(K),
    Hash(ContentHash),
}

impl<K> OrderedKey<K> {
    pub fn new(v: K) -> Self {
        OrderedKey::Value(v)
    }

    pub fn from_hash(h: ContentHash) -> Self {
        OrderedKey::Hash(h)
    }

    pub fn value(&self) -> Option<&K> {
        match self {
            OrderedKey::Value(v) => Some(v),
            OrderedKey::Hash(_) => None,
        }
    }

    pub fn is_hash_ordered(&self) -> bool {
        matches!(self, OrderedKey::Hash(_))
    }
}

impl<K: Ord> OrderedKey<K> {
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (OrderedKey::Value(a), OrderedKey::Value(b)) => a.cmp(b),
            (OrderedKey::Hash(a), OrderedKey::Hash(b)) => a.cmp(b),
            (OrderedKey::Value(_), OrderedKey::Hash(_)) => Ordering::Less,
            (OrderedKey::Hash(_), OrderedKey::Value(_)) => Ordering::Greater,
        }
    }
}

impl<K: Ord> PartialEq for OrderedKey<K> {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}
impl<K: Ord> Eq for OrderedKey<K> {}

impl<K: Ord> PartialOrd for OrderedKey<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}
impl<K: Ord> Ord for OrderedKey<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

/// A handle to a persisted value: its content hash plus the tree height it
/// was written at. Dereferenced through a [`crate::store::ValueReader`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ref {
    pub target_hash: ContentHash,
    pub height: u32,
}
