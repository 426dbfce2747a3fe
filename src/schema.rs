//! How a particular collection kind (List/Map/Set/Blob) keys its items.
//!
//! The cursor, chunker and diff algorithms are written once, generically,
//! against this trait — the spec's "dynamic dispatch across Leaf/Meta/Empty
//! sequences" collapses to ordinary Rust generics since each collection
//! kind is a distinct monomorphization rather than a runtime-tagged value.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::value::OrderedKey;

/// A leaf item type plus the rule for turning it into an [`OrderedKey`].
///
/// Two flavors exist, matching spec §3's "List leaves hold arbitrary
/// Values... Map leaves hold (K,V) pairs sorted by K... Set leaves hold
/// Values sorted... Blob leaves hold bytes":
///
/// - *Indexed* schemas (`List`, `Blob`): the key of item `i` in a leaf is
///   simply its local position `i`; global position is reconstructed by
///   the cursor from `cumulative_number_of_leaves`, not by comparing keys.
/// - *Ordered* schemas (`Map`, `Set`): the key of an item is derived from
///   its content via [`SequenceSchema::item_key`].
pub trait SequenceSchema: Clone + Send + Sync + 'static {
    type Item: Clone + Send + Sync + 'static + Serialize + DeserializeOwned;
    type Key: Ord + Clone + Send + Sync + 'static + Serialize + DeserializeOwned;

    const INDEXED: bool;

    /// Extract the natural key from an item. Only meaningful (and only
    /// called) for ordered schemas; indexed schemas never call this.
    fn item_key(item: &Self::Item) -> OrderedKey<Self::Key> {
        let _ = item;
        unreachable!("item_key is only called for ordered schemas")
    }

    /// Build the key for local position `i` in a leaf. Only meaningful (and
    /// only called) for indexed schemas, where `Key = u64`.
    fn index_key(i: u64) -> OrderedKey<Self::Key> {
        let _ = i;
        unreachable!("index_key is only called for indexed schemas")
    }

    /// Deterministic byte serialization fed to the rolling hasher and to
    /// the persisted chunk encoder — must be identical for both uses.
    fn write_item_bytes(item: &Self::Item, out: &mut Vec<u8>) {
        if let Ok(bytes) = postcard::to_stdvec(item) {
            out.extend_from_slice(&bytes);
        }
    }
}

/// `List<V>`: indexed by position.
#[derive(Clone)]
pub struct ListSchema<V>(std::marker::PhantomData<V>);

impl<V> SequenceSchema for ListSchema<V>
where
    V: Clone + Ord + Send + Sync + 'static + Serialize + DeserializeOwned,
{
    type Item = V;
    type Key = u64;
    const INDEXED: bool = true;

    fn index_key(i: u64) -> OrderedKey<Self::Key> {
        OrderedKey::new(i)
    }
}

/// `Map<K, V>`: ordered by key, items are `(K, V)` pairs.
#[derive(Clone)]
pub struct MapSchema<K, V>(std::marker::PhantomData<(K, V)>);

impl<K, V> SequenceSchema for MapSchema<K, V>
where
    K: Clone + Ord + Send + Sync + 'static + Serialize + DeserializeOwned,
    V: Clone + Send + Sync + 'static + Serialize + DeserializeOwned,
{
    type Item = (K, V);
    type Key = K;
    const INDEXED: bool = false;

    fn item_key(item: &Self::Item) -> OrderedKey<Self::Key> {
        OrderedKey::new(item.0.clone())
    }
}

/// `Set<V>`: ordered by value.
#[derive(Clone)]
pub struct SetSchema<V>(std::marker::PhantomData<V>);

impl<V> SequenceSchema for SetSchema<V>
where
    V: Clone + Ord + Send + Sync + 'static + Serialize + DeserializeOwned,
{
    type Item = V;
    type Key = V;
    const INDEXED: bool = false;

    fn item_key(item: &Self::Item) -> OrderedKey<Self::Key> {
        OrderedKey::new(item.clone())
    }
}

/// `Blob`: indexed bytes.
#[derive(Clone)]
pub struct BlobSchema;

impl SequenceSchema for BlobSchema {
    type Item = u8;
    type Key = u64;
    const INDEXED: bool = true;

    fn index_key(i: u64) -> OrderedKey<Self::Key> {
        OrderedKey::new(i)
    }
}
