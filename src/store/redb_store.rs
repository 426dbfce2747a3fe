//! A `redb`-backed [`ValueReader`]/[`ValueReadWriter`], demonstrating the
//! store contract against a real embedded engine the way the prolly-tree
//! prior art this crate grew out of backs its repo table: a single
//! `ContentHash -> Blob` table, content addressed, written idempotently.
//!
//! Gated behind the `redb-store` feature so the core never requires a
//! concrete storage engine to compile or test.

use async_trait::async_trait;
use redb::{ReadableTable, TableDefinition};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StoreError;
use crate::value::{ContentHash, Ref};

use super::{ValueReader, ValueReadWriter};

const CHUNKS_TABLE: TableDefinition<[u8; 32], Vec<u8>> = TableDefinition::new("chunks");

pub struct RedbStore {
    db: redb::Database,
}

impl RedbStore {
    pub fn open(path: &std::path::Path) -> Result<Self, StoreError> {
        let db = redb::Database::create(path)?;
        // Ensure the table exists even if nothing has been written yet.
        let write_txn = db.begin_write()?;
        {
            write_txn.open_table(CHUNKS_TABLE)?;
        }
        write_txn.commit()?;
        Ok(RedbStore { db })
    }
}

#[async_trait]
impl<T> ValueReader<T> for RedbStore
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn read_value(&self, hash: ContentHash) -> Result<Option<T>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CHUNKS_TABLE)?;
        match table.get(hash.0)? {
            Some(guard) => Ok(Some(postcard::from_bytes(guard.value().as_slice())?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl<T> ValueReadWriter<T> for RedbStore
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn write_value(&self, value: &T, height: u32) -> Result<Ref, StoreError> {
        let encoded = postcard::to_stdvec(value)?;
        let target_hash = ContentHash::of_bytes(&encoded);

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(CHUNKS_TABLE)?;
            if table.get(target_hash.0)?.is_none() {
                table.insert(target_hash.0, encoded)?;
            }
        }
        write_txn.commit()?;

        Ok(Ref {
            target_hash,
            height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let store = RedbStore::open(&dir.path().join("chunks.redb")).unwrap();

        let r: Ref = ValueReadWriter::<String>::write_value(&store, &"hello".to_string(), 0)
            .await
            .unwrap();
        let back: Option<String> = ValueReader::<String>::read_value(&store, r.target_hash)
            .await
            .unwrap();
        assert_eq!(back, Some("hello".to_string()));
    }
}
