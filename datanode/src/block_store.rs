use prost::Message;
use storage::{
    file_storage::{FileStorage, FileStorageConfig},
    storage::{Storage, StorageError},
};
use utilities::{
    logger::{info, instrument, tracing, warn},
    shared_map::SharedMap,
};
use wire::{
    addressing::block_key,
    error::{DfsError, Result},
    messages::BlockMetaData,
};

/// Suffix of the sidecar key holding a block's encoded metadata.
const META_SUFFIX: &str = ".meta";

/// Every block this node holds, backed by [`FileStorage`] with an in memory
/// meta table in front of it. The table is the source of truth for what the
/// node claims to hold, the sidecars on disk exist so a restart can rebuild it.
#[derive(Clone)]
pub struct BlockStore {
    storage: FileStorage,
    metas: SharedMap<String, BlockMetaData>,
}

impl BlockStore {
    pub fn new(storage: FileStorage) -> Self {
        Self {
            storage,
            metas: SharedMap::new(),
        }
    }

    pub fn open(config: FileStorageConfig) -> Result<Self> {
        let storage = FileStorage::new(config).map_err(storage_error)?;
        Ok(Self::new(storage))
    }

    /// Rebuilds the meta table from the sidecars on disk so a restarted node
    /// serves what it already holds. Returns how many blocks were restored.
    #[instrument(name = "block_store_rescan", skip(self))]
    pub async fn rescan(&self) -> Result<usize> {
        let keys = self.storage.list_keys().await.map_err(storage_error)?;
        let mut restored = 0;
        for key in keys {
            let Some(stripped) = key.strip_suffix(META_SUFFIX) else {
                continue;
            };
            let encoded = match self.storage.read(&key).await {
                Ok(encoded) => encoded,
                Err(e) => {
                    warn!(%key, error = %e, "Skipping an unreadable meta sidecar");
                    continue;
                }
            };
            match BlockMetaData::decode(encoded.as_slice()) {
                Ok(meta) => {
                    self.metas.insert(stripped.to_owned(), meta).await;
                    restored += 1;
                }
                Err(e) => {
                    warn!(%key, error = %e, "Skipping an undecodable meta sidecar");
                }
            }
        }
        info!(restored, "Meta table rebuilt from the storage root");
        Ok(restored)
    }

    /// Commits the contents, then the sidecar, then the table entry. A crash
    /// in between leaves data a rescan ignores and a retried write replaces.
    #[instrument(name = "block_store_write", skip(self, meta, contents), fields(len = contents.len()))]
    pub async fn write_block(&self, meta: &BlockMetaData, contents: &[u8]) -> Result<String> {
        let key = block_key(&meta.file_id, meta.block_number);
        let mut recorded = meta.clone();
        recorded.length = contents.len() as u64;
        if let Err(e) = self.storage.write(&key, contents).await {
            return Err(DfsError::WriteFailed {
                block_key: key,
                reason: e.to_string(),
            });
        }
        let sidecar = format!("{key}{META_SUFFIX}");
        if let Err(e) = self.storage.write(&sidecar, &recorded.encode_to_vec()).await {
            return Err(DfsError::WriteFailed {
                block_key: key,
                reason: e.to_string(),
            });
        }
        self.metas.insert(key.clone(), recorded).await;
        info!(%key, "Block written");
        Ok(key)
    }

    /// Returns the recorded metadata and contents of one block. A read that
    /// comes back shorter than the recorded length is an error, never a
    /// truncated success.
    #[instrument(name = "block_store_read", skip(self, meta))]
    pub async fn read_block(&self, meta: &BlockMetaData) -> Result<(BlockMetaData, Vec<u8>)> {
        let key = block_key(&meta.file_id, meta.block_number);
        let Some(recorded) = self.metas.get(&key).await else {
            return Err(DfsError::BlockNotFound {
                file_name: meta.file_name.clone(),
                block_number: meta.block_number,
            });
        };
        let contents = match self.storage.read(&key).await {
            Ok(contents) => contents,
            Err(StorageError::NotFound(_)) => {
                return Err(DfsError::BlockNotFound {
                    file_name: meta.file_name.clone(),
                    block_number: meta.block_number,
                });
            }
            Err(e) => return Err(storage_error(e)),
        };
        if (contents.len() as u64) < recorded.length {
            return Err(DfsError::PartialRead {
                file_name: recorded.file_name.clone(),
                block_number: recorded.block_number,
                expected: recorded.length,
                actual: contents.len() as u64,
            });
        }
        Ok((recorded, contents))
    }

    /// Everything the node holds, ordered so repeated reports are comparable.
    pub async fn inventory(&self) -> Vec<BlockMetaData> {
        let mut blocks: Vec<BlockMetaData> = self
            .metas
            .snapshot()
            .await
            .into_iter()
            .map(|(_, meta)| meta)
            .collect();
        blocks.sort_by(|a, b| {
            a.file_id
                .cmp(&b.file_id)
                .then_with(|| a.block_number.cmp(&b.block_number))
        });
        blocks
    }
}

fn storage_error(e: StorageError) -> DfsError {
    match e {
        StorageError::Io(e) => DfsError::Io(e),
        other => DfsError::Protocol(other.to_string()),
    }
}

#[cfg(test)]
mod test {
    use storage::storage::Storage;
    use tempfile::tempdir;

    use super::*;

    fn store_at(root: &str) -> BlockStore {
        BlockStore::open(FileStorageConfig {
            root: root.to_owned(),
        })
        .unwrap()
    }

    fn meta(file_name: &str, block_number: u64) -> BlockMetaData {
        BlockMetaData {
            file_id: file_name.to_owned(),
            file_name: file_name.to_owned(),
            block_number,
            data_node_id: "datanode-1".to_owned(),
            replica_rank: 0,
            length: 0,
        }
    }

    #[tokio::test]
    async fn write_then_read_round_trip() {
        let dir = tempdir().unwrap();
        let store = store_at(dir.path().to_str().unwrap());

        let key = store.write_block(&meta("a.txt", 1), b"abcd").await.unwrap();
        assert_eq!(key, "a.txt_1");

        let (recorded, contents) = store.read_block(&meta("a.txt", 1)).await.unwrap();
        assert_eq!(contents, b"abcd");
        assert_eq!(recorded.length, 4);
    }

    #[tokio::test]
    async fn unknown_block_message_names_file_and_block() {
        let dir = tempdir().unwrap();
        let store = store_at(dir.path().to_str().unwrap());

        let error = store.read_block(&meta("ghost.txt", 7)).await.unwrap_err();
        let rendered = error.to_string();
        assert!(rendered.contains("ghost.txt"));
        assert!(rendered.contains('7'));
    }

    #[tokio::test]
    async fn short_contents_surface_as_a_partial_read() {
        let dir = tempdir().unwrap();
        let store = store_at(dir.path().to_str().unwrap());
        store.write_block(&meta("a.txt", 1), b"abcd").await.unwrap();

        // truncate the contents behind the store's back, the sidecar still
        // records four bytes
        store.storage.write("a.txt_1", b"ab").await.unwrap();

        let error = store.read_block(&meta("a.txt", 1)).await.unwrap_err();
        match error {
            DfsError::PartialRead {
                expected, actual, ..
            } => {
                assert_eq!(expected, 4);
                assert_eq!(actual, 2);
            }
            other => panic!("expected a partial read, got {other}"),
        }
    }

    #[tokio::test]
    async fn rescan_restores_the_meta_table() {
        let dir = tempdir().unwrap();
        let root = dir.path().to_str().unwrap().to_owned();
        store_at(&root).write_block(&meta("a.txt", 1), b"abcd").await.unwrap();

        let reopened = store_at(&root);
        assert_eq!(reopened.rescan().await.unwrap(), 1);

        let (recorded, contents) = reopened.read_block(&meta("a.txt", 1)).await.unwrap();
        assert_eq!(contents, b"abcd");
        assert_eq!(recorded.length, 4);
    }

    #[tokio::test]
    async fn undecodable_sidecars_are_skipped_on_rescan() {
        let dir = tempdir().unwrap();
        let store = store_at(dir.path().to_str().unwrap());
        store.write_block(&meta("a.txt", 1), b"abcd").await.unwrap();
        store.storage.write("ghost_1.meta", b"garbage").await.unwrap();

        let reopened = BlockStore::new(store.storage.clone());
        assert_eq!(reopened.rescan().await.unwrap(), 1);
        assert!(reopened.read_block(&meta("ghost", 1)).await.is_err());
    }

    #[tokio::test]
    async fn rewritten_blocks_replace_contents_and_length() {
        let dir = tempdir().unwrap();
        let store = store_at(dir.path().to_str().unwrap());
        store.write_block(&meta("a.txt", 1), b"abcd").await.unwrap();
        store.write_block(&meta("a.txt", 1), b"xy").await.unwrap();

        let (recorded, contents) = store.read_block(&meta("a.txt", 1)).await.unwrap();
        assert_eq!(contents, b"xy");
        assert_eq!(recorded.length, 2);
    }
}
