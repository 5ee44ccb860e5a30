use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

use crate::storage::{Result, Storage, StorageError};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};

#[derive(Clone)]
pub struct FileStorage {
    root: String,
}
pub struct FileStorageConfig {
    pub root: String,
}
impl FileStorage {
    pub fn new(config: FileStorageConfig) -> Result<Self> {
        let root = config.root;
        // creates the root as well, writes land in staged/ and move over on commit
        std::fs::create_dir_all(format!("{root}/staged"))?;
        info!(%root, "Created root and staging dir for storage");
        Ok(FileStorage { root })
    }
    fn get_committed_path(&self, key: &str) -> PathBuf {
        Path::new(&self.root).join(key)
    }
    fn get_staged_path(&self, key: &str) -> PathBuf {
        Path::new(&self.root).join("staged").join(key)
    }
    fn check_key(key: &str) -> Result<()> {
        if key.is_empty() || key == "." || key == ".." || key == "staged" {
            return Err(StorageError::InvalidKey(key.to_owned()));
        }
        if key.contains(['/', '\\']) {
            return Err(StorageError::InvalidKey(key.to_owned()));
        }
        Ok(())
    }
}
impl Storage for FileStorage {
    #[instrument(name = "file_storage_write", skip(self, contents), fields(len = contents.len()))]
    async fn write(&self, key: &str, contents: &[u8]) -> Result<u64> {
        Self::check_key(key)?;
        let staged_path = self.get_staged_path(key);
        let mut staged_file = File::create(&staged_path).await?;
        staged_file.write_all(contents).await?;
        staged_file.flush().await?;
        // a retried write lands whole or not at all, readers only ever see
        // the committed path
        fs::rename(staged_path, self.get_committed_path(key)).await?;
        info!(%key, "data committed successfully");
        Ok(contents.len() as u64)
    }
    #[instrument(name = "file_storage_read", skip(self))]
    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        Self::check_key(key)?;
        match fs::read(self.get_committed_path(key)).await {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_owned()))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }
    #[instrument(name = "file_storage_list_keys", skip(self))]
    async fn list_keys(&self) -> Result<Vec<String>> {
        info!(root=%self.root,"Reading the dir to get available keys");
        let mut dir_enteries = fs::read_dir(&self.root).await?;
        let mut keys = vec![];
        while let Some(entry) = dir_enteries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => keys.push(name),
                Err(name) => warn!(?name, "Skipping entry with a non utf8 name"),
            }
        }
        Ok(keys)
    }
    async fn contains(&self, key: &str) -> Result<bool> {
        Self::check_key(key)?;
        Ok(fs::try_exists(self.get_committed_path(key)).await?)
    }
}
