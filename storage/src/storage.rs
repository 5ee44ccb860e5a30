use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("No committed data under key {0}")]
    NotFound(String),

    #[error("Invalid storage key {0:?}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Flat keyed store of opaque byte payloads. Keys never contain path
/// separators, a committed key stays readable until the process owning the
/// root removes it out of band.
pub trait Storage {
    async fn write(&self, key: &str, contents: &[u8]) -> Result<u64>;
    async fn read(&self, key: &str) -> Result<Vec<u8>>;
    async fn list_keys(&self) -> Result<Vec<String>>;
    async fn contains(&self, key: &str) -> Result<bool>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    pub async fn storage_round_trip(storage: impl Storage) -> Result<()> {
        let key = "test_block.bin";
        let original_data = b"hello world";

        // Write test data
        let written = storage.write(key, original_data).await?;
        assert_eq!(written as usize, original_data.len());

        // testing available keys
        let keys = storage.list_keys().await?;
        assert_eq!(keys, vec![key.to_string()]);
        assert!(storage.contains(key).await?);

        // Read and verify data
        let read_back = storage.read(key).await?;
        assert_eq!(read_back, original_data);

        // a second write under the same key replaces the contents
        let rewritten = storage.write(key, b"replaced").await?;
        assert_eq!(rewritten, 8);
        assert_eq!(storage.read(key).await?, b"replaced");
        Ok(())
    }
}
