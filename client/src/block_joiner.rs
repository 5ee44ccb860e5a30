use tokio::{
    fs::OpenOptions,
    io::{AsyncSeekExt, AsyncWriteExt},
};
use utilities::logger::{instrument, trace, tracing};
use wire::error::Result;

/// Reassembles fetched blocks into one local file. Space is reserved up
/// front, every block lands at its own offset.
#[derive(Clone)]
pub struct BlockJoiner {
    file_path: String,
}

impl BlockJoiner {
    #[instrument(name = "new_block_joiner")]
    pub async fn new(file_path: String, file_size: u64) -> Result<Self> {
        trace!("Creating file");
        let mut file = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&file_path)
            .await?;
        if file_size > 0 {
            file.seek(std::io::SeekFrom::Start(file_size - 1)).await?;
            file.write_all(&[0]).await?;
            file.flush().await?;
        }
        Ok(Self { file_path })
    }

    #[instrument(skip(self, contents), fields(len = contents.len()))]
    pub async fn join_block(&self, start_offset: u64, contents: &[u8]) -> Result<()> {
        // a fresh descriptor per call, concurrent joins never share a cursor
        let mut file = OpenOptions::new().write(true).open(&self.file_path).await?;
        file.seek(std::io::SeekFrom::Start(start_offset)).await?;
        file.write_all(contents).await?;
        file.flush().await?;
        Ok(())
    }

    /// Removes the partly written file, nothing of a failed fetch remains.
    #[instrument(name = "abort_block_join", skip(self))]
    pub async fn abort(&self) {
        let _ = tokio::fs::remove_file(&self.file_path).await;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn blocks_joined_out_of_order_still_reassemble() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let joiner = BlockJoiner::new(path.to_str().unwrap().to_owned(), 10)
            .await
            .unwrap();

        joiner.join_block(8, b"ij").await.unwrap();
        joiner.join_block(0, b"abcd").await.unwrap();
        joiner.join_block(4, b"efgh").await.unwrap();

        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"abcdefghij");
    }

    #[tokio::test]
    async fn empty_files_need_no_reservation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        BlockJoiner::new(path.to_str().unwrap().to_owned(), 0)
            .await
            .unwrap();

        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"");
    }

    #[tokio::test]
    async fn abort_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.txt");
        let joiner = BlockJoiner::new(path.to_str().unwrap().to_owned(), 4)
            .await
            .unwrap();
        joiner.join_block(0, b"ab").await.unwrap();

        joiner.abort().await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn an_existing_target_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("present.txt");
        tokio::fs::write(&path, b"already here").await.unwrap();

        assert!(
            BlockJoiner::new(path.to_str().unwrap().to_owned(), 4)
                .await
                .is_err()
        );
    }
}
