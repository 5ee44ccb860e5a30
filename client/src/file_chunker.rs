use tokio::{
    fs::OpenOptions,
    io::{AsyncReadExt, AsyncSeekExt},
};
use utilities::logger::{instrument, tracing};
use wire::{
    addressing::block_span,
    error::{DfsError, Result},
};

/// One block sized slice of a local file.
#[derive(Clone, Debug)]
pub struct FileChunk {
    file_path: String,
    start_offset: u64,
    end_offset: u64,
}

impl FileChunk {
    /// Reads exactly this slice. A file that shrank underneath comes back as
    /// an error, never a short buffer.
    #[instrument(name = "file_chunk_read", skip(self), fields(start = self.start_offset, end = self.end_offset))]
    pub async fn read_contents(&self) -> Result<Vec<u8>> {
        let mut file = OpenOptions::new().read(true).open(&self.file_path).await?;
        file.seek(std::io::SeekFrom::Start(self.start_offset))
            .await?;
        let expected = (self.end_offset - self.start_offset) as usize;
        let mut contents = Vec::with_capacity(expected);
        file.take(self.end_offset - self.start_offset)
            .read_to_end(&mut contents)
            .await?;
        if contents.len() != expected {
            return Err(DfsError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!(
                    "expected {expected} bytes from {}, got {}",
                    self.file_path,
                    contents.len()
                ),
            )));
        }
        Ok(contents)
    }
}

/// Slices a local file into block sized chunks.
pub struct FileChunker {
    file_path: String,
    file_size: u64,
    block_size: u64,
}

impl FileChunker {
    pub fn new(file_path: String, file_size: u64, block_size: u64) -> Self {
        Self {
            file_path,
            file_size,
            block_size,
        }
    }

    pub fn chunk(&self, block_number: u64) -> FileChunk {
        let (start_offset, end_offset) = block_span(self.file_size, self.block_size, block_number);
        FileChunk {
            file_path: self.file_path.clone(),
            start_offset,
            end_offset,
        }
    }
}

#[cfg(test)]
mod test {
    use tokio::io::AsyncWriteExt;

    use super::*;

    #[tokio::test]
    async fn chunks_cover_the_file_in_block_sized_slices() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        let mut file = tokio::fs::File::create(&path).await.unwrap();
        file.write_all(b"abcdefghij").await.unwrap();
        file.flush().await.unwrap();

        let chunker = FileChunker::new(path.to_str().unwrap().to_owned(), 10, 4);
        assert_eq!(chunker.chunk(1).read_contents().await.unwrap(), b"abcd");
        assert_eq!(chunker.chunk(2).read_contents().await.unwrap(), b"efgh");
        assert_eq!(chunker.chunk(3).read_contents().await.unwrap(), b"ij");
    }

    #[tokio::test]
    async fn empty_files_produce_one_empty_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        tokio::fs::File::create(&path).await.unwrap();

        let chunker = FileChunker::new(path.to_str().unwrap().to_owned(), 0, 4);
        assert!(chunker.chunk(1).read_contents().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn a_file_shorter_than_declared_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.txt");
        let mut file = tokio::fs::File::create(&path).await.unwrap();
        file.write_all(b"ab").await.unwrap();
        file.flush().await.unwrap();

        // declared ten bytes long, holds two
        let chunker = FileChunker::new(path.to_str().unwrap().to_owned(), 10, 4);
        assert!(chunker.chunk(1).read_contents().await.is_err());
    }
}
