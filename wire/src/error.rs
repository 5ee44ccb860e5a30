use thiserror::Error;

pub type Result<T> = std::result::Result<T, DfsError>;

#[derive(Error, Debug)]
pub enum DfsError {
    #[error("File not found: {file_name}")]
    FileNotFound { file_name: String },

    #[error("Block {block_number} of {file_name} not found")]
    BlockNotFound { file_name: String, block_number: u64 },

    #[error(
        "Partial read of block {block_number} of {file_name}: expected {expected} bytes, got {actual}"
    )]
    PartialRead {
        file_name: String,
        block_number: u64,
        expected: u64,
        actual: u64,
    },

    #[error("Write of block {block_key} failed: {reason}")]
    WriteFailed { block_key: String, reason: String },

    #[error("No live datanodes available for placement")]
    InsufficientReplicas,

    #[error("{target} unreachable after {attempts} attempts")]
    Unreachable { target: String, attempts: u8 },

    #[error("Protocol violation: {0}")]
    Protocol(String),

    #[error("{0}")]
    InvalidUsage(String),

    #[error("Decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A FAILURE response surfaced on the calling side, carrying the remote
    /// message verbatim.
    #[error("{0}")]
    Remote(String),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn block_not_found_names_the_file_and_block() {
        let e = DfsError::BlockNotFound {
            file_name: "a.txt".to_owned(),
            block_number: 2,
        };
        let rendered = e.to_string();
        assert!(rendered.contains("a.txt"));
        assert!(rendered.contains('2'));
    }
}
