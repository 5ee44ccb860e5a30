use tokio::net::TcpStream;
use utilities::{
    logger::{instrument, tracing},
    tcp_pool::TCP_POOL,
};
use uuid::Uuid;
use wire::{
    addressing::file_id,
    codec::{read_frame, write_frame},
    error::{DfsError, Result},
    messages::{FileMetadata, Request, RequestKind, Response},
};

/// The client's window onto namenode metadata, one envelope exchange per
/// method. FAILURE responses surface as [`DfsError::Remote`].
#[derive(Clone)]
pub struct NamenodeService {
    namenode_addrs: String,
    connect_retries: u8,
}

impl NamenodeService {
    pub fn new(namenode_addrs: String, connect_retries: u8) -> Self {
        Self {
            namenode_addrs,
            connect_retries,
        }
    }

    async fn call(&self, request: &Request) -> Result<Response> {
        let connection = TCP_POOL
            .get_connection_with_retry(&self.namenode_addrs, self.connect_retries)
            .await?;
        let mut stream = connection.lock().await;
        match Self::exchange(&mut stream, request).await {
            Ok(response) => Ok(response),
            Err(e) => {
                drop(stream);
                TCP_POOL.invalidate(&self.namenode_addrs).await;
                Err(e)
            }
        }
    }

    async fn exchange(stream: &mut TcpStream, request: &Request) -> Result<Response> {
        write_frame(stream, request).await?;
        read_frame(stream).await
    }

    fn file_request(kind: RequestKind, file_name: &str, file_size: u64) -> Request {
        let mut request = Request::new(Uuid::new_v4().to_string(), kind);
        request.file = Some(FileMetadata {
            file_id: file_id(file_name),
            file_name: file_name.to_owned(),
            file_size,
        });
        request
    }

    /// Create or continue. The namenode assigns pipelines for a new name and
    /// returns the recorded ones otherwise.
    #[instrument(name = "namenode_service_open_file", skip(self))]
    pub async fn open_file(&self, file_name: &str, file_size: u64) -> Result<Response> {
        let request = Self::file_request(RequestKind::Open, file_name, file_size);
        let response = self.call(&request).await?;
        if !response.is_success() {
            return Err(DfsError::Remote(response.message));
        }
        Ok(response)
    }

    /// Pipelines of an already recorded file, size comes back in the
    /// response's file metadata.
    #[instrument(name = "namenode_service_locate_blocks", skip(self))]
    pub async fn locate_blocks(&self, file_name: &str) -> Result<Response> {
        let request = Self::file_request(RequestKind::Locate, file_name, 0);
        let response = self.call(&request).await?;
        if !response.is_success() {
            return Err(DfsError::Remote(response.message));
        }
        Ok(response)
    }

    #[instrument(name = "namenode_service_close_file", skip(self))]
    pub async fn close_file(&self, file_name: &str) -> Result<String> {
        let request = Self::file_request(RequestKind::Close, file_name, 0);
        let response = self.call(&request).await?;
        if !response.is_success() {
            return Err(DfsError::Remote(response.message));
        }
        Ok(response.message)
    }

    #[instrument(name = "namenode_service_list_files", skip(self))]
    pub async fn list_files(&self) -> Result<Vec<FileMetadata>> {
        let request = Request::new(Uuid::new_v4().to_string(), RequestKind::List);
        let response = self.call(&request).await?;
        if !response.is_success() {
            return Err(DfsError::Remote(response.message));
        }
        Ok(response.files)
    }
}
