use tokio::net::TcpStream;
use utilities::{
    logger::{instrument, trace, tracing},
    tcp_pool::TCP_POOL,
};
use uuid::Uuid;
use wire::{
    codec::{read_frame, write_frame},
    error::{DfsError, Result},
    messages::{Block, BlockMetaData, Request, RequestKind, Response},
};

/// Direct block transfers to datanodes. The caller picks the replica to talk
/// to and owns the request id, retries included.
#[derive(Clone, Debug)]
pub struct DatanodeService {}

impl DatanodeService {
    pub fn new() -> Self {
        Self {}
    }

    async fn call(&self, addrs: &str, request: &Request) -> Result<Response> {
        let connection = TCP_POOL.get_connection(addrs).await?;
        let mut stream = connection.lock().await;
        match Self::exchange(&mut stream, request).await {
            Ok(response) => Ok(response),
            Err(e) => {
                drop(stream);
                TCP_POOL.invalidate(addrs).await;
                Err(e)
            }
        }
    }

    async fn exchange(stream: &mut TcpStream, request: &Request) -> Result<Response> {
        write_frame(stream, request).await?;
        read_frame(stream).await
    }

    /// One replica write. The request id is the caller's so a retried write
    /// replays at the datanode instead of re-executing.
    #[instrument(name = "datanode_service_write_block", skip(self, request_id, meta, contents), fields(len = contents.len()))]
    pub async fn write_block(
        &self,
        addrs: &str,
        request_id: &str,
        meta: &BlockMetaData,
        contents: &[u8],
    ) -> Result<()> {
        let mut request = Request::new(request_id.to_owned(), RequestKind::WriteBlock);
        request.block = Some(Block {
            meta: Some(meta.clone()),
            contents: contents.to_vec(),
        });
        trace!("Sending write block request");
        let response = self.call(addrs, &request).await?;
        if !response.is_success() {
            return Err(DfsError::Remote(response.message));
        }
        Ok(())
    }

    /// One replica read, the recorded metadata and contents.
    #[instrument(name = "datanode_service_read_block", skip(self, meta))]
    pub async fn read_block(
        &self,
        addrs: &str,
        meta: &BlockMetaData,
    ) -> Result<(BlockMetaData, Vec<u8>)> {
        let mut request = Request::new(Uuid::new_v4().to_string(), RequestKind::ReadBlock);
        request.block = Some(Block {
            meta: Some(meta.clone()),
            contents: vec![],
        });
        trace!("Sending read block request");
        let response = self.call(addrs, &request).await?;
        if !response.is_success() {
            return Err(DfsError::Remote(response.message));
        }
        let Some(block) = response.block else {
            return Err(DfsError::Protocol(
                "Read response carries no block".to_owned(),
            ));
        };
        let Some(recorded) = block.meta else {
            return Err(DfsError::Protocol(
                "Read response carries no block metadata".to_owned(),
            ));
        };
        Ok((recorded, block.contents))
    }
}
