use utilities::logger::{error, instrument, trace, tracing};
use wire::{
    addressing::block_key,
    messages::{Block, DataNodeInfo, Request, Response},
};

use crate::block_store::BlockStore;

/// Serves block traffic. Replication is the writing client's concern, every
/// replica write lands here as its own independent request.
pub struct ClientHandler {
    store: BlockStore,
    node_id: String,
    address: String,
}

impl ClientHandler {
    pub fn new(store: BlockStore, node_id: String, address: String) -> Self {
        Self {
            store,
            node_id,
            address,
        }
    }

    #[instrument(name = "datanode_write_block", skip(self, request), fields(request_id = %request.request_id))]
    pub async fn write_block(&self, request: &Request) -> Response {
        let Some(block) = request.block.as_ref() else {
            return Response::failure(&request.request_id, "Write request carries no block");
        };
        let Some(meta) = block.meta.as_ref() else {
            return Response::failure(&request.request_id, "Write request carries no block metadata");
        };
        trace!(file_name = %meta.file_name, block_number = meta.block_number, "Got write request");
        match self.store.write_block(meta, &block.contents).await {
            Ok(key) => {
                Response::success(&request.request_id, &format!("Block {key} successfully written"))
            }
            Err(e) => {
                error!(error = %e, "Error while writing the block");
                Response::failure(&request.request_id, &e.to_string())
            }
        }
    }

    #[instrument(name = "datanode_read_block", skip(self, request), fields(request_id = %request.request_id))]
    pub async fn read_block(&self, request: &Request) -> Response {
        let Some(meta) = request.block.as_ref().and_then(|block| block.meta.as_ref()) else {
            return Response::failure(&request.request_id, "Read request carries no block metadata");
        };
        trace!(file_name = %meta.file_name, block_number = meta.block_number, "Got read request");
        match self.store.read_block(meta).await {
            Ok((recorded, contents)) => {
                let key = block_key(&recorded.file_id, recorded.block_number);
                let mut response = Response::success(
                    &request.request_id,
                    &format!("Block {key} successfully read"),
                );
                response.block = Some(Block {
                    meta: Some(recorded),
                    contents,
                });
                response
            }
            Err(e) => Response::failure(&request.request_id, &e.to_string()),
        }
    }

    /// The node's own inventory, the same shape a block report carries.
    #[instrument(name = "datanode_list", skip(self, request), fields(request_id = %request.request_id))]
    pub async fn list(&self, request: &Request) -> Response {
        let blocks = self.store.inventory().await;
        let mut response =
            Response::success(&request.request_id, &format!("{} blocks held", blocks.len()));
        response.node = Some(DataNodeInfo {
            data_node_id: self.node_id.clone(),
            address: self.address.clone(),
            blocks,
        });
        response
    }

    // open and close manage namenode metadata, there is nothing to do for
    // either here, the client gets a success so a misdirected call is harmless
    pub async fn open(&self, request: &Request) -> Response {
        Response::success(&request.request_id, "Nothing to open on a datanode")
    }

    pub async fn close(&self, request: &Request) -> Response {
        Response::success(&request.request_id, "Nothing to close on a datanode")
    }
}

#[cfg(test)]
mod test {
    use storage::file_storage::FileStorageConfig;
    use tempfile::tempdir;
    use wire::messages::{BlockMetaData, RequestKind};

    use super::*;

    fn handler_at(root: &str) -> ClientHandler {
        let store = BlockStore::open(FileStorageConfig {
            root: root.to_owned(),
        })
        .unwrap();
        ClientHandler::new(store, "datanode-1".to_owned(), "127.0.0.1:3000".to_owned())
    }

    fn write_request(request_id: &str, file_name: &str, block_number: u64, contents: &[u8]) -> Request {
        let mut request = Request::new(request_id.to_owned(), RequestKind::WriteBlock);
        request.block = Some(Block {
            meta: Some(BlockMetaData {
                file_id: file_name.to_owned(),
                file_name: file_name.to_owned(),
                block_number,
                data_node_id: "datanode-1".to_owned(),
                replica_rank: 0,
                length: 0,
            }),
            contents: contents.to_vec(),
        });
        request
    }

    fn read_request(request_id: &str, file_name: &str, block_number: u64) -> Request {
        let mut request = Request::new(request_id.to_owned(), RequestKind::ReadBlock);
        request.block = Some(Block {
            meta: Some(BlockMetaData {
                file_id: file_name.to_owned(),
                file_name: file_name.to_owned(),
                block_number,
                data_node_id: String::new(),
                replica_rank: 0,
                length: 0,
            }),
            contents: vec![],
        });
        request
    }

    #[tokio::test]
    async fn write_then_read_through_the_envelope() {
        let dir = tempdir().unwrap();
        let handler = handler_at(dir.path().to_str().unwrap());

        let written = handler
            .write_block(&write_request("req-1", "a.txt", 1, b"abcd"))
            .await;
        assert!(written.is_success());
        assert!(written.message.contains("a.txt_1"));

        let read = handler.read_block(&read_request("req-2", "a.txt", 1)).await;
        assert!(read.is_success());
        assert_eq!(read.block.unwrap().contents, b"abcd");
    }

    #[tokio::test]
    async fn write_without_a_block_fails() {
        let dir = tempdir().unwrap();
        let handler = handler_at(dir.path().to_str().unwrap());

        let request = Request::new("req-1".to_owned(), RequestKind::WriteBlock);
        let response = handler.write_block(&request).await;
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn missing_blocks_fail_naming_the_block() {
        let dir = tempdir().unwrap();
        let handler = handler_at(dir.path().to_str().unwrap());

        let response = handler.read_block(&read_request("req-1", "ghost.txt", 3)).await;
        assert!(!response.is_success());
        assert!(response.message.contains("ghost.txt"));
        assert!(response.message.contains('3'));
    }

    #[tokio::test]
    async fn list_reports_the_inventory() {
        let dir = tempdir().unwrap();
        let handler = handler_at(dir.path().to_str().unwrap());
        handler
            .write_block(&write_request("req-1", "a.txt", 1, b"abcd"))
            .await;
        handler
            .write_block(&write_request("req-2", "a.txt", 2, b"ef"))
            .await;

        let response = handler.list(&Request::new("req-3".to_owned(), RequestKind::List)).await;
        assert!(response.is_success());
        let node = response.node.unwrap();
        assert_eq!(node.data_node_id, "datanode-1");
        assert_eq!(node.address, "127.0.0.1:3000");
        assert_eq!(node.blocks.len(), 2);
        assert_eq!(node.blocks[0].block_number, 1);
        assert_eq!(node.blocks[1].block_number, 2);
    }
}
