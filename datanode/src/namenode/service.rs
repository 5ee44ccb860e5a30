use std::time::Duration;

use tokio::{net::TcpStream, time::interval};
use utilities::{
    logger::{error, info, instrument, trace, tracing, warn},
    retry_policy::retry_with_backoff,
    tcp_pool::TCP_POOL,
};
use uuid::Uuid;
use wire::{
    codec::{read_frame, write_frame},
    error::{DfsError, Result},
    messages::{BlockMetaData, DataNodeInfo, Request, RequestKind, Response},
};

use crate::block_store::BlockStore;

/// The node's outbound side: registration on startup, then heartbeat and
/// block report tickers. Every exchange goes over the pooled namenode
/// connection, a broken one is dropped from the pool and redialed next time.
#[derive(Clone)]
pub struct NamenodeService {
    namenode_addrs: String,
    datanode_id: String,
    external_addrs: String,
    store: BlockStore,
    heartbeat_interval: Duration,
    report_interval: Duration,
    connect_retries: u8,
}

impl NamenodeService {
    pub fn new(
        namenode_addrs: String,
        datanode_id: String,
        external_addrs: String,
        store: BlockStore,
        heartbeat_interval: Duration,
        report_interval: Duration,
        connect_retries: u8,
    ) -> Self {
        Self {
            namenode_addrs,
            datanode_id,
            external_addrs,
            store,
            heartbeat_interval,
            report_interval,
            connect_retries,
        }
    }

    fn base_request(&self, kind: RequestKind, blocks: Vec<BlockMetaData>) -> Request {
        let mut request = Request::new(Uuid::new_v4().to_string(), kind);
        request.node = Some(DataNodeInfo {
            data_node_id: self.datanode_id.clone(),
            address: self.external_addrs.clone(),
            blocks,
        });
        request
    }

    async fn call(&self, request: &Request) -> Result<Response> {
        let connection = TCP_POOL.get_connection(&self.namenode_addrs).await?;
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

    #[instrument(name = "service_namenode_register", skip(self))]
    pub async fn register(&self) -> Result<()> {
        let response = retry_with_backoff(
            || async {
                let request = self.base_request(RequestKind::Register, vec![]);
                self.call(&request).await
            },
            self.connect_retries,
        )
        .await
        .map_err(|_| DfsError::Unreachable {
            target: self.namenode_addrs.clone(),
            attempts: self.connect_retries,
        })?;
        if response.is_success() {
            info!(message = %response.message, "Connected to namenode sucessfully");
            Ok(())
        } else {
            error!(message = %response.message, "Namenode refused the registration");
            Err(DfsError::Remote(response.message))
        }
    }

    #[instrument(name = "service_namenode_send_heart_beat", skip(self))]
    pub async fn send_heart_beat(&self) -> Result<()> {
        let request = self.base_request(RequestKind::Heartbeat, vec![]);
        let response = self.call(&request).await?;
        if !response.is_success() {
            // a restarted namenode forgets us, it answers with register first
            warn!(message = %response.message, "Heartbeat rejected, registering again");
            return self.register().await;
        }
        Ok(())
    }

    #[instrument(name = "service_namenode_block_report", skip(self))]
    pub async fn send_block_report(&self) -> Result<()> {
        // snapshot before the exchange so no store lock spans network io
        let blocks = self.store.inventory().await;
        trace!(block_count = blocks.len(), "sending block report with");
        let request = self.base_request(RequestKind::BlockReport, blocks);
        let response = self.call(&request).await?;
        if !response.is_success() {
            warn!(message = %response.message, "Block report rejected, registering again");
            return self.register().await;
        }
        Ok(())
    }

    /// Consumes this handle, clone it first if another loop still needs one.
    pub fn start_heartbeat_loop(self) {
        tokio::spawn(async move {
            let mut ticker = interval(self.heartbeat_interval);
            loop {
                ticker.tick().await;
                if let Err(e) = self.send_heart_beat().await {
                    error!("Error while sending the heartbeat to namenode {e}");
                }
            }
        });
    }

    pub fn start_block_report_loop(self) {
        tokio::spawn(async move {
            let mut ticker = interval(self.report_interval);
            loop {
                ticker.tick().await;
                if let Err(e) = self.send_block_report().await {
                    error!("Error while sending the block report to namenode {e}");
                }
            }
        });
    }
}
