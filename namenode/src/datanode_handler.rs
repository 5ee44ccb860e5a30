use std::collections::HashSet;
use std::time::Duration;

use utilities::logger::{info, instrument, tracing, warn};
use wire::{
    addressing::block_key,
    messages::{Request, Response},
};

use crate::namenode_state::{NamenodeState, datanode_details::DatanodeDetail};

pub struct DatanodeHandler {
    state: NamenodeState,
    heartbeat_timeout: Duration,
}
impl DatanodeHandler {
    pub fn new(state: NamenodeState, heartbeat_timeout: Duration) -> Self {
        Self {
            state,
            heartbeat_timeout,
        }
    }

    /// A datanode announces itself. Registering again refreshes the address
    /// and liveness so a restarted node picks up where it left off.
    #[instrument(name="namenode_datanode_register",skip(self,request),fields(request_id = %request.request_id))]
    pub async fn register(&self, request: &Request) -> Response {
        let Some(node) = request.node.as_ref() else {
            return Response::failure(&request.request_id, "Register request carries no node info");
        };
        if node.data_node_id.is_empty() || node.address.is_empty() {
            return Response::failure(
                &request.request_id,
                "Register request needs a datanode id and address",
            );
        }
        let previous = self
            .state
            .datanodes
            .insert(
                node.data_node_id.clone(),
                DatanodeDetail::new(node.data_node_id.clone(), node.address.clone()),
            )
            .await;
        if previous.is_some() {
            info!(datanode_id=%node.data_node_id, addrs=%node.address, "Datanode re-registered");
            Response::success(&request.request_id, "Connection restablished")
        } else {
            info!(datanode_id=%node.data_node_id, addrs=%node.address, "Datanode registered");
            Response::success(&request.request_id, "Connected successfully")
        }
    }

    #[instrument(name="namenode_datanode_heart_beat",skip(self,request),fields(request_id = %request.request_id))]
    pub async fn heart_beat(&self, request: &Request) -> Response {
        let Some(node) = request.node.as_ref() else {
            return Response::failure(&request.request_id, "Heartbeat carries no node info");
        };
        let known = self
            .state
            .datanodes
            .update(&node.data_node_id, |detail| detail.mark_heartbeat())
            .await;
        if known {
            Response::success(&request.request_id, "Heartbeat recorded")
        } else {
            Response::failure(
                &request.request_id,
                &format!(
                    "Datanode {} is not registered, register first",
                    node.data_node_id
                ),
            )
        }
    }

    /// One node's inventory against the recorded placements. Reconciling is
    /// idempotent and never removes a placement record, a report only speaks
    /// for the node that sent it.
    #[instrument(name="namenode_datanode_block_report",skip(self,request),fields(request_id = %request.request_id))]
    pub async fn block_report(&self, request: &Request) -> Response {
        let Some(node) = request.node.as_ref() else {
            return Response::failure(&request.request_id, "Block report carries no node info");
        };
        let known = self
            .state
            .datanodes
            .update(&node.data_node_id, |detail| detail.mark_heartbeat())
            .await;
        if !known {
            return Response::failure(
                &request.request_id,
                &format!(
                    "Datanode {} is not registered, register first",
                    node.data_node_id
                ),
            );
        }

        let reported: HashSet<String> = node
            .blocks
            .iter()
            .map(|block| block_key(&block.file_id, block.block_number))
            .collect();

        let mut held = 0u64;
        let mut lost = 0u64;
        for (key, replicas) in self.state.placements.snapshot().await {
            if !replicas
                .iter()
                .any(|replica| replica.data_node_id == node.data_node_id)
            {
                continue;
            }
            if reported.contains(&key) {
                held += 1;
                self.state
                    .clear_missing_replica(&key, &node.data_node_id)
                    .await;
            } else {
                lost += 1;
                warn!(block_key=%key, datanode_id=%node.data_node_id, "Recorded replica missing from block report");
                self.state
                    .flag_missing_replica(&key, &node.data_node_id)
                    .await;
            }
        }

        for block in &node.blocks {
            let key = block_key(&block.file_id, block.block_number);
            let placed = self
                .state
                .placements
                .get(&key)
                .await
                .map(|replicas| {
                    replicas
                        .iter()
                        .any(|replica| replica.data_node_id == node.data_node_id)
                })
                .unwrap_or(false);
            if !placed {
                warn!(block_key=%key, datanode_id=%node.data_node_id, "Datanode reported a block that was never placed on it");
            }
        }

        self.state
            .recompute_under_replicated(self.heartbeat_timeout)
            .await;
        Response::success(
            &request.request_id,
            &format!("Report reconciled, {held} blocks held, {lost} flagged missing"),
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::namenode_state::ReplicaDeficit;
    use wire::messages::{BlockMetaData, DataNodeInfo, RequestKind};

    fn node_request(request_id: &str, kind: RequestKind, node_id: &str) -> Request {
        let mut request = Request::new(request_id.to_string(), kind);
        request.node = Some(DataNodeInfo {
            data_node_id: node_id.to_string(),
            address: format!("127.0.0.1:{node_id}"),
            blocks: vec![],
        });
        request
    }

    fn replica(file_id: &str, block_number: u64, datanode_id: &str, rank: u32) -> BlockMetaData {
        BlockMetaData {
            file_id: file_id.to_string(),
            file_name: format!("{file_id}.txt"),
            block_number,
            data_node_id: datanode_id.to_string(),
            replica_rank: rank,
            length: 0,
        }
    }

    async fn registered_handler(node_ids: &[&str]) -> DatanodeHandler {
        let handler = DatanodeHandler::new(NamenodeState::new(), Duration::from_secs(5));
        for (i, id) in node_ids.iter().enumerate() {
            let response = handler
                .register(&node_request(&format!("reg-{i}"), RequestKind::Register, id))
                .await;
            assert!(response.is_success());
        }
        handler
    }

    #[tokio::test]
    async fn register_then_reregister_changes_the_message() {
        let handler = registered_handler(&["d1"]).await;
        let again = handler
            .register(&node_request("r2", RequestKind::Register, "d1"))
            .await;
        assert!(again.is_success());
        assert_eq!(again.message, "Connection restablished");
        assert_eq!(handler.state.datanodes.len().await, 1);
    }

    #[tokio::test]
    async fn heartbeat_from_an_unknown_node_tells_it_to_register() {
        let handler = registered_handler(&[]).await;
        let response = handler
            .heart_beat(&node_request("r1", RequestKind::Heartbeat, "ghost"))
            .await;
        assert!(!response.is_success());
        assert!(response.message.contains("register first"));
    }

    #[tokio::test]
    async fn report_omission_flags_but_never_deletes_the_placement() {
        let handler = registered_handler(&["d1", "d2"]).await;
        let key = block_key("f", 1);
        handler
            .state
            .placements
            .insert(
                key.clone(),
                vec![replica("f", 1, "d1", 0), replica("f", 1, "d2", 1)],
            )
            .await;

        // d2 reports an empty inventory
        let response = handler
            .block_report(&node_request("r1", RequestKind::BlockReport, "d2"))
            .await;
        assert!(response.is_success());
        assert!(response.message.contains("1 flagged missing"));

        assert_eq!(
            handler.state.placements.get(&key).await.unwrap().len(),
            2,
            "placement records survive an omitting report"
        );
        assert_eq!(
            handler.state.under_replicated.get(&key).await,
            Some(ReplicaDeficit {
                recorded: 2,
                live: 1
            })
        );

        // the same omitting report again lands in the same state
        let response = handler
            .block_report(&node_request("r2", RequestKind::BlockReport, "d2"))
            .await;
        assert!(response.is_success());
        assert_eq!(handler.state.placements.get(&key).await.unwrap().len(), 2);
        assert_eq!(
            handler.state.under_replicated.get(&key).await,
            Some(ReplicaDeficit {
                recorded: 2,
                live: 1
            })
        );
    }

    #[tokio::test]
    async fn a_later_complete_report_clears_the_flag() {
        let handler = registered_handler(&["d1", "d2"]).await;
        let key = block_key("f", 1);
        handler
            .state
            .placements
            .insert(
                key.clone(),
                vec![replica("f", 1, "d1", 0), replica("f", 1, "d2", 1)],
            )
            .await;
        handler
            .block_report(&node_request("r1", RequestKind::BlockReport, "d2"))
            .await;
        assert!(handler.state.under_replicated.contains(&key).await);

        let mut healed = node_request("r2", RequestKind::BlockReport, "d2");
        healed.node.as_mut().unwrap().blocks = vec![replica("f", 1, "d2", 1)];
        let response = handler.block_report(&healed).await;
        assert!(response.is_success());
        assert!(response.message.contains("1 blocks held"));
        assert_eq!(handler.state.under_replicated.get(&key).await, None);
    }

    #[tokio::test]
    async fn report_from_an_unregistered_node_is_refused() {
        let handler = registered_handler(&[]).await;
        let response = handler
            .block_report(&node_request("r1", RequestKind::BlockReport, "ghost"))
            .await;
        assert!(!response.is_success());
        assert!(response.message.contains("register first"));
    }
}
