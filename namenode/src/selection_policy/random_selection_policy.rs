use std::time::Duration;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use utilities::logger::{instrument, tracing};
use wire::error::{DfsError, Result};

use super::selection_policy::DatanodeSelectionPolicy;
use crate::namenode_state::{NamenodeState, datanode_details::DatanodeDetail};

pub struct RandomDatanodeSelectionPolicy {
    namenode_state: NamenodeState,
    replication_factor: usize,
    heartbeat_timeout: Duration,
}
impl RandomDatanodeSelectionPolicy {
    pub fn new(
        namenode_state: NamenodeState,
        replication_factor: usize,
        heartbeat_timeout: Duration,
    ) -> Self {
        Self {
            namenode_state,
            replication_factor,
            heartbeat_timeout,
        }
    }
}
// uniform policy, every block gets a fresh shuffle of the live nodes
#[async_trait]
impl DatanodeSelectionPolicy for RandomDatanodeSelectionPolicy {
    #[instrument(name = "policy_datanode_selection_to_store", skip(self))]
    async fn get_datanodes_to_store(&self) -> Result<Vec<DatanodeDetail>> {
        let mut live = self
            .namenode_state
            .live_datanodes(self.heartbeat_timeout)
            .await;
        if live.is_empty() {
            return Err(DfsError::InsufficientReplicas);
        }
        live.shuffle(&mut rand::thread_rng());
        live.truncate(self.replication_factor);
        Ok(live)
    }
}
