pub mod datanode_details;
pub mod state_mantainer;

use std::collections::HashSet;
use std::time::Duration;

use utilities::{
    logger::{info, warn},
    shared_map::SharedMap,
};
use wire::messages::{BlockMetaData, FileMetadata};

use crate::namenode_state::datanode_details::DatanodeDetail;

/// Gap between how many replicas are recorded for a block and how many of
/// them are on live, report confirmed datanodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaDeficit {
    pub recorded: usize,
    pub live: usize,
}

/// Every logical table is its own lock so client traffic, datanode traffic
/// and the sweeper never serialize on one big mutex.
#[derive(Clone, Default)]
pub struct NamenodeState {
    /// file_id -> recorded metadata, written once on first assignment.
    pub files: SharedMap<String, FileMetadata>,
    /// block_key -> one record per replica. Records are never removed, a
    /// lost replica is flagged instead.
    pub placements: SharedMap<String, Vec<BlockMetaData>>,
    /// block_key -> current deficit, rebuilt by the sweeper and after reports.
    pub under_replicated: SharedMap<String, ReplicaDeficit>,
    /// block_key -> datanode ids whose block report omitted the block.
    pub missing_replicas: SharedMap<String, HashSet<String>>,
    pub datanodes: SharedMap<String, DatanodeDetail>,
}

impl NamenodeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn live_datanodes(&self, heartbeat_timeout: Duration) -> Vec<DatanodeDetail> {
        self.datanodes
            .snapshot()
            .await
            .into_iter()
            .map(|(_, detail)| detail)
            .filter(|detail| detail.is_live(heartbeat_timeout))
            .collect()
    }

    pub async fn flag_missing_replica(&self, block_key: &str, datanode_id: &str) {
        self.missing_replicas
            .upsert(block_key.to_owned(), HashSet::new(), |nodes| {
                nodes.insert(datanode_id.to_owned());
            })
            .await;
    }

    pub async fn clear_missing_replica(&self, block_key: &str, datanode_id: &str) {
        self.missing_replicas
            .update(block_key, |nodes| {
                nodes.remove(datanode_id);
            })
            .await;
        let emptied = self
            .missing_replicas
            .get(block_key)
            .await
            .map(|nodes| nodes.is_empty())
            .unwrap_or(false);
        if emptied {
            self.missing_replicas.remove(block_key).await;
        }
    }

    /// Rebuilds the under replicated view from recorded placements, node
    /// liveness and report flagged gaps. Placement records are never touched.
    pub async fn recompute_under_replicated(&self, heartbeat_timeout: Duration) {
        let live_ids: HashSet<String> = self
            .live_datanodes(heartbeat_timeout)
            .await
            .into_iter()
            .map(|detail| detail.id)
            .collect();
        for (block_key, replicas) in self.placements.snapshot().await {
            let flagged = self
                .missing_replicas
                .get(&block_key)
                .await
                .unwrap_or_default();
            let recorded = replicas.len();
            let live = replicas
                .iter()
                .filter(|replica| {
                    live_ids.contains(&replica.data_node_id)
                        && !flagged.contains(&replica.data_node_id)
                })
                .count();
            if live < recorded {
                let deficit = ReplicaDeficit { recorded, live };
                let previous = self
                    .under_replicated
                    .insert(block_key.clone(), deficit.clone())
                    .await;
                if previous.as_ref() != Some(&deficit) {
                    warn!(block_key=%block_key, recorded, live, "Block is under replicated");
                }
            } else if self.under_replicated.remove(&block_key).await.is_some() {
                info!(block_key=%block_key, recorded, "Block replication recovered");
            }
        }
    }
}
