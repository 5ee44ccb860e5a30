use std::time::Duration;

use utilities::logger::{instrument, trace, tracing, warn};
use wire::{
    addressing::{block_count, block_key},
    error::DfsError,
    messages::{BlockMetaData, DataNodeInfo, Pipeline, Request, Response},
    ordering::replica_order,
};

use crate::{
    namenode_state::NamenodeState,
    selection_policy::{
        random_selection_policy::RandomDatanodeSelectionPolicy,
        selection_policy::DatanodeSelectionPolicy,
    },
};

pub struct ClientHandler {
    state: NamenodeState,
    datanode_selector: Box<dyn DatanodeSelectionPolicy + Send + Sync>,
    block_size: u64,
    replication_factor: usize,
}
impl ClientHandler {
    pub fn new(
        state: NamenodeState,
        block_size: u64,
        replication_factor: usize,
        heartbeat_timeout: Duration,
    ) -> Self {
        let datanode_selection_policy = Box::new(RandomDatanodeSelectionPolicy::new(
            state.clone(),
            replication_factor,
            heartbeat_timeout,
        ));
        Self {
            state,
            datanode_selector: datanode_selection_policy,
            block_size,
            replication_factor,
        }
    }

    /// Single entry point for create and continue, the distinguishing signal
    /// is whether the file id is already recorded.
    #[instrument(name="namenode_open_file",skip(self,request),fields(request_id = %request.request_id))]
    pub async fn open_file(&self, request: &Request) -> Response {
        let Some(file) = request.file.as_ref() else {
            return Response::failure(&request.request_id, "Open request carries no file metadata");
        };
        if file.file_id.is_empty() {
            return Response::failure(&request.request_id, "Open request carries no file id");
        }
        if self.state.files.contains(&file.file_id).await {
            self.locate_blocks(request).await
        } else {
            self.assign_blocks(request).await
        }
    }

    #[instrument(name="namenode_assign_blocks",skip(self,request),fields(request_id = %request.request_id))]
    pub async fn assign_blocks(&self, request: &Request) -> Response {
        let Some(file) = request.file.as_ref() else {
            return Response::failure(&request.request_id, "Assign request carries no file metadata");
        };
        let num_blocks = block_count(file.file_size, self.block_size);
        trace!(file_id=%file.file_id, file_size=%file.file_size, %num_blocks, "Assigning blocks");

        let mut assigned: Vec<(String, Vec<BlockMetaData>)> = vec![];
        let mut pipelines = vec![];
        for block_number in 1..=num_blocks {
            let replicas = match self.datanode_selector.get_datanodes_to_store().await {
                Ok(replicas) => replicas,
                Err(e) => {
                    return Response::failure(&request.request_id, &e.to_string());
                }
            };
            let records = replicas
                .iter()
                .enumerate()
                .map(|(rank, node)| BlockMetaData {
                    file_id: file.file_id.clone(),
                    file_name: file.file_name.clone(),
                    block_number,
                    data_node_id: node.id.clone(),
                    replica_rank: rank as u32,
                    length: 0,
                })
                .collect();
            assigned.push((block_key(&file.file_id, block_number), records));
            pipelines.push(Pipeline {
                block_number,
                replicas: replicas.iter().map(|node| node.into()).collect(),
            });
        }

        // nothing is recorded until every block found a home
        for (key, records) in assigned {
            self.state.placements.insert(key, records).await;
        }
        self.state
            .files
            .insert(file.file_id.clone(), file.clone())
            .await;

        let shortest = pipelines
            .iter()
            .map(|pipeline| pipeline.replicas.len())
            .min()
            .unwrap_or(0);
        let message = if shortest < self.replication_factor {
            warn!(file_id=%file.file_id, %shortest, factor=%self.replication_factor, "Assigned with degraded replication");
            format!(
                "Blocks for {} have been assigned successfully with degraded replication {} of {}",
                file.file_name, shortest, self.replication_factor
            )
        } else {
            format!(
                "Blocks for {} have been assigned successfully",
                file.file_name
            )
        };
        let mut response = Response::success(&request.request_id, &message);
        response.pipelines = pipelines;
        response.files = vec![file.clone()];
        response
    }

    /// Pipelines for a file that was assigned earlier, built from the
    /// recorded metadata because the caller may not know the size.
    #[instrument(name="namenode_locate_blocks",skip(self,request),fields(request_id = %request.request_id))]
    pub async fn locate_blocks(&self, request: &Request) -> Response {
        let Some(file) = request.file.as_ref() else {
            return Response::failure(&request.request_id, "Locate request carries no file metadata");
        };
        let Some(recorded) = self.state.files.get(&file.file_id).await else {
            let e = DfsError::FileNotFound {
                file_name: file.file_name.clone(),
            };
            return Response::failure(&request.request_id, &e.to_string());
        };
        let num_blocks = block_count(recorded.file_size, self.block_size);
        let mut pipelines = vec![];
        for block_number in 1..=num_blocks {
            let key = block_key(&recorded.file_id, block_number);
            let Some(mut replicas) = self.state.placements.get(&key).await else {
                // one missing record poisons the whole call, a partial
                // pipeline list would read as a shorter file
                let e = DfsError::BlockNotFound {
                    file_name: recorded.file_name.clone(),
                    block_number,
                };
                return Response::failure(&request.request_id, &e.to_string());
            };
            replicas.sort_by(replica_order);
            let mut nodes: Vec<DataNodeInfo> = vec![];
            for replica in &replicas {
                match self.state.datanodes.get(&replica.data_node_id).await {
                    Some(detail) => nodes.push((&detail).into()),
                    None => {
                        warn!(block_key=%key, datanode_id=%replica.data_node_id, "Replica host is not in the directory, leaving it out of the pipeline");
                    }
                }
            }
            pipelines.push(Pipeline {
                block_number,
                replicas: nodes,
            });
        }
        trace!(file_id=%recorded.file_id, pipeline_count = pipelines.len(), "Located blocks");
        let mut response = Response::success(
            &request.request_id,
            &format!("Blocks for {} successfully found", recorded.file_name),
        );
        response.pipelines = pipelines;
        response.files = vec![recorded];
        response
    }

    #[instrument(name="namenode_close_file",skip(self,request),fields(request_id = %request.request_id))]
    pub async fn close_file(&self, request: &Request) -> Response {
        let Some(file) = request.file.as_ref() else {
            return Response::failure(&request.request_id, "Close request carries no file metadata");
        };
        if self.state.files.contains(&file.file_id).await {
            Response::success(
                &request.request_id,
                &format!("File {} closed successfully", file.file_name),
            )
        } else {
            let e = DfsError::FileNotFound {
                file_name: file.file_name.clone(),
            };
            Response::failure(&request.request_id, &e.to_string())
        }
    }

    #[instrument(name="namenode_list_files",skip(self,request),fields(request_id = %request.request_id))]
    pub async fn list(&self, request: &Request) -> Response {
        let mut files: Vec<_> = self
            .state
            .files
            .snapshot()
            .await
            .into_iter()
            .map(|(_, file)| file)
            .collect();
        files.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        let mut response =
            Response::success(&request.request_id, &format!("{} files found", files.len()));
        response.files = files;
        response
    }
}
