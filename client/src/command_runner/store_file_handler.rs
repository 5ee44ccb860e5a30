use futures::future::join_all;
use utilities::{
    logger::{Instrument, error, info, instrument, trace, tracing, warn},
    retry_policy::retry_with_backoff,
};
use uuid::Uuid;
use wire::{
    addressing::{block_count, block_key, file_id},
    error::{DfsError, Result},
    messages::{BlockMetaData, Pipeline},
};

use crate::{
    config::WriteAckLevel,
    datanode_service::DatanodeService,
    file_chunker::{FileChunk, FileChunker},
    namenode_service::NamenodeService,
};

pub struct StoreFileHandler {
    namenode: NamenodeService,
    datanode: DatanodeService,
    block_size: u64,
    write_ack_level: WriteAckLevel,
    write_retries: u8,
}

impl StoreFileHandler {
    pub fn new(
        namenode: NamenodeService,
        datanode: DatanodeService,
        block_size: u64,
        write_ack_level: WriteAckLevel,
        write_retries: u8,
    ) -> Self {
        Self {
            namenode,
            datanode,
            block_size,
            write_ack_level,
            write_retries,
        }
    }

    #[instrument(skip(self))]
    pub async fn store_file(
        &self,
        local_file_path: String,
        remote_file_name: String,
    ) -> Result<String> {
        trace!("Fetching file metadata");
        let file_metadata = tokio::fs::metadata(&local_file_path).await?;
        if file_metadata.is_dir() {
            return Err(DfsError::InvalidUsage(format!(
                "Provided file path ({local_file_path}) is a dir"
            )));
        }
        let file_size = file_metadata.len();
        info!("file size : {file_size}");

        let response = self.namenode.open_file(&remote_file_name, file_size).await?;
        trace!(pipeline_count = response.pipelines.len(), "got namenode response");
        let expected = block_count(file_size, self.block_size);
        if response.pipelines.len() as u64 != expected {
            return Err(DfsError::Protocol(format!(
                "namenode assigned {} pipelines for {expected} blocks",
                response.pipelines.len()
            )));
        }

        let chunker = FileChunker::new(local_file_path.clone(), file_size, self.block_size);
        let id = file_id(&remote_file_name);
        let mut handles = vec![];
        for pipeline in response.pipelines {
            let datanode = self.datanode.clone();
            let chunk = chunker.chunk(pipeline.block_number);
            let file_id = id.clone();
            let file_name = remote_file_name.clone();
            let write_ack_level = self.write_ack_level;
            let write_retries = self.write_retries;
            handles.push(tokio::spawn(
                async move {
                    Self::store_block(
                        datanode,
                        file_id,
                        file_name,
                        pipeline,
                        chunk,
                        write_ack_level,
                        write_retries,
                    )
                    .await
                }
                .in_current_span(),
            ));
        }
        for handle in handles {
            handle
                .await
                .map_err(|e| DfsError::Io(std::io::Error::other(e)))??;
        }

        let closed = self.namenode.close_file(&remote_file_name).await?;
        trace!(message = %closed, "file closed");
        Ok(format!("File {remote_file_name} stored successfully"))
    }

    /// Pushes one block to every replica of its pipeline. Durable once the
    /// ack level is met, a replica that stays down past the bounded retries
    /// only fails the block under AllReplicas.
    async fn store_block(
        datanode: DatanodeService,
        file_id: String,
        file_name: String,
        pipeline: Pipeline,
        chunk: FileChunk,
        write_ack_level: WriteAckLevel,
        write_retries: u8,
    ) -> Result<()> {
        let contents = chunk.read_contents().await?;
        let key = block_key(&file_id, pipeline.block_number);
        let total = pipeline.replicas.len();

        let mut writes = vec![];
        for (rank, replica) in pipeline.replicas.iter().enumerate() {
            let datanode = datanode.clone();
            let address = replica.address.clone();
            let contents = contents.clone();
            let meta = BlockMetaData {
                file_id: file_id.clone(),
                file_name: file_name.clone(),
                block_number: pipeline.block_number,
                data_node_id: replica.data_node_id.clone(),
                replica_rank: rank as u32,
                length: contents.len() as u64,
            };
            // one id per logical replica write, a retry replays at the
            // datanode instead of re-executing
            let write_id = Uuid::new_v4().to_string();
            writes.push(async move {
                retry_with_backoff(
                    || async { datanode.write_block(&address, &write_id, &meta, &contents).await },
                    write_retries,
                )
                .await
            });
        }
        let results = join_all(writes).await;

        let successes = results.iter().filter(|result| result.is_ok()).count();
        for result in &results {
            if let Err(e) = result {
                warn!(block_key = %key, error = %e, "replica write failed");
            }
        }
        // an empty pipeline can never be durable, even under AllReplicas
        let required = match write_ack_level {
            WriteAckLevel::AnyReplica => 1,
            WriteAckLevel::AllReplicas => total.max(1),
        };
        if successes < required {
            error!(block_key = %key, successes, total, "block is not durable");
            return Err(DfsError::WriteFailed {
                block_key: key,
                reason: format!("{successes} of {total} replica writes succeeded"),
            });
        }
        trace!(block_key = %key, successes, total, "block stored");
        Ok(())
    }
}
