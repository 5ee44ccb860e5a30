use utilities::logger::{Instrument, error, info, instrument, trace, tracing, warn};
use wire::{
    addressing::{block_count, block_span, file_id},
    error::{DfsError, Result},
    messages::{BlockMetaData, Pipeline},
};

use crate::{
    block_joiner::BlockJoiner, datanode_service::DatanodeService,
    namenode_service::NamenodeService,
};

pub struct FetchFileHandler {
    namenode: NamenodeService,
    datanode: DatanodeService,
    block_size: u64,
}

impl FetchFileHandler {
    pub fn new(namenode: NamenodeService, datanode: DatanodeService, block_size: u64) -> Self {
        Self {
            namenode,
            datanode,
            block_size,
        }
    }

    #[instrument(skip(self))]
    pub async fn fetch_file(
        &self,
        remote_file_name: String,
        local_file_path: String,
    ) -> Result<String> {
        trace!("fetching the file {remote_file_name}");
        let response = self.namenode.locate_blocks(&remote_file_name).await?;
        let Some(recorded) = response.files.first() else {
            return Err(DfsError::Protocol(
                "Locate response carries no file metadata".to_owned(),
            ));
        };
        let file_size = recorded.file_size;
        let expected = block_count(file_size, self.block_size);
        if response.pipelines.len() as u64 != expected {
            return Err(DfsError::Protocol(format!(
                "namenode located {} pipelines for {expected} blocks",
                response.pipelines.len()
            )));
        }
        trace!(pipeline_count = response.pipelines.len(), %file_size, "got block locations");

        let joiner = BlockJoiner::new(local_file_path.clone(), file_size).await?;
        let id = file_id(&remote_file_name);
        let mut handles = vec![];
        for pipeline in response.pipelines {
            let datanode = self.datanode.clone();
            let joiner = joiner.clone();
            let file_id = id.clone();
            let file_name = remote_file_name.clone();
            let block_size = self.block_size;
            handles.push(tokio::spawn(
                async move {
                    Self::fetch_block(
                        datanode, joiner, file_id, file_name, file_size, block_size, pipeline,
                    )
                    .await
                }
                .in_current_span(),
            ));
        }
        for handle in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => Err(DfsError::Io(std::io::Error::other(e))),
            };
            if let Err(e) = outcome {
                error!(error = %e, "Error during block fetching");
                info!("Removing the partly written file");
                joiner.abort().await;
                return Err(e);
            }
        }
        Ok(format!("File {remote_file_name} fetched successfully"))
    }

    /// Reads one block, walking the ranked replicas until one serves the
    /// full span.
    async fn fetch_block(
        datanode: DatanodeService,
        joiner: BlockJoiner,
        file_id: String,
        file_name: String,
        file_size: u64,
        block_size: u64,
        pipeline: Pipeline,
    ) -> Result<()> {
        let (start_offset, end_offset) = block_span(file_size, block_size, pipeline.block_number);
        let span_len = end_offset - start_offset;
        let meta = BlockMetaData {
            file_id,
            file_name: file_name.clone(),
            block_number: pipeline.block_number,
            data_node_id: String::new(),
            replica_rank: 0,
            length: 0,
        };
        let mut last_error = DfsError::BlockNotFound {
            file_name: file_name.clone(),
            block_number: pipeline.block_number,
        };
        for replica in &pipeline.replicas {
            match datanode.read_block(&replica.address, &meta).await {
                Ok((_, contents)) => {
                    if contents.len() as u64 != span_len {
                        warn!(replica = %replica.data_node_id, expected = span_len, actual = contents.len(), "replica served the wrong amount of data, trying the next one");
                        last_error = DfsError::PartialRead {
                            file_name: file_name.clone(),
                            block_number: pipeline.block_number,
                            expected: span_len,
                            actual: contents.len() as u64,
                        };
                        continue;
                    }
                    joiner.join_block(start_offset, &contents).await?;
                    return Ok(());
                }
                Err(e) => {
                    warn!(replica = %replica.data_node_id, error = %e, "replica read failed, trying the next one");
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }
}
