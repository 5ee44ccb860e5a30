use async_trait::async_trait;
use wire::error::Result;

use crate::namenode_state::datanode_details::DatanodeDetail;

#[async_trait]
pub trait DatanodeSelectionPolicy {
    /// Picks the datanodes hosting one new block, selection order is replica
    /// rank order.
    async fn get_datanodes_to_store(&self) -> Result<Vec<DatanodeDetail>>;
}
