use std::time::{Duration, Instant};

use wire::messages::DataNodeInfo;

#[derive(Debug, Clone)]
pub struct DatanodeDetail {
    pub id: String,
    pub addrs: String,
    pub hearbeat_instant: Instant,
}

impl DatanodeDetail {
    pub fn new(id: String, addrs: String) -> Self {
        Self {
            id,
            addrs,
            hearbeat_instant: Instant::now(),
        }
    }
    pub fn mark_heartbeat(&mut self) {
        self.hearbeat_instant = Instant::now();
    }
    pub fn is_live(&self, heartbeat_timeout: Duration) -> bool {
        self.hearbeat_instant.elapsed() <= heartbeat_timeout
    }
}

impl Into<DataNodeInfo> for &DatanodeDetail {
    fn into(self) -> DataNodeInfo {
        DataNodeInfo {
            data_node_id: self.id.clone(),
            address: self.addrs.clone(),
            blocks: vec![],
        }
    }
}
