use std::time::Duration;

use tokio::time::interval;
use utilities::logger::{instrument, trace, tracing};

use crate::namenode_state::NamenodeState;

/// To mantain the liveness view and the under replicated set based on the
/// heartbeat age. Repair itself is not scheduled here, the deficit is left
/// observable in state and logs.
pub struct StateMantainer {
    namenode_state: NamenodeState,
    heartbeat_timeout: Duration,
    sweep_interval: Duration,
}

impl StateMantainer {
    pub fn new(
        namenode_state: NamenodeState,
        heartbeat_timeout: Duration,
        sweep_interval: Duration,
    ) -> Self {
        Self {
            namenode_state,
            heartbeat_timeout,
            sweep_interval,
        }
    }
    pub fn start(self) {
        tokio::spawn(async move {
            let mut ticker = interval(self.sweep_interval);
            loop {
                ticker.tick().await;
                self.sweep().await;
            }
        });
    }
    #[instrument(name = "namenode_state_sync", skip(self))]
    async fn sweep(&self) {
        let live = self
            .namenode_state
            .live_datanodes(self.heartbeat_timeout)
            .await;
        trace!(live_count = live.len(), "Swept datanode liveness");
        self.namenode_state
            .recompute_under_replicated(self.heartbeat_timeout)
            .await;
    }
}
