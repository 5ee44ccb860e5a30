use std::time::Duration;

use namenode::{
    client_handler::ClientHandler,
    config::CONFIG,
    datanode_handler::DatanodeHandler,
    namenode_state::{NamenodeState, state_mantainer::StateMantainer},
    tcp::service::TCPService,
};
use utilities::logger::{info, init_logger};
use wire::error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let _gaurd = init_logger(
        "Namenode",
        &CONFIG.id,
        CONFIG.log_level.clone(),
        &CONFIG.log_base,
    );
    info!(tcp_port=%CONFIG.tcp_port,"Starting the namenode tcp service on port");

    let state = NamenodeState::new();
    let heartbeat_timeout = Duration::from_secs(CONFIG.heartbeat_timeout_secs);
    StateMantainer::new(
        state.clone(),
        heartbeat_timeout,
        Duration::from_secs(CONFIG.sweep_interval_secs),
    )
    .start();

    let service = TCPService::new(
        &format!("0.0.0.0:{}", CONFIG.tcp_port),
        ClientHandler::new(
            state.clone(),
            CONFIG.block_size,
            CONFIG.replication_factor,
            heartbeat_timeout,
        ),
        DatanodeHandler::new(state, heartbeat_timeout),
        CONFIG.journal_capacity,
    )
    .await?;
    service.start_and_accept().await
}
