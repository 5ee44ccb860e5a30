use std::time::Duration;

use datanode::{
    block_store::BlockStore,
    client::handler::ClientHandler,
    config::CONFIG,
    namenode::service::NamenodeService,
    tcp::service::TCPService,
};
use utilities::logger::{info, init_logger};
use wire::error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let _gaurd = init_logger(
        "Datanode",
        &CONFIG.datanode_id,
        CONFIG.log_level.clone(),
        &CONFIG.log_base,
    );

    let store = BlockStore::open(CONFIG.storage_config.clone().into())?;
    let restored = store.rescan().await?;
    info!(restored, "Block store opened");

    let service = TCPService::new(
        &format!("0.0.0.0:{}", CONFIG.tcp_port),
        ClientHandler::new(
            store.clone(),
            CONFIG.datanode_id.clone(),
            CONFIG.external_tcp_addrs.clone(),
        ),
        CONFIG.journal_capacity,
    )
    .await?;

    let namenode_service = NamenodeService::new(
        CONFIG.namenode_addrs.clone(),
        CONFIG.datanode_id.clone(),
        CONFIG.external_tcp_addrs.clone(),
        store,
        Duration::from_secs(CONFIG.heartbeat_interval_secs),
        Duration::from_secs(CONFIG.block_report_interval_secs),
        CONFIG.connect_retries,
    );
    // no point serving traffic the namenode will never route here
    namenode_service.register().await?;
    namenode_service.clone().start_heartbeat_loop();
    namenode_service.start_block_report_loop();

    info!(tcp_port=%CONFIG.tcp_port,"Starting the datanode tcp service on port");
    service.start_and_accept().await
}
