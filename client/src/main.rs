use std::io::{self, Write};

use client::{command_runner::CommandRunner, config::CONFIG, namenode_service::NamenodeService};
use utilities::logger::{info, init_logger};
use wire::error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let _gaurd = init_logger(
        "Client",
        &CONFIG.client_id,
        CONFIG.log_level.clone(),
        &CONFIG.log_base,
    );
    let namenode = NamenodeService::new(CONFIG.namenode_addrs.clone(), CONFIG.connect_retries);
    let mut command_runner = CommandRunner::new(
        namenode,
        CONFIG.block_size,
        CONFIG.write_ack_level,
        CONFIG.write_retries,
    );
    info!("starting the Client");
    loop {
        print!("$> ");
        io::stdout().flush()?;
        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) => break,
            Ok(_bytes) => {
                if input.trim() == "exit" {
                    break;
                }
                if input.trim().is_empty() {
                    continue;
                }
                match command_runner.handle_input(&input).await {
                    Ok(message) => {
                        println!("Success : {}", message);
                    }
                    Err(message) => {
                        println!("Error : {}", message);
                    }
                }
            }
            Err(e) => {
                println!("error while reading the command {:?}", e);
            }
        }
    }
    Ok(())
}
