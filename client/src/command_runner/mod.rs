pub mod fetch_file_handler;
pub mod store_file_handler;

use fetch_file_handler::FetchFileHandler;
use store_file_handler::StoreFileHandler;
use wire::error::{DfsError, Result};

use crate::{
    config::WriteAckLevel, datanode_service::DatanodeService, namenode_service::NamenodeService,
};

pub struct CommandRunner {
    namenode: NamenodeService,
    store_file_handler: StoreFileHandler,
    fetch_file_handler: FetchFileHandler,
}

impl CommandRunner {
    pub fn new(
        namenode: NamenodeService,
        block_size: u64,
        write_ack_level: WriteAckLevel,
        write_retries: u8,
    ) -> Self {
        CommandRunner {
            store_file_handler: StoreFileHandler::new(
                namenode.clone(),
                DatanodeService::new(),
                block_size,
                write_ack_level,
                write_retries,
            ),
            fetch_file_handler: FetchFileHandler::new(
                namenode.clone(),
                DatanodeService::new(),
                block_size,
            ),
            namenode,
        }
    }

    pub async fn handle_input(&mut self, command: &str) -> Result<String> {
        match command.trim() {
            put_command if put_command.starts_with("put") => {
                let inputs: Vec<&str> = put_command.split_whitespace().collect();
                if inputs.len() < 3 {
                    return Err(DfsError::InvalidUsage(
                        "Invalid put command usage please use <help> to get help".to_owned(),
                    ));
                }
                self.store_file_handler
                    .store_file(inputs[1].to_owned(), inputs[2].to_owned())
                    .await
            }
            get_command if get_command.starts_with("get") => {
                let inputs: Vec<&str> = get_command.split_whitespace().collect();
                if inputs.len() < 3 {
                    return Err(DfsError::InvalidUsage(
                        "Invalid get command usage please use <help> to get help".to_owned(),
                    ));
                }
                self.fetch_file_handler
                    .fetch_file(inputs[1].to_owned(), inputs[2].to_owned())
                    .await
            }
            "list" => {
                let files = self.namenode.list_files().await?;
                let mut listing = format!("{} files\n", files.len());
                for file in files {
                    listing.push_str(&format!("{}  {} bytes\n", file.file_name, file.file_size));
                }
                Ok(listing)
            }
            "help" => Ok(
                "\nput command : put local_file_path remote_file_name\nget command : get remote_file_name local_file_path\nlist command : list\nexit command : exit\n"
                    .to_owned(),
            ),
            _ => Err(DfsError::InvalidUsage(
                "Invalid Command Please use valid command use help to list available commands"
                    .to_owned(),
            )),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn runner() -> CommandRunner {
        CommandRunner::new(
            NamenodeService::new("127.0.0.1:7000".to_owned(), 1),
            4,
            WriteAckLevel::default(),
            1,
        )
    }

    #[tokio::test]
    async fn incomplete_commands_are_usage_errors() {
        let mut runner = runner();
        assert!(matches!(
            runner.handle_input("put only_one_arg").await,
            Err(DfsError::InvalidUsage(_))
        ));
        assert!(matches!(
            runner.handle_input("get only_one_arg").await,
            Err(DfsError::InvalidUsage(_))
        ));
    }

    #[tokio::test]
    async fn unknown_commands_are_refused() {
        let mut runner = runner();
        assert!(matches!(
            runner.handle_input("frobnicate a b").await,
            Err(DfsError::InvalidUsage(_))
        ));
    }

    #[tokio::test]
    async fn help_names_every_command() {
        let mut runner = runner();
        let help = runner.handle_input("help").await.unwrap();
        for command in ["put", "get", "list", "exit"] {
            assert!(help.contains(command));
        }
    }
}
