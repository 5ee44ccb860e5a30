use figment::{
    Figment,
    providers::{Format, Serialized, Yaml},
};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use storage::file_storage::FileStorageConfig;
use uuid::Uuid;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct StorageConfig {
    // path to the dir where the blocks will be stored
    pub storage_path: String,
}

impl Into<FileStorageConfig> for StorageConfig {
    fn into(self) -> FileStorageConfig {
        FileStorageConfig {
            root: self.storage_path,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub datanode_id: String,
    pub namenode_addrs: String,
    pub tcp_port: String,
    /// Address other processes dial to reach this node, what gets registered
    /// at the namenode.
    pub external_tcp_addrs: String,
    pub storage_config: StorageConfig,
    pub heartbeat_interval_secs: u64,
    pub block_report_interval_secs: u64,
    pub connect_retries: u8,
    pub journal_capacity: usize,
    pub log_level: String,
    pub log_base: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            datanode_id: format!("datanode-{}", Uuid::new_v4()),
            namenode_addrs: "127.0.0.1:7000".to_string(),
            tcp_port: "3000".to_string(),
            external_tcp_addrs: "127.0.0.1:3000".to_string(),
            storage_config: StorageConfig {
                storage_path: "./temp/datanode/blocks".to_string(),
            },
            heartbeat_interval_secs: 2,
            block_report_interval_secs: 10,
            connect_retries: 3,
            journal_capacity: 1024,
            log_level: "trace".to_string(),
            log_base: "./temp/datanode/".to_string(),
        }
    }
}

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    let env = std::env::var("ENV").unwrap_or_else(|_| "default".to_owned());
    let config_file_path =
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| format!("./datanode/config/{}.yaml", env));
    println!("Reading config from file : {config_file_path}");
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Yaml::file(config_file_path))
        .extract()
        .unwrap()
});
