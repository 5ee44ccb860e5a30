use figment::{
    Figment,
    providers::{Format, Serialized, Yaml},
};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// When a block counts as durably written.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WriteAckLevel {
    /// One replica acknowledgement is enough, the rest are best effort.
    #[default]
    AnyReplica,
    /// Every replica in the pipeline has to acknowledge.
    AllReplicas,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub client_id: String,
    pub namenode_addrs: String,
    /// Has to match the namenode's block size, the pipeline count check in
    /// the store path catches a drifted value.
    pub block_size: u64,
    pub write_ack_level: WriteAckLevel,
    pub write_retries: u8,
    pub connect_retries: u8,
    pub log_level: String,
    pub log_base: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_id: format!("client-{}", Uuid::new_v4()),
            namenode_addrs: "127.0.0.1:7000".to_string(),
            block_size: 64 * 1024 * 1024,
            write_ack_level: WriteAckLevel::default(),
            write_retries: 3,
            connect_retries: 3,
            log_level: "trace".to_string(),
            log_base: "./temp/client/".to_string(),
        }
    }
}

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    let env = std::env::var("ENV").unwrap_or_else(|_| "default".to_owned());
    let config_file_path =
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| format!("./client/config/{}.yaml", env));
    println!("reading config from {config_file_path:?}");
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Yaml::file(config_file_path))
        .extract()
        .unwrap()
});
