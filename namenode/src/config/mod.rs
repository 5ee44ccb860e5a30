use figment::{
    Figment,
    providers::{Format, Serialized, Yaml},
};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub id: String,
    pub tcp_port: String,
    /// Cluster wide block size in bytes, every client must agree with it.
    pub block_size: u64,
    pub replication_factor: usize,
    /// A datanode silent for longer than this is treated as dead.
    pub heartbeat_timeout_secs: u64,
    pub sweep_interval_secs: u64,
    pub journal_capacity: usize,
    pub log_level: String,
    pub log_base: String,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            id: "namenode".to_string(),
            tcp_port: 7000.to_string(),
            block_size: 64 * 1024 * 1024,
            replication_factor: 3,
            heartbeat_timeout_secs: 6,
            sweep_interval_secs: 5,
            journal_capacity: 1024,
            log_level: "trace".to_string(),
            log_base: "./temp/namenode/".to_string(),
        }
    }
}
pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    let env = std::env::var("ENV").unwrap_or_else(|_| "default".to_owned());
    let config_file_path =
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| format!("./namenode/config/{}.yaml", env));
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Yaml::file(config_file_path))
        .extract()
        .unwrap()
});
