pub mod block_store;
pub mod client;
pub mod config;
pub mod namenode;
pub mod tcp;
