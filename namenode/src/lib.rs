pub mod client_handler;
pub mod config;
pub mod datanode_handler;
pub mod namenode_state;
pub mod selection_policy;
pub mod tcp;
