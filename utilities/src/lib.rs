pub mod logger;
pub mod request_journal;
pub mod retry_policy;
pub mod shared_map;
pub mod tcp_pool;
