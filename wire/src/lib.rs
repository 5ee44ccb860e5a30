pub mod addressing;
pub mod codec;
pub mod error;
pub mod messages;
pub mod ordering;
