//! Envelope messages exchanged between client, namenode and datanode. Every
//! operation travels as a [`Request`] and comes back as a [`Response`], so the
//! transport only ever has to move one frame shape in each direction.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FileMetadata {
    #[prost(string, tag = "1")]
    pub file_id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub file_name: ::prost::alloc::string::String,
    #[prost(uint64, tag = "3")]
    pub file_size: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BlockMetaData {
    #[prost(string, tag = "1")]
    pub file_id: ::prost::alloc::string::String,
    /// Carried alongside the id so failures can name the file a human knows.
    #[prost(string, tag = "2")]
    pub file_name: ::prost::alloc::string::String,
    /// 1-based and contiguous within a file.
    #[prost(uint64, tag = "3")]
    pub block_number: u64,
    #[prost(string, tag = "4")]
    pub data_node_id: ::prost::alloc::string::String,
    /// 0 is the primary replica, secondaries count up from there.
    #[prost(uint32, tag = "5")]
    pub replica_rank: u32,
    /// Content length recorded at write time, a shorter read is a partial read.
    #[prost(uint64, tag = "6")]
    pub length: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Block {
    #[prost(message, optional, tag = "1")]
    pub meta: ::core::option::Option<BlockMetaData>,
    #[prost(bytes = "vec", tag = "2")]
    pub contents: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DataNodeInfo {
    #[prost(string, tag = "1")]
    pub data_node_id: ::prost::alloc::string::String,
    /// host:port of the node's envelope service.
    #[prost(string, tag = "2")]
    pub address: ::prost::alloc::string::String,
    /// Local inventory, only populated for block reports and datanode `list`.
    #[prost(message, repeated, tag = "3")]
    pub blocks: ::prost::alloc::vec::Vec<BlockMetaData>,
}

/// Replica set of one block, primary first.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Pipeline {
    #[prost(uint64, tag = "1")]
    pub block_number: u64,
    #[prost(message, repeated, tag = "2")]
    pub replicas: ::prost::alloc::vec::Vec<DataNodeInfo>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Request {
    /// Client generated, unique per logical operation. Retries reuse it so the
    /// receiver can deduplicate.
    #[prost(string, tag = "1")]
    pub request_id: ::prost::alloc::string::String,
    #[prost(enumeration = "RequestKind", tag = "2")]
    pub kind: i32,
    #[prost(message, optional, tag = "3")]
    pub file: ::core::option::Option<FileMetadata>,
    #[prost(message, optional, tag = "4")]
    pub block: ::core::option::Option<Block>,
    #[prost(message, optional, tag = "5")]
    pub node: ::core::option::Option<DataNodeInfo>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Response {
    /// Echo of the request id this response answers.
    #[prost(string, tag = "1")]
    pub response_id: ::prost::alloc::string::String,
    #[prost(enumeration = "ResponseStatus", tag = "2")]
    pub status: i32,
    #[prost(string, tag = "3")]
    pub message: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "4")]
    pub block: ::core::option::Option<Block>,
    #[prost(message, repeated, tag = "5")]
    pub pipelines: ::prost::alloc::vec::Vec<Pipeline>,
    #[prost(message, repeated, tag = "6")]
    pub files: ::prost::alloc::vec::Vec<FileMetadata>,
    #[prost(message, optional, tag = "7")]
    pub node: ::core::option::Option<DataNodeInfo>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum RequestKind {
    Open = 0,
    Close = 1,
    List = 2,
    ReadBlock = 3,
    WriteBlock = 4,
    Heartbeat = 5,
    BlockReport = 6,
    Register = 7,
    Locate = 8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ResponseStatus {
    Success = 0,
    Failure = 1,
}

impl Request {
    pub fn new(request_id: String, kind: RequestKind) -> Self {
        Request {
            request_id,
            kind: kind as i32,
            ..Default::default()
        }
    }
}

impl Response {
    pub fn success(request_id: &str, message: &str) -> Self {
        Response {
            response_id: request_id.to_owned(),
            status: ResponseStatus::Success as i32,
            message: message.to_owned(),
            ..Default::default()
        }
    }
    pub fn failure(request_id: &str, message: &str) -> Self {
        Response {
            response_id: request_id.to_owned(),
            status: ResponseStatus::Failure as i32,
            message: message.to_owned(),
            ..Default::default()
        }
    }
    pub fn is_success(&self) -> bool {
        self.status() == ResponseStatus::Success
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn response_helpers_set_status_and_echo_id() {
        let ok = Response::success("req-1", "done");
        assert!(ok.is_success());
        assert_eq!(ok.response_id, "req-1");
        let bad = Response::failure("req-2", "nope");
        assert!(!bad.is_success());
        assert_eq!(bad.status(), ResponseStatus::Failure);
    }

    #[test]
    fn operation_kinds_are_a_closed_set() {
        assert_eq!(RequestKind::try_from(4), Ok(RequestKind::WriteBlock));
        assert_eq!(RequestKind::try_from(8), Ok(RequestKind::Locate));
        assert!(RequestKind::try_from(42).is_err());
    }
}
