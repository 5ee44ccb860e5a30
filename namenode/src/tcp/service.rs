use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use utilities::{
    logger::{Instrument, Span, error, instrument, trace, tracing},
    request_journal::{Claim, RequestJournal},
};
use wire::{
    codec::{read_frame, write_frame},
    error::{DfsError, Result},
    messages::{Request, RequestKind, Response},
};

use crate::{client_handler::ClientHandler, datanode_handler::DatanodeHandler};

pub struct TCPService {
    listener: TcpListener,
    client_handler: Arc<ClientHandler>,
    datanode_handler: Arc<DatanodeHandler>,
    journal: RequestJournal<Response>,
}

impl TCPService {
    pub async fn new(
        address: &str,
        client_handler: ClientHandler,
        datanode_handler: DatanodeHandler,
        journal_capacity: usize,
    ) -> Result<Self> {
        let listener = TcpListener::bind(address).await?;
        Ok(TCPService {
            listener,
            client_handler: Arc::new(client_handler),
            datanode_handler: Arc::new(datanode_handler),
            journal: RequestJournal::new(journal_capacity),
        })
    }

    /// Bound address, useful when the service was asked for port 0.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub async fn start_and_accept(&self) -> Result<()> {
        loop {
            let (tcp_stream, _) = self.listener.accept().await?;
            let client_handler = self.client_handler.clone();
            let datanode_handler = self.datanode_handler.clone();
            let journal = self.journal.clone();
            let span = Span::current();
            tokio::spawn(
                async move {
                    if let Err(e) = Self::handle_connection(
                        tcp_stream,
                        client_handler,
                        datanode_handler,
                        journal,
                    )
                    .await
                    {
                        error!("error while handling the tcp connection {e}");
                    }
                }
                .instrument(span),
            );
        }
    }

    async fn handle_connection(
        mut tcp_stream: TcpStream,
        client_handler: Arc<ClientHandler>,
        datanode_handler: Arc<DatanodeHandler>,
        journal: RequestJournal<Response>,
    ) -> Result<()> {
        loop {
            let request: Request = match read_frame(&mut tcp_stream).await {
                Ok(request) => request,
                Err(DfsError::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    trace!("peer closed the connection");
                    return Ok(());
                }
                Err(e) => return Err(e),
            };
            let response =
                Self::dispatch(&request, &client_handler, &datanode_handler, &journal).await;
            write_frame(&mut tcp_stream, &response).await?;
        }
    }

    #[instrument(name = "namenode_dispatch", skip_all, fields(request_id = %request.request_id, kind = request.kind))]
    async fn dispatch(
        request: &Request,
        client_handler: &ClientHandler,
        datanode_handler: &DatanodeHandler,
        journal: &RequestJournal<Response>,
    ) -> Response {
        match journal.claim(&request.request_id).await {
            Claim::Replayed(response) => return response,
            Claim::InFlight => {
                return Response::failure(&request.request_id, "Request is already being processed");
            }
            Claim::Fresh => {}
        }
        let response = match RequestKind::try_from(request.kind) {
            Ok(RequestKind::Open) => client_handler.open_file(request).await,
            Ok(RequestKind::Locate) => client_handler.locate_blocks(request).await,
            Ok(RequestKind::Close) => client_handler.close_file(request).await,
            Ok(RequestKind::List) => client_handler.list(request).await,
            Ok(RequestKind::Register) => datanode_handler.register(request).await,
            Ok(RequestKind::Heartbeat) => datanode_handler.heart_beat(request).await,
            Ok(RequestKind::BlockReport) => datanode_handler.block_report(request).await,
            Ok(kind) => Response::failure(
                &request.request_id,
                &format!("Operation {kind:?} is not served by the namenode"),
            ),
            Err(_) => Response::failure(
                &request.request_id,
                &format!("Unknown operation kind {}", request.kind),
            ),
        };
        journal.complete(&request.request_id, response.clone()).await;
        response
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::namenode_state::NamenodeState;
    use std::time::Duration;
    use wire::messages::DataNodeInfo;

    fn handlers() -> (ClientHandler, DatanodeHandler) {
        let state = NamenodeState::new();
        (
            ClientHandler::new(state.clone(), 4, 2, Duration::from_secs(5)),
            DatanodeHandler::new(state, Duration::from_secs(5)),
        )
    }

    #[tokio::test]
    async fn duplicate_request_ids_replay_the_first_response() {
        let (client_handler, datanode_handler) = handlers();
        let journal = RequestJournal::new(8);

        let mut request = Request::new("r1".to_string(), RequestKind::Register);
        request.node = Some(DataNodeInfo {
            data_node_id: "d1".to_string(),
            address: "127.0.0.1:9000".to_string(),
            blocks: vec![],
        });

        let first =
            TCPService::dispatch(&request, &client_handler, &datanode_handler, &journal).await;
        let second =
            TCPService::dispatch(&request, &client_handler, &datanode_handler, &journal).await;

        assert!(first.is_success());
        assert_eq!(first.message, "Connected successfully");
        // a re-executed register would have said the connection was restablished
        assert_eq!(second.message, "Connected successfully");
    }

    #[tokio::test]
    async fn unknown_operation_kinds_are_refused() {
        let (client_handler, datanode_handler) = handlers();
        let journal = RequestJournal::new(8);

        let mut request = Request::new("r1".to_string(), RequestKind::Open);
        request.kind = 42;
        let response =
            TCPService::dispatch(&request, &client_handler, &datanode_handler, &journal).await;
        assert!(!response.is_success());
        assert!(response.message.contains("Unknown operation kind 42"));
    }

    #[tokio::test]
    async fn datanode_only_operations_are_not_served_here() {
        let (client_handler, datanode_handler) = handlers();
        let journal = RequestJournal::new(8);

        let request = Request::new("r1".to_string(), RequestKind::WriteBlock);
        let response =
            TCPService::dispatch(&request, &client_handler, &datanode_handler, &journal).await;
        assert!(!response.is_success());
        assert!(response.message.contains("not served by the namenode"));
    }
}
