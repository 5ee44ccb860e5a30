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

use crate::client::handler::ClientHandler;

pub struct TCPService {
    listener: TcpListener,
    client_handler: Arc<ClientHandler>,
    journal: RequestJournal<Response>,
}

impl TCPService {
    pub async fn new(
        address: &str,
        client_handler: ClientHandler,
        journal_capacity: usize,
    ) -> Result<Self> {
        let listener = TcpListener::bind(address).await?;
        Ok(TCPService {
            listener,
            client_handler: Arc::new(client_handler),
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
            let journal = self.journal.clone();
            let span = Span::current();
            tokio::spawn(
                async move {
                    if let Err(e) =
                        Self::handle_connection(tcp_stream, client_handler, journal).await
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
            let response = Self::dispatch(&request, &client_handler, &journal).await;
            write_frame(&mut tcp_stream, &response).await?;
        }
    }

    #[instrument(name = "datanode_dispatch", skip_all, fields(request_id = %request.request_id, kind = request.kind))]
    async fn dispatch(
        request: &Request,
        client_handler: &ClientHandler,
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
            Ok(RequestKind::WriteBlock) => client_handler.write_block(request).await,
            Ok(RequestKind::ReadBlock) => client_handler.read_block(request).await,
            Ok(RequestKind::List) => client_handler.list(request).await,
            Ok(RequestKind::Open) => client_handler.open(request).await,
            Ok(RequestKind::Close) => client_handler.close(request).await,
            Ok(kind) => Response::failure(
                &request.request_id,
                &format!("Operation {kind:?} is not served by a datanode"),
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
