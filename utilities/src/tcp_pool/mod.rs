use std::{collections::HashMap, sync::Arc};

use crate::retry_policy::retry_with_backoff;
use tokio::{net::TcpStream, sync::Mutex};
use tracing::{Instrument, Span, error, trace};
use wire::error::{DfsError, Result};

#[derive(Clone, Debug, Default)]
pub struct TcpPool {
    store: Arc<Mutex<HashMap<String, Arc<Mutex<TcpStream>>>>>,
}
impl TcpPool {
    fn new() -> Self {
        Self {
            store: Arc::default(),
        }
    }

    /// Returns the pooled stream for `addrs`, dialing a new one when absent.
    /// The caller holds the stream lock for a full request and response
    /// exchange so frames never interleave.
    pub async fn get_connection(&self, addrs: &str) -> Result<Arc<Mutex<TcpStream>>> {
        if let Some(stream) = self.store.lock().await.get(addrs) {
            trace!("Connection already present");
            return Ok(stream.clone());
        }
        trace!("Dialing since connection is not present already");
        let stream = TcpStream::connect(addrs).await.map_err(|e| {
            error!(addrs = %addrs, error = %e, "Error while connecting to stream");
            DfsError::Io(e)
        })?;
        let stream = Arc::new(Mutex::new(stream));
        self.store
            .lock()
            .await
            .insert(addrs.to_owned(), stream.clone());
        Ok(stream)
    }

    /// Dials with exponential backoff, mapping exhaustion to
    /// [`DfsError::Unreachable`].
    pub async fn get_connection_with_retry(
        &self,
        addrs: &str,
        max_retries: u8,
    ) -> Result<Arc<Mutex<TcpStream>>> {
        retry_with_backoff(
            || async { self.get_connection(addrs).await }.instrument(Span::current()),
            max_retries,
        )
        .await
        .map_err(|_| DfsError::Unreachable {
            target: addrs.to_owned(),
            attempts: max_retries,
        })
    }

    /// Forgets the pooled stream so the next call dials again. Used after an
    /// exchange fails mid stream and the connection state is unknown.
    pub async fn invalidate(&self, addrs: &str) {
        if self.store.lock().await.remove(addrs).is_some() {
            trace!(addrs = %addrs, "Dropped pooled connection");
        }
    }
}

pub static TCP_POOL: once_cell::sync::Lazy<TcpPool> = once_cell::sync::Lazy::new(TcpPool::new);

#[cfg(test)]
mod test {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn connections_are_reused_per_address() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addrs = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            loop {
                let _ = listener.accept().await;
            }
        });

        let pool = TcpPool::new();
        let first = pool.get_connection(&addrs).await.unwrap();
        let second = pool.get_connection(&addrs).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        pool.invalidate(&addrs).await;
        let third = pool.get_connection(&addrs).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
    }

    #[tokio::test]
    async fn unreachable_targets_surface_after_retries() {
        let pool = TcpPool::new();
        // Port 9 (discard) is closed in the test environment.
        let err = pool
            .get_connection_with_retry("127.0.0.1:9", 1)
            .await
            .unwrap_err();
        assert!(matches!(err, DfsError::Unreachable { attempts: 1, .. }));
    }
}
