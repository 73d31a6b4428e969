use std::{io, time::Duration};

use async_trait::async_trait;
use snafu::ResultExt as _;
use tokio::{
    io::AsyncWriteExt as _,
    net::{lookup_host, TcpStream},
};

use crate::error::{self, TransportError};

/// An established stream to the collector.
///
/// A connection is owned exclusively by the delivery loop for its lifetime and
/// is discarded, never reused, when a write fails. There is no read path:
/// delivery is fire-and-forget.
#[async_trait]
pub trait Connection: Send {
    /// Writes one encoded metric line to the collector.
    async fn send(&mut self, line: &[u8]) -> Result<(), TransportError>;
}

/// Something that can establish [`Connection`]s to a collector.
///
/// The delivery loop depends only on this narrow contract, which makes it
/// straightforward to substitute an in-memory recorder in tests. The
/// production implementation is [`TcpTransport`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Validates that the target address is well-formed and resolvable.
    async fn resolve(&self, address: &str) -> Result<(), TransportError>;

    /// Establishes a stream to the collector at `address`, bounded by `timeout`.
    async fn connect(
        &self, address: &str, timeout: Duration,
    ) -> Result<Box<dyn Connection + Send>, TransportError>;
}

/// TCP transport to a collector at a `host:port` address.
#[derive(Default)]
pub struct TcpTransport;

#[async_trait]
impl Transport for TcpTransport {
    async fn resolve(&self, address: &str) -> Result<(), TransportError> {
        lookup_host(address)
            .await
            .map(drop)
            .context(error::Resolve { address })
    }

    async fn connect(
        &self, address: &str, timeout: Duration,
    ) -> Result<Box<dyn Connection + Send>, TransportError> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect(address))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "connect timed out"))
            .and_then(|result| result)
            .context(error::Connect { address })?;

        Ok(Box::new(TcpConnection { stream }))
    }
}

struct TcpConnection {
    stream: TcpStream,
}

#[async_trait]
impl Connection for TcpConnection {
    async fn send(&mut self, line: &[u8]) -> Result<(), TransportError> {
        self.stream.write_all(line).await.context(error::Write)
    }
}
