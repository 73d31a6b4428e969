//! In-memory transport doubles for exercising the delivery path.

use std::{
    io,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering::SeqCst},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    error::TransportError,
    net::{Connection, Transport},
};

/// An in-memory collector that records every line written to it.
///
/// A single line can be marked as rejected, which makes any write of that
/// exact line fail, mirroring a peer that goes away mid-stream.
#[derive(Clone, Default)]
pub(crate) struct MockCollector {
    inner: Arc<CollectorInner>,
}

#[derive(Default)]
struct CollectorInner {
    received: Mutex<Vec<String>>,
    rejected: Mutex<Option<String>>,
}

impl MockCollector {
    /// Marks `line` as rejected: writing it fails and it is not recorded.
    pub fn reject_line(&self, line: impl Into<String>) {
        *self.inner.rejected.lock().unwrap() = Some(line.into());
    }

    /// Returns all recorded lines, in the order they were written.
    pub fn received(&self) -> Vec<String> {
        self.inner.received.lock().unwrap().clone()
    }

    /// Returns the number of recorded lines.
    pub fn count(&self) -> usize {
        self.inner.received.lock().unwrap().len()
    }

    /// Returns the most recently recorded line, if any.
    pub fn last(&self) -> Option<String> {
        self.inner.received.lock().unwrap().last().cloned()
    }

    fn write(&self, line: &str) -> io::Result<()> {
        let rejected = self.inner.rejected.lock().unwrap();
        if rejected.as_deref() == Some(line) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "line rejected by collector"));
        }

        self.inner.received.lock().unwrap().push(line.to_string());
        Ok(())
    }
}

/// A [`Transport`] that hands out connections to an in-memory [`MockCollector`].
#[derive(Default)]
pub(crate) struct MockTransport {
    collector: MockCollector,
    fail_resolve: AtomicBool,
    refuse_connections: AtomicBool,
    hang_connections: AtomicBool,
    connect_attempts: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the collector every connection records into.
    pub fn collector(&self) -> &MockCollector {
        &self.collector
    }

    /// Makes `resolve` fail while set.
    pub fn fail_resolve(&self, fail: bool) {
        self.fail_resolve.store(fail, SeqCst);
    }

    /// Makes `connect` fail while set.
    pub fn refuse_connections(&self, refuse: bool) {
        self.refuse_connections.store(refuse, SeqCst);
    }

    /// Makes `connect` hang forever while set.
    pub fn hang_connections(&self, hang: bool) {
        self.hang_connections.store(hang, SeqCst);
    }

    /// Returns how many times `connect` has been called.
    pub fn connect_attempts(&self) -> usize {
        self.connect_attempts.load(SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn resolve(&self, address: &str) -> Result<(), TransportError> {
        if self.fail_resolve.load(SeqCst) {
            return Err(TransportError::Resolve {
                address: address.to_string(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "invalid address"),
            });
        }

        Ok(())
    }

    async fn connect(
        &self, address: &str, _timeout: Duration,
    ) -> Result<Box<dyn Connection + Send>, TransportError> {
        if self.hang_connections.load(SeqCst) {
            std::future::pending::<()>().await;
        }

        self.connect_attempts.fetch_add(1, SeqCst);

        if self.refuse_connections.load(SeqCst) {
            return Err(TransportError::Connect {
                address: address.to_string(),
                source: io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
            });
        }

        Ok(Box::new(MockConnection {
            collector: self.collector.clone(),
        }))
    }
}

struct MockConnection {
    collector: MockCollector,
}

#[async_trait]
impl Connection for MockConnection {
    async fn send(&mut self, line: &[u8]) -> Result<(), TransportError> {
        let line = std::str::from_utf8(line).expect("encoded lines are always UTF-8");
        self.collector
            .write(line)
            .map_err(|source| TransportError::Write { source })
    }
}
