use std::sync::{Arc, Mutex};

use statsite_protocol::Message;
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    config::ForwarderConfig,
    forwarder::Forwarder,
    net::{TcpTransport, Transport},
    tracker::InFlightTracker,
};

/// A handle to the metrics delivery pipeline.
///
/// The pipeline owns a bounded publish queue and a single background delivery
/// loop. Handles are cheap to clone and safe to share across tasks; all clones
/// refer to the same queue and loop.
///
/// A pipeline is created enabled by one of the `initialize` constructors and
/// torn down by [`shutdown`][Self::shutdown]. Creating more than one pipeline
/// creates fully independent queues and delivery loops, which is rarely what
/// an application wants.
#[derive(Clone)]
pub struct Pipeline {
    inner: Arc<PipelineInner>,
}

struct PipelineInner {
    prefix: String,
    config: ForwarderConfig,
    publish_tracker: InFlightTracker,

    // Written only during initialize/shutdown, read on every publish.
    state: Mutex<PipelineState>,
}

struct PipelineState {
    publishing_enabled: bool,
    delivery_enabled: bool,
    queue_tx: Option<mpsc::Sender<Message>>,
    forwarder: Option<JoinHandle<()>>,
}

impl Pipeline {
    /// Creates a pipeline delivering to the collector at `address` over TCP.
    ///
    /// `address` is a `host:port` string. `prefix` is prepended (dot-joined)
    /// to the key of every metric emitted through the builder helpers.
    ///
    /// Must be called within a Tokio runtime: the delivery loop is spawned
    /// onto the current runtime.
    pub fn initialize(address: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::initialize_with_config(address, prefix, ForwarderConfig::default())
    }

    /// Creates a pipeline with a specific forwarder configuration.
    pub fn initialize_with_config(
        address: impl Into<String>, prefix: impl Into<String>, config: ForwarderConfig,
    ) -> Self {
        Self::initialize_with_transport(address, prefix, Arc::new(TcpTransport), config)
    }

    /// Creates a pipeline delivering through the given transport.
    ///
    /// This is the seam used to substitute an in-memory transport in tests;
    /// production callers want [`initialize`][Self::initialize].
    pub fn initialize_with_transport(
        address: impl Into<String>, prefix: impl Into<String>, transport: Arc<dyn Transport>,
        config: ForwarderConfig,
    ) -> Self {
        let address = address.into();
        let prefix = prefix.into();

        let (queue_tx, queue_rx) = mpsc::channel(config.queue_capacity());
        let forwarder = Forwarder::new(transport, address.clone(), config.clone(), queue_rx);
        let forwarder = tokio::spawn(forwarder.run());

        info!(prefix = %prefix, address = %address, "Starting metrics pipeline.");

        Self {
            inner: Arc::new(PipelineInner {
                prefix,
                config,
                publish_tracker: InFlightTracker::default(),
                state: Mutex::new(PipelineState {
                    publishing_enabled: true,
                    delivery_enabled: true,
                    queue_tx: Some(queue_tx),
                    forwarder: Some(forwarder),
                }),
            }),
        }
    }

    /// Returns whether the pipeline is currently enabled.
    ///
    /// The pipeline is enabled from creation until [`shutdown`][Self::shutdown]
    /// completes.
    pub fn is_enabled(&self) -> bool {
        self.inner.state.lock().unwrap().delivery_enabled
    }

    /// Publishes a message onto the delivery queue.
    ///
    /// This never blocks and never fails from the caller's perspective: if
    /// publishing is disabled the message is silently ignored, and if the
    /// queue is full the message is dropped.
    pub fn publish(&self, message: Message) {
        let (_guard, queue_tx) = {
            let state = self.inner.state.lock().unwrap();
            if !state.publishing_enabled {
                return;
            }

            // The in-flight guard is taken before the enqueue attempt and held
            // until it completes, so shutdown cannot close the queue out from
            // under a publish that has already been admitted.
            (self.inner.publish_tracker.track(), state.queue_tx.clone())
        };

        if let Some(queue_tx) = queue_tx {
            match queue_tx.try_send(message) {
                Ok(()) => {}
                Err(TrySendError::Full(message)) => {
                    debug!(key = message.key(), "Publish queue full; dropping message.");
                }
                Err(TrySendError::Closed(_)) => {}
            }
        }
    }

    /// Shuts the pipeline down, draining queued messages on a best-effort basis.
    ///
    /// New messages are refused immediately; publishes already underway are
    /// given a bounded window to land in the queue, the queue is closed, and
    /// the delivery loop is given a bounded window to finish draining it.
    /// Exceeding either bound abandons the remaining messages rather than
    /// stalling process exit.
    ///
    /// Calling this on an already shut down pipeline is a no-op.
    pub async fn shutdown(&self) {
        {
            let mut state = self.inner.state.lock().unwrap();
            if !state.delivery_enabled {
                return;
            }
            state.publishing_enabled = false;
        }

        let drain_timeout = self.inner.config.shutdown_timeout();

        if tokio::time::timeout(drain_timeout, self.inner.publish_tracker.wait_idle())
            .await
            .is_err()
        {
            warn!("Timed out waiting for in-flight publishes; closing queue anyway.");
        }

        // Dropping the sole sender closes the queue; buffered messages remain
        // drainable by the delivery loop until it observes the closure.
        let queue_tx = self.inner.state.lock().unwrap().queue_tx.take();
        drop(queue_tx);

        let forwarder = self.inner.state.lock().unwrap().forwarder.take();
        if let Some(forwarder) = forwarder {
            match tokio::time::timeout(drain_timeout, forwarder).await {
                Ok(Ok(())) => debug!("Metrics forwarder drained and stopped."),
                Ok(Err(e)) => warn!(error = %e, "Metrics forwarder task failed."),
                Err(_) => {
                    warn!("Timed out waiting for metrics forwarder to drain; abandoning it.")
                }
            }
        }

        self.inner.state.lock().unwrap().delivery_enabled = false;

        info!("Metrics pipeline stopped.");
    }

    /// Dot-joins the configured prefix onto `key`.
    pub(crate) fn prefixed(&self, key: &str) -> String {
        if self.inner.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.inner.prefix, key)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::test_util::MockTransport;

    fn mock_pipeline(config: ForwarderConfig) -> (Pipeline, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::new());
        let pipeline = Pipeline::initialize_with_transport(
            "collector:8125",
            "foo.bar",
            Arc::clone(&transport) as Arc<dyn Transport>,
            config,
        );
        (pipeline, transport)
    }

    #[tokio::test]
    async fn initialize_and_shutdown() {
        let (pipeline, _transport) = mock_pipeline(ForwarderConfig::default());
        assert!(pipeline.is_enabled());

        pipeline.shutdown().await;
        assert!(!pipeline.is_enabled());
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let (pipeline, transport) = mock_pipeline(ForwarderConfig::default());

        pipeline.shutdown().await;
        pipeline.shutdown().await;

        assert!(!pipeline.is_enabled());
        assert_eq!(transport.collector().count(), 0);
    }

    #[tokio::test]
    async fn publishes_drain_before_shutdown_completes() {
        let (pipeline, transport) = mock_pipeline(ForwarderConfig::default());

        for i in 0..10 {
            pipeline.publish(Message::key_value(format!("key{}", i), "value"));
        }
        pipeline.shutdown().await;

        let received = transport.collector().received();
        assert_eq!(received.len(), 10);
        for (i, line) in received.iter().enumerate() {
            assert_eq!(line, &format!("key{}:value|kv\n", i));
        }
        assert!(!pipeline.is_enabled());
    }

    #[tokio::test]
    async fn publish_after_shutdown_is_ignored() {
        let (pipeline, transport) = mock_pipeline(ForwarderConfig::default());

        pipeline.shutdown().await;
        pipeline.publish(Message::counter("late", 1));

        assert_eq!(transport.collector().count(), 0);
    }

    #[tokio::test]
    async fn rejected_write_never_reaches_publishers() {
        let (pipeline, transport) = mock_pipeline(ForwarderConfig::default());
        transport.collector().reject_line("bad:key|kv\n");

        // The failed write is only observable through logs; the publisher sees
        // nothing and the pipeline shuts down cleanly.
        pipeline.publish(Message::key_value("bad", "key"));
        pipeline.shutdown().await;

        assert_eq!(transport.collector().count(), 0);
        assert!(!pipeline.is_enabled());
    }

    #[tokio::test]
    async fn full_queue_drops_instead_of_blocking() {
        let transport = Arc::new(MockTransport::new());
        transport.hang_connections(true);

        let config = ForwarderConfig::default()
            .with_queue_capacity(1)
            .with_shutdown_timeout(Duration::from_millis(100));
        let pipeline = Pipeline::initialize_with_transport(
            "collector:8125",
            "foo.bar",
            Arc::clone(&transport) as Arc<dyn Transport>,
            config,
        );

        // With the forwarder stuck connecting, only one message fits in the
        // queue; the rest are dropped without ever blocking the publisher.
        for i in 0..5 {
            pipeline.publish(Message::counter("burst", i));
        }

        pipeline.shutdown().await;
        assert!(!pipeline.is_enabled());
        assert_eq!(transport.collector().count(), 0);
    }

    #[tokio::test]
    async fn shutdown_returns_despite_hung_forwarder() {
        let transport = Arc::new(MockTransport::new());
        transport.hang_connections(true);

        let config = ForwarderConfig::default().with_shutdown_timeout(Duration::from_millis(100));
        let pipeline = Pipeline::initialize_with_transport(
            "collector:8125",
            "foo.bar",
            Arc::clone(&transport) as Arc<dyn Transport>,
            config,
        );

        pipeline.publish(Message::gauge("stuck", 1));

        tokio::time::timeout(Duration::from_secs(2), pipeline.shutdown())
            .await
            .expect("shutdown must return within its drain bounds");
        assert!(!pipeline.is_enabled());
    }

    #[tokio::test]
    async fn clones_share_one_pipeline() {
        let (pipeline, transport) = mock_pipeline(ForwarderConfig::default());
        let clone = pipeline.clone();

        clone.publish(Message::counter("shared", 1));
        pipeline.shutdown().await;

        assert!(!clone.is_enabled());
        assert_eq!(transport.collector().count(), 1);
    }
}
