use std::sync::Arc;

use statsite_protocol::Message;
use tokio::{select, sync::mpsc, time::sleep};
use tracing::{debug, warn};

use crate::{
    config::ForwarderConfig,
    net::{Connection, Transport},
};

/// The delivery loop's current phase.
///
/// The loop cycles `Connecting` -> `Streaming` -> `Waiting` -> `Connecting`
/// until the queue is closed and drained, at which point it reaches `Stopped`
/// and the task exits.
enum State {
    Connecting,
    Streaming(Box<dyn Connection + Send>),
    Waiting,
    Stopped,
}

/// Outcome of one streaming phase.
enum StreamOutcome {
    /// A write failed; the failing message was dropped.
    WriteFailed,

    /// The queue was closed and fully drained.
    QueueClosed,
}

/// Outcome of one waiting phase.
enum WaitOutcome {
    /// The reconnect timer fired.
    TimerFired,

    /// The queue was closed while waiting.
    QueueClosed,
}

/// The single background task that turns queued messages into wire writes.
///
/// The forwarder is the sole consumer of the publish queue and the exclusive
/// owner of the current collector connection. A connection is discarded on any
/// write failure and a fresh one is established after a bounded wait; messages
/// arriving during that wait are drained and discarded so publishers are never
/// stalled by a dead peer.
pub(crate) struct Forwarder {
    transport: Arc<dyn Transport>,
    address: String,
    config: ForwarderConfig,
    queue_rx: mpsc::Receiver<Message>,
}

impl Forwarder {
    pub fn new(
        transport: Arc<dyn Transport>, address: String, config: ForwarderConfig,
        queue_rx: mpsc::Receiver<Message>,
    ) -> Self {
        Self {
            transport,
            address,
            config,
            queue_rx,
        }
    }

    /// Runs the delivery loop until the queue is closed and drained.
    pub async fn run(mut self) {
        debug!(address = %self.address, "Metrics forwarder started.");

        // Once the queue is observed closed, the loop gets exactly one more
        // connect cycle to deliver any final messages; after that, any failure
        // terminates the loop instead of re-entering the wait phase.
        let mut shutdown_requested = false;
        let mut state = State::Connecting;

        loop {
            state = match state {
                State::Connecting => match self.establish().await {
                    Some(connection) => State::Streaming(connection),
                    None if shutdown_requested => State::Stopped,
                    None => State::Waiting,
                },
                State::Streaming(connection) => match self.stream(connection).await {
                    StreamOutcome::QueueClosed => State::Stopped,
                    StreamOutcome::WriteFailed if shutdown_requested => State::Stopped,
                    StreamOutcome::WriteFailed => State::Waiting,
                },
                State::Waiting => match self.wait().await {
                    WaitOutcome::TimerFired => State::Connecting,
                    WaitOutcome::QueueClosed => {
                        shutdown_requested = true;
                        State::Connecting
                    }
                },
                State::Stopped => break,
            };
        }

        debug!("Metrics forwarder stopped.");
    }

    /// Resolves the collector address and establishes a fresh connection.
    ///
    /// Returns `None` on failure; both failure modes are logged here and drive
    /// the caller into the wait phase.
    async fn establish(&self) -> Option<Box<dyn Connection + Send>> {
        if let Err(e) = self.transport.resolve(&self.address).await {
            warn!(error = %e, "Failed to resolve collector address.");
            return None;
        }

        match self
            .transport
            .connect(&self.address, self.config.connect_timeout())
            .await
        {
            Ok(connection) => Some(connection),
            Err(e) => {
                warn!(error = %e, "Failed to connect to collector.");
                None
            }
        }
    }

    /// Writes queued messages to the connection until the queue closes or a write fails.
    async fn stream(&mut self, mut connection: Box<dyn Connection + Send>) -> StreamOutcome {
        while let Some(message) = self.queue_rx.recv().await {
            // At-most-once: a message whose write fails is dropped, not retried.
            if let Err(e) = connection.send(message.to_string().as_bytes()).await {
                warn!(error = %e, "Failed to write to collector.");
                return StreamOutcome::WriteFailed;
            }
        }

        StreamOutcome::QueueClosed
    }

    /// Runs the reconnect timer, draining and discarding queued messages meanwhile.
    async fn wait(&mut self) -> WaitOutcome {
        let timer = sleep(self.config.reconnect_wait());
        tokio::pin!(timer);

        loop {
            select! {
                _ = &mut timer => return WaitOutcome::TimerFired,
                message = self.queue_rx.recv() => match message {
                    Some(_) => continue,
                    None => return WaitOutcome::QueueClosed,
                },
            }
        }
    }
}
