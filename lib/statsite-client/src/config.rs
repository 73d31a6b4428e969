use std::time::Duration;

use serde::Deserialize;

// Deserialized values are not validated up front, so a negative or non-finite
// duration must not be able to panic the delivery loop.
fn duration_from_secs(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or_default()
}

fn default_queue_capacity() -> usize {
    4096
}

fn default_connect_timeout_secs() -> f64 {
    1.0
}

fn default_reconnect_wait_secs() -> f64 {
    10.0
}

fn default_shutdown_timeout_secs() -> f64 {
    5.0
}

/// Configuration for the metrics forwarder.
#[derive(Clone, Debug, Deserialize)]
pub struct ForwarderConfig {
    /// Maximum number of messages buffered between publishers and the delivery loop.
    ///
    /// When the queue is full, newly published messages are dropped rather
    /// than blocking the publisher.
    ///
    /// Defaults to 4096.
    #[serde(default = "default_queue_capacity")]
    queue_capacity: usize,

    /// How long to wait for a connection to the collector to be established, in seconds.
    ///
    /// Defaults to 1 second.
    #[serde(default = "default_connect_timeout_secs")]
    connect_timeout_secs: f64,

    /// How long to wait after a connection failure before reconnecting, in seconds.
    ///
    /// Messages that arrive while waiting are discarded.
    ///
    /// Defaults to 10 seconds.
    #[serde(default = "default_reconnect_wait_secs")]
    reconnect_wait_secs: f64,

    /// Upper bound on each shutdown drain phase, in seconds.
    ///
    /// Shutdown waits this long, first for in-flight publishes to land in the
    /// queue and then for the delivery loop to finish draining it. Exceeding
    /// either bound abandons the remaining messages and returns anyway.
    ///
    /// Defaults to 5 seconds.
    #[serde(default = "default_shutdown_timeout_secs")]
    shutdown_timeout_secs: f64,
}

impl ForwarderConfig {
    /// Sets the maximum number of buffered messages.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Sets the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_secs = timeout.as_secs_f64();
        self
    }

    /// Sets the wait between a connection failure and the next reconnect attempt.
    pub fn with_reconnect_wait(mut self, wait: Duration) -> Self {
        self.reconnect_wait_secs = wait.as_secs_f64();
        self
    }

    /// Sets the upper bound on each shutdown drain phase.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout_secs = timeout.as_secs_f64();
        self
    }

    pub(crate) fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    pub(crate) fn connect_timeout(&self) -> Duration {
        duration_from_secs(self.connect_timeout_secs)
    }

    pub(crate) fn reconnect_wait(&self) -> Duration {
        duration_from_secs(self.reconnect_wait_secs)
    }

    pub(crate) fn shutdown_timeout(&self) -> Duration {
        duration_from_secs(self.shutdown_timeout_secs)
    }
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            connect_timeout_secs: default_connect_timeout_secs(),
            reconnect_wait_secs: default_reconnect_wait_secs(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}
