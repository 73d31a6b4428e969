//! Asynchronous client pipeline for shipping metrics to a statsite collector.
//!
//! Metrics are recorded through lightweight builder types ([`Timer`],
//! [`Counter`], [`Gauge`], [`KeyValue`], [`TimerCounter`]) and published onto a
//! bounded in-process queue. A single background delivery loop owns the
//! connection to the collector, writes queued messages in order, and
//! reconnects with a bounded wait when the collector goes away.
//!
//! Publishing is fire-and-forget by design: no delivery error is ever surfaced
//! to the code emitting metrics, and a full queue drops messages rather than
//! blocking the caller. Delivery is at-most-once.
//!
//! ## Example
//!
//! ```no_run
//! use statsite_client::Pipeline;
//!
//! # async fn example() {
//! let pipeline = Pipeline::initialize("127.0.0.1:8125", "my_app");
//!
//! let mut requests = pipeline.counter("requests");
//! requests.incr();
//! requests.emit();
//!
//! let timer = pipeline.timer("request_latency");
//! // ... do work ...
//! timer.emit();
//!
//! pipeline.shutdown().await;
//! # }
//! ```

#![deny(missing_docs)]

mod config;
mod error;
mod forwarder;
mod metrics;
mod net;
mod pipeline;
mod tracker;

#[cfg(test)]
pub(crate) mod test_util;

pub use self::config::ForwarderConfig;
pub use self::error::TransportError;
pub use self::metrics::{Counter, Gauge, KeyValue, Timer, TimerCounter};
pub use self::net::{Connection, TcpTransport, Transport};
pub use self::pipeline::Pipeline;
