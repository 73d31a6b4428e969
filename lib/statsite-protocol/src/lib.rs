//! Data model and wire encoding for the statsite line protocol.
//!
//! This crate is purely concerned with representing a single metric
//! observation and rendering it as the textual line the collector ingests. It
//! has no I/O, no concurrency, and no dependencies; everything here is
//! deterministic and side-effect free.

#![deny(missing_docs)]

mod message;

pub use self::message::{Message, MessageKind};
