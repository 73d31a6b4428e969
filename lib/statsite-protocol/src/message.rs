use std::{
    fmt,
    time::{Duration, Instant},
};

/// The kind of metric a [`Message`] represents.
///
/// Each kind maps to exactly one wire type tag, which is how the collector
/// decides what aggregation to apply to the value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MessageKind {
    /// A simple key/value pair, reported as-is.
    KeyValue,

    /// A gauge, compatible with statsd gauges.
    Gauge,

    /// A timer, in integer milliseconds.
    Timer,

    /// A counter.
    Counter,

    /// A unique set member.
    Set,
}

impl MessageKind {
    /// Returns the wire type tag for this kind.
    pub const fn type_tag(&self) -> &'static str {
        match self {
            Self::KeyValue => "kv",
            Self::Gauge => "g",
            Self::Timer => "ms",
            Self::Counter => "c",
            Self::Set => "s",
        }
    }
}

/// A single metric observation, encoded on the wire as `<key>:<value>|<tag>\n`.
///
/// Messages are immutable: they are created by one of the constructors below,
/// handed to the delivery pipeline, written once, and discarded. The encoder
/// performs no escaping, so keys and values must not contain `:`, `|`, or the
/// newline delimiter; that is the caller's responsibility.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Message {
    key: String,
    value: String,
    kind: MessageKind,
}

impl Message {
    fn new(key: impl Into<String>, value: String, kind: MessageKind) -> Self {
        Self {
            key: key.into(),
            value,
            kind,
        }
    }

    /// Creates a key/value message.
    pub fn key_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(key, value.into(), MessageKind::KeyValue)
    }

    /// Creates a gauge message.
    pub fn gauge(key: impl Into<String>, value: i64) -> Self {
        Self::new(key, value.to_string(), MessageKind::Gauge)
    }

    /// Creates a timer message from a start and end instant.
    ///
    /// The value is the elapsed time between the two instants, in integer
    /// milliseconds, truncating any sub-millisecond remainder. If `end` is
    /// earlier than `start`, the elapsed time is zero.
    pub fn timer(key: impl Into<String>, start: Instant, end: Instant) -> Self {
        Self::timer_duration(key, end.saturating_duration_since(start))
    }

    /// Creates a timer message measuring the time elapsed since `start`.
    pub fn timer_elapsed(key: impl Into<String>, start: Instant) -> Self {
        Self::timer_duration(key, start.elapsed())
    }

    /// Creates a timer message from a duration, truncated to integer milliseconds.
    pub fn timer_duration(key: impl Into<String>, duration: Duration) -> Self {
        Self::new(key, duration.as_millis().to_string(), MessageKind::Timer)
    }

    /// Creates a counter message.
    pub fn counter(key: impl Into<String>, value: i64) -> Self {
        Self::new(key, value.to_string(), MessageKind::Counter)
    }

    /// Creates a unique set message.
    pub fn set(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(key, value.into(), MessageKind::Set)
    }

    /// Creates a unique set message from an integer member.
    pub fn set_int(key: impl Into<String>, value: i64) -> Self {
        Self::new(key, value.to_string(), MessageKind::Set)
    }

    /// Returns the metric key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the metric value, already rendered as a string.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns the kind of metric this message represents.
    pub fn kind(&self) -> MessageKind {
        self.kind
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:{}|{}", self.key, self.value, self.kind.type_tag())
    }
}
