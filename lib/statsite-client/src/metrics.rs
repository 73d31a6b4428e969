use std::time::Instant;

use statsite_protocol::Message;

use crate::pipeline::Pipeline;

impl Pipeline {
    /// Creates a timer that starts measuring now.
    ///
    /// Emitting publishes the elapsed time, in milliseconds, under the
    /// prefixed key.
    ///
    /// ```no_run
    /// # fn work() {}
    /// # fn example(pipeline: &statsite_client::Pipeline) {
    /// let timer = pipeline.timer("db_query");
    /// work();
    /// timer.emit();
    /// # }
    /// ```
    pub fn timer(&self, key: impl Into<String>) -> Timer {
        Timer {
            pipeline: self.clone(),
            key: key.into(),
            start: Instant::now(),
        }
    }

    /// Creates a counter starting at zero.
    pub fn counter(&self, key: impl Into<String>) -> Counter {
        self.counter_at(key, 0)
    }

    /// Creates a counter starting at `count`.
    pub fn counter_at(&self, key: impl Into<String>, count: i64) -> Counter {
        Counter {
            pipeline: self.clone(),
            key: key.into(),
            count,
        }
    }

    /// Creates a gauge starting at zero.
    pub fn gauge(&self, key: impl Into<String>) -> Gauge {
        self.gauge_at(key, 0)
    }

    /// Creates a gauge starting at `value`.
    pub fn gauge_at(&self, key: impl Into<String>, value: i64) -> Gauge {
        Gauge {
            pipeline: self.clone(),
            key: key.into(),
            value,
        }
    }

    /// Creates a key/value metric.
    pub fn key_value(&self, key: impl Into<String>, value: impl Into<String>) -> KeyValue {
        KeyValue {
            pipeline: self.clone(),
            key: key.into(),
            value: value.into(),
        }
    }

    /// Creates a combined timer and counter under the same key, with the
    /// counter starting at one.
    ///
    /// Useful for tracking the rate and latency of an operation together.
    pub fn timer_counter(&self, key: impl Into<String>) -> TimerCounter {
        self.timer_counter_at(key, 1)
    }

    /// Creates a combined timer and counter, with the counter starting at `count`.
    pub fn timer_counter_at(&self, key: impl Into<String>, count: i64) -> TimerCounter {
        let key = key.into();
        TimerCounter {
            timer: self.timer(key.clone()),
            counter: self.counter_at(key, count),
        }
    }
}

/// Measures elapsed time from its creation until [`emit`][Self::emit].
pub struct Timer {
    pipeline: Pipeline,
    key: String,
    start: Instant,
}

impl Timer {
    /// Publishes the elapsed time as a timer metric.
    pub fn emit(&self) {
        self.pipeline.publish(Message::timer_elapsed(
            self.pipeline.prefixed(&self.key),
            self.start,
        ));
    }
}

/// An accumulating counter.
pub struct Counter {
    pipeline: Pipeline,
    key: String,
    count: i64,
}

impl Counter {
    /// Increments the counter by one.
    pub fn incr(&mut self) {
        self.count += 1;
    }

    /// Increments the counter by `n`.
    pub fn incr_by(&mut self, n: i64) {
        self.count += n;
    }

    /// Publishes the current count as a counter metric.
    pub fn emit(&self) {
        self.pipeline
            .publish(Message::counter(self.pipeline.prefixed(&self.key), self.count));
    }
}

/// An accumulating gauge.
pub struct Gauge {
    pipeline: Pipeline,
    key: String,
    value: i64,
}

impl Gauge {
    /// Increments the gauge by one.
    pub fn incr(&mut self) {
        self.value += 1;
    }

    /// Increments the gauge by `n`.
    pub fn incr_by(&mut self, n: i64) {
        self.value += n;
    }

    /// Publishes the current value as a gauge metric.
    pub fn emit(&self) {
        self.pipeline
            .publish(Message::gauge(self.pipeline.prefixed(&self.key), self.value));
    }
}

/// A key/value observation.
pub struct KeyValue {
    pipeline: Pipeline,
    key: String,
    value: String,
}

impl KeyValue {
    /// Publishes the key/value pair.
    pub fn emit(&self) {
        self.pipeline.publish(Message::key_value(
            self.pipeline.prefixed(&self.key),
            self.value.clone(),
        ));
    }
}

/// A timer and counter sharing one key.
pub struct TimerCounter {
    timer: Timer,
    counter: Counter,
}

impl TimerCounter {
    /// Increments the counter by one.
    pub fn incr(&mut self) {
        self.counter.incr();
    }

    /// Increments the counter by `n`.
    pub fn incr_by(&mut self, n: i64) {
        self.counter.incr_by(n);
    }

    /// Publishes the counter, then the timer.
    pub fn emit(&self) {
        self.counter.emit();
        self.timer.emit();
    }
}
