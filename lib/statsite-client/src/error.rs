use std::io;

use snafu::Snafu;

/// Errors from the transport path between the delivery loop and the collector.
///
/// None of these ever reach code that emits metrics: they are logged by the
/// delivery loop and drive its reconnect behavior, nothing more.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)), visibility(pub(crate)))]
pub enum TransportError {
    /// The collector address could not be resolved.
    #[snafu(display("failed to resolve collector address '{}': {}", address, source))]
    Resolve {
        /// The address that failed to resolve.
        address: String,

        /// The underlying resolution error.
        source: io::Error,
    },

    /// A connection to the collector could not be established.
    #[snafu(display("failed to connect to collector at '{}': {}", address, source))]
    Connect {
        /// The address that refused or timed out.
        address: String,

        /// The underlying connect error.
        source: io::Error,
    },

    /// A write on an established connection failed.
    #[snafu(display("failed to write to collector: {}", source))]
    Write {
        /// The underlying write error.
        source: io::Error,
    },
}
