//! Measurement protocol hit collection.
//!
//! Builds per-hit-type parameter sets, encodes them as
//! `application/x-www-form-urlencoded` bodies and hands them to a
//! [`HitSender`] addressed at the plain or TLS collection endpoint.

pub mod client;
pub mod protocol;
pub mod tracker;
pub mod types;

// Re-export public API
pub use client::HttpHitSender;
pub use protocol::EndpointTable;
pub use tracker::Tracker;
pub use types::{
    AppEvent, AppView, Clock, Event, Exception, Hit, HitParameters, HitSender, HitType, Item,
    PageView, Social, SystemClock, Timing, Transaction,
};

/// Errors raised while turning raw settings into a usable tracker.
///
/// Never retried; the caller has to fix the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Missing required configuration field: {field}")]
    MissingField { field: &'static str },

    #[error("Configuration field {field} must not be empty")]
    EmptyField { field: &'static str },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },

    #[error("Failed to read configuration file {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration file {path}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised when a hit cannot be delivered to the collector.
///
/// Surfaced directly to the caller of the tracking method; no retry.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Collector connection failed: {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Collector request timed out: {url}")]
    Timeout { url: String },

    #[error("HTTP client setup failed: {reason}")]
    ClientSetup { reason: String },
}
