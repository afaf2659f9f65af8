//! Gas Core - Measurement protocol hit tracking
//!
//! This crate provides the building blocks for server-side analytics
//! instrumentation: the hit model, wire encoding, collection endpoint
//! selection, the sender seam and its HTTP implementation, and
//! configuration management.

pub mod collect;
pub mod config;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use collect::{
    Clock, ConfigurationError, Hit, HitParameters, HitSender, HitType, HttpHitSender,
    SystemClock, Tracker, TransportError,
};
pub use config::{GasConfig, NetworkConfig, TrackerConfig, TrackerSettings};

/// Errors that can bubble up from any Gas operation.
///
/// Wraps construction-time configuration failures and send-time transport
/// failures so callers that drive both can use a single `?`.
#[derive(Debug, thiserror::Error)]
pub enum GasError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

impl GasError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            GasError::Configuration(e) => match e {
                ConfigurationError::MissingField { field } => {
                    format!("Missing required setting: {field}")
                }
                ConfigurationError::EmptyField { field } => {
                    format!("Setting {field} must not be empty")
                }
                ConfigurationError::InvalidValue { field, value } => {
                    format!("Invalid value '{value}' for setting {field}")
                }
                ConfigurationError::Io { path, .. } | ConfigurationError::Parse { path, .. } => {
                    format!("Could not load configuration file {path}")
                }
            },
            GasError::Transport(e) => match e {
                TransportError::ConnectionFailed { url, .. } => {
                    format!("Could not reach collector: {url}")
                }
                TransportError::Timeout { url } => format!("Collector timed out: {url}"),
                TransportError::ClientSetup { .. } => "HTTP client setup failed".to_string(),
            },
        }
    }

    /// Checks if this error is due to user-supplied configuration.
    pub fn is_user_error(&self) -> bool {
        matches!(self, GasError::Configuration(_))
    }
}

pub type Result<T> = std::result::Result<T, GasError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_errors_are_user_errors() {
        let error = GasError::from(ConfigurationError::MissingField { field: "clientId" });
        assert!(error.is_user_error());
        assert_eq!(error.user_message(), "Missing required setting: clientId");
    }

    #[test]
    fn test_transport_errors_are_not_user_errors() {
        let error = GasError::from(TransportError::Timeout {
            url: "http://collector.test/collect".to_string(),
        });
        assert!(!error.is_user_error());
        assert_eq!(
            error.user_message(),
            "Collector timed out: http://collector.test/collect"
        );
    }
}
