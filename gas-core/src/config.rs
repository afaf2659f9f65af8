//! Centralized configuration for Gas.
//!
//! Raw tracker settings can come from a JSON file, the environment or code;
//! they are validated once into an immutable [`TrackerConfig`].

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::collect::ConfigurationError;
use crate::collect::protocol::constants;

/// Central configuration for all Gas components.
#[derive(Debug, Clone, Default)]
pub struct GasConfig {
    pub tracker: TrackerSettings,
    pub network: NetworkConfig,
}

impl GasConfig {
    /// Creates configuration with environment variable overrides.
    pub fn from_env() -> Self {
        Self {
            tracker: TrackerSettings::from_env(),
            network: NetworkConfig::from_env(),
        }
    }
}

/// Unvalidated tracker settings.
///
/// Every field is optional so partial sources can be layered with
/// [`TrackerSettings::merge`] before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerSettings {
    pub tracking_id: Option<String>,
    pub client_id: Option<String>,
    pub domain_app: Option<String>,
    #[serde(rename = "useSSL")]
    pub use_ssl: Option<bool>,
    pub source: Option<String>,
}

impl TrackerSettings {
    /// Creates settings with every required field present.
    pub fn new(
        tracking_id: impl Into<String>,
        client_id: impl Into<String>,
        domain_app: impl Into<String>,
        use_ssl: bool,
    ) -> Self {
        Self {
            tracking_id: Some(tracking_id.into()),
            client_id: Some(client_id.into()),
            domain_app: Some(domain_app.into()),
            use_ssl: Some(use_ssl),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Reads settings from `GAS_*` environment variables.
    ///
    /// Unset variables leave the field empty. An unparsable `GAS_USE_SSL`
    /// is treated as unset.
    pub fn from_env() -> Self {
        Self {
            tracking_id: std::env::var("GAS_TRACKING_ID").ok(),
            client_id: std::env::var("GAS_CLIENT_ID").ok(),
            domain_app: std::env::var("GAS_DOMAIN_APP").ok(),
            use_ssl: std::env::var("GAS_USE_SSL")
                .ok()
                .and_then(|value| parse_flag(&value)),
            source: std::env::var("GAS_SOURCE").ok(),
        }
    }

    /// Loads settings from a JSON file using the `trackingId`, `clientId`,
    /// `domainApp`, `useSSL` and `source` keys.
    ///
    /// # Errors
    ///
    /// - `ConfigurationError::Io` - If the file cannot be read
    /// - `ConfigurationError::Parse` - If the file is not valid settings JSON
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigurationError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
            path: path.display().to_string(),
            source,
        })?;

        serde_json::from_str(&contents).map_err(|source| ConfigurationError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Overlays `other` on top of `self`; fields set in `other` win.
    pub fn merge(self, other: TrackerSettings) -> Self {
        Self {
            tracking_id: other.tracking_id.or(self.tracking_id),
            client_id: other.client_id.or(self.client_id),
            domain_app: other.domain_app.or(self.domain_app),
            use_ssl: other.use_ssl.or(self.use_ssl),
            source: other.source.or(self.source),
        }
    }
}

/// Parses boolean-ish flag values such as `true`, `1` or `off`.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Validated, immutable tracker configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    pub(crate) protocol_version: String,
    pub(crate) tracking_id: String,
    pub(crate) client_id: String,
    pub(crate) domain_app: String,
    pub(crate) use_ssl: bool,
    pub(crate) source: String,
}

impl TrackerConfig {
    /// Validates raw settings.
    ///
    /// `source` defaults to `direct` when absent or empty; the protocol
    /// version is always `1`.
    ///
    /// # Errors
    ///
    /// - `ConfigurationError::MissingField` - If `trackingId`, `clientId`,
    ///   `domainApp` or `useSSL` is absent
    /// - `ConfigurationError::EmptyField` - If `trackingId` or `clientId` is empty
    pub fn from_settings(settings: TrackerSettings) -> Result<Self, ConfigurationError> {
        let tracking_id = require_non_empty(settings.tracking_id, "trackingId")?;
        let client_id = require_non_empty(settings.client_id, "clientId")?;
        let domain_app = settings
            .domain_app
            .ok_or(ConfigurationError::MissingField { field: "domainApp" })?;
        let use_ssl = settings
            .use_ssl
            .ok_or(ConfigurationError::MissingField { field: "useSSL" })?;
        let source = settings
            .source
            .filter(|source| !source.is_empty())
            .unwrap_or_else(|| constants::DEFAULT_SOURCE.to_string());

        Ok(Self {
            protocol_version: constants::PROTOCOL_VERSION.to_string(),
            tracking_id,
            client_id,
            domain_app,
            use_ssl,
            source,
        })
    }

    pub fn protocol_version(&self) -> &str {
        &self.protocol_version
    }

    pub fn tracking_id(&self) -> &str {
        &self.tracking_id
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn domain_app(&self) -> &str {
        &self.domain_app
    }

    pub fn use_ssl(&self) -> bool {
        self.use_ssl
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl TryFrom<TrackerSettings> for TrackerConfig {
    type Error = ConfigurationError;

    fn try_from(settings: TrackerSettings) -> Result<Self, Self::Error> {
        Self::from_settings(settings)
    }
}

pub(crate) fn require_non_empty(
    value: Option<String>,
    field: &'static str,
) -> Result<String, ConfigurationError> {
    match value {
        None => Err(ConfigurationError::MissingField { field }),
        Some(value) if value.is_empty() => Err(ConfigurationError::EmptyField { field }),
        Some(value) => Ok(value),
    }
}

/// HTTP transport configuration.
///
/// Applied once when the sender is built; there are no per-hit timeouts.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Total time allowed for one hit round trip
    pub request_timeout: Duration,
    /// Time allowed to establish the connection
    pub connect_timeout: Duration,
    /// User agent for HTTP requests
    pub user_agent: &'static str,
    /// Maximum redirects followed per request
    pub max_redirects: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            user_agent: "gas-majestic-1",
            max_redirects: 3,
        }
    }
}

impl NetworkConfig {
    /// Creates network configuration with environment variable overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(timeout) = std::env::var("GAS_REQUEST_TIMEOUT") {
            if let Ok(seconds) = timeout.parse::<u64>() {
                config.request_timeout = Duration::from_secs(seconds);
            }
        }

        if let Ok(timeout) = std::env::var("GAS_CONNECT_TIMEOUT") {
            if let Ok(seconds) = timeout.parse::<u64>() {
                config.connect_timeout = Duration::from_secs(seconds);
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn complete_settings() -> TrackerSettings {
        TrackerSettings::new("UA-XXXX-Y", "555", "example.com", false)
    }

    #[test]
    fn test_default_network_values() {
        let config = NetworkConfig::default();

        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.user_agent, "gas-majestic-1");
        assert_eq!(config.max_redirects, 3);
    }

    #[test]
    fn test_from_settings_applies_defaults() {
        let config = TrackerConfig::from_settings(complete_settings()).unwrap();

        assert_eq!(config.protocol_version(), "1");
        assert_eq!(config.tracking_id(), "UA-XXXX-Y");
        assert_eq!(config.client_id(), "555");
        assert_eq!(config.domain_app(), "example.com");
        assert!(!config.use_ssl());
        assert_eq!(config.source(), "direct");
    }

    #[test]
    fn test_empty_source_falls_back_to_direct() {
        let config = TrackerConfig::from_settings(complete_settings().with_source("")).unwrap();
        assert_eq!(config.source(), "direct");

        let config =
            TrackerConfig::from_settings(complete_settings().with_source("newsletter")).unwrap();
        assert_eq!(config.source(), "newsletter");
    }

    #[test]
    fn test_missing_required_fields() {
        let cases: [(fn(&mut TrackerSettings), &str); 4] = [
            (|s| s.tracking_id = None, "trackingId"),
            (|s| s.client_id = None, "clientId"),
            (|s| s.domain_app = None, "domainApp"),
            (|s| s.use_ssl = None, "useSSL"),
        ];

        for (clear, expected) in cases {
            let mut settings = complete_settings();
            clear(&mut settings);
            let result = TrackerConfig::from_settings(settings);
            assert!(matches!(
                result,
                Err(ConfigurationError::MissingField { field }) if field == expected
            ));
        }
    }

    #[test]
    fn test_empty_identity_fields_rejected() {
        let mut settings = complete_settings();
        settings.client_id = Some(String::new());
        assert!(matches!(
            TrackerConfig::try_from(settings),
            Err(ConfigurationError::EmptyField { field: "clientId" })
        ));
    }

    #[test]
    fn test_merge_prefers_later_source() {
        let file = TrackerSettings {
            tracking_id: Some("UA-FILE".to_string()),
            source: Some("file".to_string()),
            ..TrackerSettings::default()
        };
        let flags = TrackerSettings {
            tracking_id: Some("UA-FLAG".to_string()),
            use_ssl: Some(true),
            ..TrackerSettings::default()
        };

        let merged = file.merge(flags);
        assert_eq!(merged.tracking_id.as_deref(), Some("UA-FLAG"));
        assert_eq!(merged.source.as_deref(), Some("file"));
        assert_eq!(merged.use_ssl, Some(true));
        assert_eq!(merged.client_id, None);
    }

    #[test]
    fn test_parse_flag_values() {
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag(" TRUE "), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"trackingId":"UA-1","clientId":"abc","domainApp":"example.com","useSSL":true}}"#
        )
        .unwrap();

        let settings = TrackerSettings::from_json_file(file.path()).unwrap();
        assert_eq!(settings.tracking_id.as_deref(), Some("UA-1"));
        assert_eq!(settings.client_id.as_deref(), Some("abc"));
        assert_eq!(settings.use_ssl, Some(true));
        assert_eq!(settings.source, None);
    }

    #[test]
    fn test_from_json_file_errors() {
        let missing = TrackerSettings::from_json_file(Path::new("/nonexistent/gas.json"));
        assert!(matches!(missing, Err(ConfigurationError::Io { .. })));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let invalid = TrackerSettings::from_json_file(file.path());
        assert!(matches!(invalid, Err(ConfigurationError::Parse { .. })));
    }
}
