//! Measurement protocol constants, endpoint table and body encoding

/// Measurement protocol constants
pub mod constants {
    /// Protocol version sent as `v` on every hit
    pub const PROTOCOL_VERSION: &str = "1";

    /// Campaign source used when none is configured
    pub const DEFAULT_SOURCE: &str = "direct";

    /// Page path used by page view hits when none is given
    pub const DEFAULT_PAGE: &str = "/";

    /// Plain HTTP collection endpoint
    pub const COLLECT_URL: &str = "http://www.google-analytics.com/collect";

    /// TLS collection endpoint
    pub const COLLECT_SSL_URL: &str = "https://ssl.google-analytics.com/collect";

    /// Content type of every hit body
    pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
}

/// Pair of collection endpoints a tracker chooses between.
///
/// The default table points at the public collector. A substitute table can
/// be handed to a tracker to target a proxy or a local test collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointTable {
    /// Endpoint used when SSL is disabled
    pub plain: String,
    /// Endpoint used when SSL is enabled
    pub tls: String,
}

impl Default for EndpointTable {
    fn default() -> Self {
        Self {
            plain: constants::COLLECT_URL.to_string(),
            tls: constants::COLLECT_SSL_URL.to_string(),
        }
    }
}

impl EndpointTable {
    /// Creates a table from explicit plain and TLS URLs.
    pub fn new(plain: impl Into<String>, tls: impl Into<String>) -> Self {
        Self {
            plain: plain.into(),
            tls: tls.into(),
        }
    }

    /// Creates a table that uses the same URL for both modes.
    pub fn single(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            plain: url.clone(),
            tls: url,
        }
    }

    /// Returns the TLS endpoint iff `use_ssl` is set.
    pub fn select(&self, use_ssl: bool) -> &str {
        if use_ssl {
            self.tls.as_str()
        } else {
            self.plain.as_str()
        }
    }
}

/// Form body encoding for hit payloads
pub mod encoding {
    use url::form_urlencoded;

    /// Serialize key/value pairs as an `application/x-www-form-urlencoded` body.
    ///
    /// Values are percent-encoded exactly once; spaces become `+`.
    pub fn encode_form<I, K, V>(pairs: I) -> String
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish()
    }

    /// Parse a form body back into ordered key/value pairs.
    pub fn decode_form(body: &str) -> Vec<(String, String)> {
        form_urlencoded::parse(body.as_bytes())
            .into_owned()
            .collect()
    }
}
