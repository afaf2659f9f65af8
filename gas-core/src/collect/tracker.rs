//! Tracker: configuration plus one tracking operation per hit type

use std::sync::Arc;

use super::protocol::EndpointTable;
use super::types::{
    AppEvent, AppView, Clock, Event, Exception, Hit, HitParameters, HitSender, Item, PageView,
    Social, SystemClock, Timing, Transaction,
};
use super::{ConfigurationError, TransportError};
use crate::config::{TrackerConfig, TrackerSettings, require_non_empty};

/// Measurement protocol tracker.
///
/// Owns the tracker configuration and the sender. Every tracking call
/// builds a fresh parameter set, resolves the endpoint from the SSL flag
/// and performs exactly one send. Nothing is queued, batched or retried.
pub struct Tracker<S> {
    config: TrackerConfig,
    endpoints: EndpointTable,
    sender: S,
    clock: Arc<dyn Clock>,
}

impl<S: HitSender> Tracker<S> {
    /// Creates a tracker from raw settings.
    ///
    /// # Errors
    ///
    /// - `ConfigurationError::MissingField` - If a required setting is absent
    /// - `ConfigurationError::EmptyField` - If the tracking or client ID is empty
    pub fn new(settings: TrackerSettings, sender: S) -> Result<Self, ConfigurationError> {
        let config = TrackerConfig::from_settings(settings)?;
        Ok(Self::with_config(config, sender))
    }

    /// Creates a tracker from an already validated configuration.
    pub fn with_config(config: TrackerConfig, sender: S) -> Self {
        Self {
            config,
            endpoints: EndpointTable::default(),
            sender,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the clock used for the `z` timestamp.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the collection endpoint table.
    pub fn with_endpoints(mut self, endpoints: EndpointTable) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn sender(&self) -> &S {
        &self.sender
    }

    pub fn endpoints(&self) -> &EndpointTable {
        &self.endpoints
    }

    pub fn tracking_id(&self) -> &str {
        &self.config.tracking_id
    }

    pub fn client_id(&self) -> &str {
        &self.config.client_id
    }

    pub fn protocol_version(&self) -> &str {
        &self.config.protocol_version
    }

    pub fn domain_app(&self) -> &str {
        &self.config.domain_app
    }

    pub fn use_ssl(&self) -> bool {
        self.config.use_ssl
    }

    pub fn source(&self) -> &str {
        &self.config.source
    }

    /// # Errors
    ///
    /// - `ConfigurationError::EmptyField` - If `tracking_id` is empty
    pub fn set_tracking_id(
        &mut self,
        tracking_id: impl Into<String>,
    ) -> Result<&mut Self, ConfigurationError> {
        self.config.tracking_id = require_non_empty(Some(tracking_id.into()), "trackingId")?;
        Ok(self)
    }

    /// # Errors
    ///
    /// - `ConfigurationError::EmptyField` - If `client_id` is empty
    pub fn set_client_id(
        &mut self,
        client_id: impl Into<String>,
    ) -> Result<&mut Self, ConfigurationError> {
        self.config.client_id = require_non_empty(Some(client_id.into()), "clientId")?;
        Ok(self)
    }

    /// # Errors
    ///
    /// - `ConfigurationError::EmptyField` - If `protocol_version` is empty
    pub fn set_protocol_version(
        &mut self,
        protocol_version: impl Into<String>,
    ) -> Result<&mut Self, ConfigurationError> {
        self.config.protocol_version =
            require_non_empty(Some(protocol_version.into()), "protocolVersion")?;
        Ok(self)
    }

    pub fn set_domain_app(&mut self, domain_app: impl Into<String>) -> &mut Self {
        self.config.domain_app = domain_app.into();
        self
    }

    pub fn set_use_ssl(&mut self, use_ssl: bool) -> &mut Self {
        self.config.use_ssl = use_ssl;
        self
    }

    /// Returns `v`, `tid`, `cid`, `z` and `cs` for the current configuration.
    ///
    /// The timestamp is read from the clock on every call.
    pub fn build_required_params(&self) -> HitParameters {
        let mut params = HitParameters::new();
        params.insert("v", self.config.protocol_version.as_str());
        params.insert("tid", self.config.tracking_id.as_str());
        params.insert("cid", self.config.client_id.as_str());
        params.insert("z", self.clock.unix_timestamp().to_string());
        params.insert("cs", self.config.source.as_str());
        params
    }

    /// Returns the TLS collection URL iff SSL is enabled.
    pub fn resolve_endpoint(&self) -> &str {
        self.endpoints.select(self.config.use_ssl)
    }

    /// Builds the complete parameter set for `hit`.
    pub fn build_hit_params(&self, hit: &Hit) -> HitParameters {
        let mut params = self.build_required_params();
        hit.append_params(&mut params, &self.config.domain_app);
        params
    }

    /// Sends `hit` and returns the collector's HTTP status code.
    ///
    /// Any status code is returned as-is; only transport failures are errors.
    ///
    /// # Errors
    ///
    /// - `TransportError` - If the sender could not complete the request
    pub async fn track(&self, hit: &Hit) -> Result<u16, TransportError> {
        let params = self.build_hit_params(hit);
        let url = self.resolve_endpoint();
        let body = params.to_form_body();

        tracing::debug!(hit_type = %hit.hit_type(), url, "Sending hit");
        tracing::trace!(body = %body, "Encoded hit body");

        let status = self.sender.send(url, body).await?;

        tracing::debug!(hit_type = %hit.hit_type(), status, "Hit delivered");
        Ok(status)
    }

    /// # Errors
    ///
    /// - `TransportError` - If the sender could not complete the request
    pub async fn track_page_view(
        &self,
        host: Option<&str>,
        page: Option<&str>,
        title: Option<&str>,
    ) -> Result<u16, TransportError> {
        let hit = PageView {
            host: host.map(str::to_string),
            page: page.map(str::to_string),
            title: title.map(str::to_string),
        };
        self.track(&hit.into()).await
    }

    /// # Errors
    ///
    /// - `TransportError` - If the sender could not complete the request
    pub async fn track_event(
        &self,
        category: &str,
        action: &str,
        label: Option<&str>,
        value: Option<&str>,
    ) -> Result<u16, TransportError> {
        let hit = Event {
            category: category.to_string(),
            action: action.to_string(),
            label: label.map(str::to_string),
            value: value.map(str::to_string),
        };
        self.track(&hit.into()).await
    }

    /// # Errors
    ///
    /// - `TransportError` - If the sender could not complete the request
    pub async fn track_transaction(&self, transaction: Transaction) -> Result<u16, TransportError> {
        self.track(&transaction.into()).await
    }

    /// # Errors
    ///
    /// - `TransportError` - If the sender could not complete the request
    pub async fn track_item(&self, item: Item) -> Result<u16, TransportError> {
        self.track(&item.into()).await
    }

    /// # Errors
    ///
    /// - `TransportError` - If the sender could not complete the request
    pub async fn track_social_interaction(
        &self,
        action: &str,
        network: &str,
        target: &str,
    ) -> Result<u16, TransportError> {
        self.track(&Social::new(action, network, target).into()).await
    }

    /// # Errors
    ///
    /// - `TransportError` - If the sender could not complete the request
    pub async fn track_exception(
        &self,
        description: Option<&str>,
        fatal: Option<bool>,
    ) -> Result<u16, TransportError> {
        let hit = Exception {
            description: description.map(str::to_string),
            fatal,
        };
        self.track(&hit.into()).await
    }

    /// # Errors
    ///
    /// - `TransportError` - If the sender could not complete the request
    pub async fn track_timing(&self, timing: Timing) -> Result<u16, TransportError> {
        self.track(&timing.into()).await
    }

    /// # Errors
    ///
    /// - `TransportError` - If the sender could not complete the request
    pub async fn track_mobile(
        &self,
        app_name: &str,
        app_version: &str,
        screen: &str,
    ) -> Result<u16, TransportError> {
        self.track(&AppView::new(app_name, app_version, screen).into()).await
    }

    /// # Errors
    ///
    /// - `TransportError` - If the sender could not complete the request
    pub async fn track_mobile_event(
        &self,
        app_name: &str,
        category: &str,
        action: &str,
    ) -> Result<u16, TransportError> {
        self.track(&AppEvent::new(app_name, category, action).into()).await
    }
}

#[cfg(test)]
mod tracker_tests {
    use std::sync::atomic::{AtomicI64, Ordering};

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use proptest::prelude::*;

    use super::*;
    use crate::collect::protocol::constants;
    use crate::collect::protocol::encoding::decode_form;

    #[derive(Default)]
    struct RecordingSender {
        requests: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl HitSender for RecordingSender {
        async fn send(&self, url: &str, form_body: String) -> Result<u16, TransportError> {
            if self.fail {
                return Err(TransportError::ConnectionFailed {
                    url: url.to_string(),
                    reason: "connection refused".to_string(),
                });
            }
            self.requests.lock().push((url.to_string(), form_body));
            Ok(200)
        }
    }

    struct StoppedClock(AtomicI64);

    impl Clock for StoppedClock {
        fn unix_timestamp(&self) -> i64 {
            self.0.load(Ordering::Relaxed)
        }
    }

    fn create_test_tracker(use_ssl: bool) -> Tracker<RecordingSender> {
        let settings = TrackerSettings::new("UA-XXXX-Y", "555", "example.com", use_ssl);
        Tracker::new(settings, RecordingSender::default())
            .unwrap()
            .with_clock(Arc::new(StoppedClock(AtomicI64::new(1_400_000_000))))
    }

    fn last_body(tracker: &Tracker<RecordingSender>) -> String {
        tracker.sender().requests.lock().last().unwrap().1.clone()
    }

    #[test]
    fn test_required_params() {
        let tracker = create_test_tracker(false);
        let params = tracker.build_required_params();

        assert_eq!(params.keys().collect::<Vec<_>>(), vec!["v", "tid", "cid", "z", "cs"]);
        assert_eq!(params.get("v"), Some("1"));
        assert_eq!(params.get("tid"), Some("UA-XXXX-Y"));
        assert_eq!(params.get("cid"), Some("555"));
        assert_eq!(params.get("z"), Some("1400000000"));
        assert_eq!(params.get("cs"), Some("direct"));
    }

    #[test]
    fn test_required_params_use_wall_clock_by_default() {
        let settings = TrackerSettings::new("UA-XXXX-Y", "555", "example.com", false);
        let tracker = Tracker::new(settings, RecordingSender::default()).unwrap();

        let before = chrono::Utc::now().timestamp();
        let z: i64 = tracker
            .build_required_params()
            .get("z")
            .unwrap()
            .parse()
            .unwrap();
        let after = chrono::Utc::now().timestamp();

        assert!(before <= z && z <= after);
    }

    #[test]
    fn test_resolve_endpoint_follows_ssl_flag() {
        let mut tracker = create_test_tracker(false);
        assert_eq!(tracker.resolve_endpoint(), constants::COLLECT_URL);

        tracker.set_use_ssl(true);
        assert_eq!(tracker.resolve_endpoint(), constants::COLLECT_SSL_URL);
    }

    #[test]
    fn test_substitute_endpoints_and_config_access() {
        let endpoints =
            EndpointTable::new("http://plain.local/collect", "https://tls.local/collect");
        let mut tracker = create_test_tracker(false).with_endpoints(endpoints.clone());

        assert_eq!(tracker.endpoints(), &endpoints);
        assert_eq!(tracker.config().tracking_id(), "UA-XXXX-Y");
        assert_eq!(tracker.config().domain_app(), "example.com");
        assert_eq!(tracker.resolve_endpoint(), "http://plain.local/collect");

        tracker.set_use_ssl(true);
        assert!(tracker.config().use_ssl());
        assert_eq!(tracker.resolve_endpoint(), "https://tls.local/collect");
    }

    #[test]
    fn test_chained_setters() {
        let mut tracker = create_test_tracker(false);
        tracker
            .set_tracking_id("UA-NEW")
            .unwrap()
            .set_client_id("777")
            .unwrap()
            .set_domain_app("shop.example.com")
            .set_use_ssl(true);

        assert_eq!(tracker.tracking_id(), "UA-NEW");
        assert_eq!(tracker.client_id(), "777");
        assert_eq!(tracker.domain_app(), "shop.example.com");
        assert!(tracker.use_ssl());
    }

    #[test]
    fn test_setters_reject_empty_identity() {
        let mut tracker = create_test_tracker(false);
        assert!(matches!(
            tracker.set_client_id(""),
            Err(ConfigurationError::EmptyField { field: "clientId" })
        ));
        assert!(tracker.set_protocol_version("").is_err());
        assert_eq!(tracker.client_id(), "555");
        assert_eq!(tracker.protocol_version(), "1");
    }

    #[test]
    fn test_new_fails_without_client_id() {
        let mut settings = TrackerSettings::new("UA-XXXX-Y", "555", "example.com", false);
        settings.client_id = None;

        let result = Tracker::new(settings, RecordingSender::default());
        assert!(matches!(
            result,
            Err(ConfigurationError::MissingField { field: "clientId" })
        ));
    }

    #[tokio::test]
    async fn test_track_page_view_defaults() {
        let tracker = create_test_tracker(false);
        let status = tracker.track_page_view(None, Some("/"), None).await.unwrap();

        assert_eq!(status, 200);
        assert_eq!(
            last_body(&tracker),
            "v=1&tid=UA-XXXX-Y&cid=555&z=1400000000&cs=direct&t=pageview&dh=example.com&dp=%2F&dt=%2F"
        );
    }

    #[tokio::test]
    async fn test_track_event_keys() {
        let tracker = create_test_tracker(true);
        tracker
            .track_event("video", "play", Some("holiday"), Some("300"))
            .await
            .unwrap();

        let (url, body) = tracker.sender().requests.lock().last().unwrap().clone();
        assert_eq!(url, constants::COLLECT_SSL_URL);
        assert!(body.ends_with("&t=event&ec=video&ea=play&el=holiday&ev=300"));
    }

    #[tokio::test]
    async fn test_track_transaction_sends_empty_optionals() {
        let tracker = create_test_tracker(false);
        tracker
            .track_transaction(Transaction::new("12345"))
            .await
            .unwrap();

        assert!(last_body(&tracker).ends_with("&t=transaction&ti=12345&ta=&tr=&ts=&tt=&cu="));
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let settings = TrackerSettings::new("UA-XXXX-Y", "555", "example.com", false);
        let sender = RecordingSender {
            fail: true,
            ..RecordingSender::default()
        };
        let tracker = Tracker::new(settings, sender).unwrap();

        let result = tracker
            .track_social_interaction("like", "facebook", "/home")
            .await;
        assert!(matches!(
            result,
            Err(TransportError::ConnectionFailed { url, .. }) if url == constants::COLLECT_URL
        ));
        assert_eq!(tracker.tracking_id(), "UA-XXXX-Y");
    }

    proptest! {
        #[test]
        fn prop_every_hit_carries_required_params(
            category in ".*",
            action in ".*",
            screen in ".*",
        ) {
            let tracker = create_test_tracker(false);
            let hits: Vec<Hit> = vec![
                Event::new(category.clone(), action.clone()).into(),
                AppView::new("app", "1.0", screen.clone()).into(),
                AppEvent::new("app", category, action).into(),
                Exception::default().into(),
                Timing::default().into(),
                PageView::default().into(),
            ];

            for hit in &hits {
                let decoded = decode_form(&tracker.build_hit_params(hit).to_form_body());
                for key in ["v", "tid", "cid", "z", "cs"] {
                    let value = decoded.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str());
                    prop_assert!(value.is_some_and(|v| !v.is_empty()));
                }
                prop_assert_eq!(&decoded[5], &("t".to_string(), hit.hit_type().as_str().to_string()));
            }
        }
    }
}
