//! Core types for measurement protocol hits

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use super::TransportError;
use super::protocol::encoding;

/// Hit types understood by the collector.
///
/// Each value maps to the `t` parameter of a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HitType {
    PageView,
    Event,
    Transaction,
    Item,
    Social,
    Exception,
    Timing,
    AppView,
}

impl HitType {
    /// Returns the wire value for the `t` parameter.
    pub fn as_str(self) -> &'static str {
        match self {
            HitType::PageView => "pageview",
            HitType::Event => "event",
            HitType::Transaction => "transaction",
            HitType::Item => "item",
            HitType::Social => "social",
            HitType::Exception => "exception",
            HitType::Timing => "timing",
            HitType::AppView => "appview",
        }
    }
}

impl fmt::Display for HitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Page view hit.
///
/// `host` falls back to the tracker's app domain and `title` falls back to
/// the page when absent or empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageView {
    /// Document hostname (`dh`)
    pub host: Option<String>,
    /// Document path (`dp`), `/` when absent
    pub page: Option<String>,
    /// Document title (`dt`)
    pub title: Option<String>,
}

impl PageView {
    pub fn new(page: impl Into<String>) -> Self {
        Self {
            page: Some(page.into()),
            ..Self::default()
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Event hit with category and action, plus optional label and value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub category: String,
    pub action: String,
    pub label: Option<String>,
    pub value: Option<String>,
}

impl Event {
    pub fn new(category: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            action: action.into(),
            label: None,
            value: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// E-commerce transaction hit.
///
/// Monetary fields are passed through verbatim; the collector interprets them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub transaction_id: String,
    pub affiliation: Option<String>,
    pub revenue: Option<String>,
    pub shipping: Option<String>,
    pub tax: Option<String>,
    pub currency: Option<String>,
}

impl Transaction {
    pub fn new(transaction_id: impl Into<String>) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            affiliation: None,
            revenue: None,
            shipping: None,
            tax: None,
            currency: None,
        }
    }

    pub fn with_affiliation(mut self, affiliation: impl Into<String>) -> Self {
        self.affiliation = Some(affiliation.into());
        self
    }

    pub fn with_revenue(mut self, revenue: impl Into<String>) -> Self {
        self.revenue = Some(revenue.into());
        self
    }

    pub fn with_shipping(mut self, shipping: impl Into<String>) -> Self {
        self.shipping = Some(shipping.into());
        self
    }

    pub fn with_tax(mut self, tax: impl Into<String>) -> Self {
        self.tax = Some(tax.into());
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }
}

/// E-commerce item hit belonging to a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub transaction_id: String,
    pub name: String,
    pub price: Option<String>,
    pub quantity: Option<String>,
    pub code: Option<String>,
    pub variation: Option<String>,
    pub currency: Option<String>,
}

impl Item {
    pub fn new(transaction_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            name: name.into(),
            price: None,
            quantity: None,
            code: None,
            variation: None,
            currency: None,
        }
    }

    pub fn with_price(mut self, price: impl Into<String>) -> Self {
        self.price = Some(price.into());
        self
    }

    pub fn with_quantity(mut self, quantity: impl Into<String>) -> Self {
        self.quantity = Some(quantity.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_variation(mut self, variation: impl Into<String>) -> Self {
        self.variation = Some(variation.into());
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }
}

/// Social interaction hit. All three fields are required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Social {
    pub action: String,
    pub network: String,
    pub target: String,
}

impl Social {
    pub fn new(
        action: impl Into<String>,
        network: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            action: action.into(),
            network: network.into(),
            target: target.into(),
        }
    }
}

/// Exception hit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exception {
    pub description: Option<String>,
    pub fatal: Option<bool>,
}

impl Exception {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            fatal: None,
        }
    }

    pub fn with_fatal(mut self, fatal: bool) -> Self {
        self.fatal = Some(fatal);
        self
    }
}

/// User timing hit, optionally carrying browser load timings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timing {
    /// Timing category (`utc`)
    pub category: Option<String>,
    /// Timing variable (`utv`)
    pub variable: Option<String>,
    /// Timing time in milliseconds (`utt`)
    pub time: Option<String>,
    /// Timing label (`utl`)
    pub label: Option<String>,
    /// DNS load time (`dns`)
    pub dns: Option<String>,
    /// Page download time (`pdt`)
    pub page_download: Option<String>,
    /// Redirect time (`rrt`)
    pub redirect: Option<String>,
    /// TCP connect time (`tcp`)
    pub tcp: Option<String>,
    /// Server response time (`srt`)
    pub server_response: Option<String>,
}

impl Timing {
    pub fn new(
        category: impl Into<String>,
        variable: impl Into<String>,
        time: impl Into<String>,
    ) -> Self {
        Self {
            category: Some(category.into()),
            variable: Some(variable.into()),
            time: Some(time.into()),
            ..Self::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_dns(mut self, dns: impl Into<String>) -> Self {
        self.dns = Some(dns.into());
        self
    }

    pub fn with_page_download(mut self, page_download: impl Into<String>) -> Self {
        self.page_download = Some(page_download.into());
        self
    }

    pub fn with_redirect(mut self, redirect: impl Into<String>) -> Self {
        self.redirect = Some(redirect.into());
        self
    }

    pub fn with_tcp(mut self, tcp: impl Into<String>) -> Self {
        self.tcp = Some(tcp.into());
        self
    }

    pub fn with_server_response(mut self, server_response: impl Into<String>) -> Self {
        self.server_response = Some(server_response.into());
        self
    }
}

/// Mobile app screen view hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppView {
    pub app_name: String,
    pub app_version: String,
    pub screen: String,
}

impl AppView {
    pub fn new(
        app_name: impl Into<String>,
        app_version: impl Into<String>,
        screen: impl Into<String>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            app_version: app_version.into(),
            screen: screen.into(),
        }
    }
}

/// Mobile app event hit. Sent with `t=event`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppEvent {
    pub app_name: String,
    pub category: String,
    pub action: String,
}

impl AppEvent {
    pub fn new(
        app_name: impl Into<String>,
        category: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            category: category.into(),
            action: action.into(),
        }
    }
}

/// A single hit of any supported type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hit {
    PageView(PageView),
    Event(Event),
    Transaction(Transaction),
    Item(Item),
    Social(Social),
    Exception(Exception),
    Timing(Timing),
    AppView(AppView),
    AppEvent(AppEvent),
}

impl Hit {
    /// Returns the hit type sent as `t`.
    pub fn hit_type(&self) -> HitType {
        match self {
            Hit::PageView(_) => HitType::PageView,
            Hit::Event(_) | Hit::AppEvent(_) => HitType::Event,
            Hit::Transaction(_) => HitType::Transaction,
            Hit::Item(_) => HitType::Item,
            Hit::Social(_) => HitType::Social,
            Hit::Exception(_) => HitType::Exception,
            Hit::Timing(_) => HitType::Timing,
            Hit::AppView(_) => HitType::AppView,
        }
    }

    /// Appends `t` and the hit-specific keys to `params`.
    ///
    /// Absent optional values are written as empty strings so every hit type
    /// keeps a stable parameter shape.
    pub(crate) fn append_params(&self, params: &mut HitParameters, default_host: &str) {
        params.insert("t", self.hit_type().as_str());

        match self {
            Hit::PageView(hit) => {
                let page = hit
                    .page
                    .as_deref()
                    .unwrap_or(super::protocol::constants::DEFAULT_PAGE);
                let host = non_empty(&hit.host).unwrap_or(default_host);
                let title = non_empty(&hit.title).unwrap_or(page);
                params.insert("dh", host);
                params.insert("dp", page);
                params.insert("dt", title);
            }
            Hit::Event(hit) => {
                params.insert("ec", &hit.category);
                params.insert("ea", &hit.action);
                params.insert("el", or_empty(&hit.label));
                params.insert("ev", or_empty(&hit.value));
            }
            Hit::Transaction(hit) => {
                params.insert("ti", &hit.transaction_id);
                params.insert("ta", or_empty(&hit.affiliation));
                params.insert("tr", or_empty(&hit.revenue));
                params.insert("ts", or_empty(&hit.shipping));
                params.insert("tt", or_empty(&hit.tax));
                params.insert("cu", or_empty(&hit.currency));
            }
            Hit::Item(hit) => {
                params.insert("ti", &hit.transaction_id);
                params.insert("in", &hit.name);
                params.insert("ip", or_empty(&hit.price));
                params.insert("iq", or_empty(&hit.quantity));
                params.insert("ic", or_empty(&hit.code));
                params.insert("iv", or_empty(&hit.variation));
                params.insert("cu", or_empty(&hit.currency));
            }
            Hit::Social(hit) => {
                params.insert("sa", &hit.action);
                params.insert("sn", &hit.network);
                params.insert("st", &hit.target);
            }
            Hit::Exception(hit) => {
                let fatal = match hit.fatal {
                    Some(true) => "1",
                    Some(false) => "0",
                    None => "",
                };
                params.insert("exd", or_empty(&hit.description));
                params.insert("exf", fatal);
            }
            Hit::Timing(hit) => {
                params.insert("utc", or_empty(&hit.category));
                params.insert("utv", or_empty(&hit.variable));
                params.insert("utt", or_empty(&hit.time));
                params.insert("utl", or_empty(&hit.label));
                params.insert("dns", or_empty(&hit.dns));
                params.insert("pdt", or_empty(&hit.page_download));
                params.insert("rrt", or_empty(&hit.redirect));
                params.insert("tcp", or_empty(&hit.tcp));
                params.insert("srt", or_empty(&hit.server_response));
            }
            Hit::AppView(hit) => {
                params.insert("an", &hit.app_name);
                params.insert("av", &hit.app_version);
                params.insert("cd", &hit.screen);
            }
            Hit::AppEvent(hit) => {
                params.insert("an", &hit.app_name);
                params.insert("ec", &hit.category);
                params.insert("ea", &hit.action);
            }
        }
    }
}

fn or_empty(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

macro_rules! impl_hit_from {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Hit {
                fn from(hit: $variant) -> Self {
                    Hit::$variant(hit)
                }
            }
        )*
    };
}

impl_hit_from!(
    PageView,
    Event,
    Transaction,
    Item,
    Social,
    Exception,
    Timing,
    AppView,
    AppEvent,
);

/// Parameter mapping for a single hit.
///
/// Keeps insertion order so encoded bodies are stable. Values are stored raw
/// and percent-encoded once by [`HitParameters::to_form_body`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HitParameters {
    pairs: Vec<(&'static str, String)>,
}

impl HitParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value`, replacing an existing value in place.
    pub fn insert(&mut self, key: &'static str, value: impl Into<String>) {
        let value = value.into();
        match self.pairs.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.pairs.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| *k == key)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.pairs.iter().map(|(k, _)| *k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.pairs.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// Serializes the mapping as an `application/x-www-form-urlencoded` body.
    pub fn to_form_body(&self) -> String {
        encoding::encode_form(self.iter())
    }
}

/// Source of the `z` timestamp.
pub trait Clock: Send + Sync {
    /// Current time as whole seconds since the Unix epoch.
    fn unix_timestamp(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn unix_timestamp(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Delivery seam between the tracker and the network.
///
/// Implementations perform exactly one request per call and return the
/// collector's HTTP status code without interpreting it.
#[async_trait]
pub trait HitSender: Send + Sync {
    /// POSTs `form_body` to `url`.
    ///
    /// # Errors
    ///
    /// - `TransportError::ConnectionFailed` - If the request could not be completed
    /// - `TransportError::Timeout` - If the collector did not answer in time
    async fn send(&self, url: &str, form_body: String) -> Result<u16, TransportError>;
}

#[async_trait]
impl<T: HitSender + ?Sized> HitSender for Arc<T> {
    async fn send(&self, url: &str, form_body: String) -> Result<u16, TransportError> {
        (**self).send(url, form_body).await
    }
}

#[cfg(test)]
mod types_tests {
    use super::*;

    fn params_for(hit: impl Into<Hit>) -> HitParameters {
        let hit: Hit = hit.into();
        let mut params = HitParameters::new();
        hit.append_params(&mut params, "example.com");
        params
    }

    #[test]
    fn test_hit_type_wire_values() {
        assert_eq!(HitType::PageView.as_str(), "pageview");
        assert_eq!(HitType::AppView.to_string(), "appview");
        assert_eq!(
            Hit::from(AppEvent::new("app", "cat", "act")).hit_type(),
            HitType::Event
        );
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut params = HitParameters::new();
        params.insert("v", "1");
        params.insert("tid", "UA-1");
        params.insert("v", "2");
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("v"), Some("2"));
        assert_eq!(params.keys().collect::<Vec<_>>(), vec!["v", "tid"]);
    }

    #[test]
    fn test_page_view_fallbacks() {
        let params = params_for(PageView::default());
        assert_eq!(params.get("dh"), Some("example.com"));
        assert_eq!(params.get("dp"), Some("/"));
        assert_eq!(params.get("dt"), Some("/"));

        let params = params_for(PageView::new("/home").with_host("").with_title(""));
        assert_eq!(params.get("dh"), Some("example.com"));
        assert_eq!(params.get("dt"), Some("/home"));

        let params = params_for(
            PageView::new("/home")
                .with_host("shop.example.com")
                .with_title("Home"),
        );
        assert_eq!(params.get("dh"), Some("shop.example.com"));
        assert_eq!(params.get("dt"), Some("Home"));
    }

    #[test]
    fn test_item_name_is_sent_as_in() {
        let params = params_for(Item::new("12345", "sofa").with_price("300"));
        assert_eq!(params.get("in"), Some("sofa"));
        assert_eq!(params.get("ip"), Some("300"));
        assert_eq!(params.get("iq"), Some(""));
    }

    #[test]
    fn test_exception_fatal_absent_is_empty_and_false_is_zero() {
        assert_eq!(params_for(Exception::default()).get("exf"), Some(""));
        assert_eq!(
            params_for(Exception::new("IOException").with_fatal(true)).get("exf"),
            Some("1")
        );
        assert_eq!(
            params_for(Exception::new("IOException").with_fatal(false)).get("exf"),
            Some("0")
        );
    }

    #[test]
    fn test_timing_keys_in_wire_order() {
        let params = params_for(Timing::new("jsonLoader", "load", "5000").with_dns("100"));
        assert_eq!(
            params.keys().collect::<Vec<_>>(),
            vec!["t", "utc", "utv", "utt", "utl", "dns", "pdt", "rrt", "tcp", "srt"]
        );
        assert_eq!(params.get("dns"), Some("100"));
        assert_eq!(params.get("srt"), Some(""));
    }

    #[test]
    fn test_app_event_keys() {
        let params = params_for(AppEvent::new("funTimes", "video", "play"));
        assert_eq!(params.get("t"), Some("event"));
        assert_eq!(params.get("an"), Some("funTimes"));
        assert_eq!(params.get("ec"), Some("video"));
        assert_eq!(params.get("ea"), Some("play"));
        assert!(!params.contains_key("av"));
    }

    #[test]
    fn test_form_body_encodes_once() {
        let params = params_for(PageView::new("/"));
        assert_eq!(params.to_form_body(), "t=pageview&dh=example.com&dp=%2F&dt=%2F");
    }
}
