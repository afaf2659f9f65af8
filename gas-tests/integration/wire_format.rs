//! Wire format contract tests
//!
//! Every hit type is sent through the simulated sender with a fixed clock so
//! the encoded bodies can be compared byte for byte.

use std::sync::Arc;

use gas_core::collect::protocol::constants::{COLLECT_SSL_URL, COLLECT_URL};
use gas_core::collect::{Item, Timing, Transaction};
use gas_core::{ConfigurationError, Tracker, TrackerSettings, TransportError};
use gas_sim::{FixedClock, SimulatedHitSender};
use proptest::prelude::*;

const FIXED_TIME: i64 = 1_400_000_000;
const REQUIRED: &str = "v=1&tid=UA-XXXX-Y&cid=555&z=1400000000&cs=direct";

struct Harness {
    tracker: Tracker<Arc<SimulatedHitSender>>,
    sender: Arc<SimulatedHitSender>,
    clock: Arc<FixedClock>,
}

fn create_harness(use_ssl: bool) -> Harness {
    let sender = Arc::new(SimulatedHitSender::new());
    let clock = Arc::new(FixedClock::new(FIXED_TIME));
    let settings = TrackerSettings::new("UA-XXXX-Y", "555", "example.com", use_ssl);
    let tracker = Tracker::new(settings, Arc::clone(&sender))
        .unwrap()
        .with_clock(clock.clone());

    Harness {
        tracker,
        sender,
        clock,
    }
}

fn last_body(harness: &Harness) -> String {
    harness.sender.last_request().unwrap().form_body
}

#[tokio::test]
async fn test_page_view_falls_back_to_domain_and_page() {
    let harness = create_harness(false);
    harness
        .tracker
        .track_page_view(None, Some("/"), None)
        .await
        .unwrap();

    assert_eq!(
        last_body(&harness),
        format!("{REQUIRED}&t=pageview&dh=example.com&dp=%2F&dt=%2F")
    );
}

#[tokio::test]
async fn test_event_body() {
    let harness = create_harness(false);
    harness
        .tracker
        .track_event("video", "play", Some("holiday"), Some("300"))
        .await
        .unwrap();

    assert_eq!(
        last_body(&harness),
        format!("{REQUIRED}&t=event&ec=video&ea=play&el=holiday&ev=300")
    );
}

#[tokio::test]
async fn test_transaction_keeps_empty_optionals() {
    let harness = create_harness(false);
    harness
        .tracker
        .track_transaction(Transaction::new("12345"))
        .await
        .unwrap();

    assert_eq!(
        last_body(&harness),
        format!("{REQUIRED}&t=transaction&ti=12345&ta=&tr=&ts=&tt=&cu=")
    );
}

#[tokio::test]
async fn test_full_transaction_and_item() {
    let harness = create_harness(false);
    harness
        .tracker
        .track_transaction(
            Transaction::new("12345")
                .with_affiliation("westernWear")
                .with_revenue("50.00")
                .with_shipping("32.00")
                .with_tax("12.00")
                .with_currency("EUR"),
        )
        .await
        .unwrap();
    harness
        .tracker
        .track_item(
            Item::new("12345", "sofa")
                .with_price("300")
                .with_quantity("2")
                .with_code("u3eqds43")
                .with_variation("furniture")
                .with_currency("EUR"),
        )
        .await
        .unwrap();

    let requests = harness.sender.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].form_body.ends_with(
        "&t=transaction&ti=12345&ta=westernWear&tr=50.00&ts=32.00&tt=12.00&cu=EUR"
    ));
    assert!(requests[1].form_body.ends_with(
        "&t=item&ti=12345&in=sofa&ip=300&iq=2&ic=u3eqds43&iv=furniture&cu=EUR"
    ));
}

#[tokio::test]
async fn test_social_exception_and_mobile_bodies() {
    let harness = create_harness(false);
    let tracker = &harness.tracker;

    tracker
        .track_social_interaction("like", "facebook", "/home")
        .await
        .unwrap();
    tracker
        .track_exception(Some("IOException"), Some(true))
        .await
        .unwrap();
    tracker
        .track_mobile("funTimes", "4.2.0", "Home")
        .await
        .unwrap();
    tracker
        .track_mobile_event("funTimes", "video", "play")
        .await
        .unwrap();

    let bodies: Vec<String> = harness
        .sender
        .requests()
        .into_iter()
        .map(|request| request.form_body)
        .collect();
    assert_eq!(
        bodies,
        vec![
            format!("{REQUIRED}&t=social&sa=like&sn=facebook&st=%2Fhome"),
            format!("{REQUIRED}&t=exception&exd=IOException&exf=1"),
            format!("{REQUIRED}&t=appview&an=funTimes&av=4.2.0&cd=Home"),
            format!("{REQUIRED}&t=event&an=funTimes&ec=video&ea=play"),
        ]
    );
}

#[tokio::test]
async fn test_timing_body() {
    let harness = create_harness(false);
    harness
        .tracker
        .track_timing(
            Timing::new("jsonLoader", "load", "5000")
                .with_label("jQuery")
                .with_dns("100")
                .with_page_download("20")
                .with_redirect("32")
                .with_tcp("56")
                .with_server_response("12"),
        )
        .await
        .unwrap();

    assert_eq!(
        last_body(&harness),
        format!(
            "{REQUIRED}&t=timing&utc=jsonLoader&utv=load&utt=5000&utl=jQuery&dns=100&pdt=20&rrt=32&tcp=56&srt=12"
        )
    );
}

#[tokio::test]
async fn test_values_use_plus_for_spaces() {
    let harness = create_harness(false);
    harness
        .tracker
        .track_page_view(Some("example.com"), Some("/search?q=a b"), Some("Search results"))
        .await
        .unwrap();

    assert!(last_body(&harness).ends_with("&dp=%2Fsearch%3Fq%3Da+b&dt=Search+results"));
}

#[tokio::test]
async fn test_endpoint_follows_ssl_flag() {
    let plain = create_harness(false);
    plain.tracker.track_exception(None, None).await.unwrap();
    assert_eq!(plain.sender.last_request().unwrap().url, COLLECT_URL);

    let tls = create_harness(true);
    tls.tracker.track_exception(None, None).await.unwrap();
    assert_eq!(tls.sender.last_request().unwrap().url, COLLECT_SSL_URL);
}

#[tokio::test]
async fn test_identical_calls_are_byte_identical_within_a_second() {
    let harness = create_harness(false);
    for _ in 0..2 {
        harness
            .tracker
            .track_event("video", "play", None, None)
            .await
            .unwrap();
    }

    let requests = harness.sender.requests();
    assert_eq!(requests[0], requests[1]);
}

#[tokio::test]
async fn test_clock_tick_changes_only_timestamp() {
    let harness = create_harness(false);
    harness
        .tracker
        .track_event("video", "play", None, None)
        .await
        .unwrap();
    harness.clock.advance(1);
    harness
        .tracker
        .track_event("video", "play", None, None)
        .await
        .unwrap();

    let requests = harness.sender.requests();
    let first = requests[0].params();
    let second = requests[1].params();
    assert_eq!(first.len(), second.len());
    for ((key_a, value_a), (key_b, value_b)) in first.iter().zip(second.iter()) {
        assert_eq!(key_a, key_b);
        if key_a == "z" {
            assert_eq!(value_a, "1400000000");
            assert_eq!(value_b, "1400000001");
        } else {
            assert_eq!(value_a, value_b);
        }
    }
}

#[tokio::test]
async fn test_status_codes_are_not_interpreted() {
    let harness = create_harness(false);
    harness.sender.respond_with(503);

    let status = harness
        .tracker
        .track_event("video", "play", None, None)
        .await
        .unwrap();
    assert_eq!(status, 503);
}

#[tokio::test]
async fn test_transport_failure_propagates_from_every_operation() {
    let mut harness = create_harness(false);
    harness.sender.simulate_failure("collector unreachable");

    let tracker = &harness.tracker;
    let results = vec![
        tracker.track_page_view(None, None, None).await,
        tracker.track_event("c", "a", None, None).await,
        tracker.track_transaction(Transaction::new("1")).await,
        tracker.track_item(Item::new("1", "sofa")).await,
        tracker.track_social_interaction("like", "facebook", "/").await,
        tracker.track_exception(None, None).await,
        tracker.track_timing(Timing::default()).await,
        tracker.track_mobile("app", "1.0", "Home").await,
        tracker.track_mobile_event("app", "c", "a").await,
    ];

    for result in results {
        assert!(matches!(result, Err(TransportError::ConnectionFailed { .. })));
    }
    assert_eq!(harness.sender.request_count(), 9);
    assert!(harness.sender.requests().is_empty());
    assert_eq!(harness.tracker.tracking_id(), "UA-XXXX-Y");
    assert_eq!(harness.tracker.client_id(), "555");

    harness.sender.reset_to_normal();
    harness.tracker.set_use_ssl(true);
    assert_eq!(
        harness
            .tracker
            .track_event("c", "a", None, None)
            .await
            .unwrap(),
        200
    );
}

#[test]
fn test_construction_without_client_id_fails() {
    let mut settings = TrackerSettings::new("UA-XXXX-Y", "555", "example.com", false);
    settings.client_id = None;

    let result = Tracker::new(settings, SimulatedHitSender::new());
    assert!(matches!(
        result,
        Err(ConfigurationError::MissingField { field: "clientId" })
    ));
}

proptest! {
    #[test]
    fn prop_required_params_present_for_arbitrary_events(
        category in "[a-zA-Z0-9 /&=+%-]{0,24}",
        action in "[a-zA-Z0-9 /&=+%-]{0,24}",
        advance in 0i64..10_000,
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let harness = create_harness(false);
        harness.clock.advance(advance);

        runtime
            .block_on(harness.tracker.track_event(&category, &action, None, None))
            .unwrap();

        let request = harness.sender.last_request().unwrap();
        let v = request.param("v");
        let tid = request.param("tid");
        let cid = request.param("cid");
        prop_assert_eq!(v.as_deref(), Some("1"));
        prop_assert_eq!(tid.as_deref(), Some("UA-XXXX-Y"));
        prop_assert_eq!(cid.as_deref(), Some("555"));
        let expected_z = (FIXED_TIME + advance).to_string();
        prop_assert_eq!(request.param("z"), Some(expected_z));
        prop_assert_eq!(request.param("ec"), Some(category));
        prop_assert_eq!(request.param("ea"), Some(action));
    }
}
