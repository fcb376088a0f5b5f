//! Integration tests for HTTP check-in dispatch.
//!
//! Links are extracted for the mock server's origin and dispatched with the
//! real [`HttpDispatcher`].

use std::sync::Arc;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kraken::domain::{CheckInLink, DispatchOutcome, ScanStrategy, ScannableText};
use kraken::providers::checkin::{CheckInDispatcher, HttpDispatcher};
use kraken::providers::mailbox::{MemoryMailbox, StoredMessage};
use kraken::services::{CycleSettings, LinkExtractor, PollService};

const HASH: &str = "QWERTYUIOPasdfghjklZXCVBNM1234567890qwertyuiopASDFGHJKLzxcvbnm12";
const CHECKIN_PATH: &str = "/external/api/reservation/CheckIn";

fn link_for(server: &MockServer, id: &str) -> (LinkExtractor, CheckInLink) {
    let extractor = LinkExtractor::for_origin(&server.uri()).unwrap();
    let text = format!("{}{}?id={}&hash={}", server.uri(), CHECKIN_PATH, id, HASH);
    let link = extractor.extract(&ScannableText::from(text)).unwrap();
    (extractor, link)
}

// ============================================================================
// Single Dispatch
// ============================================================================

#[tokio::test]
async fn success_status_is_succeeded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CHECKIN_PATH))
        .and(query_param("id", "123456"))
        .and(query_param("hash", HASH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>Checked in</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let (_, link) = link_for(&server, "123456");
    let outcome = HttpDispatcher::new().dispatch(&link).await;

    assert_eq!(outcome, DispatchOutcome::Succeeded);
}

#[tokio::test]
async fn server_error_is_failed_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CHECKIN_PATH))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let (_, link) = link_for(&server, "654321");
    let outcome = HttpDispatcher::new().dispatch(&link).await;

    assert_eq!(
        outcome,
        DispatchOutcome::Failed("unexpected status 500".to_string())
    );
}

#[tokio::test]
async fn not_found_is_failed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let (_, link) = link_for(&server, "000001");
    let outcome = HttpDispatcher::new().dispatch(&link).await;

    assert!(!outcome.is_success());
}

#[tokio::test]
async fn custom_client_is_used() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = reqwest::Client::builder()
        .user_agent("kraken-test")
        .build()
        .unwrap();
    let (_, link) = link_for(&server, "000002");
    let outcome = HttpDispatcher::new().with_client(client).dispatch(&link).await;

    assert!(outcome.is_success());
}

// ============================================================================
// Full Cycle
// ============================================================================

#[tokio::test]
async fn cycle_dispatches_each_link_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CHECKIN_PATH))
        .and(query_param("id", "200001"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(CHECKIN_PATH))
        .and(query_param("id", "200002"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let subject = |id: &str| StoredMessage {
        subject: Some(format!(
            "Check in: {}{}?id={}&hash={}",
            server.uri(),
            CHECKIN_PATH,
            id,
            HASH
        )),
        body: None,
    };
    let mailbox =
        MemoryMailbox::new("INBOX").with_messages(vec![subject("200001"), subject("200002")]);

    let (extractor, _) = link_for(&server, "200001");
    let service = PollService::new(
        Arc::new(mailbox.clone()),
        Arc::new(HttpDispatcher::new()),
        CycleSettings {
            strategy: ScanStrategy::Subject,
            ..Default::default()
        },
    )
    .with_extractor(extractor);

    let summary = service.run_cycle().await;

    assert!(summary.is_success());
    assert_eq!(summary.links_found(), 2);
    assert_eq!(summary.dispatch_failures(), 1);
    assert_eq!(summary.purged, Some(2));
}
