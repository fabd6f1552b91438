use httpmock::prelude::*;
use rtl_to_chords::domain::ports::Submitter;
use rtl_to_chords::{ChordsSender, SenderSettings};
use std::time::Duration;
use url::Url;

fn fast_settings() -> SenderSettings {
    SenderSettings {
        max_queue_length: 100,
        request_timeout: Duration::from_secs(2),
        retry_delay: Duration::from_millis(20),
        drain_poll: Duration::from_millis(10),
    }
}

fn measurement_uri(server: &MockServer, value: &str) -> Url {
    Url::parse(&format!(
        "{}/measurements/url_create?instrument_id=7&t={}&at=2023-11-14T22:13:20Z&email=pi%40example.org&api_key=k",
        server.base_url(),
        value
    ))
    .unwrap()
}

#[tokio::test]
async fn test_sender_delivers_in_order() {
    let server = MockServer::start_async().await;
    let first = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/measurements/url_create")
                .query_param("instrument_id", "7")
                .query_param("t", "1.5")
                .query_param("email", "pi@example.org");
            then.status(200);
        })
        .await;
    let second = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/measurements/url_create")
                .query_param("t", "2.5");
            then.status(200);
        })
        .await;

    let sender = ChordsSender::start(fast_settings()).unwrap();
    sender.submit(measurement_uri(&server, "1.5"));
    sender.submit(measurement_uri(&server, "2.5"));

    tokio::time::timeout(Duration::from_secs(5), sender.drain())
        .await
        .expect("queue should drain");

    first.assert_async().await;
    second.assert_async().await;
    assert_eq!(sender.waiting(), 0);
    assert_eq!(sender.stats().sent, 2);
}

#[tokio::test]
async fn test_sender_retries_server_errors() {
    let server = MockServer::start_async().await;
    let mut failing = server
        .mock_async(|when, then| {
            when.method(GET).path("/measurements/url_create");
            then.status(503);
        })
        .await;

    let sender = ChordsSender::start(fast_settings()).unwrap();
    sender.submit(measurement_uri(&server, "3.0"));

    let mut attempts = 0;
    for _ in 0..200 {
        attempts = failing.hits_async().await;
        if attempts >= 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(attempts >= 2, "expected retries, saw {} attempts", attempts);
    assert_eq!(sender.waiting(), 1);

    failing.delete_async().await;
    let healthy = server
        .mock_async(|when, then| {
            when.method(GET).path("/measurements/url_create");
            then.status(200);
        })
        .await;

    tokio::time::timeout(Duration::from_secs(5), sender.drain())
        .await
        .expect("queue should drain once the server recovers");

    healthy.assert_async().await;
    let stats = sender.stats();
    assert_eq!(stats.sent, 1);
    assert!(stats.retried >= 2);
}

#[tokio::test]
async fn test_sender_drops_client_errors() {
    let server = MockServer::start_async().await;
    let rejected = server
        .mock_async(|when, then| {
            when.method(GET).path("/measurements/url_create");
            then.status(401);
        })
        .await;

    let sender = ChordsSender::start(fast_settings()).unwrap();
    sender.submit(measurement_uri(&server, "4.0"));

    tokio::time::timeout(Duration::from_secs(5), sender.drain())
        .await
        .expect("rejected values should not block the queue");

    rejected.assert_hits_async(1).await;
    assert_eq!(sender.stats().rejected, 1);
    assert_eq!(sender.stats().sent, 0);
}

#[tokio::test]
async fn test_drain_with_timeout_gives_up_on_stuck_queue() {
    let server = MockServer::start_async().await;
    let failing = server
        .mock_async(|when, then| {
            when.method(GET).path("/measurements/url_create");
            then.status(503);
        })
        .await;

    let sender = ChordsSender::start(fast_settings()).unwrap();
    sender.submit(measurement_uri(&server, "5.0"));

    let started = std::time::Instant::now();
    let drained = sender.drain_with_timeout(Duration::from_millis(300)).await;

    assert!(!drained);
    assert!(started.elapsed() >= Duration::from_millis(300));
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(sender.waiting(), 1);
    assert!(failing.hits_async().await >= 1);
}

#[tokio::test]
async fn test_drain_with_timeout_reports_empty_queue() {
    let server = MockServer::start_async().await;
    let healthy = server
        .mock_async(|when, then| {
            when.method(GET).path("/measurements/url_create");
            then.status(200);
        })
        .await;

    let sender = ChordsSender::start(fast_settings()).unwrap();
    sender.submit(measurement_uri(&server, "6.0"));

    assert!(sender.drain_with_timeout(Duration::from_secs(5)).await);
    assert_eq!(sender.waiting(), 0);
    healthy.assert_async().await;
}
