//! End-to-end exercise of the Upstream Session Manager's state machine
//! against a deterministic stub, independent of the Supervisor loop.

use shioaji_kafka_bridge::config::UpstreamCredentials;
use shioaji_kafka_bridge::error::BridgeError;
use shioaji_kafka_bridge::upstream::mock::MockQuoteSource;
use shioaji_kafka_bridge::upstream::SessionManager;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

fn creds() -> UpstreamCredentials {
    UpstreamCredentials {
        api_key: "key".into(),
        secret_key: "secret".into(),
    }
}

#[tokio::test]
async fn full_subscribe_then_unsubscribe_cycle() {
    let source = Arc::new(MockQuoteSource::always_ok());
    let tick_count = Arc::new(AtomicU32::new(0));
    let subscribed_count = Arc::new(AtomicU32::new(0));

    let tick_count_clone = tick_count.clone();
    let subscribed_count_clone = subscribed_count.clone();

    let sm = Arc::new(SessionManager::new(
        source,
        creds(),
        "TXFF6".into(),
        Arc::new(move |_tick| {
            tick_count_clone.fetch_add(1, Ordering::SeqCst);
        }),
        Arc::new(move || {
            subscribed_count_clone.fetch_add(1, Ordering::SeqCst);
        }),
    ));

    sm.connect_and_subscribe().await.unwrap();
    assert!(!sm.is_subscribed(), "not subscribed until the confirmation event arrives");

    sm.handle_event(16, "").await;
    assert!(sm.is_subscribed());
    assert_eq!(subscribed_count.load(Ordering::SeqCst), 1);

    sm.unsubscribe().await.unwrap();
    assert!(!sm.is_subscribed());
}

#[tokio::test]
async fn reconnect_recovers_from_a_failed_subscription() {
    let source = Arc::new(MockQuoteSource::failing_login());
    let sm = Arc::new(SessionManager::new(
        source,
        creds(),
        "TXFF6".into(),
        Arc::new(|_t| {}),
        Arc::new(|| {}),
    ));

    let err = sm.connect_and_subscribe().await.unwrap_err();
    assert!(matches!(err, BridgeError::LoginOrFetchError(_)));

    // reconnect() swallows LoginOrFetchError and releases the guard so the
    // supervisor can retry on its next iteration.
    sm.reconnect("Tick Timeout").await;
    assert!(!sm.is_subscribed());
    sm.reconnect("Tick Timeout").await; // guard must not be stuck held
}
