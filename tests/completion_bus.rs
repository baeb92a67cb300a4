// tests/completion_bus.rs

use std::error::Error;
use std::time::Duration;

use tokio::sync::mpsc;

use stageline::bus::CompletionBus;
use stageline::types::WorkToken;
use stageline_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn publish_overwrites_the_latest_value() -> TestResult {
    init_tracing();

    let bus = CompletionBus::new();
    assert_eq!(bus.latest(), None);

    assert_eq!(bus.publish(WorkToken::from("002")), None);
    assert_eq!(
        bus.publish(WorkToken::from("003")),
        Some(WorkToken::from("002"))
    );
    assert_eq!(bus.latest(), Some(WorkToken::from("003")));

    // Clones share the slot.
    let other = bus.clone();
    other.publish(WorkToken::from("001"));
    assert_eq!(bus.latest(), Some(WorkToken::from("001")));
    Ok(())
}

#[tokio::test]
async fn wait_for_resolves_on_a_later_write() -> TestResult {
    init_tracing();

    let bus = CompletionBus::new();
    let writer = bus.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        writer.publish(WorkToken::from("002"));
        writer.publish(WorkToken::from("003"));
    });

    with_timeout(bus.wait_for(&WorkToken::from("003"))).await?;

    // Already-present values resolve immediately.
    with_timeout(bus.wait_for(&WorkToken::from("003"))).await?;
    Ok(())
}

#[tokio::test]
async fn observe_replays_then_follows() -> TestResult {
    init_tracing();

    let bus = CompletionBus::new();
    bus.publish(WorkToken::from("002"));

    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let observer = bus.observe(move |token| {
        let _ = seen_tx.send(token.clone());
    });

    assert_eq!(with_timeout(seen_rx.recv()).await, Some(WorkToken::from("002")));

    bus.publish(WorkToken::from("003"));
    assert_eq!(with_timeout(seen_rx.recv()).await, Some(WorkToken::from("003")));

    // The observer ends once the last bus handle is gone.
    drop(bus);
    with_timeout(observer).await?;
    assert_eq!(seen_rx.recv().await, None);
    Ok(())
}
