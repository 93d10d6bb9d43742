//! Subscription handle tests: key switching, teardown and observable state.


use core::time::Duration;
use scriptkeeper_registry::ScriptState;
use test_utils::{BAD_SCRIPT, EventLog, OTHER_SCRIPT, SCRIPT, create_registry, key};

#[test]
fn switching_keys_mid_load_moves_exactly_one_subscription() {
    let (registry, fetcher) = create_registry();
    let bystander = registry.use_script(Some(SCRIPT));
    let mut script = registry.use_script(Some(SCRIPT));
    assert_eq!(registry.subscriber_count(SCRIPT), 2);

    script.set_key(Some(OTHER_SCRIPT));

    assert_eq!(registry.subscriber_count(SCRIPT), 1);
    assert_eq!(registry.subscriber_count(OTHER_SCRIPT), 1);
    assert_eq!(fetcher.fetch_count(SCRIPT), 1);
    assert_eq!(fetcher.fetch_count(OTHER_SCRIPT), 1);
    assert_eq!(script.key(), Some(&key(OTHER_SCRIPT)));
    drop(bystander);
}

#[test]
fn switching_keys_unsubscribes_before_subscribing() {
    let (registry, _fetcher) = create_registry();
    let events = EventLog::attach(&registry);
    let mut script = registry.use_script(Some(SCRIPT));

    script.set_key(Some(OTHER_SCRIPT));

    assert_eq!(
        events.names(),
        vec![
            "SubscriberAdded",
            "FetchStarted",
            "SubscriberRemoved",
            "SubscriberAdded",
            "FetchStarted",
        ]
    );
}

#[test]
fn switching_away_from_settled_key_tears_it_down() {
    let (registry, fetcher) = create_registry();
    let mut script = registry.use_script(Some(SCRIPT));
    fetcher.succeed(SCRIPT);

    script.set_key(Some(OTHER_SCRIPT));

    assert!(!registry.contains(SCRIPT));
    assert_eq!(fetcher.detach_count(SCRIPT), 1);
    assert!(script.state().loading);
}

#[test]
fn switching_to_a_loaded_key_reports_loaded_at_once() {
    let (registry, fetcher) = create_registry();
    let _holder = registry.use_script(Some(OTHER_SCRIPT));
    fetcher.succeed(OTHER_SCRIPT);

    let mut script = registry.use_script(Some(SCRIPT));
    script.set_key(Some(OTHER_SCRIPT));

    assert!(script.state().loaded);
}

#[test]
fn drop_unsubscribes() {
    let (registry, _fetcher) = create_registry();
    let script = registry.use_script(Some(SCRIPT));
    assert_eq!(registry.subscriber_count(SCRIPT), 1);

    drop(script);

    assert_eq!(registry.subscriber_count(SCRIPT), 0);
}

#[test]
fn idle_handle_never_touches_registry() {
    let (registry, fetcher) = create_registry();
    let events = EventLog::attach(&registry);

    let mut script = registry.use_script(None);
    script.set_key(Some(""));
    drop(script);

    assert!(events.names().is_empty());
    assert_eq!(fetcher.total_fetches(), 0);
}

#[tokio::test]
async fn watch_receiver_sees_load_completion() {
    let (registry, fetcher) = create_registry();
    let script = registry.use_script(Some(SCRIPT));
    let mut changes = script.watch();
    assert!(changes.borrow_and_update().loading);

    let completer = fetcher.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        completer.succeed(SCRIPT);
    });

    changes.changed().await.expect("sender lives in the subscription");
    assert!(changes.borrow().loaded);
}

#[tokio::test]
async fn settled_waits_for_failure() {
    let (registry, fetcher) = create_registry();
    let script = registry.use_script(Some(BAD_SCRIPT));

    let completer = fetcher.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        completer.fail(BAD_SCRIPT, "Error loading script: https://x/bad.js");
    });

    let state = script.settled().await;
    assert_eq!(state.error(), Some("Error loading script: https://x/bad.js"));
    assert!(!state.loading);
}

#[tokio::test]
async fn settled_returns_immediately_when_idle() {
    let (registry, _fetcher) = create_registry();
    let script = registry.use_script(None);

    assert_eq!(script.settled().await, ScriptState::idle());
}
