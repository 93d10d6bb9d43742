//! Concurrent access tests for `scriptkeeper_registry`.
//!
//! The registry is logically single-threaded, but it is `Send + Sync` and must
//! stay consistent when driven from several threads.


use scriptkeeper_registry::LoadStatus;
use std::sync::{Arc, Barrier};
use std::thread;
use test_utils::{SCRIPT, StatusLog, create_registry, key};

#[test]
fn racing_subscribers_trigger_one_fetch() {
    let (registry, fetcher) = create_registry();
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = registry.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registry.subscribe(key(SCRIPT), |_: &LoadStatus| {}).id
            })
        })
        .collect();

    let ids: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("Thread panicked"))
        .collect();

    assert_eq!(fetcher.fetch_count(SCRIPT), 1);
    assert_eq!(registry.subscriber_count(SCRIPT), ids.len());
}

#[test]
fn completion_from_another_thread_reaches_subscribers() {
    let (registry, fetcher) = create_registry();
    let logs: Vec<StatusLog> = (0..4).map(|_| StatusLog::new()).collect();
    for log in &logs {
        registry.subscribe(key(SCRIPT), log.callback());
    }

    let completer = fetcher.clone();
    thread::spawn(move || completer.succeed(SCRIPT))
        .join()
        .expect("Thread panicked");

    for log in &logs {
        assert_eq!(log.statuses(), vec![LoadStatus::Pending, LoadStatus::Loaded]);
    }
}

#[test]
fn churn_leaves_no_records_behind() {
    let (registry, fetcher) = create_registry();
    let anchor = registry.subscribe(key(SCRIPT), |_: &LoadStatus| {});
    fetcher.succeed(SCRIPT);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let registry = registry.clone();
            thread::spawn(move || {
                for _ in 0..100 {
                    let subscriber = registry.subscribe(key(SCRIPT), |_: &LoadStatus| {});
                    assert_eq!(subscriber.status, LoadStatus::Loaded);
                    assert!(registry.unsubscribe(&key(SCRIPT), subscriber.id));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    assert_eq!(registry.subscriber_count(SCRIPT), 1);
    assert_eq!(fetcher.detach_count(SCRIPT), 0);

    registry.unsubscribe(&key(SCRIPT), anchor.id);
    assert_eq!(registry.record_count(), 0);
    assert_eq!(fetcher.fetch_count(SCRIPT), 1);
}
