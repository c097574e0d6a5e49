use std::sync::{Arc, Mutex};

use freezewatch::error::ListenerError;
use freezewatch::kernel::listener::ListenerRegistry;

type Log = Arc<Mutex<Vec<String>>>;

fn recorder(log: &Log, name: &'static str) -> impl FnMut(&u32) -> Result<(), ListenerError> + Send + 'static {
    let log = log.clone();
    move |value: &u32| {
        log.lock().unwrap().push(format!("{}:{}", name, value));
        Ok(())
    }
}

fn failing(log: &Log, name: &'static str) -> impl FnMut(&u32) -> Result<(), ListenerError> + Send + 'static {
    let log = log.clone();
    move |value: &u32| {
        log.lock().unwrap().push(format!("{}:{}", name, value));
        Err(ListenerError::new(name))
    }
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

#[test]
fn test_persistent_listeners_fire_in_order() {
    let log = Log::default();
    let mut registry = ListenerRegistry::<u32>::new("test");

    registry.on(recorder(&log, "a"));
    registry.on(recorder(&log, "b"));

    registry.emit(&1).expect("No listener fails");
    registry.emit(&2).expect("No listener fails");

    assert_eq!(entries(&log), vec!["a:1", "b:1", "a:2", "b:2"]);
    assert_eq!(registry.len(), 2);
}

#[test]
fn test_once_listener_fires_once() {
    let log = Log::default();
    let mut registry = ListenerRegistry::<u32>::new("test");

    let id = registry.once(recorder(&log, "once"));
    assert!(registry.contains(id));

    registry.emit(&1).expect("No listener fails");
    registry.emit(&2).expect("No listener fails");

    assert_eq!(entries(&log), vec!["once:1"]);
    assert!(!registry.contains(id));
    assert!(registry.is_empty());
}

#[test]
fn test_off_unregisters() {
    let log = Log::default();
    let mut registry = ListenerRegistry::<u32>::new("test");

    let a = registry.on(recorder(&log, "a"));
    registry.on(recorder(&log, "b"));

    assert!(registry.off(a));
    assert!(!registry.off(a), "Second removal is a no-op");

    registry.emit(&7).expect("No listener fails");
    assert_eq!(entries(&log), vec!["b:7"]);

    registry.clear();
    assert!(registry.is_empty());
}

#[test]
fn test_emit_stops_at_first_error() {
    let log = Log::default();
    let mut registry = ListenerRegistry::<u32>::new("test");

    registry.on(recorder(&log, "a"));
    registry.on(failing(&log, "bad"));
    let late_once = registry.once(recorder(&log, "late"));

    let err = registry.emit(&3).expect_err("Failure must propagate");

    assert_eq!(err, ListenerError::new("bad"));
    assert_eq!(entries(&log), vec!["a:3", "bad:3"]);
    assert!(registry.contains(late_once), "Unreached one-shot stays registered");
    assert_eq!(registry.len(), 3);
}

#[test]
fn test_safe_emit_isolates_failures() {
    let log = Log::default();
    let mut registry = ListenerRegistry::<u32>::new("test");

    registry.on(failing(&log, "bad"));
    let once_bad = registry.once(failing(&log, "bad-once"));
    registry.on(recorder(&log, "good"));

    let failures = registry.safe_emit(&5);

    assert_eq!(failures, 2);
    assert_eq!(entries(&log), vec!["bad:5", "bad-once:5", "good:5"]);
    assert!(!registry.contains(once_bad), "One-shot is removed even when it fails");
    assert_eq!(registry.len(), 2);
}
