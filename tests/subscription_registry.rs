//! Unit tests for the subscription registry.

use chat_stomp::subscription::{MessageHandler, SubscriptionRegistry};
use std::sync::{Arc, Mutex};

fn collecting() -> (Arc<Mutex<Vec<String>>>, MessageHandler) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let handler: MessageHandler = Arc::new(move |body: &str| sink.lock().unwrap().push(body.to_string()));
    (seen, handler)
}

#[test]
fn ids_are_sequential() {
    let mut registry = SubscriptionRegistry::new();
    let (_, h1) = collecting();
    let (_, h2) = collecting();
    assert_eq!(registry.add("/topic/a", h1), "sub-1");
    assert_eq!(registry.add("/topic/b", h2), "sub-2");
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.destination("sub-2"), Some("/topic/b"));
}

#[test]
fn dispatch_reaches_only_the_named_handler() {
    let mut registry = SubscriptionRegistry::new();
    let (first, h1) = collecting();
    let (second, h2) = collecting();
    registry.add("/topic/same", h1);
    registry.add("/topic/same", h2);

    assert!(registry.dispatch("sub-2", "payload"));
    assert!(first.lock().unwrap().is_empty());
    assert_eq!(*second.lock().unwrap(), vec!["payload".to_string()]);
}

#[test]
fn dispatch_unknown_id_is_dropped() {
    let registry = SubscriptionRegistry::new();
    assert!(!registry.dispatch("sub-1", "payload"));
}

#[test]
fn remove_forgets_subscription() {
    let mut registry = SubscriptionRegistry::new();
    let (seen, handler) = collecting();
    let id = registry.add("/topic/a", handler);
    assert!(registry.remove(&id));
    assert!(!registry.remove(&id));
    assert!(!registry.dispatch(&id, "late"));
    assert!(seen.lock().unwrap().is_empty());
    assert!(registry.is_empty());
}

#[test]
fn clear_restarts_numbering() {
    let mut registry = SubscriptionRegistry::new();
    let (_, h1) = collecting();
    let (_, h2) = collecting();
    registry.add("/topic/a", h1);
    registry.clear();
    assert!(registry.is_empty());
    assert_eq!(registry.add("/topic/b", h2), "sub-1");
}

#[test]
fn entries_sorted_by_number() {
    let mut registry = SubscriptionRegistry::new();
    for i in 0..12 {
        let (_, handler) = collecting();
        registry.add(format!("/topic/{}", i), handler);
    }
    let ids: Vec<String> = registry.entries().into_iter().map(|(id, _)| id).collect();
    assert_eq!(ids[1], "sub-2");
    assert_eq!(ids[9], "sub-10");
    assert_eq!(ids.len(), 12);
}

#[test]
fn panicking_handler_does_not_poison_dispatch() {
    let mut registry = SubscriptionRegistry::new();
    let boom: MessageHandler = Arc::new(|_: &str| panic!("handler failure"));
    let (seen, ok) = collecting();
    registry.add("/topic/a", boom);
    registry.add("/topic/a", ok);

    assert!(registry.dispatch("sub-1", "x"));
    assert!(registry.dispatch("sub-2", "y"));
    assert_eq!(*seen.lock().unwrap(), vec!["y".to_string()]);
}
