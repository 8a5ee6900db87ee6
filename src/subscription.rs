use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Callback invoked with the body of every MESSAGE delivered to a
/// subscription.
pub type MessageHandler = Arc<dyn Fn(&str) + Send + Sync>;

struct Entry {
    destination: String,
    handler: MessageHandler,
}

/// Maps local subscription ids (`sub-1`, `sub-2`, ...) to their destination
/// and handler.
///
/// Ids are allocated from a counter that restarts whenever the registry is
/// cleared, which happens every time a transport session ends. The registry
/// does no I/O; the connection driver sends the SUBSCRIBE/UNSUBSCRIBE
/// frames.
#[derive(Default)]
pub struct SubscriptionRegistry {
    entries: HashMap<String, Entry>,
    next_id: u64,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `destination` and return its new id.
    pub fn add(&mut self, destination: impl Into<String>, handler: MessageHandler) -> String {
        self.next_id += 1;
        let id = format!("sub-{}", self.next_id);
        self.entries.insert(
            id.clone(),
            Entry {
                destination: destination.into(),
                handler,
            },
        );
        id
    }

    /// Remove a subscription. Returns false if the id was unknown.
    pub fn remove(&mut self, id: &str) -> bool {
        self.entries.remove(id).is_some()
    }

    /// Drop every subscription and restart id allocation.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_id = 0;
    }

    /// Deliver `body` to the handler registered under `id`.
    ///
    /// Returns false when no subscription has that id; the message is
    /// dropped. A panicking handler is logged and does not take the
    /// caller down with it.
    pub fn dispatch(&self, id: &str, body: &str) -> bool {
        match self.entries.get(id) {
            Some(entry) => {
                let handler = &entry.handler;
                if panic::catch_unwind(AssertUnwindSafe(|| handler(body))).is_err() {
                    tracing::error!(subscription = id, "subscription handler panicked");
                }
                true
            }
            None => false,
        }
    }

    pub fn destination(&self, id: &str) -> Option<&str> {
        self.entries.get(id).map(|e| e.destination.as_str())
    }

    /// `(id, destination)` pairs ordered by id number.
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut list: Vec<(String, String)> = self
            .entries
            .iter()
            .map(|(id, e)| (id.clone(), e.destination.clone()))
            .collect();
        list.sort_by_key(|(id, _)| sequence_of(id));
        list
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("entries", &self.entries())
            .field("next_id", &self.next_id)
            .finish()
    }
}

fn sequence_of(id: &str) -> u64 {
    id.strip_prefix("sub-")
        .and_then(|n| n.parse().ok())
        .unwrap_or(u64::MAX)
}
