//! At-most-once processing within a bounded window.
//!
//! Both ingestion gates receive at-least-once deliveries and must suppress redeliveries of the same event id.
//! The guard records ids it has seen; the check and the record are a single atomic operation so that two
//! concurrent deliveries of the identical event cannot both pass.

use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};

use log::*;

/// The record of previously seen event/update identifiers.
///
/// Implementations must make [`first_sighting`](ProcessedEventStore::first_sighting) atomic (check-and-insert,
/// not check then insert). The bundled [`InMemoryEventStore`] is process-local; a shared external store can be
/// substituted behind this trait without touching gate logic.
pub trait ProcessedEventStore: Send + Sync {
    /// Record `id`, returning `true` when this is the first sighting within the retention window.
    fn first_sighting(&self, id: &str) -> bool;

    /// Drop entries older than the retention window. Safe to run concurrently with sightings.
    fn sweep(&self);
}

/// Single-instance, in-memory guard: a map of event id to insertion time behind a mutex.
pub struct InMemoryEventStore {
    retention: Duration,
    seen: Mutex<HashMap<String, Instant>>,
}

impl InMemoryEventStore {
    pub fn new(retention: Duration) -> Self {
        Self { retention, seen: Mutex::new(HashMap::new()) }
    }

    pub fn len(&self) -> usize {
        self.seen.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ProcessedEventStore for InMemoryEventStore {
    fn first_sighting(&self, id: &str) -> bool {
        let mut seen = match self.seen.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match seen.get(id) {
            Some(at) if at.elapsed() < self.retention => false,
            _ => {
                // Either never seen, or seen outside the retention window. Record it (again) and let it through.
                seen.insert(id.to_string(), Instant::now());
                true
            },
        }
    }

    fn sweep(&self) {
        let mut seen = match self.seen.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let before = seen.len();
        let retention = self.retention;
        seen.retain(|_, at| at.elapsed() < retention);
        let dropped = before - seen.len();
        if dropped > 0 {
            debug!("🧹️ Swept {dropped} expired event ids from the idempotency guard");
        }
    }
}
