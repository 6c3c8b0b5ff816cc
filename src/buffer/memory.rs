use super::Buffer;
use crate::domain::Event;
use parking_lot::Mutex;
use tracing::{debug, warn};

/// Bounded in-memory [`Buffer`].
///
/// Keeps insertion order for flushing, de-duplicates by event id, and rejects
/// new events once full rather than evicting older ones. Durability across
/// restarts is explicitly not provided; persistent backends implement the
/// same trait.
pub struct MemoryBuffer {
    events: Mutex<Vec<Event>>,
    capacity: usize,
}

impl MemoryBuffer {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Buffer for MemoryBuffer {
    fn add(&self, event: Event) {
        let mut events = self.events.lock();
        if events.iter().any(|buffered| buffered.id() == event.id()) {
            debug!(event_id = %event.id(), "event already buffered");
            return;
        }
        if events.len() >= self.capacity {
            warn!(
                event_id = %event.id(),
                capacity = self.capacity,
                "event buffer full, dropping event"
            );
            return;
        }
        events.push(event);
    }

    fn discard(&self, event: &Event) {
        self.events
            .lock()
            .retain(|buffered| buffered.id() != event.id());
    }

    fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    fn len(&self) -> usize {
        self.events.lock().len()
    }
}
