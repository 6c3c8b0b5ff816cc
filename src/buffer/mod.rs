//! Storage for events that failed immediate delivery.

pub mod memory;

pub use memory::MemoryBuffer;

use crate::domain::Event;

/// Store of not-yet-delivered events, owned by the buffered connection layer.
///
/// Implementations must be safe under concurrent use: the send path and the
/// background flusher mutate the buffer at the same time. De-duplication by
/// event id is the buffer's responsibility; the same event may be added more
/// than once when a send races a flush cycle.
pub trait Buffer: Send + Sync {
    /// Record a failed event for later redelivery.
    fn add(&self, event: Event);

    /// Remove a delivered event. Unknown events are ignored.
    fn discard(&self, event: &Event);

    /// Point-in-time snapshot of the buffered events, oldest first.
    fn events(&self) -> Vec<Event>;

    /// Number of events currently buffered.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
