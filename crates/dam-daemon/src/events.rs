//! Event emission.
//!
//! Engine events are drained after every operation, wrapped in timestamped
//! envelopes and broadcast to subscribers. Each subscriber has an independent
//! buffer; slow subscribers lag rather than block the scheduler.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

use dam_types::events::{DamEvent, Event};
use dam_types::Timestamp;

/// Event bus for broadcasting events to subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
    sequence: Arc<AtomicU64>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Emit an event to all subscribers.
    pub fn emit(&self, event: Event) {
        self.sequence.fetch_add(1, Ordering::SeqCst);
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(event);
    }

    /// Wrap and emit a batch of engine events in order.
    pub fn publish(&self, events: Vec<DamEvent>, timestamp: Timestamp) {
        for event in events {
            tracing::trace!(event_type = ?event.event_type(), "publishing event");
            self.emit(event.into_envelope(timestamp));
        }
    }

    /// Subscribe to events. Returns a receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Get the current sequence number.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}
