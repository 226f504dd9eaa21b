use parking_lot::Mutex;
use promptvault_protocol::{EventMsg, EventPayload, EventSink};
use std::sync::Arc;

/// Event sink that keeps every emitted event in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<EventMsg>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Payloads emitted so far, in order.
    pub fn payloads(&self) -> Vec<EventPayload> {
        self.events
            .lock()
            .iter()
            .map(|event| event.payload.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: EventMsg) {
        self.events.lock().push(event);
    }
}
