//! Broadcast channel that fans service events out to subscribers.

use promptvault_protocol::{EventMsg, EventSink};
use tokio::sync::broadcast;

/// Default number of buffered events per subscriber.
pub const DEFAULT_EVENT_BUFFER: usize = 256;

/// Event sink backed by a `tokio` broadcast channel.
///
/// Events emitted with no live subscriber are dropped.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventMsg>,
}

impl EventBus {
    pub fn new(buffer: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer.max(1));
        Self { sender }
    }

    /// Receive every event emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<EventMsg> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER)
    }
}

impl EventSink for EventBus {
    fn emit(&self, event: EventMsg) {
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use promptvault_protocol::EventPayload;
    use uuid::Uuid;

    #[tokio::test]
    async fn subscribers_receive_events() {
        let bus = EventBus::default();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();
        let payload = EventPayload::TemplateDeleted {
            template_id: Uuid::new_v4(),
        };
        bus.emit(EventMsg::new(payload.clone()));

        assert_eq!(first.recv().await.expect("first").payload, payload);
        assert_eq!(second.recv().await.expect("second").payload, payload);
    }

    #[test]
    fn emitting_without_subscribers_is_harmless() {
        let bus = EventBus::new(0);
        bus.emit(EventMsg::new(EventPayload::ExecutionsDeleted {
            execution_ids: Vec::new(),
        }));
    }
}
