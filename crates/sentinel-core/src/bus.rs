use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::broadcast;

use crate::events::ConsoleEvent;

pub const DEFAULT_BUS_BUFFER_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleEventEnvelope {
    pub sequence: u64,
    pub event: ConsoleEvent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleEventBusConfig {
    pub buffer_capacity: usize,
}

impl Default for ConsoleEventBusConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUS_BUFFER_CAPACITY,
        }
    }
}

/// Best-effort fan-out of console events. Publishing never blocks and never
/// fails; subscribers that fall behind lose the oldest events.
#[derive(Debug)]
pub struct ConsoleEventBus {
    next_sequence: AtomicU64,
    sender: broadcast::Sender<ConsoleEventEnvelope>,
}

impl Default for ConsoleEventBus {
    fn default() -> Self {
        Self::new(ConsoleEventBusConfig::default())
    }
}

impl ConsoleEventBus {
    pub fn new(config: ConsoleEventBusConfig) -> Self {
        // broadcast::channel panics on a zero capacity; clamp instead so no
        // configuration value can take the session down.
        let (sender, _receiver) = broadcast::channel(config.buffer_capacity.max(1));
        Self {
            next_sequence: AtomicU64::new(0),
            sender,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConsoleEventEnvelope> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: ConsoleEvent) -> ConsoleEventEnvelope {
        let envelope = ConsoleEventEnvelope {
            sequence: self.next_sequence.fetch_add(1, Ordering::Relaxed),
            event,
        };
        // A send error only means there are no subscribers right now.
        let _ = self.sender.send(envelope.clone());
        envelope
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{AlertsIngestedPayload, ConsoleEvent};

    #[tokio::test]
    async fn publish_assigns_monotonic_sequence_and_fans_out() {
        let bus = ConsoleEventBus::default();
        let mut receiver = bus.subscribe();

        let first = bus.publish(ConsoleEvent::AlertsIngested(AlertsIngestedPayload {
            epoch: 1,
            visible_count: 3,
            deferred_count: 0,
        }));
        let second = bus.publish(ConsoleEvent::AlertsIngested(AlertsIngestedPayload {
            epoch: 2,
            visible_count: 5,
            deferred_count: 2,
        }));
        assert_eq!(first.sequence, 0);
        assert_eq!(second.sequence, 1);

        let received = receiver.recv().await.expect("first envelope");
        assert_eq!(received, first);
        let received = receiver.recv().await.expect("second envelope");
        assert_eq!(received, second);
    }

    #[test]
    fn publish_without_subscribers_is_a_no_op_send() {
        let bus = ConsoleEventBus::default();
        let envelope = bus.publish(ConsoleEvent::AlertsIngested(AlertsIngestedPayload {
            epoch: 1,
            visible_count: 0,
            deferred_count: 0,
        }));
        assert_eq!(envelope.sequence, 0);
    }

    #[tokio::test]
    async fn zero_capacity_bus_still_delivers() {
        let bus = ConsoleEventBus::new(ConsoleEventBusConfig { buffer_capacity: 0 });
        let mut receiver = bus.subscribe();
        let published = bus.publish(ConsoleEvent::AlertsIngested(AlertsIngestedPayload {
            epoch: 1,
            visible_count: 1,
            deferred_count: 0,
        }));
        let received = receiver.recv().await.expect("clamped bus delivers");
        assert_eq!(received, published);
    }
}
