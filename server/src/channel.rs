use flipboard_types::api::BetEvent;
use tokio::sync::broadcast;
use tracing::debug;

/// Default number of events buffered per subscriber before it starts lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Process-wide publish/subscribe bus fanning bet events out to every
/// connected listener.
///
/// Delivery is best-effort and at-most-once per subscriber: each subscriber
/// observes events in publish order, but one that falls more than the buffer
/// capacity behind loses the oldest events and is expected to reconcile with
/// a full fetch. Nothing survives a process restart. The channel is built
/// once and injected wherever it is needed; there is no ambient global.
#[derive(Clone)]
pub struct EventChannel {
    tx: broadcast::Sender<BetEvent>,
}

impl EventChannel {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Fan the event out to all current subscribers. Fire-and-forget: having
    /// no subscribers is not an error, and no delivery is acknowledged.
    pub fn publish(&self, event: BetEvent) {
        if let Err(err) = self.tx.send(event) {
            debug!("no subscribers for {} event", err.0.kind());
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BetEvent> {
        self.tx.subscribe()
    }

    /// Number of currently connected subscribers.
    pub fn subscribers(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventChannel {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flipboard_types::BetId;

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let channel = EventChannel::new(4);
        channel.publish(BetEvent::Deleted { id: BetId::new_v4() });
        assert_eq!(channel.subscribers(), 0);
    }

    #[test]
    fn test_subscribers_receive_in_publish_order() {
        let channel = EventChannel::new(4);
        let mut rx = channel.subscribe();
        let first = BetId::new_v4();
        let second = BetId::new_v4();
        channel.publish(BetEvent::Deleted { id: first });
        channel.publish(BetEvent::Deleted { id: second });

        assert_eq!(rx.try_recv().unwrap(), BetEvent::Deleted { id: first });
        assert_eq!(rx.try_recv().unwrap(), BetEvent::Deleted { id: second });
        assert!(rx.try_recv().is_err());
    }
}
