//! Last-value-wins broadcast of the current disturbance intensity
//!
//! The bus holds one scalar and a sequence number bumped on every publish.
//! Each subscription remembers the sequence it last observed, so a receiver
//! sees the newest value exactly once and never any value published before it
//! attached.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

#[derive(Debug, Default)]
pub struct SignalBus {
    latest: Option<f64>,
    sequence: u64,
    next_id: u64,
    seen: BTreeMap<SubscriptionId, u64>,
}

impl SignalBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current value. Older values are never delivered.
    pub fn publish(&mut self, value: f64) {
        self.latest = Some(value);
        self.sequence += 1;
    }

    /// Most recent published value, `None` before the first publish.
    pub fn latest(&self) -> Option<f64> {
        self.latest
    }

    /// Number of publishes so far.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn subscribe(&mut self) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.seen.insert(id, self.sequence);
        id
    }

    /// Detaches `id`. Returns false if it was not attached.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.seen.remove(&id).is_some()
    }

    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.seen.contains_key(&id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.seen.len()
    }

    /// Value published since `id` last received, if any.
    pub fn receive(&mut self, id: SubscriptionId) -> Option<f64> {
        let seen = self.seen.get_mut(&id)?;
        if *seen == self.sequence {
            return None;
        }
        *seen = self.sequence;
        self.latest
    }
}

#[cfg(test)]
mod tests {
    use super::SignalBus;

    #[test]
    fn late_subscriber_sees_only_future_values() {
        let mut bus = SignalBus::new();
        bus.publish(0.4);
        let id = bus.subscribe();
        assert_eq!(bus.receive(id), None);
        bus.publish(0.2);
        assert_eq!(bus.receive(id), Some(0.2));
        assert_eq!(bus.receive(id), None);
    }

    #[test]
    fn receivers_see_the_same_value() {
        let mut bus = SignalBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();
        bus.publish(1.0);
        bus.publish(0.3);
        assert_eq!(bus.receive(a), Some(0.3));
        assert_eq!(bus.receive(b), Some(0.3));
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let mut bus = SignalBus::new();
        let id = bus.subscribe();
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(2.0);
        assert_eq!(bus.receive(id), None);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn nothing_before_first_publish() {
        let mut bus = SignalBus::new();
        let id = bus.subscribe();
        assert_eq!(bus.latest(), None);
        assert_eq!(bus.receive(id), None);
    }
}
