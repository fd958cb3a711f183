//! Tick loop tying the driver, the bus and the attached subscribers together
//!
//! Each [`Scene::tick`] runs the driver first, then hands the freshly
//! published value to every enabled subscriber, and only then lets each
//! subscriber advance its own effect task. Every subscriber therefore reacts to
//! the same value within a tick.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use crate::bus::{SignalBus, SubscriptionId};
use crate::driver::{DisturbanceDriver, DriverPhase};
use crate::subscribers::{EffectState, SignalSubscriber, Subscriber};
use crate::QuakeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

struct Attached {
    subscriber: Subscriber,
    /// `None` while disabled
    subscription: Option<SubscriptionId>,
}

pub struct Scene {
    bus: SignalBus,
    driver: DisturbanceDriver,
    rng: StdRng,
    subscribers: BTreeMap<SubscriberId, Attached>,
    next_id: u64,
    time: f64,
}

impl Scene {
    /// Scene drawing its noise from OS entropy.
    pub fn new(driver: DisturbanceDriver) -> Self {
        Self::with_rng(driver, StdRng::from_entropy())
    }

    /// Scene with a reproducible noise stream.
    pub fn with_seed(driver: DisturbanceDriver, seed: u64) -> Self {
        Self::with_rng(driver, StdRng::seed_from_u64(seed))
    }

    fn with_rng(driver: DisturbanceDriver, rng: StdRng) -> Self {
        Self {
            bus: SignalBus::new(),
            driver,
            rng,
            subscribers: BTreeMap::new(),
            next_id: 0,
            time: 0.0,
        }
    }

    /// Attaches an enabled subscriber. It only sees values published from now on.
    pub fn attach(&mut self, subscriber: impl Into<Subscriber>) -> SubscriberId {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        let subscription = Some(self.bus.subscribe());
        self.subscribers.insert(
            id,
            Attached {
                subscriber: subscriber.into(),
                subscription,
            },
        );
        debug!(?id, "subscriber attached");
        id
    }

    /// Removes a subscriber, released back to its baseline. Detaching an unknown
    /// id returns `None`.
    pub fn detach(&mut self, id: SubscriberId) -> Option<Subscriber> {
        let mut attached = self.subscribers.remove(&id)?;
        if let Some(subscription) = attached.subscription {
            self.bus.unsubscribe(subscription);
        }
        attached.subscriber.release();
        debug!(?id, "subscriber detached");
        Some(attached.subscriber)
    }

    /// Enables or disables delivery to `id`. Disabling releases the subscriber
    /// back to its baseline; a re-enabled one resumes with the next publish.
    /// Returns false for an unknown id.
    pub fn set_enabled(&mut self, id: SubscriberId, enabled: bool) -> bool {
        let Some(attached) = self.subscribers.get_mut(&id) else {
            return false;
        };
        match (enabled, attached.subscription) {
            (true, None) => attached.subscription = Some(self.bus.subscribe()),
            (false, Some(subscription)) => {
                self.bus.unsubscribe(subscription);
                attached.subscription = None;
                attached.subscriber.release();
                debug!(?id, "subscriber disabled");
            }
            _ => {}
        }
        true
    }

    pub fn is_enabled(&self, id: SubscriberId) -> bool {
        self.subscribers
            .get(&id)
            .map_or(false, |attached| attached.subscription.is_some())
    }

    pub fn subscriber(&self, id: SubscriberId) -> Option<&Subscriber> {
        self.subscribers.get(&id).map(|attached| &attached.subscriber)
    }

    pub fn subscriber_mut(&mut self, id: SubscriberId) -> Option<&mut Subscriber> {
        self.subscribers
            .get_mut(&id)
            .map(|attached| &mut attached.subscriber)
    }

    pub fn subscriber_ids(&self) -> impl Iterator<Item = SubscriberId> + '_ {
        self.subscribers.keys().copied()
    }

    /// Number of subscribers currently in the Active state.
    pub fn active_count(&self) -> usize {
        self.subscribers
            .values()
            .filter(|attached| attached.subscriber.state() == EffectState::Active)
            .count()
    }

    pub fn driver(&self) -> &DisturbanceDriver {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut DisturbanceDriver {
        &mut self.driver
    }

    pub fn bus(&self) -> &SignalBus {
        &self.bus
    }

    pub fn phase(&self) -> DriverPhase {
        self.driver.phase()
    }

    /// Simulated seconds since the scene was created.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn start(&mut self) -> Result<(), QuakeError> {
        self.driver.start()
    }

    pub fn stop(&mut self) {
        self.driver.stop();
    }

    pub fn tick(&mut self, dt: f64) {
        self.driver.tick(dt, &mut self.bus, &mut self.rng);

        for attached in self.subscribers.values_mut() {
            let Some(subscription) = attached.subscription else {
                continue;
            };
            if let Some(intensity) = self.bus.receive(subscription) {
                attached.subscriber.on_signal(intensity, &mut self.rng);
            }
        }

        for attached in self.subscribers.values_mut() {
            if attached.subscription.is_some() {
                attached.subscriber.advance(dt, &mut self.rng);
            }
        }

        self.time += dt;
    }
}
