//! Effects that react to the broadcast intensity
//!
//! Every subscriber captures a baseline when it is created, keeps its own
//! Idle/Active state and owns at most one running effect task.

pub mod light;
pub mod object;

use rand::RngCore;

pub use light::{Light, LightFlicker};
pub use object::{ObjectShaker, RigidBody, ShakeTarget};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EffectState {
    #[default]
    Idle,
    Active,
}

pub trait SignalSubscriber {
    /// Reacts to a freshly published intensity.
    fn on_signal(&mut self, intensity: f64, rng: &mut dyn RngCore);

    /// Advances any running effect task by one tick.
    fn advance(&mut self, _dt: f64, _rng: &mut dyn RngCore) {}

    /// Stops any running effect and puts the target back at rest. Called when
    /// the subscriber stops receiving values.
    fn release(&mut self) {}

    fn state(&self) -> EffectState;
}

/// A subscriber attached to a scene.
pub enum Subscriber {
    Light(LightFlicker),
    Object(ObjectShaker),
    Custom(Box<dyn SignalSubscriber>),
}

impl Subscriber {
    pub fn as_light(&self) -> Option<&LightFlicker> {
        match self {
            Subscriber::Light(light) => Some(light),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectShaker> {
        match self {
            Subscriber::Object(object) => Some(object),
            _ => None,
        }
    }

    fn inner(&self) -> &dyn SignalSubscriber {
        match self {
            Subscriber::Light(light) => light,
            Subscriber::Object(object) => object,
            Subscriber::Custom(custom) => custom.as_ref(),
        }
    }

    fn inner_mut(&mut self) -> &mut dyn SignalSubscriber {
        match self {
            Subscriber::Light(light) => light,
            Subscriber::Object(object) => object,
            Subscriber::Custom(custom) => custom.as_mut(),
        }
    }
}

impl SignalSubscriber for Subscriber {
    fn on_signal(&mut self, intensity: f64, rng: &mut dyn RngCore) {
        self.inner_mut().on_signal(intensity, rng);
    }

    fn advance(&mut self, dt: f64, rng: &mut dyn RngCore) {
        self.inner_mut().advance(dt, rng);
    }

    fn release(&mut self) {
        self.inner_mut().release();
    }

    fn state(&self) -> EffectState {
        self.inner().state()
    }
}

impl From<LightFlicker> for Subscriber {
    fn from(light: LightFlicker) -> Self {
        Subscriber::Light(light)
    }
}

impl From<ObjectShaker> for Subscriber {
    fn from(object: ObjectShaker) -> Self {
        Subscriber::Object(object)
    }
}
