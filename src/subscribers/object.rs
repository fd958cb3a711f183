//! Shaking prop subscriber
//!
//! Kinematic props get their pose overwritten from a captured baseline; physical
//! props receive velocity changes and are left wherever their body comes to rest.

use nalgebra::{UnitQuaternion, Vector3};
use rand::RngCore;
use tracing::debug;

use crate::config::ShakerConfig;
use crate::noise::{euler_jitter, planar_noise, random_offset};
use crate::subscribers::{EffectState, SignalSubscriber};
use crate::transform::Transform;
use crate::QuakeError;

/// Intensities at or below this leave the prop at rest.
pub const SHAKE_EPSILON: f64 = 0.001;
/// Bodies slower than this in both linear [m/s] and angular [rad/s] terms sleep.
pub const SLEEP_SPEED: f64 = 0.005;

/// Minimal rigid body: velocity changes are integrated on `advance`. Drag
/// bleeds the velocity off and a body below [`SLEEP_SPEED`] stops dead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidBody {
    pub transform: Transform,
    pub linear_velocity: Vector3<f64>,
    /// Angular velocity [rad/s], axis scaled by rate
    pub angular_velocity: Vector3<f64>,
    pub linear_damping: f64,
    pub angular_damping: f64,
}

impl RigidBody {
    pub fn new(transform: Transform) -> Self {
        Self {
            transform,
            linear_velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            linear_damping: 1.0,
            angular_damping: 1.0,
        }
    }

    pub fn with_damping(mut self, linear: f64, angular: f64) -> Self {
        self.linear_damping = linear;
        self.angular_damping = angular;
        self
    }

    /// Mass-independent impulse.
    pub fn apply_velocity_change(&mut self, dv: Vector3<f64>) {
        self.linear_velocity += dv;
    }

    pub fn apply_angular_velocity_change(&mut self, dw: Vector3<f64>) {
        self.angular_velocity += dw;
    }

    pub fn is_asleep(&self) -> bool {
        self.linear_velocity == Vector3::zeros() && self.angular_velocity == Vector3::zeros()
    }

    /// Semi-implicit Euler step with linear drag.
    pub fn integrate(&mut self, dt: f64) {
        if dt <= 0.0 {
            return;
        }
        self.linear_velocity *= (1.0 - self.linear_damping * dt).max(0.0);
        self.angular_velocity *= (1.0 - self.angular_damping * dt).max(0.0);
        if self.linear_velocity.norm() < SLEEP_SPEED && self.angular_velocity.norm() < SLEEP_SPEED
        {
            self.linear_velocity = Vector3::zeros();
            self.angular_velocity = Vector3::zeros();
            return;
        }
        self.transform.position += self.linear_velocity * dt;
        let spin = UnitQuaternion::from_scaled_axis(self.angular_velocity * dt);
        self.transform.rotation = spin * self.transform.rotation;
    }
}

/// What the shaker moves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShakeTarget {
    /// Pose written directly each signal, restored on rest
    Kinematic(Transform),
    /// Body nudged with velocity changes, left where physics puts it
    Physical(RigidBody),
}

/// Prop that shakes in proportion to the broadcast intensity.
pub struct ObjectShaker {
    config: ShakerConfig,
    target: ShakeTarget,
    baseline: Transform,
    state: EffectState,
}

impl ObjectShaker {
    pub fn new(target: ShakeTarget, config: ShakerConfig) -> Result<Self, QuakeError> {
        config.validate()?;
        let baseline = match &target {
            ShakeTarget::Kinematic(pose) => *pose,
            ShakeTarget::Physical(body) => body.transform,
        };
        Ok(Self {
            config,
            target,
            baseline,
            state: EffectState::Idle,
        })
    }

    pub fn kinematic(pose: Transform, config: ShakerConfig) -> Result<Self, QuakeError> {
        Self::new(ShakeTarget::Kinematic(pose), config)
    }

    pub fn physical(body: RigidBody, config: ShakerConfig) -> Result<Self, QuakeError> {
        Self::new(ShakeTarget::Physical(body), config)
    }

    /// Current pose of the prop.
    pub fn transform(&self) -> Transform {
        match &self.target {
            ShakeTarget::Kinematic(pose) => *pose,
            ShakeTarget::Physical(body) => body.transform,
        }
    }

    pub fn baseline(&self) -> Transform {
        self.baseline
    }

    pub fn target(&self) -> &ShakeTarget {
        &self.target
    }

    pub fn config(&self) -> &ShakerConfig {
        &self.config
    }

    pub fn is_physical(&self) -> bool {
        matches!(self.target, ShakeTarget::Physical(_))
    }

    fn shake(&mut self, intensity: f64, rng: &mut dyn RngCore) {
        let shake_force = intensity * self.config.position_multiplier;
        let rot_force = intensity * self.config.rotation_multiplier;
        let locked = self.config.locked_axis;

        match &mut self.target {
            ShakeTarget::Physical(body) => {
                body.apply_velocity_change(planar_noise(rng, locked, shake_force));
                body.apply_angular_velocity_change(random_offset(rng, rot_force));
            }
            ShakeTarget::Kinematic(pose) => {
                let offset = planar_noise(rng, locked, shake_force);
                pose.position = self.baseline.position + offset;
                pose.rotation = self.baseline.rotation * euler_jitter(rng, rot_force);
            }
        }
    }

    fn settle(&mut self) {
        self.state = EffectState::Idle;
        if let ShakeTarget::Kinematic(pose) = &mut self.target {
            *pose = self.baseline;
        }
        debug!(physical = self.is_physical(), "prop at rest");
    }
}

impl SignalSubscriber for ObjectShaker {
    fn on_signal(&mut self, intensity: f64, rng: &mut dyn RngCore) {
        if intensity > SHAKE_EPSILON {
            if self.state == EffectState::Idle {
                self.state = EffectState::Active;
                debug!(physical = self.is_physical(), "prop shaking");
            }
            self.shake(intensity, rng);
        } else if self.state == EffectState::Active {
            self.settle();
        }
    }

    fn advance(&mut self, dt: f64, _rng: &mut dyn RngCore) {
        if let ShakeTarget::Physical(body) = &mut self.target {
            body.integrate(dt);
        }
    }

    fn release(&mut self) {
        if self.state == EffectState::Active {
            self.settle();
        }
    }

    fn state(&self) -> EffectState {
        self.state
    }
}
