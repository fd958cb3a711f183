//! Hinged door
//!
//! Swings toward its target angle a little each tick and refuses to open while a
//! connected lock still wants a key.

use nalgebra::UnitQuaternion;
use tracing::debug;

use crate::gadgets::Lock;
use crate::transform::euler_degrees;

/// Angles closer than this count as settled [deg]
const SETTLE_EPSILON: f64 = 0.01;

/// Hinged door that swings between closed and `open_angle`.
#[derive(Debug, Clone)]
pub struct Door {
    pub open_angle: f64,
    pub open_speed: f64,
    /// Refuse to toggle while the connected lock is locked
    pub require_key: bool,
    open: bool,
    angle: f64,
    target: f64,
}

impl Door {
    pub fn new(open_angle: f64, open_speed: f64, require_key: bool) -> Self {
        Self {
            open_angle,
            open_speed,
            require_key,
            open: false,
            angle: 0.0,
            target: 0.0,
        }
    }

    /// Toggles the door unless it requires a key and `lock` is still locked.
    /// Without a connected lock the door always toggles.
    pub fn try_open(&mut self, lock: Option<&Lock>) -> bool {
        if self.require_key && lock.is_some_and(|lock| !lock.is_unlocked()) {
            debug!("door is locked");
            return false;
        }
        self.open = !self.open;
        self.target = if self.open { self.open_angle } else { 0.0 };
        true
    }

    pub fn tick(&mut self, dt: f64) {
        if (self.angle - self.target).abs() > SETTLE_EPSILON {
            let t = (dt * self.open_speed).clamp(0.0, 1.0);
            self.angle += (self.target - self.angle) * t;
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Current swing [deg]
    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn target_angle(&self) -> f64 {
        self.target
    }

    pub fn hinge_rotation(&self) -> UnitQuaternion<f64> {
        euler_degrees(0.0, self.angle, 0.0)
    }
}

impl Default for Door {
    fn default() -> Self {
        Self::new(90.0, 2.0, true)
    }
}
