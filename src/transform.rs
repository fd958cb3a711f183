//! Local-space poses shared by the rig, props and gadgets

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Local position and rotation of a scene object
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vector3<f64>,
    pub rotation: UnitQuaternion<f64>,
}

impl Transform {
    pub fn new(position: Vector3<f64>, rotation: UnitQuaternion<f64>) -> Self {
        Self { position, rotation }
    }

    pub fn identity() -> Self {
        Self {
            position: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
        }
    }

    pub fn from_position(position: Vector3<f64>) -> Self {
        Self {
            position,
            rotation: UnitQuaternion::identity(),
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Rotation from Euler angles in degrees.
///
/// Applied about Z first, then X, then Y, the convention scene tooling uses for
/// authored rotations.
pub fn euler_degrees(x: f64, y: f64, z: f64) -> UnitQuaternion<f64> {
    let qx = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), x.to_radians());
    let qy = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), y.to_radians());
    let qz = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), z.to_radians());
    qy * qx * qz
}
