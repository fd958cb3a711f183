//! Stochastic samples feeding the rig jitter and prop shake
//!
//! These are free functions over any [`Rng`]; the only state they touch is the
//! random stream handed in by the caller.

use nalgebra::{UnitQuaternion, Vector3};
use rand::Rng;
use rand_distr::{Distribution, UnitBall};

use crate::config::LockedAxis;
use crate::transform::euler_degrees;

/// Uniform sample from inside the unit sphere.
pub fn inside_unit_sphere<R: Rng + ?Sized>(rng: &mut R) -> Vector3<f64> {
    let [x, y, z]: [f64; 3] = UnitBall.sample(rng);
    Vector3::new(x, y, z)
}

/// In-sphere offset scaled by `strength`.
pub fn random_offset<R: Rng + ?Sized>(rng: &mut R, strength: f64) -> Vector3<f64> {
    inside_unit_sphere(rng) * strength
}

/// Uniform scalar in [-1, 1].
pub fn signed_unit<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.gen_range(-1.0..=1.0)
}

/// Two-axis noise scaled by `force`, zero along `locked`.
pub fn planar_noise<R: Rng + ?Sized>(rng: &mut R, locked: LockedAxis, force: f64) -> Vector3<f64> {
    let a = signed_unit(rng) * force;
    let b = signed_unit(rng) * force;
    spread_free_axes(locked, a, b)
}

/// Places `a` and `b` on the two axes orthogonal to `locked`, in X, Y, Z order.
pub fn spread_free_axes(locked: LockedAxis, a: f64, b: f64) -> Vector3<f64> {
    match locked {
        LockedAxis::X => Vector3::new(0.0, a, b),
        LockedAxis::Y => Vector3::new(a, 0.0, b),
        LockedAxis::Z => Vector3::new(a, b, 0.0),
    }
}

/// Small rotation from three uniform(-1, 1) angles in degrees scaled by `force`.
pub fn euler_jitter<R: Rng + ?Sized>(rng: &mut R, force: f64) -> UnitQuaternion<f64> {
    let rx = signed_unit(rng) * force;
    let ry = signed_unit(rng) * force;
    let rz = signed_unit(rng) * force;
    euler_degrees(rx, ry, rz)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn unit_sphere_samples_stay_inside() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..2_000 {
            assert!(inside_unit_sphere(&mut rng).norm() <= 1.0);
        }
    }

    #[test]
    fn offset_is_bounded_by_strength() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..500 {
            assert!(random_offset(&mut rng, 0.125).norm() <= 0.125 + 1e-12);
        }
        assert_eq!(random_offset(&mut rng, 0.0), Vector3::zeros());
    }

    #[test]
    fn locked_axis_never_moves() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            assert_eq!(planar_noise(&mut rng, LockedAxis::X, 2.0).x, 0.0);
            assert_eq!(planar_noise(&mut rng, LockedAxis::Y, 2.0).y, 0.0);
            assert_eq!(planar_noise(&mut rng, LockedAxis::Z, 2.0).z, 0.0);
        }
    }

    #[test]
    fn planar_noise_respects_force_bound() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..200 {
            let v = planar_noise(&mut rng, LockedAxis::Y, 0.3);
            assert!(v.x.abs() <= 0.3 && v.z.abs() <= 0.3);
        }
    }
}
