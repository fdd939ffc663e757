//! Rotation math used by the pose solver.
//!
//! All bases are right-handed with columns `[right, up, forward]` and
//! `forward = right × up`; the identity basis is the avatar's rest frame
//! (x = avatar right, y = up, z = avatar forward).

use crate::constants::{ANTIPARALLEL_DOT, DEGENERATE_LENGTH_SQ};
use log::debug;
use nalgebra::{Matrix3, Quaternion, Unit, UnitQuaternion, Vector3};
use std::f32::consts::PI;

/// Normalize a vector, rejecting zero-length and non-finite input
#[must_use]
pub fn try_normalize(v: &Vector3<f32>) -> Option<Vector3<f32>> {
    let norm_sq = v.norm_squared();
    if !norm_sq.is_finite() || norm_sq < DEGENERATE_LENGTH_SQ {
        return None;
    }
    Some(v / norm_sq.sqrt())
}

/// Re-normalize a raw quaternion; degenerate input collapses to identity
#[must_use]
pub fn normalize_rotation(q: Quaternion<f32>) -> UnitQuaternion<f32> {
    let norm = q.norm();
    if !norm.is_finite() || norm < 1e-6 {
        return UnitQuaternion::identity();
    }
    UnitQuaternion::new_unchecked(q / norm)
}

/// Gram–Schmidt basis from a right vector and an approximate up vector
///
/// Returns `None` when either input is degenerate or they are parallel.
#[must_use]
pub fn orthonormal_basis(right: &Vector3<f32>, up_hint: &Vector3<f32>) -> Option<Matrix3<f32>> {
    let right = try_normalize(right)?;
    let up = try_normalize(&(up_hint - right * right.dot(up_hint)))?;
    let forward = right.cross(&up);
    Some(Matrix3::from_columns(&[right, up, forward]))
}

/// Which term of a rotation matrix drove the quaternion extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasisBranch {
    /// Positive trace: w is the largest component
    Trace,
    /// `m00` is the largest diagonal term
    X,
    /// `m11` is the largest diagonal term
    Y,
    /// `m22` is the largest diagonal term
    Z,
}

/// Branch chosen by [`basis_to_quaternion`] for a matrix
#[must_use]
pub fn select_branch(m: &Matrix3<f32>) -> BasisBranch {
    let (m00, m11, m22) = (m[(0, 0)], m[(1, 1)], m[(2, 2)]);
    if m00 + m11 + m22 > 0.0 {
        BasisBranch::Trace
    } else if m00 > m11 && m00 > m22 {
        BasisBranch::X
    } else if m11 > m22 {
        BasisBranch::Y
    } else {
        BasisBranch::Z
    }
}

/// Convert an orthonormal rotation matrix to a unit quaternion
///
/// Divides by the largest of `w, x, y, z` so the result stays accurate for
/// rotations near 180°, where the trace-only formula loses all precision.
#[must_use]
pub fn basis_to_quaternion(m: &Matrix3<f32>) -> UnitQuaternion<f32> {
    let (m00, m01, m02) = (m[(0, 0)], m[(0, 1)], m[(0, 2)]);
    let (m10, m11, m12) = (m[(1, 0)], m[(1, 1)], m[(1, 2)]);
    let (m20, m21, m22) = (m[(2, 0)], m[(2, 1)], m[(2, 2)]);

    let q = match select_branch(m) {
        BasisBranch::Trace => {
            let s = 0.5 / (m00 + m11 + m22 + 1.0).sqrt();
            Quaternion::new(0.25 / s, (m21 - m12) * s, (m02 - m20) * s, (m10 - m01) * s)
        }
        BasisBranch::X => {
            let s = 2.0 * (1.0 + m00 - m11 - m22).sqrt();
            Quaternion::new((m21 - m12) / s, 0.25 * s, (m01 + m10) / s, (m02 + m20) / s)
        }
        BasisBranch::Y => {
            let s = 2.0 * (1.0 + m11 - m00 - m22).sqrt();
            Quaternion::new((m02 - m20) / s, (m01 + m10) / s, 0.25 * s, (m12 + m21) / s)
        }
        BasisBranch::Z => {
            let s = 2.0 * (1.0 + m22 - m00 - m11).sqrt();
            Quaternion::new((m10 - m01) / s, (m02 + m20) / s, (m12 + m21) / s, 0.25 * s)
        }
    };

    normalize_rotation(q)
}

/// Any unit vector perpendicular to `v` (which must be non-zero)
#[must_use]
pub fn any_orthogonal(v: &Vector3<f32>) -> Vector3<f32> {
    let helper = if v.x.abs() < 0.9 { Vector3::x() } else { Vector3::y() };
    try_normalize(&v.cross(&helper)).unwrap_or_else(Vector3::z)
}

/// Shortest-arc rotation taking direction `from` onto direction `to`
///
/// Anti-parallel input has no unique answer; a half turn about an arbitrary
/// axis perpendicular to `from` is used instead. Degenerate input yields
/// identity.
#[must_use]
pub fn shortest_arc(from: &Vector3<f32>, to: &Vector3<f32>) -> UnitQuaternion<f32> {
    let (Some(a), Some(b)) = (try_normalize(from), try_normalize(to)) else {
        return UnitQuaternion::identity();
    };

    let dot = a.dot(&b);
    if dot < ANTIPARALLEL_DOT {
        let axis = any_orthogonal(&a);
        debug!("Anti-parallel rest/observed directions, substituting axis {axis:?}");
        return UnitQuaternion::from_axis_angle(&Unit::new_unchecked(axis), PI);
    }

    let c = a.cross(&b);
    normalize_rotation(Quaternion::new(1.0 + dot, c.x, c.y, c.z))
}

/// Rotation whose forward axis points along `forward` with up near `up_hint`
#[must_use]
pub fn look_rotation(forward: &Vector3<f32>, up_hint: &Vector3<f32>) -> Option<UnitQuaternion<f32>> {
    let forward = try_normalize(forward)?;
    let right = try_normalize(&up_hint.cross(&forward))?;
    let up = forward.cross(&right);
    Some(basis_to_quaternion(&Matrix3::from_columns(&[right, up, forward])))
}

/// Spherical interpolation that never panics
///
/// `t` is clamped to [0, 1]; the endpoints are returned exactly.
#[must_use]
pub fn slerp(from: &UnitQuaternion<f32>, to: &UnitQuaternion<f32>, t: f32) -> UnitQuaternion<f32> {
    if t >= 1.0 {
        return *to;
    }
    if t <= 0.0 {
        return *from;
    }
    let q = from.try_slerp(to, t, 1e-6).unwrap_or_else(|| from.nlerp(to, t));
    normalize_rotation(q.into_inner())
}

/// Cap the rotation angle at `max_angle` radians, keeping its axis
#[must_use]
pub fn limit_angle(q: &UnitQuaternion<f32>, max_angle: f32) -> UnitQuaternion<f32> {
    if max_angle < 0.0 || q.angle() <= max_angle {
        return *q;
    }
    match q.axis() {
        Some(axis) => UnitQuaternion::from_axis_angle(&axis, max_angle),
        None => *q,
    }
}
