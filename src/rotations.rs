//! Quaternion / Euler-angle conversions under arbitrary axis conventions.
//!
//! Conventions are three-letter strings over {x, y, z} naming extrinsic
//! rotation axes applied in order, e.g. `"zyz"` (the default used for
//! particle orientations) or `"xyz"` (roll-pitch-yaw). Axes may not repeat
//! back-to-back; symmetric conventions (first axis == third axis) are legal.
//!
//! The decomposition follows the scipy rotation formulation. At the
//! gimbal-lock singularities (second angle near 0 or 180 degrees) the third
//! angle is set to zero and the first angle absorbs the full in-plane
//! rotation, so every quaternion maps to exactly one angle triple.

use std::f64::consts::PI;

use nalgebra::{Quaternion, Unit, UnitQuaternion, Vector3};

use crate::error::SimulationError;

const GIMBAL_EPS: f64 = 1e-7;
const NORM_EPS: f64 = 1e-12;

/// Parse and validate a three-letter axis convention into axis indices.
fn parse_convention(convention: &str) -> Result<[usize; 3], SimulationError> {
    let invalid = |reason| SimulationError::InvalidConvention {
        convention: convention.to_string(),
        reason,
    };

    if convention.len() != 3 {
        return Err(invalid("expected exactly three characters"));
    }
    let mut axes = [0usize; 3];
    for (slot, ch) in axes.iter_mut().zip(convention.chars()) {
        *slot = match ch {
            'x' => 0,
            'y' => 1,
            'z' => 2,
            _ => return Err(invalid("characters must be one of 'x', 'y', 'z'")),
        };
    }
    if axes[0] == axes[1] || axes[1] == axes[2] {
        return Err(invalid("axes cannot repeat back-to-back"));
    }
    Ok(axes)
}

fn unit_axis(index: usize) -> Unit<Vector3<f64>> {
    match index {
        0 => Vector3::x_axis(),
        1 => Vector3::y_axis(),
        _ => Vector3::z_axis(),
    }
}

/// Wrap an angle in radians to (-pi, pi].
fn wrap_angle(angle: f64) -> f64 {
    let mut wrapped = angle % (2.0 * PI);
    if wrapped <= -PI {
        wrapped += 2.0 * PI;
    } else if wrapped > PI {
        wrapped -= 2.0 * PI;
    }
    wrapped
}

/// Normalize a `(w, x, y, z)` quaternion, rejecting near-zero norms.
pub fn normalize_wxyz(wxyz: [f64; 4]) -> Result<[f64; 4], SimulationError> {
    let norm = wxyz.iter().map(|c| c * c).sum::<f64>().sqrt();
    if !norm.is_finite() || norm < NORM_EPS {
        return Err(SimulationError::DegenerateQuaternion { norm });
    }
    Ok([
        wxyz[0] / norm,
        wxyz[1] / norm,
        wxyz[2] / norm,
        wxyz[3] / norm,
    ])
}

/// Decompose a `(w, x, y, z)` quaternion into extrinsic Euler angles.
///
/// Returns angles in degrees, each in (-180, 180], ordered by the
/// convention's axes. The quaternion is normalized internally; a near-zero
/// norm or a malformed convention is a configuration error.
pub fn convert_quaternion_to_euler_angles(
    wxyz: [f64; 4],
    convention: &str,
) -> Result<[f64; 3], SimulationError> {
    let axes = parse_convention(convention)?;
    let q = normalize_wxyz(wxyz)?;
    let (w, v) = (q[0], [q[1], q[2], q[3]]);

    let i = axes[0];
    let j = axes[1];
    let mut k = axes[2];
    let symmetric = i == k;
    if symmetric {
        k = 3 - i - j;
    }
    let sign = ((i as i64 - j as i64) * (j as i64 - k as i64) * (k as i64 - i as i64) / 2) as f64;

    let (a, b, c, d) = if symmetric {
        (w, v[i], v[j], v[k] * sign)
    } else {
        (w - v[j], v[i] + v[k] * sign, v[j] + w, v[k] * sign - v[i])
    };

    let mut angles = [0.0f64; 3];
    angles[1] = 2.0 * c.hypot(d).atan2(a.hypot(b));

    let half_sum = b.atan2(a);
    let half_diff = d.atan2(c);

    if angles[1].abs() <= GIMBAL_EPS {
        // Second angle ~0: only the sum of the outer rotations is defined.
        angles[0] = 2.0 * half_sum;
        angles[2] = 0.0;
    } else if (angles[1] - PI).abs() <= GIMBAL_EPS {
        // Second angle ~pi: only the difference is defined.
        angles[0] = -2.0 * half_diff;
        angles[2] = 0.0;
    } else {
        angles[0] = half_sum - half_diff;
        angles[2] = half_sum + half_diff;
    }

    if !symmetric {
        angles[2] *= sign;
        angles[1] -= PI / 2.0;
    }

    Ok([
        wrap_angle(angles[0]).to_degrees(),
        wrap_angle(angles[1]).to_degrees(),
        wrap_angle(angles[2]).to_degrees(),
    ])
}

/// Compose extrinsic Euler angles (degrees) into a `(w, x, y, z)` quaternion.
///
/// The inverse of [`convert_quaternion_to_euler_angles`] up to quaternion
/// sign.
pub fn convert_euler_angles_to_quaternion(
    angles_in_degrees: [f64; 3],
    convention: &str,
) -> Result<[f64; 4], SimulationError> {
    let axes = parse_convention(convention)?;
    let mut q = UnitQuaternion::identity();
    for (axis, angle) in axes.iter().zip(angles_in_degrees.iter()) {
        let step = UnitQuaternion::from_axis_angle(&unit_axis(*axis), angle.to_radians());
        // Extrinsic: later rotations multiply from the left.
        q = step * q;
    }
    Ok([q.w, q.i, q.j, q.k])
}

/// Build a unit quaternion from `(w, x, y, z)` components.
pub fn unit_quaternion_from_wxyz(
    wxyz: [f64; 4],
) -> Result<UnitQuaternion<f64>, SimulationError> {
    let q = normalize_wxyz(wxyz)?;
    Ok(UnitQuaternion::from_quaternion(Quaternion::new(
        q[0], q[1], q[2], q[3],
    )))
}
