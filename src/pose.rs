//! Rigid-body poses mapping specimen coordinates into the viewing frame.
//!
//! A pose is a 3-D rotation composed with an in-plane `(x, y, 0)` offset,
//! applied as `p' = R p + t`. Two parameterizations are provided and must
//! agree for equivalent rotations: Euler angles under the extrinsic x-y-z
//! (roll-pitch-yaw) convention, `R = Rz(psi) * Ry(theta) * Rx(phi)`, and
//! unit quaternions.

use ndarray::{Array1, Array2, ArrayView2, Axis};
use nalgebra::{Rotation3, Vector3};
use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::SimulationError;
use crate::rotations::unit_quaternion_from_wxyz;

/// Pose parameterized by Euler angles in degrees.
///
/// Angle ranges follow the particle-orientation convention: `phi` and `psi`
/// in (-180, 180], `theta` in (0, 180].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EulerPose {
    /// In-plane offset along x, in angstroms.
    pub offset_x: f64,
    /// In-plane offset along y, in angstroms.
    pub offset_y: f64,
    /// Roll about x, degrees.
    pub phi: f64,
    /// Pitch about y, degrees.
    pub theta: f64,
    /// Yaw about z, degrees.
    pub psi: f64,
}

impl EulerPose {
    pub fn new(offset_x: f64, offset_y: f64, phi: f64, theta: f64, psi: f64) -> Self {
        Self {
            offset_x,
            offset_y,
            phi,
            theta,
            psi,
        }
    }

    fn rotation(&self) -> Rotation3<f64> {
        Rotation3::from_euler_angles(
            self.phi.to_radians(),
            self.theta.to_radians(),
            self.psi.to_radians(),
        )
    }
}

impl Default for EulerPose {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0, 0.0)
    }
}

/// Pose parameterized by a unit quaternion `(w, x, y, z)`.
///
/// The quaternion is normalized when the transform is built; a near-zero
/// norm is a configuration error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuaternionPose {
    /// In-plane offset along x, in angstroms.
    pub offset_x: f64,
    /// In-plane offset along y, in angstroms.
    pub offset_y: f64,
    pub qw: f64,
    pub qx: f64,
    pub qy: f64,
    pub qz: f64,
}

impl QuaternionPose {
    pub fn new(offset_x: f64, offset_y: f64, qw: f64, qx: f64, qy: f64, qz: f64) -> Self {
        Self {
            offset_x,
            offset_y,
            qw,
            qx,
            qy,
            qz,
        }
    }

    fn rotation(&self) -> Result<Rotation3<f64>, SimulationError> {
        let q = unit_quaternion_from_wxyz([self.qw, self.qx, self.qy, self.qz])?;
        Ok(q.to_rotation_matrix())
    }
}

impl Default for QuaternionPose {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, 0.0, 0.0, 0.0)
    }
}

/// The pose of one simulated particle, in either parameterization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Pose {
    Euler(EulerPose),
    Quaternion(QuaternionPose),
}

impl Pose {
    /// The in-plane offset `(x, y)` in angstroms.
    pub fn offset(&self) -> (f64, f64) {
        match self {
            Pose::Euler(p) => (p.offset_x, p.offset_y),
            Pose::Quaternion(p) => (p.offset_x, p.offset_y),
        }
    }

    /// The rotation part of the rigid transform.
    pub fn rotation(&self) -> Result<Rotation3<f64>, SimulationError> {
        match self {
            Pose::Euler(p) => Ok(p.rotation()),
            Pose::Quaternion(p) => p.rotation(),
        }
    }

    /// Apply the rigid transform to `(N, 3)` coordinates, returning a new
    /// array.
    pub fn transform_coordinates(
        &self,
        coordinates: ArrayView2<f64>,
    ) -> Result<Array2<f64>, SimulationError> {
        let rotation = self.rotation()?;
        let (tx, ty) = self.offset();
        Ok(rotate_and_translate(coordinates, &rotation, tx, ty))
    }
}

impl From<EulerPose> for Pose {
    fn from(pose: EulerPose) -> Self {
        Pose::Euler(pose)
    }
}

impl From<QuaternionPose> for Pose {
    fn from(pose: QuaternionPose) -> Self {
        Pose::Quaternion(pose)
    }
}

fn rotate_and_translate(
    coordinates: ArrayView2<f64>,
    rotation: &Rotation3<f64>,
    tx: f64,
    ty: f64,
) -> Array2<f64> {
    let translation = Vector3::new(tx, ty, 0.0);
    let mut transformed = Array2::<f64>::zeros(coordinates.raw_dim());
    for (mut out, row) in transformed
        .axis_iter_mut(Axis(0))
        .zip(coordinates.axis_iter(Axis(0)))
    {
        let p = Vector3::new(row[0], row[1], row[2]);
        let moved = rotation * p + translation;
        out[0] = moved.x;
        out[1] = moved.y;
        out[2] = moved.z;
    }
    transformed
}

/// Rotate and translate `(N, 3)` coordinates from Euler angles in degrees.
pub fn rotate_and_translate_rpy(
    coordinates: ArrayView2<f64>,
    tx: f64,
    ty: f64,
    phi: f64,
    theta: f64,
    psi: f64,
) -> Array2<f64> {
    let pose = EulerPose::new(tx, ty, phi, theta, psi);
    rotate_and_translate(coordinates, &pose.rotation(), tx, ty)
}

/// Rotate and translate `(N, 3)` coordinates from a `(w, x, y, z)`
/// quaternion.
pub fn rotate_and_translate_wxyz(
    coordinates: ArrayView2<f64>,
    tx: f64,
    ty: f64,
    qw: f64,
    qx: f64,
    qy: f64,
    qz: f64,
) -> Result<Array2<f64>, SimulationError> {
    let pose = QuaternionPose::new(tx, ty, qw, qx, qy, qz);
    Ok(rotate_and_translate(coordinates, &pose.rotation()?, tx, ty))
}

/// In-plane translation of a Fourier-space density by phase shifting.
///
/// The equivalent of translating in real space before projection, via the
/// Fourier shift theorem. Not yet required by any pipeline path.
pub fn shift_phase(
    _density: &Array1<Complex64>,
    _coordinates: ArrayView2<f64>,
    _tx: f64,
    _ty: f64,
) -> Result<Array1<Complex64>, SimulationError> {
    Err(SimulationError::Unsupported(
        "phase-shift translation of Fourier-space densities",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::UnitQuaternion;
    use ndarray::array;

    fn test_coordinates() -> Array2<f64> {
        array![
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [0.3, -0.7, 0.45],
            [-0.9, 0.2, -0.6],
        ]
    }

    fn assert_coords_eq(a: &Array2<f64>, b: &Array2<f64>, tolerance: f64) {
        for (x, y) in a.iter().zip(b.iter()) {
            assert_relative_eq!(x, y, epsilon = tolerance);
        }
    }

    #[test]
    fn test_identity_pose_is_noop() {
        let coords = test_coordinates();
        let pose = Pose::Euler(EulerPose::default());
        let moved = pose.transform_coordinates(coords.view()).unwrap();
        assert_coords_eq(&coords, &moved, 1e-12);
    }

    #[test]
    fn test_translation_only() {
        let coords = test_coordinates();
        let pose = Pose::Euler(EulerPose::new(2.0, -3.5, 0.0, 0.0, 0.0));
        let moved = pose.transform_coordinates(coords.view()).unwrap();
        for (row, orig) in moved.axis_iter(Axis(0)).zip(coords.axis_iter(Axis(0))) {
            assert_relative_eq!(row[0], orig[0] + 2.0, epsilon = 1e-12);
            assert_relative_eq!(row[1], orig[1] - 3.5, epsilon = 1e-12);
            assert_relative_eq!(row[2], orig[2], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_yaw_rotates_x_to_y() {
        let coords = array![[1.0, 0.0, 0.0]];
        let moved = rotate_and_translate_rpy(coords.view(), 0.0, 0.0, 0.0, 0.0, 90.0);
        assert_relative_eq!(moved[[0, 0]], 0.0, epsilon = 1e-12);
        assert_relative_eq!(moved[[0, 1]], 1.0, epsilon = 1e-12);
        assert_relative_eq!(moved[[0, 2]], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_euler_and_quaternion_paths_agree() {
        let coords = test_coordinates();
        let cases = [
            (10.0, 20.0, 30.0),
            (-45.0, 60.0, 120.0),
            (170.0, 5.0, -170.0),
            (0.0, 90.0, 0.0),
        ];
        for (phi, theta, psi) in cases {
            let euler = Pose::Euler(EulerPose::new(0.4, -1.2, phi, theta, psi));
            let q = UnitQuaternion::from_euler_angles(
                phi.to_radians(),
                theta.to_radians(),
                psi.to_radians(),
            );
            let quaternion =
                Pose::Quaternion(QuaternionPose::new(0.4, -1.2, q.w, q.i, q.j, q.k));

            let a = euler.transform_coordinates(coords.view()).unwrap();
            let b = quaternion.transform_coordinates(coords.view()).unwrap();
            assert_coords_eq(&a, &b, 1e-5);
        }
    }

    #[test]
    fn test_rotation_composition_law() {
        let coords = test_coordinates();
        let q1 = UnitQuaternion::from_euler_angles(0.3, -0.8, 1.2);
        let q2 = UnitQuaternion::from_euler_angles(-1.1, 0.4, 0.9);

        let step1 =
            rotate_and_translate_wxyz(coords.view(), 0.0, 0.0, q1.w, q1.i, q1.j, q1.k).unwrap();
        let step2 =
            rotate_and_translate_wxyz(step1.view(), 0.0, 0.0, q2.w, q2.i, q2.j, q2.k).unwrap();

        let composed = q2 * q1;
        let direct = rotate_and_translate_wxyz(
            coords.view(),
            0.0,
            0.0,
            composed.w,
            composed.i,
            composed.j,
            composed.k,
        )
        .unwrap();

        assert_coords_eq(&step2, &direct, 1e-10);
    }

    #[test]
    fn test_non_unit_quaternion_is_normalized() {
        let coords = test_coordinates();
        let unit = Pose::Quaternion(QuaternionPose::new(0.0, 0.0, 0.5, 0.5, 0.5, 0.5));
        let scaled = Pose::Quaternion(QuaternionPose::new(0.0, 0.0, 1.5, 1.5, 1.5, 1.5));
        let a = unit.transform_coordinates(coords.view()).unwrap();
        let b = scaled.transform_coordinates(coords.view()).unwrap();
        assert_coords_eq(&a, &b, 1e-12);
    }

    #[test]
    fn test_zero_quaternion_is_rejected() {
        let coords = test_coordinates();
        let pose = Pose::Quaternion(QuaternionPose::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0));
        assert!(matches!(
            pose.transform_coordinates(coords.view()),
            Err(SimulationError::DegenerateQuaternion { .. })
        ));
    }

    #[test]
    fn test_shift_phase_is_unsupported() {
        let density = Array1::from_elem(4, Complex64::new(1.0, 0.0));
        let coords = Array2::<f64>::zeros((4, 3));
        let result = shift_phase(&density, coords.view(), 1.0, 0.0);
        assert!(matches!(result, Err(SimulationError::Unsupported(_))));
    }
}
