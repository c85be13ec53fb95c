//! Projection of a 3-D density onto a 2-D Fourier-space image.
//!
//! Both projectors evaluate the same physical quantity, the line integral
//! of the density along the viewing (z) axis expressed on the padded
//! Fourier grid,
//!
//! ```text
//! F(k) = sum_j w_j * B_j(|k|) * exp(-2 pi i (kx x_j + ky y_j))
//! ```
//!
//! where `B_j` is the atom's form factor: unity for the nonuniform-FFT
//! projector (point atoms) and a Gaussian envelope for the mixture
//! renderer. The two agree as the blob width shrinks and the gridding
//! accuracy grows.

mod gaussians;
mod nufft;

pub use gaussians::project_with_gaussians;
pub use nufft::project_with_nufft;

use ndarray::Array2;
use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::config::InstrumentConfig;
use crate::density::ElectronDensity;
use crate::error::SimulationError;

/// Parameters of the nonuniform-FFT projector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NufftScattering {
    /// Requested relative accuracy of the gridding transform.
    pub eps: f64,
}

impl Default for NufftScattering {
    fn default() -> Self {
        Self { eps: 1e-6 }
    }
}

/// Parameters of the Gaussian-mixture renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaussianScattering {
    /// Default blob standard deviation in angstroms, used for atoms that
    /// carry no per-atom variance.
    pub scale: f64,
}

impl Default for GaussianScattering {
    fn default() -> Self {
        Self { scale: 0.5 }
    }
}

/// Projection algorithm selection for one exposure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ScatteringConfig {
    Nufft(NufftScattering),
    GaussianMixture(GaussianScattering),
}

impl Default for ScatteringConfig {
    fn default() -> Self {
        ScatteringConfig::Nufft(NufftScattering::default())
    }
}

/// Project a posed density onto the padded Fourier grid.
///
/// Grid densities would require Fourier-slice extraction, which is not
/// implemented; they are rejected rather than approximated.
pub fn project(
    density: &ElectronDensity,
    config: &ScatteringConfig,
    instrument: &InstrumentConfig,
) -> Result<Array2<Complex64>, SimulationError> {
    let cloud = match density {
        ElectronDensity::AtomCloud(cloud) => cloud,
        ElectronDensity::VoxelGrid(_) => {
            return Err(SimulationError::Unsupported(
                "fourier-slice projection of voxel grids",
            ))
        }
    };
    match config {
        ScatteringConfig::Nufft(params) => project_with_nufft(cloud, params, instrument),
        ScatteringConfig::GaussianMixture(params) => {
            project_with_gaussians(cloud, params, instrument)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::density::{AtomCloud, VoxelGrid};
    use approx::assert_relative_eq;
    use ndarray::{array, Array3};

    fn instrument() -> InstrumentConfig {
        InstrumentConfig::new((32, 32), 1.0, 300.0, 1.0).unwrap()
    }

    fn single_atom() -> AtomCloud {
        AtomCloud::new(
            array![[1.5, -2.25, 0.7]],
            array![2.0],
            None,
            None,
            true,
        )
        .unwrap()
    }

    #[test]
    fn test_voxel_grid_projection_unsupported() {
        let grid = VoxelGrid::new(Array3::<f64>::ones((4, 4, 4)), 1.0, true).unwrap();
        let result = project(
            &ElectronDensity::VoxelGrid(grid),
            &ScatteringConfig::default(),
            &instrument(),
        );
        assert!(matches!(result, Err(SimulationError::Unsupported(_))));
    }

    #[test]
    fn test_methods_agree_on_a_point_atom() {
        let instrument = instrument();
        let density = ElectronDensity::AtomCloud(single_atom());

        let nufft = project(
            &density,
            &ScatteringConfig::Nufft(NufftScattering { eps: 1e-6 }),
            &instrument,
        )
        .unwrap();
        let gaussians = project(
            &density,
            &ScatteringConfig::GaussianMixture(GaussianScattering { scale: 0.04 }),
            &instrument,
        )
        .unwrap();

        // Peak amplitude is the atom weight at the zero frequency.
        assert_relative_eq!(nufft[[0, 0]].re, 2.0, epsilon = 1e-4);

        let peak = nufft
            .iter()
            .map(|v| v.norm())
            .fold(0.0f64, f64::max);
        let worst = nufft
            .iter()
            .zip(gaussians.iter())
            .map(|(a, b)| (a - b).norm())
            .fold(0.0f64, f64::max);
        assert!(
            worst < 0.02 * peak,
            "projectors disagree: {worst:.4e} vs peak {peak:.4e}"
        );
    }
}
