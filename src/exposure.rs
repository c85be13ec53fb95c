//! Dose-dependent rescaling of the pre-noise image.
//!
//! The detector owns the conversion from squared wavefunction to electron
//! counts, so the exposure stage works in squared-wavefunction units: it
//! scales the scattering contrast and pins the vacuum baseline (the
//! real-space mean) through the zero-frequency component. This re-centering
//! changes image statistics, not just scale, and is covered by tests.

use ndarray::Array2;
use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::SimulationError;

/// Set the real-space mean and standard deviation of a Fourier image.
///
/// The mean lives entirely in the DC component and the standard deviation
/// in the non-DC energy (Parseval), so both are adjusted without leaving
/// Fourier space. An image with no contrast keeps zero standard deviation.
pub fn rescale_image(
    image: &Array2<Complex64>,
    std_dev: f64,
    mean: f64,
) -> Result<Array2<Complex64>, SimulationError> {
    if !(std_dev >= 0.0) || !std_dev.is_finite() {
        return Err(SimulationError::InvalidParameter {
            field: "std_dev",
            constraint: "non-negative and finite",
            value: std_dev,
        });
    }
    let n_pixels = image.len() as f64;
    let non_dc_energy: f64 = image
        .indexed_iter()
        .filter(|((iy, ix), _)| !(*iy == 0 && *ix == 0))
        .map(|(_, v)| v.norm_sqr())
        .sum();
    let current_std = non_dc_energy.sqrt() / n_pixels;

    let scale = if current_std > 0.0 {
        std_dev / current_std
    } else {
        0.0
    };
    let mut out = image.mapv(|v| v * scale);
    out[[0, 0]] = Complex64::new(mean * n_pixels, 0.0);
    Ok(out)
}

/// Spatially uniform exposure model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UniformExposure {
    /// Multiplier applied to the scattering contrast.
    pub scale: f64,
    /// Vacuum baseline added to the real-space mean.
    pub offset: f64,
}

impl UniformExposure {
    pub fn new(scale: f64, offset: f64) -> Self {
        Self { scale, offset }
    }

    /// Unit vacuum baseline with unmodified contrast: the squared
    /// wavefunction handed to the detector averages to one in vacuum.
    pub fn vacuum_normalized() -> Self {
        Self::new(1.0, 1.0)
    }
}

impl Default for UniformExposure {
    fn default() -> Self {
        Self::vacuum_normalized()
    }
}

/// The exposure model for one simulated image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Exposure {
    /// Identity.
    Null,
    Uniform(UniformExposure),
}

impl Exposure {
    /// Rescale a Fourier image according to the dose model.
    pub fn apply(
        &self,
        image: &Array2<Complex64>,
    ) -> Result<Array2<Complex64>, SimulationError> {
        match self {
            Exposure::Null => Ok(image.clone()),
            Exposure::Uniform(exposure) => {
                let n_pixels = image.len() as f64;
                let mut out = image.mapv(|v| v * exposure.scale);
                out[[0, 0]] += Complex64::new(exposure.offset * n_pixels, 0.0);
                Ok(out)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fft::{fft2_real, ifft2_real};
    use crate::noise::normal_noise_field;
    use approx::assert_relative_eq;
    use ndarray::Array2;

    #[test]
    fn test_null_exposure_is_identity() {
        let image = Array2::from_elem((8, 8), Complex64::new(2.0, 1.0));
        let out = Exposure::Null.apply(&image).unwrap();
        assert_eq!(out, image);
    }

    #[test]
    fn test_rescale_image_sets_mean_and_std() {
        let real = normal_noise_field((24, 24), 4.0, 3.0, 99);
        let spectrum = fft2_real(&real);
        let rescaled = rescale_image(&spectrum, 2.0, 7.0).unwrap();
        let out = ifft2_real(&rescaled);
        assert_relative_eq!(out.mean().unwrap(), 7.0, epsilon = 1e-9);
        assert_relative_eq!(out.std(0.0), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rescale_flat_image_keeps_zero_contrast() {
        let spectrum = fft2_real(&Array2::from_elem((8, 8), 5.0));
        let rescaled = rescale_image(&spectrum, 3.0, 1.0).unwrap();
        let out = ifft2_real(&rescaled);
        assert_relative_eq!(out.mean().unwrap(), 1.0, epsilon = 1e-10);
        assert_relative_eq!(out.std(0.0), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_rescale_rejects_negative_std() {
        let spectrum = Array2::<Complex64>::zeros((4, 4));
        assert!(rescale_image(&spectrum, -1.0, 0.0).is_err());
    }

    #[test]
    fn test_uniform_exposure_adds_vacuum_baseline() {
        // A zero projection (pure vacuum) acquires a real-space mean of one.
        let spectrum = Array2::<Complex64>::zeros((16, 16));
        let out = Exposure::Uniform(UniformExposure::vacuum_normalized())
            .apply(&spectrum)
            .unwrap();
        let real = ifft2_real(&out);
        for value in real.iter() {
            assert_relative_eq!(*value, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_uniform_exposure_scales_contrast_around_baseline() {
        let real = normal_noise_field((16, 16), 0.0, 0.1, 5);
        let spectrum = fft2_real(&real);
        let out = Exposure::Uniform(UniformExposure::new(2.0, 1.0))
            .apply(&spectrum)
            .unwrap();
        let image = ifft2_real(&out);
        let expected_mean = 1.0 + 2.0 * real.mean().unwrap();
        assert_relative_eq!(image.mean().unwrap(), expected_mean, epsilon = 1e-9);
        assert_relative_eq!(image.std(0.0), 2.0 * real.std(0.0), epsilon = 1e-9);
    }
}
