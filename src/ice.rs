//! Stochastic solvent (ice) background added to the scattered image.

use ndarray::Array2;
use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::config::InstrumentConfig;
use crate::error::SimulationError;
use crate::fft::{fft2_real, radial_frequency_grid};
use crate::noise::normal_noise_field;

/// Solvent background with Fourier amplitude falling off exponentially in
/// frequency radius.
///
/// White Gaussian noise is drawn in real space, transformed, and shaped by
/// the envelope `amplitude * exp(-|k| * decay_scale)`, so the background is
/// Hermitian by construction and its real-space counterpart is real.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExponentialIce {
    /// Background amplitude at zero frequency, per Fourier mode.
    pub amplitude: f64,
    /// Envelope decay length in angstroms.
    pub decay_scale: f64,
}

impl ExponentialIce {
    pub fn new(amplitude: f64, decay_scale: f64) -> Result<Self, SimulationError> {
        if !(amplitude >= 0.0) || !amplitude.is_finite() {
            return Err(SimulationError::InvalidParameter {
                field: "amplitude",
                constraint: "non-negative and finite",
                value: amplitude,
            });
        }
        if !(decay_scale >= 0.0) || !decay_scale.is_finite() {
            return Err(SimulationError::InvalidParameter {
                field: "decay_scale",
                constraint: "non-negative and finite",
                value: decay_scale,
            });
        }
        Ok(Self {
            amplitude,
            decay_scale,
        })
    }

    /// Draw one background realization on the padded Fourier grid.
    pub fn sample(&self, instrument: &InstrumentConfig, seed: u64) -> Array2<Complex64> {
        let shape = instrument.padded_shape;
        let white = normal_noise_field(shape, 0.0, 1.0, seed);
        let spectrum = fft2_real(&white);
        let radii = radial_frequency_grid(shape, instrument.pixel_size);
        // The white spectrum has per-mode magnitude sqrt(N); rescale so the
        // envelope parameterizes the per-mode standard deviation.
        let scale = 1.0 / (instrument.n_pixels() as f64).sqrt();
        let mut shaped = spectrum;
        for (index, value) in shaped.indexed_iter_mut() {
            let envelope = self.amplitude * (-radii[index] * self.decay_scale).exp();
            *value *= envelope * scale;
        }
        shaped
    }
}

/// The solvent model for one exposure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Ice {
    /// No solvent contribution.
    Null,
    Exponential(ExponentialIce),
}

impl Ice {
    /// Add the solvent contribution to a Fourier image.
    pub fn contribute(
        &self,
        image: &Array2<Complex64>,
        instrument: &InstrumentConfig,
        seed: u64,
    ) -> Result<Array2<Complex64>, SimulationError> {
        match self {
            Ice::Null => Ok(image.clone()),
            Ice::Exponential(ice) => {
                if image.dim() != instrument.padded_shape {
                    return Err(SimulationError::ShapeMismatch {
                        expected: instrument.padded_shape,
                        actual: image.dim(),
                    });
                }
                Ok(image + &ice.sample(instrument, seed))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fft::ifft2;
    use approx::assert_relative_eq;

    fn instrument() -> InstrumentConfig {
        InstrumentConfig::new((32, 32), 1.0, 300.0, 1.0).unwrap()
    }

    #[test]
    fn test_null_ice_is_identity() {
        let instrument = instrument();
        let image = Array2::from_elem(instrument.padded_shape, Complex64::new(1.0, -0.5));
        let out = Ice::Null.contribute(&image, &instrument, 3).unwrap();
        assert_eq!(out, image);
    }

    #[test]
    fn test_background_is_real_in_real_space() {
        let instrument = instrument();
        let ice = ExponentialIce::new(2.0, 1.5).unwrap();
        let spectrum = ice.sample(&instrument, 11);
        let real_space = ifft2(&spectrum);
        for value in real_space.iter() {
            assert_relative_eq!(value.im, 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_sampling_is_deterministic() {
        let instrument = instrument();
        let ice = ExponentialIce::new(1.0, 0.5).unwrap();
        assert_eq!(ice.sample(&instrument, 5), ice.sample(&instrument, 5));
        assert_ne!(ice.sample(&instrument, 5), ice.sample(&instrument, 6));
    }

    #[test]
    fn test_envelope_attenuates_high_frequencies() {
        let instrument = instrument();
        let ice = ExponentialIce::new(1.0, 10.0).unwrap();
        let spectrum = ice.sample(&instrument, 21);
        let radii = radial_frequency_grid(instrument.padded_shape, instrument.pixel_size);

        // Mean magnitude in a low-frequency band vs a high-frequency band;
        // the decay scale of 10 A suppresses the latter by more than 10x.
        let band_mean = |lo: f64, hi: f64| {
            let mut sum = 0.0;
            let mut count = 0usize;
            for (index, value) in spectrum.indexed_iter() {
                if radii[index] >= lo && radii[index] < hi {
                    sum += value.norm();
                    count += 1;
                }
            }
            sum / count as f64
        };
        let low = band_mean(0.0, 0.1);
        let high = band_mean(0.4, 0.8);
        assert!(high < 0.1 * low, "high band {high:.3e}, low band {low:.3e}");
    }

    #[test]
    fn test_rejects_bad_parameters() {
        assert!(ExponentialIce::new(-1.0, 1.0).is_err());
        assert!(ExponentialIce::new(1.0, f64::NAN).is_err());
    }
}
