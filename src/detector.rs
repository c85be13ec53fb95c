//! Electron-counting detector models.
//!
//! A detector converts a Fourier-space squared wavefunction into a noisy
//! readout: the expected image is weighted by the detective quantum
//! efficiency, scaled to electron counts per pixel, sampled pixel-wise
//! under the chosen counting statistics, and transformed back to Fourier
//! space. Both noise models share the expected-count computation, so the
//! Gaussian approximation converges to the exact Poisson statistics as the
//! dose grows.

use ndarray::Array2;
use rand_distr::{Distribution, Normal, Poisson};
use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::config::InstrumentConfig;
use crate::error::SimulationError;
use crate::fft::{fft2_real, ifft2_real, radial_frequency_grid};
use crate::noise::map_with_chunked_rng;

/// Detective quantum efficiency as a function of spatial frequency.
///
/// Frequencies are expressed as a fraction of the Nyquist frequency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Dqe {
    /// Unity at all spatial frequencies.
    Ideal,
    Table(DqeTable),
}

impl Dqe {
    /// Efficiency at a frequency given as a fraction of Nyquist.
    pub fn at(&self, nyquist_fraction: f64) -> f64 {
        match self {
            Dqe::Ideal => 1.0,
            Dqe::Table(table) => table.at(nyquist_fraction),
        }
    }
}

/// Piecewise-linear DQE curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DqeTable {
    frequencies: Vec<f64>,
    values: Vec<f64>,
}

impl DqeTable {
    /// Build a curve from ascending Nyquist-fraction sample points with
    /// efficiencies in [0, 1]. Queries beyond the table clamp to the end
    /// values.
    pub fn from_table(frequencies: Vec<f64>, values: Vec<f64>) -> Result<Self, SimulationError> {
        if frequencies.is_empty() {
            return Err(SimulationError::InvalidParameter {
                field: "frequencies",
                constraint: "non-empty",
                value: 0.0,
            });
        }
        if frequencies.len() != values.len() {
            return Err(SimulationError::LengthMismatch {
                context: "DQE table",
                expected: frequencies.len(),
                actual: values.len(),
            });
        }
        for pair in frequencies.windows(2) {
            if pair[1] <= pair[0] {
                return Err(SimulationError::InvalidParameter {
                    field: "frequencies",
                    constraint: "strictly ascending",
                    value: pair[1],
                });
            }
        }
        for &value in &values {
            if !(0.0..=1.0).contains(&value) || !value.is_finite() {
                return Err(SimulationError::InvalidParameter {
                    field: "values",
                    constraint: "in [0, 1]",
                    value,
                });
            }
        }
        Ok(Self {
            frequencies,
            values,
        })
    }

    fn at(&self, nyquist_fraction: f64) -> f64 {
        let freqs = &self.frequencies;
        if nyquist_fraction <= freqs[0] {
            return self.values[0];
        }
        if nyquist_fraction >= *freqs.last().expect("table is non-empty") {
            return *self.values.last().expect("table is non-empty");
        }
        for i in 0..freqs.len() - 1 {
            if nyquist_fraction <= freqs[i + 1] {
                let fraction =
                    (nyquist_fraction - freqs[i]) / (freqs[i + 1] - freqs[i]);
                return self.values[i] + fraction * (self.values[i + 1] - self.values[i]);
            }
        }
        *self.values.last().expect("table is non-empty")
    }
}

/// Expected electron counts per pixel in real space.
///
/// The Fourier-space squared wavefunction is weighted by the DQE, inverted,
/// and scaled by electrons per pixel. Small negative excursions introduced
/// by upstream filtering are clamped to zero so the counts are valid
/// Poisson means.
fn expected_electron_counts(
    dqe: &Dqe,
    fourier_squared_wavefunction: &Array2<Complex64>,
    instrument: &InstrumentConfig,
) -> Result<Array2<f64>, SimulationError> {
    if fourier_squared_wavefunction.dim() != instrument.padded_shape {
        return Err(SimulationError::ShapeMismatch {
            expected: instrument.padded_shape,
            actual: fourier_squared_wavefunction.dim(),
        });
    }
    let weighted = match dqe {
        Dqe::Ideal => fourier_squared_wavefunction.clone(),
        _ => {
            let radii =
                radial_frequency_grid(instrument.padded_shape, instrument.pixel_size);
            let nyquist = instrument.nyquist_frequency();
            let mut out = fourier_squared_wavefunction.clone();
            for (index, value) in out.indexed_iter_mut() {
                *value *= dqe.at(radii[index] / nyquist);
            }
            out
        }
    };
    let electrons_per_pixel = instrument.electrons_per_pixel();
    Ok(ifft2_real(&weighted).mapv(|v| (v * electrons_per_pixel).max(0.0)))
}

/// Detector with Gaussian counting statistics.
///
/// Pixel counts are drawn from a normal distribution with variance equal to
/// the mean (the Poisson-Gaussian shot-noise approximation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianDetector {
    pub dqe: Dqe,
}

impl GaussianDetector {
    pub fn new(dqe: Dqe) -> Self {
        Self { dqe }
    }

    /// Sample a noisy readout, returned in Fourier space.
    pub fn compute_readout(
        &self,
        seed: u64,
        fourier_squared_wavefunction: &Array2<Complex64>,
        instrument: &InstrumentConfig,
    ) -> Result<Array2<Complex64>, SimulationError> {
        let counts =
            expected_electron_counts(&self.dqe, fourier_squared_wavefunction, instrument)?;
        let noisy = map_with_chunked_rng(counts, seed, |mean, rng| {
            if mean > 0.0 {
                let normal = Normal::new(mean, mean.sqrt())
                    .expect("shot noise parameters must be valid (mean > 0)");
                normal.sample(rng)
            } else {
                0.0
            }
        });
        Ok(fft2_real(&noisy))
    }
}

/// Detector with exact Poisson counting statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoissonDetector {
    pub dqe: Dqe,
}

impl PoissonDetector {
    pub fn new(dqe: Dqe) -> Self {
        Self { dqe }
    }

    /// Sample a noisy readout, returned in Fourier space.
    pub fn compute_readout(
        &self,
        seed: u64,
        fourier_squared_wavefunction: &Array2<Complex64>,
        instrument: &InstrumentConfig,
    ) -> Result<Array2<Complex64>, SimulationError> {
        let counts =
            expected_electron_counts(&self.dqe, fourier_squared_wavefunction, instrument)?;
        let noisy = map_with_chunked_rng(counts, seed, |mean, rng| {
            if mean > 0.0 {
                let poisson =
                    Poisson::new(mean).expect("Poisson mean must be valid (mean > 0)");
                poisson.sample(rng)
            } else {
                0.0
            }
        });
        Ok(fft2_real(&noisy))
    }
}

/// The noise model used for one exposure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Detector {
    Gaussian(GaussianDetector),
    Poisson(PoissonDetector),
}

impl Detector {
    /// Sample a noisy readout, returned in Fourier space.
    pub fn compute_readout(
        &self,
        seed: u64,
        fourier_squared_wavefunction: &Array2<Complex64>,
        instrument: &InstrumentConfig,
    ) -> Result<Array2<Complex64>, SimulationError> {
        match self {
            Detector::Gaussian(detector) => {
                detector.compute_readout(seed, fourier_squared_wavefunction, instrument)
            }
            Detector::Poisson(detector) => {
                detector.compute_readout(seed, fourier_squared_wavefunction, instrument)
            }
        }
    }

    /// The DQE curve of the underlying model.
    pub fn dqe(&self) -> &Dqe {
        match self {
            Detector::Gaussian(detector) => &detector.dqe,
            Detector::Poisson(detector) => &detector.dqe,
        }
    }
}
