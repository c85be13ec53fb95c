//! Multiplicative Fourier-space filters, computed once and reused.

use ndarray::Array2;
use rustfft::num_complex::Complex64;

use crate::config::InstrumentConfig;
use crate::error::SimulationError;
use crate::fft::radial_frequency_grid;

/// Default anti-aliasing cutoff as a fraction of Nyquist.
const DEFAULT_CUTOFF: f64 = 0.667;
/// Default rolloff width as a fraction of Nyquist.
const DEFAULT_ROLLOFF: f64 = 0.05;

fn check_shape(
    expected: (usize, usize),
    image: &Array2<Complex64>,
) -> Result<(), SimulationError> {
    if image.dim() != expected {
        return Err(SimulationError::ShapeMismatch {
            expected,
            actual: image.dim(),
        });
    }
    Ok(())
}

/// Radial low-pass attenuating frequencies that would alias when the padded
/// image is cropped back to the detector shape.
///
/// Unity below the cutoff, cosine rolloff across the rolloff band, zero
/// beyond. A pure function of the instrument geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct AntiAliasingFilter {
    array: Array2<f64>,
    cutoff: f64,
    rolloff: f64,
}

impl AntiAliasingFilter {
    /// Build with the default cutoff (0.667 of Nyquist) and rolloff (0.05).
    pub fn new(instrument: &InstrumentConfig) -> Self {
        Self::with_cutoff(instrument, DEFAULT_CUTOFF, DEFAULT_ROLLOFF)
    }

    /// Build with an explicit cutoff and rolloff, both as fractions of the
    /// Nyquist frequency.
    pub fn with_cutoff(instrument: &InstrumentConfig, cutoff: f64, rolloff: f64) -> Self {
        let nyquist = instrument.nyquist_frequency();
        let radii = radial_frequency_grid(instrument.padded_shape, instrument.pixel_size);
        let array = radii.mapv(|radius| {
            let fraction = radius / nyquist;
            if fraction <= cutoff {
                1.0
            } else if rolloff > 0.0 && fraction < cutoff + rolloff {
                0.5 * (1.0 + (std::f64::consts::PI * (fraction - cutoff) / rolloff).cos())
            } else {
                0.0
            }
        });
        Self {
            array,
            cutoff,
            rolloff,
        }
    }

    /// The precomputed filter values.
    pub fn array(&self) -> &Array2<f64> {
        &self.array
    }

    /// Multiply a Fourier image by the filter.
    pub fn apply(
        &self,
        image: &Array2<Complex64>,
    ) -> Result<Array2<Complex64>, SimulationError> {
        check_shape(self.array.dim(), image)?;
        Ok(image * &self.array.mapv(|v| Complex64::new(v, 0.0)))
    }
}

/// Whitening filter flattening a correlated background power spectrum.
///
/// Estimated from the radially averaged power spectrum of a reference
/// Fourier image (typically a noise micrograph): the filter value at a
/// pixel is the reciprocal square root of the interpolated radial power,
/// normalized so the largest value is one. Radial bins with no power pass
/// through unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct WhiteningFilter {
    array: Array2<f64>,
}

impl WhiteningFilter {
    /// Estimate from a reference Fourier image of the padded shape.
    pub fn from_reference(
        reference: &Array2<Complex64>,
        instrument: &InstrumentConfig,
    ) -> Result<Self, SimulationError> {
        check_shape(instrument.padded_shape, reference)?;
        let shape = instrument.padded_shape;
        let radii = radial_frequency_grid(shape, instrument.pixel_size);
        let nyquist = instrument.nyquist_frequency();

        // Radially binned mean power spectrum.
        let n_bins = shape.0.max(shape.1) / 2 + 1;
        let mut power = vec![0.0f64; n_bins];
        let mut counts = vec![0usize; n_bins];
        for (index, value) in reference.indexed_iter() {
            let bin = radial_bin(radii[index], nyquist, n_bins);
            power[bin] += value.norm_sqr();
            counts[bin] += 1;
        }
        for (p, c) in power.iter_mut().zip(counts.iter()) {
            if *c > 0 {
                *p /= *c as f64;
            }
        }

        tracing::debug!(bins = n_bins, shape = ?shape, "estimated whitening profile");

        let mut array = Array2::<f64>::zeros(shape);
        for (index, value) in array.indexed_iter_mut() {
            let bin = radial_bin(radii[index], nyquist, n_bins);
            *value = if power[bin] > 0.0 {
                1.0 / power[bin].sqrt()
            } else {
                1.0
            };
        }
        let peak = array.iter().copied().fold(0.0f64, f64::max);
        if peak > 0.0 {
            array.mapv_inplace(|v| v / peak);
        }
        Ok(Self { array })
    }

    /// The precomputed filter values.
    pub fn array(&self) -> &Array2<f64> {
        &self.array
    }

    /// Multiply a Fourier image by the filter.
    pub fn apply(
        &self,
        image: &Array2<Complex64>,
    ) -> Result<Array2<Complex64>, SimulationError> {
        check_shape(self.array.dim(), image)?;
        Ok(image * &self.array.mapv(|v| Complex64::new(v, 0.0)))
    }
}

fn radial_bin(radius: f64, nyquist: f64, n_bins: usize) -> usize {
    let fraction = (radius / (nyquist * std::f64::consts::SQRT_2)).clamp(0.0, 1.0);
    ((fraction * (n_bins - 1) as f64).round() as usize).min(n_bins - 1)
}

/// A frequency-domain filter selected at runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    AntiAliasing(AntiAliasingFilter),
    Whitening(WhiteningFilter),
}

impl Filter {
    /// The precomputed filter values.
    pub fn array(&self) -> &Array2<f64> {
        match self {
            Filter::AntiAliasing(f) => f.array(),
            Filter::Whitening(f) => f.array(),
        }
    }

    /// Multiply a Fourier image by the filter.
    pub fn apply(
        &self,
        image: &Array2<Complex64>,
    ) -> Result<Array2<Complex64>, SimulationError> {
        match self {
            Filter::AntiAliasing(f) => f.apply(image),
            Filter::Whitening(f) => f.apply(image),
        }
    }
}
