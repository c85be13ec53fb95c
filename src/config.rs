//! Instrument configuration for a single simulated exposure.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::SimulationError;

/// Geometric and physical constants describing one exposure.
///
/// Images are simulated on the `padded_shape` working grid and cropped to
/// `shape` by the caller; the padding keeps filtering and the contrast
/// transfer function free of wraparound artifacts near the detector edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentConfig {
    /// Detector shape in pixels, (rows, columns).
    pub shape: (usize, usize),
    /// Working shape in pixels, element-wise at least `shape`.
    pub padded_shape: (usize, usize),
    /// Pixel size in angstroms per pixel.
    pub pixel_size: f64,
    /// Accelerating voltage in kilovolts.
    pub voltage_in_kilovolts: f64,
    /// Integrated electron dose in electrons per square angstrom.
    pub electrons_per_angstrom_squared: f64,
}

impl InstrumentConfig {
    /// Create a configuration with no padding (`padded_shape == shape`).
    pub fn new(
        shape: (usize, usize),
        pixel_size: f64,
        voltage_in_kilovolts: f64,
        electrons_per_angstrom_squared: f64,
    ) -> Result<Self, SimulationError> {
        Self::with_padded_shape(
            shape,
            shape,
            pixel_size,
            voltage_in_kilovolts,
            electrons_per_angstrom_squared,
        )
    }

    /// Create a configuration with an explicit padded working shape.
    pub fn with_padded_shape(
        shape: (usize, usize),
        padded_shape: (usize, usize),
        pixel_size: f64,
        voltage_in_kilovolts: f64,
        electrons_per_angstrom_squared: f64,
    ) -> Result<Self, SimulationError> {
        if shape.0 == 0 || shape.1 == 0 {
            return Err(SimulationError::InvalidParameter {
                field: "shape",
                constraint: "non-zero in both dimensions",
                value: 0.0,
            });
        }
        if padded_shape.0 < shape.0 || padded_shape.1 < shape.1 {
            return Err(SimulationError::PaddedShapeTooSmall {
                shape,
                padded: padded_shape,
            });
        }
        if !(pixel_size > 0.0) || !pixel_size.is_finite() {
            return Err(SimulationError::InvalidParameter {
                field: "pixel_size",
                constraint: "positive and finite",
                value: pixel_size,
            });
        }
        if !(voltage_in_kilovolts > 0.0) || !voltage_in_kilovolts.is_finite() {
            return Err(SimulationError::InvalidParameter {
                field: "voltage_in_kilovolts",
                constraint: "positive and finite",
                value: voltage_in_kilovolts,
            });
        }
        if !(electrons_per_angstrom_squared >= 0.0)
            || !electrons_per_angstrom_squared.is_finite()
        {
            return Err(SimulationError::InvalidParameter {
                field: "electrons_per_angstrom_squared",
                constraint: "non-negative and finite",
                value: electrons_per_angstrom_squared,
            });
        }

        Ok(Self {
            shape,
            padded_shape,
            pixel_size,
            voltage_in_kilovolts,
            electrons_per_angstrom_squared,
        })
    }

    /// Create a configuration padded by a linear scale factor (>= 1).
    pub fn with_pad_scale(
        shape: (usize, usize),
        pad_scale: f64,
        pixel_size: f64,
        voltage_in_kilovolts: f64,
        electrons_per_angstrom_squared: f64,
    ) -> Result<Self, SimulationError> {
        if !(pad_scale >= 1.0) || !pad_scale.is_finite() {
            return Err(SimulationError::InvalidParameter {
                field: "pad_scale",
                constraint: "at least 1.0 and finite",
                value: pad_scale,
            });
        }
        let padded = (
            (shape.0 as f64 * pad_scale).round() as usize,
            (shape.1 as f64 * pad_scale).round() as usize,
        );
        Self::with_padded_shape(
            shape,
            padded,
            pixel_size,
            voltage_in_kilovolts,
            electrons_per_angstrom_squared,
        )
    }

    /// Expected electrons per pixel for a uniform incident dose.
    pub fn electrons_per_pixel(&self) -> f64 {
        self.electrons_per_angstrom_squared * self.pixel_size * self.pixel_size
    }

    /// Number of pixels on the padded working grid.
    pub fn n_pixels(&self) -> usize {
        self.padded_shape.0 * self.padded_shape.1
    }

    /// Nyquist frequency of the pixel grid in inverse angstroms.
    pub fn nyquist_frequency(&self) -> f64 {
        0.5 / self.pixel_size
    }

    /// Relativistic electron wavelength in angstroms.
    ///
    /// Uses lambda = 12.2643 / sqrt(V + 0.97845e-6 V^2) with V in volts.
    pub fn wavelength_in_angstroms(&self) -> f64 {
        let volts = self.voltage_in_kilovolts * 1.0e3;
        12.2643 / (volts + 0.97845e-6 * volts * volts).sqrt()
    }
}

/// Standard instrument setups.
pub mod models {
    use super::*;

    /// 300 kV imaging at 1.1 A/px, typical high-resolution data collection.
    pub static KRIOS_300: Lazy<InstrumentConfig> = Lazy::new(|| {
        InstrumentConfig::with_pad_scale((256, 256), 1.25, 1.1, 300.0, 50.0)
            .expect("preset parameters are valid")
    });

    /// 200 kV screening setup at 1.6 A/px.
    pub static TALOS_200: Lazy<InstrumentConfig> = Lazy::new(|| {
        InstrumentConfig::with_pad_scale((192, 192), 1.25, 1.6, 200.0, 40.0)
            .expect("preset parameters are valid")
    });
}
