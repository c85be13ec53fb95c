//! Contrast transfer function of the electron-optical system.

use ndarray::Array2;
use once_cell::sync::Lazy;
use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::config::InstrumentConfig;
use crate::error::SimulationError;
use crate::fft::fftfreq;

/// Aberration and contrast parameters of the objective lens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CtfParameters {
    /// Defocus along the major astigmatism axis, in angstroms. Positive is
    /// underfocus.
    pub defocus_u_in_angstroms: f64,
    /// Defocus along the minor astigmatism axis, in angstroms.
    pub defocus_v_in_angstroms: f64,
    /// Azimuth of the major axis, in degrees.
    pub astigmatism_angle_in_degrees: f64,
    /// Spherical aberration coefficient, in millimeters.
    pub spherical_aberration_in_mm: f64,
    /// Fraction of amplitude contrast, in [0, 1].
    pub amplitude_contrast_ratio: f64,
    /// Additional constant phase shift, in degrees.
    pub phase_shift_in_degrees: f64,
    /// Envelope B factor in square angstroms; zero leaves the envelope at
    /// unity.
    pub b_factor: f64,
}

impl CtfParameters {
    pub fn new(
        defocus_u_in_angstroms: f64,
        defocus_v_in_angstroms: f64,
        astigmatism_angle_in_degrees: f64,
        spherical_aberration_in_mm: f64,
        amplitude_contrast_ratio: f64,
        phase_shift_in_degrees: f64,
    ) -> Result<Self, SimulationError> {
        if !(0.0..=1.0).contains(&amplitude_contrast_ratio)
            || !amplitude_contrast_ratio.is_finite()
        {
            return Err(SimulationError::InvalidParameter {
                field: "amplitude_contrast_ratio",
                constraint: "in [0, 1]",
                value: amplitude_contrast_ratio,
            });
        }
        if !spherical_aberration_in_mm.is_finite() || spherical_aberration_in_mm < 0.0 {
            return Err(SimulationError::InvalidParameter {
                field: "spherical_aberration_in_mm",
                constraint: "non-negative and finite",
                value: spherical_aberration_in_mm,
            });
        }
        Ok(Self {
            defocus_u_in_angstroms,
            defocus_v_in_angstroms,
            astigmatism_angle_in_degrees,
            spherical_aberration_in_mm,
            amplitude_contrast_ratio,
            phase_shift_in_degrees,
            b_factor: 0.0,
        })
    }

    /// Replace the envelope B factor.
    pub fn with_b_factor(mut self, b_factor: f64) -> Result<Self, SimulationError> {
        if !(b_factor >= 0.0) || !b_factor.is_finite() {
            return Err(SimulationError::InvalidParameter {
                field: "b_factor",
                constraint: "non-negative and finite",
                value: b_factor,
            });
        }
        self.b_factor = b_factor;
        Ok(self)
    }

    /// Non-astigmatic parameters with a single defocus value.
    pub fn with_defocus(
        defocus_in_angstroms: f64,
        spherical_aberration_in_mm: f64,
        amplitude_contrast_ratio: f64,
    ) -> Result<Self, SimulationError> {
        Self::new(
            defocus_in_angstroms,
            defocus_in_angstroms,
            0.0,
            spherical_aberration_in_mm,
            amplitude_contrast_ratio,
            0.0,
        )
    }
}

/// Typical single-particle imaging conditions.
pub static UNDERFOCUS_1UM: Lazy<CtfParameters> = Lazy::new(|| {
    CtfParameters::with_defocus(10_000.0, 2.7, 0.07).expect("preset parameters are valid")
});

/// Evaluate the transfer function on the padded Fourier grid.
///
/// At frequency radius `k` (1/A) and azimuth `theta`,
///
/// ```text
/// chi = pi * lambda * k^2 * d(theta) - pi/2 * Cs * lambda^3 * k^4 + phase
/// d   = (d_u + d_v + (d_u - d_v) cos 2(theta - theta_a)) / 2
/// ctf = exp(-B k^2 / 4) * (sqrt(1 - alpha^2) sin chi + alpha cos chi)
/// ```
///
/// so a zero-aberration system with B = 0 reduces to the constant `alpha`
/// and a pure phase system (alpha = 0) to the enveloped `sin chi`.
pub fn compute_ctf(instrument: &InstrumentConfig, params: &CtfParameters) -> Array2<f64> {
    let shape = instrument.padded_shape;
    let wavelength = instrument.wavelength_in_angstroms();
    let ky = fftfreq(shape.0, instrument.pixel_size);
    let kx = fftfreq(shape.1, instrument.pixel_size);

    let cs = params.spherical_aberration_in_mm * 1.0e7; // mm -> A
    let alpha = params.amplitude_contrast_ratio;
    let phase_contrast = (1.0 - alpha * alpha).sqrt();
    let astigmatism_angle = params.astigmatism_angle_in_degrees.to_radians();
    let phase_shift = params.phase_shift_in_degrees.to_radians();
    let defocus_sum = params.defocus_u_in_angstroms + params.defocus_v_in_angstroms;
    let defocus_diff = params.defocus_u_in_angstroms - params.defocus_v_in_angstroms;

    Array2::from_shape_fn(shape, |(iy, ix)| {
        let k_sq = kx[ix] * kx[ix] + ky[iy] * ky[iy];
        let azimuth = ky[iy].atan2(kx[ix]);
        let defocus =
            0.5 * (defocus_sum + defocus_diff * (2.0 * (azimuth - astigmatism_angle)).cos());
        let chi = PI * wavelength * k_sq * defocus
            - 0.5 * PI * cs * wavelength.powi(3) * k_sq * k_sq
            + phase_shift;
        let envelope = (-params.b_factor * k_sq / 4.0).exp();
        envelope * (phase_contrast * chi.sin() + alpha * chi.cos())
    })
}

/// The optical system applied to the scattered image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Optics {
    /// Identity transfer function, for pipelines without CTF effects.
    Null,
    Ctf(CtfParameters),
}

impl Optics {
    /// Multiply a Fourier image by the transfer function.
    pub fn apply(
        &self,
        image: &Array2<Complex64>,
        instrument: &InstrumentConfig,
    ) -> Result<Array2<Complex64>, SimulationError> {
        match self {
            Optics::Null => Ok(image.clone()),
            Optics::Ctf(params) => {
                if image.dim() != instrument.padded_shape {
                    return Err(SimulationError::ShapeMismatch {
                        expected: instrument.padded_shape,
                        actual: image.dim(),
                    });
                }
                let ctf = compute_ctf(instrument, params);
                Ok(image * &ctf.mapv(|v| Complex64::new(v, 0.0)))
            }
        }
    }
}
