//! The assembled imaging pipeline for one exposure.

use ndarray::Array2;
use rayon::prelude::*;
use rustfft::num_complex::Complex64;

use crate::config::InstrumentConfig;
use crate::density::ElectronDensity;
use crate::detector::Detector;
use crate::error::SimulationError;
use crate::exposure::Exposure;
use crate::fft::ifft2_real;
use crate::filters::Filter;
use crate::ice::Ice;
use crate::mask::CircularMask;
use crate::optics::Optics;
use crate::pose::Pose;
use crate::scattering::ScatteringConfig;

/// Seed offset separating the solvent draw from the detector draw within
/// one exposure.
const ICE_SEED_OFFSET: u64 = 0x9e37_79b9_7f4a_7c15;

/// Everything varying per exposure: the pose and the stochastic and optical
/// models. Aggregation only; the physics lives in the member types.
#[derive(Debug, Clone)]
pub struct ParameterState {
    pub pose: Pose,
    pub scattering: ScatteringConfig,
    pub ice: Ice,
    pub optics: Optics,
    pub exposure: Exposure,
    pub detector: Detector,
}

/// Run the image-formation pipeline, returning the Fourier-space detector
/// readout at the padded shape.
///
/// Stages: pose transform, projection, frequency filters, solvent, optics,
/// exposure, real-space mask, detector. The whole computation is a pure
/// function of its inputs and the seed.
pub fn simulate_fourier(
    density: &ElectronDensity,
    state: &ParameterState,
    instrument: &InstrumentConfig,
    filters: &[Filter],
    mask: Option<&CircularMask>,
    seed: u64,
) -> Result<Array2<Complex64>, SimulationError> {
    tracing::debug!(
        padded_shape = ?instrument.padded_shape,
        n_filters = filters.len(),
        "simulating exposure"
    );

    let posed = density.rotate_to(&state.pose)?;
    let mut fourier = crate::scattering::project(&posed, &state.scattering, instrument)?;

    for filter in filters {
        fourier = filter.apply(&fourier)?;
    }
    fourier = state
        .ice
        .contribute(&fourier, instrument, seed.wrapping_add(ICE_SEED_OFFSET))?;
    fourier = state.optics.apply(&fourier, instrument)?;
    fourier = state.exposure.apply(&fourier)?;

    if let Some(mask) = mask {
        let masked = mask.apply(&ifft2_real(&fourier))?;
        fourier = crate::fft::fft2_real(&masked);
    }

    state.detector.compute_readout(seed, &fourier, instrument)
}

/// Run the pipeline and return the real-space noisy image at the padded
/// shape. Callers crop to the detector shape if desired.
pub fn simulate(
    density: &ElectronDensity,
    state: &ParameterState,
    instrument: &InstrumentConfig,
    filters: &[Filter],
    mask: Option<&CircularMask>,
    seed: u64,
) -> Result<Array2<f64>, SimulationError> {
    Ok(ifft2_real(&simulate_fourier(
        density, state, instrument, filters, mask, seed,
    )?))
}

/// Simulate a batch of independent exposures, one per pose.
///
/// Items are evaluated in parallel; item `i` uses seed `base_seed + i`, so
/// the batch is reproducible and identical to running the items serially.
pub fn simulate_batch(
    density: &ElectronDensity,
    poses: &[Pose],
    state: &ParameterState,
    instrument: &InstrumentConfig,
    filters: &[Filter],
    mask: Option<&CircularMask>,
    base_seed: u64,
) -> Result<Vec<Array2<f64>>, SimulationError> {
    poses
        .par_iter()
        .enumerate()
        .map(|(index, pose)| {
            let state = ParameterState {
                pose: *pose,
                ..state.clone()
            };
            simulate(
                density,
                &state,
                instrument,
                filters,
                mask,
                base_seed.wrapping_add(index as u64),
            )
        })
        .collect()
}
