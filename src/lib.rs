//! Synthetic cryo-electron-microscopy image simulation
//!
//! This crate builds 2-D micrograph patches from a 3-D specimen model:
//! a rigid pose maps the specimen into the viewing frame, a projector
//! integrates it along the optical axis onto a Fourier grid, filters and
//! the contrast transfer function shape the spectrum, an exposure model
//! sets the dose baseline, and a detector model injects electron-counting
//! noise. Every stage is a pure function of its inputs and an explicit
//! seed, so exposures are reproducible and trivially parallel.

pub mod config;
pub mod density;
pub mod detector;
pub mod error;
pub mod exposure;
pub mod fft;
pub mod filters;
pub mod ice;
pub mod mask;
pub mod noise;
pub mod optics;
pub mod pose;
pub mod rotations;
pub mod scattering;
pub mod state;

// Re-exports for easier access
pub use config::InstrumentConfig;
pub use density::{AtomCloud, ElectronDensity, VoxelGrid};
pub use detector::{Detector, Dqe, DqeTable, GaussianDetector, PoissonDetector};
pub use error::SimulationError;
pub use exposure::{rescale_image, Exposure, UniformExposure};
pub use filters::{AntiAliasingFilter, Filter, WhiteningFilter};
pub use ice::{ExponentialIce, Ice};
pub use mask::CircularMask;
pub use optics::{compute_ctf, CtfParameters, Optics};
pub use pose::{EulerPose, Pose, QuaternionPose};
pub use rotations::{convert_euler_angles_to_quaternion, convert_quaternion_to_euler_angles};
pub use scattering::{
    project, GaussianScattering, NufftScattering, ScatteringConfig,
};
pub use state::{simulate, simulate_batch, simulate_fourier, ParameterState};
