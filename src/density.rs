//! Specimen scattering-potential representations.
//!
//! A density is either a point cloud of atoms or a voxel grid sampled on a
//! 3-D lattice. Transforms are functional updates: a new instance is
//! returned and untouched fields are shared by clone, never mutated.

use ndarray::{Array1, Array2, Array3, ArrayView2};

use crate::error::SimulationError;
use crate::pose::Pose;

/// Point cloud of atoms with per-atom scattering weights.
#[derive(Debug, Clone)]
pub struct AtomCloud {
    /// Atom positions, `(N, 3)`, in angstroms.
    pub coordinates: Array2<f64>,
    /// Scattering strength per atom, `(N,)`.
    pub weights: Array1<f64>,
    /// Optional per-atom Gaussian variance in square angstroms, used by the
    /// Gaussian-mixture projector in place of its configured default width.
    pub variances: Option<Array1<f64>>,
    /// Optional atom species labels, `(N,)`.
    pub identity: Option<Array1<u32>>,
}

impl AtomCloud {
    /// Build a point-cloud density.
    ///
    /// `is_real` must be true: Fourier-space atomic densities are rejected
    /// here, before any numeric work.
    pub fn new(
        coordinates: Array2<f64>,
        weights: Array1<f64>,
        variances: Option<Array1<f64>>,
        identity: Option<Array1<u32>>,
        is_real: bool,
    ) -> Result<Self, SimulationError> {
        if !is_real {
            return Err(SimulationError::Unsupported(
                "Fourier-space atomic densities",
            ));
        }
        let n = coordinates.nrows();
        if coordinates.ncols() != 3 {
            return Err(SimulationError::LengthMismatch {
                context: "atom coordinate columns",
                expected: 3,
                actual: coordinates.ncols(),
            });
        }
        if weights.len() != n {
            return Err(SimulationError::LengthMismatch {
                context: "atom weights",
                expected: n,
                actual: weights.len(),
            });
        }
        if let Some(variances) = &variances {
            if variances.len() != n {
                return Err(SimulationError::LengthMismatch {
                    context: "atom variances",
                    expected: n,
                    actual: variances.len(),
                });
            }
        }
        if let Some(identity) = &identity {
            if identity.len() != n {
                return Err(SimulationError::LengthMismatch {
                    context: "atom identity",
                    expected: n,
                    actual: identity.len(),
                });
            }
        }
        Ok(Self {
            coordinates,
            weights,
            variances,
            identity,
        })
    }

    /// Number of atoms.
    pub fn len(&self) -> usize {
        self.coordinates.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply a pose, returning a new cloud with transformed coordinates.
    pub fn rotate_to(&self, pose: &Pose) -> Result<Self, SimulationError> {
        let coordinates = pose.transform_coordinates(self.coordinates.view())?;
        Ok(Self {
            coordinates,
            weights: self.weights.clone(),
            variances: self.variances.clone(),
            identity: self.identity.clone(),
        })
    }

    /// Load a cloud from an on-disk model. Parsing lives outside this crate;
    /// the operation exists so the boundary fails loudly rather than
    /// silently.
    pub fn from_file(_path: &str) -> Result<Self, SimulationError> {
        Err(SimulationError::Unsupported(
            "loading atomic models from files",
        ))
    }

    /// Combine several clouds into a stacked density.
    pub fn from_stack(_stack: Vec<Self>) -> Result<Self, SimulationError> {
        Err(SimulationError::Unsupported("stacking electron densities"))
    }

    /// Select one member of a stacked density.
    pub fn index(&self, _index: usize) -> Result<Self, SimulationError> {
        Err(SimulationError::Unsupported(
            "indexing into electron density stacks",
        ))
    }
}

/// Density sampled on a regular 3-D lattice.
///
/// Values are stored flattened in row-major order alongside the lattice
/// point coordinates, so rigid transforms act on grids exactly as they act
/// on clouds.
#[derive(Debug, Clone)]
pub struct VoxelGrid {
    /// Sample values, `(N,)` with `N = shape.0 * shape.1 * shape.2`.
    pub values: Array1<f64>,
    /// Lattice point positions, `(N, 3)`, in angstroms.
    pub coordinates: Array2<f64>,
    /// Lattice dimensions `(nz, ny, nx)`.
    pub shape: (usize, usize, usize),
    /// Whether the samples live in real space.
    pub is_real: bool,
}

impl VoxelGrid {
    /// Build a grid density from lattice samples and a voxel size in
    /// angstroms. The lattice is centered on the origin.
    pub fn new(values: Array3<f64>, voxel_size: f64, is_real: bool) -> Result<Self, SimulationError> {
        if !(voxel_size > 0.0) || !voxel_size.is_finite() {
            return Err(SimulationError::InvalidParameter {
                field: "voxel_size",
                constraint: "positive and finite",
                value: voxel_size,
            });
        }
        let (nz, ny, nx) = values.dim();
        let center = |n: usize, i: usize| (i as f64 - (n as f64 - 1.0) / 2.0) * voxel_size;
        let mut coordinates = Array2::<f64>::zeros((nz * ny * nx, 3));
        let mut row = 0;
        for iz in 0..nz {
            for iy in 0..ny {
                for ix in 0..nx {
                    coordinates[[row, 0]] = center(nx, ix);
                    coordinates[[row, 1]] = center(ny, iy);
                    coordinates[[row, 2]] = center(nz, iz);
                    row += 1;
                }
            }
        }
        let flattened = Array1::from_iter(values.iter().copied());
        Ok(Self {
            values: flattened,
            coordinates,
            shape: (nz, ny, nx),
            is_real,
        })
    }

    /// Number of lattice points.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Apply a pose, returning a new grid with transformed lattice points.
    pub fn rotate_to(&self, pose: &Pose) -> Result<Self, SimulationError> {
        let coordinates = pose.transform_coordinates(self.coordinates.view())?;
        Ok(Self {
            values: self.values.clone(),
            coordinates,
            shape: self.shape,
            is_real: self.is_real,
        })
    }
}

/// The specimen representation consumed by the projector.
#[derive(Debug, Clone)]
pub enum ElectronDensity {
    AtomCloud(AtomCloud),
    VoxelGrid(VoxelGrid),
}

impl ElectronDensity {
    /// Whether the representation lives in real space.
    pub fn is_real(&self) -> bool {
        match self {
            ElectronDensity::AtomCloud(_) => true,
            ElectronDensity::VoxelGrid(grid) => grid.is_real,
        }
    }

    /// Apply a pose, returning a new density.
    pub fn rotate_to(&self, pose: &Pose) -> Result<Self, SimulationError> {
        match self {
            ElectronDensity::AtomCloud(cloud) => {
                Ok(ElectronDensity::AtomCloud(cloud.rotate_to(pose)?))
            }
            ElectronDensity::VoxelGrid(grid) => {
                Ok(ElectronDensity::VoxelGrid(grid.rotate_to(pose)?))
            }
        }
    }

    /// Coordinates of the underlying points, `(N, 3)`.
    pub fn coordinates(&self) -> ArrayView2<f64> {
        match self {
            ElectronDensity::AtomCloud(cloud) => cloud.coordinates.view(),
            ElectronDensity::VoxelGrid(grid) => grid.coordinates.view(),
        }
    }
}
