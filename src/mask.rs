//! Real-space masks applied multiplicatively before detection.

use ndarray::Array2;

use crate::config::InstrumentConfig;
use crate::error::SimulationError;

/// Soft-edged circular aperture suppressing signal at the image periphery.
///
/// Unity inside `radius`, cosine rolloff over `rolloff_width`, zero beyond.
/// Distances are measured in angstroms from the image center on the padded
/// grid. A compute-once value object.
#[derive(Debug, Clone, PartialEq)]
pub struct CircularMask {
    array: Array2<f64>,
    radius: f64,
    rolloff_width: f64,
}

impl CircularMask {
    /// Build a mask of the padded shape.
    pub fn new(
        instrument: &InstrumentConfig,
        radius: f64,
        rolloff_width: f64,
    ) -> Result<Self, SimulationError> {
        if !(radius > 0.0) || !radius.is_finite() {
            return Err(SimulationError::InvalidParameter {
                field: "radius",
                constraint: "positive and finite",
                value: radius,
            });
        }
        if !(rolloff_width >= 0.0) || !rolloff_width.is_finite() {
            return Err(SimulationError::InvalidParameter {
                field: "rolloff_width",
                constraint: "non-negative and finite",
                value: rolloff_width,
            });
        }

        let (ny, nx) = instrument.padded_shape;
        let center_y = (ny as f64 - 1.0) / 2.0;
        let center_x = (nx as f64 - 1.0) / 2.0;
        let array = Array2::from_shape_fn((ny, nx), |(iy, ix)| {
            let dy = (iy as f64 - center_y) * instrument.pixel_size;
            let dx = (ix as f64 - center_x) * instrument.pixel_size;
            let distance = dy.hypot(dx);
            if distance <= radius {
                1.0
            } else if rolloff_width > 0.0 && distance < radius + rolloff_width {
                0.5 * (1.0
                    + (std::f64::consts::PI * (distance - radius) / rolloff_width).cos())
            } else {
                0.0
            }
        });
        Ok(Self {
            array,
            radius,
            rolloff_width,
        })
    }

    /// The precomputed mask values.
    pub fn array(&self) -> &Array2<f64> {
        &self.array
    }

    /// Multiply a real-space image by the mask.
    pub fn apply(&self, image: &Array2<f64>) -> Result<Array2<f64>, SimulationError> {
        if image.dim() != self.array.dim() {
            return Err(SimulationError::ShapeMismatch {
                expected: self.array.dim(),
                actual: image.dim(),
            });
        }
        Ok(image * &self.array)
    }
}
