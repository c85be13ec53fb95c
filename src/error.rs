use thiserror::Error;

/// Errors produced while configuring or running the imaging pipeline.
#[derive(Error, Debug)]
pub enum SimulationError {
    /// Rotation convention string failed validation.
    #[error("invalid rotation convention '{convention}': {reason}")]
    InvalidConvention {
        /// The offending convention string.
        convention: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Quaternion norm too close to zero to define a rotation.
    #[error("quaternion norm {norm:.3e} is too small to normalize")]
    DegenerateQuaternion {
        /// Measured norm.
        norm: f64,
    },

    /// A scalar configuration field is out of its valid range.
    #[error("{field} must be {constraint}, got {value}")]
    InvalidParameter {
        /// Name of the offending field.
        field: &'static str,
        /// Human-readable constraint.
        constraint: &'static str,
        /// Value supplied by the caller.
        value: f64,
    },

    /// Padded working shape smaller than the detector shape.
    #[error("padded shape {padded:?} must be at least the detector shape {shape:?}")]
    PaddedShapeTooSmall {
        shape: (usize, usize),
        padded: (usize, usize),
    },

    /// Paired arrays disagree in length.
    #[error("length mismatch in {context}: expected {expected}, got {actual}")]
    LengthMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    /// An image does not match the configured working shape.
    #[error("image shape {actual:?} does not match the padded shape {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    /// The requested operation has no implementation.
    #[error("not supported: {0}")]
    Unsupported(&'static str),
}
