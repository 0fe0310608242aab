//! Error types for kernel operations.

use thiserror::Error;

/// Errors raised by contraction, transform and special-function operations.
///
/// Every variant describes a caller mistake or a domain error from a
/// transcendental evaluation. Numerical cancellation is never reported here;
/// the kernels switch formulas instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KernelError {
    /// Contraction arguments must be `(tensor, labels)*, output_labels`.
    #[error("einsum expects an odd number of arguments, got {count}")]
    OddArgumentCount { count: usize },

    /// A tensor appeared where a label list was expected, or vice versa.
    #[error("malformed einsum arguments: expected {expected} at position {position}")]
    MalformedArguments {
        position: usize,
        expected: &'static str,
    },

    /// Label list length differs from the rank of its tensor.
    #[error("label list has {actual} entries but tensor has rank {expected}")]
    RankMismatch { expected: usize, actual: usize },

    /// The same label names axes of different extents.
    #[error("label {label} has inconsistent extents {first} and {second}")]
    InconsistentExtent {
        label: String,
        first: usize,
        second: usize,
    },

    /// An output label that no operand carries.
    #[error("output label {label} does not appear in any operand")]
    UnknownOutputLabel { label: String },

    /// An output label listed more than once.
    #[error("output label {label} is repeated")]
    DuplicateOutputLabel { label: String },

    /// A convolution label missing from one of the operands.
    #[error("spectral label {label} must appear in both operands")]
    MissingSpectralLabel { label: String },

    /// Gradient requested with respect to a label list.
    #[error("argument {position} is a label list and cannot be differentiated")]
    NonDifferentiableArgument { position: usize },

    /// Gradient requested for a position the primitive does not have.
    #[error("argument position {position} out of range for primitive with {arity} arguments")]
    ArgumentOutOfRange { position: usize, arity: usize },

    /// Axis index beyond the tensor rank.
    #[error("axis {axis} out of range for tensor of rank {ndim}")]
    AxisOutOfRange { axis: usize, ndim: usize },

    /// Two sizes that must agree do not.
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Structural misuse of an operation (wrong rank, repeated axes, ...).
    #[error("invalid shape: {message}")]
    InvalidShape { message: String },

    /// `next_regular` is only defined for positive targets.
    #[error("regular-number target must be positive, got {target}")]
    InvalidTarget { target: usize },

    /// A gradient rule received a value of the wrong numeric kind.
    #[error("expected a {expected} value")]
    ValueKind { expected: &'static str },

    /// Transcendental function evaluated outside its domain.
    #[error("{function} is undefined at {argument}")]
    Domain {
        function: &'static str,
        argument: f64,
    },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, KernelError>;
