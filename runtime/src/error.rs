//! Error types for the kernel runtime.

use kiln_device::{ArgKind, ErrorKind};
use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("device error: {source}"))]
    Device { source: kiln_device::Error },

    #[snafu(display("codegen error: {source}"))]
    Codegen { source: kiln_codegen::Error },

    /// Malformed input: wrong rank, type or operand layout.
    #[snafu(display("invalid value: {reason}"))]
    InvalidValue { reason: String },

    #[snafu(display("shape mismatch: expected {expected:?}, got {actual:?}"))]
    ShapeMismatch { expected: Vec<usize>, actual: Vec<usize> },

    #[snafu(display("argument {index} expects {expected}, got {actual}"))]
    ArgumentKind { index: usize, expected: ArgKind, actual: ArgKind },

    #[snafu(display("argument index {index} is out of range for {count} parameters"))]
    ArgumentIndex { index: usize, count: usize },

    #[snafu(display("kernel declares {expected} parameters, got {actual} arguments"))]
    ArgumentCount { expected: usize, actual: usize },

    #[snafu(display("argument {index} is not bound"))]
    UnboundArgument { index: usize },

    /// Input exceeds a structural limit of the kernels (dimension count, grid size, 32-bit lengths).
    #[snafu(display("unsupported: {reason}"))]
    Unsupported { reason: String },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Device { source } => source.kind(),
            Self::Codegen { source } => source.kind(),
            Self::Unsupported { .. } => ErrorKind::Unsupported,
            Self::InvalidValue { .. }
            | Self::ShapeMismatch { .. }
            | Self::ArgumentKind { .. }
            | Self::ArgumentIndex { .. }
            | Self::ArgumentCount { .. }
            | Self::UnboundArgument { .. } => ErrorKind::Value,
        }
    }

    /// Backend-provided diagnostic text (compiler log), if any.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            Self::Device { source } => source.diagnostic(),
            _ => None,
        }
    }
}
