//! Error types for kernel source generation.

use kiln_device::ErrorKind;
use kiln_dtype::ScalarDType;
use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// The source builder could not grow its buffer.
    #[snafu(display("out of memory while building kernel source"))]
    OutOfMemory,

    /// An element type has no usable spelling for the requested role.
    #[snafu(display("cannot resolve type {dtype:?}: {reason}"))]
    TypeResolution { dtype: ScalarDType, reason: String },

    /// Malformed kernel description (bad operand names, empty expressions).
    #[snafu(display("invalid kernel description: {reason}"))]
    InvalidDescription { reason: String },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::OutOfMemory => ErrorKind::Resource,
            Self::TypeResolution { .. } | Self::InvalidDescription { .. } => ErrorKind::Value,
        }
    }
}
