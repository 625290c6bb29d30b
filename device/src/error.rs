use std::path::PathBuf;

use snafu::Snafu;

use crate::backend::Property;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Coarse classification shared by every kiln error type.
///
/// Callers branch on the kind rather than on individual variants, e.g. to fall back to
/// another strategy on [`ErrorKind::Unsupported`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum ErrorKind {
    /// Malformed input. Never retried.
    Value,
    /// Host or device memory exhausted.
    Resource,
    /// A structural limit was exceeded.
    Unsupported,
    /// The device backend failed to compile or run a kernel.
    Backend,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// The backend rejected kernel source.
    #[snafu(display("failed to compile kernel '{entry}': {message}"))]
    Compile { entry: String, message: String, diagnostic: Option<String> },

    #[snafu(display("failed to launch kernel '{entry}': {message}"))]
    Launch { entry: String, message: String },

    #[snafu(display("property query {property} failed: {message}"))]
    PropertyQuery { property: Property, message: String },

    #[snafu(display("failed to allocate {bytes} bytes: {message}"))]
    Allocation { bytes: usize, message: String },

    /// Failed to move data between host and device or inside the device.
    #[snafu(display("transfer failed: {message}"))]
    Transfer { message: String },

    /// Array view reaches outside its buffer.
    #[snafu(display("invalid view: bytes {start}..{end} exceed buffer size {buffer_size}"))]
    InvalidView { start: isize, end: isize, buffer_size: usize },

    #[snafu(display("shape has {shape} dims but strides have {strides}"))]
    RankMismatch { shape: usize, strides: usize },

    #[snafu(display("kernel cache I/O error at {}: {source}", path.display()))]
    CacheIo { path: PathBuf, source: std::io::Error },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Compile { .. } | Self::Launch { .. } | Self::PropertyQuery { .. } | Self::Transfer { .. } => {
                ErrorKind::Backend
            }
            Self::Allocation { .. } | Self::CacheIo { .. } => ErrorKind::Resource,
            Self::InvalidView { .. } | Self::RankMismatch { .. } => ErrorKind::Value,
        }
    }

    /// Backend-provided diagnostic text (compiler log), if any.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            Self::Compile { diagnostic, .. } => diagnostic.as_deref(),
            _ => None,
        }
    }
}
