//! Typed kernel arguments.
//!
//! The ordered [`ArgKind`] sequence of a kernel is the binding contract between the code
//! generator that declares the parameters and the launch path that supplies them.

use std::fmt;

use enumset::{EnumSet, EnumSetType};
use kiln_dtype::{ScalarDType, ScalarValue};

use crate::buffer::Buffer;

/// Declared kind of a single kernel parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgKind {
    /// Device memory pointer.
    Buffer,
    /// Unsigned size (`ga_size`).
    Size,
    /// Signed size (`ga_ssize`).
    SSize,
    /// Scalar passed by value.
    Scalar(ScalarDType),
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buffer => f.write_str("buffer"),
            Self::Size => f.write_str("size"),
            Self::SSize => f.write_str("ssize"),
            Self::Scalar(dtype) => write!(f, "{}", dtype.device_name()),
        }
    }
}

/// Owned argument value bound to a kernel slot.
#[derive(Debug, Clone)]
pub enum KernelArg {
    Buffer(Buffer),
    Size(usize),
    SSize(isize),
    Scalar(ScalarValue),
}

impl KernelArg {
    pub fn kind(&self) -> ArgKind {
        match self {
            Self::Buffer(_) => ArgKind::Buffer,
            Self::Size(_) => ArgKind::Size,
            Self::SSize(_) => ArgKind::SSize,
            Self::Scalar(value) => ArgKind::Scalar(value.dtype()),
        }
    }

    pub fn as_buffer(&self) -> Option<&Buffer> {
        match self {
            Self::Buffer(buffer) => Some(buffer),
            _ => None,
        }
    }

    pub fn as_size(&self) -> Option<usize> {
        match self {
            Self::Size(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_ssize(&self) -> Option<isize> {
        match self {
            Self::SSize(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<ScalarValue> {
        match self {
            Self::Scalar(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<Buffer> for KernelArg {
    fn from(buffer: Buffer) -> Self {
        Self::Buffer(buffer)
    }
}

impl From<ScalarValue> for KernelArg {
    fn from(value: ScalarValue) -> Self {
        Self::Scalar(value)
    }
}

/// Compilation features a kernel needs from the backend.
#[derive(Debug, Hash, EnumSetType)]
pub enum CompileFlag {
    /// Prepend the CLUDA preamble (see [`crate::cluda`]).
    Cluda,
    /// 8- or 16-bit integer types.
    Small,
    Half,
    Double,
}

impl CompileFlag {
    /// Flags required by a kernel touching `dtypes`. Always includes [`CompileFlag::Cluda`].
    pub fn for_dtypes(dtypes: impl IntoIterator<Item = ScalarDType>) -> EnumSet<CompileFlag> {
        let mut flags = EnumSet::only(CompileFlag::Cluda);
        for dtype in dtypes {
            match dtype {
                ScalarDType::Float16 => flags |= CompileFlag::Half,
                ScalarDType::Float64 => flags |= CompileFlag::Double,
                ScalarDType::Int8 | ScalarDType::UInt8 | ScalarDType::Int16 | ScalarDType::UInt16 => {
                    flags |= CompileFlag::Small
                }
                _ => {}
            }
        }
        flags
    }
}
