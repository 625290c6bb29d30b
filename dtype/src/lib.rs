//! Element types understood by kiln kernels.
//!
//! [`ScalarDType`] names the element type of a device array and knows how that type is
//! spelled in generated kernel source. [`ScalarValue`] is a host-side scalar tagged with its
//! type, used for scalar kernel arguments and for moving elements between host and device.

pub mod ext;


pub use ext::HasDType;

use smallvec::SmallVec;

/// Scalar element types.
///
/// The discriminant doubles as the stable numeric type code accepted by [`ScalarDType::from_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(strum::EnumCount, strum::EnumIter, strum::VariantArray, strum::FromRepr)]
#[cfg_attr(any(test, feature = "proptest"), derive(proptest_derive::Arbitrary))]
#[repr(u32)]
pub enum ScalarDType {
    Bool = 0,

    Int8 = 1,
    UInt8 = 2,
    Int16 = 3,
    UInt16 = 4,
    Int32 = 5,
    UInt32 = 6,
    Int64 = 7,
    UInt64 = 8,

    Float16 = 9,
    Float32 = 10,
    Float64 = 11,
}

impl ScalarDType {
    /// Resolve a numeric type code. Unknown codes yield `None`.
    pub fn from_code(code: u32) -> Option<Self> {
        Self::from_repr(code)
    }

    pub const fn code(&self) -> u32 {
        *self as u32
    }

    pub const fn bytes(&self) -> usize {
        match self {
            Self::Bool | Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 | Self::Float16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
        }
    }

    pub const fn is_bool(&self) -> bool {
        matches!(self, Self::Bool)
    }

    pub const fn is_signed(&self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64)
    }

    pub const fn is_unsigned(&self) -> bool {
        matches!(self, Self::UInt8 | Self::UInt16 | Self::UInt32 | Self::UInt64)
    }

    pub const fn is_int(&self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float16 | Self::Float32 | Self::Float64)
    }

    /// Type name used in generated kernel source (the `ga_*` typedefs of the CLUDA preamble).
    pub const fn device_name(&self) -> &'static str {
        match self {
            Self::Bool => "ga_bool",
            Self::Int8 => "ga_byte",
            Self::UInt8 => "ga_ubyte",
            Self::Int16 => "ga_short",
            Self::UInt16 => "ga_ushort",
            Self::Int32 => "ga_int",
            Self::UInt32 => "ga_uint",
            Self::Int64 => "ga_long",
            Self::UInt64 => "ga_ulong",
            Self::Float16 => "ga_half",
            Self::Float32 => "ga_float",
            Self::Float64 => "ga_double",
        }
    }

    /// Inverse of [`ScalarDType::device_name`].
    pub fn from_device_name(name: &str) -> Option<Self> {
        use strum::VariantArray;
        Self::VARIANTS.iter().copied().find(|dtype| dtype.device_name() == name)
    }

    /// Source literal for the largest value of this type.
    ///
    /// Floating point types use positive infinity so every finite key orders before it.
    /// `None` for types that cannot be used as sort keys.
    pub const fn max_literal(&self) -> Option<&'static str> {
        Some(match self {
            Self::Int8 => "127",
            Self::UInt8 => "255",
            Self::Int16 => "32767",
            Self::UInt16 => "65535",
            Self::Int32 => "2147483647",
            Self::UInt32 => "4294967295U",
            Self::Int64 => "9223372036854775807LL",
            Self::UInt64 => "18446744073709551615ULL",
            Self::Float32 => "__int_as_float(0x7f800000)",
            Self::Float64 => "__longlong_as_double(0x7ff0000000000000LL)",
            Self::Bool | Self::Float16 => return None,
        })
    }

    /// Source literal for the smallest value of this type. See [`ScalarDType::max_literal`].
    pub const fn min_literal(&self) -> Option<&'static str> {
        Some(match self {
            // Written as `-MAX - 1`: the positive literal alone overflows the signed type.
            Self::Int8 => "(-127 - 1)",
            Self::Int16 => "(-32767 - 1)",
            Self::Int32 => "(-2147483647 - 1)",
            Self::Int64 => "(-9223372036854775807LL - 1)",
            Self::UInt8 | Self::UInt16 => "0",
            Self::UInt32 => "0U",
            Self::UInt64 => "0ULL",
            Self::Float32 => "__int_as_float((int)0xff800000)",
            Self::Float64 => "__longlong_as_double((long long)0xfff0000000000000ULL)",
            Self::Bool | Self::Float16 => return None,
        })
    }

    /// Whether this type can be used as a sort key.
    pub const fn is_sortable(&self) -> bool {
        self.max_literal().is_some()
    }
}

/// Host scalar tagged with its element type.
///
/// `Float16` has no host representation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScalarValue {
    Bool(bool),
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
}

/// Little-endian encoding of a single scalar.
pub type ScalarBytes = SmallVec<[u8; 8]>;

impl ScalarValue {
    pub const fn dtype(&self) -> ScalarDType {
        match self {
            Self::Bool(_) => ScalarDType::Bool,
            Self::Int8(_) => ScalarDType::Int8,
            Self::UInt8(_) => ScalarDType::UInt8,
            Self::Int16(_) => ScalarDType::Int16,
            Self::UInt16(_) => ScalarDType::UInt16,
            Self::Int32(_) => ScalarDType::Int32,
            Self::UInt32(_) => ScalarDType::UInt32,
            Self::Int64(_) => ScalarDType::Int64,
            Self::UInt64(_) => ScalarDType::UInt64,
            Self::Float32(_) => ScalarDType::Float32,
            Self::Float64(_) => ScalarDType::Float64,
        }
    }

    pub fn to_le_bytes(&self) -> ScalarBytes {
        match *self {
            Self::Bool(v) => SmallVec::from_slice(&[v as u8]),
            Self::Int8(v) => SmallVec::from_slice(&v.to_le_bytes()),
            Self::UInt8(v) => SmallVec::from_slice(&v.to_le_bytes()),
            Self::Int16(v) => SmallVec::from_slice(&v.to_le_bytes()),
            Self::UInt16(v) => SmallVec::from_slice(&v.to_le_bytes()),
            Self::Int32(v) => SmallVec::from_slice(&v.to_le_bytes()),
            Self::UInt32(v) => SmallVec::from_slice(&v.to_le_bytes()),
            Self::Int64(v) => SmallVec::from_slice(&v.to_le_bytes()),
            Self::UInt64(v) => SmallVec::from_slice(&v.to_le_bytes()),
            Self::Float32(v) => SmallVec::from_slice(&v.to_le_bytes()),
            Self::Float64(v) => SmallVec::from_slice(&v.to_le_bytes()),
        }
    }

    /// Decode one element of `dtype` from the front of `bytes`.
    ///
    /// Returns `None` when `bytes` is too short or `dtype` has no host representation.
    pub fn from_le_bytes(dtype: ScalarDType, bytes: &[u8]) -> Option<Self> {
        let raw = bytes.get(..dtype.bytes())?;
        Some(match dtype {
            ScalarDType::Bool => Self::Bool(raw[0] != 0),
            ScalarDType::Int8 => Self::Int8(i8::from_le_bytes(raw.try_into().ok()?)),
            ScalarDType::UInt8 => Self::UInt8(raw[0]),
            ScalarDType::Int16 => Self::Int16(i16::from_le_bytes(raw.try_into().ok()?)),
            ScalarDType::UInt16 => Self::UInt16(u16::from_le_bytes(raw.try_into().ok()?)),
            ScalarDType::Int32 => Self::Int32(i32::from_le_bytes(raw.try_into().ok()?)),
            ScalarDType::UInt32 => Self::UInt32(u32::from_le_bytes(raw.try_into().ok()?)),
            ScalarDType::Int64 => Self::Int64(i64::from_le_bytes(raw.try_into().ok()?)),
            ScalarDType::UInt64 => Self::UInt64(u64::from_le_bytes(raw.try_into().ok()?)),
            ScalarDType::Float32 => Self::Float32(f32::from_le_bytes(raw.try_into().ok()?)),
            ScalarDType::Float64 => Self::Float64(f64::from_le_bytes(raw.try_into().ok()?)),
            ScalarDType::Float16 => return None,
        })
    }

    /// Widen to `f64`. Exact for every type except 64-bit integers beyond 2^53.
    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::Bool(v) => f64::from(u8::from(v)),
            Self::Int8(v) => f64::from(v),
            Self::UInt8(v) => f64::from(v),
            Self::Int16(v) => f64::from(v),
            Self::UInt16(v) => f64::from(v),
            Self::Int32(v) => f64::from(v),
            Self::UInt32(v) => f64::from(v),
            Self::Int64(v) => v as f64,
            Self::UInt64(v) => v as f64,
            Self::Float32(v) => f64::from(v),
            Self::Float64(v) => v,
        }
    }

    /// Narrow an `f64` into `dtype` with `as`-cast semantics.
    pub fn from_f64(dtype: ScalarDType, value: f64) -> Option<Self> {
        Some(match dtype {
            ScalarDType::Bool => Self::Bool(value != 0.0),
            ScalarDType::Int8 => Self::Int8(value as i8),
            ScalarDType::UInt8 => Self::UInt8(value as u8),
            ScalarDType::Int16 => Self::Int16(value as i16),
            ScalarDType::UInt16 => Self::UInt16(value as u16),
            ScalarDType::Int32 => Self::Int32(value as i32),
            ScalarDType::UInt32 => Self::UInt32(value as u32),
            ScalarDType::Int64 => Self::Int64(value as i64),
            ScalarDType::UInt64 => Self::UInt64(value as u64),
            ScalarDType::Float32 => Self::Float32(value as f32),
            ScalarDType::Float64 => Self::Float64(value),
            ScalarDType::Float16 => return None,
        })
    }

    /// Widen an integer value to `u64`; `None` for floats, booleans and negative values.
    pub fn as_index(&self) -> Option<u64> {
        match *self {
            Self::UInt8(v) => Some(u64::from(v)),
            Self::UInt16(v) => Some(u64::from(v)),
            Self::UInt32(v) => Some(u64::from(v)),
            Self::UInt64(v) => Some(v),
            Self::Int8(v) => u64::try_from(v).ok(),
            Self::Int16(v) => u64::try_from(v).ok(),
            Self::Int32(v) => u64::try_from(v).ok(),
            Self::Int64(v) => u64::try_from(v).ok(),
            Self::Bool(_) | Self::Float32(_) | Self::Float64(_) => None,
        }
    }
}
