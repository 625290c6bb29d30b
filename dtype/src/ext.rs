use super::*;

/// Rust primitives with a matching element type.
pub trait HasDType: Copy {
    const DTYPE: ScalarDType;

    fn into_scalar(self) -> ScalarValue;
}

macro_rules! impl_dtype_ext {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl HasDType for $ty {
                const DTYPE: ScalarDType = ScalarDType::$variant;

                fn into_scalar(self) -> ScalarValue {
                    ScalarValue::$variant(self)
                }
            }

            impl From<$ty> for ScalarValue {
                fn from(value: $ty) -> Self {
                    ScalarValue::$variant(value)
                }
            }
        )*
    };
}

impl_dtype_ext! {
    bool => Bool,
    i8 => Int8, i16 => Int16, i32 => Int32, i64 => Int64,
    u8 => UInt8, u16 => UInt16, u32 => UInt32, u64 => UInt64,
    f32 => Float32, f64 => Float64,
}
