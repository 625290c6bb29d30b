use crate::*;
use proptest::prelude::*;

#[rustfmt::skip]
impl ScalarDType {
    pub fn int_generator() -> impl Strategy<Value = Self> {
        prop_oneof![
            Just(Self::Int8), Just(Self::Int16), Just(Self::Int32), Just(Self::Int64),
            Just(Self::UInt8), Just(Self::UInt16), Just(Self::UInt32), Just(Self::UInt64)
        ]
    }

    pub fn float_generator() -> impl Strategy<Value = Self> {
        prop_oneof![Just(Self::Float32), Just(Self::Float64)]
    }

    /// Every type that has sort sentinels.
    pub fn sortable_generator() -> impl Strategy<Value = Self> {
        prop_oneof![Self::int_generator(), Self::float_generator()]
    }
}

impl ScalarValue {
    /// Values of `dtype` that survive a round trip through `f64` and fit every signed type.
    pub fn small_generator(dtype: ScalarDType) -> impl Strategy<Value = Self> {
        (-100i32..=100).prop_map(move |v| {
            let v = if dtype.is_unsigned() { v.unsigned_abs() as f64 } else { f64::from(v) };
            ScalarValue::from_f64(dtype, v).unwrap_or(ScalarValue::Float64(v))
        })
    }
}
