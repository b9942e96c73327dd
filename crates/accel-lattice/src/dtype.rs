//! Coercion of family values into fixed-width numeric types.

use crate::error::LatticeError;

/// A numeric type that family values can be collected into.
///
/// Floating-point types store a failed read as NaN. Integer types truncate
/// toward zero and reject missing, non-finite, or out-of-range values.
pub trait ElementDtype: Copy + Sized {
    /// Type name used in error messages.
    const NAME: &'static str;

    /// Convert one value.
    fn from_value(value: Option<f64>) -> Result<Self, LatticeError>;
}

impl ElementDtype for f64 {
    const NAME: &'static str = "f64";

    fn from_value(value: Option<f64>) -> Result<Self, LatticeError> {
        Ok(value.unwrap_or(f64::NAN))
    }
}

impl ElementDtype for f32 {
    const NAME: &'static str = "f32";

    fn from_value(value: Option<f64>) -> Result<Self, LatticeError> {
        Ok(value.map_or(f32::NAN, |v| v as f32))
    }
}

macro_rules! int_dtype {
    ($($ty:ty),*) => {$(
        impl ElementDtype for $ty {
            const NAME: &'static str = stringify!($ty);

            fn from_value(value: Option<f64>) -> Result<Self, LatticeError> {
                let not_representable = || LatticeError::NotRepresentable {
                    value,
                    dtype: Self::NAME,
                };
                let v = value.ok_or_else(not_representable)?.trunc();
                if !v.is_finite() || v < <$ty>::MIN as f64 || v > <$ty>::MAX as f64 {
                    return Err(not_representable());
                }
                Ok(v as $ty)
            }
        }
    )*};
}

int_dtype!(i8, i16, i32, i64, u8, u16, u32, u64);

/// Convert every value, failing on the first that does not fit.
pub fn coerce<T: ElementDtype>(values: &[Option<f64>]) -> Result<Vec<T>, LatticeError> {
    values.iter().map(|v| T::from_value(*v)).collect()
}
