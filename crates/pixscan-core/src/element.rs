//! Binding between Rust primitive types and [`DType`] tags.

use std::fmt;

use num_traits::{Bounded, NumCast};

use crate::dtype::DType;

/// A primitive sample type that can live in an image buffer.
///
/// Integer arithmetic saturates at the type bounds and integer division by
/// zero yields zero. Float arithmetic follows IEEE 754.
pub trait Element:
    bytemuck::Pod + NumCast + Bounded + PartialOrd + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// Runtime tag for this type.
    const DTYPE: DType;

    fn zero() -> Self;

    /// Lossy widening to `f64`.
    fn as_f64(self) -> f64;

    fn sat_add(self, rhs: Self) -> Self;
    fn sat_sub(self, rhs: Self) -> Self;
    fn sat_mul(self, rhs: Self) -> Self;
    fn safe_div(self, rhs: Self) -> Self;

    /// Bitwise AND. Only integer types reach this through a scan: the
    /// bitwise operators reject float working types during resolution, and
    /// float types implement it solely to satisfy the generic operator bound.
    fn bit_and(self, rhs: Self) -> Self;
    fn bit_or(self, rhs: Self) -> Self;
    fn bit_xor(self, rhs: Self) -> Self;

    /// Convert from any other element type, clamping to this type's range.
    ///
    /// Floats are truncated toward zero when the target is an integer; NaN
    /// becomes zero.
    fn cast_from<S: Element>(value: S) -> Self {
        match num_traits::cast::<S, Self>(value) {
            Some(v) => v,
            None if value.as_f64().is_nan() => Self::zero(),
            None if value < S::zero() => Self::min_value(),
            None => Self::max_value(),
        }
    }

    fn max_of(self, rhs: Self) -> Self {
        if rhs > self {
            rhs
        } else {
            self
        }
    }

    fn min_of(self, rhs: Self) -> Self {
        if rhs < self {
            rhs
        } else {
            self
        }
    }
}

macro_rules! impl_int_element {
    ($($t:ty => $dtype:ident),* $(,)?) => {
        $(
            impl Element for $t {
                const DTYPE: DType = DType::$dtype;

                #[inline]
                fn zero() -> Self {
                    0
                }

                #[inline]
                fn as_f64(self) -> f64 {
                    self as f64
                }

                #[inline]
                fn sat_add(self, rhs: Self) -> Self {
                    self.saturating_add(rhs)
                }

                #[inline]
                fn sat_sub(self, rhs: Self) -> Self {
                    self.saturating_sub(rhs)
                }

                #[inline]
                fn sat_mul(self, rhs: Self) -> Self {
                    self.saturating_mul(rhs)
                }

                #[inline]
                fn safe_div(self, rhs: Self) -> Self {
                    // MIN / -1 saturates instead of overflowing
                    self.checked_div(rhs).unwrap_or(if rhs == 0 { 0 } else { <$t>::MAX })
                }

                #[inline]
                fn bit_and(self, rhs: Self) -> Self {
                    self & rhs
                }

                #[inline]
                fn bit_or(self, rhs: Self) -> Self {
                    self | rhs
                }

                #[inline]
                fn bit_xor(self, rhs: Self) -> Self {
                    self ^ rhs
                }
            }
        )*
    };
}

macro_rules! impl_float_element {
    ($($t:ty => $dtype:ident),* $(,)?) => {
        $(
            impl Element for $t {
                const DTYPE: DType = DType::$dtype;

                #[inline]
                fn zero() -> Self {
                    0.0
                }

                #[inline]
                fn as_f64(self) -> f64 {
                    self as f64
                }

                #[inline]
                fn sat_add(self, rhs: Self) -> Self {
                    self + rhs
                }

                #[inline]
                fn sat_sub(self, rhs: Self) -> Self {
                    self - rhs
                }

                #[inline]
                fn sat_mul(self, rhs: Self) -> Self {
                    self * rhs
                }

                #[inline]
                fn safe_div(self, rhs: Self) -> Self {
                    self / rhs
                }

                // Never reached through a scan; see `Element::bit_and`.
                #[inline]
                fn bit_and(self, rhs: Self) -> Self {
                    <$t>::from_bits(self.to_bits() & rhs.to_bits())
                }

                #[inline]
                fn bit_or(self, rhs: Self) -> Self {
                    <$t>::from_bits(self.to_bits() | rhs.to_bits())
                }

                #[inline]
                fn bit_xor(self, rhs: Self) -> Self {
                    <$t>::from_bits(self.to_bits() ^ rhs.to_bits())
                }
            }
        )*
    };
}

impl_int_element!(
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
);

impl_float_element!(f32 => F32, f64 => F64);

/// Expand `$body` once per concrete element type selected by `$dtype`,
/// binding the type to the identifier `$t`.
#[macro_export]
macro_rules! dispatch_dtype {
    ($dtype:expr, $t:ident => $body:expr) => {
        match $dtype {
            $crate::DType::U8 => {
                type $t = u8;
                $body
            }
            $crate::DType::U16 => {
                type $t = u16;
                $body
            }
            $crate::DType::U32 => {
                type $t = u32;
                $body
            }
            $crate::DType::U64 => {
                type $t = u64;
                $body
            }
            $crate::DType::I8 => {
                type $t = i8;
                $body
            }
            $crate::DType::I16 => {
                type $t = i16;
                $body
            }
            $crate::DType::I32 => {
                type $t = i32;
                $body
            }
            $crate::DType::I64 => {
                type $t = i64;
                $body
            }
            $crate::DType::F32 => {
                type $t = f32;
                $body
            }
            $crate::DType::F64 => {
                type $t = f64;
                $body
            }
        }
    };
}
