use std::fmt;

use serde::{Deserialize, Serialize};

/// Sample types an image can hold.
///
/// Every pixel of an image stores its tensor elements in one of these types.
/// Binary operations on two images compute in the type returned by
/// [`DType::promote`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    /// 8-bit unsigned integer
    U8,
    /// 16-bit unsigned integer
    U16,
    /// 32-bit unsigned integer
    U32,
    /// 64-bit unsigned integer
    U64,
    /// 8-bit signed integer
    I8,
    /// 16-bit signed integer
    I16,
    /// 32-bit signed integer
    I32,
    /// 64-bit signed integer
    I64,
    /// 32-bit IEEE 754 single-precision float
    F32,
    /// 64-bit IEEE 754 double-precision float
    F64,
}

impl DType {
    /// All sample types, unsigned first, then signed, then floats.
    pub const ALL: [DType; 10] = [
        DType::U8,
        DType::U16,
        DType::U32,
        DType::U64,
        DType::I8,
        DType::I16,
        DType::I32,
        DType::I64,
        DType::F32,
        DType::F64,
    ];

    /// Size in bytes of a single sample.
    pub fn element_size(&self) -> usize {
        match self {
            DType::U8 | DType::I8 => 1,
            DType::U16 | DType::I16 => 2,
            DType::U32 | DType::I32 | DType::F32 => 4,
            DType::U64 | DType::I64 | DType::F64 => 8,
        }
    }

    /// Number of bytes needed to store `n` samples, or `None` on overflow.
    pub fn storage_bytes(&self, n: usize) -> Option<usize> {
        n.checked_mul(self.element_size())
    }

    /// Whether this dtype is a floating-point type.
    pub fn is_float(&self) -> bool {
        matches!(self, DType::F32 | DType::F64)
    }

    /// Whether this dtype is an integer type.
    pub fn is_integer(&self) -> bool {
        !self.is_float()
    }

    /// Whether this dtype can hold negative values.
    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            DType::I8 | DType::I16 | DType::I32 | DType::I64 | DType::F32 | DType::F64
        )
    }

    fn signed_of_size(bytes: usize) -> DType {
        match bytes {
            1 => DType::I8,
            2 => DType::I16,
            4 => DType::I32,
            8 => DType::I64,
            _ => DType::F64,
        }
    }

    /// The smallest type that represents every value of both `a` and `b`.
    ///
    /// Unsigned meets signed at the first signed width strictly larger than
    /// the unsigned one; `u64` against any signed type falls back to `f64`.
    /// Integers of up to 16 bits fit in `f32`, wider ones need `f64`.
    pub fn promote(a: DType, b: DType) -> DType {
        if a == b {
            return a;
        }
        let wider = |x: DType, y: DType| {
            if x.element_size() >= y.element_size() {
                x
            } else {
                y
            }
        };
        match (a.is_float(), b.is_float()) {
            (true, true) => wider(a, b),
            (true, false) | (false, true) => {
                let (float, int) = if a.is_float() { (a, b) } else { (b, a) };
                if float == DType::F32 && int.element_size() <= 2 {
                    DType::F32
                } else {
                    DType::F64
                }
            }
            (false, false) => {
                if a.is_signed() == b.is_signed() {
                    return wider(a, b);
                }
                let (unsigned, signed) = if a.is_signed() { (b, a) } else { (a, b) };
                if signed.element_size() > unsigned.element_size() {
                    signed
                } else {
                    DType::signed_of_size(unsigned.element_size() * 2)
                }
            }
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DType::U8 => "u8",
            DType::U16 => "u16",
            DType::U32 => "u32",
            DType::U64 => "u64",
            DType::I8 => "i8",
            DType::I16 => "i16",
            DType::I32 => "i32",
            DType::I64 => "i64",
            DType::F32 => "f32",
            DType::F64 => "f64",
        };
        write!(f, "{name}")
    }
}
