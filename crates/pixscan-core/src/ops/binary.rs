//! The binary operator contract and the built-in operators.

use crate::dtype::DType;
use crate::element::Element;

/// A per-sample binary operator.
///
/// `apply` is instantiated for the working type of each scan, so it is
/// resolved once per call rather than per sample. Positions both inputs hold
/// as structural zeros stay zero in the output, which assumes
/// `apply(0, 0) == 0`.
pub trait BinaryOp: Sync {
    /// Short name used in errors and logs.
    fn name(&self) -> &'static str;

    /// Whether the operator is defined for `dtype`.
    fn supports(&self, dtype: DType) -> bool {
        let _ = dtype;
        true
    }

    fn apply<T: Element>(&self, lhs: T, rhs: T) -> T;
}

impl<O: BinaryOp> BinaryOp for &O {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn supports(&self, dtype: DType) -> bool {
        (**self).supports(dtype)
    }

    fn apply<T: Element>(&self, lhs: T, rhs: T) -> T {
        (**self).apply(lhs, rhs)
    }
}

macro_rules! binary_op {
    ($(#[$doc:meta])* $name:ident, $label:literal, $method:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $name;

        impl BinaryOp for $name {
            fn name(&self) -> &'static str {
                $label
            }

            #[inline]
            fn apply<T: Element>(&self, lhs: T, rhs: T) -> T {
                lhs.$method(rhs)
            }
        }
    };
    ($(#[$doc:meta])* $name:ident, $label:literal, $method:ident, integer_only) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $name;

        impl BinaryOp for $name {
            fn name(&self) -> &'static str {
                $label
            }

            fn supports(&self, dtype: DType) -> bool {
                dtype.is_integer()
            }

            #[inline]
            fn apply<T: Element>(&self, lhs: T, rhs: T) -> T {
                lhs.$method(rhs)
            }
        }
    };
}

binary_op!(
    /// Addition, saturating for integers.
    Add, "add", sat_add
);
binary_op!(
    /// Subtraction, saturating for integers.
    Sub, "sub", sat_sub
);
binary_op!(
    /// Sample-wise product (not the matrix product of the tensors).
    MulSampleWise, "mul_sample_wise", sat_mul
);
binary_op!(
    /// Division; integer division by zero gives zero.
    Div, "div", safe_div
);
binary_op!(Max, "max", max_of);
binary_op!(Min, "min", min_of);
binary_op!(BitAnd, "bit_and", bit_and, integer_only);
binary_op!(BitOr, "bit_or", bit_or, integer_only);
binary_op!(BitXor, "bit_xor", bit_xor, integer_only);
