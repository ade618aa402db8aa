use crate::dtype::DType;
use crate::tensor::TensorShape;

/// Errors raised by image construction, view access and scans.
///
/// Resolution errors (`DimensionMismatch`, `TensorShapeMismatch`,
/// `UnsupportedOperator`) are reported before any output is allocated.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("Image dimensions {a:?} and {b:?} cannot be broadcast")]
    DimensionMismatch { a: Vec<usize>, b: Vec<usize> },

    #[error("Tensor sizes {a_rows}x{a_cols} and {b_rows}x{b_cols} do not match")]
    TensorShapeMismatch {
        a_rows: usize,
        a_cols: usize,
        b_rows: usize,
        b_cols: usize,
    },

    #[error("Physical tensor elements differ: expected {expected}, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    #[error("Index {index} out of range for {what} of size {size}")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        size: usize,
    },

    #[error("Invalid tensor {shape} of size {rows}x{cols}")]
    InvalidTensor {
        shape: TensorShape,
        rows: usize,
        cols: usize,
    },

    #[error("Tensor position ({i}, {j}) outside a {rows}x{cols} tensor")]
    TensorPosition {
        i: usize,
        j: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    #[error("Allocation failed: {0}")]
    Allocation(String),

    #[error("Operator '{op}' is not defined for {dtype}")]
    UnsupportedOperator { op: &'static str, dtype: DType },

    #[error("Unsupported dtype: {0}")]
    UnsupportedDType(DType),
}
