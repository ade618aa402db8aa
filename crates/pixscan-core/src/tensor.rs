//! Per-pixel tensor descriptions.
//!
//! A [`Tensor`] says how many logical rows and columns a pixel holds and, via
//! its [`TensorShape`], which of those positions are physically stored.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ScanError;
use crate::Result;

/// How the elements of a pixel's tensor are laid out in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TensorShape {
    /// Dense matrix, columns stored one after another.
    ColMajorMatrix,
    /// Dense matrix, rows stored one after another.
    RowMajorMatrix,
    /// Only the main diagonal is stored.
    DiagonalMatrix,
    /// Square matrix with `(i, j)` and `(j, i)` sharing storage.
    SymmetricMatrix,
    /// Square matrix with zeros below the diagonal.
    UpperTriangularMatrix,
    /// Square matrix with zeros above the diagonal.
    LowerTriangularMatrix,
    ColVector,
    RowVector,
    Scalar,
}

/// Where a logical tensor position lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementMap {
    /// The position is stored at this physical index.
    Stored(usize),
    /// The position is an implicit zero of the shape.
    Zero,
}

impl ElementMap {
    /// Physical index, or `None` for a structural zero.
    pub fn index(self) -> Option<usize> {
        match self {
            ElementMap::Stored(i) => Some(i),
            ElementMap::Zero => None,
        }
    }
}

impl TensorShape {
    /// Whether this is a dense row- or column-major matrix.
    pub fn is_full_matrix(&self) -> bool {
        matches!(self, TensorShape::ColMajorMatrix | TensorShape::RowMajorMatrix)
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, TensorShape::ColVector | TensorShape::RowVector)
    }

    /// Whether this shape stores fewer elements than it has positions.
    pub fn is_compact(&self) -> bool {
        matches!(
            self,
            TensorShape::DiagonalMatrix
                | TensorShape::SymmetricMatrix
                | TensorShape::UpperTriangularMatrix
                | TensorShape::LowerTriangularMatrix
        )
    }

    /// Whether this shape can describe a `rows` x `cols` tensor.
    pub fn is_valid_for(&self, rows: usize, cols: usize) -> bool {
        if rows == 0 || cols == 0 {
            return false;
        }
        match self {
            TensorShape::ColMajorMatrix
            | TensorShape::RowMajorMatrix
            | TensorShape::DiagonalMatrix => true,
            TensorShape::SymmetricMatrix
            | TensorShape::UpperTriangularMatrix
            | TensorShape::LowerTriangularMatrix => rows == cols,
            TensorShape::ColVector => cols == 1,
            TensorShape::RowVector => rows == 1,
            TensorShape::Scalar => rows == 1 && cols == 1,
        }
    }

    /// Number of values stored per pixel for a `rows` x `cols` tensor.
    pub fn physical_elements(&self, rows: usize, cols: usize) -> usize {
        match self {
            TensorShape::ColMajorMatrix
            | TensorShape::RowMajorMatrix
            | TensorShape::ColVector
            | TensorShape::RowVector => rows * cols,
            TensorShape::DiagonalMatrix => rows.min(cols),
            TensorShape::SymmetricMatrix
            | TensorShape::UpperTriangularMatrix
            | TensorShape::LowerTriangularMatrix => rows * (rows + 1) / 2,
            TensorShape::Scalar => 1,
        }
    }

    /// Map logical position `(i, j)` of a `rows` x `cols` tensor to storage.
    ///
    /// Compact shapes keep the diagonal first; the strict upper triangle
    /// follows column by column. Lower-triangular storage is the transpose
    /// of upper-triangular storage.
    pub fn logical_to_physical(
        &self,
        rows: usize,
        cols: usize,
        i: usize,
        j: usize,
    ) -> Result<ElementMap> {
        if i >= rows || j >= cols {
            return Err(ScanError::TensorPosition { i, j, rows, cols });
        }
        let upper_slot = |r: usize, c: usize| rows + c * (c - 1) / 2 + r;
        let map = match self {
            TensorShape::ColMajorMatrix => ElementMap::Stored(j * rows + i),
            TensorShape::RowMajorMatrix => ElementMap::Stored(i * cols + j),
            TensorShape::ColVector => ElementMap::Stored(i),
            TensorShape::RowVector => ElementMap::Stored(j),
            TensorShape::Scalar => ElementMap::Stored(0),
            TensorShape::DiagonalMatrix => {
                if i == j {
                    ElementMap::Stored(i)
                } else {
                    ElementMap::Zero
                }
            }
            TensorShape::SymmetricMatrix => match i.cmp(&j) {
                std::cmp::Ordering::Equal => ElementMap::Stored(i),
                std::cmp::Ordering::Less => ElementMap::Stored(upper_slot(i, j)),
                std::cmp::Ordering::Greater => ElementMap::Stored(upper_slot(j, i)),
            },
            TensorShape::UpperTriangularMatrix => match i.cmp(&j) {
                std::cmp::Ordering::Equal => ElementMap::Stored(i),
                std::cmp::Ordering::Less => ElementMap::Stored(upper_slot(i, j)),
                std::cmp::Ordering::Greater => ElementMap::Zero,
            },
            TensorShape::LowerTriangularMatrix => match i.cmp(&j) {
                std::cmp::Ordering::Equal => ElementMap::Stored(i),
                std::cmp::Ordering::Less => ElementMap::Zero,
                std::cmp::Ordering::Greater => ElementMap::Stored(upper_slot(j, i)),
            },
        };
        Ok(map)
    }

    /// Output shape when combining two tensors of identical size elementwise.
    ///
    /// Compactness survives only where both inputs agree on which positions
    /// are zero: diagonal with a triangle keeps the triangle, everything else
    /// that differs becomes a column-major matrix. Diagonal with symmetric is
    /// dense. A scalar fills every position, so it keeps symmetric, dense
    /// and vector shapes but densifies diagonal and triangular ones.
    pub fn combine(a: TensorShape, b: TensorShape) -> TensorShape {
        use TensorShape::*;
        match (a, b) {
            _ if a == b => a,
            (Scalar, DiagonalMatrix | UpperTriangularMatrix | LowerTriangularMatrix)
            | (DiagonalMatrix | UpperTriangularMatrix | LowerTriangularMatrix, Scalar) => {
                ColMajorMatrix
            }
            (Scalar, other) | (other, Scalar) => other,
            (DiagonalMatrix, UpperTriangularMatrix) | (UpperTriangularMatrix, DiagonalMatrix) => {
                UpperTriangularMatrix
            }
            (DiagonalMatrix, LowerTriangularMatrix) | (LowerTriangularMatrix, DiagonalMatrix) => {
                LowerTriangularMatrix
            }
            _ => ColMajorMatrix,
        }
    }
}

impl fmt::Display for TensorShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TensorShape::ColMajorMatrix => "column-major matrix",
            TensorShape::RowMajorMatrix => "row-major matrix",
            TensorShape::DiagonalMatrix => "diagonal matrix",
            TensorShape::SymmetricMatrix => "symmetric matrix",
            TensorShape::UpperTriangularMatrix => "upper triangular matrix",
            TensorShape::LowerTriangularMatrix => "lower triangular matrix",
            TensorShape::ColVector => "column vector",
            TensorShape::RowVector => "row vector",
            TensorShape::Scalar => "scalar",
        };
        write!(f, "{name}")
    }
}

/// Tensor description of a pixel: shape plus logical rows and columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tensor {
    shape: TensorShape,
    rows: usize,
    cols: usize,
}

impl Default for Tensor {
    fn default() -> Self {
        Self::scalar()
    }
}

impl Tensor {
    /// Create a tensor description, normalising degenerate shapes.
    ///
    /// A 1x1 tensor is always a scalar; a dense matrix with a single column
    /// or row is a column or row vector.
    pub fn new(shape: TensorShape, rows: usize, cols: usize) -> Result<Self> {
        if !shape.is_valid_for(rows, cols) {
            return Err(ScanError::InvalidTensor { shape, rows, cols });
        }
        let shape = if rows == 1 && cols == 1 {
            TensorShape::Scalar
        } else if shape.is_full_matrix() && cols == 1 {
            TensorShape::ColVector
        } else if shape.is_full_matrix() && rows == 1 {
            TensorShape::RowVector
        } else {
            shape
        };
        Ok(Self { shape, rows, cols })
    }

    pub fn scalar() -> Self {
        Self { shape: TensorShape::Scalar, rows: 1, cols: 1 }
    }

    /// Column vector of `n` elements (a scalar when `n == 1`).
    pub fn vector(n: usize) -> Result<Self> {
        Self::new(TensorShape::ColVector, n, 1)
    }

    /// Dense column-major `rows` x `cols` matrix.
    pub fn matrix(rows: usize, cols: usize) -> Result<Self> {
        Self::new(TensorShape::ColMajorMatrix, rows, cols)
    }

    /// Replace shape and size, leaving `self` untouched on error.
    pub fn set_shape(&mut self, shape: TensorShape, rows: usize, cols: usize) -> Result<()> {
        *self = Self::new(shape, rows, cols)?;
        Ok(())
    }

    pub fn shape(&self) -> TensorShape {
        self.shape
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.cols
    }

    /// Number of logical positions (rows x columns).
    pub fn elements(&self) -> usize {
        self.rows * self.cols
    }

    /// Number of values stored per pixel.
    pub fn physical_elements(&self) -> usize {
        self.shape.physical_elements(self.rows, self.cols)
    }

    pub fn is_scalar(&self) -> bool {
        self.shape == TensorShape::Scalar
    }

    pub fn logical_to_physical(&self, i: usize, j: usize) -> Result<ElementMap> {
        self.shape.logical_to_physical(self.rows, self.cols, i, j)
    }

    /// The logical position `(i, j)` that physical element `index` holds.
    ///
    /// For symmetric storage the upper-triangle position is returned.
    pub fn physical_to_logical(&self, index: usize) -> Option<(usize, usize)> {
        (0..self.cols)
            .flat_map(|j| (0..self.rows).map(move |i| (i, j)))
            .find(|&(i, j)| {
                matches!(self.logical_to_physical(i, j), Ok(ElementMap::Stored(p)) if p == index)
                    && !(self.shape == TensorShape::SymmetricMatrix && i > j)
            })
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} {}", self.rows, self.cols, self.shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_physical_elements() {
        assert_eq!(TensorShape::ColMajorMatrix.physical_elements(2, 3), 6);
        assert_eq!(TensorShape::DiagonalMatrix.physical_elements(3, 2), 2);
        assert_eq!(TensorShape::SymmetricMatrix.physical_elements(3, 3), 6);
        assert_eq!(TensorShape::LowerTriangularMatrix.physical_elements(4, 4), 10);
        assert_eq!(TensorShape::Scalar.physical_elements(1, 1), 1);
    }

    #[test]
    fn test_physical_never_exceeds_logical() {
        let shapes = [
            TensorShape::ColMajorMatrix,
            TensorShape::RowMajorMatrix,
            TensorShape::DiagonalMatrix,
            TensorShape::SymmetricMatrix,
            TensorShape::UpperTriangularMatrix,
            TensorShape::LowerTriangularMatrix,
        ];
        for shape in shapes {
            for n in 1..6 {
                assert!(shape.physical_elements(n, n) <= n * n, "{shape} {n}x{n}");
            }
        }
    }

    #[test]
    fn test_is_valid_for() {
        assert!(TensorShape::DiagonalMatrix.is_valid_for(2, 3));
        assert!(!TensorShape::SymmetricMatrix.is_valid_for(2, 3));
        assert!(!TensorShape::UpperTriangularMatrix.is_valid_for(3, 2));
        assert!(!TensorShape::ColVector.is_valid_for(3, 2));
        assert!(!TensorShape::Scalar.is_valid_for(2, 1));
        assert!(!TensorShape::ColMajorMatrix.is_valid_for(0, 2));
    }

    #[test]
    fn test_dense_mapping() {
        let cm = TensorShape::ColMajorMatrix;
        assert_eq!(cm.logical_to_physical(2, 3, 1, 2).unwrap(), ElementMap::Stored(5));
        let rm = TensorShape::RowMajorMatrix;
        assert_eq!(rm.logical_to_physical(2, 3, 1, 2).unwrap(), ElementMap::Stored(5));
        assert_eq!(rm.logical_to_physical(2, 3, 0, 1).unwrap(), ElementMap::Stored(1));
        assert_eq!(cm.logical_to_physical(2, 3, 0, 1).unwrap(), ElementMap::Stored(2));
    }

    #[test]
    fn test_symmetric_mapping() {
        let s = TensorShape::SymmetricMatrix;
        // 2x2: [ (0,0), (1,1), (0,1) ]
        assert_eq!(s.logical_to_physical(2, 2, 0, 0).unwrap(), ElementMap::Stored(0));
        assert_eq!(s.logical_to_physical(2, 2, 1, 1).unwrap(), ElementMap::Stored(1));
        assert_eq!(s.logical_to_physical(2, 2, 0, 1).unwrap(), ElementMap::Stored(2));
        assert_eq!(s.logical_to_physical(2, 2, 1, 0).unwrap(), ElementMap::Stored(2));
        // 3x3 off-diagonal slots follow the diagonal column by column
        assert_eq!(s.logical_to_physical(3, 3, 0, 1).unwrap(), ElementMap::Stored(3));
        assert_eq!(s.logical_to_physical(3, 3, 0, 2).unwrap(), ElementMap::Stored(4));
        assert_eq!(s.logical_to_physical(3, 3, 2, 1).unwrap(), ElementMap::Stored(5));
    }

    #[test]
    fn test_structural_zeros() {
        let d = TensorShape::DiagonalMatrix;
        assert_eq!(d.logical_to_physical(2, 2, 0, 1).unwrap(), ElementMap::Zero);
        assert_eq!(d.logical_to_physical(2, 2, 1, 1).unwrap(), ElementMap::Stored(1));

        let u = TensorShape::UpperTriangularMatrix;
        assert_eq!(u.logical_to_physical(3, 3, 2, 0).unwrap(), ElementMap::Zero);
        assert_eq!(u.logical_to_physical(3, 3, 1, 2).unwrap(), ElementMap::Stored(5));

        let l = TensorShape::LowerTriangularMatrix;
        assert_eq!(l.logical_to_physical(3, 3, 1, 2).unwrap(), ElementMap::Zero);
        assert_eq!(l.logical_to_physical(3, 3, 2, 1).unwrap(), ElementMap::Stored(5));
    }

    #[test]
    fn test_mapping_is_within_physical_range() {
        let shapes = [
            TensorShape::ColMajorMatrix,
            TensorShape::RowMajorMatrix,
            TensorShape::DiagonalMatrix,
            TensorShape::SymmetricMatrix,
            TensorShape::UpperTriangularMatrix,
            TensorShape::LowerTriangularMatrix,
        ];
        for shape in shapes {
            let n = 4;
            let physical = shape.physical_elements(n, n);
            let mut seen = vec![false; physical];
            for i in 0..n {
                for j in 0..n {
                    if let ElementMap::Stored(p) = shape.logical_to_physical(n, n, i, j).unwrap() {
                        assert!(p < physical, "{shape} ({i},{j}) -> {p}");
                        seen[p] = true;
                    }
                }
            }
            assert!(seen.iter().all(|&s| s), "{shape} leaves slots unused");
        }
    }

    #[test]
    fn test_out_of_range_index() {
        let d = TensorShape::DiagonalMatrix;
        assert!(d.logical_to_physical(2, 2, 2, 0).is_err());
        assert!(d.logical_to_physical(2, 2, 0, 2).is_err());
    }

    #[test]
    fn test_combine() {
        use TensorShape::*;
        assert_eq!(TensorShape::combine(DiagonalMatrix, SymmetricMatrix), ColMajorMatrix);
        assert_eq!(TensorShape::combine(SymmetricMatrix, DiagonalMatrix), ColMajorMatrix);
        assert_eq!(TensorShape::combine(DiagonalMatrix, DiagonalMatrix), DiagonalMatrix);
        assert_eq!(TensorShape::combine(DiagonalMatrix, UpperTriangularMatrix), UpperTriangularMatrix);
        assert_eq!(TensorShape::combine(LowerTriangularMatrix, DiagonalMatrix), LowerTriangularMatrix);
        assert_eq!(TensorShape::combine(UpperTriangularMatrix, LowerTriangularMatrix), ColMajorMatrix);
        assert_eq!(TensorShape::combine(RowMajorMatrix, RowMajorMatrix), RowMajorMatrix);
        assert_eq!(TensorShape::combine(RowMajorMatrix, SymmetricMatrix), ColMajorMatrix);
        assert_eq!(TensorShape::combine(Scalar, SymmetricMatrix), SymmetricMatrix);
        assert_eq!(TensorShape::combine(RowVector, Scalar), RowVector);
        assert_eq!(TensorShape::combine(Scalar, DiagonalMatrix), ColMajorMatrix);
        assert_eq!(TensorShape::combine(UpperTriangularMatrix, Scalar), ColMajorMatrix);
        assert_eq!(TensorShape::combine(Scalar, LowerTriangularMatrix), ColMajorMatrix);
    }

    #[test]
    fn test_tensor_normalisation() {
        let t = Tensor::new(TensorShape::DiagonalMatrix, 1, 1).unwrap();
        assert!(t.is_scalar());
        let t = Tensor::matrix(3, 1).unwrap();
        assert_eq!(t.shape(), TensorShape::ColVector);
        let t = Tensor::new(TensorShape::RowMajorMatrix, 1, 4).unwrap();
        assert_eq!(t.shape(), TensorShape::RowVector);
        let t = Tensor::vector(3).unwrap();
        assert_eq!(t.physical_elements(), 3);
    }

    #[test]
    fn test_tensor_rejects_non_square_symmetric() {
        assert!(Tensor::new(TensorShape::SymmetricMatrix, 2, 3).is_err());
        let mut t = Tensor::matrix(2, 2).unwrap();
        assert!(t.set_shape(TensorShape::LowerTriangularMatrix, 3, 2).is_err());
        assert_eq!(t.shape(), TensorShape::ColMajorMatrix);
        t.set_shape(TensorShape::SymmetricMatrix, 2, 2).unwrap();
        assert_eq!(t.physical_elements(), 3);
    }

    #[test]
    fn test_physical_to_logical() {
        let t = Tensor::new(TensorShape::SymmetricMatrix, 2, 2).unwrap();
        assert_eq!(t.physical_to_logical(0), Some((0, 0)));
        assert_eq!(t.physical_to_logical(1), Some((1, 1)));
        assert_eq!(t.physical_to_logical(2), Some((0, 1)));
        assert_eq!(t.physical_to_logical(3), None);
    }
}
