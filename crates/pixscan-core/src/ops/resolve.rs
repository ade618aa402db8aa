//! Broadcasting resolution: output extents, output tensor and working type.
//!
//! Everything here is a precondition check; nothing is allocated until the
//! plan has been accepted.

use smallvec::SmallVec;

use crate::dtype::DType;
use crate::error::ScanError;
use crate::image::Image;
use crate::ops::binary::BinaryOp;
use crate::options::ScanOptions;
use crate::shape::Shape;
use crate::tensor::{ElementMap, Tensor, TensorShape};
use crate::Result;

/// How one input is read while scanning the output.
#[derive(Debug, Clone)]
pub struct OperandPlan {
    /// Stride per output dimension; 0 along broadcast dimensions.
    pub strides: SmallVec<[usize; 4]>,
    pub offset: usize,
    pub tensor_stride: usize,
    /// Source of each physical output tensor element.
    pub elements: SmallVec<[ElementMap; 9]>,
    pub dtype: DType,
}

/// The resolved description of a binary scan.
#[derive(Debug, Clone)]
pub struct ScanPlan {
    pub dims: Shape,
    pub tensor: Tensor,
    /// Type the operator computes in.
    pub working: DType,
    /// Type stored in the output image.
    pub output: DType,
    pub lhs: OperandPlan,
    pub rhs: OperandPlan,
}

impl ScanPlan {
    /// Number of samples the output holds.
    pub fn output_samples(&self) -> usize {
        self.dims.numel() * self.tensor.physical_elements()
    }
}

/// Broadcast the spatial extents of two images.
pub fn broadcast_dims(lhs: &Shape, rhs: &Shape) -> Result<Shape> {
    lhs.broadcast_with(rhs).ok_or_else(|| ScanError::DimensionMismatch {
        a: lhs.dims().to_vec(),
        b: rhs.dims().to_vec(),
    })
}

/// Output tensor for two input tensors.
///
/// A scalar tensor is replicated over every position of the other side's
/// tensor. Otherwise sizes must match. Either way the shape follows
/// [`TensorShape::combine`].
pub fn broadcast_tensor(lhs: &Tensor, rhs: &Tensor) -> Result<Tensor> {
    let (rows, cols) = if lhs.is_scalar() {
        (rhs.rows(), rhs.columns())
    } else if rhs.is_scalar() || (lhs.rows() == rhs.rows() && lhs.columns() == rhs.columns()) {
        (lhs.rows(), lhs.columns())
    } else {
        return Err(ScanError::TensorShapeMismatch {
            a_rows: lhs.rows(),
            a_cols: lhs.columns(),
            b_rows: rhs.rows(),
            b_cols: rhs.columns(),
        });
    };
    Tensor::new(TensorShape::combine(lhs.shape(), rhs.shape()), rows, cols)
}

fn operand_plan(image: &Image, dims: &Shape, out_tensor: &Tensor) -> Result<OperandPlan> {
    let strides = (0..dims.ndim())
        .map(|d| {
            if image.dimensions().dim_or_one(d) == 1 {
                0
            } else {
                image.strides()[d]
            }
        })
        .collect();

    let elements = (0..out_tensor.physical_elements())
        .map(|p| {
            if image.tensor().is_scalar() {
                return Ok(ElementMap::Stored(0));
            }
            let (i, j) = out_tensor.physical_to_logical(p).ok_or_else(|| {
                ScanError::InvalidShape(format!("{out_tensor} has no element {p}"))
            })?;
            image.tensor().logical_to_physical(i, j)
        })
        .collect::<Result<_>>()?;

    Ok(OperandPlan {
        strides,
        offset: image.offset(),
        tensor_stride: image.tensor_stride(),
        elements,
        dtype: image.dtype(),
    })
}

/// Resolve the scan of `op` over `lhs` and `rhs`.
pub fn resolve<O: BinaryOp>(
    lhs: &Image,
    rhs: &Image,
    op: &O,
    options: &ScanOptions,
) -> Result<ScanPlan> {
    let dims = broadcast_dims(lhs.dimensions(), rhs.dimensions())?;
    let tensor = broadcast_tensor(lhs.tensor(), rhs.tensor())?;
    let working = DType::promote(lhs.dtype(), rhs.dtype());
    if !op.supports(working) {
        return Err(ScanError::UnsupportedOperator { op: op.name(), dtype: working });
    }
    let output = options.output_dtype.unwrap_or(working);

    tracing::debug!(
        op = op.name(),
        lhs = %format!("{} {} {}", lhs.dimensions(), lhs.tensor(), lhs.dtype()),
        rhs = %format!("{} {} {}", rhs.dimensions(), rhs.tensor(), rhs.dtype()),
        dims = %dims,
        tensor = %tensor,
        working = %working,
        output = %output,
        "resolved scan"
    );

    Ok(ScanPlan {
        lhs: operand_plan(lhs, &dims, &tensor)?,
        rhs: operand_plan(rhs, &dims, &tensor)?,
        dims,
        tensor,
        working,
        output,
    })
}
