//! Convenience re-exports for common pixscan-core types.
//!
//! ```rust
//! use pixscan_core::prelude::*;
//! ```

pub use crate::ops::binary::{Add, BitAnd, BitOr, BitXor, Div, Max, Min, MulSampleWise, Sub};
pub use crate::BinaryOp;
pub use crate::DType;
pub use crate::Element;
pub use crate::Image;
pub use crate::Result;
pub use crate::ScanError;
pub use crate::ScanOptions;
pub use crate::Shape;
pub use crate::{Tensor, TensorShape};
