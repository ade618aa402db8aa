//! # pixscan-core
//!
//! Broadcasting scan framework for images whose pixels are small tensors.
//!
//! Provides:
//! - Runtime-selected sample types (`u8` .. `f64`) with a promotion lattice
//! - Compact tensor storage (diagonal, symmetric, triangular matrices)
//! - Reference-counted pixel buffers with zero-copy views
//! - A generic binary scan that broadcasts extents, unifies tensor shapes
//!   and promotes sample types

pub mod dtype;
pub mod element;
pub mod error;
pub mod image;
pub mod ops;
pub mod options;
pub mod prelude;
pub mod shape;
pub mod storage;
pub mod tensor;

pub use dtype::DType;
pub use element::Element;
pub use error::ScanError;
pub use image::Image;
pub use ops::binary::BinaryOp;
pub use options::ScanOptions;
pub use shape::Shape;
pub use storage::Storage;
pub use tensor::{ElementMap, Tensor, TensorShape};

pub type Result<T> = std::result::Result<T, ScanError>;
