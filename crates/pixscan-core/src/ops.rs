//! Elementwise operations on images.
//!
//! All operations return new images (functional style). The scan framework
//! in [`scan`] does the broadcasting; [`binary`] holds the operator catalogue.

pub mod arithmetic;
pub mod binary;
pub mod resolve;
pub mod scan;
