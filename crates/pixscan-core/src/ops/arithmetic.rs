//! Element-wise arithmetic on images.

use crate::image::Image;
use crate::ops::binary::{Add, BinaryOp, Div, Max, Min, MulSampleWise, Sub};
use crate::ops::scan::scan;
use crate::options::ScanOptions;
use crate::Result;

impl Image {
    /// Element-wise addition: self + other.
    pub fn add(&self, other: &Image) -> Result<Image> {
        scan(self, other, &Add, &ScanOptions::default())
    }

    /// Element-wise subtraction: self - other.
    pub fn sub(&self, other: &Image) -> Result<Image> {
        scan(self, other, &Sub, &ScanOptions::default())
    }

    /// Sample-wise multiplication, position by position.
    pub fn mul_sample_wise(&self, other: &Image) -> Result<Image> {
        scan(self, other, &MulSampleWise, &ScanOptions::default())
    }

    /// Element-wise division: self / other.
    pub fn div(&self, other: &Image) -> Result<Image> {
        scan(self, other, &Div, &ScanOptions::default())
    }

    /// Element-wise maximum.
    pub fn max(&self, other: &Image) -> Result<Image> {
        scan(self, other, &Max, &ScanOptions::default())
    }

    /// Element-wise minimum.
    pub fn min(&self, other: &Image) -> Result<Image> {
        scan(self, other, &Min, &ScanOptions::default())
    }

    /// Apply any binary operator with explicit options.
    pub fn scan_with<O: BinaryOp>(&self, other: &Image, op: O, options: &ScanOptions) -> Result<Image> {
        scan(self, other, &op, options)
    }
}

// Operator overloads
impl std::ops::Add for &Image {
    type Output = Result<Image>;
    fn add(self, rhs: &Image) -> Result<Image> {
        Image::add(self, rhs)
    }
}

impl std::ops::Sub for &Image {
    type Output = Result<Image>;
    fn sub(self, rhs: &Image) -> Result<Image> {
        Image::sub(self, rhs)
    }
}
