use smallvec::SmallVec;
use std::fmt;

/// Spatial extents of an image, stack-allocated for up to four dimensions.
///
/// Dimension 0 is the fastest-varying one in the default layout. Images are
/// usually 2D or 3D, so the common case needs no heap allocation.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Shape {
    dims: SmallVec<[usize; 4]>,
}

impl Shape {
    /// Create a new shape from dimensions.
    pub fn new(dims: &[usize]) -> Self {
        Self {
            dims: SmallVec::from_slice(dims),
        }
    }

    /// Zero-dimensional shape: a single pixel.
    pub fn scalar() -> Self {
        Self {
            dims: SmallVec::new(),
        }
    }

    /// Number of dimensions (rank).
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Total number of pixels.
    pub fn numel(&self) -> usize {
        self.dims.iter().product()
    }

    /// Total number of pixels, or `None` if the product overflows.
    pub fn checked_numel(&self) -> Option<usize> {
        self.dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }

    /// Get dimension sizes as a slice.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Get size of a specific dimension.
    pub fn dim(&self, axis: usize) -> Option<usize> {
        self.dims.get(axis).copied()
    }

    /// Extent along `axis`, treating dimensions past the rank as singletons.
    pub fn dim_or_one(&self, axis: usize) -> usize {
        self.dims.get(axis).copied().unwrap_or(1)
    }

    /// Whether this is a zero-dimensional shape.
    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty()
    }

    /// Strides for the default layout: dimension 0 fastest, consecutive
    /// pixels `step` samples apart.
    pub fn contiguous_strides(&self, step: usize) -> SmallVec<[usize; 4]> {
        let mut strides = SmallVec::with_capacity(self.ndim());
        let mut acc = step;
        for &d in &self.dims {
            strides.push(acc);
            acc *= d;
        }
        strides
    }

    /// Broadcast this shape with another, dimension by dimension from 0.
    ///
    /// Missing trailing dimensions count as extent 1. Returns `None` when
    /// two extents differ and neither is 1.
    pub fn broadcast_with(&self, other: &Shape) -> Option<Shape> {
        let max_ndim = self.ndim().max(other.ndim());
        let mut result = SmallVec::with_capacity(max_ndim);

        for i in 0..max_ndim {
            let a = self.dim_or_one(i);
            let b = other.dim_or_one(i);

            if a == b {
                result.push(a);
            } else if a == 1 {
                result.push(b);
            } else if b == 1 {
                result.push(a);
            } else {
                return None;
            }
        }

        Some(Shape { dims: result })
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shape({:?})", self.dims.as_slice())
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "}}")
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Shape::new(dims)
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape {
            dims: SmallVec::from_vec(dims),
        }
    }
}

macro_rules! impl_shape_from_array {
    ($($n:expr),*) => {
        $(
            impl From<[usize; $n]> for Shape {
                fn from(dims: [usize; $n]) -> Self {
                    Shape::new(&dims)
                }
            }
        )*
    };
}

impl_shape_from_array!(0, 1, 2, 3, 4, 5, 6);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar() {
        let s = Shape::scalar();
        assert_eq!(s.ndim(), 0);
        assert_eq!(s.numel(), 1);
        assert!(s.is_scalar());
    }

    #[test]
    fn test_basic_shape() {
        let s = Shape::new(&[50, 80, 30]);
        assert_eq!(s.ndim(), 3);
        assert_eq!(s.numel(), 120_000);
        assert_eq!(s.dim(1), Some(80));
        assert_eq!(s.dim(3), None);
        assert_eq!(s.dim_or_one(3), 1);
    }

    #[test]
    fn test_checked_numel() {
        assert_eq!(Shape::new(&[usize::MAX, 2]).checked_numel(), None);
        assert_eq!(Shape::new(&[4, 5]).checked_numel(), Some(20));
    }

    #[test]
    fn test_contiguous_strides() {
        let s = Shape::new(&[2, 3, 4]);
        assert_eq!(s.contiguous_strides(1).as_slice(), &[1, 2, 6]);
        assert_eq!(s.contiguous_strides(4).as_slice(), &[4, 8, 24]);
    }

    #[test]
    fn test_broadcast() {
        let a = Shape::new(&[50, 80, 30]);
        let b = Shape::new(&[50, 1, 30]);
        assert_eq!(a.broadcast_with(&b).unwrap().dims(), &[50, 80, 30]);

        let a = Shape::new(&[3, 1]);
        let b = Shape::new(&[1, 4]);
        assert_eq!(a.broadcast_with(&b).unwrap().dims(), &[3, 4]);

        // missing trailing dimensions are singletons
        let a = Shape::new(&[5]);
        let b = Shape::new(&[5, 7]);
        assert_eq!(a.broadcast_with(&b).unwrap().dims(), &[5, 7]);

        let a = Shape::new(&[2, 3]);
        let b = Shape::new(&[4, 3]);
        assert!(a.broadcast_with(&b).is_none());

        let a = Shape::new(&[3]);
        let b = Shape::new(&[2, 3]);
        assert!(a.broadcast_with(&b).is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(Shape::new(&[50, 80, 30]).to_string(), "{50, 80, 30}");
        assert_eq!(Shape::scalar().to_string(), "{}");
    }

    #[test]
    fn test_from_array() {
        let s: Shape = [2, 3].into();
        assert_eq!(s.dims(), &[2, 3]);

        let s: Shape = [1, 2, 3, 4].into();
        assert_eq!(s.numel(), 24);
    }
}
