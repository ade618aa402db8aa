use std::fmt;

use smallvec::SmallVec;

use crate::dispatch_dtype;
use crate::dtype::DType;
use crate::element::Element;
use crate::error::ScanError;
use crate::shape::Shape;
use crate::storage::Storage;
use crate::tensor::Tensor;
use crate::Result;

/// An N-dimensional image whose pixels are small tensors.
///
/// Images support:
/// - Any [`DType`] chosen at runtime
/// - Compact tensor shapes (diagonal, symmetric, triangular)
/// - Zero-copy views that share the pixel buffer
///
/// # Examples
///
/// ```
/// use pixscan_core::{DType, Image};
///
/// let mut img = Image::new(&[4, 3], 2, DType::U8).unwrap();
/// img.set(7u8).unwrap();
/// img.tensor_element(1).unwrap().at(&[2, 1]).unwrap().set(9u8).unwrap();
///
/// assert_eq!(img.sample::<u8>(&[2, 1], 0).unwrap(), 7);
/// assert_eq!(img.sample::<u8>(&[2, 1], 1).unwrap(), 9);
/// ```
#[derive(Clone)]
pub struct Image {
    storage: Storage,
    shape: Shape,
    strides: SmallVec<[usize; 4]>,
    tensor: Tensor,
    tensor_stride: usize,
    offset: usize,
}

impl Image {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Create a zeroed image whose pixels are column vectors of
    /// `tensor_elements` samples.
    pub fn new(dims: &[usize], tensor_elements: usize, dtype: DType) -> Result<Self> {
        Self::with_tensor(dims, Tensor::vector(tensor_elements)?, dtype)
    }

    /// Create a zeroed image with an explicit tensor description.
    pub fn with_tensor(dims: &[usize], tensor: Tensor, dtype: DType) -> Result<Self> {
        if let Some(axis) = dims.iter().position(|&d| d == 0) {
            return Err(ScanError::InvalidShape(format!(
                "dimension {axis} of {dims:?} has zero extent"
            )));
        }
        let shape = Shape::new(dims);
        let n_tensor = tensor.physical_elements();
        let numel = shape
            .checked_numel()
            .and_then(|p| p.checked_mul(n_tensor))
            .ok_or_else(|| {
                ScanError::Allocation(format!("{dims:?} x {n_tensor} samples overflow usize"))
            })?;
        let storage = Storage::zeros(dtype, numel)?;
        let strides = shape.contiguous_strides(n_tensor);
        Ok(Self {
            storage,
            shape,
            strides,
            tensor,
            tensor_stride: 1,
            offset: 0,
        })
    }

    /// Create an image from samples in default layout order: all tensor
    /// elements of the first pixel, then the next pixel along dimension 0.
    pub fn from_samples<T: Element>(dims: &[usize], tensor: Tensor, samples: &[T]) -> Result<Self> {
        let img = Self::with_tensor(dims, tensor, T::DTYPE)?;
        if samples.len() != img.storage.numel() {
            return Err(ScanError::InvalidShape(format!(
                "{dims:?} with {tensor} needs {} samples, got {}",
                img.storage.numel(),
                samples.len()
            )));
        }
        img.storage.write(|dst: &mut [T]| dst.copy_from_slice(samples))?;
        Ok(img)
    }

    // =========================================================================
    // Properties
    // =========================================================================

    /// Spatial extents.
    pub fn dimensions(&self) -> &Shape {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.ndim()
    }

    pub fn number_of_pixels(&self) -> usize {
        self.shape.numel()
    }

    pub fn tensor(&self) -> &Tensor {
        &self.tensor
    }

    pub fn tensor_shape(&self) -> crate::TensorShape {
        self.tensor.shape()
    }

    pub fn tensor_rows(&self) -> usize {
        self.tensor.rows()
    }

    pub fn tensor_columns(&self) -> usize {
        self.tensor.columns()
    }

    /// Physical tensor elements per pixel.
    pub fn tensor_elements(&self) -> usize {
        self.tensor.physical_elements()
    }

    pub fn dtype(&self) -> DType {
        self.storage.dtype()
    }

    /// Spatial strides (in samples, not bytes).
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Distance between consecutive tensor elements of a pixel.
    pub fn tensor_stride(&self) -> usize {
        self.tensor_stride
    }

    /// Offset of the first sample into the storage.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Whether both images are views on the same buffer.
    pub fn shares_storage_with(&self, other: &Image) -> bool {
        self.storage.ptr_eq(&other.storage)
    }

    // =========================================================================
    // Tensor relabelling and views
    // =========================================================================

    /// Reinterpret the pixel samples under a different tensor description.
    ///
    /// No data moves; only the number of physical elements must agree.
    pub fn reshape_tensor(&mut self, tensor: Tensor) -> Result<()> {
        if tensor.physical_elements() != self.tensor.physical_elements() {
            return Err(ScanError::ShapeMismatch {
                expected: self.tensor.physical_elements(),
                got: tensor.physical_elements(),
            });
        }
        self.tensor = tensor;
        Ok(())
    }

    /// View of physical tensor element `index` across all pixels.
    pub fn tensor_element(&self, index: usize) -> Result<Image> {
        let size = self.tensor.physical_elements();
        if index >= size {
            return Err(ScanError::IndexOutOfRange { what: "tensor element", index, size });
        }
        Ok(Image {
            storage: self.storage.clone(),
            shape: self.shape.clone(),
            strides: self.strides.clone(),
            tensor: Tensor::scalar(),
            tensor_stride: self.tensor_stride,
            offset: self.offset + index * self.tensor_stride,
        })
    }

    /// View of the single pixel at `coords`, with all its tensor elements.
    ///
    /// The view has zero spatial dimensions.
    pub fn at(&self, coords: &[usize]) -> Result<Image> {
        if coords.len() != self.ndim() {
            return Err(ScanError::IndexOutOfRange {
                what: "coordinate count",
                index: coords.len(),
                size: self.ndim(),
            });
        }
        let mut offset = self.offset;
        for (axis, (&c, &d)) in coords.iter().zip(self.shape.dims()).enumerate() {
            if c >= d {
                return Err(ScanError::IndexOutOfRange {
                    what: AXIS_NAMES.get(axis).copied().unwrap_or("coordinate"),
                    index: c,
                    size: d,
                });
            }
            offset += c * self.strides[axis];
        }
        Ok(Image {
            storage: self.storage.clone(),
            shape: Shape::scalar(),
            strides: SmallVec::new(),
            tensor: self.tensor,
            tensor_stride: self.tensor_stride,
            offset,
        })
    }

    /// Call `f` with the storage offset of every pixel, dimension 0 fastest.
    pub(crate) fn for_each_pixel(&self, mut f: impl FnMut(usize)) {
        let dims = self.shape.dims();
        let mut coords: SmallVec<[usize; 4]> = SmallVec::from_elem(0, dims.len());
        let mut offset = self.offset;
        for _ in 0..self.number_of_pixels() {
            f(offset);
            for axis in 0..dims.len() {
                coords[axis] += 1;
                offset += self.strides[axis];
                if coords[axis] < dims[axis] {
                    break;
                }
                offset -= coords[axis] * self.strides[axis];
                coords[axis] = 0;
            }
        }
    }

    // =========================================================================
    // Data access
    // =========================================================================

    /// Write `value`, saturated to this image's dtype, into every sample the
    /// image addresses. Views write through to the shared buffer.
    pub fn set<V: Element>(&mut self, value: V) -> Result<()> {
        dispatch_dtype!(self.dtype(), T => self.fill::<T>(T::cast_from(value)))
    }

    fn fill<T: Element>(&self, value: T) -> Result<()> {
        let n = self.tensor.physical_elements();
        let ts = self.tensor_stride;
        self.storage.write(|buf: &mut [T]| {
            self.for_each_pixel(|off| {
                for k in 0..n {
                    buf[off + k * ts] = value;
                }
            })
        })
    }

    /// Read one sample, converted to `T`.
    pub fn sample<T: Element>(&self, coords: &[usize], tensor_index: usize) -> Result<T> {
        self.at(coords)?.tensor_element(tensor_index)?.first_sample()
    }

    fn first_sample<T: Element>(&self) -> Result<T> {
        dispatch_dtype!(self.dtype(), S => self.storage.read(|buf: &[S]| T::cast_from(buf[self.offset])))
    }

    /// Value of a single-sample image (one pixel, scalar tensor).
    pub fn as_f64(&self) -> Result<f64> {
        if self.number_of_pixels() != 1 || self.tensor.physical_elements() != 1 {
            return Err(ScanError::InvalidShape(format!(
                "as_f64 needs a single sample, image has {} pixels of {}",
                self.number_of_pixels(),
                self.tensor
            )));
        }
        self.first_sample()
    }

    /// All samples in default layout order, converted to `T`.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        dispatch_dtype!(self.dtype(), S => self.collect_samples::<S, T>())
    }

    fn collect_samples<S: Element, T: Element>(&self) -> Result<Vec<T>> {
        let n = self.tensor.physical_elements();
        let ts = self.tensor_stride;
        let mut values = Vec::with_capacity(self.number_of_pixels() * n);
        self.storage.read(|buf: &[S]| {
            self.for_each_pixel(|off| {
                values.extend((0..n).map(|k| T::cast_from(buf[off + k * ts])));
            })
        })?;
        Ok(values)
    }

    /// Deep copy with saturating conversion to `dtype`.
    pub fn convert(&self, dtype: DType) -> Result<Image> {
        let out = Image::with_tensor(self.shape.dims(), self.tensor, dtype)?;
        dispatch_dtype!(dtype, D => {
            let values = self.to_vec::<D>()?;
            out.storage.write(|dst: &mut [D]| dst.copy_from_slice(&values))?;
        });
        Ok(out)
    }

    /// Deep copy into a fresh, uniquely owned buffer.
    pub fn copy(&self) -> Result<Image> {
        self.convert(self.dtype())
    }
}

const AXIS_NAMES: [&str; 4] = ["x coordinate", "y coordinate", "z coordinate", "t coordinate"];

/// Pixels printed by `Display` before the listing is elided.
const DISPLAY_PIXELS: usize = 16;

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Image(dims={}, tensor={}, dtype={}, strides={:?}, tensor_stride={})",
            self.shape,
            self.tensor,
            self.dtype(),
            self.strides.as_slice(),
            self.tensor_stride,
        )
    }
}

impl fmt::Display for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "image {}, {}, {}", self.shape, self.tensor, self.dtype())?;
        if self.number_of_pixels() > DISPLAY_PIXELS {
            return Ok(());
        }
        let values = self.to_vec::<f64>().map_err(|_| fmt::Error)?;
        let n = self.tensor.physical_elements();
        for pixel in values.chunks(n) {
            write!(f, "\n  {pixel:?}")?;
        }
        Ok(())
    }
}
