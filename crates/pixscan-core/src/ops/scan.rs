//! The scan engine: fills a fresh output image line by line.
//!
//! Lines run along dimension 0. For every line and output tensor element the
//! two inputs are gathered into working-type buffers (broadcast dimensions
//! have stride 0, structural zeros fill the buffer with zero), combined by
//! the operator and written into the output.

use rayon::prelude::*;

use crate::dispatch_dtype;
use crate::dtype::DType;
use crate::element::Element;
use crate::image::Image;
use crate::ops::binary::BinaryOp;
use crate::ops::resolve::{resolve, OperandPlan, ScanPlan};
use crate::options::ScanOptions;
use crate::tensor::ElementMap;
use crate::Result;

/// Copies `dst.len()` samples starting at `start`, `stride` apart, converting
/// them to the working type.
type Gather<W> = fn(&[u64], usize, usize, &mut [W]);

fn gather<S: Element, W: Element>(words: &[u64], start: usize, stride: usize, dst: &mut [W]) {
    let src: &[S] = bytemuck::cast_slice(words);
    for (x, d) in dst.iter_mut().enumerate() {
        *d = W::cast_from(src[start + x * stride]);
    }
}

fn gather_for<W: Element>(dtype: DType) -> Gather<W> {
    dispatch_dtype!(dtype, S => gather::<S, W> as Gather<W>)
}

/// One input bound to its locked samples.
struct Source<'a, W> {
    words: &'a [u64],
    plan: &'a OperandPlan,
    gather: Gather<W>,
}

impl<W: Element> Source<'_, W> {
    fn line(&self, base: usize, element: ElementMap, dst: &mut [W]) {
        match element {
            ElementMap::Stored(k) => {
                let stride0 = self.plan.strides.first().copied().unwrap_or(0);
                (self.gather)(self.words, base + k * self.plan.tensor_stride, stride0, dst);
            }
            ElementMap::Zero => dst.fill(W::zero()),
        }
    }
}

/// Apply `op` to `lhs` and `rhs` with broadcasting.
///
/// The output has the broadcast extents, the combined tensor and a freshly
/// allocated buffer in default layout. Inputs are only read.
pub fn scan<O: BinaryOp>(lhs: &Image, rhs: &Image, op: &O, options: &ScanOptions) -> Result<Image> {
    let plan = resolve(lhs, rhs, op, options)?;
    let out = Image::with_tensor(plan.dims.dims(), plan.tensor, plan.working)?;
    let parallel = plan.output_samples() >= options.parallel_threshold;
    tracing::trace!(
        op = op.name(),
        samples = plan.output_samples(),
        mode = if parallel { "parallel" } else { "sequential" },
        "scanning"
    );

    dispatch_dtype!(plan.working, W => run::<W, O>(&plan, lhs, rhs, &out, op, parallel))?;

    match plan.output {
        dtype if dtype == plan.working => Ok(out),
        dtype => out.convert(dtype),
    }
}

fn run<W: Element, O: BinaryOp>(
    plan: &ScanPlan,
    lhs: &Image,
    rhs: &Image,
    out: &Image,
    op: &O,
    parallel: bool,
) -> Result<()> {
    let lhs_words = lhs.storage().lock_read();
    let rhs_words = rhs.storage().lock_read();
    let a = Source { words: &lhs_words, plan: &plan.lhs, gather: gather_for::<W>(plan.lhs.dtype) };
    let b = Source { words: &rhs_words, plan: &plan.rhs, gather: gather_for::<W>(plan.rhs.dtype) };

    let dims = plan.dims.dims();
    let line_len = plan.dims.dim_or_one(0);
    let n_out = plan.tensor.physical_elements();

    let fill_line = |(bufs, line, chunk): (&mut (Vec<W>, Vec<W>), usize, &mut [W])| {
        let (buf_a, buf_b) = bufs;
        let mut rem = line;
        let mut base_a = a.plan.offset;
        let mut base_b = b.plan.offset;
        for (d, &extent) in dims.iter().enumerate().skip(1) {
            let c = rem % extent;
            rem /= extent;
            base_a += c * a.plan.strides[d];
            base_b += c * b.plan.strides[d];
        }
        for p in 0..n_out {
            a.line(base_a, a.plan.elements[p], buf_a);
            b.line(base_b, b.plan.elements[p], buf_b);
            for (x, (&va, &vb)) in buf_a.iter().zip(buf_b.iter()).enumerate() {
                chunk[x * n_out + p] = op.apply(va, vb);
            }
        }
    };
    let new_bufs = || (vec![W::zero(); line_len], vec![W::zero(); line_len]);

    out.storage().write(|dst: &mut [W]| {
        if parallel {
            dst.par_chunks_mut(line_len * n_out)
                .enumerate()
                .for_each_init(new_bufs, |bufs, (line, chunk)| fill_line((bufs, line, chunk)));
        } else {
            let mut bufs = new_bufs();
            for (line, chunk) in dst.chunks_mut(line_len * n_out).enumerate() {
                fill_line((&mut bufs, line, chunk));
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::binary::{Add, Sub};
    use crate::tensor::{Tensor, TensorShape};

    #[test]
    fn test_same_shape_add() {
        let a = Image::from_samples(&[3], Tensor::scalar(), &[1.0f32, 2.0, 3.0]).unwrap();
        let b = Image::from_samples(&[3], Tensor::scalar(), &[4.0f32, 5.0, 6.0]).unwrap();
        let c = scan(&a, &b, &Add, &ScanOptions::default()).unwrap();
        assert_eq!(c.to_vec::<f32>().unwrap(), vec![5.0, 7.0, 9.0]);
        assert!(c.storage().is_unique());
    }

    #[test]
    fn test_broadcast_along_each_axis() {
        // a: 3x1, b: 1x2
        let a = Image::from_samples(&[3, 1], Tensor::scalar(), &[1i32, 2, 3]).unwrap();
        let b = Image::from_samples(&[1, 2], Tensor::scalar(), &[10i32, 20]).unwrap();
        let c = scan(&a, &b, &Add, &ScanOptions::sequential()).unwrap();
        assert_eq!(c.dimensions().dims(), &[3, 2]);
        assert_eq!(c.to_vec::<i32>().unwrap(), vec![11, 12, 13, 21, 22, 23]);
    }

    #[test]
    fn test_scalar_tensor_replicates() {
        let v = Image::from_samples(&[2], Tensor::vector(3).unwrap(), &[1u8, 2, 3, 4, 5, 6]).unwrap();
        let s = Image::from_samples(&[2], Tensor::scalar(), &[10u8, 20]).unwrap();
        let c = scan(&v, &s, &Add, &ScanOptions::default()).unwrap();
        assert_eq!(c.tensor_shape(), TensorShape::ColVector);
        assert_eq!(c.to_vec::<u8>().unwrap(), vec![11, 12, 13, 24, 25, 26]);
    }

    #[test]
    fn test_reads_through_views() {
        let img = Image::from_samples(&[2, 2], Tensor::vector(2).unwrap(), &[1i16, 2, 3, 4, 5, 6, 7, 8])
            .unwrap();
        let first = img.tensor_element(0).unwrap();
        let second = img.tensor_element(1).unwrap();
        let diff = scan(&second, &first, &Sub, &ScanOptions::default()).unwrap();
        assert_eq!(diff.to_vec::<i16>().unwrap(), vec![1, 1, 1, 1]);
    }

    #[test]
    fn test_zero_dimensional_operands() {
        let img = Image::from_samples(&[3], Tensor::scalar(), &[1u16, 2, 3]).unwrap();
        let px = img.at(&[2]).unwrap();
        let c = scan(&img, &px, &Add, &ScanOptions::default()).unwrap();
        assert_eq!(c.to_vec::<u16>().unwrap(), vec![4, 5, 6]);

        let both = scan(&px, &px, &Add, &ScanOptions::default()).unwrap();
        assert_eq!(both.ndim(), 0);
        assert_eq!(both.as_f64().unwrap(), 6.0);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let dims = [64, 40, 3];
        let n: usize = dims.iter().product();
        let a_data: Vec<u8> = (0..n).map(|i| (i * 7 % 251) as u8).collect();
        let b_data: Vec<i8> = (0..64 * 3).map(|i| (i % 120) as i8 - 60).collect();
        let a = Image::from_samples(&dims, Tensor::scalar(), &a_data).unwrap();
        let b = Image::from_samples(&[64, 1, 3], Tensor::scalar(), &b_data).unwrap();

        let par = scan(&a, &b, &Add, &ScanOptions::default().with_parallel_threshold(1)).unwrap();
        let seq = scan(&a, &b, &Add, &ScanOptions::sequential()).unwrap();
        assert_eq!(par.dtype(), DType::I16);
        assert_eq!(par.to_vec::<i16>().unwrap(), seq.to_vec::<i16>().unwrap());
    }

    #[test]
    fn test_output_dtype_saturates() {
        let a = Image::from_samples(&[2], Tensor::scalar(), &[200i16, -7]).unwrap();
        let b = Image::from_samples(&[2], Tensor::scalar(), &[100i16, 1]).unwrap();
        let opts = ScanOptions::default().with_output_dtype(DType::U8);
        let c = scan(&a, &b, &Add, &opts).unwrap();
        assert_eq!(c.dtype(), DType::U8);
        assert_eq!(c.to_vec::<u8>().unwrap(), vec![255, 0]);
    }

    #[test]
    fn test_scan_with_itself() {
        let a = Image::from_samples(&[4], Tensor::scalar(), &[1u32, 2, 3, 4]).unwrap();
        let c = scan(&a, &a, &Add, &ScanOptions::default()).unwrap();
        assert_eq!(c.to_vec::<u32>().unwrap(), vec![2, 4, 6, 8]);
    }
}
