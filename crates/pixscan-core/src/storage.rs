use std::fmt;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};

use crate::{DType, Element, Result, ScanError};

/// Shared, reference-counted pixel storage.
///
/// Cloning a `Storage` shares the buffer, so every image view built on it
/// sees writes made through any other. Samples live in 64-bit words, which
/// keeps every typed view aligned.
#[derive(Clone)]
pub struct Storage {
    data: Arc<RwLock<Vec<u64>>>,
    dtype: DType,
    /// Number of samples (not bytes).
    numel: usize,
}

impl Storage {
    /// Allocate zeroed storage for `numel` samples of the given dtype.
    pub fn zeros(dtype: DType, numel: usize) -> Result<Self> {
        let nbytes = dtype.storage_bytes(numel).ok_or_else(|| {
            ScanError::Allocation(format!("{numel} samples of {dtype} overflow the address space"))
        })?;
        let words = nbytes.div_ceil(8);
        let mut data: Vec<u64> = Vec::new();
        data.try_reserve_exact(words).map_err(|e| {
            ScanError::Allocation(format!("{nbytes} bytes for {numel} samples of {dtype}: {e}"))
        })?;
        data.resize(words, 0);
        Ok(Self {
            data: Arc::new(RwLock::new(data)),
            dtype,
            numel,
        })
    }

    /// Create storage holding a copy of `samples`.
    pub fn from_slice<T: Element>(samples: &[T]) -> Result<Self> {
        let storage = Self::zeros(T::DTYPE, samples.len())?;
        storage.write(|dst: &mut [T]| dst.copy_from_slice(samples))?;
        Ok(storage)
    }

    /// Get the dtype of this storage.
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Number of samples.
    pub fn numel(&self) -> usize {
        self.numel
    }

    /// Size in bytes of the samples.
    pub fn nbytes(&self) -> usize {
        self.numel * self.dtype.element_size()
    }

    /// Number of handles sharing this buffer.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.data)
    }

    /// Whether this storage is uniquely owned (no other Arc references).
    pub fn is_unique(&self) -> bool {
        self.ref_count() == 1
    }

    /// Whether two handles refer to the same buffer.
    pub fn ptr_eq(&self, other: &Storage) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    fn check_dtype<T: Element>(&self) -> Result<()> {
        if T::DTYPE != self.dtype {
            return Err(ScanError::UnsupportedDType(T::DTYPE));
        }
        Ok(())
    }

    /// Run `f` over the samples as a typed slice, under a shared lock.
    ///
    /// Shared locks are taken recursively so an image may be read twice in
    /// one scan.
    pub fn read<T: Element, R>(&self, f: impl FnOnce(&[T]) -> R) -> Result<R> {
        self.check_dtype::<T>()?;
        let guard = self.data.read_recursive();
        let samples: &[T] = bytemuck::cast_slice(guard.as_slice());
        Ok(f(&samples[..self.numel]))
    }

    /// Shared lock on the raw words, for readers that pick the sample type
    /// themselves.
    pub(crate) fn lock_read(&self) -> RwLockReadGuard<'_, Vec<u64>> {
        self.data.read_recursive()
    }

    /// Run `f` over the samples as a mutable typed slice, under an exclusive lock.
    pub fn write<T: Element, R>(&self, f: impl FnOnce(&mut [T]) -> R) -> Result<R> {
        self.check_dtype::<T>()?;
        let mut guard = self.data.write();
        let samples: &mut [T] = bytemuck::cast_slice_mut(guard.as_mut_slice());
        Ok(f(&mut samples[..self.numel]))
    }
}

impl fmt::Debug for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage")
            .field("dtype", &self.dtype)
            .field("numel", &self.numel)
            .field("refs", &self.ref_count())
            .finish()
    }
}
