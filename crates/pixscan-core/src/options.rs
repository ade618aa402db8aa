//! Options controlling a scan.

use serde::{Deserialize, Serialize};

use crate::dtype::DType;

/// Outputs with fewer samples than this are scanned on the calling thread.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 8192;

/// Configuration for a binary scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    /// Sample type of the output. `None` keeps the working type; otherwise
    /// results are saturated into this type.
    pub output_dtype: Option<DType>,

    /// Minimum number of output samples before lines are spread over the
    /// rayon pool. `usize::MAX` disables parallel execution.
    pub parallel_threshold: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            output_dtype: None,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

impl ScanOptions {
    pub fn with_output_dtype(mut self, dtype: DType) -> Self {
        self.output_dtype = Some(dtype);
        self
    }

    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// Always scan on the calling thread.
    pub fn sequential() -> Self {
        Self::default().with_parallel_threshold(usize::MAX)
    }
}
