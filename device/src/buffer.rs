use std::any::Any;
use std::fmt;
use std::sync::Arc;

use kiln_dtype::ScalarDType;
use smallvec::SmallVec;

use crate::error::{InvalidViewSnafu, RankMismatchSnafu, Result};

pub type Shape = SmallVec<[usize; 4]>;
pub type Strides = SmallVec<[isize; 4]>;

/// Backend-owned device allocation.
///
/// Implementations release the memory in `Drop`.
pub trait DeviceMemory: Send + Sync + fmt::Debug {
    /// Allocation size in bytes.
    fn size(&self) -> usize;

    fn as_any(&self) -> &dyn Any;
}

/// Shared handle to device memory.
///
/// Clones refer to the same allocation, which is freed when the last handle drops.
#[derive(Debug, Clone)]
pub struct Buffer {
    memory: Arc<dyn DeviceMemory>,
}

impl Buffer {
    pub fn new(memory: Arc<dyn DeviceMemory>) -> Self {
        Self { memory }
    }

    pub fn size(&self) -> usize {
        self.memory.size()
    }

    /// Access the backend's concrete memory type.
    pub fn downcast<T: DeviceMemory + 'static>(&self) -> Option<&T> {
        self.memory.as_any().downcast_ref::<T>()
    }

    /// Whether both handles refer to the same allocation.
    pub fn same_memory(&self, other: &Buffer) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.memory), Arc::as_ptr(&other.memory))
    }
}

/// Strided N-dimensional view of a buffer.
///
/// Offsets and strides are in bytes.
#[derive(Debug, Clone)]
pub struct ArrayView {
    pub buffer: Buffer,
    pub offset: usize,
    pub shape: Shape,
    pub strides: Strides,
    pub dtype: ScalarDType,
}

impl ArrayView {
    /// Create a view, checking that every addressable element lies inside the buffer.
    pub fn new(buffer: Buffer, offset: usize, shape: &[usize], strides: &[isize], dtype: ScalarDType) -> Result<Self> {
        snafu::ensure!(shape.len() == strides.len(), RankMismatchSnafu { shape: shape.len(), strides: strides.len() });
        let view = Self { buffer, offset, shape: shape.into(), strides: strides.into(), dtype };
        if let Some((start, end)) = view.byte_extent() {
            snafu::ensure!(
                start >= 0 && end <= view.buffer.size() as isize,
                InvalidViewSnafu { start, end, buffer_size: view.buffer.size() }
            );
        }
        Ok(view)
    }

    /// C-ordered view starting at byte 0.
    pub fn contiguous(buffer: Buffer, dtype: ScalarDType, shape: &[usize]) -> Result<Self> {
        let strides = c_strides(shape, dtype.bytes());
        Self::new(buffer, 0, shape, &strides, dtype)
    }

    pub fn nd(&self) -> usize {
        self.shape.len()
    }

    /// Number of elements.
    pub fn size(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn is_c_contiguous(&self) -> bool {
        let expected = c_strides(&self.shape, self.dtype.bytes());
        self.shape.iter().zip(self.strides.iter().zip(&expected)).all(|(&dim, (&s, &e))| dim <= 1 || s == e)
    }

    /// Half-open byte range touched by the view, `None` when it has no elements.
    pub fn byte_extent(&self) -> Option<(isize, isize)> {
        if self.is_empty() {
            return None;
        }
        let mut start = self.offset as isize;
        let mut end = self.offset as isize + self.dtype.bytes() as isize;
        for (&dim, &stride) in self.shape.iter().zip(&self.strides) {
            let span = (dim as isize - 1) * stride;
            if span < 0 {
                start += span;
            } else {
                end += span;
            }
        }
        Some((start, end))
    }
}

/// Byte strides of a C-ordered array.
pub fn c_strides(shape: &[usize], elem_bytes: usize) -> Strides {
    let mut strides: Strides = SmallVec::from_elem(0, shape.len());
    let mut acc = elem_bytes as isize;
    for (stride, &dim) in strides.iter_mut().zip(shape).rev() {
        *stride = acc;
        acc *= dim.max(1) as isize;
    }
    strides
}
