//! Kernel runtime for kiln.
//!
//! Turns array operations into launches on a [`kiln_device::Backend`]:
//!
//! - [`Kernel`]: compiled kernel plus argument slots, with cache-aware compilation and
//!   launch scheduling
//! - [`ElemwiseKernel`]: elementwise expressions over strided arrays
//! - [`ReductionEngine`]: axis reductions with a grow-only cache of kernel variants
//! - [`SortEngine`]: bitonic and sample-sort merge sorting, optionally with argsort indices
//!
//! Configuration comes from [`RuntimeConfig`] (environment or builder) and is carried by a
//! [`Context`].

pub mod collapse;
pub mod config;
pub mod context;
pub mod elemwise;
pub mod error;
pub mod kernel;
pub mod reduction;
pub mod sort;


pub use collapse::collapse;
pub use config::{CACHE_DIR_NAME, CacheLocation, RuntimeConfig};
pub use context::Context;
pub use elemwise::{ElemwiseArg, ElemwiseKernel};
pub use error::*;
pub use kernel::{KERNEL_CACHE_KIND, Kernel};
pub use reduction::{MAX_REDUCTION_DIMS, ReductionEngine};
pub use sort::{MAX_SORT_LEN, SortDirection, SortEngine};
