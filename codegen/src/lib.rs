//! Kernel source generation for kiln.
//!
//! Generators emit CLUDA source (see [`kiln_device::cluda`]) through a [`CodeBuilder`] and
//! declare parameters through a [`ParamList`], returning a [`kiln_device::CompileRequest`]
//! whose argument kinds match the rendered signature.
//!
//! - [`elemwise`]: grid-stride elementwise kernels over strided operands
//! - [`reduction`]: one-block-per-output reductions with a shared-memory tree
//! - [`sort`]: bitonic block sort and sample-sort merge kernels

pub mod builder;
pub mod elemwise;
pub mod error;
pub mod reduction;
pub mod signature;
pub mod sort;


pub use builder::CodeBuilder;
pub use elemwise::{ELEMWISE_ENTRY, Operand, elemwise_kernel};
pub use error::*;
pub use reduction::{REDUCTION_ENTRY, ReductionExpr, reduction_kernel};
pub use signature::{ParamList, declared_kinds};
pub use sort::{IndexType, SAMPLE_STRIDE, SHARED_SORT_LIMIT, SortKernel, SortProgram};
