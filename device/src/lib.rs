//! Device collaborator interfaces for kiln.
//!
//! - [`Backend`] / [`DeviceKernel`]: compile, query, launch and move memory
//! - [`Buffer`] / [`ArrayView`]: device memory and strided views over it
//! - [`ArgKind`] / [`KernelArg`]: the typed argument contract between codegen and launch
//! - [`KernelCache`]: optional persistent store for compiled kernel binaries

pub mod arg;
pub mod backend;
pub mod buffer;
pub mod cache;
pub mod cluda;
pub mod error;


pub use arg::{ArgKind, CompileFlag, KernelArg};
pub use backend::{Backend, CompileRequest, DeviceKernel, LaunchGeometry, Property};
pub use buffer::{ArrayView, Buffer, DeviceMemory, Shape, Strides, c_strides};
pub use cache::{KernelCache, NullCache, PersistentCache, djb_hash};
pub use error::*;
