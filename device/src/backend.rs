//! Backend collaborator interface.
//!
//! A [`Backend`] owns everything device specific: turning kernel source into a launchable
//! [`DeviceKernel`], answering limit queries, launching, and moving bytes. The engines in
//! `kiln-runtime` only talk to devices through this trait.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use enumset::EnumSet;
use smallvec::{SmallVec, smallvec};

use crate::arg::{ArgKind, CompileFlag, KernelArg};
use crate::buffer::Buffer;
use crate::error::Result;

/// Device or kernel limit that launch scheduling depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
pub enum Property {
    /// Maximum number of blocks along grid dimension 0.
    MaxGridSize0,
    /// Maximum number of threads along block dimension 0 for the device.
    MaxLocalSize0,
    /// Maximum threads per block for a specific compiled kernel.
    KernelMaxLocalSize,
    /// Preferred multiple for the block size (warp / wavefront width).
    PreferredLocalSize,
    /// Bytes of shared memory available to one block.
    LocalMemSize,
    /// Number of compute units.
    NumProcs,
}

/// Everything a backend needs to build one kernel entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileRequest {
    /// Source fragments, concatenated in order.
    pub sources: Vec<String>,
    pub entry: String,
    /// Declared parameter kinds, in order.
    pub arg_kinds: Vec<ArgKind>,
    pub flags: EnumSet<CompileFlag>,
}

impl CompileRequest {
    pub fn new(
        sources: Vec<String>,
        entry: impl Into<String>,
        arg_kinds: Vec<ArgKind>,
        flags: EnumSet<CompileFlag>,
    ) -> Self {
        Self { sources, entry: entry.into(), arg_kinds, flags }
    }

    /// All source fragments joined.
    pub fn source(&self) -> String {
        self.sources.concat()
    }

    /// Text identifying the compiled binary in a [`KernelCache`](crate::cache::KernelCache).
    ///
    /// Covers the entry and the flags as well as the source, since both change the binary.
    pub fn cache_text(&self) -> String {
        let flags: Vec<String> = self.flags.iter().map(|flag| format!("{flag:?}")).collect();
        let mut text = format!("// entry={} flags={}\n", self.entry, flags.join(","));
        for fragment in &self.sources {
            text.push_str(fragment);
        }
        text
    }
}

/// Launch geometry: grid and block extents per dimension plus dynamic shared memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchGeometry {
    pub grid: SmallVec<[usize; 3]>,
    pub block: SmallVec<[usize; 3]>,
    pub shared_bytes: usize,
}

impl LaunchGeometry {
    /// One-dimensional launch of `grid` blocks with `block` threads each.
    pub fn linear(grid: usize, block: usize, shared_bytes: usize) -> Self {
        Self { grid: smallvec![grid], block: smallvec![block], shared_bytes }
    }

    pub fn dims(&self) -> usize {
        self.grid.len()
    }

    pub fn total_threads(&self) -> usize {
        self.grid.iter().product::<usize>() * self.block.iter().product::<usize>()
    }
}

/// A compiled, launchable kernel entry point.
pub trait DeviceKernel: Send + Sync + fmt::Debug {
    fn entry(&self) -> &str;

    /// Binary image suitable for [`Backend::load_binary`], when the backend can export one.
    fn binary(&self) -> Option<Vec<u8>> {
        None
    }

    fn as_any(&self) -> &dyn Any;
}

/// Device backend consumed by the kernel runtime.
///
/// Launches issued on one backend execute in order: stage `k + 1` of a pipeline observes
/// every write of stage `k`.
pub trait Backend: Send + Sync + fmt::Debug {
    /// Device name used to key the kernel binary cache.
    fn device_name(&self) -> &str;

    /// Compile source text into a kernel.
    ///
    /// Failures should carry the compiler log in [`Error::Compile`](crate::Error::Compile)'s
    /// `diagnostic`.
    fn compile(&self, request: &CompileRequest) -> Result<Arc<dyn DeviceKernel>>;

    /// Rebuild a kernel from a binary produced by [`DeviceKernel::binary`].
    ///
    /// Backends without binary support compile from source.
    fn load_binary(&self, request: &CompileRequest, binary: &[u8]) -> Result<Arc<dyn DeviceKernel>> {
        let _ = binary;
        self.compile(request)
    }

    /// Query a limit. Kernel-specific properties require `kernel`; device properties ignore it.
    fn property(&self, kernel: Option<&dyn DeviceKernel>, property: Property) -> Result<usize>;

    /// Enqueue a launch. `args` matches the kernel's declared kinds.
    fn launch(&self, kernel: &dyn DeviceKernel, geometry: &LaunchGeometry, args: &[KernelArg]) -> Result<()>;

    fn alloc(&self, bytes: usize) -> Result<Buffer>;

    fn upload(&self, dst: &Buffer, offset: usize, data: &[u8]) -> Result<()>;

    fn download(&self, src: &Buffer, offset: usize, out: &mut [u8]) -> Result<()>;

    /// Device-to-device copy of `bytes` bytes.
    fn copy(&self, dst: &Buffer, dst_offset: usize, src: &Buffer, src_offset: usize, bytes: usize) -> Result<()>;
}
