//! Sort engine.
//!
//! Inputs of at most [`SHARED_SORT_LIMIT`] keys are sorted by a single bitonic block. Longer
//! inputs are sorted in blocks of that size, merged pairwise by doubling run lengths with the
//! sample-sort kernels, and finally the remainder past the last full block is sorted on its
//! own and folded in by a global merge.
//!
//! Scratch buffers and compiled kernels live for one call.

use kiln_codegen::{IndexType, SAMPLE_STRIDE, SHARED_SORT_LIMIT, SortKernel, SortProgram};
use kiln_device::{ArrayView, Backend, Buffer, KernelArg, LaunchGeometry, Property};
use kiln_dtype::{ScalarDType, ScalarValue};
use snafu::{ResultExt, ensure};

use crate::context::Context;
use crate::error::{CodegenSnafu, DeviceSnafu, InvalidValueSnafu, Result, ShapeMismatchSnafu, UnsupportedSnafu};
use crate::kernel::Kernel;

/// Longest sortable input. Merge passes double `stride` in 32-bit counters up to
/// `2 * stride == len`.
pub const MAX_SORT_LEN: usize = 1 << 31;

/// Threads per block of the rank and global-merge kernels.
const RANK_BLOCK: u32 = 256;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    fn flag(self) -> u32 {
        match self {
            Self::Ascending => 1,
            Self::Descending => 0,
        }
    }
}

/// A buffer region: device memory plus byte offset.
#[derive(Debug, Clone)]
struct Region {
    buffer: Buffer,
    offset: usize,
}

impl Region {
    fn of(view: &ArrayView) -> Self {
        Self { buffer: view.buffer.clone(), offset: view.offset }
    }

    fn whole(buffer: Buffer) -> Self {
        Self { buffer, offset: 0 }
    }

    fn push_args(&self, args: &mut Vec<KernelArg>) {
        args.push(KernelArg::Buffer(self.buffer.clone()));
        args.push(KernelArg::Size(self.offset));
    }
}

/// Per-call sizes.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SortConfig {
    len: u32,
    /// `len` rounded down to a whole number of bitonic blocks (all of `len` when it fits one).
    pub(crate) nfloor: u32,
    nleft: u32,
    dir: u32,
    key_size: usize,
    index: Option<IndexType>,
}

impl SortConfig {
    pub(crate) fn new(len: u32, direction: SortDirection, key: ScalarDType, index: Option<IndexType>) -> Self {
        let block = SHARED_SORT_LIMIT as u32;
        let nfloor = if len <= block { len } else { (len / block) * block };
        Self { len, nfloor, nleft: len - nfloor, dir: direction.flag(), key_size: key.bytes(), index }
    }

    fn index_size(&self) -> usize {
        self.index.map_or(0, |index| index.dtype().bytes())
    }

    /// Runs in the last merge segment of a pass, and the threads covering the merged segments.
    pub(crate) fn segment(&self, stride: u32) -> (u32, u32) {
        let last = self.nfloor % (2 * stride);
        let threads = if last > stride {
            (self.nfloor + 2 * stride - last) / (2 * SAMPLE_STRIDE as u32)
        } else {
            (self.nfloor - last) / (2 * SAMPLE_STRIDE as u32)
        };
        (last, threads)
    }

    /// Most blocks any launch of this sort asks for.
    pub(crate) fn largest_grid(&self) -> usize {
        let block = SHARED_SORT_LIMIT as u32;
        if self.len <= block {
            return 1;
        }
        // Interval merges launch one block per sample of `nfloor`, which dominates the
        // bitonic batch and the rank kernels.
        let merge = self.nfloor.div_ceil(SAMPLE_STRIDE as u32);
        let global = if self.nleft > 0 { self.len.div_ceil(RANK_BLOCK) } else { 0 };
        merge.max(global) as usize
    }
}

/// `len` as a 32-bit kernel counter, or `Unsupported` past [`MAX_SORT_LEN`].
pub(crate) fn sort_length(len: usize) -> Result<u32> {
    ensure!(
        len <= MAX_SORT_LEN,
        UnsupportedSnafu { reason: format!("cannot sort {len} elements; at most {MAX_SORT_LEN} are supported") }
    );
    u32::try_from(len)
        .map_err(|_| UnsupportedSnafu { reason: format!("cannot sort {len} elements; lengths are 32-bit") }.build())
}

/// Sort kernels compiled on first use within one call.
struct SortKernels<'a> {
    ctx: &'a Context,
    program: SortProgram,
    compiled: [Option<Kernel>; 5],
}

impl<'a> SortKernels<'a> {
    fn new(ctx: &'a Context, program: SortProgram) -> Self {
        Self { ctx, program, compiled: Default::default() }
    }

    fn launch(&mut self, kernel: SortKernel, geometry: &LaunchGeometry, args: &[KernelArg]) -> Result<()> {
        let slot = kernel.ordinal();
        let compiled = match self.compiled[slot].take() {
            Some(compiled) => compiled,
            None => Kernel::compile(self.ctx, self.program.request(kernel))?,
        };
        let launched = compiled.launch_with(geometry, args);
        self.compiled[slot] = Some(compiled);
        launched
    }
}

#[derive(Debug, Clone)]
pub struct SortEngine {
    ctx: Context,
}

impl SortEngine {
    pub fn new(ctx: &Context) -> Self {
        Self { ctx: ctx.clone() }
    }

    /// Sort `src` into `dst`. With `indices`, also write the source position of every sorted key.
    ///
    /// Arrays must be one-dimensional, C-contiguous and of equal length; `dst` and `src` share
    /// the key type, `indices` is `UInt32` or `UInt64`. `src` is not modified. Equal keys keep
    /// their source order.
    #[tracing::instrument(skip_all, fields(sort.len = src.size(), sort.dir = ?direction))]
    pub fn sort(
        &self,
        dst: &ArrayView,
        src: &ArrayView,
        direction: SortDirection,
        indices: Option<&ArrayView>,
    ) -> Result<()> {
        ensure!(
            src.nd() <= 1,
            UnsupportedSnafu { reason: format!("sorting supports one-dimensional arrays, got {} dimensions", src.nd()) }
        );
        ensure!(src.nd() == 1, InvalidValueSnafu { reason: "cannot sort a zero-dimensional array" });
        ensure!(
            dst.shape == src.shape,
            ShapeMismatchSnafu { expected: src.shape.to_vec(), actual: dst.shape.to_vec() }
        );
        ensure!(
            dst.dtype == src.dtype,
            InvalidValueSnafu { reason: format!("destination is {:?}, source is {:?}", dst.dtype, src.dtype) }
        );
        ensure!(
            src.is_c_contiguous() && dst.is_c_contiguous(),
            InvalidValueSnafu { reason: "sorting requires contiguous arrays" }
        );
        let index = match indices {
            None => None,
            Some(view) => {
                ensure!(
                    view.shape == src.shape,
                    ShapeMismatchSnafu { expected: src.shape.to_vec(), actual: view.shape.to_vec() }
                );
                ensure!(view.is_c_contiguous(), InvalidValueSnafu { reason: "index array must be contiguous" });
                let index = IndexType::from_dtype(view.dtype).ok_or_else(|| {
                    InvalidValueSnafu { reason: format!("index arrays must be UInt32 or UInt64, got {:?}", view.dtype) }
                        .build()
                })?;
                Some(index)
            }
        };
        let program = SortProgram::new(src.dtype, index).context(CodegenSnafu)?;

        let len = sort_length(src.size())?;
        let config = SortConfig::new(len, direction, src.dtype, index);
        let backend = self.ctx.backend();

        let max_grid = backend.property(None, Property::MaxGridSize0).context(DeviceSnafu)?;
        let grid = config.largest_grid();
        ensure!(
            grid <= max_grid,
            UnsupportedSnafu { reason: format!("sorting {len} elements needs {grid} blocks, the grid limit is {max_grid}") }
        );

        match len {
            0 => return Ok(()),
            1 => {
                backend.copy(&dst.buffer, dst.offset, &src.buffer, src.offset, config.key_size).context(DeviceSnafu)?;
                if let Some(view) = indices {
                    let zero = vec![0u8; view.dtype.bytes()];
                    backend.upload(&view.buffer, view.offset, &zero).context(DeviceSnafu)?;
                }
                return Ok(());
            }
            _ => {}
        }

        let src_arg = match index {
            Some(index) => Some(Region::whole(self.iota(index, len)?)),
            None => None,
        };
        let dst_arg = indices.map(Region::of);
        let mut kernels = SortKernels::new(&self.ctx, program);

        tracing::debug!(sort.nfloor = config.nfloor, sort.nleft = config.nleft, sort.argsort = index.is_some(), "sort");
        let source = Pair { key: Region::of(src), arg: src_arg };
        let target = Pair { key: Region::of(dst), arg: dst_arg };
        if config.len as usize <= SHARED_SORT_LIMIT {
            bitonic(&mut kernels, &config, &target, &source, 1, config.len, 0)
        } else {
            self.merge_sort(&mut kernels, &config, &target, &source)
        }
    }

    fn iota(&self, index: IndexType, len: u32) -> Result<Buffer> {
        let bytes: Vec<u8> = match index {
            IndexType::U32 => (0..len).flat_map(u32::to_le_bytes).collect(),
            IndexType::U64 => (0..u64::from(len)).flat_map(u64::to_le_bytes).collect(),
        };
        let buffer = self.ctx.backend().alloc(bytes.len()).context(DeviceSnafu)?;
        self.ctx.backend().upload(&buffer, 0, &bytes).context(DeviceSnafu)?;
        Ok(buffer)
    }

    fn scratch(&self, bytes: usize) -> Result<Buffer> {
        self.ctx.backend().alloc(bytes).context(DeviceSnafu)
    }

    fn merge_sort(&self, kernels: &mut SortKernels<'_>, config: &SortConfig, dst: &Pair, src: &Pair) -> Result<()> {
        let backend = self.ctx.backend();
        let len = config.len as usize;
        let samples = config.nfloor as usize / SAMPLE_STRIDE;

        let buf = Pair {
            key: Region::whole(self.scratch(len * config.key_size)?),
            arg: match config.index {
                Some(_) => Some(Region::whole(self.scratch(len * config.index_size())?)),
                None => None,
            },
        };
        let ranks_a = Region::whole(self.scratch(samples * 4)?);
        let ranks_b = Region::whole(self.scratch(samples * 4)?);
        let limits_a = Region::whole(self.scratch(samples * 4)?);
        let limits_b = Region::whole(self.scratch(samples * 4)?);

        let block = SHARED_SORT_LIMIT as u32;
        let mut stages = 0;
        let mut stride = block;
        while stride < config.nfloor {
            stride <<= 1;
            stages += 1;
        }
        // Odd pass counts start in the scratch buffer so the last pass lands in `dst`.
        let (mut input, mut output) = if stages % 2 == 1 { (&buf, dst) } else { (dst, &buf) };

        bitonic(kernels, config, input, src, config.nfloor / block, block, 0)?;

        let mut stride = block;
        while stride < config.nfloor {
            let (last, threads) = config.segment(stride);
            tracing::trace!(sort.stride = stride, sort.last = last, "merge pass");

            let rank_geometry = LaunchGeometry::linear(threads.div_ceil(RANK_BLOCK) as usize, RANK_BLOCK as usize, 0);
            let mut args = Vec::with_capacity(10);
            ranks_a.push_args(&mut args);
            ranks_b.push_args(&mut args);
            input.key.push_args(&mut args);
            args.extend([uint(stride), uint(config.nfloor), uint(threads), uint(config.dir)]);
            kernels.launch(SortKernel::SampleRanks, &rank_geometry, &args)?;

            for (limits, ranks) in [(&limits_a, &ranks_a), (&limits_b, &ranks_b)] {
                let mut args = Vec::with_capacity(7);
                limits.push_args(&mut args);
                ranks.push_args(&mut args);
                args.extend([uint(stride), uint(config.nfloor), uint(threads)]);
                kernels.launch(SortKernel::MergeRanks, &rank_geometry, &args)?;
            }

            let merge_pairs = if last > stride {
                config.nfloor.div_ceil(SAMPLE_STRIDE as u32)
            } else {
                (config.nfloor - last) / SAMPLE_STRIDE as u32
            };
            let mut args = Vec::with_capacity(15);
            output.push_key_args(input, &mut args);
            limits_a.push_args(&mut args);
            limits_b.push_args(&mut args);
            args.extend([uint(stride), uint(config.nfloor), uint(config.dir)]);
            kernels.launch(
                SortKernel::MergeIntervals,
                &LaunchGeometry::linear(merge_pairs as usize, SAMPLE_STRIDE, 0),
                &args,
            )?;

            if last <= stride {
                // A lone run at the end has nothing to merge with; carry it over.
                let start = (config.nfloor - last) as usize;
                let count = last as usize;
                copy(backend.as_ref(), &output.key, &input.key, start, count, config.key_size)?;
                if let (Some(to), Some(from)) = (&output.arg, &input.arg) {
                    copy(backend.as_ref(), to, from, start, count, config.index_size())?;
                }
            }

            std::mem::swap(&mut input, &mut output);
            stride <<= 1;
        }

        if config.nleft > 0 {
            bitonic(kernels, config, dst, src, 1, config.nleft, config.nfloor)?;

            let mut args = Vec::with_capacity(12);
            buf.push_key_args(dst, &mut args);
            args.extend([uint(config.nfloor), uint(config.nleft), uint(config.len), uint(config.dir)]);
            kernels.launch(SortKernel::MergeGlobal, &LaunchGeometry::linear(config.len.div_ceil(RANK_BLOCK) as usize, RANK_BLOCK as usize, 0), &args)?;

            copy(backend.as_ref(), &dst.key, &buf.key, 0, len, config.key_size)?;
            if let (Some(to), Some(from)) = (&dst.arg, &buf.arg) {
                copy(backend.as_ref(), to, from, 0, len, config.index_size())?;
            }
        }
        Ok(())
    }
}

/// Keys plus the parallel index array when argsorting.
#[derive(Debug)]
struct Pair {
    key: Region,
    arg: Option<Region>,
}

impl Pair {
    /// `dstKey, dstKeyOff, srcKey, srcKeyOff[, dstArg, dstArgOff, srcArg, srcArgOff]`
    fn push_key_args(&self, src: &Pair, args: &mut Vec<KernelArg>) {
        self.key.push_args(args);
        src.key.push_args(args);
        if let (Some(dst_arg), Some(src_arg)) = (&self.arg, &src.arg) {
            dst_arg.push_args(args);
            src_arg.push_args(args);
        }
    }
}

fn uint(value: u32) -> KernelArg {
    KernelArg::Scalar(ScalarValue::UInt32(value))
}

fn bitonic(
    kernels: &mut SortKernels<'_>,
    config: &SortConfig,
    dst: &Pair,
    src: &Pair,
    batch: u32,
    length: u32,
    elems_off: u32,
) -> Result<()> {
    let mut args = Vec::with_capacity(12);
    dst.push_key_args(src, &mut args);
    args.extend([uint(batch), uint(length), uint(elems_off), uint(config.dir)]);
    let geometry = LaunchGeometry::linear(batch as usize, SHARED_SORT_LIMIT / 2, 0);
    kernels.launch(SortKernel::BitonicShared, &geometry, &args)
}

fn copy(
    backend: &dyn Backend,
    dst: &Region,
    src: &Region,
    start: usize,
    count: usize,
    elem: usize,
) -> Result<()> {
    if count == 0 {
        return Ok(());
    }
    backend
        .copy(&dst.buffer, dst.offset + start * elem, &src.buffer, src.offset + start * elem, count * elem)
        .context(DeviceSnafu)
}
