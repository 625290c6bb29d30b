//! Reduction engine.
//!
//! One kernel variant exists per `(collapsed axes, collapsed reduced axes)` pair. Variants are
//! generated and compiled on first use and kept for the engine's lifetime; a key that has been
//! compiled is never compiled again. Per-call axis bookkeeping lives in scratch vectors that
//! grow with the largest input seen and are reused across calls.
//!
//! Only the single-pass path exists: one block per output element. Outputs larger than the
//! device grid are rejected as unsupported.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use bon::bon;
use kiln_codegen::{ReductionExpr, reduction_kernel};
use kiln_device::{ArrayView, KernelArg, LaunchGeometry, Property};
use kiln_dtype::ScalarDType;
use snafu::{ResultExt, ensure};

use crate::collapse::collapse;
use crate::context::Context;
use crate::error::{CodegenSnafu, InvalidValueSnafu, Result, ShapeMismatchSnafu, UnsupportedSnafu};
use crate::kernel::Kernel;

/// Largest input rank the engine accepts.
pub const MAX_REDUCTION_DIMS: usize = 32;

const MIN_CAPACITY: usize = 2;

#[derive(Debug)]
pub struct ReductionEngine {
    ctx: Context,
    expr: ReductionExpr,
    kernels: HashMap<(usize, usize), Kernel>,
    capacity: usize,
    rdims: Vec<usize>,
    rstrs: Vec<Vec<isize>>,
    odims: Vec<usize>,
    /// Input strides then output strides of the kept axes.
    ostrs: Vec<Vec<isize>>,
}

#[bon]
impl ReductionEngine {
    /// Create an engine for `REDUCE(a, b)` with identity `neutral`.
    ///
    /// `work` and `output` default to `input`. No kernel is compiled until the first call or
    /// [`ReductionEngine::warm_up`].
    #[builder]
    pub fn new(
        context: Context,
        #[builder(into)] reduce: String,
        #[builder(into)] neutral: String,
        #[builder(into)] map: Option<String>,
        input: ScalarDType,
        work: Option<ScalarDType>,
        output: Option<ScalarDType>,
        #[builder(default, into)] preamble: String,
        #[builder(default = MIN_CAPACITY)] capacity: usize,
    ) -> Result<Self> {
        ensure!(!reduce.trim().is_empty(), InvalidValueSnafu { reason: "empty reduce expression" });
        ensure!(!neutral.trim().is_empty(), InvalidValueSnafu { reason: "empty neutral value" });
        ensure!(
            capacity <= MAX_REDUCTION_DIMS,
            UnsupportedSnafu { reason: format!("reductions support at most {MAX_REDUCTION_DIMS} dimensions") }
        );
        let expr = ReductionExpr {
            preamble,
            map,
            reduce,
            neutral,
            input,
            work: work.unwrap_or(input),
            output: output.unwrap_or(input),
        };
        let mut engine = Self {
            ctx: context,
            expr,
            kernels: HashMap::new(),
            capacity: 0,
            rdims: Vec::new(),
            rstrs: vec![Vec::new()],
            odims: Vec::new(),
            ostrs: vec![Vec::new(), Vec::new()],
        };
        engine.grow(capacity.max(MIN_CAPACITY));
        Ok(engine)
    }
}

impl ReductionEngine {
    pub fn expr(&self) -> &ReductionExpr {
        &self.expr
    }

    /// Largest rank handled without growing.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Keys of the compiled variants, sorted.
    pub fn compiled_variants(&self) -> Vec<(usize, usize)> {
        let mut keys: Vec<_> = self.kernels.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    /// Compile every variant up to the current capacity.
    pub fn warm_up(&mut self) -> Result<()> {
        for nd in 1..=self.capacity {
            for rnd in 0..=nd {
                self.variant(nd, rnd)?;
            }
        }
        Ok(())
    }

    fn grow(&mut self, nd: usize) {
        if nd <= self.capacity {
            return;
        }
        tracing::debug!(reduction.capacity = nd, previous = self.capacity, "growing reduction scratch");
        self.rdims.reserve(nd);
        self.odims.reserve(nd);
        for strides in self.rstrs.iter_mut().chain(self.ostrs.iter_mut()) {
            strides.reserve(nd);
        }
        self.capacity = nd;
    }

    fn variant(&mut self, nd: usize, rnd: usize) -> Result<&Kernel> {
        match self.kernels.entry((nd, rnd)) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let request = reduction_kernel(&self.expr, nd, rnd).context(CodegenSnafu)?;
                let kernel = Kernel::compile(&self.ctx, request)?;
                tracing::debug!(reduction.key = ?(nd, rnd), "compiled reduction variant");
                Ok(entry.insert(kernel))
            }
        }
    }

    /// Reduce `input` over the axes whose bit is set in `mask`, writing to `output`.
    ///
    /// `output` has the input's kept axes, in order.
    #[tracing::instrument(skip_all, fields(reduction.nd = input.nd(), reduction.mask = mask))]
    pub fn call(&mut self, input: &ArrayView, mask: u32, output: &ArrayView) -> Result<()> {
        let nd = input.nd();
        ensure!(nd > 0, InvalidValueSnafu { reason: "cannot reduce a zero-dimensional array" });
        ensure!(
            nd <= MAX_REDUCTION_DIMS,
            UnsupportedSnafu { reason: format!("reductions support at most {MAX_REDUCTION_DIMS} dimensions, got {nd}") }
        );
        ensure!(
            nd == 32 || mask >> nd == 0,
            InvalidValueSnafu { reason: format!("reduction mask {mask:#x} names axes beyond rank {nd}") }
        );
        ensure!(
            input.dtype == self.expr.input,
            InvalidValueSnafu { reason: format!("input must be {:?}, got {:?}", self.expr.input, input.dtype) }
        );
        ensure!(
            output.dtype == self.expr.output,
            InvalidValueSnafu { reason: format!("output must be {:?}, got {:?}", self.expr.output, output.dtype) }
        );

        self.grow(nd);

        self.rdims.clear();
        self.odims.clear();
        for strides in self.rstrs.iter_mut().chain(self.ostrs.iter_mut()) {
            strides.clear();
        }
        for axis in 0..nd {
            if mask & (1 << axis) != 0 {
                self.rdims.push(input.shape[axis]);
                self.rstrs[0].push(input.strides[axis]);
            } else {
                self.odims.push(input.shape[axis]);
                self.ostrs[0].push(input.strides[axis]);
            }
        }

        ensure!(
            output.shape.as_slice() == self.odims.as_slice(),
            ShapeMismatchSnafu { expected: self.odims.clone(), actual: output.shape.to_vec() }
        );
        self.ostrs[1].extend_from_slice(&output.strides);

        let no: usize = self.odims.iter().product();
        if no == 0 {
            tracing::trace!("empty output");
            return Ok(());
        }

        if self.rdims.len() > 1 {
            collapse(&mut self.rdims, &mut self.rstrs);
        }
        if self.odims.len() > 1 {
            collapse(&mut self.odims, &mut self.ostrs);
        }
        let (rnd, ond) = (self.rdims.len(), self.odims.len());
        let nr: usize = self.rdims.iter().product();

        let esz = self.expr.work.bytes();
        self.variant(rnd + ond, rnd)?;
        let kernel = &self.kernels[&(rnd + ond, rnd)];
        let geometry = schedule(kernel, no, esz)?;

        let num_procs = kernel.property(Property::NumProcs)?;
        if geometry.grid[0] < num_procs {
            tracing::debug!(
                reduction.outputs = no,
                num_procs,
                "output leaves the device under-occupied; only the single-pass path is available"
            );
        }

        let mut args = Vec::with_capacity(1 + 2 * (rnd + ond) + ond + 4);
        args.push(KernelArg::Size(nr));
        args.extend(self.rdims.iter().map(|&d| KernelArg::Size(d)));
        args.extend(self.odims.iter().map(|&d| KernelArg::Size(d)));
        args.push(KernelArg::Buffer(output.buffer.clone()));
        args.push(KernelArg::Size(output.offset));
        args.extend(self.ostrs[1].iter().map(|&s| KernelArg::SSize(s)));
        args.push(KernelArg::Buffer(input.buffer.clone()));
        args.push(KernelArg::Size(input.offset));
        args.extend(self.rstrs[0].iter().map(|&s| KernelArg::SSize(s)));
        args.extend(self.ostrs[0].iter().map(|&s| KernelArg::SSize(s)));

        tracing::debug!(reduction.key = ?(rnd + ond, rnd), grid = geometry.grid[0], block = geometry.block[0], "reduce");
        kernel.launch_with(&geometry, &args)
    }
}

/// Block size: the largest multiple of the preferred size within both the thread limits and
/// the shared memory available for `esz`-byte work values. One block per output element.
fn schedule(kernel: &Kernel, outputs: usize, esz: usize) -> Result<LaunchGeometry> {
    let max_grid = kernel.property(Property::MaxGridSize0)?;
    let kernel_max = kernel.property(Property::KernelMaxLocalSize)?;
    let device_max = kernel.property(Property::MaxLocalSize0)?;
    let preferred = kernel.property(Property::PreferredLocalSize)?.max(1);
    let local_mem = kernel.property(Property::LocalMemSize)?;

    let mut max_local = kernel_max.min(device_max);
    if max_local * esz > local_mem {
        max_local = local_mem / esz;
    }
    let mut local = (max_local / preferred) * preferred;
    if local == 0 {
        local = max_local;
    }
    ensure!(local > 0, UnsupportedSnafu { reason: "no shared memory for a single work value" });
    ensure!(
        outputs <= max_grid,
        UnsupportedSnafu {
            reason: format!("reduction output of {outputs} elements exceeds the grid limit of {max_grid}")
        }
    );

    Ok(LaunchGeometry::linear(outputs, local, local * esz))
}
