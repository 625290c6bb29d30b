//! Kernel handle: a compiled kernel plus its argument slots.
//!
//! Kernels are compiled once and launched many times. The slot count and kinds come from the
//! [`CompileRequest`] and never change afterwards.

use std::sync::Arc;

use kiln_device::{ArgKind, CompileRequest, DeviceKernel, KernelArg, LaunchGeometry, Property};
use snafu::{ResultExt, ensure};

use crate::context::Context;
use crate::error::{
    ArgumentCountSnafu, ArgumentIndexSnafu, ArgumentKindSnafu, DeviceSnafu, Result, UnboundArgumentSnafu,
};

/// Cache kind under which compiled kernel binaries are stored.
pub const KERNEL_CACHE_KIND: &str = "kernel";

#[derive(Debug)]
pub struct Kernel {
    ctx: Context,
    handle: Arc<dyn DeviceKernel>,
    request: CompileRequest,
    args: Vec<Option<KernelArg>>,
}

impl Kernel {
    /// Build a kernel, reusing a cached binary when the cache holds one for this exact source.
    ///
    /// Compile failures leave nothing behind in the cache.
    #[tracing::instrument(skip_all, fields(kernel.entry = %request.entry))]
    pub fn compile(ctx: &Context, request: CompileRequest) -> Result<Self> {
        let backend = ctx.backend();
        let device = backend.device_name().to_owned();
        let text = request.cache_text();

        let cached = ctx.cache().get(KERNEL_CACHE_KIND, &device, &text).and_then(|binary| {
            match backend.load_binary(&request, &binary) {
                Ok(handle) => {
                    tracing::debug!(kernel.device = %device, "kernel loaded from cache");
                    Some(handle)
                }
                Err(err) => {
                    tracing::warn!(error = %err, "cached kernel binary rejected; compiling from source");
                    None
                }
            }
        });

        let handle = match cached {
            Some(handle) => handle,
            None => {
                let handle = backend.compile(&request).context(DeviceSnafu)?;
                if let Some(binary) = handle.binary() {
                    ctx.cache().put(KERNEL_CACHE_KIND, &device, &text, &binary);
                }
                tracing::debug!(kernel.device = %device, kernel.params = request.arg_kinds.len(), "kernel compiled");
                handle
            }
        };

        let args = vec![None; request.arg_kinds.len()];
        Ok(Self { ctx: ctx.clone(), handle, request, args })
    }

    pub fn entry(&self) -> &str {
        &self.request.entry
    }

    pub fn arg_kinds(&self) -> &[ArgKind] {
        &self.request.arg_kinds
    }

    pub fn request(&self) -> &CompileRequest {
        &self.request
    }

    pub fn handle(&self) -> &Arc<dyn DeviceKernel> {
        &self.handle
    }

    /// Binary image of the compiled kernel, when the backend exports one.
    pub fn binary(&self) -> Option<Vec<u8>> {
        self.handle.binary()
    }

    pub fn property(&self, property: Property) -> Result<usize> {
        self.ctx.backend().property(Some(self.handle.as_ref()), property).context(DeviceSnafu)
    }

    /// Bind `arg` to slot `index`, replacing any previous binding.
    pub fn set_arg(&mut self, index: usize, arg: impl Into<KernelArg>) -> Result<()> {
        let arg = arg.into();
        self.check_arg(index, &arg)?;
        self.args[index] = Some(arg);
        Ok(())
    }

    fn check_arg(&self, index: usize, arg: &KernelArg) -> Result<()> {
        let count = self.request.arg_kinds.len();
        let expected = *self.request.arg_kinds.get(index).ok_or_else(|| ArgumentIndexSnafu { index, count }.build())?;
        ensure!(arg.kind() == expected, ArgumentKindSnafu { index, expected, actual: arg.kind() });
        Ok(())
    }

    /// Choose a one-dimensional geometry covering `n` work items.
    ///
    /// A given `local` or `global` size is kept as is; the other is chosen around it. The
    /// result may run more threads than `n`, so kernels must bound-check their index.
    pub fn schedule(&self, n: usize, local: Option<usize>, global: Option<usize>) -> Result<LaunchGeometry> {
        let num_procs = self.property(Property::NumProcs)?;
        let max_grid = self.property(Property::MaxGridSize0)?;
        let max_local = self.property(Property::KernelMaxLocalSize)?;
        let preferred = self.property(Property::PreferredLocalSize)?.max(1);

        let target_grid = global.unwrap_or_else(|| (num_procs * 32).min(max_grid)).max(1);
        let target_local = 512.min(max_local).max(1);

        let mut ls = local.unwrap_or(preferred).max(1);
        let gs = global.unwrap_or_else(|| n.div_ceil(ls).clamp(1, target_grid));
        if local.is_none() && n > ls * gs {
            ls = ((n / preferred / gs) * preferred).clamp(1, target_local);
        }

        tracing::trace!(kernel.entry = %self.request.entry, n, grid = gs, block = ls, "scheduled launch");
        Ok(LaunchGeometry::linear(gs, ls, 0))
    }

    /// Launch with the bound slots. Every slot must be bound.
    pub fn launch(&self, geometry: &LaunchGeometry) -> Result<()> {
        let mut args = Vec::with_capacity(self.args.len());
        for (index, slot) in self.args.iter().enumerate() {
            args.push(slot.clone().ok_or_else(|| UnboundArgumentSnafu { index }.build())?);
        }
        self.dispatch(geometry, &args)
    }

    /// Launch with `args` in place of the bound slots.
    pub fn launch_with(&self, geometry: &LaunchGeometry, args: &[KernelArg]) -> Result<()> {
        ensure!(
            args.len() == self.request.arg_kinds.len(),
            ArgumentCountSnafu { expected: self.request.arg_kinds.len(), actual: args.len() }
        );
        for (index, arg) in args.iter().enumerate() {
            self.check_arg(index, arg)?;
        }
        self.dispatch(geometry, args)
    }

    fn dispatch(&self, geometry: &LaunchGeometry, args: &[KernelArg]) -> Result<()> {
        tracing::trace!(kernel.entry = %self.request.entry, grid = ?geometry.grid, block = ?geometry.block, "launch");
        self.ctx.backend().launch(self.handle.as_ref(), geometry, args).context(DeviceSnafu)
    }
}
