//! Elementwise kernels.

use kiln_codegen::{Operand, elemwise_kernel};
use kiln_device::{ArrayView, KernelArg};
use kiln_dtype::ScalarValue;
use snafu::{ResultExt, ensure};

use crate::context::Context;
use crate::error::{CodegenSnafu, InvalidValueSnafu, Result, ShapeMismatchSnafu};
use crate::kernel::Kernel;

/// Runtime value for one [`Operand`].
#[derive(Debug, Clone, Copy)]
pub enum ElemwiseArg<'a> {
    Array(&'a ArrayView),
    Scalar(ScalarValue),
}

/// A compiled elementwise expression over `nd`-dimensional operands.
#[derive(Debug)]
pub struct ElemwiseKernel {
    kernel: Kernel,
    operands: Vec<Operand>,
    nd: usize,
}

impl ElemwiseKernel {
    pub fn new(ctx: &Context, preamble: &str, expr: &str, operands: Vec<Operand>, nd: usize) -> Result<Self> {
        let request = elemwise_kernel(preamble, expr, &operands, nd).context(CodegenSnafu)?;
        let kernel = Kernel::compile(ctx, request)?;
        Ok(Self { kernel, operands, nd })
    }

    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    pub fn nd(&self) -> usize {
        self.nd
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// Evaluate the expression at every position of the common shape of the array operands.
    #[tracing::instrument(skip_all, fields(kernel.entry = %self.kernel.entry(), nd = self.nd))]
    pub fn call(&mut self, args: &[ElemwiseArg<'_>]) -> Result<()> {
        ensure!(
            args.len() == self.operands.len(),
            InvalidValueSnafu { reason: format!("expected {} operands, got {}", self.operands.len(), args.len()) }
        );

        let mut shape: Option<&[usize]> = None;
        for (operand, arg) in self.operands.iter().zip(args) {
            match arg {
                ElemwiseArg::Array(view) => {
                    ensure!(
                        operand.is_array,
                        InvalidValueSnafu { reason: format!("operand {} is a scalar, got an array", operand.name) }
                    );
                    ensure!(
                        view.dtype == operand.dtype,
                        InvalidValueSnafu {
                            reason: format!("operand {} is {:?}, got {:?}", operand.name, operand.dtype, view.dtype)
                        }
                    );
                    ensure!(
                        view.nd() == self.nd,
                        InvalidValueSnafu {
                            reason: format!("operand {} must have {} dimensions, got {}", operand.name, self.nd, view.nd())
                        }
                    );
                    match shape {
                        None => shape = Some(view.shape.as_slice()),
                        Some(expected) => ensure!(
                            expected == view.shape.as_slice(),
                            ShapeMismatchSnafu { expected: expected.to_vec(), actual: view.shape.to_vec() }
                        ),
                    }
                }
                ElemwiseArg::Scalar(value) => {
                    ensure!(
                        !operand.is_array,
                        InvalidValueSnafu { reason: format!("operand {} is an array, got a scalar", operand.name) }
                    );
                    ensure!(
                        value.dtype() == operand.dtype,
                        InvalidValueSnafu {
                            reason: format!("operand {} is {:?}, got {:?}", operand.name, operand.dtype, value.dtype())
                        }
                    );
                }
            }
        }

        let dims: Vec<usize> = match shape {
            Some(shape) => shape.to_vec(),
            None if self.nd == 0 => Vec::new(),
            None => return InvalidValueSnafu { reason: "no array operand to take the shape from" }.fail(),
        };
        let n: usize = dims.iter().product();
        if n == 0 {
            tracing::trace!("empty iteration space");
            return Ok(());
        }

        let geometry = self.kernel.schedule(n, None, None)?;

        let mut slot = 0;
        let mut bind = |kernel: &mut Kernel, arg: KernelArg| -> Result<()> {
            kernel.set_arg(slot, arg)?;
            slot += 1;
            Ok(())
        };
        bind(&mut self.kernel, KernelArg::Size(n))?;
        for &dim in &dims {
            bind(&mut self.kernel, KernelArg::Size(dim))?;
        }
        for arg in args {
            match arg {
                ElemwiseArg::Array(view) => {
                    bind(&mut self.kernel, KernelArg::Buffer(view.buffer.clone()))?;
                    bind(&mut self.kernel, KernelArg::Size(view.offset))?;
                    for &stride in &view.strides {
                        bind(&mut self.kernel, KernelArg::SSize(stride))?;
                    }
                }
                ElemwiseArg::Scalar(value) => bind(&mut self.kernel, KernelArg::Scalar(*value))?,
            }
        }

        self.kernel.launch(&geometry)
    }
}
