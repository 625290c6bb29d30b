//! Elementwise kernel source.
//!
//! One thread per element in a grid-stride loop. The flat index is decomposed from the last
//! dimension down, and every array operand is addressed through its byte offset and per
//! dimension byte strides, so arbitrary strided (even negative stride) views are supported.

use std::collections::HashSet;

use kiln_device::{CompileFlag, CompileRequest};
use kiln_dtype::ScalarDType;
use snafu::ensure;

use crate::append;
use crate::builder::CodeBuilder;
use crate::error::{InvalidDescriptionSnafu, Result, TypeResolutionSnafu};
use crate::signature::ParamList;

pub const ELEMWISE_ENTRY: &str = "elem";

/// An operand of an elementwise expression.
///
/// Array operands are visible in the expression as a typed pointer to the current element
/// (`a[0]`); scalar operands as a value of their type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operand {
    pub name: String,
    pub dtype: ScalarDType,
    pub is_array: bool,
}

impl Operand {
    pub fn array(name: impl Into<String>, dtype: ScalarDType) -> Self {
        Self { name: name.into(), dtype, is_array: true }
    }

    pub fn scalar(name: impl Into<String>, dtype: ScalarDType) -> Self {
        Self { name: name.into(), dtype, is_array: false }
    }
}

pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_') && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Identifiers the kernel declares besides the operands themselves.
fn generated_names(operands: &[Operand], nd: usize) -> HashSet<String> {
    let mut names: HashSet<String> =
        ["n", "i", "idx", "numThreads", "ii", "pos"].into_iter().map(str::to_owned).collect();
    names.extend((0..nd).map(|d| format!("dim{d}")));
    for operand in operands.iter().filter(|o| o.is_array) {
        let name = &operand.name;
        names.extend([format!("{name}_data"), format!("{name}_offset"), format!("{name}_p")]);
        names.extend((0..nd).map(|d| format!("{name}_str_{d}")));
    }
    names
}

/// Generate the kernel for `expr` over `operands` iterating an `nd`-dimensional space.
///
/// Parameters, in order: `n`, `dim0..dim{nd-1}`, then per operand either
/// `{name}_data`, `{name}_offset`, `{name}_str_0..` (arrays) or `{name}` (scalars).
pub fn elemwise_kernel(preamble: &str, expr: &str, operands: &[Operand], nd: usize) -> Result<CompileRequest> {
    ensure!(!expr.trim().is_empty(), InvalidDescriptionSnafu { reason: "empty expression" });
    ensure!(!operands.is_empty(), InvalidDescriptionSnafu { reason: "no operands" });

    let reserved = generated_names(operands, nd);
    let mut seen = HashSet::new();
    for operand in operands {
        ensure!(
            !reserved.contains(&operand.name),
            InvalidDescriptionSnafu { reason: format!("operand name {:?} is used by the generated kernel", operand.name) }
        );
        ensure!(
            is_identifier(&operand.name),
            InvalidDescriptionSnafu { reason: format!("operand name {:?} is not an identifier", operand.name) }
        );
        ensure!(
            seen.insert(operand.name.as_str()),
            InvalidDescriptionSnafu { reason: format!("duplicate operand name {:?}", operand.name) }
        );
        ensure!(
            operand.is_array || operand.dtype != ScalarDType::Float16,
            TypeResolutionSnafu { dtype: operand.dtype, reason: "half scalars cannot be passed from the host" }
        );
    }

    let mut params = ParamList::new();
    params.size("n");
    for d in 0..nd {
        params.size(format_args!("dim{d}"));
    }
    for operand in operands {
        if operand.is_array {
            params.buffer(operand.dtype.device_name(), format_args!("{}_data", operand.name));
            params.size(format_args!("{}_offset", operand.name));
            for d in 0..nd {
                params.ssize(format_args!("{}_str_{d}", operand.name));
            }
        } else {
            params.scalar(operand.dtype, &operand.name);
        }
    }

    let mut sb = CodeBuilder::new();
    sb.append_raw(preamble);
    sb.append_raw("\n");
    params.render_header(&mut sb, ELEMWISE_ENTRY);
    sb.append_raw(" {\n");
    sb.append_raw("  const ga_size idx = LDIM_0 * GID_0 + LID_0;\n");
    sb.append_raw("  const ga_size numThreads = LDIM_0 * GDIM_0;\n");
    sb.append_raw("  ga_size i;\n");
    sb.append_raw("  for (i = idx; i < n; i += numThreads) {\n");
    if nd > 0 {
        sb.append_raw("    ga_size ii = i;\n");
        sb.append_raw("    ga_size pos;\n");
    }
    for operand in operands.iter().filter(|o| o.is_array) {
        let name = &operand.name;
        append!(sb, "    GLOBAL_MEM char *{name}_p = (GLOBAL_MEM char *){name}_data + {name}_offset;\n");
    }
    for d in (0..nd).rev() {
        if d > 0 {
            append!(sb, "    pos = ii % dim{d};\n    ii = ii / dim{d};\n");
        } else {
            sb.append_raw("    pos = ii;\n");
        }
        for operand in operands.iter().filter(|o| o.is_array) {
            let name = &operand.name;
            append!(sb, "    {name}_p += (ga_ssize)pos * {name}_str_{d};\n");
        }
    }
    for operand in operands.iter().filter(|o| o.is_array) {
        let (name, ty) = (&operand.name, operand.dtype.device_name());
        append!(sb, "    GLOBAL_MEM {ty} *{name} = (GLOBAL_MEM {ty} *){name}_p;\n");
    }
    append!(sb, "    {expr};\n");
    sb.append_raw("  }\n}\n");

    let source = sb.finalize()?;
    let flags = CompileFlag::for_dtypes(operands.iter().map(|o| o.dtype));
    tracing::trace!(kernel.entry = ELEMWISE_ENTRY, nd, operands = operands.len(), "generated elementwise kernel");
    Ok(CompileRequest::new(vec![source], ELEMWISE_ENTRY, params.into_kinds(), flags))
}
