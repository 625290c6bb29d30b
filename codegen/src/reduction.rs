//! Reduction kernel source.
//!
//! One block per output element. The collapsed input layout lists the reduced axes first
//! (`rdim*`, `inp_rstr*`) and the kept axes after (`odim*`, `inp_ostr*`). Each thread folds a
//! strided slice of the reduced space into a work-type accumulator, then the block combines
//! the partial results in shared memory and lane 0 stores the result.

use kiln_device::{CompileFlag, CompileRequest};
use kiln_dtype::ScalarDType;
use snafu::ensure;

use crate::append;
use crate::builder::CodeBuilder;
use crate::error::{InvalidDescriptionSnafu, Result};
use crate::signature::ParamList;

pub const REDUCTION_ENTRY: &str = "redux";

/// Expression triple and element types of a reduction.
///
/// `reduce` combines two work values named `a` and `b`; `map`, when present, transforms each
/// input element `a` before it is folded in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReductionExpr {
    pub preamble: String,
    pub map: Option<String>,
    pub reduce: String,
    pub neutral: String,
    pub input: ScalarDType,
    pub work: ScalarDType,
    pub output: ScalarDType,
}

/// Generate the variant for `nd` collapsed axes of which the first `rnd` are reduced.
pub fn reduction_kernel(expr: &ReductionExpr, nd: usize, rnd: usize) -> Result<CompileRequest> {
    ensure!(rnd <= nd, InvalidDescriptionSnafu { reason: format!("{rnd} reduced axes out of {nd}") });
    ensure!(!expr.reduce.trim().is_empty(), InvalidDescriptionSnafu { reason: "empty reduce expression" });
    ensure!(!expr.neutral.trim().is_empty(), InvalidDescriptionSnafu { reason: "empty neutral value" });
    let ond = nd - rnd;

    let mut params = ParamList::new();
    params.size("n");
    for d in 0..rnd {
        params.size(format_args!("rdim{d}"));
    }
    for d in 0..ond {
        params.size(format_args!("odim{d}"));
    }
    params.buffer("redux_out_t", "out_data").size("out_offset");
    for d in 0..ond {
        params.ssize(format_args!("out_str_{d}"));
    }
    params.buffer("redux_in_t", "inp_data").size("inp_offset");
    for d in 0..rnd {
        params.ssize(format_args!("inp_rstr_{d}"));
    }
    for d in 0..ond {
        params.ssize(format_args!("inp_ostr_{d}"));
    }

    let mut sb = CodeBuilder::new();
    sb.append_raw(&expr.preamble);
    sb.append_raw("\n");
    append!(sb, "typedef {} redux_in_t;\n", expr.input.device_name());
    append!(sb, "typedef {} redux_work_t;\n", expr.work.device_name());
    append!(sb, "typedef {} redux_out_t;\n", expr.output.device_name());
    append!(sb, "#define PRE(a) ({})\n", expr.map.as_deref().unwrap_or("a"));
    append!(sb, "#define REDUCE(a, b) ({})\n", expr.reduce);
    append!(sb, "#define NEUTRAL ({})\n", expr.neutral);

    params.render_header(&mut sb, REDUCTION_ENTRY);
    sb.append_raw(" {\n");
    sb.append_raw("  GA_DECL_SHARED_BODY(redux_work_t, ldata)\n");
    sb.append_raw("  const ga_size idx = LID_0;\n");
    sb.append_raw("  ga_size i;\n  ga_size ii;\n  ga_size pos;\n");
    sb.append_raw("  ga_ssize inp_base = (ga_ssize)inp_offset;\n");
    sb.append_raw("  ga_ssize out_p = (ga_ssize)out_offset;\n");

    sb.append_raw("  ii = GID_0;\n");
    for d in (0..ond).rev() {
        decompose(&mut sb, "odim", d, "  ");
        append!(sb, "  inp_base += (ga_ssize)pos * inp_ostr_{d};\n");
        append!(sb, "  out_p += (ga_ssize)pos * out_str_{d};\n");
    }

    sb.append_raw("  redux_work_t acc = NEUTRAL;\n");
    sb.append_raw("  for (i = idx; i < n; i += LDIM_0) {\n");
    sb.append_raw("    ga_ssize inp_p = inp_base;\n");
    sb.append_raw("    ii = i;\n");
    for d in (0..rnd).rev() {
        decompose(&mut sb, "rdim", d, "    ");
        append!(sb, "    inp_p += (ga_ssize)pos * inp_rstr_{d};\n");
    }
    sb.append_raw("    const redux_in_t v = *(GLOBAL_MEM redux_in_t *)((GLOBAL_MEM char *)inp_data + inp_p);\n");
    sb.append_raw("    acc = REDUCE(acc, PRE(v));\n");
    sb.append_raw("  }\n");

    sb.append_raw("  ldata[idx] = acc;\n");
    sb.append_raw("  ga_size cur = LDIM_0;\n");
    sb.append_raw("  while (cur > 1) {\n");
    sb.append_raw("    const ga_size half = (cur + 1) / 2;\n");
    sb.append_raw("    local_barrier();\n");
    sb.append_raw("    if (idx + half < cur)\n");
    sb.append_raw("      ldata[idx] = REDUCE(ldata[idx], ldata[idx + half]);\n");
    sb.append_raw("    cur = half;\n");
    sb.append_raw("  }\n");
    sb.append_raw("  local_barrier();\n");
    sb.append_raw("  if (idx == 0)\n");
    sb.append_raw("    *(GLOBAL_MEM redux_out_t *)((GLOBAL_MEM char *)out_data + out_p) = (redux_out_t)ldata[0];\n");
    sb.append_raw("}\n");

    let source = sb.finalize()?;
    let flags = CompileFlag::for_dtypes([expr.input, expr.work, expr.output]);
    tracing::trace!(kernel.entry = REDUCTION_ENTRY, reduction.key = ?(nd, rnd), "generated reduction kernel");
    Ok(CompileRequest::new(vec![source], REDUCTION_ENTRY, params.into_kinds(), flags))
}

fn decompose(sb: &mut CodeBuilder, dims: &str, d: usize, indent: &str) {
    if d > 0 {
        append!(sb, "{indent}pos = ii % {dims}{d};\n{indent}ii = ii / {dims}{d};\n");
    } else {
        append!(sb, "{indent}pos = ii;\n");
    }
}
