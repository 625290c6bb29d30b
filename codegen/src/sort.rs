//! Sort kernel source.
//!
//! One program text per (key type, index type, argsort) holds the shared helpers and five
//! kernels. [`SortKernel`] selects the entry point of a [`CompileRequest`].
//!
//! The bitonic kernel sorts blocks of [`SHARED_SORT_LIMIT`] keys in shared memory. Larger
//! inputs are merged with a sample sort: every [`SAMPLE_STRIDE`]-th key of each sorted run is
//! ranked against the neighbouring run, the rank streams are merged into split points, and
//! each pair of intervals between split points is merged by one block.

use enumset::EnumSet;
use kiln_device::{ArgKind, CompileFlag, CompileRequest};
use kiln_dtype::ScalarDType;
use snafu::OptionExt;

use crate::append;
use crate::builder::CodeBuilder;
use crate::error::{Result, TypeResolutionSnafu};
use crate::signature::ParamList;

/// Keys between consecutive samples of a sorted run.
pub const SAMPLE_STRIDE: usize = 128;

/// Keys sorted by one bitonic block. Blocks run `SHARED_SORT_LIMIT / 2` threads.
pub const SHARED_SORT_LIMIT: usize = 1024;

/// Element type of an argsort index array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    U32,
    U64,
}

impl IndexType {
    pub const fn dtype(self) -> ScalarDType {
        match self {
            Self::U32 => ScalarDType::UInt32,
            Self::U64 => ScalarDType::UInt64,
        }
    }

    pub fn from_dtype(dtype: ScalarDType) -> Option<Self> {
        match dtype {
            ScalarDType::UInt32 => Some(Self::U32),
            ScalarDType::UInt64 => Some(Self::U64),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortKernel {
    BitonicShared,
    SampleRanks,
    MergeRanks,
    MergeIntervals,
    MergeGlobal,
}

impl SortKernel {
    pub const ALL: [Self; 5] =
        [Self::BitonicShared, Self::SampleRanks, Self::MergeRanks, Self::MergeIntervals, Self::MergeGlobal];

    pub const fn entry(self) -> &'static str {
        match self {
            Self::BitonicShared => "bitonicSortSharedKernel",
            Self::SampleRanks => "generateSampleRanksKernel",
            Self::MergeRanks => "mergeRanksAndIndicesKernel",
            Self::MergeIntervals => "mergeElementaryIntervalsKernel",
            Self::MergeGlobal => "mergeGlobalMemKernel",
        }
    }

    /// Position in [`SortKernel::ALL`].
    pub const fn ordinal(self) -> usize {
        self as usize
    }
}

/// Generated sort program for one key type and optional index type.
#[derive(Debug, Clone)]
pub struct SortProgram {
    key: ScalarDType,
    index: Option<IndexType>,
    source: String,
    kinds: [Vec<ArgKind>; 5],
    flags: EnumSet<CompileFlag>,
}

impl SortProgram {
    /// Generate the program. Fails for key types without sort sentinels (`Bool`, `Float16`).
    pub fn new(key: ScalarDType, index: Option<IndexType>) -> Result<Self> {
        let max = key.max_literal().context(TypeResolutionSnafu { dtype: key, reason: "not a sortable key type" })?;
        let min = key.min_literal().context(TypeResolutionSnafu { dtype: key, reason: "not a sortable key type" })?;
        let argsort = index.is_some();

        let mut sb = CodeBuilder::new();
        append!(sb, "#define SAMPLE_STRIDE {SAMPLE_STRIDE}\n#define SHARED_SIZE_LIMIT {SHARED_SORT_LIMIT}\n");
        append!(sb, "typedef {} t_key;\n#define MAX_NUM ({max})\n#define MIN_NUM ({min})\n", key.device_name());
        if let Some(index) = index {
            let index_max = index.dtype().max_literal().unwrap_or("0");
            append!(sb, "typedef {} t_arg;\n#define MAX_NUM_ARG ({index_max})\n", index.dtype().device_name());
            sb.append_raw(concat!(
                "#define AFTER(ka, ia, kb, ib) (sortDir ? ((ka) > (kb) || ((ka) == (kb) && (ia) > (ib)))",
                " : ((ka) < (kb) || ((ka) == (kb) && (ia) > (ib))))\n",
            ));
        } else {
            sb.append_raw("#define AFTER(ka, ia, kb, ib) (sortDir ? ((ka) > (kb)) : ((ka) < (kb)))\n");
        }
        sb.append_raw(HELPERS);

        let mut kinds: [Vec<ArgKind>; 5] = Default::default();
        for kernel in SortKernel::ALL {
            let params = kernel_params(kernel, argsort);
            sb.append_raw("\n");
            params.render_header(&mut sb, kernel.entry());
            sb.append_raw(" {\n");
            append_body(&mut sb, kernel, argsort);
            sb.append_raw("}\n");
            kinds[kernel.ordinal()] = params.into_kinds();
        }

        let source = sb.finalize()?;
        let flags = CompileFlag::for_dtypes([key, ScalarDType::UInt32].into_iter().chain(index.map(IndexType::dtype)));
        tracing::trace!(sort.key = ?key, sort.index = ?index, "generated sort program");
        Ok(Self { key, index, source, kinds, flags })
    }

    pub fn key(&self) -> ScalarDType {
        self.key
    }

    pub fn index(&self) -> Option<IndexType> {
        self.index
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn request(&self, kernel: SortKernel) -> CompileRequest {
        CompileRequest::new(vec![self.source.clone()], kernel.entry(), self.kinds[kernel.ordinal()].clone(), self.flags)
    }
}

fn key_pair(params: &mut ParamList, dst: &str, src: &str, argsort: bool) {
    params.buffer("t_key", dst).size(format_args!("{dst}Off"));
    params.buffer("t_key", src).size(format_args!("{src}Off"));
    if argsort {
        params.buffer("t_arg", "dstArg").size("dstArgOff");
        params.buffer("t_arg", "srcArg").size("srcArgOff");
    }
}

fn kernel_params(kernel: SortKernel, argsort: bool) -> ParamList {
    let uint = ScalarDType::UInt32;
    let mut params = ParamList::new();
    match kernel {
        SortKernel::BitonicShared => {
            key_pair(&mut params, "dstKey", "srcKey", argsort);
            params.scalar(uint, "batchSize").scalar(uint, "arrayLength").scalar(uint, "elemsOff");
            params.scalar(uint, "sortDir");
        }
        SortKernel::SampleRanks => {
            params.buffer("ga_uint", "ranksA").size("ranksAOff");
            params.buffer("ga_uint", "ranksB").size("ranksBOff");
            params.buffer("t_key", "srcKey").size("srcKeyOff");
            params.scalar(uint, "stride").scalar(uint, "N").scalar(uint, "threadCount").scalar(uint, "sortDir");
        }
        SortKernel::MergeRanks => {
            params.buffer("ga_uint", "limits").size("limitsOff");
            params.buffer("ga_uint", "ranks").size("ranksOff");
            params.scalar(uint, "stride").scalar(uint, "N").scalar(uint, "threadCount");
        }
        SortKernel::MergeIntervals => {
            key_pair(&mut params, "dstKey", "srcKey", argsort);
            params.buffer("ga_uint", "limitsA").size("limitsAOff");
            params.buffer("ga_uint", "limitsB").size("limitsBOff");
            params.scalar(uint, "stride").scalar(uint, "N").scalar(uint, "sortDir");
        }
        SortKernel::MergeGlobal => {
            key_pair(&mut params, "dstKey", "srcKey", argsort);
            params.scalar(uint, "segmentSizeA").scalar(uint, "segmentSizeB").scalar(uint, "N");
            params.scalar(uint, "sortDir");
        }
    }
    params
}

const HELPERS: &str = r#"#define AT_OFFSET(type, ptr, off) ((GLOBAL_MEM type *)((GLOBAL_MEM char *)(ptr) + (off)))
#define KEY_BEFORE(a, b) (sortDir ? ((a) < (b)) : ((a) > (b)))
#define KEY_BEFORE_EQ(a, b) (sortDir ? ((a) <= (b)) : ((a) >= (b)))
WITHIN_KERNEL ga_uint sortUMin(ga_uint a, ga_uint b) { return a < b ? a : b; }
WITHIN_KERNEL ga_uint iDivUp(ga_uint a, ga_uint b) { return (a % b == 0) ? (a / b) : (a / b + 1); }
WITHIN_KERNEL ga_uint getSampleCount(ga_uint len) { return iDivUp(len, SAMPLE_STRIDE); }
WITHIN_KERNEL ga_uint nextPowerOfTwo(ga_uint x) {
  ga_uint p = 1;
  while (p < x) p <<= 1;
  return p;
}
WITHIN_KERNEL ga_uint binarySearchInclusive(t_key val, t_key *data, ga_uint L, ga_uint stride, ga_uint sortDir) {
  if (L == 0) return 0;
  ga_uint pos = 0;
  for (; stride > 0; stride >>= 1) {
    ga_uint newPos = sortUMin(pos + stride, L);
    if (KEY_BEFORE_EQ(data[newPos - 1], val)) pos = newPos;
  }
  return pos;
}
WITHIN_KERNEL ga_uint binarySearchExclusive(t_key val, t_key *data, ga_uint L, ga_uint stride, ga_uint sortDir) {
  if (L == 0) return 0;
  ga_uint pos = 0;
  for (; stride > 0; stride >>= 1) {
    ga_uint newPos = sortUMin(pos + stride, L);
    if (KEY_BEFORE(data[newPos - 1], val)) pos = newPos;
  }
  return pos;
}
WITHIN_KERNEL ga_uint binarySearchRankInclusive(ga_uint val, ga_uint *data, ga_uint L, ga_uint stride) {
  if (L == 0) return 0;
  ga_uint pos = 0;
  for (; stride > 0; stride >>= 1) {
    ga_uint newPos = sortUMin(pos + stride, L);
    if (data[newPos - 1] <= val) pos = newPos;
  }
  return pos;
}
WITHIN_KERNEL ga_uint binarySearchRankExclusive(ga_uint val, ga_uint *data, ga_uint L, ga_uint stride) {
  if (L == 0) return 0;
  ga_uint pos = 0;
  for (; stride > 0; stride >>= 1) {
    ga_uint newPos = sortUMin(pos + stride, L);
    if (data[newPos - 1] < val) pos = newPos;
  }
  return pos;
}
WITHIN_KERNEL ga_uint binarySearchLowerBoundExclusive(t_key val, t_key *ptr, ga_uint first, ga_uint last, ga_uint sortDir) {
  ga_uint len = last - first;
  while (len > 0) {
    const ga_uint half = len >> 1;
    const ga_uint middle = first + half;
    if (KEY_BEFORE(ptr[middle], val)) {
      first = middle + 1;
      len = len - half - 1;
    } else {
      len = half;
    }
  }
  return first;
}
WITHIN_KERNEL ga_uint binarySearchLowerBoundInclusive(t_key val, t_key *ptr, ga_uint first, ga_uint last, ga_uint sortDir) {
  ga_uint len = last - first;
  while (len > 0) {
    const ga_uint half = len >> 1;
    const ga_uint middle = first + half;
    if (KEY_BEFORE_EQ(ptr[middle], val)) {
      first = middle + 1;
      len = len - half - 1;
    } else {
      len = half;
    }
  }
  return first;
}
"#;

fn append_body(sb: &mut CodeBuilder, kernel: SortKernel, argsort: bool) {
    match kernel {
        SortKernel::BitonicShared => bitonic_body(sb, argsort),
        SortKernel::SampleRanks => {
            sb.append_raw(SAMPLE_RANKS_BODY);
        }
        SortKernel::MergeRanks => {
            sb.append_raw(MERGE_RANKS_BODY);
        }
        SortKernel::MergeIntervals => merge_intervals_body(sb, argsort),
        SortKernel::MergeGlobal => merge_global_body(sb, argsort),
    }
}

fn bitonic_body(sb: &mut CodeBuilder, argsort: bool) {
    let (ia, ib) = if argsort { ("sArg[pos]", "sArg[pos + stride]") } else { ("0", "0") };
    let after = format!("AFTER(sKey[pos], {ia}, sKey[pos + stride], {ib})");
    let swap_arg = if argsort {
        "        t_arg ta = sArg[pos];\n        sArg[pos] = sArg[pos + stride];\n        sArg[pos + stride] = ta;\n"
    } else {
        ""
    };

    sb.append_raw("  LOCAL_MEM t_key sKey[SHARED_SIZE_LIMIT];\n");
    if argsort {
        sb.append_raw("  LOCAL_MEM t_arg sArg[SHARED_SIZE_LIMIT];\n");
    }
    sb.append_raw(concat!(
        "  const ga_uint length = batchSize * arrayLength;\n",
        "  const ga_uint lo = GID_0 * SHARED_SIZE_LIMIT + LID_0;\n",
        "  const ga_uint hi = lo + SHARED_SIZE_LIMIT / 2;\n",
        "  const ga_uint a = LID_0;\n",
        "  const ga_uint b = LID_0 + SHARED_SIZE_LIMIT / 2;\n",
        "  dstKey = AT_OFFSET(t_key, dstKey, dstKeyOff) + elemsOff;\n",
        "  srcKey = AT_OFFSET(t_key, srcKey, srcKeyOff) + elemsOff;\n",
        "  sKey[a] = lo < length ? srcKey[lo] : (sortDir ? MAX_NUM : MIN_NUM);\n",
        "  sKey[b] = hi < length ? srcKey[hi] : (sortDir ? MAX_NUM : MIN_NUM);\n",
    ));
    if argsort {
        sb.append_raw(concat!(
            "  dstArg = AT_OFFSET(t_arg, dstArg, dstArgOff) + elemsOff;\n",
            "  srcArg = AT_OFFSET(t_arg, srcArg, srcArgOff) + elemsOff;\n",
            "  sArg[a] = lo < length ? srcArg[lo] : MAX_NUM_ARG;\n",
            "  sArg[b] = hi < length ? srcArg[hi] : MAX_NUM_ARG;\n",
        ));
    }
    sb.append_raw(concat!(
        "  for (ga_uint size = 2; size < SHARED_SIZE_LIMIT; size <<= 1) {\n",
        "    const ga_uint ddd = (LID_0 & (size / 2)) == 0;\n",
        "    for (ga_uint stride = size / 2; stride > 0; stride >>= 1) {\n",
        "      local_barrier();\n",
        "      const ga_uint pos = 2 * LID_0 - (LID_0 & (stride - 1));\n",
    ));
    append!(sb, "      if ({after} == ddd) {{\n");
    sb.append_raw("        t_key tk = sKey[pos];\n        sKey[pos] = sKey[pos + stride];\n        sKey[pos + stride] = tk;\n");
    sb.append_raw(swap_arg);
    sb.append_raw("      }\n    }\n  }\n");
    sb.append_raw(concat!(
        "  for (ga_uint stride = SHARED_SIZE_LIMIT / 2; stride > 0; stride >>= 1) {\n",
        "    local_barrier();\n",
        "    const ga_uint pos = 2 * LID_0 - (LID_0 & (stride - 1));\n",
    ));
    append!(sb, "    if ({after}) {{\n");
    sb.append_raw("        t_key tk = sKey[pos];\n        sKey[pos] = sKey[pos + stride];\n        sKey[pos + stride] = tk;\n");
    sb.append_raw(swap_arg);
    sb.append_raw("    }\n  }\n");
    sb.append_raw("  local_barrier();\n  if (lo < length) dstKey[lo] = sKey[a];\n  if (hi < length) dstKey[hi] = sKey[b];\n");
    if argsort {
        sb.append_raw("  if (lo < length) dstArg[lo] = sArg[a];\n  if (hi < length) dstArg[hi] = sArg[b];\n");
    }
}

const SAMPLE_RANKS_BODY: &str = r#"  const ga_uint pos = GID_0 * LDIM_0 + LID_0;
  if (pos >= threadCount) return;
  const ga_uint i = pos & ((stride / SAMPLE_STRIDE) - 1);
  const ga_uint segmentBase = (pos - i) * (2 * SAMPLE_STRIDE);
  ranksA = AT_OFFSET(ga_uint, ranksA, ranksAOff) + segmentBase / SAMPLE_STRIDE;
  ranksB = AT_OFFSET(ga_uint, ranksB, ranksBOff) + segmentBase / SAMPLE_STRIDE;
  srcKey = AT_OFFSET(t_key, srcKey, srcKeyOff) + segmentBase;
  const ga_uint elemsA = stride;
  const ga_uint elemsB = sortUMin(stride, N - segmentBase - stride);
  const ga_uint samplesA = getSampleCount(elemsA);
  const ga_uint samplesB = getSampleCount(elemsB);
  if (i < samplesA) {
    ranksA[i] = i * SAMPLE_STRIDE;
    ranksB[i] = binarySearchExclusive(srcKey[i * SAMPLE_STRIDE], srcKey + stride, elemsB, nextPowerOfTwo(elemsB), sortDir);
  }
  if (i < samplesB) {
    ranksB[(stride / SAMPLE_STRIDE) + i] = i * SAMPLE_STRIDE;
    ranksA[(stride / SAMPLE_STRIDE) + i] = binarySearchInclusive(srcKey[stride + i * SAMPLE_STRIDE], srcKey, elemsA, nextPowerOfTwo(elemsA), sortDir);
  }
"#;

const MERGE_RANKS_BODY: &str = r#"  const ga_uint pos = GID_0 * LDIM_0 + LID_0;
  if (pos >= threadCount) return;
  const ga_uint i = pos & ((stride / SAMPLE_STRIDE) - 1);
  const ga_uint segmentBase = (pos - i) * (2 * SAMPLE_STRIDE);
  ranks = AT_OFFSET(ga_uint, ranks, ranksOff) + (pos - i) * 2;
  limits = AT_OFFSET(ga_uint, limits, limitsOff) + (pos - i) * 2;
  const ga_uint elemsA = stride;
  const ga_uint elemsB = sortUMin(stride, N - segmentBase - stride);
  const ga_uint samplesA = getSampleCount(elemsA);
  const ga_uint samplesB = getSampleCount(elemsB);
  if (i < samplesA) {
    const ga_uint dstPos = binarySearchRankExclusive(ranks[i], ranks + samplesA, samplesB, nextPowerOfTwo(samplesB)) + i;
    limits[dstPos] = ranks[i];
  }
  if (i < samplesB) {
    const ga_uint dstPos = binarySearchRankInclusive(ranks[samplesA + i], ranks, samplesA, nextPowerOfTwo(samplesA)) + i;
    limits[dstPos] = ranks[samplesA + i];
  }
"#;

fn merge_intervals_body(sb: &mut CodeBuilder, argsort: bool) {
    sb.append_raw("  LOCAL_MEM t_key sKey[2 * SAMPLE_STRIDE];\n");
    if argsort {
        sb.append_raw("  LOCAL_MEM t_arg sArg[2 * SAMPLE_STRIDE];\n");
    }
    sb.append_raw(concat!(
        "  LOCAL_MEM ga_uint startSrcA, startSrcB, lenSrcA, lenSrcB, startDstA, startDstB;\n",
        "  const ga_uint intervalI = GID_0 & ((2 * stride) / SAMPLE_STRIDE - 1);\n",
        "  const ga_uint segmentBase = (GID_0 - intervalI) * SAMPLE_STRIDE;\n",
        "  dstKey = AT_OFFSET(t_key, dstKey, dstKeyOff) + segmentBase;\n",
        "  srcKey = AT_OFFSET(t_key, srcKey, srcKeyOff) + segmentBase;\n",
    ));
    if argsort {
        sb.append_raw(concat!(
            "  dstArg = AT_OFFSET(t_arg, dstArg, dstArgOff) + segmentBase;\n",
            "  srcArg = AT_OFFSET(t_arg, srcArg, srcArgOff) + segmentBase;\n",
        ));
    }
    sb.append_raw(concat!(
        "  limitsA = AT_OFFSET(ga_uint, limitsA, limitsAOff);\n",
        "  limitsB = AT_OFFSET(ga_uint, limitsB, limitsBOff);\n",
        "  if (LID_0 == 0) {\n",
        "    const ga_uint elemsA = stride;\n",
        "    const ga_uint elemsB = sortUMin(stride, N - segmentBase - stride);\n",
        "    const ga_uint samples = getSampleCount(elemsA) + getSampleCount(elemsB);\n",
        "    startSrcA = limitsA[GID_0];\n",
        "    startSrcB = limitsB[GID_0];\n",
        "    const ga_uint endSrcA = (intervalI + 1 < samples) ? limitsA[GID_0 + 1] : elemsA;\n",
        "    const ga_uint endSrcB = (intervalI + 1 < samples) ? limitsB[GID_0 + 1] : elemsB;\n",
        "    lenSrcA = endSrcA - startSrcA;\n",
        "    lenSrcB = endSrcB - startSrcB;\n",
        "    startDstA = startSrcA + startSrcB;\n",
        "    startDstB = startDstA + lenSrcA;\n",
        "  }\n",
        "  local_barrier();\n",
        "  const ga_uint t = LID_0;\n",
        "  if (t < lenSrcA) sKey[t] = srcKey[startSrcA + t];\n",
        "  if (t < lenSrcB) sKey[SAMPLE_STRIDE + t] = srcKey[stride + startSrcB + t];\n",
    ));
    if argsort {
        sb.append_raw(concat!(
            "  if (t < lenSrcA) sArg[t] = srcArg[startSrcA + t];\n",
            "  if (t < lenSrcB) sArg[SAMPLE_STRIDE + t] = srcArg[stride + startSrcB + t];\n",
        ));
    }
    sb.append_raw(concat!(
        "  local_barrier();\n",
        "  t_key keyA;\n  t_key keyB;\n",
        "  ga_uint dstPosA = 0;\n  ga_uint dstPosB = 0;\n",
        "  if (t < lenSrcA) {\n",
        "    keyA = sKey[t];\n",
        "    dstPosA = binarySearchExclusive(keyA, sKey + SAMPLE_STRIDE, lenSrcB, SAMPLE_STRIDE, sortDir) + t;\n",
        "  }\n",
        "  if (t < lenSrcB) {\n",
        "    keyB = sKey[SAMPLE_STRIDE + t];\n",
        "    dstPosB = binarySearchInclusive(keyB, sKey, lenSrcA, SAMPLE_STRIDE, sortDir) + t;\n",
        "  }\n",
    ));
    if argsort {
        sb.append_raw(concat!(
            "  t_arg argA;\n  t_arg argB;\n",
            "  if (t < lenSrcA) argA = sArg[t];\n",
            "  if (t < lenSrcB) argB = sArg[SAMPLE_STRIDE + t];\n",
        ));
    }
    sb.append_raw("  local_barrier();\n  if (t < lenSrcA) sKey[dstPosA] = keyA;\n  if (t < lenSrcB) sKey[dstPosB] = keyB;\n");
    if argsort {
        sb.append_raw("  if (t < lenSrcA) sArg[dstPosA] = argA;\n  if (t < lenSrcB) sArg[dstPosB] = argB;\n");
    }
    sb.append_raw(concat!(
        "  local_barrier();\n",
        "  if (t < lenSrcA) dstKey[startDstA + t] = sKey[t];\n",
        "  if (t < lenSrcB) dstKey[startDstB + t] = sKey[lenSrcA + t];\n",
    ));
    if argsort {
        sb.append_raw(concat!(
            "  if (t < lenSrcA) dstArg[startDstA + t] = sArg[t];\n",
            "  if (t < lenSrcB) dstArg[startDstB + t] = sArg[lenSrcA + t];\n",
        ));
    }
}

fn merge_global_body(sb: &mut CodeBuilder, argsort: bool) {
    sb.append_raw(concat!(
        "  const ga_uint idx = GID_0 * LDIM_0 + LID_0;\n",
        "  if (idx >= N) return;\n",
        "  dstKey = AT_OFFSET(t_key, dstKey, dstKeyOff);\n",
        "  srcKey = AT_OFFSET(t_key, srcKey, srcKeyOff);\n",
        "  const t_key value = srcKey[idx];\n",
        "  ga_uint dstPos;\n",
        "  if (idx < segmentSizeA)\n",
        "    dstPos = binarySearchLowerBoundExclusive(value, srcKey, segmentSizeA, segmentSizeA + segmentSizeB, sortDir) - segmentSizeA + idx;\n",
        "  else\n",
        "    dstPos = binarySearchLowerBoundInclusive(value, srcKey, 0, segmentSizeA, sortDir) + idx - segmentSizeA;\n",
        "  dstKey[dstPos] = value;\n",
    ));
    if argsort {
        sb.append_raw(concat!(
            "  dstArg = AT_OFFSET(t_arg, dstArg, dstArgOff);\n",
            "  srcArg = AT_OFFSET(t_arg, srcArg, srcArgOff);\n",
            "  dstArg[dstPos] = srcArg[idx];\n",
        ));
    }
}
