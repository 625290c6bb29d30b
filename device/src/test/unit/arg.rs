use enumset::EnumSet;
use kiln_dtype::{ScalarDType, ScalarValue};
use test_case::test_case;

use crate::test::host_buffer;
use crate::{ArgKind, CompileFlag, CompileRequest, KernelArg};

#[test]
fn argument_kinds() {
    assert_eq!(KernelArg::Buffer(host_buffer(4)).kind(), ArgKind::Buffer);
    assert_eq!(KernelArg::Size(3).kind(), ArgKind::Size);
    assert_eq!(KernelArg::SSize(-3).kind(), ArgKind::SSize);
    assert_eq!(KernelArg::from(ScalarValue::Float32(1.0)).kind(), ArgKind::Scalar(ScalarDType::Float32));
}

#[test_case(&[ScalarDType::Float32], EnumSet::only(CompileFlag::Cluda); "float only")]
#[test_case(&[ScalarDType::Float64, ScalarDType::Int32], CompileFlag::Cluda | CompileFlag::Double; "double")]
#[test_case(&[ScalarDType::UInt8, ScalarDType::Float16], CompileFlag::Cluda | CompileFlag::Small | CompileFlag::Half; "small and half")]
fn compile_flags(dtypes: &[ScalarDType], expected: EnumSet<CompileFlag>) {
    assert_eq!(CompileFlag::for_dtypes(dtypes.iter().copied()), expected);
}

#[test]
fn cache_text_distinguishes_entries() {
    let flags = CompileFlag::for_dtypes([ScalarDType::Float32]);
    let a = CompileRequest::new(vec!["src".into()], "a", vec![], flags);
    let b = CompileRequest::new(vec!["src".into()], "b", vec![], flags);
    assert_ne!(a.cache_text(), b.cache_text());
    assert!(a.cache_text().ends_with("src"));
    assert_eq!(a.source(), "src");
}
