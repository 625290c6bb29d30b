use kiln_device::{ArgKind, CompileFlag, ErrorKind};
use kiln_dtype::ScalarDType;
use test_case::test_case;

use crate::elemwise::{ELEMWISE_ENTRY, Operand, elemwise_kernel};
use crate::error::Error;
use crate::signature::declared_kinds;

fn axpy_operands() -> Vec<Operand> {
    vec![
        Operand::array("x", ScalarDType::Float32),
        Operand::scalar("alpha", ScalarDType::Float32),
        Operand::array("y", ScalarDType::Float32),
    ]
}

#[test]
fn argument_order_matches_layout() {
    let request = elemwise_kernel("", "y[0] = alpha * x[0] + y[0]", &axpy_operands(), 2).unwrap();

    use ArgKind::*;
    let f32 = Scalar(ScalarDType::Float32);
    assert_eq!(request.entry, ELEMWISE_ENTRY);
    assert_eq!(request.arg_kinds, vec![Size, Size, Size, Buffer, Size, SSize, SSize, f32, Buffer, Size, SSize, SSize]);
    assert_eq!(declared_kinds(&request.source(), ELEMWISE_ENTRY), Some(request.arg_kinds.clone()));
}

#[test]
fn source_addresses_operands_through_strides() {
    let request = elemwise_kernel("#define TWICE(v) (2 * (v))", "y[0] = TWICE(x[0])", &axpy_operands(), 3).unwrap();
    let source = request.source();

    assert!(source.starts_with("#define TWICE(v) (2 * (v))\n"));
    assert!(source.contains("const ga_ssize x_str_2"));
    assert!(source.contains("x_p += (ga_ssize)pos * x_str_0;"));
    assert!(source.contains("pos = ii % dim2;"));
    assert!(!source.contains("pos = ii % dim0;"));
    assert!(source.contains("GLOBAL_MEM ga_float *y = (GLOBAL_MEM ga_float *)y_p;"));
    assert!(source.contains("i += numThreads"));
    assert!(source.contains("y[0] = TWICE(x[0]);"));
}

#[test]
fn zero_dimensional_kernel_has_no_decomposition() {
    let operands = [Operand::array("a", ScalarDType::Int32)];
    let request = elemwise_kernel("", "a[0] += 1", &operands, 0).unwrap();

    assert_eq!(request.arg_kinds, vec![ArgKind::Size, ArgKind::Buffer, ArgKind::Size]);
    assert!(!request.source().contains("pos ="));
}

#[test_case(ScalarDType::Float64, CompileFlag::Double ; "double")]
#[test_case(ScalarDType::Float16, CompileFlag::Half ; "half")]
#[test_case(ScalarDType::Int8, CompileFlag::Small ; "byte")]
fn flags_follow_operand_types(dtype: ScalarDType, flag: CompileFlag) {
    let operands = [Operand::array("a", dtype)];
    let request = elemwise_kernel("", "a[0] = a[0]", &operands, 1).unwrap();
    assert!(request.flags.contains(flag));
    assert!(request.flags.contains(CompileFlag::Cluda));
}

#[test_case("" ; "empty")]
#[test_case("   " ; "blank")]
fn empty_expression_is_rejected(expr: &str) {
    let err = elemwise_kernel("", expr, &axpy_operands(), 1).unwrap_err();
    assert!(matches!(err, Error::InvalidDescription { .. }));
    assert_eq!(err.kind(), ErrorKind::Value);
}

#[test_case("1x" ; "leading digit")]
#[test_case("a-b" ; "punctuation")]
#[test_case("" ; "empty name")]
fn bad_operand_names_are_rejected(name: &str) {
    let operands = [Operand::array(name, ScalarDType::Float32)];
    assert!(matches!(elemwise_kernel("", "x", &operands, 1), Err(Error::InvalidDescription { .. })));
}

#[test]
fn duplicate_operand_names_are_rejected() {
    let operands = [Operand::array("a", ScalarDType::Float32), Operand::scalar("a", ScalarDType::Float32)];
    assert!(matches!(elemwise_kernel("", "a[0] = 1", &operands, 1), Err(Error::InvalidDescription { .. })));
}

#[test]
fn half_scalars_cannot_be_bound() {
    let operands = [Operand::array("a", ScalarDType::Float16), Operand::scalar("h", ScalarDType::Float16)];
    let err = elemwise_kernel("", "a[0] = h", &operands, 1).unwrap_err();
    assert!(matches!(err, Error::TypeResolution { dtype: ScalarDType::Float16, .. }));
}

#[test_case(Operand::scalar("n", ScalarDType::UInt32) ; "element count")]
#[test_case(Operand::scalar("pos", ScalarDType::UInt32) ; "loop position")]
#[test_case(Operand::scalar("dim1", ScalarDType::UInt32) ; "dimension size")]
#[test_case(Operand::array("x_data", ScalarDType::Float32) ; "pointer parameter")]
#[test_case(Operand::scalar("x_str_0", ScalarDType::Int64) ; "stride parameter")]
#[test_case(Operand::scalar("x_p", ScalarDType::Int64) ; "address temporary")]
fn generated_names_are_reserved(clash: Operand) {
    let operands = [Operand::array("x", ScalarDType::Float32), clash];
    let err = elemwise_kernel("", "x[0] = 0", &operands, 2).unwrap_err();
    assert!(matches!(err, Error::InvalidDescription { .. }), "{err}");
}

#[test]
fn names_past_the_rank_are_free() {
    let operands = [Operand::array("x", ScalarDType::Float32), Operand::scalar("dim2", ScalarDType::UInt32)];
    assert!(elemwise_kernel("", "x[0] = dim2", &operands, 2).is_ok());
}
