use kiln_codegen::{Operand, elemwise_kernel};
use kiln_device::{ArgKind, Backend, CompileRequest, ErrorKind, KernelArg, LaunchGeometry, Property};
use kiln_dtype::{ScalarDType, ScalarValue};
use test_case::test_case;

use crate::error::Error;
use crate::kernel::{KERNEL_CACHE_KIND, Kernel};
use crate::test::{array, cached_context, context, emulator, read_f64, zeros};

const COPY: &str = "y[0] = x[0]";

fn copy_request() -> CompileRequest {
    let operands = [Operand::array("x", ScalarDType::Float32), Operand::array("y", ScalarDType::Float32)];
    elemwise_kernel("", COPY, &operands, 1).unwrap()
}

#[test]
fn compiles_and_exposes_request() {
    let emu = emulator();
    let kernel = Kernel::compile(&context(&emu), copy_request()).unwrap();

    assert_eq!(kernel.entry(), "elem");
    assert_eq!(kernel.arg_kinds(), copy_request().arg_kinds.as_slice());
    assert_eq!(kernel.request(), &copy_request());
    assert!(kernel.binary().is_some());
    assert_eq!(kernel.property(Property::PreferredLocalSize).unwrap(), 32);
    assert_eq!(emu.compiles(), 1);
}

#[test]
fn cache_hit_skips_compilation() {
    let emu = emulator();
    let (ctx, cache) = cached_context(&emu);

    let first = Kernel::compile(&ctx, copy_request()).unwrap();
    let second = Kernel::compile(&ctx, copy_request()).unwrap();

    assert_eq!((emu.compiles(), emu.loads()), (1, 1));
    assert_eq!(first.binary(), second.binary());
    let stored = cache.get(KERNEL_CACHE_KIND, "emulator", &copy_request().cache_text());
    assert_eq!(stored, first.binary());
}

#[test]
fn without_cache_every_kernel_compiles() {
    let emu = emulator();
    let ctx = context(&emu);
    Kernel::compile(&ctx, copy_request()).unwrap();
    Kernel::compile(&ctx, copy_request()).unwrap();
    assert_eq!((emu.compiles(), emu.loads()), (2, 0));
}

#[test]
fn rejected_cache_entry_recompiles() {
    let emu = emulator();
    let (ctx, cache) = cached_context(&emu);
    let text = copy_request().cache_text();
    cache.put(KERNEL_CACHE_KIND, "emulator", &text, b"stale");

    let kernel = Kernel::compile(&ctx, copy_request()).unwrap();

    assert_eq!((emu.compiles(), emu.loads()), (1, 0));
    assert_eq!(cache.get(KERNEL_CACHE_KIND, "emulator", &text), kernel.binary());
}

#[test]
fn compile_failure_keeps_diagnostic_and_cache_clean() {
    let emu = emulator();
    let (ctx, cache) = cached_context(&emu);
    emu.fail_compiles(Some("kernel.cu(3): error: identifier \"z\" is undefined"));

    let err = Kernel::compile(&ctx, copy_request()).unwrap_err();

    assert!(matches!(err, Error::Device { .. }));
    assert_eq!(err.kind(), ErrorKind::Backend);
    assert!(err.diagnostic().unwrap().contains("is undefined"));
    assert_eq!(cache.get(KERNEL_CACHE_KIND, "emulator", &copy_request().cache_text()), None);

    emu.fail_compiles(None);
    assert!(Kernel::compile(&ctx, copy_request()).is_ok());
}

#[test]
fn set_arg_checks_index_and_kind() {
    let emu = emulator();
    let mut kernel = Kernel::compile(&context(&emu), copy_request()).unwrap();

    let err = kernel.set_arg(9, KernelArg::Size(1)).unwrap_err();
    assert!(matches!(err, Error::ArgumentIndex { index: 9, count: 8 }));

    let err = kernel.set_arg(0, ScalarValue::Float32(1.0)).unwrap_err();
    assert!(matches!(
        err,
        Error::ArgumentKind { index: 0, expected: ArgKind::Size, actual: ArgKind::Scalar(ScalarDType::Float32) }
    ));
    assert_eq!(err.kind(), ErrorKind::Value);

    kernel.set_arg(0, KernelArg::Size(4)).unwrap();
    kernel.set_arg(0, KernelArg::Size(8)).unwrap();
}

#[test]
fn launch_requires_every_slot() {
    let emu = emulator();
    let mut kernel = Kernel::compile(&context(&emu), copy_request()).unwrap();
    kernel.set_arg(0, KernelArg::Size(4)).unwrap();
    kernel.set_arg(1, KernelArg::Size(4)).unwrap();

    let err = kernel.launch(&LaunchGeometry::linear(1, 32, 0)).unwrap_err();
    assert!(matches!(err, Error::UnboundArgument { index: 2 }));
    assert!(emu.launches().is_empty());
}

#[test]
fn launch_with_checks_count() {
    let emu = emulator();
    let kernel = Kernel::compile(&context(&emu), copy_request()).unwrap();
    let err = kernel.launch_with(&LaunchGeometry::linear(1, 32, 0), &[KernelArg::Size(1)]).unwrap_err();
    assert!(matches!(err, Error::ArgumentCount { expected: 8, actual: 1 }));
}

#[test]
fn bound_slots_survive_between_launches() {
    let emu = emulator();
    emu.register_map(COPY, |v| v[1] = v[0]);
    let mut kernel = Kernel::compile(&context(&emu), copy_request()).unwrap();

    let x = array(&emu, &[1.0f32, 2.0, 3.0, 4.0], &[4]);
    let y = zeros(&emu, ScalarDType::Float32, &[4]);
    let args = [
        KernelArg::Size(4),
        KernelArg::Size(4),
        KernelArg::Buffer(x.buffer.clone()),
        KernelArg::Size(0),
        KernelArg::SSize(4),
        KernelArg::Buffer(y.buffer.clone()),
        KernelArg::Size(0),
        KernelArg::SSize(4),
    ];
    for (index, arg) in args.into_iter().enumerate() {
        kernel.set_arg(index, arg).unwrap();
    }
    let geometry = kernel.schedule(4, None, None).unwrap();
    kernel.launch(&geometry).unwrap();
    assert_eq!(read_f64(&emu, &y), vec![1.0, 2.0, 3.0, 4.0]);

    kernel.set_arg(0, KernelArg::Size(2)).unwrap();
    emu.upload(&y.buffer, 0, &[0; 16]).unwrap();
    kernel.launch(&geometry).unwrap();
    assert_eq!(read_f64(&emu, &y), vec![1.0, 2.0, 0.0, 0.0]);
}

#[test_case(1000, None, None, (32, 32) ; "fits preferred block")]
#[test_case(100_000, None, None, (512, 192) ; "grows block past grid target")]
#[test_case(0, None, None, (1, 32) ; "empty")]
#[test_case(1000, Some(64), None, (16, 64) ; "fixed local")]
#[test_case(1000, None, Some(4), (4, 224) ; "fixed global")]
#[test_case(1_000_000, None, None, (512, 512) ; "block capped at 512")]
fn schedules(n: usize, local: Option<usize>, global: Option<usize>, expected: (usize, usize)) {
    let emu = emulator();
    let kernel = Kernel::compile(&context(&emu), copy_request()).unwrap();
    assert_eq!(kernel.schedule(n, local, global).unwrap(), LaunchGeometry::linear(expected.0, expected.1, 0));
}

#[test]
fn schedule_respects_device_grid_limit() {
    let emu = emulator();
    emu.set_property(Property::MaxGridSize0, 8);
    let kernel = Kernel::compile(&context(&emu), copy_request()).unwrap();
    let geometry = kernel.schedule(10_000, None, None).unwrap();
    assert_eq!(geometry.grid[0], 8);
    assert!(geometry.total_threads() <= 8 * 512);
}
