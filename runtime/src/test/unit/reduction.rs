use std::sync::Arc;

use kiln_device::{ErrorKind, Property};
use kiln_dtype::ScalarDType;
use test_case::test_case;

use crate::error::Error;
use crate::reduction::{MAX_REDUCTION_DIMS, ReductionEngine};
use crate::test::emulator::Emulator;
use crate::test::{array, context, emulator, read_f64, strided, zeros};

fn sum(emu: &Arc<Emulator>, dtype: ScalarDType) -> ReductionEngine {
    ReductionEngine::builder().context(context(emu)).reduce("a + b").neutral("0").input(dtype).build().unwrap()
}

const MATRIX: [f32; 6] = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];

#[test_case(0b11, &[], &[21.0] ; "everything")]
#[test_case(0b10, &[2], &[6.0, 15.0] ; "rows")]
#[test_case(0b01, &[3], &[5.0, 7.0, 9.0] ; "columns")]
#[test_case(0b00, &[2, 3], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0] ; "nothing")]
fn sums_matrix(mask: u32, out_shape: &[usize], expected: &[f64]) {
    let emu = emulator();
    let mut engine = sum(&emu, ScalarDType::Float32);
    let input = array(&emu, &MATRIX, &[2, 3]);
    let output = zeros(&emu, ScalarDType::Float32, out_shape);

    engine.call(&input, mask, &output).unwrap();

    assert_eq!(read_f64(&emu, &output), expected);
    assert_eq!(read_f64(&emu, &input), MATRIX.map(f64::from));
}

#[test]
fn long_reduction_uses_every_thread() {
    let emu = emulator();
    let mut engine = sum(&emu, ScalarDType::Float64);
    let data: Vec<f64> = (1..=10_000).map(f64::from).collect();
    let input = array(&emu, &data, &[data.len()]);
    let output = zeros(&emu, ScalarDType::Float64, &[]);

    engine.call(&input, 1, &output).unwrap();
    assert_eq!(read_f64(&emu, &output), vec![50_005_000.0]);
}

#[test]
fn layout_does_not_change_the_result() {
    let emu = emulator();
    let (d0, d1, d2) = (4, 5, 6);
    let value = |i: usize, j: usize, k: usize| ((i * 31 + j * 7 + k) as f32) * 0.1;

    let mut contiguous = Vec::new();
    for i in 0..d0 {
        for j in 0..d1 {
            for k in 0..d2 {
                contiguous.push(value(i, j, k));
            }
        }
    }
    let mut transposed = vec![0.0f32; d0 * d1 * d2];
    for i in 0..d0 {
        for j in 0..d1 {
            for k in 0..d2 {
                transposed[k * d0 * d1 + j * d0 + i] = value(i, j, k);
            }
        }
    }

    let mut engine = sum(&emu, ScalarDType::Float32);
    let a = array(&emu, &contiguous, &[d0, d1, d2]);
    let b = strided(&emu, &transposed, 0, &[d0, d1, d2], &[1, d0 as isize, (d0 * d1) as isize]);
    let out_a = zeros(&emu, ScalarDType::Float32, &[d1]);
    let out_b = zeros(&emu, ScalarDType::Float32, &[d1]);

    engine.call(&a, 0b101, &out_a).unwrap();
    engine.call(&b, 0b101, &out_b).unwrap();

    let bits = |values: Vec<f64>| values.into_iter().map(|v| (v as f32).to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(read_f64(&emu, &out_a)), bits(read_f64(&emu, &out_b)));
}

#[test]
fn writes_through_strided_output() {
    let emu = emulator();
    let mut engine = sum(&emu, ScalarDType::Float32);
    let input = array(&emu, &MATRIX, &[2, 3]);
    let output = strided(&emu, &[-1.0f32; 4], 3, &[2], &[-2]);

    engine.call(&input, 0b10, &output).unwrap();

    let backing = kiln_device::ArrayView::contiguous(output.buffer.clone(), ScalarDType::Float32, &[4]).unwrap();
    assert_eq!(read_f64(&emu, &backing), vec![-1.0, 15.0, -1.0, 6.0]);
}

#[test]
fn collapsible_shapes_share_a_variant() {
    let emu = emulator();
    let mut engine = sum(&emu, ScalarDType::Float32);

    for (shape, mask) in [(vec![2, 3], 0b10), (vec![7, 9], 0b10), (vec![2, 3, 4], 0b100), (vec![1, 4, 1, 5], 0b1000)] {
        let size = shape.iter().product();
        let input = array(&emu, &vec![1.0f32; size], &shape);
        let kept: Vec<usize> = shape.iter().enumerate().filter(|(axis, _)| mask & (1 << axis) == 0).map(|(_, &d)| d).collect();
        let output = zeros(&emu, ScalarDType::Float32, &kept);
        engine.call(&input, mask, &output).unwrap();

        let reduced = shape.iter().enumerate().filter(|(axis, _)| mask & (1 << axis) != 0).map(|(_, &d)| d).product::<usize>();
        assert!(read_f64(&emu, &output).iter().all(|&v| v == reduced as f64));
    }

    assert_eq!(engine.compiled_variants(), vec![(2, 1)]);
    assert_eq!(emu.compiles(), 1);
}

#[test]
fn warm_up_compiles_every_variant_once() {
    let emu = emulator();
    let mut engine = sum(&emu, ScalarDType::Float32);
    assert_eq!(engine.capacity(), 2);

    engine.warm_up().unwrap();
    engine.warm_up().unwrap();

    assert_eq!(engine.compiled_variants(), vec![(1, 0), (1, 1), (2, 0), (2, 1), (2, 2)]);
    assert_eq!(emu.compiles(), 5);
}

#[test]
fn growth_keeps_compiled_variants() {
    let emu = emulator();
    let mut engine = sum(&emu, ScalarDType::Float32);
    engine.warm_up().unwrap();

    // Alternating non-contiguous axes survive collapsing.
    let shape = [2, 2, 2, 2, 2];
    let input = array(&emu, &[1.0f32; 32], &shape);
    let output = zeros(&emu, ScalarDType::Float32, &[2, 2]);
    engine.call(&input, 0b10101, &output).unwrap();

    assert_eq!(engine.capacity(), 5);
    assert_eq!(read_f64(&emu, &output), vec![8.0; 4]);
    assert_eq!(engine.compiled_variants().len(), 6);
    assert!(engine.compiled_variants().contains(&(5, 3)));
}

#[test]
fn map_and_wider_work_type() {
    let emu = emulator();
    emu.register_pre_map("a * a", |a| a * a);
    let mut engine = ReductionEngine::builder()
        .context(context(&emu))
        .reduce("a + b")
        .neutral("0")
        .map("a * a")
        .input(ScalarDType::Int8)
        .work(ScalarDType::Int32)
        .output(ScalarDType::Int32)
        .build()
        .unwrap();

    let input = array(&emu, &[-3i8, 100, 100], &[3]);
    let output = zeros(&emu, ScalarDType::Int32, &[]);
    engine.call(&input, 1, &output).unwrap();

    assert_eq!(read_f64(&emu, &output), vec![20_009.0]);
    assert_eq!(engine.expr().map.as_deref(), Some("a * a"));
}

#[test]
fn max_with_custom_neutral() {
    let emu = emulator();
    let mut engine = ReductionEngine::builder()
        .context(context(&emu))
        .reduce("a > b ? a : b")
        .neutral("-1e300")
        .input(ScalarDType::Float64)
        .build()
        .unwrap();
    let input = array(&emu, &[-5.0f64, -2.5, -9.0, -7.0], &[2, 2]);
    let output = zeros(&emu, ScalarDType::Float64, &[2]);

    engine.call(&input, 0b10, &output).unwrap();
    assert_eq!(read_f64(&emu, &output), vec![-2.5, -7.0]);
}

#[test]
fn small_shared_memory_shrinks_blocks() {
    let emu = emulator();
    emu.set_property(Property::LocalMemSize, 64);
    let mut engine = sum(&emu, ScalarDType::Float64);
    let data: Vec<f64> = (0..100).map(f64::from).collect();
    let input = array(&emu, &data, &[100]);
    let output = zeros(&emu, ScalarDType::Float64, &[]);

    engine.call(&input, 1, &output).unwrap();
    assert_eq!(read_f64(&emu, &output), vec![4950.0]);
}

#[test]
fn empty_reduction_writes_neutral() {
    let emu = emulator();
    let mut engine = sum(&emu, ScalarDType::Float32);
    let input = zeros(&emu, ScalarDType::Float32, &[3, 0]);
    let output = array(&emu, &[7.0f32; 3], &[3]);

    engine.call(&input, 0b10, &output).unwrap();
    assert_eq!(read_f64(&emu, &output), vec![0.0; 3]);
}

#[test]
fn empty_output_launches_nothing() {
    let emu = emulator();
    let mut engine = sum(&emu, ScalarDType::Float32);
    let input = zeros(&emu, ScalarDType::Float32, &[0, 4]);
    let output = zeros(&emu, ScalarDType::Float32, &[0]);

    engine.call(&input, 0b10, &output).unwrap();
    assert!(emu.launches().is_empty());
    assert_eq!(emu.compiles(), 0);
}

#[test]
fn rejects_bad_calls() {
    let emu = emulator();
    let mut engine = sum(&emu, ScalarDType::Float32);
    let input = zeros(&emu, ScalarDType::Float32, &[2, 3]);

    let err = engine.call(&input, 0b10, &zeros(&emu, ScalarDType::Float32, &[3])).unwrap_err();
    assert!(matches!(err, Error::ShapeMismatch { .. }));

    let err = engine.call(&input, 0b100, &zeros(&emu, ScalarDType::Float32, &[2, 3])).unwrap_err();
    assert!(matches!(err, Error::InvalidValue { .. }));

    let err = engine.call(&input, 0b10, &zeros(&emu, ScalarDType::Float64, &[2])).unwrap_err();
    assert!(matches!(err, Error::InvalidValue { .. }));

    let scalar = zeros(&emu, ScalarDType::Float32, &[]);
    let err = engine.call(&scalar, 0, &scalar).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Value);

    let deep = zeros(&emu, ScalarDType::Float32, &[1; MAX_REDUCTION_DIMS + 1]);
    let err = engine.call(&deep, 1, &scalar).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsupported);
    assert!(emu.launches().is_empty());
}

#[test]
fn capacity_is_bounded() {
    let emu = emulator();
    let err = ReductionEngine::builder()
        .context(context(&emu))
        .reduce("a + b")
        .neutral("0")
        .input(ScalarDType::Float32)
        .capacity(MAX_REDUCTION_DIMS + 1)
        .build()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsupported);

    let err = ReductionEngine::builder().context(context(&emu)).reduce("").neutral("0").input(ScalarDType::Float32).build();
    assert!(matches!(err, Err(Error::InvalidValue { .. })));
}

#[test]
fn output_beyond_grid_is_unsupported() {
    let emu = emulator();
    emu.set_property(Property::MaxGridSize0, 4);
    let mut engine = sum(&emu, ScalarDType::Float32);
    let input = zeros(&emu, ScalarDType::Float32, &[5, 2]);
    let output = zeros(&emu, ScalarDType::Float32, &[5]);

    let err = engine.call(&input, 0b10, &output).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsupported);
    assert!(emu.launches().is_empty());
}

#[test]
fn full_rank_mask_is_accepted() {
    let emu = emulator();
    let mut engine = sum(&emu, ScalarDType::Float32);
    let input = array(&emu, &[1.0f32; 2], &[[1; MAX_REDUCTION_DIMS - 1].as_slice(), &[2]].concat());
    let output = zeros(&emu, ScalarDType::Float32, &[]);

    engine.call(&input, u32::MAX, &output).unwrap();
    assert_eq!(read_f64(&emu, &output), vec![2.0]);
}
