//! Benchmarks for the rewrite passes.
//!
//! Measures pass throughput on synthetic functions:
//! - Captured receiver canonicalization with wrapped and forwarded uses
//! - Self-store elimination over long blocks
//! - The full pipeline applied to many functions in parallel

extern crate iltransform;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use iltransform::{
    il::{BlockKind, CallInstruction, IlFunction, OpCode, VariableKind},
    transforms::{
        apply, run_parallel, FixCompilerGeneratedThis, FixSelfReference, IlTransform,
        RemoveCompilerGeneratedThis, TransformContext, TransformSettings,
    },
    typesystem::{IlField, IlMethod, IlType, IlTypeRc, MethodFlags, StackType, Token, TypeFlags},
};
use std::hint::black_box;

fn int32() -> IlTypeRc {
    IlType::new(Token::new(0x0100_0008), "System", "Int32", TypeFlags::VALUE_TYPE, StackType::I4)
}

fn counter() -> IlTypeRc {
    IlType::new(Token::new(0x0200_0001), "Demo", "Counter", TypeFlags::empty(), StackType::O)
}

fn display_class() -> IlTypeRc {
    IlType::new(
        Token::new(0x0200_0002),
        "Demo",
        "<>c__CompilerGenerated0",
        TypeFlags::SEALED | TypeFlags::COMPILER_GENERATED,
        StackType::O,
    )
}

/// A function with one capture, `uses` wrapped receiver loads and `copies` self-copies.
fn build_function(rid: u32, uses: usize, copies: usize) -> IlFunction {
    let ctor = IlMethod::new(
        Token::new(0x0600_0001),
        ".ctor",
        display_class(),
        IlType::void(),
        1,
        MethodFlags::SPECIAL_NAME | MethodFlags::RT_SPECIAL_NAME,
    );
    let getter = IlMethod::new(
        Token::new(0x0600_0002),
        "get_Value",
        counter(),
        int32(),
        0,
        MethodFlags::empty(),
    );
    let this_field = IlField::new(Token::new(0x0400_0001), "<>4__this", display_class(), counter());

    let mut f = IlFunction::new(Token::new(0x0600_0000 | rid), "Bench");
    let this = f.add_variable(VariableKind::This, 0, "this", counter());
    let cap = f.add_variable(VariableKind::Local, 0, "CS$<>8__locals0", display_class());
    let x = f.add_variable(VariableKind::Local, 1, "x", int32());
    let y = f.add_variable(VariableKind::Local, 2, "x", int32());
    let entry = f.add_block(f.body(), BlockKind::ControlFlow).unwrap();

    let receiver = f.ld_loc(this);
    let construct = f
        .call(CallInstruction::create(OpCode::NewObj, ctor).unwrap(), vec![receiver])
        .unwrap();
    let store = f.st_loc(cap, construct).unwrap();
    f.push_instruction(entry, store).unwrap();

    for i in 0..uses.max(copies) {
        if i < uses {
            let load = f.ld_loc(cap);
            let address = f.ld_flda(load, this_field.clone()).unwrap();
            let wrapper = f.ld_obj(address, counter()).unwrap();
            let call = CallInstruction::create(OpCode::CallVirt, getter.clone()).unwrap();
            let call = f.call(call, vec![wrapper]).unwrap();
            f.push_instruction(entry, call).unwrap();
        }
        if i < copies {
            let load = f.ld_loc(y);
            let copy = f.st_loc(x, load).unwrap();
            f.push_instruction(entry, copy).unwrap();
        }
    }
    f
}

fn quiet() -> TransformContext {
    TransformContext::new(TransformSettings::default().with_verification(false))
}

/// Benchmark the captured receiver pass on a function with many wrapped uses.
fn bench_captured_receiver(c: &mut Criterion) {
    c.bench_function("captured_receiver_256_uses", |b| {
        b.iter_batched(
            || build_function(1, 256, 0),
            |mut f| {
                let ctx = quiet();
                apply(&FixCompilerGeneratedThis::new(), &mut f, &ctx).unwrap();
                black_box(f)
            },
            BatchSize::SmallInput,
        );
    });
}

/// Benchmark self-store elimination on a long block.
fn bench_self_reference(c: &mut Criterion) {
    c.bench_function("self_reference_1024_copies", |b| {
        b.iter_batched(
            || build_function(2, 0, 1024),
            |mut f| {
                let ctx = quiet();
                apply(&FixSelfReference::new(), &mut f, &ctx).unwrap();
                black_box(f)
            },
            BatchSize::SmallInput,
        );
    });
}

/// Benchmark the full pipeline over many functions in parallel.
fn bench_parallel_pipeline(c: &mut Criterion) {
    c.bench_function("pipeline_parallel_512_functions", |b| {
        b.iter_batched(
            || (0..512).map(|rid| build_function(rid, 16, 16)).collect::<Vec<_>>(),
            |mut functions| {
                let ctx = quiet();
                let passes: [&dyn IlTransform; 3] = [
                    &FixCompilerGeneratedThis::new(),
                    &FixSelfReference::new(),
                    &RemoveCompilerGeneratedThis::new(),
                ];
                for pass in passes {
                    run_parallel(pass, &mut functions, &ctx).unwrap();
                }
                black_box(functions)
            },
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(
    benches,
    bench_captured_receiver,
    bench_self_reference,
    bench_parallel_pipeline
);
criterion_main!(benches);
