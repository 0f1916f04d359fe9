//! Benchmarks for the bytecode compiler and VM.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use loxlang::bytecode::compiler::compile;
use loxlang::value::Heap;
use loxlang::Vm;

/// A program of arithmetic declarations, sized to stay inside one chunk's
/// constant pool.
fn arithmetic_source() -> String {
    let mut source = String::new();
    for i in 0..30 {
        source.push_str(&format!(
            "var v{} = ({} + 2) * 3 - 4 / (5 + {});\n",
            i, i, i
        ));
    }
    source
}

fn bench_compile(c: &mut Criterion) {
    let source = arithmetic_source();
    c.bench_function("compile_arithmetic", |b| {
        b.iter(|| {
            let mut heap = Heap::new();
            compile(black_box(&source), &mut heap).expect("compile error")
        })
    });
}

fn bench_interpret(c: &mut Criterion) {
    let source = arithmetic_source();
    c.bench_function("interpret_arithmetic", |b| {
        b.iter(|| {
            let mut vm = Vm::new();
            vm.interpret(black_box(&source)).expect("runtime error");
        })
    });
}

fn bench_interning(c: &mut Criterion) {
    // Every concatenation goes through the interner, and the comparison is
    // a pointer check on the canonical string.
    let source = r#"var s = "al" + "pha" + "bet"; var hit = s == "alphabet";"#;
    c.bench_function("interpret_concat", |b| {
        b.iter(|| {
            let mut vm = Vm::new();
            vm.interpret(black_box(source)).expect("runtime error");
        })
    });
}

criterion_group!(benches, bench_compile, bench_interpret, bench_interning);
criterion_main!(benches);
