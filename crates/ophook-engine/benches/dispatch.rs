use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ophook_engine::{
    CodeWriter, DispatchTable, DispatchTableBuilder, Function, Opcode, Operand, Value, Vm,
    VmOptions,
};

/// `i = 0; acc = 0; while (i < n) { acc = acc + i; ++i } return acc`
fn sum_loop(n: i64) -> Function {
    let mut w = CodeWriter::new("sum");
    let i = w.variable("i");
    let acc = w.variable("acc");
    let zero = w.constant(Value::Int(0));
    let limit = w.constant(Value::Int(n));
    let (cond, sum) = (w.temp(), w.temp());

    w.emit(Opcode::Assign, i, zero, Operand::Unused);
    w.emit(Opcode::Assign, acc, zero, Operand::Unused);
    let head = w.position();
    w.emit(Opcode::IsSmaller, i, limit, cond);
    let exit = w.emit_jump_if_false(cond, 0);
    w.emit(Opcode::Add, acc, i, sum);
    w.emit(Opcode::Assign, acc, sum, Operand::Unused);
    w.emit(Opcode::PreInc, i, Operand::Unused, Operand::Unused);
    w.emit_jump(head);
    let end = w.position();
    w.patch_jump(exit, end);
    w.emit_return(acc);
    w.finish()
}

fn tables() -> Vec<(&'static str, Arc<DispatchTable>)> {
    let mut declining = DispatchTableBuilder::new();
    declining.set(Opcode::Add, |_call| Ok(false)).unwrap();

    let mut handling = DispatchTableBuilder::new();
    handling
        .set(Opcode::Add, |call| {
            let a = call.op1().as_int().unwrap_or(0);
            let b = call.op2().and_then(|v| v.as_int()).unwrap_or(0);
            call.set_result(Value::Int(a.wrapping_add(b)))?;
            Ok(true)
        })
        .unwrap();

    vec![
        ("builtin", Arc::new(DispatchTable::empty())),
        ("declined", Arc::new(declining.freeze())),
        ("handled", Arc::new(handling.freeze())),
    ]
}

fn bench_add_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_dispatch");
    let program = sum_loop(1_000);

    for (name, table) in tables() {
        group.bench_with_input(BenchmarkId::new(name, 1_000), &program, |b, program| {
            let mut vm = Vm::with_table(VmOptions::default(), table.clone());
            b.iter(|| vm.execute(black_box(program)).unwrap());
        });
    }

    group.finish();
}

fn bench_negation(c: &mut Criterion) {
    let mut w = CodeWriter::new("negate");
    let x = w.variable("x");
    let five = w.constant(Value::Int(5));
    let t = w.temp();
    w.emit(Opcode::Assign, x, five, Operand::Unused);
    w.emit_negate(x, t, Default::default());
    w.emit_return(t);
    let program = w.finish();

    let mut builder = DispatchTableBuilder::new();
    builder
        .set(Opcode::Mul, |call| Ok(call.normalized_unary().is_none()))
        .unwrap();
    let mut vm = Vm::with_table(VmOptions::default(), Arc::new(builder.freeze()));

    c.bench_function("normalized_negate", |b| {
        b.iter(|| vm.execute(black_box(&program)).unwrap());
    });
}

criterion_group!(benches, bench_add_dispatch, bench_negation);
criterion_main!(benches);
