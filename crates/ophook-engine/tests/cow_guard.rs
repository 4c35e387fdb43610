//! Integration tests for copy-on-write discipline
//!
//! Tests cover:
//! - Handlers that separate before mutating leave other holders untouched
//! - Mutating a shared composite in place is a contract violation
//! - The shared-mutation flag permits in-place changes
//! - Built-in SET_FIELD separates shared composites

use std::rc::Rc;
use std::sync::Arc;

use ophook_engine::{
    guard, CodeWriter, Composite, ContractViolation, DispatchTable, DispatchTableBuilder, Frame,
    Function, HandlerResult, Opcode, Operand, OperatorCall, Value, Vm, VmError, VmOptions,
};

fn point(x: i64) -> Value {
    Value::composite(Composite::with_fields("Point", [("x", Value::Int(x))]))
}

fn field_x(value: &Value) -> Option<i64> {
    value.as_composite()?.get("x")?.as_int()
}

/// `b = a; a += 5; return b` with `a` preset to a point
fn share_then_add() -> Function {
    let mut w = CodeWriter::new("share");
    let a = w.variable("a");
    let b = w.variable("b");
    let five = w.constant(Value::Int(5));
    w.emit(Opcode::Assign, b, a, Operand::Unused);
    w.emit(Opcode::AssignAdd, a, five, Operand::Unused);
    w.emit_return(b);
    w.finish()
}

fn add_to_x(call: &mut OperatorCall<'_>, separate: bool) -> HandlerResult {
    let rhs = call.op2().and_then(|v| v.as_int()).unwrap_or(0);
    let mut target = call.op1_mut()?;
    if target.as_composite().is_none() {
        return Ok(false);
    }
    if separate {
        guard::separate(&mut target);
    }
    if let Some(composite) = target.as_composite_mut() {
        let x = composite.get("x").and_then(|v| v.as_int()).unwrap_or(0);
        composite.set("x", Value::Int(x + rhs))?;
    }
    Ok(true)
}

fn run(separate: bool, frame: &mut Frame) -> Result<Value, VmError> {
    let mut builder = DispatchTableBuilder::new();
    builder
        .set(Opcode::AssignAdd, move |call| add_to_x(call, separate))
        .unwrap();
    let mut vm = Vm::with_table(VmOptions::default(), Arc::new(builder.freeze()));
    vm.execute_in(&share_then_add(), frame)
}

#[test]
fn test_separated_mutation_keeps_other_holder() {
    let program = share_then_add();
    let mut frame = Frame::for_function(&program);
    *frame.variable_mut(0).unwrap() = point(1);

    let b = run(true, &mut frame).unwrap();
    assert_eq!(field_x(&b), Some(1));
    assert_eq!(field_x(frame.variable(0).unwrap()), Some(6));
    assert_eq!(field_x(frame.variable(1).unwrap()), Some(1));

    let a = frame.variable(0).unwrap().as_composite().unwrap();
    assert!(guard::is_exclusive(a));
}

#[test]
fn test_exclusive_composite_needs_no_separation() {
    let mut w = CodeWriter::new("exclusive");
    let a = w.variable("a");
    let five = w.constant(Value::Int(5));
    w.emit(Opcode::AssignAdd, a, five, Operand::Unused);
    w.emit_return(a);
    let program = w.finish();

    let mut frame = Frame::for_function(&program);
    *frame.variable_mut(0).unwrap() = point(1);
    assert!(guard::is_exclusive(
        frame.variable(0).unwrap().as_composite().unwrap()
    ));

    let mut builder = DispatchTableBuilder::new();
    builder
        .set(Opcode::AssignAdd, |call| add_to_x(call, false))
        .unwrap();
    let mut vm = Vm::with_table(VmOptions::default(), Arc::new(builder.freeze()));
    let result = vm.execute_in(&program, &mut frame).unwrap();
    assert_eq!(field_x(&result), Some(6));
}

#[test]
fn test_shared_in_place_mutation_is_violation() {
    let program = share_then_add();
    let mut frame = Frame::for_function(&program);
    *frame.variable_mut(0).unwrap() = point(1);

    match run(false, &mut frame) {
        Err(VmError::ContractViolation(ContractViolation::SharedMutation { count })) => {
            assert_eq!(count, 2)
        }
        other => panic!("expected shared mutation violation, got {:?}", other),
    }
    // nothing was written
    assert_eq!(field_x(frame.variable(1).unwrap()), Some(1));
}

#[test]
fn test_unguarded_mutation_leaks_to_other_holder() {
    let a = Composite::with_fields("Point", [("x", Value::Int(1))]);
    let b = a.clone();
    assert!(a.set("x", Value::Int(2)).is_err());

    a.fields_mut_unguarded().insert(Rc::from("x"), Value::Int(2));
    assert_eq!(b.get("x"), Some(Value::Int(2)));
}

#[test]
fn test_shared_mutation_flag() {
    let program = share_then_add();
    let shared = Composite::with_fields("Point", [("x", Value::Int(1))]);
    shared.set_allow_shared_mutation(true);

    let mut frame = Frame::for_function(&program);
    *frame.variable_mut(0).unwrap() = Value::composite(shared);

    let b = run(false, &mut frame).unwrap();
    // both holders observe the in-place change
    assert_eq!(field_x(&b), Some(6));
    assert_eq!(field_x(frame.variable(0).unwrap()), Some(6));
}

#[test]
fn test_builtin_set_field_separates() {
    // a = new Point; a["x"] = 1; b = a; a["x"] = 2; return b
    let mut w = CodeWriter::new("fields");
    let a = w.variable("a");
    let b = w.variable("b");
    let class = w.constant(Value::string("Point"));
    let key = w.constant(Value::string("x"));
    let one = w.constant(Value::Int(1));
    let two = w.constant(Value::Int(2));
    let t = w.temp();
    w.emit(Opcode::NewComposite, class, Operand::Unused, t);
    w.emit(Opcode::Assign, a, t, Operand::Unused);
    w.emit_set_field(a, key, one);
    w.emit(Opcode::Assign, b, a, Operand::Unused);
    w.emit_set_field(a, key, two);
    w.emit_return(b);
    let program = w.finish();

    let mut vm = Vm::with_table(VmOptions::default(), Arc::new(DispatchTable::empty()));
    let mut frame = Frame::for_function(&program);
    let b = vm.execute_in(&program, &mut frame).unwrap();
    assert_eq!(field_x(&b), Some(1));
    assert_eq!(field_x(frame.variable(0).unwrap()), Some(2));
}
