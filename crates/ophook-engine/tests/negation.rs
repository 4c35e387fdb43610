//! Integration tests for desugared unary negate/plus
//!
//! Tests cover:
//! - One MUL handler serves both operand orders
//! - Ordinary multiplications are not mistaken for negation
//! - The classifier follows the VM's configured order

use std::sync::Arc;

use ophook_engine::{
    CodeWriter, DispatchTable, DispatchTableBuilder, Frame, Function, NegationOrder, Opcode,
    Operand, OperandPosition, UnaryKind, Value, Vm, VmOptions,
};

/// MUL handler that tags negate/plus of a string and declines the rest
fn tagging_table() -> Arc<DispatchTable> {
    let mut builder = DispatchTableBuilder::new();
    builder
        .set(Opcode::Mul, |call| {
            let tagged = match call.normalized_unary() {
                Some(unary) => match (unary.kind, unary.operand.as_str()) {
                    (UnaryKind::Negate, Some(s)) => format!("neg({})", s),
                    (UnaryKind::Plus, Some(s)) => format!("pos({})", s),
                    _ => return Ok(false),
                },
                None => return Ok(false),
            };
            call.set_result(Value::string(&tagged))?;
            Ok(true)
        })
        .unwrap();
    Arc::new(builder.freeze())
}

fn vm(order: NegationOrder) -> Vm {
    Vm::with_table(
        VmOptions::default().with_negation_order(order),
        tagging_table(),
    )
}

/// `s = "abc"; return <negate or plus> s` emitted in `order`
fn unary_program(order: NegationOrder, negate: bool) -> Function {
    let mut w = CodeWriter::new("unary");
    let s = w.variable("s");
    let abc = w.constant(Value::string("abc"));
    let t = w.temp();
    w.emit(Opcode::Assign, s, abc, Operand::Unused);
    if negate {
        w.emit_negate(s, t, order);
    } else {
        w.emit_plus(s, t, order);
    }
    w.emit_return(t);
    w.finish()
}

#[test]
fn test_negate_in_both_orders() {
    for order in [NegationOrder::ValueFirst, NegationOrder::ConstantFirst] {
        let result = vm(order).execute(&unary_program(order, true)).unwrap();
        assert_eq!(result, Value::string("neg(abc)"), "{:?}", order);
    }
}

#[test]
fn test_plus_in_both_orders() {
    for order in [NegationOrder::ValueFirst, NegationOrder::ConstantFirst] {
        let result = vm(order).execute(&unary_program(order, false)).unwrap();
        assert_eq!(result, Value::string("pos(abc)"), "{:?}", order);
    }
}

#[test]
fn test_numeric_negate_falls_back() {
    for order in [NegationOrder::ValueFirst, NegationOrder::ConstantFirst] {
        let mut w = CodeWriter::new("numeric");
        let x = w.variable("x");
        let seven = w.constant(Value::Int(7));
        let t = w.temp();
        w.emit(Opcode::Assign, x, seven, Operand::Unused);
        w.emit_negate(x, t, order);
        w.emit_return(t);

        let mut vm = vm(order);
        assert_eq!(vm.execute(&w.finish()).unwrap(), Value::Int(-7));
        assert_eq!(vm.stats().declined(Opcode::Mul), 1);
    }
}

#[test]
fn test_plain_multiply_is_not_unary() {
    let mut w = CodeWriter::new("times_two");
    let s = w.variable("s");
    let text = w.constant(Value::string("4"));
    let two = w.constant(Value::Int(2));
    let t = w.temp();
    w.emit(Opcode::Assign, s, text, Operand::Unused);
    w.emit(Opcode::Mul, s, two, t);
    w.emit_return(t);

    let mut vm = vm(NegationOrder::ValueFirst);
    assert_eq!(vm.execute(&w.finish()).unwrap(), Value::Int(8));
    assert_eq!(vm.stats().handled(Opcode::Mul), 0);
}

#[test]
fn test_mismatched_order_is_not_recognized() {
    // code emitted constant-first, VM configured value-first
    let program = unary_program(NegationOrder::ConstantFirst, true);
    let mut vm = vm(NegationOrder::ValueFirst);
    let err = vm.execute(&program).unwrap_err();
    // the built-in multiply rejects the non-numeric string
    assert!(err.to_string().contains("abc"), "{}", err);
}

#[test]
fn test_operand_position_reported() {
    for (order, expected) in [
        (NegationOrder::ValueFirst, OperandPosition::First),
        (NegationOrder::ConstantFirst, OperandPosition::Second),
    ] {
        let mut builder = DispatchTableBuilder::new();
        builder
            .set(Opcode::Mul, move |call| {
                let position = call.normalized_unary().map(|u| u.position);
                assert_eq!(position, Some(expected));
                Ok(false)
            })
            .unwrap();
        let options = VmOptions::default().with_negation_order(order);
        let mut vm = Vm::with_table(options, Arc::new(builder.freeze()));

        let mut w = CodeWriter::new("position");
        let x = w.variable("x");
        let t = w.temp();
        w.emit_negate(x, t, order);
        w.emit_return(t);
        let program = w.finish();
        let mut frame = Frame::for_function(&program);
        *frame.variable_mut(0).unwrap() = Value::Float(2.5);
        assert_eq!(vm.execute_in(&program, &mut frame).unwrap(), Value::Float(-2.5));
    }
}
