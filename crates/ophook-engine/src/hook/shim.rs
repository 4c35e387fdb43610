//! Handler invocation shim
//!
//! Sits between the interpreter loop and a registered handler: checks the
//! operands resolve, presents them to the handler through an
//! [`OperatorCall`], enforces the category contract, and turns the handler's
//! answer into a [`DispatchOutcome`].

use tracing::trace;

use super::classifier::{Classifier, OperandPosition, OperatorCategory, UnaryKind};
use super::dispatch_table::OperatorHandler;
use super::error::{ContractViolation, HandlerError};
use super::resolver::{self, OperandView, OperandViewMut};
use crate::bytecode::{Instruction, Opcode, Operand};
use crate::vm::frame::Frame;
use crate::vm::value::Value;
use crate::vm::{VmError, VmResult};

/// What the interpreter does after a handler ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Handled: operands released, advance to the next instruction
    Continue,
    /// Not handled: run the built-in semantics as if no handler existed
    Dispatch,
}

/// A desugared unary negate/plus as seen by a `MUL` handler
pub struct NormalizedUnary<'a> {
    /// Operator
    pub kind: UnaryKind,
    /// Position of the value operand in the instruction
    pub position: OperandPosition,
    /// The value operand
    pub operand: OperandView<'a>,
}

/// One intercepted instruction, as presented to a handler
pub struct OperatorCall<'f> {
    frame: &'f mut Frame,
    constants: &'f [Value],
    instr: Instruction,
    category: OperatorCategory,
    classifier: Classifier,
    pending: Option<Value>,
    violation: Option<ContractViolation>,
}

impl<'f> OperatorCall<'f> {
    fn new(
        frame: &'f mut Frame,
        constants: &'f [Value],
        instr: Instruction,
        category: OperatorCategory,
        classifier: Classifier,
    ) -> Self {
        Self {
            frame,
            constants,
            instr,
            category,
            classifier,
            pending: None,
            violation: None,
        }
    }

    /// Executing opcode
    #[inline]
    pub fn opcode(&self) -> Opcode {
        self.instr.opcode
    }

    /// Contract category of the opcode
    #[inline]
    pub fn category(&self) -> OperatorCategory {
        self.category
    }

    /// The raw instruction
    #[inline]
    pub fn instruction(&self) -> &Instruction {
        &self.instr
    }

    /// Classifier in effect for this VM
    #[inline]
    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    fn view(&self, operand: Operand) -> OperandView<'_> {
        // operands were checked before the handler was invoked
        match resolver::view(self.frame, self.constants, operand) {
            Ok(view) => view,
            Err(_) => OperandView::Direct(self.frame.null()),
        }
    }

    /// First operand
    pub fn op1(&self) -> OperandView<'_> {
        self.view(self.instr.op1)
    }

    /// Second operand; absent for unary categories or an Unused descriptor
    pub fn op2(&self) -> Option<OperandView<'_>> {
        if !self.category.has_second_operand() || self.instr.op2.is_unused() {
            return None;
        }
        Some(self.view(self.instr.op2))
    }

    /// Operand at `position`
    pub fn operand(&self, position: OperandPosition) -> Option<OperandView<'_>> {
        match position {
            OperandPosition::First => Some(self.op1()),
            OperandPosition::Second => self.op2(),
        }
    }

    /// Write access to op1, for assignment categories only
    ///
    /// Composites reached through this view are still subject to the
    /// mutation guard; separate the slot with [`crate::vm::guard::separate`]
    /// before mutating in place.
    pub fn op1_mut(&mut self) -> Result<OperandViewMut<'_>, ContractViolation> {
        let opcode = self.instr.opcode;
        if !self.category.is_assignment() {
            return Err(self.record(ContractViolation::NotAssignable { opcode }));
        }
        resolver::resolve_mut(self.frame, self.constants, self.instr.op1)
            .map(OperandViewMut::of)
            .map_err(|_| ContractViolation::NotAssignable { opcode })
    }

    /// Whether the handler is given a result slot
    pub fn has_result(&self) -> bool {
        self.category.always_produces_result() || !self.instr.result.is_unused()
    }

    /// Write the instruction result
    ///
    /// The value is held until the handler returns and stored only if it
    /// reports the instruction handled. Writing when
    /// [`has_result`](Self::has_result) is false is a contract violation,
    /// fatal even if the handler ignores the returned error.
    pub fn set_result(&mut self, value: Value) -> Result<(), ContractViolation> {
        if !self.has_result() {
            let opcode = self.instr.opcode;
            return Err(self.record(ContractViolation::UnusedResultWrite { opcode }));
        }
        self.pending = Some(value);
        Ok(())
    }

    /// Recognize a desugared unary negate/plus on a `MUL`
    pub fn normalized_unary(&self) -> Option<NormalizedUnary<'_>> {
        let (kind, position) = self
            .classifier
            .normalized_unary(&self.instr, self.constants)?;
        Some(NormalizedUnary {
            kind,
            position,
            operand: self.view(position.select(&self.instr)),
        })
    }

    fn record(&mut self, violation: ContractViolation) -> ContractViolation {
        if self.violation.is_none() {
            self.violation = Some(violation.clone());
        }
        violation
    }
}

/// Check every descriptor the handler may touch resolves
fn check_operands(
    frame: &Frame,
    constants: &[Value],
    instr: &Instruction,
    category: OperatorCategory,
) -> VmResult<()> {
    resolver::resolve(frame, constants, instr.op1)?;
    if category.has_second_operand() {
        resolver::resolve(frame, constants, instr.op2)?;
    }
    if let Operand::Constant(index) = instr.result {
        return Err(VmError::RuntimeError(format!(
            "{} result cannot be constant c{}",
            instr.opcode, index
        )));
    }
    resolver::resolve(frame, constants, instr.result)?;
    Ok(())
}

/// Release Temporary operands consumed by `instr`
///
/// The result temporary is kept even if it doubles as an input.
pub(crate) fn release_operands(frame: &mut Frame, instr: &Instruction) -> VmResult<()> {
    for operand in [instr.op1, instr.op2] {
        if let Operand::Temporary(index) = operand {
            if operand != instr.result {
                frame.release_temporary(index)?;
            }
        }
    }
    Ok(())
}

/// Run `handler` for `instr`
pub fn invoke(
    handler: &OperatorHandler,
    frame: &mut Frame,
    constants: &[Value],
    instr: &Instruction,
    classifier: &Classifier,
) -> VmResult<DispatchOutcome> {
    let category = classifier.category(instr.opcode).ok_or_else(|| {
        VmError::RuntimeError(format!("{} is not an operator instruction", instr.opcode))
    })?;
    check_operands(frame, constants, instr, category)?;

    let mut call = OperatorCall::new(frame, constants, *instr, category, *classifier);
    let answer = handler(&mut call);
    let violation = call.violation.take();
    let pending = call.pending.take();
    drop(call);

    if let Some(violation) = violation {
        return Err(violation.into());
    }

    match answer {
        Ok(true) => {
            // a discarded Binary/Unary result is dropped with the call
            if let (Some(value), false) = (pending, instr.result.is_unused()) {
                resolver::store_operand(frame, constants, instr.result, value)?;
            }
            release_operands(frame, instr)?;
            frame.clear_scratch();
            trace!(opcode = instr.opcode.name(), "operator handled");
            Ok(DispatchOutcome::Continue)
        }
        Ok(false) => {
            frame.clear_scratch();
            trace!(opcode = instr.opcode.name(), "operator declined");
            Ok(DispatchOutcome::Dispatch)
        }
        Err(HandlerError::Unsupported(reason)) => {
            frame.clear_scratch();
            trace!(opcode = instr.opcode.name(), %reason, "operator declined");
            Ok(DispatchOutcome::Dispatch)
        }
        Err(HandlerError::Contract(violation)) => Err(violation.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::classifier::NegationOrder;
    use crate::hook::error::UnsupportedOperand;
    use crate::vm::value::Reference;
    use std::sync::Arc;

    fn handler<F>(f: F) -> OperatorHandler
    where
        F: Fn(&mut OperatorCall<'_>) -> crate::hook::HandlerResult + Send + Sync + 'static,
    {
        Arc::new(f)
    }

    fn setup() -> (Frame, Vec<Value>) {
        let mut frame = Frame::new(2, 2);
        *frame.variable_mut(0).unwrap() = Value::Int(10);
        *frame.temporary_mut(1).unwrap() = Value::Int(4);
        (frame, vec![Value::Int(-1), Value::Int(3)])
    }

    #[test]
    fn test_handled_releases_temporaries() {
        let (mut frame, consts) = setup();
        let instr = Instruction::new(
            Opcode::Add,
            Operand::CompiledVariable(0),
            Operand::Temporary(1),
            Operand::Temporary(0),
        );
        let h = handler(|call| {
            let sum = call.op1().as_int().unwrap_or(0) + call.op2().and_then(|v| v.as_int()).unwrap_or(0);
            call.set_result(Value::Int(sum * 100))?;
            Ok(true)
        });

        let outcome = invoke(&h, &mut frame, &consts, &instr, &Classifier::default()).unwrap();
        assert_eq!(outcome, DispatchOutcome::Continue);
        assert_eq!(frame.temporary(0).unwrap(), &Value::Int(1400));
        assert!(frame.temporary(1).unwrap().is_null());
        assert_eq!(frame.variable(0).unwrap(), &Value::Int(10));
    }

    #[test]
    fn test_declined_leaves_temporaries() {
        let (mut frame, consts) = setup();
        let instr = Instruction::new(
            Opcode::Add,
            Operand::CompiledVariable(0),
            Operand::Temporary(1),
            Operand::Temporary(0),
        );
        for h in [
            handler(|_call| Ok(false)),
            handler(|_call| Err(UnsupportedOperand::new("vector", "int").into())),
        ] {
            let outcome = invoke(&h, &mut frame, &consts, &instr, &Classifier::default()).unwrap();
            assert_eq!(outcome, DispatchOutcome::Dispatch);
            assert_eq!(frame.temporary(1).unwrap(), &Value::Int(4));
        }
    }

    #[test]
    fn test_declined_result_is_not_stored() {
        let (mut frame, consts) = setup();
        let instr = Instruction::new(
            Opcode::Add,
            Operand::CompiledVariable(0),
            Operand::Constant(1),
            Operand::CompiledVariable(0),
        );
        let h = handler(|call| {
            call.set_result(Value::Int(100))?;
            // the slot is only written once the handler returns
            assert_eq!(*call.op1(), Value::Int(10));
            Ok(false)
        });
        let outcome = invoke(&h, &mut frame, &consts, &instr, &Classifier::default()).unwrap();
        assert_eq!(outcome, DispatchOutcome::Dispatch);
        assert_eq!(frame.variable(0).unwrap(), &Value::Int(10));
    }

    #[test]
    fn test_unused_result_write_is_fatal() {
        let (mut frame, consts) = setup();
        let instr = Instruction::new(
            Opcode::AssignAdd,
            Operand::CompiledVariable(0),
            Operand::Constant(1),
            Operand::Unused,
        );
        // the handler swallows the error and claims success
        let h = handler(|call| {
            assert!(!call.has_result());
            let _ = call.set_result(Value::Int(1));
            Ok(true)
        });

        let err = invoke(&h, &mut frame, &consts, &instr, &Classifier::default()).unwrap_err();
        assert!(matches!(
            err,
            VmError::ContractViolation(ContractViolation::UnusedResultWrite {
                opcode: Opcode::AssignAdd
            })
        ));
        assert_eq!(frame.variable(0).unwrap(), &Value::Int(10));
    }

    #[test]
    fn test_binary_unused_result_is_dropped() {
        let (mut frame, consts) = setup();
        let instr = Instruction::new(
            Opcode::Sub,
            Operand::CompiledVariable(0),
            Operand::Constant(1),
            Operand::Unused,
        );
        let h = handler(|call| {
            assert!(call.has_result());
            call.set_result(Value::Int(7))?;
            Ok(true)
        });
        let outcome = invoke(&h, &mut frame, &consts, &instr, &Classifier::default()).unwrap();
        assert_eq!(outcome, DispatchOutcome::Continue);
        assert!(frame.scratch_mut().is_null());
    }

    #[test]
    fn test_op1_mut_only_for_assignments() {
        let (mut frame, consts) = setup();
        let instr = Instruction::new(
            Opcode::Add,
            Operand::CompiledVariable(0),
            Operand::Constant(1),
            Operand::Temporary(0),
        );
        let h = handler(|call| {
            call.op1_mut()?;
            Ok(true)
        });
        let err = invoke(&h, &mut frame, &consts, &instr, &Classifier::default()).unwrap_err();
        assert!(matches!(
            err,
            VmError::ContractViolation(ContractViolation::NotAssignable { .. })
        ));

        let instr = Instruction::new(
            Opcode::AssignMul,
            Operand::CompiledVariable(0),
            Operand::Constant(1),
            Operand::Unused,
        );
        let h = handler(|call| {
            let factor = call.op2().and_then(|v| v.as_int()).unwrap_or(1);
            let mut target = call.op1_mut()?;
            let current = target.as_int().unwrap_or(0);
            *target = Value::Int(current * factor);
            Ok(true)
        });
        invoke(&h, &mut frame, &consts, &instr, &Classifier::default()).unwrap();
        assert_eq!(frame.variable(0).unwrap(), &Value::Int(30));
    }

    #[test]
    fn test_op1_mut_writes_through_reference() {
        let (mut frame, consts) = setup();
        let cell = Reference::new(Value::Int(2));
        *frame.variable_mut(1).unwrap() = Value::Ref(cell.clone());
        let instr = Instruction::new(
            Opcode::PreInc,
            Operand::CompiledVariable(1),
            Operand::Unused,
            Operand::Unused,
        );
        let h = handler(|call| {
            let mut target = call.op1_mut()?;
            let next = target.as_int().unwrap_or(0) + 1;
            *target = Value::Int(next);
            Ok(true)
        });
        invoke(&h, &mut frame, &consts, &instr, &Classifier::default()).unwrap();
        assert_eq!(cell.get(), Value::Int(3));
    }

    #[test]
    fn test_normalized_unary_in_call() {
        let (mut frame, consts) = setup();
        let classifier = Classifier::new(NegationOrder::ConstantFirst);
        let instr = Instruction::new(
            Opcode::Mul,
            Operand::Constant(0),
            Operand::CompiledVariable(0),
            Operand::Temporary(0),
        );
        let h = handler(|call| {
            let negated = match call.normalized_unary() {
                Some(unary) if unary.kind == UnaryKind::Negate => {
                    assert_eq!(unary.position, OperandPosition::Second);
                    Value::Int(-unary.operand.as_int().unwrap_or(0))
                }
                _ => return Ok(false),
            };
            call.set_result(negated)?;
            Ok(true)
        });
        invoke(&h, &mut frame, &consts, &instr, &classifier).unwrap();
        assert_eq!(frame.temporary(0).unwrap(), &Value::Int(-10));
    }

    #[test]
    fn test_bad_operand_reported_before_handler() {
        let (mut frame, consts) = setup();
        let instr = Instruction::new(
            Opcode::Add,
            Operand::CompiledVariable(9),
            Operand::Constant(1),
            Operand::Temporary(0),
        );
        let h = handler(|_call| panic!("handler must not run"));
        assert!(invoke(&h, &mut frame, &consts, &instr, &Classifier::default()).is_err());
    }
}
