//! Operand resolution
//!
//! Turns an operand descriptor into the concrete slot it names in the
//! current frame or constant table. Handlers see values through
//! [`OperandView`] / [`OperandViewMut`], which strip exactly one level of
//! reference indirection: a reference to a reference shows the inner
//! reference, not its target.

use std::cell::{Ref, RefMut};
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use crate::bytecode::Operand;
use crate::vm::frame::Frame;
use crate::vm::value::Value;
use crate::vm::{VmError, VmResult};

/// Read-only view of a resolved operand
pub enum OperandView<'a> {
    /// Value stored directly in its slot
    Direct(&'a Value),
    /// Value stored behind a reference cell
    Indirect(Ref<'a, Value>),
}

impl<'a> OperandView<'a> {
    /// View `value`, looking through one reference cell
    pub fn of(value: &'a Value) -> Self {
        match value {
            Value::Ref(cell) => OperandView::Indirect(cell.borrow()),
            other => OperandView::Direct(other),
        }
    }

    /// Whether the slot held a reference cell
    pub fn is_indirect(&self) -> bool {
        matches!(self, OperandView::Indirect(_))
    }
}

impl Deref for OperandView<'_> {
    type Target = Value;

    fn deref(&self) -> &Value {
        match self {
            OperandView::Direct(value) => value,
            OperandView::Indirect(value) => value,
        }
    }
}

/// Writable view of a resolved operand
pub enum OperandViewMut<'a> {
    /// Value stored directly in its slot
    Direct(&'a mut Value),
    /// Value stored behind a reference cell
    Indirect(RefMut<'a, Value>),
}

impl<'a> OperandViewMut<'a> {
    /// View `slot` for writing, looking through one reference cell
    pub fn of(slot: &'a mut Value) -> Self {
        match slot {
            Value::Ref(cell) => OperandViewMut::Indirect(cell.borrow_mut()),
            other => OperandViewMut::Direct(other),
        }
    }
}

impl Deref for OperandViewMut<'_> {
    type Target = Value;

    fn deref(&self) -> &Value {
        match self {
            OperandViewMut::Direct(value) => value,
            OperandViewMut::Indirect(value) => value,
        }
    }
}

impl DerefMut for OperandViewMut<'_> {
    fn deref_mut(&mut self) -> &mut Value {
        match self {
            OperandViewMut::Direct(value) => value,
            OperandViewMut::Indirect(value) => value,
        }
    }
}

/// Name of a dynamic variable
pub(crate) fn variable_name(constants: &[Value], index: u32) -> VmResult<Rc<str>> {
    match constants.get(index as usize) {
        Some(Value::Str(name)) => Ok(name.clone()),
        _ => Err(VmError::RuntimeError(format!(
            "Dynamic variable name c{} is not a string constant",
            index
        ))),
    }
}

/// Resolve a descriptor for reading
///
/// Unused and undefined dynamic variables read as null.
pub fn resolve<'a>(frame: &'a Frame, constants: &'a [Value], operand: Operand) -> VmResult<&'a Value> {
    match operand {
        Operand::Unused => Ok(frame.null()),
        Operand::Constant(index) => constants.get(index as usize).ok_or_else(|| {
            VmError::RuntimeError(format!(
                "Constant c{} out of bounds (len={})",
                index,
                constants.len()
            ))
        }),
        Operand::Temporary(index) => frame.temporary(index),
        Operand::CompiledVariable(index) => frame.variable(index),
        Operand::DynamicVariable(index) => {
            let name = variable_name(constants, index)?;
            Ok(frame.symbol(&name).unwrap_or_else(|| frame.null()))
        }
    }
}

/// Resolve a descriptor for writing
///
/// Undefined dynamic variables are defined as null. Unused resolves to the
/// frame's scratch slot.
pub fn resolve_mut<'a>(
    frame: &'a mut Frame,
    constants: &[Value],
    operand: Operand,
) -> VmResult<&'a mut Value> {
    match operand {
        Operand::Unused => Ok(frame.scratch_mut()),
        Operand::Constant(index) => Err(VmError::RuntimeError(format!(
            "Cannot write to constant c{}",
            index
        ))),
        Operand::Temporary(index) => frame.temporary_mut(index),
        Operand::CompiledVariable(index) => frame.variable_mut(index),
        Operand::DynamicVariable(index) => {
            let name = variable_name(constants, index)?;
            Ok(frame.symbol_entry(name))
        }
    }
}

/// Read a descriptor as a view (one dereference)
pub fn view<'a>(frame: &'a Frame, constants: &'a [Value], operand: Operand) -> VmResult<OperandView<'a>> {
    resolve(frame, constants, operand).map(OperandView::of)
}

/// Read a descriptor's value (one dereference), cloning it out
pub fn load(frame: &Frame, constants: &[Value], operand: Operand) -> VmResult<Value> {
    Ok(view(frame, constants, operand)?.clone())
}

/// Store into a slot, writing through a reference cell if one is bound
pub fn store(slot: &mut Value, value: Value) {
    match slot {
        Value::Ref(cell) => *cell.borrow_mut() = value,
        other => *other = value,
    }
}

/// Resolve and store
pub fn store_operand(
    frame: &mut Frame,
    constants: &[Value],
    operand: Operand,
    value: Value,
) -> VmResult<()> {
    store(resolve_mut(frame, constants, operand)?, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::value::Reference;

    fn constants() -> Vec<Value> {
        vec![Value::Int(7), Value::string("name")]
    }

    #[test]
    fn test_resolve_each_kind() {
        let consts = constants();
        let mut frame = Frame::new(1, 1);
        *frame.temporary_mut(0).unwrap() = Value::Int(1);
        *frame.variable_mut(0).unwrap() = Value::Int(2);
        frame.set_symbol("name", Value::Int(3));

        assert_eq!(resolve(&frame, &consts, Operand::Constant(0)).unwrap(), &Value::Int(7));
        assert_eq!(resolve(&frame, &consts, Operand::Temporary(0)).unwrap(), &Value::Int(1));
        assert_eq!(resolve(&frame, &consts, Operand::CompiledVariable(0)).unwrap(), &Value::Int(2));
        assert_eq!(resolve(&frame, &consts, Operand::DynamicVariable(1)).unwrap(), &Value::Int(3));
        assert!(resolve(&frame, &consts, Operand::Unused).unwrap().is_null());
    }

    #[test]
    fn test_undefined_dynamic_variable() {
        let consts = constants();
        let mut frame = Frame::new(0, 0);
        assert!(resolve(&frame, &consts, Operand::DynamicVariable(1)).unwrap().is_null());
        assert_eq!(frame.symbol_count(), 0);

        *resolve_mut(&mut frame, &consts, Operand::DynamicVariable(1)).unwrap() = Value::Int(5);
        assert_eq!(frame.symbol("name"), Some(&Value::Int(5)));
    }

    #[test]
    fn test_dynamic_name_must_be_string() {
        let consts = constants();
        let frame = Frame::new(0, 0);
        assert!(resolve(&frame, &consts, Operand::DynamicVariable(0)).is_err());
    }

    #[test]
    fn test_constant_not_writable() {
        let consts = constants();
        let mut frame = Frame::new(0, 0);
        assert!(resolve_mut(&mut frame, &consts, Operand::Constant(0)).is_err());
    }

    #[test]
    fn test_single_dereference() {
        let consts = constants();
        let mut frame = Frame::new(0, 2);
        let inner = Reference::new(Value::Int(9));
        *frame.variable_mut(0).unwrap() = Value::Ref(inner.clone());
        *frame.variable_mut(1).unwrap() = Value::Ref(Reference::new(Value::Ref(inner)));

        let once = view(&frame, &consts, Operand::CompiledVariable(0)).unwrap();
        assert!(once.is_indirect());
        assert_eq!(*once, Value::Int(9));

        let twice = view(&frame, &consts, Operand::CompiledVariable(1)).unwrap();
        assert!(matches!(*twice, Value::Ref(_)));
    }

    #[test]
    fn test_store_writes_through_reference() {
        let cell = Reference::new(Value::Int(1));
        let mut slot = Value::Ref(cell.clone());
        store(&mut slot, Value::Int(2));
        assert_eq!(cell.get(), Value::Int(2));
        assert!(matches!(slot, Value::Ref(_)));

        let mut plain = Value::Int(1);
        store(&mut plain, Value::Int(3));
        assert_eq!(plain, Value::Int(3));
    }
}
