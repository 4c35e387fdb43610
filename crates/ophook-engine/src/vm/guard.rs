//! Copy-on-write mutation guard
//!
//! A composite may be mutated in place only while its ownership count is 1
//! or its shared-mutation flag is set. Native code holding a possibly-shared
//! composite separates its slot first.

use std::cell::RefMut;
use std::ops::{Deref, DerefMut};

use super::object::{Composite, CompositeRef, Fields};
use super::value::Value;
use crate::hook::error::ContractViolation;

/// Number of durable references to the composite
#[inline]
pub fn ownership_count(view: CompositeRef<'_>) -> usize {
    view.handle().ownership_count()
}

/// Check if the composite has exactly one durable reference
#[inline]
pub fn is_exclusive(view: CompositeRef<'_>) -> bool {
    ownership_count(view) == 1
}

/// Check if in-place mutation is currently allowed
#[inline]
pub fn can_mutate_in_place(view: CompositeRef<'_>) -> bool {
    is_exclusive(view) || view.allows_shared_mutation()
}

/// Assert that in-place mutation is allowed
pub fn check_mutation(view: CompositeRef<'_>) -> Result<(), ContractViolation> {
    if can_mutate_in_place(view) {
        Ok(())
    } else {
        Err(ContractViolation::SharedMutation {
            count: ownership_count(view),
        })
    }
}

/// Separate a slot's composite from its other holders
///
/// If `slot` holds a composite that may not be mutated in place, it is
/// replaced by a duplicate with ownership count 1. A reference cell is
/// looked through once. Returns true if a duplicate was made.
pub fn separate(slot: &mut Value) -> bool {
    match slot {
        Value::Composite(composite) => separate_composite(composite),
        Value::Ref(cell) => match &mut *cell.borrow_mut() {
            Value::Composite(composite) => separate_composite(composite),
            _ => false,
        },
        _ => false,
    }
}

/// Separate a composite handle from its other holders
pub fn separate_composite(composite: &mut Composite) -> bool {
    if can_mutate_in_place(composite.view()) {
        return false;
    }
    *composite = composite.duplicate();
    true
}

/// RAII guard for in-place field mutation
///
/// Only obtainable through [`Composite::fields_mut`], after the ownership
/// check has passed. The fields stay mutably borrowed until it is dropped.
pub struct MutationGuard<'a> {
    fields: RefMut<'a, Fields>,
}

impl<'a> MutationGuard<'a> {
    pub(crate) fn new(fields: RefMut<'a, Fields>) -> Self {
        Self { fields }
    }
}

impl Deref for MutationGuard<'_> {
    type Target = Fields;

    fn deref(&self) -> &Fields {
        &self.fields
    }
}

impl DerefMut for MutationGuard<'_> {
    fn deref_mut(&mut self) -> &mut Fields {
        &mut self.fields
    }
}
