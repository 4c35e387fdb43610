//! Composite values
//!
//! A composite is a class-tagged map of named fields behind a shared handle.
//! Every `Composite` handle is a durable reference; its strong count is the
//! ownership count. Transient access goes through [`CompositeRef`], which
//! borrows a handle and has no way to change the count.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use super::guard::{self, MutationGuard};
use super::value::Value;
use crate::hook::error::ContractViolation;

/// Field storage of a composite, ordered by name
pub type Fields = BTreeMap<Rc<str>, Value>;

struct CompositeCell {
    class: Rc<str>,
    fields: RefCell<Fields>,
    allow_shared_mutation: Cell<bool>,
}

/// Durable reference to a composite
///
/// `Clone` creates another durable reference (+1 on the ownership count);
/// dropping one releases it (-1).
#[derive(Clone)]
pub struct Composite(Rc<CompositeCell>);

impl Composite {
    /// Create an empty composite of class `class`
    pub fn new(class: &str) -> Self {
        Self::from_parts(Rc::from(class), Fields::new())
    }

    /// Create a composite with initial fields
    pub fn with_fields<'k>(class: &str, fields: impl IntoIterator<Item = (&'k str, Value)>) -> Self {
        let fields = fields
            .into_iter()
            .map(|(k, v)| (Rc::from(k), v))
            .collect();
        Self::from_parts(Rc::from(class), fields)
    }

    fn from_parts(class: Rc<str>, fields: Fields) -> Self {
        Self(Rc::new(CompositeCell {
            class,
            fields: RefCell::new(fields),
            allow_shared_mutation: Cell::new(false),
        }))
    }

    /// Class name
    #[inline]
    pub fn class(&self) -> &str {
        &self.0.class
    }

    /// Borrowed view of this composite
    #[inline]
    pub fn view(&self) -> CompositeRef<'_> {
        CompositeRef(self)
    }

    /// Read a field
    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.fields.borrow().get(key).cloned()
    }

    /// Borrow all fields
    pub fn fields(&self) -> Ref<'_, Fields> {
        self.0.fields.borrow()
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.0.fields.borrow().len()
    }

    /// Check if the composite has no fields
    pub fn is_empty(&self) -> bool {
        self.0.fields.borrow().is_empty()
    }

    /// Check if two handles name the same composite
    #[inline]
    pub fn ptr_eq(&self, other: &Composite) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Whether in-place mutation is allowed while shared
    #[inline]
    pub fn allows_shared_mutation(&self) -> bool {
        self.0.allow_shared_mutation.get()
    }

    /// Allow or forbid in-place mutation while shared (default: forbidden)
    pub fn set_allow_shared_mutation(&self, allow: bool) {
        self.0.allow_shared_mutation.set(allow);
    }

    /// Copy into a fresh composite with ownership count 1
    ///
    /// Fields are copied shallowly: nested composites become shared. The
    /// shared-mutation flag is not carried over.
    pub fn duplicate(&self) -> Composite {
        let fields = self.0.fields.borrow().clone();
        Self::from_parts(self.0.class.clone(), fields)
    }

    /// Mutable access to the fields, checked by the mutation guard
    pub fn fields_mut(&self) -> Result<MutationGuard<'_>, ContractViolation> {
        guard::check_mutation(self.view())?;
        Ok(MutationGuard::new(self.0.fields.borrow_mut()))
    }

    /// Set a field in place, checked by the mutation guard
    pub fn set(&self, key: &str, value: Value) -> Result<(), ContractViolation> {
        self.fields_mut()?.insert(Rc::from(key), value);
        Ok(())
    }

    /// Mutable access to the fields that skips the mutation guard
    ///
    /// Every other holder of this composite observes the change. Only
    /// useful to show what the guard prevents.
    pub fn fields_mut_unguarded(&self) -> RefMut<'_, Fields> {
        self.0.fields.borrow_mut()
    }

    #[inline]
    pub(crate) fn ownership_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }
}

impl fmt::Debug for Composite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{} ", self.class(), self.ownership_count())?;
        match self.0.fields.try_borrow() {
            Ok(fields) => f
                .debug_map()
                .entries(fields.iter().map(|(k, v)| (&**k, v)))
                .finish(),
            Err(_) => write!(f, "{{<borrowed>}}"),
        }
    }
}

/// Borrowed view of a composite
///
/// Handed to native code for transient access. It cannot be turned into a
/// durable reference except through [`crate::vm::lifecycle::wrap`].
#[derive(Clone, Copy)]
pub struct CompositeRef<'a>(&'a Composite);

impl<'a> CompositeRef<'a> {
    /// Class name
    #[inline]
    pub fn class(self) -> &'a str {
        self.0.class()
    }

    /// Read a field
    pub fn get(self, key: &str) -> Option<Value> {
        self.0.get(key)
    }

    /// Borrow all fields
    pub fn fields(self) -> Ref<'a, Fields> {
        self.0.fields()
    }

    /// Check if two views name the same composite
    #[inline]
    pub fn ptr_eq(self, other: CompositeRef<'_>) -> bool {
        self.0.ptr_eq(other.0)
    }

    /// Whether in-place mutation is allowed while shared
    #[inline]
    pub fn allows_shared_mutation(self) -> bool {
        self.0.allows_shared_mutation()
    }

    /// Copy into a fresh composite with ownership count 1
    pub fn duplicate(self) -> Composite {
        self.0.duplicate()
    }

    #[inline]
    pub(crate) fn handle(self) -> &'a Composite {
        self.0
    }
}

impl<'a> From<&'a Composite> for CompositeRef<'a> {
    fn from(composite: &'a Composite) -> Self {
        CompositeRef(composite)
    }
}

impl fmt::Debug for CompositeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "&{:?}", self.0)
    }
}
