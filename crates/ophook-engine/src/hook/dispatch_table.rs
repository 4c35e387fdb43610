//! Instruction dispatch table
//!
//! Maps an opcode to at most one native operator handler. Tables are
//! populated through a [`DispatchTableBuilder`] during initialization and
//! then frozen into an immutable [`DispatchTable`] shared by every VM.
//!
//! A process-wide table is also available: handlers registered with
//! [`register_global`] are staged until [`freeze_global`] publishes them.
//! Registration after the freeze is rejected.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::{Lazy, OnceCell};
use parking_lot::Mutex;
use tracing::debug;

use super::classifier::OperatorCategory;
use super::error::{DispatchError, HandlerResult};
use super::shim::OperatorCall;
use crate::bytecode::Opcode;

/// Native operator handler
pub type OperatorHandler = Arc<dyn Fn(&mut OperatorCall<'_>) -> HandlerResult + Send + Sync>;

const SLOTS: usize = 256;

fn empty_slots() -> Box<[Option<OperatorHandler>]> {
    vec![None; SLOTS].into_boxed_slice()
}

fn occupied(slots: &[Option<OperatorHandler>]) -> impl Iterator<Item = Opcode> + '_ {
    slots
        .iter()
        .enumerate()
        .filter(|(_, slot)| slot.is_some())
        .filter_map(|(byte, _)| Opcode::from_u8(byte as u8))
}

// ============================================================================
// Builder
// ============================================================================

/// Mutable dispatch table used during initialization
pub struct DispatchTableBuilder {
    slots: Box<[Option<OperatorHandler>]>,
}

impl DispatchTableBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self {
            slots: empty_slots(),
        }
    }

    /// Install, replace or (with `None`) remove the handler for `opcode`
    ///
    /// A replaced handler is discarded without notification.
    pub fn register(
        &mut self,
        opcode: Opcode,
        handler: Option<OperatorHandler>,
    ) -> Result<(), DispatchError> {
        if OperatorCategory::of(opcode).is_none() {
            return Err(DispatchError::NotInterceptable(opcode.name()));
        }
        let slot = &mut self.slots[opcode.to_u8() as usize];
        match (&slot, &handler) {
            (Some(_), Some(_)) => debug!(opcode = opcode.name(), "replacing operator handler"),
            (None, Some(_)) => debug!(opcode = opcode.name(), "registering operator handler"),
            (Some(_), None) => debug!(opcode = opcode.name(), "clearing operator handler"),
            (None, None) => {}
        }
        *slot = handler;
        Ok(())
    }

    /// Install a closure as the handler for `opcode`
    pub fn set<F>(&mut self, opcode: Opcode, handler: F) -> Result<(), DispatchError>
    where
        F: Fn(&mut OperatorCall<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(opcode, Some(Arc::new(handler)))
    }

    /// Remove the handler for `opcode`
    pub fn clear(&mut self, opcode: Opcode) -> Result<(), DispatchError> {
        self.register(opcode, None)
    }

    /// Look up the handler for `opcode`
    #[inline]
    pub fn lookup(&self, opcode: Opcode) -> Option<&OperatorHandler> {
        self.slots[opcode.to_u8() as usize].as_ref()
    }

    /// Number of registered handlers
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Check if no handler is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Finish initialization
    pub fn freeze(self) -> DispatchTable {
        let table = DispatchTable { slots: self.slots };
        debug!(handlers = table.len(), "dispatch table frozen");
        table
    }
}

impl Default for DispatchTableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DispatchTableBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchTableBuilder")
            .field("opcodes", &occupied(&self.slots).collect::<Vec<_>>())
            .finish()
    }
}

// ============================================================================
// Frozen table
// ============================================================================

/// Immutable dispatch table
pub struct DispatchTable {
    slots: Box<[Option<OperatorHandler>]>,
}

impl DispatchTable {
    /// Table with no handlers
    pub fn empty() -> Self {
        Self {
            slots: empty_slots(),
        }
    }

    /// Look up the handler for `opcode`
    #[inline]
    pub fn lookup(&self, opcode: Opcode) -> Option<&OperatorHandler> {
        self.slots[opcode.to_u8() as usize].as_ref()
    }

    /// Check if `opcode` has a handler
    #[inline]
    pub fn contains(&self, opcode: Opcode) -> bool {
        self.lookup(opcode).is_some()
    }

    /// Number of registered handlers
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Check if no handler is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Opcodes with a handler, in byte order
    pub fn opcodes(&self) -> Vec<Opcode> {
        occupied(&self.slots).collect()
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchTable")
            .field("count", &self.len())
            .field("opcodes", &self.opcodes())
            .finish()
    }
}

// ============================================================================
// Process-wide table
// ============================================================================

static STAGING: Lazy<Mutex<Option<DispatchTableBuilder>>> =
    Lazy::new(|| Mutex::new(Some(DispatchTableBuilder::new())));

static GLOBAL: OnceCell<Arc<DispatchTable>> = OnceCell::new();

/// Register a handler in the process-wide table
///
/// Fails with [`DispatchError::Frozen`] once [`freeze_global`] has run.
pub fn register_global(
    opcode: Opcode,
    handler: Option<OperatorHandler>,
) -> Result<(), DispatchError> {
    with_global(|builder| builder.register(opcode, handler))?
}

/// Run `f` against the staged process-wide table
pub fn with_global<R>(f: impl FnOnce(&mut DispatchTableBuilder) -> R) -> Result<R, DispatchError> {
    let mut staging = STAGING.lock();
    match staging.as_mut() {
        Some(builder) => Ok(f(builder)),
        None => Err(DispatchError::Frozen),
    }
}

/// Publish the process-wide table; idempotent
pub fn freeze_global() -> Arc<DispatchTable> {
    GLOBAL
        .get_or_init(|| {
            let builder = STAGING.lock().take().unwrap_or_default();
            Arc::new(builder.freeze())
        })
        .clone()
}

/// The process-wide table, if frozen
pub fn global_table() -> Option<Arc<DispatchTable>> {
    GLOBAL.get().cloned()
}
