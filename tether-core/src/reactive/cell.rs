//! Reactive Cell State
//!
//! A reactive cell is a mutable value box with change detection and an
//! ordered list of attached listeners. Cells are owned by the
//! [`Runtime`](super::runtime::Runtime) registry and referred to by stable
//! [`CellId`]s; nothing in a cell holds a strong reference to another cell,
//! which keeps the dependency graph free of ownership cycles.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::attachments::{AttachKey, AttachmentList};
use super::derived::DerivedState;
use super::runtime::Runtime;
use crate::value::Value;

/// Stable identifier for a reactive cell.
///
/// Minted from an atomic counter; unique for the lifetime of the process.
/// Bootstrap code emitted by the server layer refers to cells by these ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellId(u64);

impl CellId {
    /// Mint a new unique cell id.
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw id value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl From<u64> for CellId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell_{}", self.0)
    }
}

/// Handle to one listener registration on one cell.
///
/// Returned by attach operations; the caller must retain it to detach the
/// listener later (for example when the bound DOM node is removed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attachment {
    pub(crate) cell: CellId,
    pub(crate) key: AttachKey,
}

impl Attachment {
    /// The cell this listener is attached to.
    pub fn cell(&self) -> CellId {
        self.cell
    }
}

/// A listener registered on a cell.
///
/// Derived cells subscribe to their dependencies as `Recompute` entries
/// naming the derived cell; the registry resolves the id when the listener
/// fires. External collaborators (the DOM-binding layer) register boxed
/// callbacks.
#[derive(Clone)]
pub(crate) enum Listener {
    /// Recompute the named derived cell.
    Recompute(CellId),
    /// Invoke an externally supplied callback.
    External(Arc<dyn Fn(&Runtime) + Send + Sync>),
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Listener::Recompute(id) => f.debug_tuple("Recompute").field(id).finish(),
            Listener::External(_) => f.write_str("External(..)"),
        }
    }
}

/// Registry-owned state of one reactive cell.
pub(crate) struct CellState {
    /// The current value.
    pub(crate) value: RwLock<Value>,

    /// Becomes true on the first successful change (or explicit notify) and
    /// never resets.
    changed_from_initial: AtomicBool,

    /// Attached listeners, in attachment order.
    pub(crate) attachments: RwLock<AttachmentList<Listener>>,

    /// Present for derived cells only.
    pub(crate) derived: RwLock<Option<DerivedState>>,
}

impl CellState {
    pub(crate) fn new(initial: Value, derived: Option<DerivedState>) -> Self {
        Self {
            value: RwLock::new(initial),
            changed_from_initial: AtomicBool::new(false),
            attachments: RwLock::new(AttachmentList::new()),
            derived: RwLock::new(derived),
        }
    }

    pub(crate) fn changed_from_initial(&self) -> bool {
        self.changed_from_initial.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_changed(&self) {
        self.changed_from_initial.store(true, Ordering::SeqCst);
    }
}

/// The change-detection policy for cell sets.
///
/// An incoming value counts as changed when it differs from the current one,
/// or unconditionally when it is composite: a sequence or mapping may have
/// been mutated in place, so equality with the stored value proves nothing.
/// Re-notifying on an unchanged composite is acceptable; missing a mutation
/// is not.
pub(crate) fn value_changed(current: &Value, incoming: &Value) -> bool {
    incoming.is_composite() || incoming != current
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    #[test]
    fn cell_ids_are_unique() {
        let a = CellId::next();
        let b = CellId::next();
        let c = CellId::next();

        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);
    }

    #[test]
    fn equal_scalars_do_not_count_as_changed() {
        assert!(!value_changed(&Value::Int(1), &Value::Int(1)));
        assert!(!value_changed(&Value::Null, &Value::Null));
        assert!(!value_changed(
            &Value::Str("x".into()),
            &Value::Str("x".into())
        ));
    }

    #[test]
    fn differing_scalars_count_as_changed() {
        assert!(value_changed(&Value::Int(1), &Value::Int(2)));
        assert!(value_changed(&Value::Int(1), &Value::Null));
        assert!(value_changed(&Value::Bool(true), &Value::Bool(false)));
    }

    #[test]
    fn composites_always_count_as_changed() {
        let seq = Value::Seq(vec![Value::Int(1)]);
        assert!(value_changed(&seq.clone(), &seq));

        let map = Value::Map(IndexMap::new());
        assert!(value_changed(&map.clone(), &map));
    }

    #[test]
    fn changed_from_initial_is_monotonic() {
        let state = CellState::new(Value::Int(0), None);
        assert!(!state.changed_from_initial());

        state.mark_changed();
        assert!(state.changed_from_initial());

        // There is no reset path; marking again keeps it true.
        state.mark_changed();
        assert!(state.changed_from_initial());
    }
}
