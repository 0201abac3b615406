//! Derived-cell bookkeeping.
//!
//! A derived cell is a reactive cell whose value is recomputed from other
//! cells. It stores the identifiers of its dependencies, not references to
//! them; the compute function resolves ids through the
//! [`Runtime`](super::runtime::Runtime) on every run, so there are no
//! closure-captured cell references and no cycles to break by hand.

use std::sync::Arc;

use smallvec::SmallVec;

use super::attachments::AttachKey;
use super::cell::CellId;
use super::runtime::Runtime;
use crate::value::Value;

/// The dependency list of a derived cell.
///
/// Compared by allocation identity (`Arc::ptr_eq`): passing the same list
/// back into a rebind is a no-op even if its contents were rebuilt equal,
/// and callers force rebinding by allocating a fresh list.
pub type DepList = Arc<[CellId]>;

/// Recompute function of a derived cell. Reads dependency values through the
/// runtime and returns the new value; no other visible side effects.
pub type ComputeFn = Arc<dyn Fn(&Runtime) -> Value + Send + Sync>;

/// One live subscription of a derived cell to a dependency.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DepBinding {
    /// The dependency cell.
    pub(crate) cell: CellId,
    /// Handle into the dependency's attachment list.
    pub(crate) key: AttachKey,
}

/// Registry-side state of a derived cell.
pub(crate) struct DerivedState {
    /// Current dependency list; `bindings` holds one entry per element.
    pub(crate) deps: DepList,

    /// Live subscriptions, one per dependency. Most derived cells have only
    /// a handful of dependencies.
    pub(crate) bindings: SmallVec<[DepBinding; 4]>,

    /// The recompute function.
    pub(crate) compute: ComputeFn,
}

impl DerivedState {
    pub(crate) fn new(deps: DepList, compute: ComputeFn) -> Self {
        Self {
            deps,
            bindings: SmallVec::new(),
            compute,
        }
    }
}
