//! Reactive Runtime
//!
//! The runtime is the registry that owns every reactive cell and implements
//! the cell operations: get/set with change detection, listener attach and
//! detach, notification fan-out, and derived-cell dependency rebinding.
//!
//! # How Updates Flow
//!
//! 1. Bootstrap code constructs source and derived cells with initial
//!    values computed on the server.
//!
//! 2. Application code mutates a source cell through [`Runtime::set`].
//!
//! 3. If the change-detection policy fires, the cell notifies: its listeners
//!    run synchronously, in attachment order.
//!
//! 4. A derived cell's dependency subscription is one of those listeners; it
//!    recomputes the derived value and feeds it through the same set logic,
//!    so an actual change keeps propagating depth-first while an unchanged
//!    result stops the fan-out.
//!
//! The entire transitive fan-out completes before the triggering `set`
//! returns. There is no scheduler, no batching, and no deferred queue.
//!
//! # Locking
//!
//! Cells live behind `parking_lot` locks, but no lock is ever held while a
//! listener or compute function runs. Listeners may therefore re-enter the
//! runtime freely: read or set any cell, attach or detach listeners,
//! including on the cell currently notifying. A listener that recreates the
//! change it reacts to will recurse without bound; cycle avoidance is the
//! caller's responsibility.
//!
//! # Panics
//!
//! Listener callbacks are expected not to panic. If one does, the panic
//! propagates to the caller of `set`/`notify` and the remaining listeners of
//! that notification do not run.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use smallvec::SmallVec;
use tracing::{debug, trace};

use super::cell::{value_changed, Attachment, CellId, CellState, Listener};
use super::derived::{ComputeFn, DepBinding, DepList, DerivedState};
use crate::value::Value;

/// Errors surfaced by registry operations.
///
/// The core is purely in-memory data manipulation; the only failures are
/// identifier-resolution ones introduced by the registry model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    /// The id does not name a live cell (never existed, or destroyed).
    #[error("unknown cell {0}")]
    UnknownCell(CellId),

    /// A derived-cell operation was applied to a source cell.
    #[error("{0} is not a derived cell")]
    NotDerived(CellId),
}

/// The cell registry.
///
/// Owns all cells by stable [`CellId`]; derived cells refer to their
/// dependencies by id and the runtime resolves ids on each recompute, so no
/// cell ever holds a strong reference to another.
pub struct Runtime {
    cells: RwLock<HashMap<CellId, Arc<CellState>>>,
}

impl Runtime {
    /// Create an empty runtime.
    pub fn new() -> Self {
        Self {
            cells: RwLock::new(HashMap::new()),
        }
    }

    /// Create a source cell with the given initial value.
    pub fn source(&self, initial: Value) -> CellId {
        let id = CellId::next();
        self.cells
            .write()
            .insert(id, Arc::new(CellState::new(initial, None)));
        id
    }

    /// Create a derived cell.
    ///
    /// When `initial` is `None` the compute function runs once to produce
    /// it. The cell then subscribes to every dependency; a dependency that
    /// has already diverged from its initial value triggers one immediate
    /// recompute during construction.
    pub fn derived(
        &self,
        initial: Option<Value>,
        deps: DepList,
        compute: ComputeFn,
    ) -> Result<CellId, RuntimeError> {
        for &dep in deps.iter() {
            self.state(dep)?;
        }

        let initial = match initial {
            Some(value) => value,
            None => compute(self),
        };

        let id = CellId::next();
        let state = Arc::new(CellState::new(
            initial,
            Some(DerivedState::new(deps.clone(), compute)),
        ));
        self.cells.write().insert(id, state);
        self.bind_dependencies(id, &deps)?;

        debug!(cell = id.raw(), deps = deps.len(), "derived cell created");
        Ok(id)
    }

    /// Get the current value of a cell. No side effects.
    pub fn get(&self, id: CellId) -> Result<Value, RuntimeError> {
        let state = self.state(id)?;
        let value = state.value.read().clone();
        Ok(value)
    }

    /// Set a cell's value, notifying listeners when the change-detection
    /// policy fires.
    ///
    /// A value counts as changed when it differs from the stored one, or
    /// unconditionally when it is composite (sequence or mapping), since
    /// composite contents may have been mutated in place. Returns whether a
    /// change occurred.
    pub fn set(&self, id: CellId, value: Value) -> Result<bool, RuntimeError> {
        let state = self.state(id)?;
        Ok(self.apply_set(&state, id, value))
    }

    /// Whether the cell's value has ever diverged from its initial value.
    pub fn changed_from_initial(&self, id: CellId) -> Result<bool, RuntimeError> {
        Ok(self.state(id)?.changed_from_initial())
    }

    /// Register an external listener on a cell.
    ///
    /// The callback runs on every future notification of the cell. When the
    /// cell has already changed from its initial value and
    /// `invoke_if_already_changed` is set, the callback additionally runs
    /// once immediately, so a late subscriber observes current state; that
    /// replay has no notification side effects.
    ///
    /// The returned [`Attachment`] must be retained to detach the listener
    /// later.
    pub fn attach<F>(
        &self,
        id: CellId,
        callback: F,
        invoke_if_already_changed: bool,
    ) -> Result<Attachment, RuntimeError>
    where
        F: Fn(&Runtime) + Send + Sync + 'static,
    {
        let state = self.state(id)?;
        let listener = Listener::External(Arc::new(callback));
        Ok(self.attach_listener(&state, id, listener, invoke_if_already_changed))
    }

    /// Unregister a previously attached listener.
    ///
    /// Safe to call with `None` or with a stale handle; both are no-ops.
    pub fn detach<A>(&self, attachment: A)
    where
        A: Into<Option<Attachment>>,
    {
        let Some(attachment) = attachment.into() else {
            return;
        };
        if let Ok(state) = self.state(attachment.cell) {
            state.attachments.write().remove(attachment.key);
        }
    }

    /// Mark the cell as changed from its initial value and invoke every
    /// currently registered listener, in attachment order.
    pub fn notify(&self, id: CellId) -> Result<(), RuntimeError> {
        let state = self.state(id)?;
        self.notify_state(&state, id);
        Ok(())
    }

    /// Replace a derived cell's dependency set.
    ///
    /// When `deps` is the same allocation as the stored list this is a
    /// no-op: the dependency set is considered stable and rebinding is
    /// skipped even if element contents changed. Callers force rebinding by
    /// passing a freshly allocated list. Otherwise every current binding is
    /// detached first and bindings are rebuilt exactly as in construction.
    ///
    /// Every id in the new list is resolved before any state changes, so a
    /// failed rebind leaves the cell exactly as it was.
    pub fn set_dependencies(
        &self,
        id: CellId,
        deps: DepList,
        compute: ComputeFn,
    ) -> Result<(), RuntimeError> {
        let state = self.state(id)?;

        {
            let derived_guard = state.derived.read();
            let derived = derived_guard
                .as_ref()
                .ok_or(RuntimeError::NotDerived(id))?;
            if Arc::ptr_eq(&derived.deps, &deps) {
                return Ok(());
            }
        }
        for &dep in deps.iter() {
            self.state(dep)?;
        }

        let old_bindings = {
            let mut derived_guard = state.derived.write();
            let derived = derived_guard
                .as_mut()
                .ok_or(RuntimeError::NotDerived(id))?;
            derived.deps = deps.clone();
            derived.compute = compute;
            std::mem::take(&mut derived.bindings)
        };

        debug!(cell = id.raw(), deps = deps.len(), "rebinding dependencies");
        for binding in old_bindings {
            if let Ok(dep_state) = self.state(binding.cell) {
                dep_state.attachments.write().remove(binding.key);
            }
        }

        self.bind_dependencies(id, &deps)
    }

    /// Atomically rewire a derived cell's dependencies and push a new value.
    ///
    /// Rewires first, then computes the value with the stored compute
    /// function if none is supplied, then applies the standard value-set.
    /// Avoids the transient state where old subscriptions linger with a new
    /// value or vice versa. Returns whether the value changed.
    pub fn set_with(
        &self,
        id: CellId,
        value: Option<Value>,
        deps: DepList,
        compute: ComputeFn,
    ) -> Result<bool, RuntimeError> {
        self.set_dependencies(id, deps, compute)?;

        let value = match value {
            Some(value) => value,
            None => {
                let state = self.state(id)?;
                let compute = {
                    let derived = state.derived.read();
                    derived
                        .as_ref()
                        .ok_or(RuntimeError::NotDerived(id))?
                        .compute
                        .clone()
                };
                compute(self)
            }
        };

        self.set(id, value)
    }

    /// Remove a cell from the registry.
    ///
    /// For a derived cell, dependency bindings are detached before local
    /// state is cleared, so no dangling recompute listener can fire against
    /// a destroyed cell. The id is invalid afterwards; further operations
    /// return [`RuntimeError::UnknownCell`].
    pub fn destroy(&self, id: CellId) -> Result<(), RuntimeError> {
        let state = self.state(id)?;

        let bindings: SmallVec<[DepBinding; 4]> = {
            let mut derived_guard = state.derived.write();
            match derived_guard.as_mut() {
                Some(derived) => std::mem::take(&mut derived.bindings),
                None => SmallVec::new(),
            }
        };
        for binding in bindings {
            if let Ok(dep_state) = self.state(binding.cell) {
                dep_state.attachments.write().remove(binding.key);
            }
        }

        self.cells.write().remove(&id);
        state.attachments.write().clear();
        *state.derived.write() = None;

        debug!(cell = id.raw(), "cell destroyed");
        Ok(())
    }

    /// Whether the id names a live cell.
    pub fn contains(&self, id: CellId) -> bool {
        self.cells.read().contains_key(&id)
    }

    /// Number of live cells.
    pub fn cell_count(&self) -> usize {
        self.cells.read().len()
    }

    /// Number of listeners currently attached to a cell.
    pub fn listener_count(&self, id: CellId) -> Result<usize, RuntimeError> {
        Ok(self.state(id)?.attachments.read().len())
    }

    fn state(&self, id: CellId) -> Result<Arc<CellState>, RuntimeError> {
        let cells = self.cells.read();
        cells.get(&id).cloned().ok_or(RuntimeError::UnknownCell(id))
    }

    fn attach_listener(
        &self,
        state: &CellState,
        cell: CellId,
        listener: Listener,
        invoke_if_already_changed: bool,
    ) -> Attachment {
        let key = state.attachments.write().push(listener.clone());
        if invoke_if_already_changed && state.changed_from_initial() {
            self.run_listener(&listener);
        }
        Attachment { cell, key }
    }

    fn bind_dependencies(&self, id: CellId, deps: &DepList) -> Result<(), RuntimeError> {
        let mut bindings: SmallVec<[DepBinding; 4]> = SmallVec::new();
        for &dep in deps.iter() {
            let dep_state = self.state(dep)?;
            let attachment =
                self.attach_listener(&dep_state, dep, Listener::Recompute(id), true);
            bindings.push(DepBinding {
                cell: dep,
                key: attachment.key,
            });
        }

        let state = self.state(id)?;
        let mut derived_guard = state.derived.write();
        let derived = derived_guard
            .as_mut()
            .ok_or(RuntimeError::NotDerived(id))?;
        derived.bindings = bindings;
        Ok(())
    }

    fn apply_set(&self, state: &CellState, id: CellId, incoming: Value) -> bool {
        let changed = {
            let mut value = state.value.write();
            if value_changed(&value, &incoming) {
                *value = incoming;
                true
            } else {
                false
            }
        };

        if changed {
            trace!(cell = id.raw(), "value changed, notifying");
            self.notify_state(state, id);
        }
        changed
    }

    fn notify_state(&self, state: &CellState, id: CellId) {
        state.mark_changed();
        trace!(
            cell = id.raw(),
            listeners = state.attachments.read().len(),
            "notify"
        );

        // Bracket the walk so freed slots are quarantined and every key
        // captured below stays resolvable; the guard releases the
        // quarantine even if a listener panics.
        let (mut cursor, stop) = {
            let mut attachments = state.attachments.write();
            attachments.begin_walk();
            (attachments.head_key(), attachments.tail_key())
        };
        let _walk = WalkGuard { state };

        while let Some(key) = cursor {
            // Capture the next key before the listener runs so the walk
            // tolerates the listener detaching this node or its neighbors.
            let (listener, next) = {
                let attachments = state.attachments.read();
                match attachments.step(key) {
                    Some((listener, next)) => (listener.cloned(), next),
                    // The arena was cleared mid-walk (cell destroyed).
                    None => break,
                }
            };
            if let Some(listener) = &listener {
                self.run_listener(listener);
            }
            // Nodes appended during the walk sit past the captured tail
            // and belong to later notifications.
            if Some(key) == stop {
                break;
            }
            cursor = next;
        }
    }

    fn run_listener(&self, listener: &Listener) {
        match listener {
            Listener::External(callback) => callback(self),
            Listener::Recompute(id) => {
                if let Err(error) = self.recompute(*id) {
                    // The derived cell was destroyed without detaching; the
                    // stale subscription is inert.
                    trace!(cell = id.raw(), %error, "skipping recompute listener");
                }
            }
        }
    }

    fn recompute(&self, id: CellId) -> Result<bool, RuntimeError> {
        let state = self.state(id)?;
        let compute = {
            let derived = state.derived.read();
            derived
                .as_ref()
                .ok_or(RuntimeError::NotDerived(id))?
                .compute
                .clone()
        };

        let value = compute(self);
        Ok(self.apply_set(&state, id, value))
    }
}

/// Ends a notification walk on drop, so the attachment arena's slot
/// quarantine is released even when a listener panics.
struct WalkGuard<'a> {
    state: &'a CellState,
}

impl Drop for WalkGuard<'_> {
    fn drop(&mut self) {
        self.state.attachments.write().end_walk();
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("cell_count", &self.cell_count())
            .finish()
    }
}
