//! Reactive Primitives
//!
//! This module implements the core reactive system: cells, listener
//! attachments, and derived-value propagation.
//!
//! # Concepts
//!
//! ## Cells
//!
//! A reactive cell is a mutable value box. Source cells hold independent
//! state; derived cells recompute their value from other cells. Cells are
//! owned by the [`Runtime`] registry and named by stable [`CellId`]s, which
//! is how server-generated bootstrap code refers to them.
//!
//! ## Attachments
//!
//! Listeners attach to a cell in an ordered list and fire synchronously, in
//! attachment order, whenever the cell notifies. The [`Attachment`] handle
//! returned by [`Runtime::attach`] detaches the listener again. A derived
//! cell's dependency subscriptions are ordinary entries in the same lists.
//!
//! ## Propagation
//!
//! Setting a cell runs change detection; an actual change notifies the
//! cell's listeners, derived dependents recompute, and the fan-out repeats
//! depth-first until values stop changing. Everything is eager and
//! synchronous; there is no tracking context and no scheduler. Dependency
//! lists are declared explicitly at construction and replaced wholesale via
//! [`Runtime::set_dependencies`].

mod attachments;
mod cell;
mod derived;
mod runtime;

pub use attachments::{AttachKey, AttachmentList};
pub use cell::{Attachment, CellId};
pub use derived::{ComputeFn, DepList};
pub use runtime::{Runtime, RuntimeError};
