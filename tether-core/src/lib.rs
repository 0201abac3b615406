//! Tether Core
//!
//! This crate provides the client-side core of the Tether reactive
//! framework: server-rendered pages stay reactive in the browser through a
//! small runtime of value cells. It implements:
//!
//! - Reactive cells with explicit dependency lists and eager, synchronous
//!   propagation
//! - Ordered listener attachments with O(1) attach/detach
//! - A tagged dynamic value type with a canonical literal serializer shared
//!   with the server-side generator
//!
//! # Architecture
//!
//! The crate is organized into two modules:
//!
//! - `reactive`: the cell registry, attachments, and propagation
//! - `value`: the dynamic value type, literal serialization, and string
//!   helpers
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tether_core::reactive::Runtime;
//! use tether_core::value::Value;
//!
//! let runtime = Runtime::new();
//!
//! // A source cell and a derived cell computed from it.
//! let count = runtime.source(Value::Int(1));
//! let doubled = runtime
//!     .derived(
//!         None,
//!         Arc::from(vec![count].into_boxed_slice()),
//!         Arc::new(move |rt: &Runtime| match rt.get(count) {
//!             Ok(Value::Int(n)) => Value::Int(n * 2),
//!             _ => Value::Null,
//!         }),
//!     )
//!     .unwrap();
//!
//! runtime.set(count, Value::Int(5)).unwrap();
//! assert_eq!(runtime.get(doubled).unwrap(), Value::Int(10));
//! ```

pub mod reactive;
pub mod value;
