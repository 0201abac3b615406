//! Integration Tests for the Reactive Runtime
//!
//! These tests verify that cells, attachments, derived propagation, and the
//! value layer work together correctly, the way server-generated bootstrap
//! code drives them.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;
use tether_core::reactive::{CellId, DepList, Runtime};
use tether_core::value::{to_literal, Value};

fn deps(ids: &[CellId]) -> DepList {
    Arc::from(ids.to_vec().into_boxed_slice())
}

fn int(runtime: &Runtime, id: CellId) -> i64 {
    match runtime.get(id).expect("live cell") {
        Value::Int(n) => n,
        other => panic!("expected int, got {other:?}"),
    }
}

/// Test the bootstrap flow: server-computed JSON values become cells, and a
/// DOM-binding listener renders the derived value through the canonical
/// literal serializer.
#[test]
fn bootstrap_json_to_cells_to_literal() {
    let runtime = Runtime::new();

    let user = runtime.source(Value::from(json!({"name": "ada", "admin": false})));
    let items = runtime.source(Value::from(json!([1, "t", null])));

    let summary = runtime
        .derived(
            None,
            deps(&[user, items]),
            Arc::new(move |rt: &Runtime| {
                let mut entries = indexmap::IndexMap::new();
                if let Ok(Value::Map(map)) = rt.get(user) {
                    if let Some(name) = map.get("name") {
                        entries.insert("who".to_owned(), name.clone());
                    }
                }
                if let Ok(Value::Seq(seq)) = rt.get(items) {
                    entries.insert("count".to_owned(), Value::Int(seq.len() as i64));
                }
                Value::Map(entries)
            }),
        )
        .expect("derived");

    assert_eq!(
        to_literal(&runtime.get(summary).expect("live cell")),
        "{'who': 'ada', 'count': 3}"
    );

    // A rendering listener sees every change, serialized canonically.
    let rendered = Arc::new(Mutex::new(Vec::new()));
    let rendered_in = rendered.clone();
    runtime
        .attach(
            summary,
            move |rt| {
                let value = rt.get(summary).expect("live cell");
                rendered_in.lock().push(to_literal(&value));
            },
            false,
        )
        .expect("attach");

    runtime
        .set(items, Value::from(json!([1, "t", null, 4])))
        .expect("set");
    assert_eq!(*rendered.lock(), vec!["{'who': 'ada', 'count': 4}"]);
}

/// Test a three-level dependency chain driven through a single set call.
#[test]
fn chain_propagates_within_one_set() {
    let runtime = Runtime::new();
    let base = runtime.source(Value::Int(2));

    let doubled = runtime
        .derived(
            None,
            deps(&[base]),
            Arc::new(move |rt: &Runtime| Value::Int(int(rt, base) * 2)),
        )
        .expect("derived doubled");
    let plus_ten = runtime
        .derived(
            None,
            deps(&[doubled]),
            Arc::new(move |rt: &Runtime| Value::Int(int(rt, doubled) + 10)),
        )
        .expect("derived plus_ten");

    assert_eq!(int(&runtime, doubled), 4);
    assert_eq!(int(&runtime, plus_ten), 14);

    let observed = Arc::new(AtomicI32::new(-1));
    let observed_in = observed.clone();
    runtime
        .attach(
            plus_ten,
            move |rt| {
                observed_in.store(int(rt, plus_ten) as i32, Ordering::SeqCst);
            },
            false,
        )
        .expect("attach");

    runtime.set(base, Value::Int(10)).expect("set");
    assert_eq!(int(&runtime, doubled), 20);
    assert_eq!(int(&runtime, plus_ten), 30);
    assert_eq!(observed.load(Ordering::SeqCst), 30);
}

/// Test that an unchanged intermediate value cuts propagation short.
#[test]
fn unchanged_intermediate_stops_fan_out() {
    let runtime = Runtime::new();
    let base = runtime.source(Value::Int(7));

    // Parity collapses many inputs to the same output.
    let parity = runtime
        .derived(
            None,
            deps(&[base]),
            Arc::new(move |rt: &Runtime| Value::Int(int(rt, base) % 2)),
        )
        .expect("derived parity");

    let downstream_computes = Arc::new(AtomicI32::new(0));
    let downstream_in = downstream_computes.clone();
    let label = runtime
        .derived(
            None,
            deps(&[parity]),
            Arc::new(move |rt: &Runtime| {
                downstream_in.fetch_add(1, Ordering::SeqCst);
                Value::Str(if int(rt, parity) == 0 { "even" } else { "odd" }.into())
            }),
        )
        .expect("derived label");

    assert_eq!(runtime.get(label), Ok(Value::Str("odd".into())));
    assert_eq!(downstream_computes.load(Ordering::SeqCst), 1);

    // 7 -> 9: parity stays 1, so the label never recomputes.
    runtime.set(base, Value::Int(9)).expect("set");
    assert_eq!(downstream_computes.load(Ordering::SeqCst), 1);

    // 9 -> 4: parity flips, label recomputes.
    runtime.set(base, Value::Int(4)).expect("set");
    assert_eq!(downstream_computes.load(Ordering::SeqCst), 2);
    assert_eq!(runtime.get(label), Ok(Value::Str("even".into())));
}

/// Test rewiring a derived cell to a different input, as happens when a
/// conditional template switches branches.
#[test]
fn branch_switch_rewires_dependencies() {
    let runtime = Runtime::new();
    let left = runtime.source(Value::Int(1));
    let right = runtime.source(Value::Int(100));

    let shown = runtime
        .derived(
            None,
            deps(&[left]),
            Arc::new(move |rt: &Runtime| Value::Int(int(rt, left))),
        )
        .expect("derived");
    assert_eq!(int(&runtime, shown), 1);

    runtime
        .set_with(
            shown,
            None,
            deps(&[right]),
            Arc::new(move |rt: &Runtime| Value::Int(int(rt, right))),
        )
        .expect("rewire");
    assert_eq!(int(&runtime, shown), 100);

    // The abandoned branch no longer drives the cell.
    runtime.set(left, Value::Int(2)).expect("set");
    assert_eq!(int(&runtime, shown), 100);

    runtime.set(right, Value::Int(200)).expect("set");
    assert_eq!(int(&runtime, shown), 200);
}

/// Test teardown: destroying a derived cell detaches its subscriptions and
/// leaves the rest of the graph working.
#[test]
fn destroyed_cell_leaves_graph_consistent() {
    let runtime = Runtime::new();
    let base = runtime.source(Value::Int(1));

    let kept = runtime
        .derived(
            None,
            deps(&[base]),
            Arc::new(move |rt: &Runtime| Value::Int(int(rt, base) + 1)),
        )
        .expect("derived kept");
    let dropped = runtime
        .derived(
            None,
            deps(&[base]),
            Arc::new(move |rt: &Runtime| Value::Int(int(rt, base) + 2)),
        )
        .expect("derived dropped");
    assert_eq!(runtime.listener_count(base), Ok(2));

    runtime.destroy(dropped).expect("destroy");
    assert!(!runtime.contains(dropped));
    assert_eq!(runtime.listener_count(base), Ok(1));

    runtime.set(base, Value::Int(5)).expect("set");
    assert_eq!(int(&runtime, kept), 6);
}

/// Test that a late-attaching renderer catches up on already-changed state
/// exactly once, then follows normal notifications.
#[test]
fn late_renderer_catches_up_then_tracks() {
    let runtime = Runtime::new();
    let cell = runtime.source(Value::Str("initial".into()));
    runtime.set(cell, Value::Str("updated".into())).expect("set");

    let rendered = Arc::new(Mutex::new(Vec::new()));
    let rendered_in = rendered.clone();
    runtime
        .attach(
            cell,
            move |rt| {
                let value = rt.get(cell).expect("live cell");
                rendered_in.lock().push(to_literal(&value));
            },
            true,
        )
        .expect("attach");
    assert_eq!(*rendered.lock(), vec!["'updated'"]);

    runtime.set(cell, Value::Str("again".into())).expect("set");
    assert_eq!(*rendered.lock(), vec!["'updated'", "'again'"]);
}
