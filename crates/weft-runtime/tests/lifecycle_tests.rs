//! Lifecycle propagation across a shared containment graph.

use std::sync::Arc;
use weft_component::{LifecycleState, Transition};
use weft_controller::testing::{CallLog, MockController};
use weft_runtime::{Engine, EngineError};
use weft_types::ComponentId;

// =============================================================================
// Test Fixtures
// =============================================================================

/// A component whose membrane records into `log` under `name`.
fn traced(engine: &Engine, log: &CallLog, name: &str) -> ComponentId {
    let id = engine.create_component(name);
    engine
        .attach_controller(id, Arc::new(MockController::new(name).with_log(log)))
        .unwrap();
    id
}

fn position(log: &CallLog, entry: &str) -> usize {
    log.entries()
        .iter()
        .position(|e| e == entry)
        .unwrap_or_else(|| panic!("missing log entry {entry}"))
}

// =============================================================================
// Ordering
// =============================================================================

#[test]
fn children_configured_before_parent_starts() {
    let engine = Engine::new();
    let log = CallLog::new();
    let parent = traced(&engine, &log, "parent");
    let left = traced(&engine, &log, "left");
    let right = traced(&engine, &log, "right");
    engine.attach(parent, left).unwrap();
    engine.attach(parent, right).unwrap();

    engine.start(parent).unwrap();

    let parent_started = position(&log, "parent:after:start:committed");
    assert!(position(&log, "left:after:configure:committed") < parent_started);
    assert!(position(&log, "right:after:configure:committed") < parent_started);
    assert!(parent_started < position(&log, "left:after:start:committed"));
    assert!(position(&log, "left:after:start:committed") < position(&log, "right:after:start:committed"));

    for id in [parent, left, right] {
        assert_eq!(engine.state(id).unwrap(), LifecycleState::Started);
    }
}

#[test]
fn stop_runs_children_first_in_reverse() {
    let engine = Engine::new();
    let log = CallLog::new();
    let parent = traced(&engine, &log, "parent");
    let first = traced(&engine, &log, "first");
    let second = traced(&engine, &log, "second");
    engine.attach(parent, first).unwrap();
    engine.attach(parent, second).unwrap();
    engine.start(parent).unwrap();
    log.clear();

    engine.stop(parent).unwrap();
    let stops = log.matching(":after:stop:committed");
    assert_eq!(
        stops,
        vec![
            "second:after:stop:committed",
            "first:after:stop:committed",
            "parent:after:stop:committed",
        ]
    );
}

// =============================================================================
// Shared children
// =============================================================================

#[test]
fn shared_child_survives_one_parent_stopping() {
    let engine = Engine::new();
    let a = engine.create_component("a");
    let b = engine.create_component("b");
    let shared = engine.create_component("shared");
    engine.attach(a, shared).unwrap();
    engine.attach(b, shared).unwrap();
    engine.start(a).unwrap();
    engine.start(b).unwrap();

    engine.stop(a).unwrap();
    assert_eq!(engine.state(shared).unwrap(), LifecycleState::Started);

    engine.stop(b).unwrap();
    assert_eq!(engine.state(shared).unwrap(), LifecycleState::Stopped);
}

#[test]
fn restart_after_stop() {
    let engine = Engine::new();
    let parent = engine.create_component("parent");
    let child = engine.create_component("child");
    engine.attach(parent, child).unwrap();
    engine.start(parent).unwrap();
    engine.stop(parent).unwrap();

    engine.start(parent).unwrap();
    assert_eq!(engine.state(child).unwrap(), LifecycleState::Started);
}

// =============================================================================
// Vetoes
// =============================================================================

#[test]
fn vetoed_stop_keeps_component_started() {
    let engine = Engine::new();
    let busy = engine.create_component("busy");
    engine
        .attach_controller(busy, Arc::new(MockController::new("guard").vetoing(Transition::Stop, "busy")))
        .unwrap();
    engine.start(busy).unwrap();

    let err = engine.stop(busy).unwrap_err();
    match err {
        EngineError::TransitionRejected { transition, reason, .. } => {
            assert_eq!(transition, Transition::Stop);
            assert!(reason.contains("busy"));
        }
        other => panic!("unexpected {other}"),
    }
    assert_eq!(engine.state(busy).unwrap(), LifecycleState::Started);
}

#[test]
fn destroyed_component_is_gone() {
    let engine = Engine::new();
    let parent = engine.create_component("parent");
    let child = engine.create_component("child");
    engine.attach(parent, child).unwrap();
    engine.start(parent).unwrap();

    engine.destroy(child).unwrap();
    assert!(!engine.contains(child));
    assert!(engine.children(parent).unwrap().is_empty());
    assert!(matches!(engine.start(child), Err(EngineError::NotFound(_))));
}
