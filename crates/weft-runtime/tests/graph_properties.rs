//! Property tests for the containment graph.

use proptest::prelude::*;
use weft_runtime::{Engine, EngineError};
use weft_types::ComponentId;

const NODES: usize = 7;

#[derive(Debug, Clone)]
enum Op {
    Attach(usize, usize),
    Detach(usize, usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..NODES, 0..NODES).prop_map(|(p, c)| Op::Attach(p, c)),
        1 => (0..NODES, 0..NODES).prop_map(|(p, c)| Op::Detach(p, c)),
    ]
}

fn assert_acyclic(engine: &Engine, nodes: &[ComponentId]) {
    for &n in nodes {
        for child in engine.children(n).unwrap() {
            assert!(!engine.is_reachable(child, n));
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn attach_never_creates_a_cycle(ops in prop::collection::vec(op(), 1..40)) {
        let engine = Engine::new();
        let nodes: Vec<ComponentId> =
            (0..NODES).map(|i| engine.create_component(&format!("n{i}"))).collect();

        for op in ops {
            match op {
                Op::Attach(p, c) => {
                    let (parent, child) = (nodes[p], nodes[c]);
                    let would_loop = parent == child || engine.is_reachable(child, parent);
                    let result = engine.attach(parent, child);
                    if would_loop {
                        let rejected = matches!(result, Err(EngineError::CycleDetected { .. }));
                        prop_assert!(rejected);
                    } else {
                        prop_assert!(result.is_ok());
                        prop_assert!(engine.children(parent).unwrap().contains(&child));
                    }
                }
                Op::Detach(p, c) => {
                    engine.detach(nodes[p], nodes[c]).unwrap();
                    prop_assert!(!engine.children(nodes[p]).unwrap().contains(&nodes[c]));
                }
            }
            assert_acyclic(&engine, &nodes);
        }
    }

    #[test]
    fn edges_are_mirrored(ops in prop::collection::vec(op(), 1..40)) {
        let engine = Engine::new();
        let nodes: Vec<ComponentId> =
            (0..NODES).map(|i| engine.create_component(&format!("n{i}"))).collect();

        for op in ops {
            match op {
                Op::Attach(p, c) => { let _ = engine.attach(nodes[p], nodes[c]); }
                Op::Detach(p, c) => { let _ = engine.detach(nodes[p], nodes[c]); }
            }
        }

        for &n in &nodes {
            for child in engine.children(n).unwrap() {
                prop_assert!(engine.parents(child).unwrap().contains(&n));
            }
            for parent in engine.parents(n).unwrap() {
                prop_assert!(engine.children(parent).unwrap().contains(&n));
            }
        }
    }
}
