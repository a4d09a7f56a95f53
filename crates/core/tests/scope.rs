//! Scope condition tests: capture, nesting, rendering, and thread isolation.

use std::sync::{Arc, Barrier};
use std::thread;

use lineage_core::{scope, Entity};

#[test]
fn test_nested_scope_expression() {
    let ready = Entity::leaf("ready", true).unwrap();
    let steady = Entity::leaf("steady", true).unwrap();

    let name = {
        let _ready = scope::enter(&ready);
        let _steady = scope::enter(&steady);
        Entity::leaf("Name", 1).unwrap()
    };

    assert_eq!(name.dependency_expression(), "Name (when ready & steady)");
    let deps: Vec<String> = name.dependency_names().into_iter().collect();
    assert_eq!(deps, vec!["Name", "ready", "steady"]);
    assert_eq!(scope::depth(), 0);
}

#[test]
fn test_condition_dependencies_flow_into_derived() {
    let threshold = Entity::leaf("threshold", 10).unwrap();
    let reading = Entity::leaf("reading", 12).unwrap();
    let alarm = reading.greater_than(&threshold).unwrap();

    let dose = scope::with_condition(&alarm, || Entity::leaf("dose", 5).unwrap());
    let base = Entity::leaf("base", 1).unwrap();
    let total = dose.plus(&base).unwrap();

    assert_eq!(
        total.dependency_expression(),
        "dose (when reading > threshold) + base"
    );
    let deps: Vec<String> = total.dependency_names().into_iter().collect();
    assert_eq!(deps, vec!["base", "dose", "reading", "threshold"]);

    let graph = total.build_graph().unwrap();
    let dose_node = &graph.children[0];
    assert_eq!(dose_node.children.len(), 1);
    assert_eq!(dose_node.children[0].name, "reading > threshold");
    assert_eq!(dose_node.children[0].value.downcast_ref::<bool>(), Some(&true));
}

#[test]
fn test_scopes_are_thread_local() {
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = ["left", "right"]
        .into_iter()
        .map(|label| {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let condition = Entity::leaf(format!("{label}_ready"), true).unwrap();
                let _guard = scope::enter(&condition);
                // Both threads hold a scope at the same time.
                barrier.wait();
                assert_eq!(scope::depth(), 1);
                let leaf = Entity::leaf(label, 0).unwrap();
                let names: Vec<String> = leaf
                    .conditions()
                    .iter()
                    .map(|c| c.name().to_string())
                    .collect();
                names
            })
        })
        .collect();

    let captured: Vec<Vec<String>> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();
    assert_eq!(captured[0], vec!["left_ready"]);
    assert_eq!(captured[1], vec!["right_ready"]);
    assert_eq!(scope::depth(), 0);
}

#[test]
fn test_entities_cross_threads() {
    let a = Entity::leaf("A", 1_i64).unwrap();
    let b = Entity::leaf("B", 2_i64).unwrap();
    let sum = a.plus(&b).unwrap();

    let writer = {
        let a = a.clone();
        thread::spawn(move || a.reset(40).unwrap())
    };
    writer.join().unwrap();

    let reader = thread::spawn(move || sum.resolve().unwrap());
    assert_eq!(reader.join().unwrap(), 42);
}
