// SPDX-License-Identifier: MIT OR Apache-2.0
//! Headless calculator: builds a small graph, edits a source value, and
//! round-trips the result through JSON.

use patchbay_graph::delegates::calculator::{
    create_calculator_registry, MathOperation, NumberDisplay, NumberSource,
};
use patchbay_graph::{ConnectionId, DataFlowGraphModel, GraphModel, NodeId};
use std::rc::Rc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn main() {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("patchbay_graph=debug".parse().expect("valid directive"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let registry = Rc::new(create_calculator_registry());
    let mut model = DataFlowGraphModel::new(registry);

    let a = must_add(&mut model, "NumberSource");
    let b = must_add(&mut model, "NumberSource");
    let sum = must_add(&mut model, "Addition");
    let display = must_add(&mut model, "NumberDisplay");

    for connection_id in [
        ConnectionId::new(a, 0, sum, 0),
        ConnectionId::new(b, 0, sum, 1),
        ConnectionId::new(sum, 0, display, 0),
    ] {
        assert!(model.connection_possible(connection_id));
        model.add_connection(connection_id);
    }

    set_source(&mut model, a, 5.0);
    set_source(&mut model, b, 2.5);
    tracing::info!(
        result = model.delegate_as::<MathOperation>(sum).and_then(MathOperation::result),
        "computed 5.0 + 2.5"
    );

    let document = model.save();
    let mut restored = DataFlowGraphModel::new(model.registry().clone());
    restored
        .load(&document)
        .expect("a saved graph always restores");
    let shown = restored
        .delegate_as::<NumberDisplay>(display)
        .and_then(NumberDisplay::number);
    tracing::info!(shown, "display value after JSON round-trip");
}

fn must_add(model: &mut DataFlowGraphModel, node_type: &str) -> NodeId {
    model
        .add_node(node_type)
        .expect("calculator registry knows this type")
}

fn set_source(model: &mut DataFlowGraphModel, node_id: NodeId, value: f64) {
    model.update_delegate(node_id, |delegate, updates| {
        delegate
            .as_any_mut()
            .downcast_mut::<NumberSource>()
            .expect("node is a number source")
            .set_number(value, updates);
    });
}
