// SPDX-License-Identifier: MIT OR Apache-2.0
//! Stock node types.
//!
//! Small set of nodes used by the command-line tool and the scenario tests:
//! plain pass-through nodes, a node with editable widgets, a node that counts
//! its inputs through [`NodeHooks`], and a node with dynamic ports.

use crate::node::Node;
use crate::port::{PortRef, PortSpec};
use crate::property::{PropertyMeta, WidgetType};
use crate::registry::{NodeHooks, NodeRegistry};

/// Two inputs, two outputs
pub const BASIC_A: &str = "nodeweave.basic.BasicNodeA";
/// One input, one output, a text property
pub const BASIC_B: &str = "nodeweave.basic.BasicNodeB";
/// Widget showcase
pub const WIDGETS: &str = "nodeweave.widgets.WidgetNode";
/// Counts connected inputs
pub const COUNTER: &str = "nodeweave.logic.CounterNode";
/// Ports may be added and removed
pub const DYNAMIC: &str = "nodeweave.dynamic.DynamicPortsNode";

/// Name of the counter property kept up to date by [`InputCounter`]
pub const COUNTER_PROPERTY: &str = "connections";

/// Keeps the `connections` property equal to the number of input peers.
///
/// The count is taken from the ports, so hooks replayed after a load or
/// during undo land on the same value.
#[derive(Debug, Default)]
pub struct InputCounter;

impl InputCounter {
    fn recount(node: &mut Node, input: &str, output: &PortRef, connected: bool) {
        let mut count: usize = node.inputs().map(|p| p.peer_count()).sum();
        let linked = node
            .input(input)
            .is_some_and(|p| p.is_connected_to(&output.node, &output.name));
        match (connected, linked) {
            (true, false) => count += 1,
            (false, true) => count = count.saturating_sub(1),
            _ => {}
        }
        if let Err(e) = node.set_property(COUNTER_PROPERTY, (count as i64).into()) {
            tracing::warn!("{}: {}", node.type_id, e);
        }
    }
}

impl NodeHooks for InputCounter {
    fn on_input_connected(&self, node: &mut Node, input: &str, output: &PortRef) {
        Self::recount(node, input, output, true);
    }

    fn on_input_disconnected(&self, node: &mut Node, input: &str, output: &PortRef) {
        Self::recount(node, input, output, false);
    }
}

fn basic_a() -> Node {
    Node::new(BASIC_A, "node A")
        .with_input("in A")
        .with_input("in B")
        .with_output("out A")
        .with_output("out B")
}

fn basic_b() -> Node {
    Node::new(BASIC_B, "node B")
        .with_input("in")
        .with_output("out")
        .with_property("label", "", PropertyMeta::new(WidgetType::LineEdit))
}

fn widgets() -> Node {
    Node::new(WIDGETS, "widgets")
        .with_input("in")
        .with_output("out")
        .with_property(
            "mode",
            "add",
            PropertyMeta::new(WidgetType::ComboBox)
                .with_items(["add", "multiply", "subtract"])
                .with_tab("Widgets"),
        )
        .with_property(
            "amount",
            0.5,
            PropertyMeta::new(WidgetType::DoubleSlider)
                .with_range(0.0, 1.0)
                .with_tab("Widgets"),
        )
        .with_property(
            "enabled",
            true,
            PropertyMeta::new(WidgetType::CheckBox).with_tooltip("Pass the input through"),
        )
}

fn counter() -> Node {
    Node::new(COUNTER, "counter")
        .with_input(PortSpec::new("in").multi(true))
        .with_output("out")
        .with_property(COUNTER_PROPERTY, 0, PropertyMeta::new(WidgetType::Label))
}

fn dynamic() -> Node {
    Node::new(DYNAMIC, "dynamic")
        .with_port_deletion()
        .with_input("in")
        .with_output("out")
}

/// Register the stock node types; returns how many were added
pub fn register_builtin_nodes(registry: &mut NodeRegistry) -> usize {
    let added = [
        registry.register(BASIC_A, "Basic A", basic_a),
        registry.register(BASIC_B, "Basic B", basic_b),
        registry.register(WIDGETS, "Widgets", widgets),
        registry.register_with_hooks(COUNTER, "Counter", counter, InputCounter),
        registry.register(DYNAMIC, "Dynamic Ports", dynamic),
    ];
    added.into_iter().filter(|&ok| ok).count()
}
