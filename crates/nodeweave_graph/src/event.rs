// SPDX-License-Identifier: MIT OR Apache-2.0
//! Notifications sent to the view layer.

use crate::node::NodeId;
use crate::port::PortRef;
use crate::property::PropertyValue;
use std::path::PathBuf;

/// Something observable happened to the graph
#[derive(Debug, Clone, PartialEq)]
pub enum GraphEvent {
    /// A node was added
    NodeCreated(NodeId),
    /// Nodes were removed
    NodesDeleted(Vec<NodeId>),
    /// Two ports were connected
    PortConnected {
        /// Input side
        input: PortRef,
        /// Output side
        output: PortRef,
    },
    /// Two ports were disconnected
    PortDisconnected {
        /// Input side
        input: PortRef,
        /// Output side
        output: PortRef,
    },
    /// A node property changed
    PropertyChanged {
        /// Node
        node: NodeId,
        /// Property name
        name: String,
        /// New value
        value: PropertyValue,
    },
    /// A port was shown or hidden
    PortVisibilityChanged {
        /// Port
        port: PortRef,
        /// Whether it is now visible
        visible: bool,
    },
    /// The selection changed
    SelectionChanged {
        /// Newly selected nodes
        selected: Vec<NodeId>,
        /// Newly deselected nodes
        deselected: Vec<NodeId>,
    },
    /// The session was loaded, saved or cleared
    SessionChanged(Option<PathBuf>),
}

/// Receives graph events once an editing call has finished
pub trait GraphObserver {
    /// Handle one event
    fn on_event(&mut self, event: &GraphEvent);
}

impl<F> GraphObserver for F
where
    F: FnMut(&GraphEvent),
{
    fn on_event(&mut self, event: &GraphEvent) {
        self(event);
    }
}
