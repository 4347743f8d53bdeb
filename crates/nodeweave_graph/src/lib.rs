// SPDX-License-Identifier: MIT OR Apache-2.0
//! Headless node graph editing core for NodeWeave.
//!
//! This crate holds everything a node editor needs below the view layer:
//! - Nodes with named input/output ports and typed custom properties
//! - A connection engine with locking, accept/reject tables and cycle checks
//! - Undo/redo over reversible commands grouped in macros
//! - JSON sessions, clipboard copy/paste and rank-based auto layout
//!
//! ## Architecture
//!
//! [`NodeGraph`] is the only writer of the [`GraphModel`]. Every intent
//! becomes [`Command`]s pushed on the [`UndoStack`], and the resulting
//! [`GraphEvent`]s reach the registered [`GraphObserver`]s once the call
//! returns. Node types come from a [`NodeRegistry`], private to an editor by
//! default or shared through [`NodeRegistry::global`].
//!
//! ```
//! use nodeweave_graph::{CreateNodeOptions, Node, NodeGraph, PortRef};
//!
//! let mut graph = NodeGraph::new();
//! graph.register_node("demo.Pass", "Pass", || {
//!     Node::new("demo.Pass", "pass").with_input("in").with_output("out")
//! });
//! let a = graph.create_node("demo.Pass", CreateNodeOptions::new()).unwrap();
//! let b = graph.create_node("demo.Pass", CreateNodeOptions::new()).unwrap();
//! assert!(graph.connect(&PortRef::output(&a, "out"), &PortRef::input(&b, "in")).unwrap());
//!
//! graph.undo().unwrap();
//! assert!(graph.model().connections().is_empty());
//! ```

pub mod builtin;
pub mod command;
pub mod connection;
pub mod constraint;
pub mod error;
pub mod event;
pub mod graph;
pub mod layout;
pub mod node;
pub mod node_graph;
pub mod port;
pub mod property;
pub mod registry;
pub mod serialize;
pub mod session;
pub mod undo;

pub use command::{Command, CommandContext};
pub use connection::Connection;
pub use constraint::ConnectionConstraints;
pub use error::{GraphError, Result};
pub use event::{GraphEvent, GraphObserver};
pub use graph::{GraphModel, GraphSettings, PipeStyle};
pub use node::{LayoutDirection, Node, NodeId};
pub use node_graph::{CreateNodeOptions, NodeGraph};
pub use port::{Port, PortDirection, PortRef, PortSpec};
pub use property::{PropertyMeta, PropertyValue, WidgetType};
pub use registry::{NodeHooks, NodeRegistry, SharedRegistry};
pub use serialize::{DeserializeOptions, SessionDocument};
pub use session::ImportReport;
pub use undo::{UndoStack, UndoStats};
