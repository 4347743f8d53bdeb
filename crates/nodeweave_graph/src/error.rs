// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error type shared by every graph operation.

use crate::node::NodeId;
use crate::port::PortDirection;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the graph model, the connection engine and the undo engine.
///
/// Constraint-table filtering and cycle avoidance are deliberately absent:
/// those outcomes are silent no-ops and callers inspect the resulting
/// connection state instead.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A connection change was attempted on a locked port
    #[error("port '{port}' on node {node} is locked")]
    LockedPort {
        /// Owning node
        node: NodeId,
        /// Port name
        port: String,
    },

    /// Port lookup against a node that does not own the port
    #[error("node {node} has no {direction} port '{port}'")]
    PortNotFound {
        /// Node that was searched
        node: NodeId,
        /// Direction searched
        direction: PortDirection,
        /// Requested port name
        port: String,
    },

    /// Node not found in the graph
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// No constructor is registered for the type identifier
    #[error("unknown node type: {0}")]
    UnknownNodeType(String),

    /// A node id is already present in the graph
    #[error("node {0} already exists")]
    DuplicateNode(NodeId),

    /// A property or port name is already taken
    #[error("'{0}' is already registered")]
    DuplicateProperty(String),

    /// Get/set on an undeclared property
    #[error("no property '{0}'")]
    UnknownProperty(String),

    /// A built-in property received a value of the wrong shape
    #[error("invalid value for property '{0}'")]
    InvalidPropertyValue(String),

    /// The property cannot be changed after creation
    #[error("property '{0}' is read-only")]
    ReadOnlyProperty(String),

    /// The two ports cannot be wired together
    #[error("cannot connect two {0} ports")]
    IncompatiblePorts(PortDirection),

    /// Port add/remove on a node that does not allow it
    #[error("ports can't be changed on node {0} because port deletion is not allowed")]
    PortDeletionNotAllowed(NodeId),

    /// Undo requested with an empty history
    #[error("nothing to undo")]
    NothingToUndo,

    /// Redo requested with nothing undone
    #[error("nothing to redo")]
    NothingToRedo,

    /// `end` called without a matching `begin`
    #[error("no undo macro is open")]
    NoOpenMacro,

    /// Undo/redo requested while a macro is still being recorded
    #[error("undo macro '{0}' is still open")]
    MacroInProgress(String),

    /// Rank relaxation did not settle, the node set contains a cycle
    #[error("graph contains a cycle")]
    CycleDetected,

    /// A session file could not be read or written
    #[error("session file {path:?}: {source}")]
    SessionIo {
        /// File path
        path: PathBuf,
        /// Underlying IO failure
        #[source]
        source: std::io::Error,
    },

    /// A session document could not be parsed
    #[error("malformed session document: {0}")]
    SessionCorrupt(#[from] serde_json::Error),
}

/// Result type for graph operations
pub type Result<T> = std::result::Result<T, GraphError>;
