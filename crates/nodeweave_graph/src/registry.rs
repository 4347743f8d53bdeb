// SPDX-License-Identifier: MIT OR Apache-2.0
//! Registry of available node types.
//!
//! Maps a type identifier (`<domain>.<ClassName>`) to the constructor that
//! builds a fresh node, plus optional [`NodeHooks`] run when inputs of that
//! type gain or lose a peer.

use crate::node::{Node, NodeId};
use crate::port::PortRef;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::fmt;
use std::sync::{Arc, LazyLock};

/// Builds a node with its ports and custom properties declared
pub type NodeConstructor = Arc<dyn Fn() -> Node + Send + Sync>;

/// Registry shared between editors
pub type SharedRegistry = Arc<RwLock<NodeRegistry>>;

/// Per-type callbacks for connection changes on input ports.
///
/// Hooks run inside the undo engine: undoing a connection runs
/// `on_input_disconnected`, redoing it runs `on_input_connected` again.
pub trait NodeHooks: Send + Sync {
    /// `input` on `node` gained the peer `output`
    fn on_input_connected(&self, node: &mut Node, input: &str, output: &PortRef) {
        let _ = (node, input, output);
    }

    /// `input` on `node` lost the peer `output`
    fn on_input_disconnected(&self, node: &mut Node, input: &str, output: &PortRef) {
        let _ = (node, input, output);
    }
}

struct Registration {
    name: String,
    constructor: NodeConstructor,
    hooks: Option<Arc<dyn NodeHooks>>,
}

/// Registry of available node types
#[derive(Default)]
pub struct NodeRegistry {
    /// Registered node types by ID
    types: IndexMap<String, Registration>,
    /// Display name -> type identifiers registered under it
    names: IndexMap<String, Vec<String>>,
}

static GLOBAL: LazyLock<SharedRegistry> = LazyLock::new(|| Arc::new(RwLock::new(NodeRegistry::new())));

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry ready to be shared
    pub fn shared() -> SharedRegistry {
        Arc::new(RwLock::new(Self::new()))
    }

    /// The process-wide registry
    pub fn global() -> SharedRegistry {
        Arc::clone(&GLOBAL)
    }

    /// Register a node type.
    ///
    /// Returns `false` and keeps the original constructor if `type_id` is
    /// already registered.
    pub fn register<F>(&mut self, type_id: &str, name: &str, constructor: F) -> bool
    where
        F: Fn() -> Node + Send + Sync + 'static,
    {
        self.insert(type_id, name, Arc::new(constructor), None)
    }

    /// Register a node type with connection hooks
    pub fn register_with_hooks<F, H>(&mut self, type_id: &str, name: &str, constructor: F, hooks: H) -> bool
    where
        F: Fn() -> Node + Send + Sync + 'static,
        H: NodeHooks + 'static,
    {
        self.insert(type_id, name, Arc::new(constructor), Some(Arc::new(hooks)))
    }

    fn insert(
        &mut self,
        type_id: &str,
        name: &str,
        constructor: NodeConstructor,
        hooks: Option<Arc<dyn NodeHooks>>,
    ) -> bool {
        if let Some(existing) = self.types.get(type_id) {
            tracing::warn!(
                "node type '{}' already registered as '{}', keeping the original",
                type_id,
                existing.name
            );
            return false;
        }
        self.types.insert(
            type_id.to_string(),
            Registration {
                name: name.to_string(),
                constructor,
                hooks,
            },
        );
        let aliases = self.names.entry(name.to_string()).or_default();
        if !aliases.iter().any(|t| t == type_id) {
            aliases.push(type_id.to_string());
        }
        tracing::debug!("registered node type '{}' ({})", type_id, name);
        true
    }

    /// Build a node of `type_id` with a fresh id
    pub fn create(&self, type_id: &str) -> Option<Node> {
        let registration = self.types.get(type_id)?;
        let mut node = (registration.constructor)();
        node.type_id = type_id.to_string();
        node.assign_id(NodeId::new());
        node.clear_peers();
        Some(node)
    }

    /// Connection hooks of `type_id`
    pub fn hooks(&self, type_id: &str) -> Option<Arc<dyn NodeHooks>> {
        self.types.get(type_id)?.hooks.clone()
    }

    /// Whether `type_id` is registered
    pub fn contains(&self, type_id: &str) -> bool {
        self.types.contains_key(type_id)
    }

    /// Display name of `type_id`
    pub fn name(&self, type_id: &str) -> Option<&str> {
        self.types.get(type_id).map(|r| r.name.as_str())
    }

    /// Registered type identifiers, sorted
    pub fn type_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.types.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Display name -> type identifiers registered under it
    pub fn names(&self) -> &IndexMap<String, Vec<String>> {
        &self.names
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Drop every registration
    pub fn clear(&mut self) {
        self.types.clear();
        self.names.clear();
    }
}

impl fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("types", &self.types.keys().collect::<Vec<_>>())
            .field("names", &self.names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_create() {
        let mut registry = NodeRegistry::new();
        assert!(registry.register("test.Add", "Add", || Node::new("ignored", "add").with_input("a")));

        let first = registry.create("test.Add").unwrap();
        let second = registry.create("test.Add").unwrap();
        assert_eq!(first.type_id, "test.Add");
        assert_ne!(first.id, second.id);
        assert!(first.inputs().all(|p| p.node == first.id));
        assert!(registry.create("test.Missing").is_none());
    }

    #[test]
    fn test_duplicate_keeps_original() {
        let mut registry = NodeRegistry::new();
        registry.register("test.Node", "Node", || Node::new("test.Node", "original"));
        assert!(!registry.register("test.Node", "Other", || Node::new("test.Node", "replacement")));

        assert_eq!(registry.create("test.Node").unwrap().name, "original");
        assert_eq!(registry.len(), 1);
        assert!(!registry.names().contains_key("Other"));
    }

    #[test]
    fn test_aliases_and_clear() {
        let mut registry = NodeRegistry::new();
        registry.register("b.Node", "Node", || Node::new("b.Node", "n"));
        registry.register("a.Node", "Node", || Node::new("a.Node", "n"));
        assert_eq!(registry.names()["Node"], vec!["b.Node".to_string(), "a.Node".to_string()]);
        assert_eq!(registry.type_ids(), vec!["a.Node".to_string(), "b.Node".to_string()]);

        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.names().is_empty());
    }

    #[test]
    fn test_global_is_shared() {
        let a = NodeRegistry::global();
        let b = NodeRegistry::global();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
