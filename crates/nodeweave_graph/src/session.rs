// SPDX-License-Identifier: MIT OR Apache-2.0
//! Session files and clipboard operations.

use crate::command::Command;
use crate::error::{GraphError, Result};
use crate::event::GraphEvent;
use crate::node::NodeId;
use crate::node_graph::NodeGraph;
use crate::serialize::{DeserializeOptions, SessionDocument};
use std::fs;
use std::path::{Path, PathBuf};

/// Offset applied to duplicated nodes
pub const DUPLICATE_OFFSET: f64 = 50.0;

/// Outcome of [`NodeGraph::import_sessions`]
#[derive(Debug, Default)]
pub struct ImportReport {
    /// Files that were imported
    pub imported: Vec<PathBuf>,
    /// New nodes across all files
    pub nodes: Vec<NodeId>,
    /// Files that could not be imported
    pub failures: Vec<(PathBuf, GraphError)>,
}

impl ImportReport {
    /// Whether every file was imported
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Read and parse a session file
pub fn read_session(path: &Path) -> Result<SessionDocument> {
    let text = fs::read_to_string(path).map_err(|source| GraphError::SessionIo {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}

/// Write a session document as indented JSON
pub fn write_session(path: &Path, doc: &SessionDocument) -> Result<()> {
    let text = serde_json::to_string_pretty(doc)?;
    fs::write(path, text).map_err(|source| GraphError::SessionIo {
        path: path.to_path_buf(),
        source,
    })
}

impl NodeGraph {
    /// Serialize the whole graph
    pub fn serialize_session(&self) -> SessionDocument {
        let ids: Vec<NodeId> = self.model.node_ids().cloned().collect();
        self.serialize_nodes(&ids)
    }

    /// Load a document, optionally replacing the current graph and history.
    /// The selection is cleared afterwards.
    pub fn deserialize_session(
        &mut self,
        doc: &SessionDocument,
        clear_session: bool,
        clear_undo_stack: bool,
    ) -> Result<Vec<NodeId>> {
        if clear_session {
            self.clear_session()?;
        }
        let ids = self.deserialize(doc, DeserializeOptions::default())?;
        self.clear_selection()?;
        if clear_undo_stack {
            self.undo_stack.clear();
        }
        Ok(ids)
    }

    /// Save the graph to `path` and make it the current session
    pub fn save_session(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        write_session(path, &self.serialize_session())?;
        self.model.set_session(Some(path.to_path_buf()));
        self.undo_stack.set_clean();
        tracing::info!("saved session {}", path.display());
        self.emit(GraphEvent::SessionChanged(Some(path.to_path_buf())));
        Ok(())
    }

    /// Replace the graph with the session stored at `path`.
    ///
    /// The file is read and parsed before the current graph is cleared.
    pub fn load_session(&mut self, path: impl AsRef<Path>) -> Result<Vec<NodeId>> {
        let path = path.as_ref();
        let doc = read_session(path)?;
        self.clear_session()?;
        self.import_document(path, &doc, true)
    }

    /// Merge the session stored at `path` into the graph
    pub fn import_session(&mut self, path: impl AsRef<Path>) -> Result<Vec<NodeId>> {
        let path = path.as_ref();
        let doc = read_session(path)?;
        self.import_document(path, &doc, false)
    }

    fn import_document(&mut self, path: &Path, doc: &SessionDocument, clear_undo_stack: bool) -> Result<Vec<NodeId>> {
        let ids = self.deserialize_session(doc, false, clear_undo_stack)?;
        self.model.set_session(Some(path.to_path_buf()));
        if clear_undo_stack {
            self.undo_stack.set_clean();
        }
        tracing::info!("loaded {} node(s) from {}", ids.len(), path.display());
        self.emit(GraphEvent::SessionChanged(Some(path.to_path_buf())));
        Ok(ids)
    }

    /// Import several session files, collecting failures instead of
    /// stopping at the first one
    pub fn import_sessions<P: AsRef<Path>>(&mut self, paths: &[P]) -> ImportReport {
        let mut report = ImportReport::default();
        for path in paths {
            let path = path.as_ref();
            match self.import_session(path) {
                Ok(ids) => {
                    report.imported.push(path.to_path_buf());
                    report.nodes.extend(ids);
                }
                Err(e) => {
                    tracing::warn!("failed to import {}: {}", path.display(), e);
                    report.failures.push((path.to_path_buf(), e));
                }
            }
        }
        report
    }

    /// Remove every node, drop the undo history and forget the session path
    pub fn clear_session(&mut self) -> Result<()> {
        let ids: Vec<NodeId> = self.model.node_ids().cloned().collect();
        if !ids.is_empty() {
            self.with_macro("clear session", |graph| {
                graph.detach_nodes(&ids)?;
                let command = Command::remove_nodes(&graph.model, &ids)?;
                graph.push(command)
            })?;
        }
        self.undo_stack.clear();
        self.model.set_session(None);
        self.emit(GraphEvent::SessionChanged(None));
        Ok(())
    }

    fn clipboard_targets(&self, node_ids: &[NodeId]) -> Result<Vec<NodeId>> {
        if node_ids.is_empty() {
            return Ok(self.selected_nodes());
        }
        for id in node_ids {
            self.require_node(id)?;
        }
        Ok(node_ids.to_vec())
    }

    /// Serialize nodes for the clipboard; an empty slice copies the selection
    pub fn copy_nodes(&self, node_ids: &[NodeId]) -> Result<String> {
        let targets = self.clipboard_targets(node_ids)?;
        Ok(serde_json::to_string(&self.serialize_nodes(&targets))?)
    }

    /// Copy nodes then remove them, as one undo step
    pub fn cut_nodes(&mut self, node_ids: &[NodeId]) -> Result<String> {
        let targets = self.clipboard_targets(node_ids)?;
        let text = self.copy_nodes(&targets)?;
        if !targets.is_empty() {
            self.remove_nodes_with_label("cut nodes", &targets)?;
        }
        Ok(text)
    }

    /// Import clipboard text and select the new nodes
    pub fn paste_nodes(&mut self, text: &str, position: Option<[f64; 2]>) -> Result<Vec<NodeId>> {
        let doc: SessionDocument = serde_json::from_str(text)?;
        self.with_macro("pasted nodes", |graph| {
            graph.clear_selection()?;
            let ids = graph.deserialize(&doc, DeserializeOptions { position })?;
            for id in &ids {
                graph.set_selected(id, true)?;
            }
            Ok(ids)
        })
    }

    /// Copy nodes in place, offset and selected
    pub fn duplicate_nodes(&mut self, node_ids: &[NodeId]) -> Result<Vec<NodeId>> {
        let targets = self.clipboard_targets(node_ids)?;
        if targets.is_empty() {
            return Ok(Vec::new());
        }
        let doc = self.serialize_nodes(&targets);
        self.with_macro("duplicate nodes", |graph| {
            graph.clear_selection()?;
            let ids = graph.deserialize(&doc, DeserializeOptions::default())?;
            for id in &ids {
                let [x, y] = graph.require_node(id)?.position;
                graph.set_node_position(id, [x + DUPLICATE_OFFSET, y + DUPLICATE_OFFSET])?;
                graph.set_selected(id, true)?;
            }
            Ok(ids)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use crate::node_graph::CreateNodeOptions;
    use crate::port::PortRef;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn graph() -> NodeGraph {
        let graph = NodeGraph::new();
        graph.register_node("test.Node", "Node", || {
            Node::new("test.Node", "node").with_input("in").with_output("out")
        });
        graph
    }

    fn chain(graph: &mut NodeGraph, len: usize) -> Vec<NodeId> {
        let ids: Vec<NodeId> = (0..len)
            .map(|i| {
                graph
                    .create_node("test.Node", CreateNodeOptions::new().at(i as f64 * 150.0, 0.0))
                    .unwrap()
            })
            .collect();
        for pair in ids.windows(2) {
            graph
                .connect(&PortRef::output(&pair[0], "out"), &PortRef::input(&pair[1], "in"))
                .unwrap();
        }
        ids
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let mut graph = graph();
        chain(&mut graph, 3);
        graph.save_session(&path).unwrap();
        assert_eq!(graph.model().session(), Some(path.as_path()));
        assert!(graph.undo_stack().is_clean());

        let mut loaded = NodeGraph::with_registry(graph.registry().clone());
        let ids = loaded.load_session(&path).unwrap();
        assert_eq!(ids.len(), 3);
        assert_eq!(loaded.model().connections().len(), 2);
        assert!(loaded.selected_nodes().is_empty());
        assert!(!loaded.undo_stack().can_undo());
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut graph = graph();
        chain(&mut graph, 2);

        let missing = graph.load_session(dir.path().join("missing.json"));
        assert!(matches!(missing, Err(GraphError::SessionIo { .. })));
        assert_eq!(graph.model().node_count(), 2);

        let corrupt = dir.path().join("corrupt.json");
        std::fs::write(&corrupt, "{ not json").unwrap();
        assert!(matches!(graph.load_session(&corrupt), Err(GraphError::SessionCorrupt(_))));
        assert_eq!(graph.model().node_count(), 2);
    }

    #[test]
    fn test_import_sessions_collects_failures() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.json");
        let mut source = graph();
        chain(&mut source, 2);
        source.save_session(&good).unwrap();

        let mut graph = NodeGraph::with_registry(source.registry().clone());
        let report = graph.import_sessions(&[good.clone(), dir.path().join("nope.json"), good]);
        assert_eq!(report.imported.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert!(!report.is_complete());
        assert_eq!(graph.model().node_count(), 4);
    }

    #[test]
    fn test_clear_session() {
        let mut graph = graph();
        let ids = chain(&mut graph, 2);
        graph
            .set_port_locked(&PortRef::output(&ids[0], "out"), true, false)
            .unwrap();
        graph.clear_session().unwrap();
        assert!(graph.model().is_empty());
        assert!(!graph.undo_stack().can_undo());
        assert!(graph.model().session().is_none());
    }

    #[test]
    fn test_clear_session_with_locked_input() {
        let mut graph = graph();
        let ids = chain(&mut graph, 2);
        graph
            .set_port_locked(&PortRef::input(&ids[1], "in"), true, false)
            .unwrap();
        graph.clear_session().unwrap();
        assert!(graph.model().is_empty());
        assert!(!graph.undo_stack().can_undo());
    }

    #[test]
    fn test_load_over_locked_graph() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let mut source = graph();
        chain(&mut source, 3);
        source.save_session(&path).unwrap();

        let mut graph = NodeGraph::with_registry(source.registry().clone());
        let ids = chain(&mut graph, 2);
        graph
            .set_port_locked(&PortRef::input(&ids[1], "in"), true, false)
            .unwrap();
        graph.load_session(&path).unwrap();
        assert_eq!(graph.model().node_count(), 3);
        assert_eq!(graph.model().connections().len(), 2);
        assert!(!ids.iter().any(|id| graph.model().contains(id)));
    }

    #[test]
    fn test_session_changed_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let mut graph = graph();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        graph.add_observer(move |event: &GraphEvent| {
            if let GraphEvent::SessionChanged(session) = event {
                sink.borrow_mut().push(session.clone());
            }
        });
        chain(&mut graph, 2);

        graph.save_session(&path).unwrap();
        assert_eq!(*seen.borrow(), vec![Some(path.clone())]);

        graph.load_session(&path).unwrap();
        assert_eq!(*seen.borrow(), vec![Some(path.clone()), None, Some(path.clone())]);

        graph.clear_session().unwrap();
        assert_eq!(seen.borrow().last(), Some(&None));
        assert_eq!(seen.borrow().len(), 4);
    }

    #[test]
    fn test_copy_paste_reconnects_outer_nodes() {
        let mut graph = graph();
        let ids = chain(&mut graph, 2);
        let text = graph.copy_nodes(&ids[1..]).unwrap();
        let pasted = graph.paste_nodes(&text, Some([500.0, 500.0])).unwrap();

        assert_eq!(pasted.len(), 1);
        assert_eq!(graph.selected_nodes(), pasted);
        assert_eq!(graph.node(&pasted[0]).unwrap().position, [500.0, 500.0]);
        // The copied input was connected to the first node, which still exists
        assert!(graph
            .model()
            .port(&PortRef::input(&pasted[0], "in"))
            .unwrap()
            .is_connected_to(&ids[0], "out"));
        assert_eq!(graph.undo_stack().undo_text(), Some("pasted nodes"));

        graph.undo().unwrap();
        assert_eq!(graph.model().node_count(), 2);
        assert!(graph.model().is_consistent());
    }

    #[test]
    fn test_cut_and_duplicate() {
        let mut graph = graph();
        let ids = chain(&mut graph, 3);
        let duplicated = graph.duplicate_nodes(&ids[..2]).unwrap();
        assert_eq!(duplicated.len(), 2);
        let first = graph.node(&duplicated[0]).unwrap();
        assert_eq!(first.position, [DUPLICATE_OFFSET, DUPLICATE_OFFSET]);
        assert_eq!(first.name, "node 3");
        assert_eq!(graph.selected_nodes(), duplicated);

        let text = graph.cut_nodes(&duplicated).unwrap();
        assert_eq!(graph.model().node_count(), 3);
        assert_eq!(graph.undo_stack().undo_text(), Some("cut nodes"));
        let doc: SessionDocument = serde_json::from_str(&text).unwrap();
        assert_eq!(doc.nodes.len(), 2);
        assert!(graph.model().is_consistent());
    }
}
