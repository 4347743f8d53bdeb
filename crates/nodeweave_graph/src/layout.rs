// SPDX-License-Identifier: MIT OR Apache-2.0
//! Rank-based auto layout.

use crate::error::{GraphError, Result};
use crate::graph::GraphModel;
use crate::node::{LayoutDirection, NodeId};
use crate::node_graph::NodeGraph;
use indexmap::{IndexMap, IndexSet};
use std::collections::{BTreeMap, VecDeque};

/// Minimum band spacing across the flow in horizontal layout
pub const MIN_NODE_HEIGHT: f64 = 120.0;
/// Minimum band spacing across the flow in vertical layout
pub const MIN_NODE_WIDTH: f64 = 250.0;

/// Longest-path rank of every node reachable from `start_nodes` inside
/// `subset`, following outputs (`downstream`) or inputs.
///
/// Fails with `CycleDetected` when a rank grows past the subset size.
pub fn compute_node_rank(
    model: &GraphModel,
    start_nodes: &[NodeId],
    subset: &IndexSet<NodeId>,
    downstream: bool,
) -> Result<IndexMap<NodeId, usize>> {
    let mut ranks: IndexMap<NodeId, usize> = IndexMap::new();
    let mut queue = VecDeque::new();
    for start in start_nodes {
        if subset.contains(start) && !ranks.contains_key(start) {
            ranks.insert(start.clone(), 0);
            queue.push_back(start.clone());
        }
    }

    while let Some(current) = queue.pop_front() {
        let next_rank = ranks.get(&current).copied().unwrap_or(0) + 1;
        let neighbours = if downstream {
            model.downstream_nodes(&current)
        } else {
            model.upstream_nodes(&current)
        };
        for next in neighbours {
            if !subset.contains(&next) {
                continue;
            }
            if ranks.get(&next).is_some_and(|&rank| rank >= next_rank) {
                continue;
            }
            if next_rank > subset.len() {
                return Err(GraphError::CycleDetected);
            }
            ranks.insert(next.clone(), next_rank);
            queue.push_back(next);
        }
    }
    Ok(ranks)
}

fn bounding_center(model: &GraphModel, nodes: &IndexSet<NodeId>) -> Option<[f64; 2]> {
    let mut bounds: Option<[f64; 4]> = None;
    for node in nodes.iter().filter_map(|id| model.node(id)) {
        let [x, y] = node.position;
        let [w, h] = node.size;
        bounds = Some(match bounds {
            Some([x0, y0, x1, y1]) => [x0.min(x), y0.min(y), x1.max(x + w), y1.max(y + h)],
            None => [x, y, x + w, y + h],
        });
    }
    bounds.map(|[x0, y0, x1, y1]| [(x0 + x1) / 2.0, (y0 + y1) / 2.0])
}

impl NodeGraph {
    /// Arrange nodes in bands by rank, as one undo step.
    ///
    /// `nodes` defaults to the whole graph. Extra `start_nodes` are ranked 0
    /// along with the nodes that have no neighbour upstream (or downstream
    /// when `downstream` is false) inside the set. The arrangement keeps
    /// the centre of the original bounding box.
    pub fn auto_layout_nodes(
        &mut self,
        nodes: Option<&[NodeId]>,
        downstream: bool,
        start_nodes: &[NodeId],
    ) -> Result<()> {
        let subset: IndexSet<NodeId> = match nodes {
            Some(ids) => {
                for id in ids {
                    self.require_node(id)?;
                }
                ids.iter().cloned().collect()
            }
            None => self.model.node_ids().cloned().collect(),
        };

        let mut starts: Vec<NodeId> = start_nodes.to_vec();
        starts.extend(subset.iter().filter(|id| {
            let neighbours = if downstream {
                self.model.upstream_nodes(id)
            } else {
                self.model.downstream_nodes(id)
            };
            !neighbours.iter().any(|n| subset.contains(n))
        }).cloned());
        if starts.is_empty() {
            tracing::debug!("auto layout skipped, no start node");
            return Ok(());
        }

        let Some(center_before) = bounding_center(&self.model, &subset) else {
            return Ok(());
        };
        let ranks = compute_node_rank(&self.model, &starts, &subset, downstream)?;
        let mut bands: BTreeMap<usize, Vec<NodeId>> = BTreeMap::new();
        for (id, rank) in ranks {
            bands.entry(rank).or_default().push(id);
        }
        let ordered: Vec<Vec<NodeId>> = if downstream {
            bands.into_values().collect()
        } else {
            bands.into_values().rev().collect()
        };

        let vertical = self.model.settings().layout_direction == LayoutDirection::Vertical;
        let mut placements = Vec::new();
        let mut along = 0.0;
        for band in &ordered {
            let sizes: Vec<[f64; 2]> = band
                .iter()
                .map(|id| self.model.node(id).map_or([0.0, 0.0], |n| n.size))
                .collect();
            // (extent along the flow, extent across it)
            let extents: Vec<(f64, f64)> = sizes
                .iter()
                .map(|&[w, h]| if vertical { (h, w) } else { (w, h) })
                .collect();
            let band_extent = extents.iter().map(|e| e.0).fold(0.0, f64::max);
            let min_across = if vertical { MIN_NODE_WIDTH } else { MIN_NODE_HEIGHT };

            along += band_extent;
            let mut across = 0.0;
            for (idx, (id, extent)) in band.iter().zip(&extents).enumerate() {
                let step = extent.1.max(min_across);
                if idx > 0 {
                    across += step;
                }
                let position = if vertical { [across, along] } else { [along, across] };
                placements.push((id.clone(), position));
                across += step * 0.5 + 10.0;
            }
            along += band_extent * 0.3;
        }

        self.with_macro("auto layout nodes", |graph| {
            for (id, position) in &placements {
                graph.set_node_position(id, *position)?;
            }
            if let Some(center_after) = bounding_center(&graph.model, &subset) {
                let dx = center_before[0] - center_after[0];
                let dy = center_before[1] - center_after[1];
                for id in &subset {
                    let [x, y] = graph.require_node(id)?.position;
                    graph.set_node_position(id, [x + dx, y + dy])?;
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use crate::node_graph::CreateNodeOptions;
    use crate::port::{PortRef, PortSpec};

    fn graph() -> NodeGraph {
        let graph = NodeGraph::new();
        graph.register_node("test.Node", "Node", || {
            Node::new("test.Node", "node")
                .with_input(PortSpec::new("in").multi(true))
                .with_output("out")
        });
        graph
    }

    fn link(graph: &mut NodeGraph, from: &NodeId, to: &NodeId) {
        graph
            .connect(&PortRef::output(from, "out"), &PortRef::input(to, "in"))
            .unwrap();
    }

    #[test]
    fn test_rank_is_longest_path() {
        let mut graph = graph();
        let ids: Vec<NodeId> = (0..4)
            .map(|_| graph.create_node("test.Node", CreateNodeOptions::new()).unwrap())
            .collect();
        // 0 -> 1 -> 2 -> 3 and a shortcut 0 -> 3
        link(&mut graph, &ids[0], &ids[1]);
        link(&mut graph, &ids[1], &ids[2]);
        link(&mut graph, &ids[2], &ids[3]);
        link(&mut graph, &ids[0], &ids[3]);

        let subset: IndexSet<NodeId> = ids.iter().cloned().collect();
        let ranks = compute_node_rank(graph.model(), &ids[..1], &subset, true).unwrap();
        assert_eq!(ranks[&ids[3]], 3);

        let upstream = compute_node_rank(graph.model(), &ids[3..], &subset, false).unwrap();
        assert_eq!(upstream[&ids[0]], 3);
        assert_eq!(upstream[&ids[2]], 1);
    }

    #[test]
    fn test_rank_reports_cycle() {
        let mut graph = graph();
        graph.set_acyclic(false);
        let a = graph.create_node("test.Node", CreateNodeOptions::new()).unwrap();
        let b = graph.create_node("test.Node", CreateNodeOptions::new()).unwrap();
        link(&mut graph, &a, &b);
        link(&mut graph, &b, &a);

        let subset: IndexSet<NodeId> = [a.clone(), b].into_iter().collect();
        assert!(matches!(
            compute_node_rank(graph.model(), &[a], &subset, true),
            Err(GraphError::CycleDetected)
        ));
    }

    #[test]
    fn test_horizontal_bands_keep_center() {
        let mut graph = graph();
        let a = graph.create_node("test.Node", CreateNodeOptions::new().at(0.0, 0.0)).unwrap();
        let b = graph.create_node("test.Node", CreateNodeOptions::new().at(0.0, 300.0)).unwrap();
        let c = graph.create_node("test.Node", CreateNodeOptions::new().at(400.0, 0.0)).unwrap();
        link(&mut graph, &a, &b);
        link(&mut graph, &a, &c);

        let ids = [a.clone(), b.clone(), c.clone()];
        let subset: IndexSet<NodeId> = ids.iter().cloned().collect();
        let before = bounding_center(graph.model(), &subset).unwrap();
        graph.auto_layout_nodes(None, true, &[]).unwrap();
        let after = bounding_center(graph.model(), &subset).unwrap();
        assert!((before[0] - after[0]).abs() < 1e-9 && (before[1] - after[1]).abs() < 1e-9);

        let pos = |id: &NodeId| graph.node(id).unwrap().position;
        assert!(pos(&a)[0] < pos(&b)[0]);
        assert_eq!(pos(&b)[0], pos(&c)[0]);
        // Second member of a band: stacked by dy * 0.5 + 10 then dy
        assert_eq!(pos(&c)[1] - pos(&b)[1], 120.0 * 1.5 + 10.0);
        assert_eq!(graph.undo_stack().undo_text(), Some("auto layout nodes"));

        graph.undo().unwrap();
        assert_eq!(graph.node(&b).unwrap().position, [0.0, 300.0]);
    }

    #[test]
    fn test_upstream_reverses_bands() {
        let mut graph = graph();
        let a = graph.create_node("test.Node", CreateNodeOptions::new()).unwrap();
        let b = graph.create_node("test.Node", CreateNodeOptions::new()).unwrap();
        link(&mut graph, &a, &b);
        graph.set_layout_direction(LayoutDirection::Vertical);

        graph.auto_layout_nodes(None, false, &[]).unwrap();
        let pos = |id: &NodeId| graph.node(id).unwrap().position;
        assert!(pos(&a)[1] < pos(&b)[1]);
        assert_eq!(pos(&a)[0], pos(&b)[0]);
    }
}
