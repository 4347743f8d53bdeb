// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection engine.
//!
//! Connections are not stored as values: each port keeps the list of its
//! peers and both sides are updated together by one command. [`Connection`]
//! is the derived (input, output) pair used for listings and serialization.

use crate::command::Command;
use crate::error::{GraphError, Result};
use crate::node::NodeId;
use crate::node_graph::NodeGraph;
use crate::port::{PortDirection, PortRef};
use serde::{Deserialize, Serialize};

/// A connection between an input port and an output port
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Connection {
    /// Input side
    pub input: PortRef,
    /// Output side
    pub output: PortRef,
}

impl Connection {
    /// Create a connection value
    pub fn new(input: PortRef, output: PortRef) -> Self {
        Self { input, output }
    }

    /// Check if this connection involves a specific node
    pub fn involves_node(&self, node_id: &NodeId) -> bool {
        &self.input.node == node_id || &self.output.node == node_id
    }
}

impl NodeGraph {
    fn require_port_ref(&self, port: &PortRef) -> Result<()> {
        self.require_node(&port.node)?
            .require_port(port.direction, &port.name)
            .map(|_| ())
    }

    fn ensure_unlocked(&self, port: &PortRef) -> Result<()> {
        match self.model.port(port) {
            Some(p) if p.locked => Err(GraphError::LockedPort {
                node: port.node.clone(),
                port: port.name.clone(),
            }),
            _ => Ok(()),
        }
    }

    /// Whether the accept/reject tables let `port` take `peer`
    fn constraints_allow(&self, port: &PortRef, peer: &PortRef) -> bool {
        let (Some(node), Some(peer_node)) = (self.model.node(&port.node), self.model.node(&peer.node)) else {
            return false;
        };
        let accepted = self.model.accept_constraints().lookup_peer(
            &peer_node.type_id,
            peer.direction,
            &peer.name,
            &node.type_id,
        );
        if let Some(accepted) = accepted {
            if !accepted
                .get(&port.direction)
                .is_some_and(|names| names.contains(&port.name))
            {
                return false;
            }
        }
        let rejected = self.model.reject_constraints().lookup_peer(
            &peer_node.type_id,
            peer.direction,
            &peer.name,
            &node.type_id,
        );
        !rejected.is_some_and(|r| r.get(&port.direction).is_some_and(|names| names.contains(&port.name)))
    }

    /// Connect two ports.
    ///
    /// Returns `Ok(false)` when nothing changed: same port, missing port,
    /// already connected, filtered by the constraint tables, or closing a
    /// cycle in acyclic mode. A single-connection side drops its current
    /// peer first.
    pub fn connect(&mut self, a: &PortRef, b: &PortRef) -> Result<bool> {
        if a == b {
            return Ok(false);
        }
        let (Some(port_a), Some(port_b)) = (self.model.port(a), self.model.port(b)) else {
            tracing::debug!("connect skipped, missing port {} or {}", a, b);
            return Ok(false);
        };
        if a.direction == b.direction {
            return Err(GraphError::IncompatiblePorts(a.direction));
        }
        if port_a.is_connected_to(&b.node, &b.name) {
            return Ok(false);
        }
        self.ensure_unlocked(a)?;
        self.ensure_unlocked(b)?;

        if !self.constraints_allow(a, b) || !self.constraints_allow(b, a) {
            tracing::debug!("connect {} -> {} filtered by constraints", a, b);
            return Ok(false);
        }

        let (output, input) = match a.direction {
            PortDirection::Out => (a.clone(), b.clone()),
            PortDirection::In => (b.clone(), a.clone()),
        };
        if self.model.settings().acyclic && self.model.would_create_cycle(&output.node, &input.node) {
            tracing::debug!("connect {} -> {} would close a cycle", output, input);
            return Ok(false);
        }

        let mut displaced = Vec::new();
        for (port, state) in [(a, port_a), (b, port_b)] {
            if state.multi_connection {
                continue;
            }
            for peer in state.peer_refs() {
                self.ensure_unlocked(&peer)?;
                displaced.push((port.clone(), peer));
            }
        }

        self.with_macro("connect port", |graph| {
            for (port, peer) in &displaced {
                graph.disconnect(port, peer)?;
            }
            graph.push(Command::Connect {
                output: output.clone(),
                input: input.clone(),
            })?;
            graph.push(Command::InputConnected { input, output })
        })?;
        Ok(true)
    }

    /// Disconnect two ports; `Ok(false)` if they were not connected
    pub fn disconnect(&mut self, a: &PortRef, b: &PortRef) -> Result<bool> {
        let connected = self
            .model
            .port(a)
            .is_some_and(|p| p.is_connected_to(&b.node, &b.name));
        if !connected {
            return Ok(false);
        }
        self.ensure_unlocked(a)?;
        self.ensure_unlocked(b)?;

        let (output, input) = match a.direction {
            PortDirection::Out => (a.clone(), b.clone()),
            PortDirection::In => (b.clone(), a.clone()),
        };
        self.with_macro("disconnect port", |graph| {
            graph.push(Command::Disconnect {
                output: output.clone(),
                input: input.clone(),
            })?;
            graph.push(Command::InputDisconnected { input, output })
        })?;
        Ok(true)
    }

    /// Disconnect every peer of a port
    pub fn clear_connections(&mut self, port: &PortRef) -> Result<()> {
        self.require_port_ref(port)?;
        self.ensure_unlocked(port)?;
        let peers = self
            .model
            .port(port)
            .map(|p| p.peer_refs())
            .unwrap_or_default();
        if peers.is_empty() {
            return Ok(());
        }
        self.with_macro("clear connections", |graph| {
            for peer in &peers {
                graph.disconnect(port, peer)?;
            }
            Ok(())
        })
    }

    /// Lock or unlock a port, and its peers with `propagate`
    pub fn set_port_locked(&mut self, port: &PortRef, locked: bool, propagate: bool) -> Result<()> {
        self.require_port_ref(port)?;
        let mut targets = vec![port.clone()];
        if propagate {
            targets.extend(self.model.port(port).map(|p| p.peer_refs()).unwrap_or_default());
        }
        let label = if locked { "lock port" } else { "unlock port" };
        self.with_macro(label, |graph| {
            for target in targets {
                if graph.model.port(&target).is_some_and(|p| p.locked != locked) {
                    graph.push(Command::SetPortLocked { port: target, locked })?;
                }
            }
            Ok(())
        })
    }

    /// Show or hide a port
    pub fn set_port_visible(&mut self, port: &PortRef, visible: bool) -> Result<()> {
        self.require_port_ref(port)?;
        if self.model.port(port).is_some_and(|p| p.visible == visible) {
            return Ok(());
        }
        self.push(Command::SetPortVisible {
            port: port.clone(),
            visible,
        })?;
        self.flush_events();
        Ok(())
    }

    /// Restrict `port` to peers listed in the accept table
    pub fn add_accept_port_type(
        &mut self,
        port: &PortRef,
        peer_port: &str,
        peer_direction: PortDirection,
        peer_type: &str,
    ) -> Result<()> {
        self.require_port_ref(port)?;
        let type_id = self.require_node(&port.node)?.type_id.clone();
        self.model.accept_constraints_mut().add(
            &type_id,
            port.direction,
            &port.name,
            peer_type,
            peer_direction,
            peer_port,
        );
        Ok(())
    }

    /// Forbid `port` from taking the listed peer
    pub fn add_reject_port_type(
        &mut self,
        port: &PortRef,
        peer_port: &str,
        peer_direction: PortDirection,
        peer_type: &str,
    ) -> Result<()> {
        self.require_port_ref(port)?;
        let type_id = self.require_node(&port.node)?.type_id.clone();
        self.model.reject_constraints_mut().add(
            &type_id,
            port.direction,
            &port.name,
            peer_type,
            peer_direction,
            peer_port,
        );
        Ok(())
    }
}
