// SPDX-License-Identifier: MIT OR Apache-2.0
//! Accept/reject connection tables.
//!
//! A table is keyed by the port that owns the rule
//! (`type_id -> direction -> port name`) and lists the peer ports the rule
//! names (`peer type_id -> peer direction -> {peer port names}`).

use crate::port::PortDirection;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Peer port names grouped by peer direction
pub type PeerPorts = BTreeMap<PortDirection, BTreeSet<String>>;

/// Peer rules grouped by peer node type
pub type PeerRules = BTreeMap<String, PeerPorts>;

/// One connection rule table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionConstraints {
    table: BTreeMap<String, BTreeMap<PortDirection, BTreeMap<String, PeerRules>>>,
}

impl ConnectionConstraints {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `peer_type.peer_port (peer_direction)` to the rule of
    /// `node_type.port (direction)`
    pub fn add(
        &mut self,
        node_type: &str,
        direction: PortDirection,
        port: &str,
        peer_type: &str,
        peer_direction: PortDirection,
        peer_port: &str,
    ) {
        self.table
            .entry(node_type.to_string())
            .or_default()
            .entry(direction)
            .or_default()
            .entry(port.to_string())
            .or_default()
            .entry(peer_type.to_string())
            .or_default()
            .entry(peer_direction)
            .or_default()
            .insert(peer_port.to_string());
    }

    /// Rules declared for one port
    pub fn lookup(&self, node_type: &str, direction: PortDirection, port: &str) -> Option<&PeerRules> {
        self.table.get(node_type)?.get(&direction)?.get(port)
    }

    /// Rules naming `peer_type` for one port
    pub fn lookup_peer(
        &self,
        node_type: &str,
        direction: PortDirection,
        port: &str,
        peer_type: &str,
    ) -> Option<&PeerPorts> {
        self.lookup(node_type, direction, port)?.get(peer_type)
    }

    /// Merge every rule of `other` into this table
    pub fn merge(&mut self, other: &ConnectionConstraints) {
        for (node_type, directions) in &other.table {
            for (direction, ports) in directions {
                for (port, peers) in ports {
                    for (peer_type, peer_dirs) in peers {
                        for (peer_direction, names) in peer_dirs {
                            for name in names {
                                self.add(node_type, *direction, port, peer_type, *peer_direction, name);
                            }
                        }
                    }
                }
            }
        }
    }

    /// Whether the table holds no rule
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Drop every rule
    pub fn clear(&mut self) {
        self.table.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_lookup() {
        let mut table = ConnectionConstraints::new();
        table.add("a.A", PortDirection::In, "in", "b.B", PortDirection::Out, "out");
        table.add("a.A", PortDirection::In, "in", "b.B", PortDirection::Out, "alt");

        let peers = table.lookup_peer("a.A", PortDirection::In, "in", "b.B").unwrap();
        assert_eq!(peers[&PortDirection::Out].len(), 2);
        assert!(table.lookup("a.A", PortDirection::Out, "in").is_none());
    }

    #[test]
    fn test_sets_serialize_as_lists() {
        let mut table = ConnectionConstraints::new();
        table.add("a.A", PortDirection::In, "in", "b.B", PortDirection::Out, "out");
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"{"a.A":{"in":{"in":{"b.B":{"out":["out"]}}}}}"#);

        let loaded: ConnectionConstraints = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, table);
    }

    #[test]
    fn test_merge() {
        let mut left = ConnectionConstraints::new();
        left.add("a.A", PortDirection::In, "in", "b.B", PortDirection::Out, "out");
        let mut right = ConnectionConstraints::new();
        right.add("a.A", PortDirection::In, "in", "c.C", PortDirection::Out, "out");
        left.merge(&right);
        assert_eq!(left.lookup("a.A", PortDirection::In, "in").unwrap().len(), 2);
    }
}
