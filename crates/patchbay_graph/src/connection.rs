// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection identity: which output port feeds which input port.

use crate::node::NodeId;
use crate::port::{PortIndex, PortType};
use serde::{Deserialize, Serialize};

/// Identity of a connection. Data always flows Out → In.
///
/// Two connections are equal iff all four fields match; the full tuple is
/// hashed so the id can key the connectivity set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionId {
    /// Producing node.
    pub out_node_id: NodeId,
    /// Output port on the producing node.
    pub out_port_index: PortIndex,
    /// Consuming node.
    pub in_node_id: NodeId,
    /// Input port on the consuming node.
    pub in_port_index: PortIndex,
}

impl ConnectionId {
    /// Create a connection id from its four endpoint fields.
    pub fn new(
        out_node_id: NodeId,
        out_port_index: PortIndex,
        in_node_id: NodeId,
        in_port_index: PortIndex,
    ) -> Self {
        Self {
            out_node_id,
            out_port_index,
            in_node_id,
            in_port_index,
        }
    }

    /// The node on the given side, if any.
    pub fn node_id(&self, port_type: PortType) -> Option<NodeId> {
        match port_type {
            PortType::Out => Some(self.out_node_id),
            PortType::In => Some(self.in_node_id),
            PortType::None => None,
        }
    }

    /// The port index on the given side, if any.
    pub fn port_index(&self, port_type: PortType) -> Option<PortIndex> {
        match port_type {
            PortType::Out => Some(self.out_port_index),
            PortType::In => Some(self.in_port_index),
            PortType::None => None,
        }
    }

    /// Whether either endpoint sits on `node_id`.
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.out_node_id == node_id || self.in_node_id == node_id
    }

    /// Copy of this id with the port index on one side replaced.
    ///
    /// Used when structural port edits shift a connection to a new index.
    pub fn with_port_index(mut self, port_type: PortType, port_index: PortIndex) -> Self {
        match port_type {
            PortType::Out => self.out_port_index = port_index,
            PortType::In => self.in_port_index = port_index,
            PortType::None => {}
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_equality_over_all_fields() {
        let a = ConnectionId::new(NodeId(0), 0, NodeId(1), 0);
        let b = ConnectionId::new(NodeId(0), 0, NodeId(1), 0);
        let c = ConnectionId::new(NodeId(0), 1, NodeId(1), 0);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_keys_a_set() {
        let mut set = HashSet::new();
        set.insert(ConnectionId::new(NodeId(0), 0, NodeId(1), 0));
        set.insert(ConnectionId::new(NodeId(0), 0, NodeId(1), 0));
        set.insert(ConnectionId::new(NodeId(0), 0, NodeId(1), 1));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_endpoint_accessors() {
        let c = ConnectionId::new(NodeId(3), 1, NodeId(7), 2);
        assert_eq!(c.node_id(PortType::Out), Some(NodeId(3)));
        assert_eq!(c.node_id(PortType::In), Some(NodeId(7)));
        assert_eq!(c.node_id(PortType::None), None);
        assert_eq!(c.port_index(PortType::Out), Some(1));
        assert_eq!(c.port_index(PortType::In), Some(2));
        assert!(c.involves_node(NodeId(3)));
        assert!(c.involves_node(NodeId(7)));
        assert!(!c.involves_node(NodeId(4)));
    }

    #[test]
    fn test_with_port_index_shifts_one_side() {
        let c = ConnectionId::new(NodeId(3), 1, NodeId(7), 2);
        let shifted = c.with_port_index(PortType::In, 4);
        assert_eq!(shifted.in_port_index, 4);
        assert_eq!(shifted.out_port_index, 1);
    }

    #[test]
    fn test_serializes_with_camel_case_keys() {
        let c = ConnectionId::new(NodeId(0), 0, NodeId(1), 2);
        let json = serde_json::to_value(c).expect("connection id serializes");
        assert_eq!(json["outNodeId"], 0);
        assert_eq!(json["outPortIndex"], 0);
        assert_eq!(json["inNodeId"], 1);
        assert_eq!(json["inPortIndex"], 2);
    }
}
