// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port model: directions, indices, connection policies and the payloads
//! that flow between ports.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::rc::Rc;

/// Zero-based position of a port within a node's port list of one direction.
///
/// Indices are contiguous per (node, [`PortType`]) and are renumbered when a
/// node's ports are structurally edited.
pub type PortIndex = u32;

/// Side of a node a port sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortType {
    /// Input port, consumes data.
    In,
    /// Output port, produces data.
    Out,
    /// Absent port reference.
    None,
}

impl PortType {
    /// The opposite side; `None` has no opposite.
    pub fn opposite(self) -> Self {
        match self {
            Self::In => Self::Out,
            Self::Out => Self::In,
            Self::None => Self::None,
        }
    }
}

/// How many connections a single port accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionPolicy {
    /// At most one connection may touch the port.
    Single,
    /// Any number of connections may touch the port.
    Many,
}

/// Type tag deciding connection compatibility between two ports.
///
/// Compatibility compares `id` for exact equality; `name` is a display label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeDataType {
    /// Stable identifier compared when checking compatibility.
    pub id: String,
    /// Human-readable name.
    pub name: String,
}

impl NodeDataType {
    /// Create a type tag.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Payload produced at an output port and consumed at connected inputs.
///
/// Payloads are immutable once produced; propagation hands the same shared
/// handle to every consumer of a port.
pub trait NodeData {
    /// Type tag used for connection-compatibility checks.
    fn data_type(&self) -> NodeDataType;

    /// Downcast support for consumers that know the concrete payload type.
    fn as_any(&self) -> &dyn Any;
}

/// Reference-counted payload handle shared between a producer and the
/// propagation pass delivering it.
pub type SharedNodeData = Rc<dyn NodeData>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_type_opposite() {
        assert_eq!(PortType::In.opposite(), PortType::Out);
        assert_eq!(PortType::Out.opposite(), PortType::In);
        assert_eq!(PortType::None.opposite(), PortType::None);
    }

    #[test]
    fn test_data_type_equality() {
        let a = NodeDataType::new("decimal", "Decimal");
        let b = NodeDataType::new("decimal", "Decimal");
        let c = NodeDataType::new("text", "Text");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
