// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node identity, role-keyed attributes, flags and geometry.

use crate::port::{ConnectionPolicy, NodeDataType, SharedNodeData};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a node, assigned monotonically by its graph model.
///
/// Ids are never reused while the node exists and serialize as bare integers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 2D position of a node in scene coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Point {
    /// Create a point.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Node dimensions, cached for the view layer.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    /// Width in scene units.
    pub width: f64,
    /// Height in scene units.
    pub height: f64,
}

impl Size {
    /// Create a size.
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Per-node geometry cache. Not consulted by propagation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NodeGeometry {
    /// Cached dimensions.
    pub size: Size,
    /// Position in the scene.
    pub position: Point,
}

/// Per-node view flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeFlags {
    /// The node's embedded content may be resized.
    pub resizable: bool,
    /// The node rejects interactive edits.
    pub locked: bool,
}

/// Node attributes addressable through `node_data`/`set_node_data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRole {
    /// Delegate type name.
    Type,
    /// Scene position.
    Position,
    /// Cached dimensions.
    Size,
    /// Whether the caption is shown.
    CaptionVisible,
    /// Display caption.
    Caption,
    /// Opaque delegate state as JSON.
    InternalData,
    /// Current input arity.
    InPortCount,
    /// Current output arity.
    OutPortCount,
}

/// Value returned from role-keyed node accessors.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeValue {
    /// Textual attribute.
    String(String),
    /// Boolean attribute.
    Bool(bool),
    /// Position attribute.
    Point(Point),
    /// Dimension attribute.
    Size(Size),
    /// Port arity attribute.
    Count(u32),
    /// Opaque JSON attribute.
    Json(serde_json::Value),
}

impl NodeValue {
    /// The contained string, if this is a textual attribute.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The contained boolean, if any.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The contained point, if any.
    pub fn as_point(&self) -> Option<Point> {
        match self {
            Self::Point(p) => Some(*p),
            _ => None,
        }
    }

    /// The contained size, if any.
    pub fn as_size(&self) -> Option<Size> {
        match self {
            Self::Size(s) => Some(*s),
            _ => None,
        }
    }

    /// The contained arity, if any.
    pub fn as_count(&self) -> Option<u32> {
        match self {
            Self::Count(n) => Some(*n),
            _ => None,
        }
    }
}

/// Port attributes addressable through `port_data`/`set_port_data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortRole {
    /// The payload currently sitting at the port.
    Data,
    /// The port's data type tag.
    DataType,
    /// The port's connection policy.
    ConnectionPolicy,
    /// Whether the port caption is shown.
    CaptionVisible,
    /// Display caption of the port.
    Caption,
}

/// Value returned from role-keyed port accessors.
#[derive(Clone)]
pub enum PortValue {
    /// Payload handle; `None` when the port carries no data.
    Data(Option<SharedNodeData>),
    /// Type tag of the port.
    DataType(NodeDataType),
    /// Connection policy of the port.
    ConnectionPolicy(ConnectionPolicy),
    /// Boolean attribute.
    Bool(bool),
    /// Textual attribute.
    String(String),
}

impl PortValue {
    /// The contained type tag, if any.
    pub fn as_data_type(&self) -> Option<&NodeDataType> {
        match self {
            Self::DataType(t) => Some(t),
            _ => None,
        }
    }

    /// The contained policy, if any.
    pub fn as_connection_policy(&self) -> Option<ConnectionPolicy> {
        match self {
            Self::ConnectionPolicy(p) => Some(*p),
            _ => None,
        }
    }

    /// The contained payload handle, if this is a data attribute.
    pub fn into_data(self) -> Option<SharedNodeData> {
        match self {
            Self::Data(d) => d,
            _ => None,
        }
    }
}

impl fmt::Debug for PortValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data(Some(d)) => write!(f, "Data({:?})", d.data_type()),
            Self::Data(None) => write!(f, "Data(None)"),
            Self::DataType(t) => write!(f, "DataType({t:?})"),
            Self::ConnectionPolicy(p) => write!(f, "ConnectionPolicy({p:?})"),
            Self::Bool(b) => write!(f, "Bool({b})"),
            Self::String(s) => write!(f, "String({s:?})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_serializes_as_bare_integer() {
        let json = serde_json::to_value(NodeId(42)).expect("node id serializes");
        assert_eq!(json, serde_json::json!(42));
    }

    #[test]
    fn test_node_value_accessors() {
        assert_eq!(NodeValue::Count(3).as_count(), Some(3));
        assert_eq!(NodeValue::Count(3).as_str(), None);
        assert_eq!(
            NodeValue::Point(Point::new(1.0, 2.0)).as_point(),
            Some(Point::new(1.0, 2.0))
        );
    }
}
