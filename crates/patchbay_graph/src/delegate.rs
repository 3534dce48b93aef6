// SPDX-License-Identifier: MIT OR Apache-2.0
//! The node delegate: the per-node-type unit owning port arity, data typing
//! and the compute function.

use crate::connection::ConnectionId;
use crate::node::NodeId;
use crate::port::{ConnectionPolicy, NodeDataType, PortIndex, PortType, SharedNodeData};
use std::any::Any;

/// Error restoring persisted graph or delegate state.
///
/// Restoration is atomic: any of these aborts the whole `load` call and
/// leaves the model untouched.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The document structure did not match the expected shape.
    #[error("malformed graph document: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A required field is absent or of the wrong type.
    #[error("missing or invalid field `{0}`")]
    InvalidField(&'static str),

    /// No delegate is registered under the saved name.
    #[error("unknown node type `{0}`")]
    UnknownNodeType(String),

    /// The same node id appears more than once.
    #[error("duplicate node id {0}")]
    DuplicateNodeId(NodeId),

    /// A saved connection cannot exist on the restored graph.
    #[error("connection {0:?} is not possible on the restored graph")]
    ImpossibleConnection(ConnectionId),
}

/// Records which output ports changed while a delegate ran.
///
/// The owning model passes an outbox into every delegate call and drains it
/// into the propagation queue afterwards, so announcing a change here is what
/// triggers updates in the nodes downstream.
#[derive(Debug, Default)]
pub struct DelegateUpdates {
    changed: Vec<PortIndex>,
}

impl DelegateUpdates {
    /// Announce fresh data on an output port.
    pub fn data_updated(&mut self, port_index: PortIndex) {
        self.changed.push(port_index);
    }

    /// Announce that an output port no longer carries data.
    ///
    /// Downstream consumers receive the now-empty payload on the next
    /// delivery; invalidation propagates the same way an update does.
    pub fn data_invalidated(&mut self, port_index: PortIndex) {
        self.changed.push(port_index);
    }

    /// Whether no output changes were recorded.
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }

    pub(crate) fn take_changed(&mut self) -> Vec<PortIndex> {
        std::mem::take(&mut self.changed)
    }
}

/// Per-node-type polymorphic unit: declares port counts and types, computes
/// outputs from inputs, and is notified of connection lifecycle.
///
/// Instances are created by the [`crate::registry::NodeDelegateRegistry`] and
/// exclusively owned by a [`crate::dataflow::DataFlowGraphModel`], keyed by
/// node id.
pub trait NodeDelegate {
    /// Stable unique type name; the registry key, persisted in saved graphs.
    fn name(&self) -> String;

    /// Display label; may differ from [`NodeDelegate::name`].
    fn caption(&self) -> String {
        self.name()
    }

    /// Whether the caption is shown.
    fn caption_visible(&self) -> bool {
        true
    }

    /// Display label for an individual port.
    fn port_caption(&self, _port_type: PortType, _port_index: PortIndex) -> String {
        String::new()
    }

    /// Whether the label of an individual port is shown.
    fn port_caption_visible(&self, _port_type: PortType, _port_index: PortIndex) -> bool {
        false
    }

    /// Current arity for the given side. May change at runtime for delegates
    /// with dynamic ports.
    fn n_ports(&self, port_type: PortType) -> u32;

    /// Type tag of a port. Callers must keep `port_index` within the current
    /// [`NodeDelegate::n_ports`] bounds.
    fn data_type(&self, port_type: PortType, port_index: PortIndex) -> NodeDataType;

    /// How many connections the port accepts. Inputs default to a fan-in of
    /// one, outputs fan out freely.
    fn port_connection_policy(&self, port_type: PortType, _port_index: PortIndex) -> ConnectionPolicy {
        match port_type {
            PortType::In => ConnectionPolicy::Single,
            _ => ConnectionPolicy::Many,
        }
    }

    /// Deliver a payload to an input port and recompute synchronously.
    ///
    /// `None` means "upstream disconnected or invalidated": the delegate must
    /// drop dependent output rather than keep it stale, and record every
    /// changed output port on `updates`. Computational failure is an empty
    /// output, never a panic.
    fn set_in_data(
        &mut self,
        data: Option<SharedNodeData>,
        port_index: PortIndex,
        updates: &mut DelegateUpdates,
    );

    /// Current output payload for a port; `None` when not yet computed or
    /// invalidated. A cheap accessor: computation belongs in
    /// [`NodeDelegate::set_in_data`].
    fn out_data(&self, port_index: PortIndex) -> Option<SharedNodeData>;

    /// Called right after a connection into one of this delegate's inputs
    /// materialized. Must not mutate the connectivity set.
    fn input_connection_created(&mut self, _connection_id: ConnectionId) {}

    /// Called right after a connection into one of this delegate's inputs was
    /// removed. Must not mutate the connectivity set.
    fn input_connection_deleted(&mut self, _connection_id: ConnectionId) {}

    /// Called right after a connection out of one of this delegate's outputs
    /// materialized. Must not mutate the connectivity set.
    fn output_connection_created(&mut self, _connection_id: ConnectionId) {}

    /// Called right after a connection out of one of this delegate's outputs
    /// was removed. Must not mutate the connectivity set.
    fn output_connection_deleted(&mut self, _connection_id: ConnectionId) {}

    /// Delegate-specific state for persistence. The owning model merges the
    /// `name` field into the returned object.
    fn save(&self) -> serde_json::Value {
        serde_json::json!({ "name": self.name() })
    }

    /// Restore state produced by [`NodeDelegate::save`].
    fn load(&mut self, _state: &serde_json::Value) -> Result<(), LoadError> {
        Ok(())
    }

    /// Downcast support for typed delegate access.
    fn as_any(&self) -> &dyn Any;

    /// Mutable downcast support for typed delegate access.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
