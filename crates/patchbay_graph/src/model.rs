// SPDX-License-Identifier: MIT OR Apache-2.0
//! The abstract graph model: the contract every concrete graph satisfies,
//! the notifications it emits, and the structural port-change protocol.

use crate::connection::ConnectionId;
use crate::delegate::LoadError;
use crate::node::{NodeFlags, NodeId, NodeRole, NodeValue, PortRole, PortValue};
use crate::port::{PortIndex, PortType};
use std::collections::HashSet;

/// Notification appended to a model's event log as its state changes.
///
/// Events are recorded in emission order, before the triggering operation
/// returns; collaborators (scene, persistence, tests) drain the log between
/// operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphEvent {
    /// A connection entered the connectivity set.
    ConnectionCreated(ConnectionId),
    /// A connection left the connectivity set.
    ConnectionDeleted(ConnectionId),
    /// A node was created.
    NodeCreated(NodeId),
    /// A node record was erased.
    NodeDeleted(NodeId),
    /// A node's content changed and views should re-read it.
    NodeUpdated(NodeId),
    /// A node's flags changed.
    NodeFlagsUpdated(NodeId),
    /// A node's position changed.
    NodePositionUpdated(NodeId),
    /// The whole model was replaced, e.g. by a load.
    ModelReset,
    /// Ports are about to leave a node; connections touching them are going
    /// away and connections above them will be renumbered.
    PortsAboutToBeDeleted {
        /// Node being edited.
        node_id: NodeId,
        /// Side being edited.
        port_type: PortType,
        /// First removed index.
        first: PortIndex,
        /// Last removed index.
        last: PortIndex,
    },
    /// Port deletion finished; displaced connections are re-attached.
    PortsDeleted,
    /// Ports are about to be inserted; connections at or above the insertion
    /// point will be renumbered.
    PortsAboutToBeInserted {
        /// Node being edited.
        node_id: NodeId,
        /// Side being edited.
        port_type: PortType,
        /// First inserted index.
        first: PortIndex,
        /// Last inserted index.
        last: PortIndex,
    },
    /// Port insertion finished; displaced connections are re-attached.
    PortsInserted,
    /// An input port received a payload.
    InPortDataSet {
        /// Consuming node.
        node_id: NodeId,
        /// Input port that was fed.
        port_index: PortIndex,
    },
}

/// Connections displaced by a structural port edit, staged between the
/// "about to" call and its completion call.
///
/// The token holds the displaced connections re-addressed to their
/// post-edit indices; passing it back to [`GraphModel::ports_deleted`] or
/// [`GraphModel::ports_inserted`] re-attaches them. Only one structural edit
/// may be in flight at a time.
#[must_use = "complete the structural edit by passing the staged connections back"]
#[derive(Debug, Default)]
pub struct PortShift {
    node_id: Option<NodeId>,
    staged: Vec<ConnectionId>,
}

impl PortShift {
    /// The staged, re-addressed connections.
    pub fn staged(&self) -> &[ConnectionId] {
        &self.staged
    }
}

/// Contract between "graph as data" and every consumer: views, persistence
/// and the propagation engine.
///
/// Lookup misses are reported through `Option`/`bool` returns; no operation
/// panics as its error channel.
pub trait GraphModel {
    /// An id never previously issued by this model instance.
    fn new_node_id(&mut self) -> NodeId;

    /// All currently live node ids. No ordering guarantee.
    fn all_node_ids(&self) -> HashSet<NodeId>;

    /// Every connection (in and out) touching `node_id`; empty when the node
    /// has none or does not exist.
    fn all_connection_ids(&self, node_id: NodeId) -> HashSet<ConnectionId>;

    /// Connections touching exactly one port.
    fn connections(
        &self,
        node_id: NodeId,
        port_type: PortType,
        port_index: PortIndex,
    ) -> HashSet<ConnectionId>;

    /// Membership test against the connectivity set.
    fn connection_exists(&self, connection_id: ConnectionId) -> bool;

    /// Create a node of the given registered type. `None` when the type is
    /// unknown; the model is unchanged in that case.
    fn add_node(&mut self, node_type: &str) -> Option<NodeId>;

    /// Whether the connection could be created right now: both nodes exist,
    /// both ports are within current arity, the data types match exactly and
    /// both endpoint ports' connection policies permit another connection.
    fn connection_possible(&self, connection_id: ConnectionId) -> bool;

    /// Whether the connection may be interactively detached.
    fn detach_possible(&self, _connection_id: ConnectionId) -> bool {
        true
    }

    /// Insert a connection and push the producer's current value downstream.
    ///
    /// Precondition: [`GraphModel::connection_possible`] returned true. The
    /// core asserts this in debug builds only.
    fn add_connection(&mut self, connection_id: ConnectionId);

    /// Whether the model holds data for `node_id`.
    fn node_exists(&self, node_id: NodeId) -> bool;

    /// Role-keyed node attribute. `None` when the node is unknown.
    fn node_data(&self, node_id: NodeId, role: NodeRole) -> Option<NodeValue>;

    /// View flags of a node.
    fn node_flags(&self, _node_id: NodeId) -> NodeFlags {
        NodeFlags::default()
    }

    /// Set a role-keyed node attribute. Returns false for unknown nodes and
    /// read-only roles.
    fn set_node_data(&mut self, node_id: NodeId, role: NodeRole, value: NodeValue) -> bool;

    /// Role-keyed port attribute. `None` when the node is unknown or the
    /// index is out of bounds.
    fn port_data(
        &self,
        node_id: NodeId,
        port_type: PortType,
        port_index: PortIndex,
        role: PortRole,
    ) -> Option<PortValue>;

    /// Set a role-keyed port attribute. Only feeding an input port's `Data`
    /// role is writable.
    fn set_port_data(
        &mut self,
        node_id: NodeId,
        port_type: PortType,
        port_index: PortIndex,
        value: PortValue,
        role: PortRole,
    ) -> bool;

    /// Remove a connection and propagate an empty payload to its former
    /// input side. Returns false when the connection does not exist.
    fn delete_connection(&mut self, connection_id: ConnectionId) -> bool;

    /// Remove a node. Every touching connection is removed first, each per
    /// the [`GraphModel::delete_connection`] contract, then the node record
    /// is erased. Returns false when the node does not exist.
    fn delete_node(&mut self, node_id: NodeId) -> bool;

    /// Opaque per-node JSON snapshot, default empty.
    fn save_node(&self, _node_id: NodeId) -> serde_json::Value {
        serde_json::Value::Object(serde_json::Map::new())
    }

    /// Restore a node from a [`GraphModel::save_node`] snapshot, default
    /// no-op.
    fn load_node(&mut self, _node_json: &serde_json::Value) -> Result<(), LoadError> {
        Ok(())
    }

    /// Append a notification to the model's event log.
    fn push_event(&mut self, event: GraphEvent);

    // --- Structural port-change protocol -----------------------------------
    //
    // Delegates with dynamic arity change their port count in three steps
    // driven by the caller: stage (`ports_about_to_be_*`), apply the arity
    // change on the delegate, complete (`ports_deleted`/`ports_inserted`).
    // The stage call must run while the delegate still reports its old
    // arity; the completion call after it reports the new one.

    /// Prepare the removal of ports `[first, last]` (clamped to the current
    /// arity) on one side of a node.
    ///
    /// Deletes every connection touching the removed indices, then stages
    /// the connections at higher indices re-addressed `removed` places down.
    fn ports_about_to_be_deleted(
        &mut self,
        node_id: NodeId,
        port_type: PortType,
        first: PortIndex,
        last: PortIndex,
    ) -> PortShift {
        let count_role = match port_type {
            PortType::In => NodeRole::InPortCount,
            PortType::Out => NodeRole::OutPortCount,
            PortType::None => return PortShift::default(),
        };
        let port_count = self
            .node_data(node_id, count_role)
            .and_then(|v| v.as_count())
            .unwrap_or(0);
        if port_count == 0 || first >= port_count || last < first {
            return PortShift::default();
        }
        self.push_event(GraphEvent::PortsAboutToBeDeleted {
            node_id,
            port_type,
            first,
            last,
        });

        let clamped_last = last.min(port_count - 1);
        for port_index in first..=clamped_last {
            for connection_id in self.connections(node_id, port_type, port_index) {
                self.delete_connection(connection_id);
            }
        }

        let removed = clamped_last - first + 1;
        let mut staged = Vec::new();
        for port_index in clamped_last + 1..port_count {
            for connection_id in self.connections(node_id, port_type, port_index) {
                staged.push(connection_id.with_port_index(port_type, port_index - removed));
                self.delete_connection(connection_id);
            }
        }
        staged.sort_by_key(|c| (c.out_node_id, c.out_port_index, c.in_node_id, c.in_port_index));
        PortShift {
            node_id: Some(node_id),
            staged,
        }
    }

    /// Complete a staged port removal: re-attach the displaced connections at
    /// their shifted indices.
    fn ports_deleted(&mut self, shift: PortShift) {
        let node_id = shift.node_id;
        for connection_id in shift.staged {
            self.add_connection(connection_id);
        }
        self.push_event(GraphEvent::PortsDeleted);
        if let Some(node_id) = node_id {
            self.push_event(GraphEvent::NodeUpdated(node_id));
        }
    }

    /// Prepare the insertion of ports `[first, last]` on one side of a node.
    ///
    /// Stages the connections at indices `>= first` re-addressed `inserted`
    /// places up, so existing connections keep flowing after the insertion
    /// instead of being destroyed.
    fn ports_about_to_be_inserted(
        &mut self,
        node_id: NodeId,
        port_type: PortType,
        first: PortIndex,
        last: PortIndex,
    ) -> PortShift {
        let count_role = match port_type {
            PortType::In => NodeRole::InPortCount,
            PortType::Out => NodeRole::OutPortCount,
            PortType::None => return PortShift::default(),
        };
        let Some(port_count) = self.node_data(node_id, count_role).and_then(|v| v.as_count())
        else {
            return PortShift::default();
        };
        if first > port_count || last < first {
            return PortShift::default();
        }
        self.push_event(GraphEvent::PortsAboutToBeInserted {
            node_id,
            port_type,
            first,
            last,
        });

        let inserted = last - first + 1;
        let mut staged = Vec::new();
        for port_index in first..port_count {
            for connection_id in self.connections(node_id, port_type, port_index) {
                staged.push(connection_id.with_port_index(port_type, port_index + inserted));
                self.delete_connection(connection_id);
            }
        }
        staged.sort_by_key(|c| (c.out_node_id, c.out_port_index, c.in_node_id, c.in_port_index));
        PortShift {
            node_id: Some(node_id),
            staged,
        }
    }

    /// Complete a staged port insertion: re-attach the displaced connections
    /// at their shifted indices.
    fn ports_inserted(&mut self, shift: PortShift) {
        let node_id = shift.node_id;
        for connection_id in shift.staged {
            self.add_connection(connection_id);
        }
        self.push_event(GraphEvent::PortsInserted);
        if let Some(node_id) = node_id {
            self.push_event(GraphEvent::NodeUpdated(node_id));
        }
    }
}
