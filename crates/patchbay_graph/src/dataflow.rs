// SPDX-License-Identifier: MIT OR Apache-2.0
//! Concrete dataflow model: owns the node delegates, the connectivity set
//! and the geometry cache, and pushes computed values along connections.

use crate::connection::ConnectionId;
use crate::delegate::{DelegateUpdates, LoadError, NodeDelegate};
use crate::model::{GraphEvent, GraphModel};
use crate::node::{NodeGeometry, NodeId, NodeRole, NodeValue, Point, PortRole, PortValue};
use crate::port::{ConnectionPolicy, PortIndex, PortType, SharedNodeData};
use crate::registry::NodeDelegateRegistry;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;

/// Serialized form of one node: id, delegate state, scene position.
#[derive(Debug, Serialize, Deserialize)]
struct SavedNode {
    id: NodeId,
    model: serde_json::Value,
    position: Point,
}

/// Serialized form of a whole graph.
#[derive(Debug, Serialize, Deserialize)]
struct SavedGraph {
    nodes: Vec<SavedNode>,
    connections: Vec<ConnectionId>,
}

/// Graph model that owns one delegate per node and propagates values along
/// the connectivity set.
///
/// All mutation and propagation happen synchronously on the calling thread;
/// notifications are appended to an ordered event log drained with
/// [`DataFlowGraphModel::drain_events`].
pub struct DataFlowGraphModel {
    registry: Rc<NodeDelegateRegistry>,
    next_node_id: u32,
    delegates: IndexMap<NodeId, Box<dyn NodeDelegate>>,
    connectivity: IndexSet<ConnectionId>,
    geometry: IndexMap<NodeId, NodeGeometry>,
    events: VecDeque<GraphEvent>,
}

impl DataFlowGraphModel {
    /// Create an empty model over a shared, fully-populated registry.
    pub fn new(registry: Rc<NodeDelegateRegistry>) -> Self {
        Self {
            registry,
            next_node_id: 0,
            delegates: IndexMap::new(),
            connectivity: IndexSet::new(),
            geometry: IndexMap::new(),
            events: VecDeque::new(),
        }
    }

    /// The registry this model instantiates delegates from.
    pub fn registry(&self) -> &Rc<NodeDelegateRegistry> {
        &self.registry
    }

    /// Shared access to a node's delegate.
    pub fn delegate(&self, node_id: NodeId) -> Option<&dyn NodeDelegate> {
        self.delegates.get(&node_id).map(Box::as_ref)
    }

    /// Typed access to a node's delegate.
    pub fn delegate_as<T: NodeDelegate + 'static>(&self, node_id: NodeId) -> Option<&T> {
        self.delegate(node_id)?.as_any().downcast_ref::<T>()
    }

    /// Mutate a node's delegate and propagate whatever output changes it
    /// reports.
    ///
    /// This is the entry point for self-triggered updates, e.g. a source
    /// node's value edited through an embedded widget. Returns `None` when
    /// the node is unknown.
    pub fn update_delegate<R>(
        &mut self,
        node_id: NodeId,
        f: impl FnOnce(&mut dyn NodeDelegate, &mut DelegateUpdates) -> R,
    ) -> Option<R> {
        let mut updates = DelegateUpdates::default();
        let result = {
            let delegate = self.delegates.get_mut(&node_id)?;
            f(delegate.as_mut(), &mut updates)
        };
        let changed = updates.take_changed();
        if !changed.is_empty() {
            self.push_event(GraphEvent::NodeUpdated(node_id));
            self.propagate(changed.into_iter().map(|p| (node_id, p)).collect());
        }
        Some(result)
    }

    /// Drain the pending notification log in emission order.
    pub fn drain_events(&mut self) -> Vec<GraphEvent> {
        self.events.drain(..).collect()
    }

    /// Deliver the current payload of one output port to every connected
    /// input, cascading through the graph.
    ///
    /// Called whenever a delegate announced new output data: on its own
    /// update, on connection creation, and when a node is restored from JSON.
    pub fn on_out_port_data_updated(&mut self, node_id: NodeId, port_index: PortIndex) {
        self.propagate(VecDeque::from([(node_id, port_index)]));
    }

    /// Drain a queue of changed output ports breadth-first.
    ///
    /// Each output port is processed at most once per pass, so cyclic wiring
    /// delivers once and terminates instead of recursing unboundedly. The
    /// payload is fetched once per port and the same shared handle goes to
    /// every consumer.
    fn propagate(&mut self, mut queue: VecDeque<(NodeId, PortIndex)>) {
        let mut visited: HashSet<(NodeId, PortIndex)> = HashSet::new();
        while let Some((node_id, port_index)) = queue.pop_front() {
            if !visited.insert((node_id, port_index)) {
                tracing::trace!(node = %node_id, port = port_index, "output already delivered this pass");
                continue;
            }
            let data = match self.delegates.get(&node_id) {
                Some(delegate) => delegate.out_data(port_index),
                None => continue,
            };
            let consumers: Vec<ConnectionId> = self
                .connectivity
                .iter()
                .filter(|c| c.out_node_id == node_id && c.out_port_index == port_index)
                .copied()
                .collect();
            for connection_id in consumers {
                let changed =
                    self.deliver(connection_id.in_node_id, connection_id.in_port_index, data.clone());
                for changed_port in changed {
                    queue.push_back((connection_id.in_node_id, changed_port));
                }
            }
        }
    }

    /// Hand a payload to one input port; returns the consumer's changed
    /// output ports.
    fn deliver(
        &mut self,
        node_id: NodeId,
        port_index: PortIndex,
        data: Option<SharedNodeData>,
    ) -> Vec<PortIndex> {
        let Some(delegate) = self.delegates.get_mut(&node_id) else {
            return Vec::new();
        };
        let mut updates = DelegateUpdates::default();
        delegate.set_in_data(data, port_index, &mut updates);
        self.events
            .push_back(GraphEvent::InPortDataSet { node_id, port_index });
        updates.take_changed()
    }

    /// Fire the connection-created lifecycle hooks on both endpoint
    /// delegates.
    fn send_connection_creation(&mut self, connection_id: ConnectionId) {
        if let Some(delegate) = self.delegates.get_mut(&connection_id.out_node_id) {
            delegate.output_connection_created(connection_id);
        }
        if let Some(delegate) = self.delegates.get_mut(&connection_id.in_node_id) {
            delegate.input_connection_created(connection_id);
        }
    }

    /// Fire the connection-deleted lifecycle hooks on both endpoint
    /// delegates.
    fn send_connection_deletion(&mut self, connection_id: ConnectionId) {
        if let Some(delegate) = self.delegates.get_mut(&connection_id.out_node_id) {
            delegate.output_connection_deleted(connection_id);
        }
        if let Some(delegate) = self.delegates.get_mut(&connection_id.in_node_id) {
            delegate.input_connection_deleted(connection_id);
        }
    }

    /// Tell a formerly-connected input that its upstream is gone and cascade
    /// the invalidation.
    fn propagate_empty_data_to(&mut self, node_id: NodeId, port_index: PortIndex) {
        let changed = self.deliver(node_id, port_index, None);
        if !changed.is_empty() {
            self.propagate(changed.into_iter().map(|p| (node_id, p)).collect());
        }
    }

    /// Delegate state with the `name` field merged in.
    fn model_state(delegate: &dyn NodeDelegate) -> serde_json::Value {
        let mut state = delegate.save();
        if !state.is_object() {
            state = serde_json::json!({});
        }
        state["name"] = serde_json::Value::String(delegate.name());
        state
    }

    /// Serialize the node set, per-node delegate state and geometry, and the
    /// connectivity set, in insertion order.
    pub fn save(&self) -> serde_json::Value {
        let nodes: Vec<serde_json::Value> =
            self.delegates.keys().map(|id| self.save_node(*id)).collect();
        let connections: Vec<&ConnectionId> = self.connectivity.iter().collect();
        serde_json::json!({ "nodes": nodes, "connections": connections })
    }

    /// Restore a graph from a document produced by [`DataFlowGraphModel::save`].
    ///
    /// The whole document is validated against the registry before the model
    /// is touched: on any error the current graph is left unchanged. On
    /// success the model is reset, nodes are recreated in the saved order
    /// (keeping their ids) and connections are added afterwards, so the
    /// immediate-pull rule sees already-populated upstream outputs.
    pub fn load(&mut self, document: &serde_json::Value) -> Result<(), LoadError> {
        let saved: SavedGraph = serde_json::from_value(document.clone())?;

        let mut staged: IndexMap<NodeId, (Box<dyn NodeDelegate>, Point)> = IndexMap::new();
        for node in &saved.nodes {
            let name = node
                .model
                .get("name")
                .and_then(serde_json::Value::as_str)
                .ok_or(LoadError::InvalidField("model.name"))?;
            let mut delegate = self
                .registry
                .create(name)
                .ok_or_else(|| LoadError::UnknownNodeType(name.to_owned()))?;
            delegate.load(&node.model)?;
            if staged.insert(node.id, (delegate, node.position)).is_some() {
                return Err(LoadError::DuplicateNodeId(node.id));
            }
        }

        let mut fed: HashSet<(NodeId, PortIndex)> = HashSet::new();
        for c in &saved.connections {
            let feasible = match (staged.get(&c.out_node_id), staged.get(&c.in_node_id)) {
                (Some((out_delegate, _)), Some((in_delegate, _))) => {
                    c.out_port_index < out_delegate.n_ports(PortType::Out)
                        && c.in_port_index < in_delegate.n_ports(PortType::In)
                        && out_delegate.data_type(PortType::Out, c.out_port_index).id
                            == in_delegate.data_type(PortType::In, c.in_port_index).id
                        && (in_delegate.port_connection_policy(PortType::In, c.in_port_index)
                            == ConnectionPolicy::Many
                            || fed.insert((c.in_node_id, c.in_port_index)))
                }
                _ => false,
            };
            if !feasible {
                return Err(LoadError::ImpossibleConnection(*c));
            }
        }

        self.delegates.clear();
        self.connectivity.clear();
        self.geometry.clear();
        self.push_event(GraphEvent::ModelReset);

        for (node_id, (delegate, position)) in staged {
            self.next_node_id = self.next_node_id.max(node_id.0 + 1);
            self.delegates.insert(node_id, delegate);
            self.geometry.insert(
                node_id,
                NodeGeometry {
                    position,
                    ..NodeGeometry::default()
                },
            );
            self.push_event(GraphEvent::NodeCreated(node_id));
        }
        for connection_id in saved.connections {
            self.add_connection(connection_id);
        }
        tracing::debug!(
            nodes = self.delegates.len(),
            connections = self.connectivity.len(),
            "graph restored"
        );
        Ok(())
    }
}

impl GraphModel for DataFlowGraphModel {
    fn new_node_id(&mut self) -> NodeId {
        let node_id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        node_id
    }

    fn all_node_ids(&self) -> HashSet<NodeId> {
        self.delegates.keys().copied().collect()
    }

    fn all_connection_ids(&self, node_id: NodeId) -> HashSet<ConnectionId> {
        self.connectivity
            .iter()
            .filter(|c| c.involves_node(node_id))
            .copied()
            .collect()
    }

    fn connections(
        &self,
        node_id: NodeId,
        port_type: PortType,
        port_index: PortIndex,
    ) -> HashSet<ConnectionId> {
        self.connectivity
            .iter()
            .filter(|c| {
                c.node_id(port_type) == Some(node_id) && c.port_index(port_type) == Some(port_index)
            })
            .copied()
            .collect()
    }

    fn connection_exists(&self, connection_id: ConnectionId) -> bool {
        self.connectivity.contains(&connection_id)
    }

    fn add_node(&mut self, node_type: &str) -> Option<NodeId> {
        let Some(delegate) = self.registry.create(node_type) else {
            tracing::warn!(node_type, "unknown node type");
            return None;
        };
        let node_id = self.new_node_id();
        self.delegates.insert(node_id, delegate);
        self.geometry.insert(node_id, NodeGeometry::default());
        tracing::debug!(node = %node_id, node_type, "node created");
        self.push_event(GraphEvent::NodeCreated(node_id));
        Some(node_id)
    }

    fn connection_possible(&self, connection_id: ConnectionId) -> bool {
        let (Some(out_delegate), Some(in_delegate)) = (
            self.delegates.get(&connection_id.out_node_id),
            self.delegates.get(&connection_id.in_node_id),
        ) else {
            return false;
        };
        if connection_id.out_port_index >= out_delegate.n_ports(PortType::Out)
            || connection_id.in_port_index >= in_delegate.n_ports(PortType::In)
        {
            return false;
        }
        let out_type = out_delegate.data_type(PortType::Out, connection_id.out_port_index);
        let in_type = in_delegate.data_type(PortType::In, connection_id.in_port_index);
        if out_type.id != in_type.id {
            return false;
        }
        let out_vacant = self
            .connections(
                connection_id.out_node_id,
                PortType::Out,
                connection_id.out_port_index,
            )
            .is_empty()
            || out_delegate.port_connection_policy(PortType::Out, connection_id.out_port_index)
                == ConnectionPolicy::Many;
        let in_vacant = self
            .connections(
                connection_id.in_node_id,
                PortType::In,
                connection_id.in_port_index,
            )
            .is_empty()
            || in_delegate.port_connection_policy(PortType::In, connection_id.in_port_index)
                == ConnectionPolicy::Many;
        out_vacant && in_vacant
    }

    fn add_connection(&mut self, connection_id: ConnectionId) {
        debug_assert!(
            self.connection_possible(connection_id),
            "add_connection precondition violated: {connection_id:?}"
        );
        self.connectivity.insert(connection_id);
        tracing::debug!(?connection_id, "connection created");
        self.push_event(GraphEvent::ConnectionCreated(connection_id));
        self.send_connection_creation(connection_id);

        // Connecting pulls the producer's existing value immediately; it does
        // not wait for the next recompute.
        let data = self
            .delegates
            .get(&connection_id.out_node_id)
            .and_then(|d| d.out_data(connection_id.out_port_index));
        let changed = self.deliver(connection_id.in_node_id, connection_id.in_port_index, data);
        if !changed.is_empty() {
            self.propagate(
                changed
                    .into_iter()
                    .map(|p| (connection_id.in_node_id, p))
                    .collect(),
            );
        }
    }

    fn node_exists(&self, node_id: NodeId) -> bool {
        self.delegates.contains_key(&node_id)
    }

    fn node_data(&self, node_id: NodeId, role: NodeRole) -> Option<NodeValue> {
        let delegate = self.delegates.get(&node_id)?;
        Some(match role {
            NodeRole::Type => NodeValue::String(delegate.name()),
            NodeRole::Position => NodeValue::Point(self.geometry.get(&node_id)?.position),
            NodeRole::Size => NodeValue::Size(self.geometry.get(&node_id)?.size),
            NodeRole::CaptionVisible => NodeValue::Bool(delegate.caption_visible()),
            NodeRole::Caption => NodeValue::String(delegate.caption()),
            NodeRole::InternalData => NodeValue::Json(Self::model_state(delegate.as_ref())),
            NodeRole::InPortCount => NodeValue::Count(delegate.n_ports(PortType::In)),
            NodeRole::OutPortCount => NodeValue::Count(delegate.n_ports(PortType::Out)),
        })
    }

    fn set_node_data(&mut self, node_id: NodeId, role: NodeRole, value: NodeValue) -> bool {
        match (role, value) {
            (NodeRole::Position, NodeValue::Point(position)) => {
                let Some(geometry) = self.geometry.get_mut(&node_id) else {
                    return false;
                };
                geometry.position = position;
                self.push_event(GraphEvent::NodePositionUpdated(node_id));
                true
            }
            (NodeRole::Size, NodeValue::Size(size)) => {
                let Some(geometry) = self.geometry.get_mut(&node_id) else {
                    return false;
                };
                geometry.size = size;
                true
            }
            _ => false,
        }
    }

    fn port_data(
        &self,
        node_id: NodeId,
        port_type: PortType,
        port_index: PortIndex,
        role: PortRole,
    ) -> Option<PortValue> {
        let delegate = self.delegates.get(&node_id)?;
        if port_index >= delegate.n_ports(port_type) {
            return None;
        }
        Some(match role {
            PortRole::Data => PortValue::Data(match port_type {
                PortType::Out => delegate.out_data(port_index),
                _ => None,
            }),
            PortRole::DataType => PortValue::DataType(delegate.data_type(port_type, port_index)),
            PortRole::ConnectionPolicy => {
                PortValue::ConnectionPolicy(delegate.port_connection_policy(port_type, port_index))
            }
            PortRole::CaptionVisible => {
                PortValue::Bool(delegate.port_caption_visible(port_type, port_index))
            }
            PortRole::Caption => PortValue::String(delegate.port_caption(port_type, port_index)),
        })
    }

    fn set_port_data(
        &mut self,
        node_id: NodeId,
        port_type: PortType,
        port_index: PortIndex,
        value: PortValue,
        role: PortRole,
    ) -> bool {
        match (port_type, role, value) {
            (PortType::In, PortRole::Data, PortValue::Data(data)) => {
                if !self.node_exists(node_id) {
                    return false;
                }
                let changed = self.deliver(node_id, port_index, data);
                if !changed.is_empty() {
                    self.propagate(changed.into_iter().map(|p| (node_id, p)).collect());
                }
                true
            }
            _ => false,
        }
    }

    fn delete_connection(&mut self, connection_id: ConnectionId) -> bool {
        if !self.connectivity.shift_remove(&connection_id) {
            return false;
        }
        tracing::debug!(?connection_id, "connection deleted");
        self.push_event(GraphEvent::ConnectionDeleted(connection_id));
        self.send_connection_deletion(connection_id);
        self.propagate_empty_data_to(connection_id.in_node_id, connection_id.in_port_index);
        true
    }

    fn delete_node(&mut self, node_id: NodeId) -> bool {
        if !self.node_exists(node_id) {
            return false;
        }
        for connection_id in self.all_connection_ids(node_id) {
            self.delete_connection(connection_id);
        }
        self.geometry.shift_remove(&node_id);
        self.delegates.shift_remove(&node_id);
        tracing::debug!(node = %node_id, "node deleted");
        self.push_event(GraphEvent::NodeDeleted(node_id));
        true
    }

    fn save_node(&self, node_id: NodeId) -> serde_json::Value {
        let Some(delegate) = self.delegates.get(&node_id) else {
            return serde_json::Value::Object(serde_json::Map::new());
        };
        let position = self
            .geometry
            .get(&node_id)
            .copied()
            .unwrap_or_default()
            .position;
        serde_json::json!({
            "id": node_id,
            "model": Self::model_state(delegate.as_ref()),
            "position": position,
        })
    }

    fn load_node(&mut self, node_json: &serde_json::Value) -> Result<(), LoadError> {
        let saved: SavedNode = serde_json::from_value(node_json.clone())?;
        let name = saved
            .model
            .get("name")
            .and_then(serde_json::Value::as_str)
            .ok_or(LoadError::InvalidField("model.name"))?;
        let mut delegate = self
            .registry
            .create(name)
            .ok_or_else(|| LoadError::UnknownNodeType(name.to_owned()))?;
        delegate.load(&saved.model)?;
        if self.delegates.contains_key(&saved.id) {
            return Err(LoadError::DuplicateNodeId(saved.id));
        }

        self.next_node_id = self.next_node_id.max(saved.id.0 + 1);
        let out_ports = delegate.n_ports(PortType::Out);
        self.delegates.insert(saved.id, delegate);
        self.geometry.insert(
            saved.id,
            NodeGeometry {
                position: saved.position,
                ..NodeGeometry::default()
            },
        );
        self.push_event(GraphEvent::NodeCreated(saved.id));

        // Push the restored outputs to whatever is already connected.
        for port_index in 0..out_ports {
            self.on_out_port_data_updated(saved.id, port_index);
        }
        Ok(())
    }

    fn push_event(&mut self, event: GraphEvent) {
        self.events.push_back(event);
    }
}
