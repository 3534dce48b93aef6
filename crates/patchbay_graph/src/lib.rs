// SPDX-License-Identifier: MIT OR Apache-2.0
//! Data-flow node graph core for Patchbay.
//!
//! Users place nodes, wire ports together, and the model propagates computed
//! values along connections: a small dataflow interpreter behind a graph
//! editor. This crate is the model side of that split: graph structure,
//! delegates and value propagation, with no rendering or interaction code.
//!
//! ## Architecture
//!
//! - Typed node/connection identity ([`NodeId`], [`ConnectionId`]) and a
//!   port model with exact data-type matching
//! - [`NodeDelegate`]: the per-node-type unit owning port arity, typing and
//!   the compute function, created through a [`NodeDelegateRegistry`] of
//!   factories
//! - [`GraphModel`]: the contract between graph state and its consumers,
//!   with an ordered notification log and a structural port-change protocol
//! - [`DataFlowGraphModel`]: the concrete model that owns delegates and the
//!   connectivity set, pushes values breadth-first through connections, and
//!   round-trips the whole graph as JSON

pub mod connection;
pub mod dataflow;
pub mod delegate;
pub mod delegates;
pub mod model;
pub mod node;
pub mod port;
pub mod registry;

pub use connection::ConnectionId;
pub use dataflow::DataFlowGraphModel;
pub use delegate::{DelegateUpdates, LoadError, NodeDelegate};
pub use model::{GraphEvent, GraphModel, PortShift};
pub use node::{
    NodeFlags, NodeGeometry, NodeId, NodeRole, NodeValue, Point, PortRole, PortValue, Size,
};
pub use port::{ConnectionPolicy, NodeData, NodeDataType, PortIndex, PortType, SharedNodeData};
pub use registry::NodeDelegateRegistry;
