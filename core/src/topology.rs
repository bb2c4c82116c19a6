use std::collections::HashMap;

use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::failure::FailureParams;

pub type NodeId = NodeIndex;
pub type EdgeId = EdgeIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeRole {
    Source,
    Switch,
    Standby,
    Sink,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeStatus {
    Idle,
    Safe,
    Warning,
    Rerouted,
    Overloaded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeRole {
    Primary,
    Backup,
    Standby,
}

impl Default for EdgeRole {
    fn default() -> Self {
        EdgeRole::Primary
    }
}

/// A server, switch, standby switch, or storage sink.
///
/// `load` and `status` are scratch state recomputed on every propagation
/// cycle; `is_failed` is terminal for the remainder of a run.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub role: NodeRole,
    /// Throughput limit in MB/s. `None` for unbounded roles (Source/Sink).
    pub capacity: Option<f64>,
    pub load: f64,
    pub status: NodeStatus,
    pub failure: FailureParams,
    pub is_failed: bool,
}

/// A directed link. `flow` is recomputed every propagation cycle and never
/// carried over; `weight` is the routing cost maintained by the controller.
#[derive(Debug, Clone)]
pub struct Edge {
    pub flow: f64,
    pub weight: f64,
    pub role: EdgeRole,
    /// Explicit share of the upstream node's forwarded load. When every
    /// outgoing primary/backup edge of a node carries a split, the splits
    /// are normalized; otherwise load is divided equally.
    pub split: Option<f64>,
}

impl Edge {
    fn new(role: EdgeRole, split: Option<f64>) -> Self {
        Self {
            flow: 0.0,
            weight: 1.0,
            role,
            split,
        }
    }
}

#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("duplicate node name: {0}")]
    DuplicateNode(String),
    #[error("edge references unknown node: {0}")]
    UnknownNode(String),
    #[error("topology has no source node")]
    MissingSource,
    #[error("topology has no sink node")]
    MissingSink,
    #[error("redundant pair {from} -> {to} has no backing edge")]
    RedundancyWithoutEdge { from: String, to: String },
}

/// Declarative node/edge list for externally supplied fabrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub name: String,
    pub role: NodeRole,
    #[serde(default)]
    pub capacity: Option<f64>,
    #[serde(default)]
    pub failure: Option<FailureParams>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeSpec {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub role: EdgeRole,
    #[serde(default)]
    pub split: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologySpec {
    pub nodes: Vec<NodeSpec>,
    pub edges: Vec<EdgeSpec>,
    #[serde(default)]
    pub redundancy: Vec<(String, String)>,
}

/// Directed fabric graph. Acyclic along the primary source -> sink
/// direction; lateral standby edges between peer switches are allowed.
/// Failure never removes nodes or edges, it only changes derived state.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    graph: DiGraph<Node, Edge>,
    by_name: HashMap<String, NodeId>,
    redundant: HashMap<NodeId, NodeId>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a topology from an explicit node/edge list, failing fast on
    /// unknown names, duplicates, missing roles, or unbacked redundancy.
    pub fn from_spec(spec: &TopologySpec) -> Result<Self, TopologyError> {
        let mut topo = Topology::new();
        for node in &spec.nodes {
            if topo.by_name.contains_key(&node.name) {
                return Err(TopologyError::DuplicateNode(node.name.clone()));
            }
            let failure = node
                .failure
                .unwrap_or_else(|| FailureParams::for_role(node.role));
            topo.add_node_with(&node.name, node.role, node.capacity, failure);
        }
        for edge in &spec.edges {
            let from = topo
                .lookup(&edge.from)
                .ok_or_else(|| TopologyError::UnknownNode(edge.from.clone()))?;
            let to = topo
                .lookup(&edge.to)
                .ok_or_else(|| TopologyError::UnknownNode(edge.to.clone()))?;
            match edge.split {
                Some(split) => topo.add_edge_with_split(from, to, edge.role, split),
                None => topo.add_edge(from, to, edge.role),
            };
        }
        for (from, to) in &spec.redundancy {
            let from = topo
                .lookup(from)
                .ok_or_else(|| TopologyError::UnknownNode(from.clone()))?;
            let to = topo
                .lookup(to)
                .ok_or_else(|| TopologyError::UnknownNode(to.clone()))?;
            topo.set_redundant(from, to)?;
        }
        topo.validate()?;
        Ok(topo)
    }

    pub fn add_node(&mut self, name: &str, role: NodeRole) -> NodeId {
        self.add_node_with(name, role, None, FailureParams::for_role(role))
    }

    pub fn add_node_with(
        &mut self,
        name: &str,
        role: NodeRole,
        capacity: Option<f64>,
        failure: FailureParams,
    ) -> NodeId {
        debug_assert!(!self.by_name.contains_key(name), "node names must be unique");
        let id = self.graph.add_node(Node {
            name: name.to_string(),
            role,
            capacity,
            load: 0.0,
            status: NodeStatus::Idle,
            failure,
            is_failed: false,
        });
        self.by_name.insert(name.to_string(), id);
        id
    }

    pub fn add_edge(&mut self, from: NodeId, to: NodeId, role: EdgeRole) -> EdgeId {
        self.graph.add_edge(from, to, Edge::new(role, None))
    }

    pub fn add_edge_with_split(
        &mut self,
        from: NodeId,
        to: NodeId,
        role: EdgeRole,
        split: f64,
    ) -> EdgeId {
        self.graph.add_edge(from, to, Edge::new(role, Some(split)))
    }

    /// Declares `to` as the redundant neighbor excess load from `from` is
    /// shifted to. Requires a real edge so the shifted flow is observable.
    pub fn set_redundant(&mut self, from: NodeId, to: NodeId) -> Result<(), TopologyError> {
        if self.graph.find_edge(from, to).is_none() {
            return Err(TopologyError::RedundancyWithoutEdge {
                from: self.graph[from].name.clone(),
                to: self.graph[to].name.clone(),
            });
        }
        self.redundant.insert(from, to);
        Ok(())
    }

    pub fn redundant_neighbor(&self, id: NodeId) -> Option<NodeId> {
        self.redundant.get(&id).copied()
    }

    pub fn lookup(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.graph[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.graph[id]
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.graph[id]
    }

    pub fn edge_mut(&mut self, id: EdgeId) -> &mut Edge {
        &mut self.graph[id]
    }

    pub fn edge_between(&self, from: NodeId, to: NodeId) -> Option<EdgeId> {
        self.graph.find_edge(from, to)
    }

    pub fn edge_endpoints(&self, id: EdgeId) -> (NodeId, NodeId) {
        self.graph
            .edge_endpoints(id)
            .expect("edge belongs to this graph")
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.graph.node_indices().collect()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.graph
            .node_indices()
            .map(move |id| (id, &self.graph[id]))
    }

    pub fn edge_list(&self) -> Vec<(EdgeId, NodeId, NodeId)> {
        self.graph
            .edge_references()
            .map(|e| (e.id(), e.source(), e.target()))
            .collect()
    }

    pub fn out_links(&self, id: NodeId) -> Vec<(EdgeId, NodeId)> {
        self.graph
            .edges_directed(id, Direction::Outgoing)
            .map(|e| (e.id(), e.target()))
            .collect()
    }

    pub fn successors(&self, id: NodeId) -> Vec<NodeId> {
        self.graph
            .neighbors_directed(id, Direction::Outgoing)
            .collect()
    }

    pub fn predecessors(&self, id: NodeId) -> Vec<NodeId> {
        self.graph
            .neighbors_directed(id, Direction::Incoming)
            .collect()
    }

    pub fn nodes_with_role(&self, role: NodeRole) -> Vec<NodeId> {
        self.graph
            .node_indices()
            .filter(|&id| self.graph[id].role == role)
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Zeroes all node loads and edge flows before a propagation cycle.
    /// Non-failed nodes drop back to Idle; failed nodes keep their terminal
    /// status but still shed the stale load value.
    pub fn reset_loads(&mut self) {
        for id in self.graph.node_indices() {
            let node = &mut self.graph[id];
            node.load = 0.0;
            if !node.is_failed {
                node.status = NodeStatus::Idle;
            }
        }
        for id in self.graph.edge_indices() {
            self.graph[id].flow = 0.0;
        }
    }

    pub fn apply_load(&mut self, id: NodeId, delta: f64) {
        self.graph[id].load += delta;
    }

    pub fn set_flow(&mut self, id: EdgeId, value: f64) {
        self.graph[id].flow = value;
    }

    pub fn add_flow(&mut self, id: EdgeId, delta: f64) {
        self.graph[id].flow += delta;
    }

    /// A propagation run is only meaningful with at least one source and
    /// one sink present.
    pub fn validate(&self) -> Result<(), TopologyError> {
        let mut has_source = false;
        let mut has_sink = false;
        for id in self.graph.node_indices() {
            match self.graph[id].role {
                NodeRole::Source => has_source = true,
                NodeRole::Sink => has_sink = true,
                _ => {}
            }
        }
        if !has_source {
            return Err(TopologyError::MissingSource);
        }
        if !has_sink {
            return Err(TopologyError::MissingSink);
        }
        Ok(())
    }
}
