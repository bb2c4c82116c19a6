use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap};

use crate::topology::{NodeId, Topology};

/// Even an idle path has a cost.
const BASE_EDGE_COST: f64 = 1.0;

#[derive(Debug, Clone, Copy)]
struct Visit {
    dist: f64,
    node: NodeId,
    first_hop: Option<NodeId>,
}

impl PartialEq for Visit {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}
impl Eq for Visit {}

impl PartialOrd for Visit {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Visit {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.dist
            .total_cmp(&other.dist)
            .then(self.node.index().cmp(&other.node.index()))
    }
}

/// Centralized controller that periodically reweights the fabric graph from
/// live load/failure state and rebuilds every node's forwarding table from
/// globally-shortest paths.
///
/// Cost-based only: it steers traffic away from congested and failed nodes
/// but enforces no hard capacity limit.
#[derive(Debug, Default)]
pub struct RoutingController {
    fibs: HashMap<NodeId, HashMap<NodeId, NodeId>>,
}

impl RoutingController {
    pub fn new() -> Self {
        Self::default()
    }

    /// One controller cycle: reweight every edge from its destination's
    /// current load (`+inf` to failed nodes), then replace all forwarding
    /// tables wholesale. Pairs left unreachable by failures are skipped;
    /// their absence means "no route".
    pub fn recompute(&mut self, topo: &mut Topology) {
        for (eid, _, to) in topo.edge_list() {
            let dest = topo.node(to);
            let weight = if dest.is_failed {
                f64::INFINITY
            } else {
                BASE_EDGE_COST + dest.load
            };
            topo.edge_mut(eid).weight = weight;
        }

        self.fibs.clear();
        let mut routes = 0usize;
        for src in topo.node_ids() {
            if topo.node(src).is_failed {
                continue;
            }
            let table = first_hops_from(topo, src);
            routes += table.len();
            if !table.is_empty() {
                self.fibs.insert(src, table);
            }
        }
        tracing::debug!(nodes = topo.node_count(), routes, "forwarding tables rebuilt");
    }

    /// Next hop from `from` toward `dest`, if a route was installed.
    pub fn next_hop(&self, from: NodeId, dest: NodeId) -> Option<NodeId> {
        self.fibs.get(&from).and_then(|t| t.get(&dest)).copied()
    }

    pub fn table(&self, from: NodeId) -> Option<&HashMap<NodeId, NodeId>> {
        self.fibs.get(&from)
    }

    /// Name-keyed view of every forwarding table, for external display.
    pub fn export(&self, topo: &Topology) -> BTreeMap<String, BTreeMap<String, String>> {
        let mut out = BTreeMap::new();
        for (&src, table) in &self.fibs {
            let mut entries = BTreeMap::new();
            for (&dest, &hop) in table {
                entries.insert(
                    topo.node(dest).name.clone(),
                    topo.node(hop).name.clone(),
                );
            }
            out.insert(topo.node(src).name.clone(), entries);
        }
        out
    }
}

/// Single-source Dijkstra over the weighted graph, tracking the first hop
/// taken out of `src` for every node settled. Infinite-weight edges are
/// treated as absent.
fn first_hops_from(topo: &Topology, src: NodeId) -> HashMap<NodeId, NodeId> {
    let mut best: HashMap<NodeId, f64> = HashMap::new();
    let mut first_hops: HashMap<NodeId, NodeId> = HashMap::new();
    let mut heap = BinaryHeap::new();

    best.insert(src, 0.0);
    heap.push(Reverse(Visit {
        dist: 0.0,
        node: src,
        first_hop: None,
    }));

    while let Some(Reverse(visit)) = heap.pop() {
        if best.get(&visit.node).is_some_and(|&d| visit.dist > d) {
            continue;
        }
        if let Some(hop) = visit.first_hop {
            first_hops.entry(visit.node).or_insert(hop);
        }
        for (eid, next) in topo.out_links(visit.node) {
            let weight = topo.edge(eid).weight;
            if !weight.is_finite() {
                continue;
            }
            let dist = visit.dist + weight;
            if best.get(&next).map_or(true, |&d| dist < d) {
                best.insert(next, dist);
                heap.push(Reverse(Visit {
                    dist,
                    node: next,
                    first_hop: visit.first_hop.or(Some(next)),
                }));
            }
        }
    }

    first_hops
}
