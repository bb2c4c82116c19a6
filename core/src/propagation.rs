use std::collections::{BTreeMap, HashMap, HashSet};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::analytics::{EventLog, Severity};
use crate::engine::SimulationError;
use crate::topology::{EdgeId, EdgeRole, NodeId, NodeRole, NodeStatus, Topology};
use crate::WARN_FRACTION;

/// Defense scenario for one evaluation: which mitigations are armed and the
/// uniform congestion threshold applied to switch-role nodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub compression: bool,
    pub compression_range: (f64, f64),
    pub rerouting: bool,
    /// Congestion threshold in MB/s. Sources and sinks are exempt.
    pub threshold: f64,
    /// Share of the threshold a rerouting switch keeps on its primary path.
    pub safety_factor: f64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            compression: false,
            compression_range: (1.2, 2.8),
            rerouting: false,
            threshold: 1000.0,
            safety_factor: crate::DEFAULT_SAFETY_FACTOR,
        }
    }
}

impl ScenarioConfig {
    pub fn validate(&self) -> Result<(), SimulationError> {
        if !(self.threshold > 0.0 && self.threshold.is_finite()) {
            return Err(SimulationError::InvalidThreshold(self.threshold));
        }
        let (min, max) = self.compression_range;
        if !(min >= 1.0 && max > min) {
            return Err(SimulationError::InvalidCompressionRange(min, max));
        }
        if !(self.safety_factor > 0.0 && self.safety_factor <= 1.0) {
            return Err(SimulationError::InvalidSafetyFactor(self.safety_factor));
        }
        Ok(())
    }
}

/// Statistical in-line traffic reduction applied before fabric entry.
/// One ratio is drawn per cycle and reused for every path fed by the
/// injection.
#[derive(Debug, Clone, Copy)]
pub struct Compressor {
    pub min_ratio: f64,
    pub max_ratio: f64,
}

impl Compressor {
    pub fn new(min_ratio: f64, max_ratio: f64) -> Self {
        Self {
            min_ratio,
            max_ratio,
        }
    }

    /// Returns the reduced volume and the ratio that produced it.
    pub fn compress<R: Rng>(&self, volume: f64, rng: &mut R) -> (f64, f64) {
        let ratio = rng.gen_range(self.min_ratio..self.max_ratio);
        (volume / ratio, ratio)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeState {
    pub load: f64,
    pub status: NodeStatus,
    pub capacity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeFlow {
    pub from: String,
    pub to: String,
    pub flow: f64,
}

/// Plain-data result of one propagation cycle, sufficient for an external
/// renderer to draw the fabric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FabricSnapshot {
    pub time: u64,
    /// Compression ratio applied this cycle, 1.0 when disabled.
    pub compression_ratio: f64,
    pub nodes: BTreeMap<String, NodeState>,
    pub edges: Vec<EdgeFlow>,
}

impl FabricSnapshot {
    pub fn capture(topo: &Topology, compression_ratio: f64, time: u64) -> Self {
        let mut nodes = BTreeMap::new();
        for (_, node) in topo.nodes() {
            nodes.insert(
                node.name.clone(),
                NodeState {
                    load: node.load,
                    status: node.status,
                    capacity: node.capacity,
                },
            );
        }
        let edges = topo
            .edge_list()
            .into_iter()
            .map(|(eid, from, to)| EdgeFlow {
                from: topo.node(from).name.clone(),
                to: topo.node(to).name.clone(),
                flow: topo.edge(eid).flow,
            })
            .collect();
        Self {
            time,
            compression_ratio,
            nodes,
            edges,
        }
    }

    pub fn node(&self, name: &str) -> Option<&NodeState> {
        self.nodes.get(name)
    }

    pub fn flow(&self, from: &str, to: &str) -> f64 {
        self.edges
            .iter()
            .filter(|e| e.from == from && e.to == to)
            .map(|e| e.flow)
            .sum()
    }
}

/// Runs one load-propagation cycle: resets loads, injects (optionally
/// compressed) traffic at the sources, sweeps it breadth-first through the
/// fabric applying the armed defenses, and returns a snapshot.
///
/// Mutates the topology's load/flow/status fields and appends to the event
/// log. Deterministic for a given RNG stream.
pub fn propagate<R: Rng>(
    topo: &mut Topology,
    traffic: f64,
    scenario: &ScenarioConfig,
    rng: &mut R,
    log: &mut EventLog,
    now: u64,
) -> Result<FabricSnapshot, SimulationError> {
    scenario.validate()?;
    if !(traffic >= 0.0 && traffic.is_finite()) {
        return Err(SimulationError::NegativeTraffic(traffic));
    }
    topo.validate()?;

    topo.reset_loads();

    let (injected, ratio) = if scenario.compression {
        let (min, max) = scenario.compression_range;
        let (reduced, ratio) = Compressor::new(min, max).compress(traffic, rng);
        log.push(
            Severity::Info,
            now,
            format!("compression active: {traffic:.0} MB/s reduced to {reduced:.0} MB/s (ratio {ratio:.2})"),
        );
        (reduced, ratio)
    } else {
        (traffic, 1.0)
    };

    // Unprocessed-predecessor counts over primary/backup edges. Standby
    // edges carry rerouted excess only and do not gate the sweep order.
    let mut pending: HashMap<NodeId, usize> = HashMap::new();
    for (eid, _, to) in topo.edge_list() {
        if topo.edge(eid).role != EdgeRole::Standby {
            *pending.entry(to).or_insert(0) += 1;
        }
    }

    let sources = topo.nodes_with_role(NodeRole::Source);
    let share = injected / sources.len() as f64;
    let mut processed: HashSet<NodeId> = HashSet::new();

    for &src in &sources {
        topo.apply_load(src, share);
        topo.node_mut(src).status = if share > 0.0 {
            NodeStatus::Safe
        } else {
            NodeStatus::Idle
        };
        forward(topo, src, share, &mut pending);
        processed.insert(src);
    }

    // Breadth-first waves: a switch is resolved once all primary/backup
    // predecessors have been. Standby-role nodes wait until rerouted load
    // actually reaches them. Congested nodes go first within a wave so
    // their excess can still land on an unfinalized peer.
    loop {
        let mut ready: Vec<NodeId> = topo
            .node_ids()
            .into_iter()
            .filter(|id| !processed.contains(id))
            .filter(|id| {
                matches!(topo.node(*id).role, NodeRole::Switch | NodeRole::Standby)
            })
            .filter(|id| pending.get(id).copied().unwrap_or(0) == 0)
            .filter(|id| topo.node(*id).role != NodeRole::Standby || topo.node(*id).load > 0.0)
            .collect();
        if ready.is_empty() {
            break;
        }
        sort_wave(topo, &mut ready);
        for u in ready {
            process_switch(topo, u, scenario, &mut pending, &processed, log, now);
            processed.insert(u);
        }
    }

    // Anything still holding load behind an inactive standby path or a
    // lateral cycle gets resolved in arrival-independent order.
    loop {
        let mut leftovers: Vec<NodeId> = topo
            .node_ids()
            .into_iter()
            .filter(|id| !processed.contains(id))
            .filter(|id| {
                matches!(topo.node(*id).role, NodeRole::Switch | NodeRole::Standby)
            })
            .filter(|id| topo.node(*id).load > 0.0)
            .collect();
        if leftovers.is_empty() {
            break;
        }
        sort_wave(topo, &mut leftovers);
        for u in leftovers {
            process_switch(topo, u, scenario, &mut pending, &processed, log, now);
            processed.insert(u);
        }
    }

    for id in topo.node_ids() {
        let node = topo.node_mut(id);
        if node.role == NodeRole::Sink && !node.is_failed {
            node.status = if node.load > 0.0 {
                NodeStatus::Safe
            } else {
                NodeStatus::Idle
            };
        }
    }

    tracing::debug!(
        traffic,
        injected,
        ratio,
        nodes = topo.node_count(),
        "propagation cycle complete"
    );

    Ok(FabricSnapshot::capture(topo, ratio, now))
}

fn sort_wave(topo: &Topology, wave: &mut [NodeId]) {
    wave.sort_by(|&a, &b| {
        let la = topo.node(a).load;
        let lb = topo.node(b).load;
        lb.total_cmp(&la).then(a.index().cmp(&b.index()))
    });
}

fn process_switch(
    topo: &mut Topology,
    u: NodeId,
    scenario: &ScenarioConfig,
    pending: &mut HashMap<NodeId, usize>,
    processed: &HashSet<NodeId>,
    log: &mut EventLog,
    now: u64,
) {
    if topo.node(u).is_failed {
        // Terminal: drops everything, still unblocks downstream ordering.
        forward(topo, u, 0.0, pending);
        return;
    }

    let load = topo.node(u).load;
    if load <= 0.0 {
        forward(topo, u, 0.0, pending);
        return;
    }

    let threshold = scenario.threshold;
    if load <= threshold {
        topo.node_mut(u).status = if load > WARN_FRACTION * threshold {
            NodeStatus::Warning
        } else {
            NodeStatus::Safe
        };
        forward(topo, u, load, pending);
        return;
    }

    if scenario.rerouting {
        if let Some(target) = viable_reroute_target(topo, u, threshold, processed) {
            let safe_cap = threshold * scenario.safety_factor;
            let excess = load - safe_cap;
            let (edge, neighbor) = target;
            topo.add_flow(edge, excess);
            topo.apply_load(neighbor, excess);
            topo.node_mut(u).status = NodeStatus::Rerouted;
            forward(topo, u, safe_cap, pending);
            let name = topo.node(u).name.clone();
            let neighbor_name = topo.node(neighbor).name.clone();
            log.push(
                Severity::Warning,
                now,
                format!("{name} over threshold: rerouted {excess:.0} MB/s to {neighbor_name}"),
            );
            tracing::debug!(node = %name, excess, to = %neighbor_name, "excess rerouted");
            return;
        }
    }

    // No defense left: the pipe breaks and the branch goes dark.
    topo.node_mut(u).status = NodeStatus::Overloaded;
    topo.node_mut(u).is_failed = true;
    forward(topo, u, 0.0, pending);
    let name = topo.node(u).name.clone();
    log.push(
        Severity::Critical,
        now,
        format!("{name} overloaded ({load:.0} MB/s), dropping all traffic"),
    );
    tracing::warn!(node = %name, load, "switch overloaded");
}

/// Excess may shift to the designated redundant neighbor if it exists, has
/// not failed, is still below threshold, and has not been finalized this
/// sweep (a finalized node's outgoing flow is already fixed).
fn viable_reroute_target(
    topo: &Topology,
    u: NodeId,
    threshold: f64,
    processed: &HashSet<NodeId>,
) -> Option<(EdgeId, NodeId)> {
    let neighbor = topo.redundant_neighbor(u)?;
    if topo.node(neighbor).is_failed
        || processed.contains(&neighbor)
        || topo.node(neighbor).load >= threshold
    {
        return None;
    }
    let edge = topo.edge_between(u, neighbor)?;
    Some((edge, neighbor))
}

/// Distributes `amount` across the node's outgoing primary/backup edges
/// (explicit splits when present, equal otherwise) and decrements the
/// pending count of every successor. Traffic aimed at a failed node is
/// recorded on the edge and dropped on arrival.
fn forward(topo: &mut Topology, u: NodeId, amount: f64, pending: &mut HashMap<NodeId, usize>) {
    let mut routed: Vec<(EdgeId, NodeId, Option<f64>)> = Vec::new();
    for (eid, v) in topo.out_links(u) {
        let edge = topo.edge(eid);
        if edge.role != EdgeRole::Standby {
            routed.push((eid, v, edge.split));
        }
    }

    for &(_, v, _) in &routed {
        if let Some(count) = pending.get_mut(&v) {
            *count = count.saturating_sub(1);
        }
    }

    // A node with zero outgoing edges is treated as a sink.
    if routed.is_empty() || amount <= 0.0 {
        return;
    }

    let shares = split_shares(&routed);
    for ((eid, v, _), share) in routed.iter().zip(shares) {
        let amt = amount * share;
        if amt <= 0.0 {
            continue;
        }
        topo.add_flow(*eid, amt);
        if !topo.node(*v).is_failed {
            topo.apply_load(*v, amt);
        }
    }
}

fn split_shares(routed: &[(EdgeId, NodeId, Option<f64>)]) -> Vec<f64> {
    let all_explicit = routed.iter().all(|(_, _, split)| split.is_some());
    let total: f64 = routed.iter().filter_map(|(_, _, split)| *split).sum();
    if all_explicit && total > 0.0 {
        routed
            .iter()
            .map(|(_, _, split)| split.unwrap_or(0.0) / total)
            .collect()
    } else {
        let n = routed.len() as f64;
        routed.iter().map(|_| 1.0 / n).collect()
    }
}
