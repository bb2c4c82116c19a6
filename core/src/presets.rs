//! Predefined fabric shapes. These are construction fixtures: they only
//! populate the topology structure, all behavior lives in the engines.

use crate::failure::FailureParams;
use crate::topology::{EdgeRole, NodeId, NodeRole, Topology};

const SWITCH_CAPACITY_MBPS: f64 = 1000.0;

fn switch(topo: &mut Topology, name: &str) -> NodeId {
    topo.add_node_with(
        name,
        NodeRole::Switch,
        Some(SWITCH_CAPACITY_MBPS),
        FailureParams::default(),
    )
}

/// N+1 redundancy: two primary switch columns with a shared standby switch
/// between them. The source splits 60/40 to create deliberate asymmetry.
pub fn n_plus_one() -> Topology {
    let mut topo = Topology::new();
    let server = topo.add_node("Server-1", NodeRole::Source);
    let sw_a1 = switch(&mut topo, "SwA1");
    let sw_b1 = switch(&mut topo, "SwB1");
    let standby = topo.add_node_with(
        "Sw-Standby",
        NodeRole::Standby,
        Some(SWITCH_CAPACITY_MBPS),
        FailureParams::default(),
    );
    let sw_a2 = switch(&mut topo, "SwA2");
    let sw_b2 = switch(&mut topo, "SwB2");
    let storage = topo.add_node("Storage-1", NodeRole::Sink);

    topo.add_edge_with_split(server, sw_a1, EdgeRole::Primary, 0.6);
    topo.add_edge_with_split(server, sw_b1, EdgeRole::Primary, 0.4);
    topo.add_edge(sw_a1, sw_a2, EdgeRole::Primary);
    topo.add_edge(sw_b1, sw_b2, EdgeRole::Primary);
    topo.add_edge(sw_a2, storage, EdgeRole::Primary);
    topo.add_edge(sw_b2, storage, EdgeRole::Primary);
    // Standby paths, dark unless a reroute activates them.
    topo.add_edge(sw_a1, standby, EdgeRole::Standby);
    topo.add_edge(sw_b1, standby, EdgeRole::Standby);
    topo.add_edge(standby, storage, EdgeRole::Primary);

    topo.set_redundant(sw_a1, standby).expect("standby edge exists");
    topo.set_redundant(sw_b1, standby).expect("standby edge exists");
    topo
}

/// Cross-linked two-layer fabric with horizontal redundant pairs. `skew`
/// is the share of traffic hitting the A column (0.5 is balanced).
pub fn full_mesh(skew: f64) -> Topology {
    let mut topo = Topology::new();
    let server = topo.add_node("Server", NodeRole::Source);
    let sw_a1 = switch(&mut topo, "SwA1");
    let sw_b1 = switch(&mut topo, "SwB1");
    let sw_a2 = switch(&mut topo, "SwA2");
    let sw_b2 = switch(&mut topo, "SwB2");
    let storage = topo.add_node("Storage", NodeRole::Sink);

    topo.add_edge_with_split(server, sw_a1, EdgeRole::Primary, skew);
    topo.add_edge_with_split(server, sw_b1, EdgeRole::Primary, 1.0 - skew);
    // Mostly straight down, a thin diagonal cross-link each.
    topo.add_edge_with_split(sw_a1, sw_a2, EdgeRole::Primary, 0.9);
    topo.add_edge_with_split(sw_a1, sw_b2, EdgeRole::Backup, 0.1);
    topo.add_edge_with_split(sw_b1, sw_b2, EdgeRole::Primary, 0.9);
    topo.add_edge_with_split(sw_b1, sw_a2, EdgeRole::Backup, 0.1);
    topo.add_edge(sw_a2, storage, EdgeRole::Primary);
    topo.add_edge(sw_b2, storage, EdgeRole::Primary);

    for (a, b) in [(sw_a1, sw_b1), (sw_a2, sw_b2)] {
        topo.add_edge(a, b, EdgeRole::Standby);
        topo.add_edge(b, a, EdgeRole::Standby);
        topo.set_redundant(a, b).expect("lateral edge exists");
        topo.set_redundant(b, a).expect("lateral edge exists");
    }
    topo
}

/// Fat-tree-like layering: one edge and one aggregation switch per pod,
/// two shared core switches. Aggregation switches in adjacent pods back
/// each other up.
pub fn fat_tree(pods: usize) -> Topology {
    let pods = pods.max(2);
    let mut topo = Topology::new();
    let server = topo.add_node("Server", NodeRole::Source);
    let storage = topo.add_node("Storage", NodeRole::Sink);
    let core_0 = switch(&mut topo, "Core-0");
    let core_1 = switch(&mut topo, "Core-1");
    topo.add_edge(core_0, storage, EdgeRole::Primary);
    topo.add_edge(core_1, storage, EdgeRole::Primary);

    let mut aggs = Vec::with_capacity(pods);
    for p in 0..pods {
        let edge_sw = switch(&mut topo, &format!("Edge-{p}"));
        let agg_sw = switch(&mut topo, &format!("Agg-{p}"));
        topo.add_edge(server, edge_sw, EdgeRole::Primary);
        topo.add_edge(edge_sw, agg_sw, EdgeRole::Primary);
        topo.add_edge(agg_sw, core_0, EdgeRole::Primary);
        topo.add_edge(agg_sw, core_1, EdgeRole::Primary);
        aggs.push(agg_sw);
    }
    for p in 0..pods {
        let next = aggs[(p + 1) % pods];
        topo.add_edge(aggs[p], next, EdgeRole::Standby);
        topo.set_redundant(aggs[p], next).expect("lateral edge exists");
    }
    topo
}

/// Ring fabric: two arcs of `arc_len` switches each between source and
/// sink, with each switch backed by its opposite-arc peer.
pub fn ring(arc_len: usize) -> Topology {
    let arc_len = arc_len.max(1);
    let mut topo = Topology::new();
    let server = topo.add_node("Server", NodeRole::Source);
    let storage = topo.add_node("Storage", NodeRole::Sink);

    let mut arcs = Vec::with_capacity(2);
    for label in ["Cw", "Ccw"] {
        let mut prev = server;
        let mut nodes = Vec::with_capacity(arc_len);
        for i in 0..arc_len {
            let sw = switch(&mut topo, &format!("{label}-{i}"));
            topo.add_edge(prev, sw, EdgeRole::Primary);
            nodes.push(sw);
            prev = sw;
        }
        topo.add_edge(prev, storage, EdgeRole::Primary);
        arcs.push(nodes);
    }
    for i in 0..arc_len {
        let (cw, ccw) = (arcs[0][i], arcs[1][i]);
        topo.add_edge(cw, ccw, EdgeRole::Standby);
        topo.add_edge(ccw, cw, EdgeRole::Standby);
        topo.set_redundant(cw, ccw).expect("lateral edge exists");
        topo.set_redundant(ccw, cw).expect("lateral edge exists");
    }
    topo
}
