use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sanfab_core::*;

pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Drives single propagation cycles against one topology with a seeded RNG
/// and a run-scoped event log.
pub struct TestHarness {
    pub topology: Topology,
    pub log: EventLog,
    pub rng: ChaCha8Rng,
}

impl TestHarness {
    pub fn new(topology: Topology) -> Self {
        Self::with_seed(topology, 12345)
    }

    pub fn with_seed(topology: Topology, seed: u64) -> Self {
        Self {
            topology,
            log: EventLog::new(),
            rng: seeded_rng(seed),
        }
    }

    pub fn run(&mut self, traffic: f64, scenario: &ScenarioConfig) -> FabricSnapshot {
        propagate(
            &mut self.topology,
            traffic,
            scenario,
            &mut self.rng,
            &mut self.log,
            0,
        )
        .expect("propagation inputs are valid")
    }

    pub fn id(&self, name: &str) -> NodeId {
        self.topology.lookup(name).expect("known node")
    }

    pub fn status(&self, name: &str) -> NodeStatus {
        self.topology.node(self.id(name)).status
    }

    pub fn load(&self, name: &str) -> f64 {
        self.topology.node(self.id(name)).load
    }

    pub fn is_failed(&self, name: &str) -> bool {
        self.topology.node(self.id(name)).is_failed
    }

    pub fn flow(&self, from: &str, to: &str) -> f64 {
        let from = self.id(from);
        let to = self.id(to);
        self.topology
            .edge_between(from, to)
            .map(|e| self.topology.edge(e).flow)
            .unwrap_or(0.0)
    }
}

/// Two parallel switches between one source and one sink, with an explicit
/// split to create deliberate asymmetry. With `redundancy`, each switch
/// backs the other over lateral standby edges.
pub fn parallel_pair(split_a: f64, redundancy: bool) -> Topology {
    let mut topo = Topology::new();
    let source = topo.add_node("Source", NodeRole::Source);
    let sw_a = topo.add_node_with(
        "SwA",
        NodeRole::Switch,
        Some(1000.0),
        FailureParams::default(),
    );
    let sw_b = topo.add_node_with(
        "SwB",
        NodeRole::Switch,
        Some(1000.0),
        FailureParams::default(),
    );
    let sink = topo.add_node("Sink", NodeRole::Sink);

    topo.add_edge_with_split(source, sw_a, EdgeRole::Primary, split_a);
    topo.add_edge_with_split(source, sw_b, EdgeRole::Primary, 1.0 - split_a);
    topo.add_edge(sw_a, sink, EdgeRole::Primary);
    topo.add_edge(sw_b, sink, EdgeRole::Primary);

    if redundancy {
        topo.add_edge(sw_a, sw_b, EdgeRole::Standby);
        topo.add_edge(sw_b, sw_a, EdgeRole::Standby);
        topo.set_redundant(sw_a, sw_b).expect("lateral edge exists");
        topo.set_redundant(sw_b, sw_a).expect("lateral edge exists");
    }
    topo
}

/// Spec text for a fabric with long-lived switches, for scheduler tests
/// that must not see spontaneous wear-out failures.
pub fn durable_pair_spec() -> TopologySpec {
    serde_json::from_str(
        r#"{
            "nodes": [
                { "name": "Source", "role": "Source" },
                { "name": "SwA", "role": "Switch", "capacity": 1000.0,
                  "failure": { "base_mttf": 1e12, "alpha": 0.0 } },
                { "name": "SwB", "role": "Switch", "capacity": 1000.0,
                  "failure": { "base_mttf": 1e12, "alpha": 0.0 } },
                { "name": "Sink", "role": "Sink" }
            ],
            "edges": [
                { "from": "Source", "to": "SwA", "split": 0.6 },
                { "from": "Source", "to": "SwB", "split": 0.4 },
                { "from": "SwA", "to": "Sink" },
                { "from": "SwB", "to": "Sink" },
                { "from": "SwA", "to": "SwB", "role": "Standby" },
                { "from": "SwB", "to": "SwA", "role": "Standby" }
            ],
            "redundancy": [["SwA", "SwB"], ["SwB", "SwA"]]
        }"#,
    )
    .expect("spec text is valid")
}
