use crate::common::durable_pair_spec;
use sanfab_core::presets;
use sanfab_core::{
    NodeStatus, RunConfig, ScenarioConfig, Severity, Simulation, SimulationError, Topology,
};

#[test]
fn test_run_stops_at_horizon() {
    let config = RunConfig {
        traffic: 200.0,
        horizon: 50,
        ..RunConfig::default()
    };
    let mut sim = Simulation::new(presets::n_plus_one(), config).expect("valid config");
    sim.run().expect("run completes");

    assert_eq!(sim.time, 50);
    // One injection per monitoring tick, inclusive of t = 0.
    assert_eq!(sim.metrics.history.len(), 51);
    assert!(sim.snapshot().is_some());
}

#[test]
fn test_sustained_overload_fails_the_hot_branch() {
    let config = RunConfig {
        traffic: 1800.0,
        horizon: 100,
        seed: 7,
        ..RunConfig::default()
    };
    let mut sim = Simulation::new(presets::n_plus_one(), config).expect("valid config");
    sim.run().expect("run completes");

    let sw_a1 = sim.topology.lookup("SwA1").expect("known node");
    assert!(sim.topology.node(sw_a1).is_failed, "the 60% branch must collapse");
    assert!(
        sim.log.entries().iter().any(|e| e.severity == Severity::Critical),
        "failures must be logged"
    );
    let last = sim.metrics.history.back().expect("history populated");
    assert!(last.failed_nodes >= 1);
    // The 108% utilization sample from the first cycle is on record.
    assert!(sim.metrics.utilization_percentile(100.0) >= 100);
}

#[test]
fn test_idle_fabric_survives_with_durable_switches() {
    // Zero traffic and negligible base hazard: nothing fails, nothing is
    // logged, every node ends Idle.
    let config = RunConfig {
        traffic: 0.0,
        horizon: 200,
        ..RunConfig::default()
    };
    let topo = Topology::from_spec(&durable_pair_spec()).expect("valid topology");
    let mut sim = Simulation::new(topo, config).expect("valid config");
    sim.run().expect("run completes");

    for (_, node) in sim.topology.nodes() {
        assert!(!node.is_failed);
        assert_eq!(node.status, NodeStatus::Idle);
    }
    assert!(sim.log.is_empty());
}

#[test]
fn test_rerouting_defense_holds_through_run() {
    let config = RunConfig {
        traffic: 1800.0,
        scenario: ScenarioConfig {
            rerouting: true,
            ..ScenarioConfig::default()
        },
        horizon: 40,
        ..RunConfig::default()
    };
    let topo = Topology::from_spec(&durable_pair_spec()).expect("valid topology");
    let mut sim = Simulation::new(topo, config).expect("valid config");
    sim.run().expect("run completes");

    let snapshot = sim.snapshot().expect("snapshot present");
    let sw_a = snapshot.node("SwA").expect("known node");
    assert_eq!(sw_a.status, NodeStatus::Rerouted);
    assert!((snapshot.flow("SwA", "SwB") - 130.0).abs() < 1e-6);
    // Every cycle reroutes, every cycle logs.
    assert_eq!(
        sim.log
            .entries()
            .iter()
            .filter(|e| e.severity == Severity::Warning)
            .count(),
        41
    );
}

#[test]
fn test_controller_updates_on_its_own_interval() {
    let config = RunConfig {
        traffic: 1200.0,
        reroute_interval: 10,
        horizon: 25,
        ..RunConfig::default()
    };
    let topo = Topology::from_spec(&durable_pair_spec()).expect("valid topology");
    let mut sim = Simulation::new(topo, config).expect("valid config");
    sim.run().expect("run completes");

    // Recomputes fired at t = 10 and t = 20, so tables exist and route
    // toward the cooler branch.
    let source = sim.topology.lookup("Source").expect("known node");
    let sink = sim.topology.lookup("Sink").expect("known node");
    let sw_b = sim.topology.lookup("SwB").expect("known node");
    assert_eq!(sim.controller.next_hop(source, sink), Some(sw_b));
    assert!(!sim.fib_view().is_empty());
}

#[test]
fn test_invalid_run_config_rejected() {
    let config = RunConfig {
        monitor_interval: 0,
        ..RunConfig::default()
    };
    let err = Simulation::new(presets::n_plus_one(), config).expect_err("zero interval");
    assert!(matches!(err, SimulationError::InvalidInterval));

    let config = RunConfig {
        horizon: 0,
        ..RunConfig::default()
    };
    let err = Simulation::new(presets::n_plus_one(), config).expect_err("zero horizon");
    assert!(matches!(err, SimulationError::InvalidHorizon));
}
