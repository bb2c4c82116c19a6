use std::cmp::Reverse;
use std::collections::BinaryHeap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analytics::{EventLog, MetricsCollector, Severity};
use crate::propagation::{propagate, FabricSnapshot, ScenarioConfig};
use crate::routing::RoutingController;
use crate::topology::{NodeId, NodeRole, NodeStatus, Topology, TopologyError};

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("input traffic must be a non-negative finite value, got {0}")]
    NegativeTraffic(f64),
    #[error("congestion threshold must be positive, got {0}")]
    InvalidThreshold(f64),
    #[error("compression range [{0}, {1}] must satisfy 1.0 <= min < max")]
    InvalidCompressionRange(f64, f64),
    #[error("safety factor must be in (0, 1], got {0}")]
    InvalidSafetyFactor(f64),
    #[error("monitoring and recompute intervals must be positive")]
    InvalidInterval,
    #[error("run horizon must be positive")]
    InvalidHorizon,
    #[error(transparent)]
    Topology(#[from] TopologyError),
}

/// Everything a run needs besides the fabric itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Raw input traffic injected each cycle, MB/s.
    pub traffic: f64,
    pub scenario: ScenarioConfig,
    /// Cadence of traffic injection and per-node failure checks.
    pub monitor_interval: u64,
    /// Cadence of the routing controller, typically longer.
    pub reroute_interval: u64,
    /// Simulated-time horizon at which the run stops.
    pub horizon: u64,
    pub seed: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            traffic: 1200.0,
            scenario: ScenarioConfig::default(),
            monitor_interval: 1,
            reroute_interval: 5,
            horizon: 100,
            seed: 0,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), SimulationError> {
        if !(self.traffic >= 0.0 && self.traffic.is_finite()) {
            return Err(SimulationError::NegativeTraffic(self.traffic));
        }
        if self.monitor_interval == 0 || self.reroute_interval == 0 {
            return Err(SimulationError::InvalidInterval);
        }
        if self.horizon == 0 {
            return Err(SimulationError::InvalidHorizon);
        }
        self.scenario.validate()
    }
}

/// Periodic work items. Variant order is the tie-break at equal timestamps:
/// injection first so monitors judge fresh load, the routing recompute last
/// so it reads a settled picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum TaskKind {
    Inject,
    Monitor(NodeId),
    Recompute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Task {
    time: u64,
    kind: TaskKind,
    seq: u64,
}

/// A single simulation run: one fabric, one clock, one seeded RNG, one
/// event log. Owns all mutable state so independent runs never share
/// anything.
#[derive(Debug)]
pub struct Simulation {
    pub topology: Topology,
    pub config: RunConfig,
    pub time: u64,
    pub log: EventLog,
    pub metrics: MetricsCollector,
    pub controller: RoutingController,
    rng: ChaCha8Rng,
    tasks: BinaryHeap<Reverse<Task>>,
    seq: u64,
    last_snapshot: Option<FabricSnapshot>,
}

impl Simulation {
    pub fn new(topology: Topology, config: RunConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        topology.validate()?;
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Ok(Self {
            topology,
            config,
            time: 0,
            log: EventLog::new(),
            metrics: MetricsCollector::new(1024),
            controller: RoutingController::new(),
            rng,
            tasks: BinaryHeap::new(),
            seq: 0,
            last_snapshot: None,
        })
    }

    /// Resets clock, log, metrics, and RNG, and seeds the periodic tasks:
    /// injection and per-switch monitors fire immediately, the routing
    /// controller waits out its first interval.
    pub fn start(&mut self) {
        self.time = 0;
        self.log.clear();
        self.metrics.reset();
        self.rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        self.tasks.clear();
        self.seq = 0;
        self.last_snapshot = None;

        self.schedule(0, TaskKind::Inject);
        for id in self.topology.node_ids() {
            if matches!(
                self.topology.node(id).role,
                NodeRole::Switch | NodeRole::Standby
            ) {
                self.schedule(0, TaskKind::Monitor(id));
            }
        }
        self.schedule(self.config.reroute_interval, TaskKind::Recompute);
    }

    /// Pops and dispatches the next task. Returns `false` once the queue is
    /// drained or the horizon is reached.
    pub fn step(&mut self) -> Result<bool, SimulationError> {
        let Some(Reverse(task)) = self.tasks.pop() else {
            return Ok(false);
        };
        if task.time > self.config.horizon {
            self.time = self.config.horizon;
            self.tasks.clear();
            return Ok(false);
        }
        self.time = task.time;
        self.dispatch(task)?;
        Ok(true)
    }

    /// Runs a fresh simulation from time zero to the horizon.
    pub fn run(&mut self) -> Result<(), SimulationError> {
        self.start();
        while self.step()? {}
        Ok(())
    }

    pub fn snapshot(&self) -> Option<&FabricSnapshot> {
        self.last_snapshot.as_ref()
    }

    /// Name-keyed forwarding tables as of the last controller cycle.
    pub fn fib_view(&self) -> std::collections::BTreeMap<String, std::collections::BTreeMap<String, String>> {
        self.controller.export(&self.topology)
    }

    fn schedule(&mut self, time: u64, kind: TaskKind) {
        self.seq += 1;
        self.tasks.push(Reverse(Task {
            time,
            kind,
            seq: self.seq,
        }));
    }

    fn dispatch(&mut self, task: Task) -> Result<(), SimulationError> {
        match task.kind {
            TaskKind::Inject => {
                let snapshot = propagate(
                    &mut self.topology,
                    self.config.traffic,
                    &self.config.scenario,
                    &mut self.rng,
                    &mut self.log,
                    self.time,
                )?;
                self.metrics.update(
                    self.time,
                    self.config.traffic,
                    snapshot.compression_ratio,
                    &self.topology,
                    self.config.scenario.threshold,
                );
                self.last_snapshot = Some(snapshot);
                self.schedule(self.time + self.config.monitor_interval, TaskKind::Inject);
            }
            TaskKind::Monitor(id) => {
                if self.topology.node(id).is_failed {
                    // Terminal state, the monitor retires with the node.
                    return Ok(());
                }
                let node = self.topology.node(id);
                let fraction = node.load / self.config.scenario.threshold;
                let dt = self.config.monitor_interval as f64;
                if node.failure.check_failure(fraction, dt, &mut self.rng) {
                    let name = node.name.clone();
                    let load = node.load;
                    let failed = self.topology.node_mut(id);
                    failed.is_failed = true;
                    failed.status = NodeStatus::Failed;
                    self.log.push(
                        Severity::Critical,
                        self.time,
                        format!("{name} failed under load ({load:.0} MB/s)"),
                    );
                    tracing::warn!(node = %name, load, time = self.time, "node failed");
                } else {
                    self.schedule(self.time + self.config.monitor_interval, TaskKind::Monitor(id));
                }
            }
            TaskKind::Recompute => {
                self.controller.recompute(&mut self.topology);
                self.schedule(self.time + self.config.reroute_interval, TaskKind::Recompute);
            }
        }
        Ok(())
    }
}
