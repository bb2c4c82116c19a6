pub mod analytics;
pub mod engine;
pub mod failure;
pub mod presets;
pub mod propagation;
pub mod routing;
pub mod topology;

pub use analytics::{EventLog, LogEntry, MetricPoint, MetricsCollector, Severity};
pub use engine::{RunConfig, Simulation, SimulationError};
pub use failure::FailureParams;
pub use propagation::{propagate, Compressor, EdgeFlow, FabricSnapshot, NodeState, ScenarioConfig};
pub use routing::RoutingController;
pub use topology::{
    Edge, EdgeRole, EdgeSpec, Node, NodeId, NodeRole, NodeSpec, NodeStatus, Topology,
    TopologyError, TopologySpec,
};

/// Fraction of the congestion threshold where a switch enters the warning
/// band (and the failure model enters its amplified regime).
pub const WARN_FRACTION: f64 = 0.8;
/// Default share of the threshold a rerouting switch keeps on its primary
/// path.
pub const DEFAULT_SAFETY_FACTOR: f64 = 0.95;
