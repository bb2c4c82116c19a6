use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::topology::NodeRole;
use crate::WARN_FRACTION;

/// Multiplier applied to the sensitivity coefficient once a node is deep in
/// the high-load regime, modelling compounding risk under sustained stress.
pub const ALPHA_AMPLIFIER: f64 = 5.0;

/// Accelerated-failure-time parameters of a single node.
///
/// The instantaneous failure rate is `h = (1 / base_mttf) * exp(alpha * f)`
/// where `f` is the node's load as a fraction of the congestion threshold.
/// The load fraction is used (rather than raw MB/s) so `alpha` stays
/// unit-free and comparable across fabrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FailureParams {
    /// Mean time to failure at zero load, in simulated time units.
    pub base_mttf: f64,
    /// Load sensitivity coefficient.
    pub alpha: f64,
}

impl Default for FailureParams {
    fn default() -> Self {
        Self {
            base_mttf: 500.0,
            alpha: 5.0,
        }
    }
}

impl FailureParams {
    /// Role defaults: switches wear out under load, sources and sinks are
    /// treated as unbounded devices that do not fail on their own.
    pub fn for_role(role: NodeRole) -> Self {
        match role {
            NodeRole::Switch | NodeRole::Standby => Self::default(),
            NodeRole::Source | NodeRole::Sink => Self {
                base_mttf: f64::INFINITY,
                alpha: 0.0,
            },
        }
    }

    /// Instantaneous failure rate at the given load fraction.
    pub fn hazard_rate(&self, load_fraction: f64) -> f64 {
        let lambda0 = if self.base_mttf.is_finite() && self.base_mttf > 0.0 {
            1.0 / self.base_mttf
        } else {
            0.0
        };
        let alpha = if load_fraction > WARN_FRACTION {
            self.alpha * ALPHA_AMPLIFIER
        } else {
            self.alpha
        };
        lambda0 * (alpha * load_fraction).exp()
    }

    /// Probability of surviving `horizon` time units at a constant load
    /// fraction. Pure reporting function, no side effects.
    pub fn reliability(&self, load_fraction: f64, horizon: f64) -> f64 {
        (-self.hazard_rate(load_fraction) * horizon).exp()
    }

    /// Stochastic failure decision for one monitoring tick of duration `dt`.
    /// Draws from the injected RNG so runs stay reproducible.
    pub fn check_failure<R: Rng>(&self, load_fraction: f64, dt: f64, rng: &mut R) -> bool {
        let p = (self.hazard_rate(load_fraction) * dt).min(1.0);
        rng.gen::<f64>() < p
    }
}
