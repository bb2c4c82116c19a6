use std::collections::VecDeque;

use hdrhistogram::Histogram;
use serde::{Deserialize, Serialize};

use crate::topology::{NodeRole, Topology};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub severity: Severity,
    pub message: String,
    pub time: u64,
}

/// Ordered, append-only record of what happened during a run. Cleared at
/// the start of each run, not each cycle; read by external renderers.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    entries: Vec<LogEntry>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, severity: Severity, time: u64, message: impl Into<String>) {
        self.entries.push(LogEntry {
            severity,
            message: message.into(),
            time,
        });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug)]
pub struct MetricPoint {
    pub time: u64,
    /// Raw traffic offered to the fabric this cycle, MB/s.
    pub offered: f64,
    /// Load that survived to the sinks, MB/s.
    pub delivered: f64,
    /// Smoothed fraction of (post-compression) input that reached a sink.
    pub delivery_rate: f32,
    pub failed_nodes: u32,
    pub peak_utilization_pct: f32,
}

#[derive(Debug)]
pub struct MetricsCollector {
    pub history: VecDeque<MetricPoint>,
    pub max_points: usize,
    utilization: Histogram<u64>,
    current_delivery_rate: f32,
}

impl MetricsCollector {
    pub fn new(max_points: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(max_points),
            max_points,
            utilization: Histogram::new_with_bounds(1, 10_000, 2).unwrap(),
            current_delivery_rate: 0.0,
        }
    }

    /// Samples the topology after a propagation cycle. `ratio` is the
    /// compression ratio the cycle applied (1.0 when disabled).
    pub fn update(
        &mut self,
        time: u64,
        offered: f64,
        ratio: f64,
        topo: &Topology,
        threshold: f64,
    ) {
        let mut delivered = 0.0;
        let mut failed_nodes = 0u32;
        let mut peak_pct = 0.0f64;
        for (_, node) in topo.nodes() {
            if node.is_failed {
                failed_nodes += 1;
            }
            match node.role {
                NodeRole::Sink => delivered += node.load,
                NodeRole::Switch | NodeRole::Standby => {
                    let pct = node.load / threshold * 100.0;
                    peak_pct = peak_pct.max(pct);
                    self.utilization.saturating_record(pct.round() as u64);
                }
                NodeRole::Source => {}
            }
        }

        let effective_input = offered / ratio;
        let raw_rate = if effective_input > 0.0 {
            (delivered / effective_input) as f32
        } else {
            1.0
        };
        let alpha = 0.1;
        self.current_delivery_rate = self.current_delivery_rate * (1.0 - alpha) + raw_rate * alpha;

        self.history.push_back(MetricPoint {
            time,
            offered,
            delivered,
            delivery_rate: self.current_delivery_rate,
            failed_nodes,
            peak_utilization_pct: peak_pct as f32,
        });
        if self.history.len() > self.max_points {
            self.history.pop_front();
        }
    }

    /// Percentile of switch utilization (in percent of threshold) observed
    /// across all sampled cycles.
    pub fn utilization_percentile(&self, p: f64) -> u64 {
        self.utilization.value_at_percentile(p)
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.utilization.reset();
        self.current_delivery_rate = 0.0;
    }
}
