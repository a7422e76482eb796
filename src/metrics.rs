//! Metric values emitted by simulated nodes
//!
//! Every node reports a batch of [`Metric`]s on each tick, wrapped in a
//! [`Message`] that names the emitting node. The severity of a metric is a
//! display hint in `[0, 1]` and never influences the simulation itself.

use serde::{Deserialize, Serialize};

/// Latency (ms) at or below which the average latency is considered healthy
pub const LATENCY_SEVERITY_LOW_MS: i64 = 500;

/// Latency (ms) at or above which the average latency is considered critical
pub const LATENCY_SEVERITY_HIGH_MS: i64 = 1000;

/// Queue depth at which the queued metric reaches full severity
pub const QUEUED_SEVERITY_FULL: i64 = 100;

/// A batch of metrics emitted by one node on one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub node_id: String,
    pub metrics: Vec<Metric>,
}

impl Message {
    pub fn new(node_id: impl Into<String>, metrics: Vec<Metric>) -> Self {
        Self {
            node_id: node_id.into(),
            metrics,
        }
    }
}

/// A single named measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub value: i64,
    pub unit: String,
    pub severity: f64,
}

impl Metric {
    fn new(name: &str, value: i64, unit: &str, severity: f64) -> Self {
        Self {
            name: name.to_string(),
            value,
            unit: unit.to_string(),
            severity,
        }
    }

    /// Number of responses a client has received so far
    pub fn responses(value: i64) -> Self {
        Self::new("Responses", value, "", 0.0)
    }

    /// Average request latency in milliseconds
    ///
    /// Severity is 0 up to 500ms, 1 from 1000ms and linear in between.
    pub fn avg_latency(value: i64) -> Self {
        let severity = if value <= LATENCY_SEVERITY_LOW_MS {
            0.0
        } else if value >= LATENCY_SEVERITY_HIGH_MS {
            1.0
        } else {
            (value - LATENCY_SEVERITY_LOW_MS) as f64
                / (LATENCY_SEVERITY_HIGH_MS - LATENCY_SEVERITY_LOW_MS) as f64
        };

        Self::new("Avg. Latency", value, "ms", severity)
    }

    /// Requests waiting in a node's inbound queues
    pub fn queued(value: i64) -> Self {
        let severity = (value as f64 / QUEUED_SEVERITY_FULL as f64).clamp(0.0, 1.0);
        Self::new("Queued", value, "reqs", severity)
    }

    /// Share of occupied processing slots, in percent
    pub fn utilisation(value: i64) -> Self {
        let severity = (value as f64 / 100.0).clamp(0.0, 1.0);
        Self::new("Utilisation", value, "%", severity)
    }

    /// Number of requests a node has completed
    pub fn processed(value: i64) -> Self {
        Self::new("Processed", value, "reqs", 0.0)
    }
}
