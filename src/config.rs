use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use tracing::trace;

/// Tunables for a simulation run
///
/// Every field has a default, so an empty JSON object is a valid configuration.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Requests each client sends per run
    pub num_requests: usize,

    /// Delay between two requests of the same client
    pub request_interval_ms: u64,

    /// Concurrent requests a server processes at most
    pub max_routines: usize,

    /// Bounds of the simulated processing time of a server
    pub processing_time_ms: ProcessingTime,

    /// Capacity of every request and response queue
    pub queue_capacity: usize,

    /// Interval between two metric reports of a node
    pub metrics_interval_ms: u64,

    /// Capacity of the shared metrics channel
    pub metrics_buffer: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_requests: 1000,
            request_interval_ms: 10,
            max_routines: 20,
            processing_time_ms: ProcessingTime::default(),
            queue_capacity: 1000,
            metrics_interval_ms: 100,
            metrics_buffer: 256,
        }
    }
}

impl SimulationConfig {
    pub fn request_interval(&self) -> Duration {
        Duration::from_millis(self.request_interval_ms)
    }

    pub fn metrics_interval(&self) -> Duration {
        Duration::from_millis(self.metrics_interval_ms)
    }

    /// Reject values the actors cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_routines == 0 {
            anyhow::bail!("max_routines must be at least 1");
        }
        if self.queue_capacity == 0 {
            anyhow::bail!("queue_capacity must be at least 1");
        }
        if self.metrics_buffer == 0 {
            anyhow::bail!("metrics_buffer must be at least 1");
        }
        if self.metrics_interval_ms == 0 {
            anyhow::bail!("metrics_interval_ms must be at least 1");
        }
        if self.processing_time_ms.lower > self.processing_time_ms.upper {
            anyhow::bail!(
                "processing_time_ms.lower ({}) exceeds upper ({})",
                self.processing_time_ms.lower,
                self.processing_time_ms.upper
            );
        }
        Ok(())
    }
}

/// Inclusive range of simulated processing time in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ProcessingTime {
    pub lower: u64,
    pub upper: u64,
}

impl Default for ProcessingTime {
    fn default() -> Self {
        Self {
            lower: 300,
            upper: 600,
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct Config {
    /// Address the hub binds to (falls back to the environment)
    pub bind: Option<SocketAddr>,

    /// Simulation tunables (optional - defaults apply)
    pub simulation: Option<SimulationConfig>,
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content =
        std::fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
    serde_json::from_str(&file_content)
        .map_err(|_| anyhow::anyhow!("Invalid configuration file provided!"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
