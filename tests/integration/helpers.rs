//! Helper functions for integration tests

use std::collections::HashMap;
use std::time::Duration;

use tokio::task::JoinHandle;
use topology_sim::{
    NodeKind, System,
    config::{ProcessingTime, SimulationConfig},
    metrics::Message,
};

/// Small, fast workload for tests running on the real clock
pub fn fast_config() -> SimulationConfig {
    SimulationConfig {
        num_requests: 20,
        request_interval_ms: 1,
        max_routines: 4,
        processing_time_ms: ProcessingTime { lower: 1, upper: 5 },
        metrics_interval_ms: 20,
        ..Default::default()
    }
}

/// Consume the metrics channel of a system so producers never block on it
pub fn drain_metrics(system: &System) -> JoinHandle<Vec<Message>> {
    let metrics = system.metrics();
    tokio::spawn(async move {
        let mut rx = metrics.lock_owned().await;
        let mut messages = vec![];
        while let Some(message) = rx.recv().await {
            messages.push(message);
        }
        messages
    })
}

/// Wait until the current run has ended, then drain it
pub async fn wait_for_completion(system: &System, limit: Duration) {
    tokio::time::timeout(limit, async {
        while system.is_running() {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    })
    .await
    .expect("run should complete in time");

    system.stop().await.unwrap();
}

/// Processed counts grouped by node kind
pub fn processed_by_kind(system: &System) -> HashMap<NodeKind, Vec<u64>> {
    let processed = system.processed();
    let mut by_kind: HashMap<NodeKind, Vec<u64>> = HashMap::new();

    for node in system.snapshot().nodes {
        if let Some(count) = processed.get(&node.id) {
            by_kind.entry(node.kind).or_default().push(*count);
        }
    }

    by_kind
}
