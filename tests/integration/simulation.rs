//! End-to-end runs of the default topology
//!
//! These tests verify that:
//! - A run completes and cancels itself after all responses
//! - Every request passes the load balancer exactly once
//! - Restarting drains the previous generation first
//! - Topology edits take effect on the next start

use std::time::Duration;

use topology_sim::{NodeKind, System, SystemError, config::SimulationConfig, topology::default_topology};

use crate::helpers::{drain_metrics, processed_by_kind, wait_for_completion};

#[tokio::test(start_paused = true)]
async fn test_default_topology_completes_all_requests() {
    let system = System::new(SimulationConfig::default()).unwrap();
    default_topology(&system).unwrap();
    let metrics = drain_metrics(&system);

    system.start().await.unwrap();
    wait_for_completion(&system, Duration::from_secs(120)).await;

    let processed = processed_by_kind(&system);
    assert_eq!(processed[&NodeKind::LoadBalancer], vec![1000]);

    let servers = &processed[&NodeKind::Server];
    assert_eq!(servers.len(), 3);
    assert_eq!(servers.iter().sum::<u64>(), 1000);
    // Round robin splits 1000 requests 334 / 333 / 333
    assert!(servers.iter().all(|count| (333..=334).contains(count)));

    drop(system);
    let messages = metrics.await.unwrap();

    let client_reports: Vec<_> = messages
        .iter()
        .filter(|message| message.metrics[0].name == "Responses")
        .collect();
    let last = client_reports.last().expect("client should report");
    assert_eq!(last.metrics[0].value, 1000);
    assert!(last.metrics[1].value >= 300);
}

#[tokio::test(start_paused = true)]
async fn test_restart_during_run_starts_fresh_generation() {
    let system = System::new(SimulationConfig::default()).unwrap();
    default_topology(&system).unwrap();
    let _metrics = drain_metrics(&system);

    system.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(system.processed().values().any(|count| *count > 0));

    system.start().await.unwrap();
    assert!(system.processed().values().all(|count| *count == 0));

    wait_for_completion(&system, Duration::from_secs(120)).await;

    // Nothing from the first generation leaks into the second
    let processed = processed_by_kind(&system);
    assert_eq!(processed[&NodeKind::LoadBalancer], vec![1000]);
    assert_eq!(processed[&NodeKind::Server].iter().sum::<u64>(), 1000);
}

#[tokio::test(start_paused = true)]
async fn test_client_wired_directly_to_server() {
    let system = System::new(SimulationConfig {
        num_requests: 50,
        ..Default::default()
    })
    .unwrap();
    let client = system.add_node(NodeKind::Client);
    let server = system.add_node(NodeKind::Server);
    system.add_edge(&client.id, &server.id).unwrap();
    let _metrics = drain_metrics(&system);

    system.start().await.unwrap();
    wait_for_completion(&system, Duration::from_secs(60)).await;

    assert_eq!(system.processed()[&server.id], 50);
}

#[tokio::test(start_paused = true)]
async fn test_removed_server_is_not_wired_on_next_start() {
    let system = System::new(SimulationConfig {
        num_requests: 30,
        ..Default::default()
    })
    .unwrap();
    default_topology(&system).unwrap();
    let _metrics = drain_metrics(&system);

    let removed = system
        .snapshot()
        .nodes
        .into_iter()
        .find(|node| node.kind == NodeKind::Server)
        .unwrap();
    system.remove_node(&removed.id).unwrap();
    assert_eq!(system.snapshot().edges.len(), 3);

    system.start().await.unwrap();
    wait_for_completion(&system, Duration::from_secs(60)).await;

    let servers = &processed_by_kind(&system)[&NodeKind::Server];
    assert_eq!(servers, &vec![15, 15]);
}

#[tokio::test]
async fn test_stop_on_idle_system() {
    let system = System::new(SimulationConfig::default()).unwrap();
    system.stop().await.unwrap();
    assert!(!system.is_running());

    assert!(matches!(
        system.remove_edge("missing"),
        Err(SystemError::EdgeNotFound(_))
    ));
}
